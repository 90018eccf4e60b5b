//! Route registration errors.

use http::Method;
use thiserror::Error;

/// A configuration error detected while building the route table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The `(method, pattern)` pair is already registered.
    #[error("duplicate route: {method} {pattern}")]
    Duplicate {
        /// HTTP method of the rejected route.
        method: Method,
        /// Fully-expanded path pattern.
        pattern: String,
    },

    /// The pattern cannot be parsed.
    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
