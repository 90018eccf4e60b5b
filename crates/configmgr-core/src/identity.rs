//! Caller identity.
//!
//! Populated by the context-loading middleware and inspected by the
//! authorization stage.

use serde::{Deserialize, Serialize};

/// The authenticated principal behind a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// An end user.
    User {
        /// Stable user identifier.
        user_id: String,
        /// Roles granted to the user.
        roles: Vec<String>,
    },
    /// A service account (plugin-to-plugin or operator traffic).
    Service {
        /// Service account name.
        service_name: String,
    },
    /// An API key with scopes.
    ApiKey {
        /// Key identifier (never the secret).
        key_id: String,
        /// Scopes used as pseudo-roles.
        scopes: Vec<String>,
    },
    /// No credentials were presented.
    #[default]
    Anonymous,
}

impl CallerIdentity {
    /// Creates a user identity.
    #[must_use]
    pub fn user(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self::User {
            user_id: user_id.into(),
            roles,
        }
    }

    /// Creates a service identity.
    #[must_use]
    pub fn service(service_name: impl Into<String>) -> Self {
        Self::Service {
            service_name: service_name.into(),
        }
    }

    /// Returns `false` only for [`CallerIdentity::Anonymous`].
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        !matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// Never contains secrets.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::User { user_id, .. } => format!("user:{user_id}"),
            Self::Service { service_name } => format!("service:{service_name}"),
            Self::ApiKey { key_id, .. } => format!("apikey:{key_id}"),
            Self::Anonymous => "anonymous".to_string(),
        }
    }

    /// Returns roles used for authorization.
    ///
    /// - User: the roles field
    /// - ApiKey: scopes as pseudo-roles
    /// - Service: `service:<name>` as a single role
    /// - Anonymous: empty
    #[must_use]
    pub fn roles(&self) -> Vec<String> {
        match self {
            Self::User { roles, .. } => roles.clone(),
            Self::ApiKey { scopes, .. } => scopes.clone(),
            Self::Service { service_name } => vec![format!("service:{service_name}")],
            Self::Anonymous => Vec::new(),
        }
    }
}
