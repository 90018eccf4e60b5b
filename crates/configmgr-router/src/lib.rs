//! Segment tree path matcher for the Config manager.
//!
//! Routes are `(method, pattern)` pairs where a pattern is a sequence of
//! literal segments and `{name}` variables. Catch-all segments are not
//! supported. Registering the same `(method, pattern)` twice is an error
//! reported by [`Router::insert`], never a silent override.
//!
//! # Example
//!
//! ```rust
//! use configmgr_router::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.insert("/v1/configs", Method::GET, "config-list").unwrap();
//! router.insert("/v1/configs/{name}", Method::DELETE, "config-delete").unwrap();
//!
//! let m = router.match_route(&Method::DELETE, "/v1/configs/cfg1").unwrap();
//! assert_eq!(*m.value, "config-delete");
//! assert_eq!(m.params.get("name"), Some("cfg1"));
//! ```
//!
//! # Architecture
//!
//! ```text
//!            (root)
//!              │
//!             "v1"
//!              │
//!          "configs"  [GET, POST]
//!              │
//!           "{name}"  [GET, PUT, DELETE]
//! ```

mod error;
mod method_router;
mod node;
mod params;
mod router;

pub use error::RouteError;
pub use method_router::MethodRouter;
pub use node::{Node, SegmentKind};
pub use params::Params;
pub use router::Router;

use http::Method;

/// A matched route with its value and bound path variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'a, T> {
    /// The value registered for the route
    pub value: &'a T,
    /// Bound path variables
    pub params: Params,
}

impl<'a, T> RouteMatch<'a, T> {
    /// Creates a new route match.
    #[must_use]
    pub fn new(value: &'a T, params: Params) -> Self {
        Self { value, params }
    }
}

/// Result of resolving a request against the route table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a, T> {
    /// A route is bound for the method and path.
    Found(RouteMatch<'a, T>),
    /// The path is known but the method is not bound.
    MethodNotAllowed {
        /// Methods bound at the path.
        allowed: Vec<Method>,
    },
    /// No route matches the path.
    NotFound,
}
