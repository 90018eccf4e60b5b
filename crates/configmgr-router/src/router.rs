//! High-level router API.

use http::Method;

use crate::error::RouteError;
use crate::node::Node;
use crate::{Lookup, RouteMatch};

/// A segment tree router mapping `(method, path)` to a route value.
///
/// The route table is built once at startup; matching takes `&self` and is
/// safe to share across threads when `T` is.
///
/// # Example
///
/// ```rust
/// use configmgr_router::{Lookup, Router};
/// use http::Method;
///
/// let mut router = Router::new();
/// router.insert("/v1/configs", Method::GET, "config-list").unwrap();
/// router.insert("/v1/configs/{name}", Method::GET, "config-get").unwrap();
///
/// let m = router.match_route(&Method::GET, "/v1/configs/cfg1").unwrap();
/// assert_eq!(*m.value, "config-get");
/// assert_eq!(m.params.get("name"), Some("cfg1"));
///
/// assert!(matches!(
///     router.lookup(&Method::DELETE, "/v1/configs"),
///     Lookup::MethodNotAllowed { .. }
/// ));
/// ```
///
/// # Route Priority
///
/// Literal segments win over `{param}` segments: `/configs/export` matches
/// before `/configs/{name}` for the path `/configs/export`.
#[derive(Debug, Clone)]
pub struct Router<T> {
    root: Node<T>,
    routes: Vec<(Method, String)>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::root(),
            routes: Vec::new(),
        }
    }

    /// Registers `value` for `(method, pattern)`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::Duplicate`] if the pair is already registered
    /// and [`RouteError::InvalidPattern`] if the pattern is malformed.
    pub fn insert(&mut self, pattern: &str, method: Method, value: T) -> Result<(), RouteError> {
        let canonical = self.root.insert(pattern, method.clone(), value)?;
        self.routes.push((method, canonical));
        Ok(())
    }

    /// Resolves a request to a route, distinguishing unknown paths from
    /// unbound methods.
    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        let Some((methods, params)) = self.root.match_path(path) else {
            return Lookup::NotFound;
        };
        match methods.get(method) {
            Some(value) => Lookup::Found(RouteMatch::new(value, params)),
            None => Lookup::MethodNotAllowed {
                allowed: methods.allowed_methods(),
            },
        }
    }

    /// Returns the match for `(method, path)`, if any.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_, T>> {
        match self.lookup(method, path) {
            Lookup::Found(m) => Some(m),
            Lookup::NotFound | Lookup::MethodNotAllowed { .. } => None,
        }
    }

    /// Returns the registered `(method, canonical pattern)` pairs in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|(m, p)| (m, p.as_str()))
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_router() -> Router<&'static str> {
        let mut router = Router::new();
        router.insert("/v1/configs", Method::GET, "config-list").unwrap();
        router.insert("/v1/configs", Method::POST, "config-create").unwrap();
        router.insert("/v1/configs/{name}", Method::GET, "config-get").unwrap();
        router.insert("/v1/configs/{name}", Method::PUT, "config-update").unwrap();
        router.insert("/v1/configs/{name}", Method::DELETE, "config-delete").unwrap();
        router
    }

    #[test]
    fn test_router_new() {
        let router: Router<()> = Router::new();
        assert!(router.is_empty());
        assert_eq!(router.len(), 0);
    }

    #[test]
    fn test_router_matches_each_route() {
        let router = config_router();
        let cases = [
            (Method::GET, "/v1/configs", "config-list"),
            (Method::POST, "/v1/configs", "config-create"),
            (Method::GET, "/v1/configs/cfg1", "config-get"),
            (Method::PUT, "/v1/configs/cfg1", "config-update"),
            (Method::DELETE, "/v1/configs/cfg1", "config-delete"),
        ];
        for (method, path, expected) in cases {
            let m = router.match_route(&method, path).unwrap();
            assert_eq!(*m.value, expected, "{method} {path}");
        }
        assert_eq!(router.len(), 5);
    }

    #[test]
    fn test_router_not_found() {
        let router = config_router();
        assert_eq!(router.lookup(&Method::GET, "/v2/configs"), Lookup::NotFound);
        assert_eq!(router.lookup(&Method::GET, "/v1/configs/a/b"), Lookup::NotFound);
    }

    #[test]
    fn test_router_method_not_allowed() {
        let router = config_router();
        match router.lookup(&Method::PATCH, "/v1/configs/cfg1") {
            Lookup::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::PUT, Method::DELETE]);
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_router_duplicate_registration_fails() {
        let mut router = config_router();
        let err = router
            .insert("/v1/configs/{name}", Method::GET, "shadow")
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));
        assert_eq!(router.len(), 5);

        let m = router.match_route(&Method::GET, "/v1/configs/x").unwrap();
        assert_eq!(*m.value, "config-get");
    }

    #[test]
    fn test_router_trailing_slash_is_normalized() {
        let router = config_router();
        let m = router.match_route(&Method::GET, "/v1/configs/").unwrap();
        assert_eq!(*m.value, "config-list");
    }

    #[test]
    fn test_router_routes_listing() {
        let router = config_router();
        let first = router.routes().next().unwrap();
        assert_eq!(first, (&Method::GET, "/v1/configs"));
    }
}
