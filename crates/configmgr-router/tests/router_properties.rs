//! Property-based tests for the route table.
//!
//! - every registered route resolves to exactly its own value
//! - re-registering a `(method, pattern)` pair always fails and never
//!   replaces the original binding

use configmgr_router::{Lookup, RouteError, Router};
use http::Method;
use proptest::prelude::*;
use std::collections::BTreeSet;

fn literal_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,8}").unwrap()
}

fn path_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(literal_strategy(), 1..4)
}

fn method_strategy() -> impl Strategy<Value = Method> {
    prop::sample::select(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE])
}

proptest! {
    #[test]
    fn each_route_dispatches_to_its_own_value(
        routes in prop::collection::vec((method_strategy(), path_strategy()), 1..20),
    ) {
        let mut router = Router::new();
        let mut registered = BTreeSet::new();

        for (idx, (method, segments)) in routes.iter().enumerate() {
            let pattern = format!("/{}", segments.join("/"));
            let fresh = registered.insert((method.to_string(), pattern.clone()));
            let result = router.insert(&pattern, method.clone(), idx);
            prop_assert_eq!(result.is_ok(), fresh);
        }

        for (method, pattern) in &registered {
            let method: Method = method.parse().unwrap();
            let expected = routes
                .iter()
                .position(|(m, s)| *m == method && format!("/{}", s.join("/")) == *pattern)
                .unwrap();
            match router.lookup(&method, pattern) {
                Lookup::Found(m) => prop_assert_eq!(*m.value, expected),
                other => prop_assert!(false, "unexpected lookup {:?}", other),
            }
        }
    }

    #[test]
    fn variable_segment_binds_any_literal(
        prefix in path_strategy(),
        value in literal_strategy(),
    ) {
        let pattern = format!("/{}/{{name}}", prefix.join("/"));
        let mut router = Router::new();
        router.insert(&pattern, Method::GET, ()).unwrap();

        let path = format!("/{}/{}", prefix.join("/"), value);
        let m = router.match_route(&Method::GET, &path).unwrap();
        prop_assert_eq!(m.params.get("name"), Some(value.as_str()));
    }

    #[test]
    fn duplicate_never_overrides(
        method in method_strategy(),
        segments in path_strategy(),
    ) {
        let pattern = format!("/{}", segments.join("/"));
        let mut router = Router::new();
        router.insert(&pattern, method.clone(), "first").unwrap();

        let err = router.insert(&pattern, method.clone(), "second").unwrap_err();
        let is_duplicate = matches!(err, RouteError::Duplicate { .. });
        prop_assert!(is_duplicate);
        let m = router.match_route(&method, &pattern).unwrap();
        prop_assert_eq!(*m.value, "first");
    }
}
