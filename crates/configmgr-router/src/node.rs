//! Segment tree node.
//!
//! Each node is one path segment. Static children are kept sorted for binary
//! search; each node has at most one `{param}` child.

use crate::error::RouteError;
use crate::method_router::MethodRouter;
use crate::params::Params;
use http::Method;

/// Type of path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal segment (e.g., "configs", "v1")
    Static,
    /// Named variable (e.g., "{name}")
    Param(String),
}

/// A node in the segment tree.
#[derive(Debug, Clone)]
pub struct Node<T> {
    /// The raw segment this node represents
    pub segment: String,

    /// Static or variable segment
    pub kind: SegmentKind,

    /// Routes ending at this node
    pub methods: MethodRouter<T>,

    /// Static children, sorted by segment
    pub static_children: Vec<Node<T>>,

    /// Variable child (at most one per node)
    pub param_child: Option<Box<Node<T>>>,
}

impl<T> Node<T> {
    /// Creates a static node.
    #[must_use]
    pub fn new_static(segment: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            kind: SegmentKind::Static,
            methods: MethodRouter::new(),
            static_children: Vec::new(),
            param_child: None,
        }
    }

    /// Creates a variable node.
    #[must_use]
    pub fn new_param(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            segment: format!("{{{name}}}"),
            kind: SegmentKind::Param(name),
            methods: MethodRouter::new(),
            static_children: Vec::new(),
            param_child: None,
        }
    }

    /// Creates the root node.
    #[must_use]
    pub fn root() -> Self {
        Self::new_static("")
    }

    /// Inserts a route, returning the canonical pattern it was stored under.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] for unparsable patterns or a variable
    /// name that conflicts with one already registered at the same position;
    /// [`RouteError::Duplicate`] if `method` is already bound at this path.
    pub fn insert(&mut self, pattern: &str, method: Method, value: T) -> Result<String, RouteError> {
        let segments = parse_pattern(pattern)?;
        let canonical = canonical_pattern(&segments);

        let target = self.descend_or_create(&segments, pattern)?;
        target
            .methods
            .insert(method.clone(), value)
            .map_err(|_| RouteError::Duplicate {
                method,
                pattern: canonical.clone(),
            })?;
        Ok(canonical)
    }

    fn descend_or_create(
        &mut self,
        segments: &[(String, SegmentKind)],
        pattern: &str,
    ) -> Result<&mut Self, RouteError> {
        let Some(((segment, kind), remaining)) = segments.split_first() else {
            return Ok(self);
        };

        match kind {
            SegmentKind::Static => {
                let idx = match self
                    .static_children
                    .binary_search_by(|c| c.segment.as_str().cmp(segment))
                {
                    Ok(idx) => idx,
                    Err(idx) => {
                        self.static_children.insert(idx, Node::new_static(segment.clone()));
                        idx
                    }
                };
                self.static_children[idx].descend_or_create(remaining, pattern)
            }
            SegmentKind::Param(name) => {
                let child = self
                    .param_child
                    .get_or_insert_with(|| Box::new(Node::new_param(name.clone())));
                if child.kind != *kind {
                    return Err(RouteError::invalid(
                        pattern,
                        format!("variable '{{{name}}}' conflicts with '{}'", child.segment),
                    ));
                }
                child.descend_or_create(remaining, pattern)
            }
        }
    }

    /// Matches a concrete path against the tree.
    ///
    /// Returns the method table and bound variables of the first route whose
    /// segments match, preferring literal segments over variables.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<(&MethodRouter<T>, Params)> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut params = Params::new();
        let methods = self.match_segments(&segments, &mut params)?;
        Some((methods, params))
    }

    fn match_segments(&self, segments: &[&str], params: &mut Params) -> Option<&MethodRouter<T>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.methods.has_any_method().then_some(&self.methods);
        };

        if let Some(child) = self.find_static_child(segment) {
            if let Some(found) = child.match_segments(remaining, params) {
                return Some(found);
            }
        }

        if let Some(child) = &self.param_child {
            if let SegmentKind::Param(name) = &child.kind {
                let mark = params.len();
                params.push(name.clone(), *segment);
                if let Some(found) = child.match_segments(remaining, params) {
                    return Some(found);
                }
                params.truncate(mark);
            }
        }

        None
    }

    fn find_static_child(&self, segment: &str) -> Option<&Self> {
        self.static_children
            .binary_search_by(|c| c.segment.as_str().cmp(segment))
            .ok()
            .map(|i| &self.static_children[i])
    }
}

/// Parses a registration pattern into segments.
///
/// Patterns must start with `/`. Segments are literals or `{name}` where
/// `name` is ASCII alphanumeric, `_` or `-`. A trailing `/` is ignored.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<(String, SegmentKind)>, RouteError> {
    let Some(body) = pattern.strip_prefix('/') else {
        return Err(RouteError::invalid(pattern, "pattern must start with '/'"));
    };
    let body = body.strip_suffix('/').unwrap_or(body);
    if body.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut seen_params: Vec<&str> = Vec::new();
    for raw in body.split('/') {
        if raw.is_empty() {
            return Err(RouteError::invalid(pattern, "empty path segment"));
        }
        if raw.starts_with('*') {
            return Err(RouteError::invalid(pattern, "catch-all segments are not supported"));
        }
        if let Some(name) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(RouteError::invalid(pattern, format!("bad variable name in '{raw}'")));
            }
            if seen_params.contains(&name) {
                return Err(RouteError::invalid(pattern, format!("variable '{name}' bound twice")));
            }
            seen_params.push(name);
            segments.push((raw.to_string(), SegmentKind::Param(name.to_string())));
        } else if raw.contains(['{', '}']) {
            return Err(RouteError::invalid(pattern, format!("unbalanced braces in '{raw}'")));
        } else {
            segments.push((raw.to_string(), SegmentKind::Static));
        }
    }
    Ok(segments)
}

fn canonical_pattern(segments: &[(String, SegmentKind)]) -> String {
    let mut out = String::new();
    for (segment, _) in segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_new_param() {
        let node: Node<()> = Node::new_param("name");
        assert_eq!(node.segment, "{name}");
        assert_eq!(node.kind, SegmentKind::Param("name".to_string()));
    }

    #[test]
    fn test_parse_pattern_static_and_param() {
        let segments = parse_pattern("/v1/configs/{name}").unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], ("v1".to_string(), SegmentKind::Static));
        assert_eq!(
            segments[2],
            ("{name}".to_string(), SegmentKind::Param("name".to_string()))
        );
    }

    #[test]
    fn test_parse_pattern_root_and_trailing_slash() {
        assert!(parse_pattern("/").unwrap().is_empty());
        assert_eq!(parse_pattern("/v1/configs/").unwrap().len(), 2);
    }

    #[test]
    fn test_parse_pattern_rejects_malformed() {
        for bad in [
            "v1/configs",
            "/files/*path",
            "/configs/{}",
            "/configs/{name",
            "/configs/na}me",
            "/a//b",
            "/{x}/{x}",
        ] {
            assert!(
                matches!(parse_pattern(bad), Err(RouteError::InvalidPattern { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_insert_and_match_param() {
        let mut root = Node::root();
        root.insert("/v1/configs/{name}", Method::GET, "config-get").unwrap();

        let (methods, params) = root.match_path("/v1/configs/cfg1").unwrap();
        assert_eq!(methods.get(&Method::GET), Some(&"config-get"));
        assert_eq!(params.get("name"), Some("cfg1"));
    }

    #[test]
    fn test_insert_returns_canonical_pattern() {
        let mut root = Node::root();
        assert_eq!(root.insert("/v1/configs/", Method::GET, ()).unwrap(), "/v1/configs");
        assert_eq!(root.insert("/", Method::GET, ()).unwrap(), "/");
    }

    #[test]
    fn test_duplicate_detected_across_spellings() {
        let mut root = Node::root();
        root.insert("/v1/configs", Method::GET, 1).unwrap();
        let err = root.insert("/v1/configs/", Method::GET, 2).unwrap_err();
        assert_eq!(
            err,
            RouteError::Duplicate {
                method: Method::GET,
                pattern: "/v1/configs".to_string()
            }
        );
    }

    #[test]
    fn test_conflicting_variable_names() {
        let mut root = Node::root();
        root.insert("/configs/{name}", Method::GET, 1).unwrap();
        let err = root.insert("/configs/{id}", Method::PUT, 2).unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
    }

    #[test]
    fn test_static_priority_with_backtracking() {
        let mut root = Node::root();
        root.insert("/configs/export/all", Method::GET, "export").unwrap();
        root.insert("/configs/{name}/status", Method::GET, "status").unwrap();

        let (methods, params) = root.match_path("/configs/export/status").unwrap();
        assert_eq!(methods.get(&Method::GET), Some(&"status"));
        assert_eq!(params.get("name"), Some("export"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn test_intermediate_node_is_not_a_route() {
        let mut root = Node::root();
        root.insert("/v1/configs", Method::GET, ()).unwrap();
        assert!(root.match_path("/v1").is_none());
        assert!(root.match_path("/v1/configs/a/b").is_none());
    }
}
