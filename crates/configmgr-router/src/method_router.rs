//! Per-path method table.

use http::Method;
use smallvec::SmallVec;

/// Maps HTTP methods to route values for a single path.
///
/// Each method may be bound once; a second binding is rejected so that
/// duplicate routes surface at registration time.
///
/// # Example
///
/// ```rust
/// use configmgr_router::MethodRouter;
/// use http::Method;
///
/// let mut methods = MethodRouter::new();
/// assert!(methods.insert(Method::GET, "config-get").is_ok());
/// assert!(methods.insert(Method::GET, "again").is_err());
///
/// assert_eq!(methods.get(&Method::GET), Some(&"config-get"));
/// assert_eq!(methods.get(&Method::POST), None);
/// ```
#[derive(Debug, Clone)]
pub struct MethodRouter<T> {
    entries: SmallVec<[(Method, T); 4]>,
}

impl<T> Default for MethodRouter<T> {
    fn default() -> Self {
        Self {
            entries: SmallVec::new(),
        }
    }
}

impl<T> MethodRouter<T> {
    /// Creates an empty method table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `value` to `method`.
    ///
    /// Returns the value back if the method is already bound.
    pub fn insert(&mut self, method: Method, value: T) -> Result<(), T> {
        if self.contains(&method) {
            return Err(value);
        }
        self.entries.push((method, value));
        Ok(())
    }

    /// Returns the value bound to `method`.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&T> {
        self.entries
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, v)| v)
    }

    /// Returns true if `method` is bound.
    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.entries.iter().any(|(m, _)| m == method)
    }

    /// Returns true if any method is bound.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Returns the bound methods in registration order.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        self.entries.iter().map(|(m, _)| m.clone()).collect()
    }
}
