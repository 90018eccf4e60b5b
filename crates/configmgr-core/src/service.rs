//! The Service Facade.
//!
//! Handlers depend only on [`ConfigService`]; the concrete store is injected
//! per deployment through a [`ServiceProvider`].

use crate::context::RequestContext;
use crate::error::ManagerResult;
use crate::resource::{ConfigList, ConfigObject, ResourceIdentifier};
use async_trait::async_trait;
use std::sync::Arc;

/// CRUD access to Config objects in the resource store.
///
/// Errors may carry an explicit status code
/// ([`ManagerError::dependency_with_status`](crate::ManagerError::dependency_with_status));
/// the router forwards it verbatim.
#[async_trait]
pub trait ConfigService: Send + Sync {
    /// Lists objects in `namespace`. Filter tokens are opaque to callers.
    async fn list(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        filters: &[String],
    ) -> ManagerResult<ConfigList>;

    /// Fetches one object.
    async fn get(&self, ctx: &RequestContext, id: &ResourceIdentifier)
        -> ManagerResult<ConfigObject>;

    /// Creates an object and returns it with store-assigned metadata.
    async fn add(&self, ctx: &RequestContext, obj: ConfigObject) -> ManagerResult<ConfigObject>;

    /// Replaces an existing object.
    async fn update(
        &self,
        ctx: &RequestContext,
        id: &ResourceIdentifier,
        obj: ConfigObject,
    ) -> ManagerResult<ConfigObject>;

    /// Removes an object.
    async fn delete(&self, ctx: &RequestContext, id: &ResourceIdentifier) -> ManagerResult<()>;
}

/// Resolves the [`ConfigService`] for a request.
///
/// Resolution may depend on per-request credentials loaded by middleware,
/// so it is async and fallible.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Returns the service to use for this request.
    async fn config_service(&self, ctx: &RequestContext) -> ManagerResult<Arc<dyn ConfigService>>;
}

/// A provider that always returns the same service.
#[derive(Clone)]
pub struct StaticServiceProvider {
    service: Arc<dyn ConfigService>,
}

impl StaticServiceProvider {
    /// Wraps a service.
    #[must_use]
    pub fn new(service: Arc<dyn ConfigService>) -> Self {
        Self { service }
    }
}

impl std::fmt::Debug for StaticServiceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticServiceProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl ServiceProvider for StaticServiceProvider {
    async fn config_service(&self, _ctx: &RequestContext) -> ManagerResult<Arc<dyn ConfigService>> {
        Ok(Arc::clone(&self.service))
    }
}
