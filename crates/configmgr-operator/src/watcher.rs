//! Lifecycle hooks.

use async_trait::async_trait;
use configmgr_core::{ConfigObject, ManagerResult, RequestContext};
use tracing::debug;

/// Side effects run for Config lifecycle events.
///
/// Implementations hold no delivery state; deduplication and error isolation
/// belong to [`Reconciler`](crate::Reconciler). A returned error is reported
/// to the [`ErrorSink`](crate::ErrorSink) and never retried.
#[async_trait]
pub trait ResourceWatcher: Send + Sync {
    /// An object appeared.
    async fn add(&self, ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()>;

    /// An object changed from `old` to `new`.
    async fn update(
        &self,
        ctx: &RequestContext,
        old: &ConfigObject,
        new: &ConfigObject,
    ) -> ManagerResult<()>;

    /// An object was removed.
    async fn delete(&self, ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()>;

    /// An object may have changed while events were not delivered.
    ///
    /// Implementations re-derive their state from `obj` alone.
    async fn sync(&self, ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()>;
}

/// Watcher that logs each event at debug level and does nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigWatcher;

impl ConfigWatcher {
    /// Creates the watcher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ResourceWatcher for ConfigWatcher {
    async fn add(&self, ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
        debug!(request_id = %ctx.request_id(), name = %obj.identifier.name(), "added resource");
        Ok(())
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        old: &ConfigObject,
        _new: &ConfigObject,
    ) -> ManagerResult<()> {
        debug!(request_id = %ctx.request_id(), name = %old.identifier.name(), "updated resource");
        Ok(())
    }

    async fn delete(&self, ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
        debug!(request_id = %ctx.request_id(), name = %obj.identifier.name(), "deleted resource");
        Ok(())
    }

    async fn sync(&self, ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
        debug!(
            request_id = %ctx.request_id(),
            name = %obj.identifier.name(),
            "possible resource update"
        );
        Ok(())
    }
}
