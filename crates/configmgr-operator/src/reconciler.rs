//! Delivery discipline for lifecycle events.
//!
//! The watch feed may redeliver events, coalesce several updates into one,
//! or resume after a gap with [`LifecycleEvent::PossiblyChanged`]. The
//! [`Reconciler`] remembers the last version it processed for every
//! identifier and turns that feed into at most one hook call per observed
//! state.
//!
//! | Event | Known at same version | Known at other version | Tombstone, same version | Unknown |
//! |-------|-----------------------|------------------------|-------------------------|---------|
//! | added | skip | `update(last, new)` | skip | `add` |
//! | updated | skip | `update(last, new)` | `update(old, new)` | `update(old, new)` |
//! | deleted | `delete` | `delete` | skip | `delete` |
//! | possibly changed | `sync` | `sync` | `sync` | `sync` |
//!
//! Versions only compare equal when both sides carry one; objects without a
//! resource version are never deduplicated.
//!
//! Tombstones are bounded: once more than the limit are held, the oldest is
//! forgotten and a late event for it is treated as unknown.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use configmgr_core::{
    panic_message, ConfigObject, EventKind, LifecycleEvent, ManagerError, ManagerResult, RequestContext,
    ResourceIdentifier,
};
use configmgr_telemetry::metrics::{record_reconcile_error, record_reconcile_event};
use futures_util::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, info_span, Instrument, Span};

use crate::sink::{ErrorSink, LoggingErrorSink};
use crate::watcher::ResourceWatcher;

/// What the reconciler did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The hook ran and succeeded.
    Processed,
    /// The event repeated an already processed state; no hook ran.
    Skipped,
    /// The hook returned an error or panicked. The state still counts as processed.
    Failed,
}

impl Outcome {
    /// Metric label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tombstones kept by default before the oldest is evicted.
pub const DEFAULT_TOMBSTONE_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
enum Tracked {
    Live(ConfigObject),
    Deleted(Option<String>),
}

#[derive(Debug, Default)]
struct Ledger {
    entries: HashMap<ResourceIdentifier, Tracked>,
    // Deletion order of the current tombstones, oldest first.
    tombstones: VecDeque<ResourceIdentifier>,
}

impl Ledger {
    fn get(&self, id: &ResourceIdentifier) -> Option<&Tracked> {
        self.entries.get(id)
    }

    fn live(&mut self, obj: &ConfigObject) {
        let previous = self
            .entries
            .insert(obj.identifier.clone(), Tracked::Live(obj.clone()));
        if matches!(previous, Some(Tracked::Deleted(_))) {
            self.tombstones.retain(|id| id != &obj.identifier);
        }
    }

    fn tombstone(&mut self, id: &ResourceIdentifier, version: Option<String>, limit: usize) {
        let previous = self.entries.insert(id.clone(), Tracked::Deleted(version));
        if !matches!(previous, Some(Tracked::Deleted(_))) {
            self.tombstones.push_back(id.clone());
        }
        while self.tombstones.len() > limit {
            if let Some(evicted) = self.tombstones.pop_front() {
                self.entries.remove(&evicted);
                debug!(id = %evicted, "evicted tombstone");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Add,
    Update,
    Delete,
    Sync,
}

impl Hook {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Sync => "sync",
        }
    }

    fn span(self, obj: &ConfigObject) -> Span {
        let id = &obj.identifier;
        let version = obj.resource_version().unwrap_or("");
        match self {
            Self::Add => info_span!(
                "watcher-add",
                namespace = %id.namespace(),
                name = %id.name(),
                resource_version = %version
            ),
            Self::Update => info_span!(
                "watcher-update",
                namespace = %id.namespace(),
                name = %id.name(),
                resource_version = %version
            ),
            Self::Delete => info_span!(
                "watcher-delete",
                namespace = %id.namespace(),
                name = %id.name(),
                resource_version = %version
            ),
            Self::Sync => info_span!(
                "watcher-sync",
                namespace = %id.namespace(),
                name = %id.name(),
                resource_version = %version
            ),
        }
    }
}

fn same_version(a: Option<&str>, b: Option<&str>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

/// Wraps a [`ResourceWatcher`] with deduplication, tombstones and error
/// isolation.
///
/// Events for one identifier must be delivered sequentially; the
/// [`Operator`](crate::Operator) loop does this.
///
/// # Example
///
/// ```
/// use configmgr_core::{ConfigObject, RequestContext, ResourceIdentifier};
/// use configmgr_operator::{ConfigWatcher, Outcome, Reconciler};
///
/// # tokio_test::block_on(async {
/// let reconciler = Reconciler::new(ConfigWatcher::new());
/// let ctx = RequestContext::new();
/// let mut obj = ConfigObject::new(ResourceIdentifier::new("ns1", "cfg1"), serde_json::json!({}));
/// obj.metadata.resource_version = Some("1".to_string());
///
/// assert_eq!(reconciler.on_added(&ctx, obj.clone()).await, Outcome::Processed);
/// assert_eq!(reconciler.on_added(&ctx, obj).await, Outcome::Skipped);
/// # });
/// ```
pub struct Reconciler<W> {
    watcher: W,
    sink: Arc<dyn ErrorSink>,
    state: Mutex<Ledger>,
    tombstone_limit: usize,
}

impl<W> std::fmt::Debug for Reconciler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("tracked", &self.state.lock().entries.len())
            .field("tombstone_limit", &self.tombstone_limit)
            .finish_non_exhaustive()
    }
}

impl<W: ResourceWatcher> Reconciler<W> {
    /// Wraps `watcher`, reporting failures to [`LoggingErrorSink`].
    pub fn new(watcher: W) -> Self {
        Self {
            watcher,
            sink: Arc::new(LoggingErrorSink),
            state: Mutex::new(Ledger::default()),
            tombstone_limit: DEFAULT_TOMBSTONE_LIMIT,
        }
    }

    /// Caps the number of tombstones held. Defaults to
    /// [`DEFAULT_TOMBSTONE_LIMIT`].
    #[must_use]
    pub fn with_tombstone_limit(mut self, limit: usize) -> Self {
        self.tombstone_limit = limit;
        self
    }

    /// Replaces the error sink.
    #[must_use]
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Returns the wrapped watcher.
    pub const fn watcher(&self) -> &W {
        &self.watcher
    }

    /// Returns the last processed version of a live object.
    ///
    /// `None` for unknown or deleted identifiers.
    pub fn processed_version(&self, id: &ResourceIdentifier) -> Option<ConfigObject> {
        match self.state.lock().get(id) {
            Some(Tracked::Live(obj)) => Some(obj.clone()),
            _ => None,
        }
    }

    /// Returns `true` if `id` was deleted and not seen since.
    pub fn is_tombstoned(&self, id: &ResourceIdentifier) -> bool {
        matches!(self.state.lock().get(id), Some(Tracked::Deleted(_)))
    }

    /// Returns the number of identifiers remembered, tombstones included.
    pub fn tracked_len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Returns the number of tombstones held.
    pub fn tombstone_count(&self) -> usize {
        self.state.lock().tombstones.len()
    }

    /// Dispatches one event to its entry point.
    pub async fn handle(&self, ctx: &RequestContext, event: LifecycleEvent) -> Outcome {
        match event {
            LifecycleEvent::Added(obj) => self.on_added(ctx, obj).await,
            LifecycleEvent::Updated { old, new } => self.on_updated(ctx, old, new).await,
            LifecycleEvent::Deleted(obj) => self.on_deleted(ctx, obj).await,
            LifecycleEvent::PossiblyChanged(obj) => self.on_resync(ctx, obj).await,
        }
    }

    /// Handles an added event.
    ///
    /// An identifier already known at another version is reconciled as an
    /// update from the last processed object.
    pub async fn on_added(&self, ctx: &RequestContext, obj: ConfigObject) -> Outcome {
        let previous = self.state.lock().get(&obj.identifier).cloned();

        let outcome = match previous {
            Some(Tracked::Live(last))
                if same_version(last.resource_version(), obj.resource_version()) =>
            {
                Outcome::Skipped
            }
            Some(Tracked::Deleted(version))
                if same_version(version.as_deref(), obj.resource_version()) =>
            {
                Outcome::Skipped
            }
            Some(Tracked::Live(last)) => {
                debug!(id = %obj.identifier, "added event for known object, reconciling as update");
                let result = self
                    .invoke(ctx, Hook::Update, &obj, self.watcher.update(ctx, &last, &obj))
                    .await;
                self.remember_live(&obj);
                result
            }
            Some(Tracked::Deleted(_)) | None => {
                let result = self
                    .invoke(ctx, Hook::Add, &obj, self.watcher.add(ctx, &obj))
                    .await;
                self.remember_live(&obj);
                result
            }
        };

        Self::record(EventKind::Added, &obj.identifier, outcome);
        outcome
    }

    /// Handles an updated event.
    ///
    /// The hook receives the last processed object as `old` when one is
    /// known, otherwise the `old` carried by the event.
    pub async fn on_updated(
        &self,
        ctx: &RequestContext,
        old: ConfigObject,
        new: ConfigObject,
    ) -> Outcome {
        let previous = self.state.lock().get(&new.identifier).cloned();

        let outcome = match previous {
            Some(Tracked::Live(last))
                if same_version(last.resource_version(), new.resource_version()) =>
            {
                Outcome::Skipped
            }
            Some(Tracked::Live(last)) => {
                let result = self
                    .invoke(ctx, Hook::Update, &new, self.watcher.update(ctx, &last, &new))
                    .await;
                self.remember_live(&new);
                result
            }
            Some(Tracked::Deleted(_)) | None => {
                let result = self
                    .invoke(ctx, Hook::Update, &new, self.watcher.update(ctx, &old, &new))
                    .await;
                self.remember_live(&new);
                result
            }
        };

        Self::record(EventKind::Updated, &new.identifier, outcome);
        outcome
    }

    /// Handles a deleted event and leaves a tombstone for the identifier.
    pub async fn on_deleted(&self, ctx: &RequestContext, obj: ConfigObject) -> Outcome {
        let previous = self.state.lock().get(&obj.identifier).cloned();

        let outcome = match previous {
            Some(Tracked::Deleted(version))
                if same_version(version.as_deref(), obj.resource_version()) =>
            {
                Outcome::Skipped
            }
            _ => {
                let result = self
                    .invoke(ctx, Hook::Delete, &obj, self.watcher.delete(ctx, &obj))
                    .await;
                self.state.lock().tombstone(
                    &obj.identifier,
                    obj.metadata.resource_version.clone(),
                    self.tombstone_limit,
                );
                result
            }
        };

        Self::record(EventKind::Deleted, &obj.identifier, outcome);
        outcome
    }

    /// Handles a resync event. Never skipped.
    pub async fn on_resync(&self, ctx: &RequestContext, obj: ConfigObject) -> Outcome {
        let outcome = self
            .invoke(ctx, Hook::Sync, &obj, self.watcher.sync(ctx, &obj))
            .await;
        self.remember_live(&obj);

        Self::record(EventKind::PossiblyChanged, &obj.identifier, outcome);
        outcome
    }

    fn remember_live(&self, obj: &ConfigObject) {
        self.state.lock().live(obj);
    }

    async fn invoke<F>(&self, ctx: &RequestContext, hook: Hook, obj: &ConfigObject, fut: F) -> Outcome
    where
        F: Future<Output = ManagerResult<()>> + Send,
    {
        let result = AssertUnwindSafe(fut)
            .catch_unwind()
            .instrument(hook.span(obj))
            .await;

        let error = match result {
            Ok(Ok(())) => return Outcome::Processed,
            Ok(Err(ManagerError::Callback { message, source })) => {
                ManagerError::Callback { message, source }
            }
            Ok(Err(err)) => ManagerError::callback_with_source(
                format!("{} hook failed for {}", hook.as_str(), obj.identifier),
                err,
            ),
            Err(payload) => ManagerError::callback(format!(
                "{} hook panicked for {}: {}",
                hook.as_str(),
                obj.identifier,
                panic_message(payload.as_ref())
            )),
        };

        self.sink.report(ctx, &error);
        Outcome::Failed
    }

    fn record(kind: EventKind, id: &ResourceIdentifier, outcome: Outcome) {
        debug!(event = %kind, id = %id, outcome = %outcome, "reconciled event");
        record_reconcile_event(kind.as_str(), outcome.as_str());
        if outcome == Outcome::Failed {
            record_reconcile_error(kind.as_str());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FnErrorSink;
    use async_trait::async_trait;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Add(String),
        Update(String, String),
        Delete(String),
        Sync(String),
    }

    fn version(obj: &ConfigObject) -> String {
        obj.resource_version().unwrap_or("-").to_string()
    }

    #[derive(Default)]
    struct Recording {
        calls: Mutex<Vec<Call>>,
        fail_add: bool,
        panic_update: bool,
    }

    impl Recording {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl ResourceWatcher for Recording {
        async fn add(&self, _ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
            self.calls.lock().push(Call::Add(version(obj)));
            if self.fail_add {
                return Err(ManagerError::dependency("downstream unavailable"));
            }
            Ok(())
        }

        async fn update(
            &self,
            _ctx: &RequestContext,
            old: &ConfigObject,
            new: &ConfigObject,
        ) -> ManagerResult<()> {
            self.calls.lock().push(Call::Update(version(old), version(new)));
            assert!(!self.panic_update, "update hook exploded");
            Ok(())
        }

        async fn delete(&self, _ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
            self.calls.lock().push(Call::Delete(version(obj)));
            Ok(())
        }

        async fn sync(&self, _ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
            self.calls.lock().push(Call::Sync(version(obj)));
            Ok(())
        }
    }

    fn obj(name: &str, version: &str) -> ConfigObject {
        let mut obj = ConfigObject::new(ResourceIdentifier::new("ns1", name), json!({}));
        obj.metadata.resource_version = Some(version.to_string());
        obj
    }

    fn add(v: &str) -> Call {
        Call::Add(v.to_string())
    }

    fn update(old: &str, new: &str) -> Call {
        Call::Update(old.to_string(), new.to_string())
    }

    #[tokio::test]
    async fn test_added_is_idempotent_per_version() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();

        assert_eq!(reconciler.on_added(&ctx, obj("a", "1")).await, Outcome::Processed);
        assert_eq!(reconciler.on_added(&ctx, obj("a", "1")).await, Outcome::Skipped);
        assert_eq!(reconciler.watcher().calls(), vec![add("1")]);
    }

    #[tokio::test]
    async fn test_added_at_new_version_becomes_update() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();

        reconciler.on_added(&ctx, obj("a", "1")).await;
        assert_eq!(reconciler.on_added(&ctx, obj("a", "3")).await, Outcome::Processed);
        assert_eq!(reconciler.watcher().calls(), vec![add("1"), update("1", "3")]);
    }

    #[tokio::test]
    async fn test_update_uses_last_processed_as_old() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();

        reconciler.on_added(&ctx, obj("a", "1")).await;
        // The feed coalesced versions 2 and 3 and reports 2 as old.
        reconciler.on_updated(&ctx, obj("a", "2"), obj("a", "3")).await;
        assert_eq!(
            reconciler.on_updated(&ctx, obj("a", "2"), obj("a", "3")).await,
            Outcome::Skipped
        );

        assert_eq!(reconciler.watcher().calls(), vec![add("1"), update("1", "3")]);
    }

    #[tokio::test]
    async fn test_update_for_unknown_object_uses_event_old() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();

        reconciler.on_updated(&ctx, obj("a", "4"), obj("a", "5")).await;
        assert_eq!(reconciler.watcher().calls(), vec![update("4", "5")]);
        assert_eq!(
            reconciler
                .processed_version(&ResourceIdentifier::new("ns1", "a"))
                .and_then(|o| o.metadata.resource_version),
            Some("5".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_leaves_tombstone() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();
        let id = ResourceIdentifier::new("ns1", "a");

        reconciler.on_added(&ctx, obj("a", "1")).await;
        assert_eq!(reconciler.on_deleted(&ctx, obj("a", "1")).await, Outcome::Processed);
        assert!(reconciler.is_tombstoned(&id));
        assert!(reconciler.processed_version(&id).is_none());

        assert_eq!(reconciler.on_deleted(&ctx, obj("a", "1")).await, Outcome::Skipped);
        // A stale add of the deleted version does not resurrect the object.
        assert_eq!(reconciler.on_added(&ctx, obj("a", "1")).await, Outcome::Skipped);

        assert_eq!(reconciler.on_added(&ctx, obj("a", "7")).await, Outcome::Processed);
        assert!(!reconciler.is_tombstoned(&id));
        assert_eq!(
            reconciler.watcher().calls(),
            vec![add("1"), Call::Delete("1".to_string()), add("7")]
        );
    }

    #[tokio::test]
    async fn test_tombstones_are_bounded() {
        let reconciler = Reconciler::new(Recording::default()).with_tombstone_limit(2);
        let ctx = RequestContext::new();

        for name in ["a", "b", "c", "d"] {
            reconciler.on_added(&ctx, obj(name, "1")).await;
        }
        assert_eq!(reconciler.tracked_len(), 4);

        for name in ["a", "b", "c"] {
            reconciler.on_deleted(&ctx, obj(name, "1")).await;
        }
        assert_eq!(reconciler.tombstone_count(), 2);
        assert_eq!(reconciler.tracked_len(), 3);
        assert!(!reconciler.is_tombstoned(&ResourceIdentifier::new("ns1", "a")));
        assert!(reconciler.is_tombstoned(&ResourceIdentifier::new("ns1", "b")));

        // Re-adding clears the tombstone without evicting another.
        reconciler.on_added(&ctx, obj("b", "2")).await;
        assert_eq!(reconciler.tombstone_count(), 1);
        reconciler.on_deleted(&ctx, obj("d", "1")).await;
        assert_eq!(reconciler.tombstone_count(), 2);
        assert!(reconciler.is_tombstoned(&ResourceIdentifier::new("ns1", "c")));
        assert_eq!(reconciler.tracked_len(), 3);

        // The evicted identifier is unknown again.
        assert_eq!(reconciler.on_deleted(&ctx, obj("a", "1")).await, Outcome::Processed);
        assert!(!reconciler.is_tombstoned(&ResourceIdentifier::new("ns1", "c")));
        assert_eq!(reconciler.tracked_len(), 3);
    }

    #[tokio::test]
    async fn test_resync_always_calls_sync() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();

        reconciler.on_added(&ctx, obj("a", "1")).await;
        assert_eq!(reconciler.on_resync(&ctx, obj("a", "1")).await, Outcome::Processed);
        assert_eq!(reconciler.on_resync(&ctx, obj("a", "2")).await, Outcome::Processed);
        // The resync recorded version 2, so a late added event for it is a duplicate.
        assert_eq!(reconciler.on_added(&ctx, obj("a", "2")).await, Outcome::Skipped);

        assert_eq!(
            reconciler.watcher().calls(),
            vec![add("1"), Call::Sync("1".to_string()), Call::Sync("2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_objects_without_version_are_not_deduplicated() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();
        let unversioned = ConfigObject::new(ResourceIdentifier::new("ns1", "a"), json!({}));

        reconciler.on_added(&ctx, unversioned.clone()).await;
        assert_eq!(reconciler.on_added(&ctx, unversioned).await, Outcome::Processed);
        assert_eq!(reconciler.watcher().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_hook_error_is_reported_and_version_recorded() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&errors);
        let sink = FnErrorSink::new(move |_: &RequestContext, err: &ManagerError| {
            captured.lock().push((err.category(), err.message().to_string()));
        });
        let watcher = Recording {
            fail_add: true,
            ..Recording::default()
        };
        let reconciler = Reconciler::new(watcher).with_error_sink(Arc::new(sink));
        let ctx = RequestContext::new();

        assert_eq!(reconciler.on_added(&ctx, obj("a", "1")).await, Outcome::Failed);
        assert_eq!(reconciler.on_added(&ctx, obj("a", "1")).await, Outcome::Skipped);

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, configmgr_core::ErrorCategory::Callback);
        assert_eq!(errors[0].1, "add hook failed for ns1/a");
    }

    #[tokio::test]
    async fn test_hook_panic_is_isolated() {
        let errors = Arc::new(Mutex::new(Vec::new()));
        let captured = Arc::clone(&errors);
        let sink = FnErrorSink::new(move |_: &RequestContext, err: &ManagerError| {
            captured.lock().push(err.message().to_string());
        });
        let watcher = Recording {
            panic_update: true,
            ..Recording::default()
        };
        let reconciler = Reconciler::new(watcher).with_error_sink(Arc::new(sink));
        let ctx = RequestContext::new();

        reconciler.on_added(&ctx, obj("a", "1")).await;
        assert_eq!(
            reconciler.on_updated(&ctx, obj("a", "1"), obj("a", "2")).await,
            Outcome::Failed
        );
        assert_eq!(reconciler.on_deleted(&ctx, obj("a", "2")).await, Outcome::Processed);

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("update hook panicked for ns1/a"));
        assert!(errors[0].contains("update hook exploded"));
    }

    #[tokio::test]
    async fn test_handle_dispatches_every_variant() {
        let reconciler = Reconciler::new(Recording::default());
        let ctx = RequestContext::new();

        reconciler.handle(&ctx, LifecycleEvent::Added(obj("a", "1"))).await;
        reconciler
            .handle(&ctx, LifecycleEvent::updated(obj("a", "1"), obj("a", "2")).unwrap())
            .await;
        reconciler.handle(&ctx, LifecycleEvent::PossiblyChanged(obj("a", "2"))).await;
        reconciler.handle(&ctx, LifecycleEvent::Deleted(obj("a", "2"))).await;

        assert_eq!(
            reconciler.watcher().calls(),
            vec![
                add("1"),
                update("1", "2"),
                Call::Sync("2".to_string()),
                Call::Delete("2".to_string())
            ]
        );
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Processed.to_string(), "processed");
        assert_eq!(Outcome::Skipped.as_str(), "skipped");
        assert_eq!(Outcome::Failed.as_str(), "failed");
    }
}
