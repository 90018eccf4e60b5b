//! In-memory resource store.
//!
//! [`MemoryStore`] implements [`ConfigService`] and publishes a
//! [`LifecycleEvent`] for every effective write, in write order. It backs the
//! bundled binary and doubles as the store fake in tests.
//!
//! Every write bumps a store-wide revision; an object's `resource_version`
//! is the revision of its last write. Writes that change nothing are not
//! stored and emit nothing.
//!
//! Publishing never waits on the subscriber. When the event channel is full
//! the event is dropped and the store is flagged as needing a resync; the
//! next [`MemoryStore::resync`] sweep republishes every object.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use configmgr_core::{
    ConfigList, ConfigObject, ConfigService, LifecycleEvent, ManagerError, ManagerResult,
    RequestContext, ResourceIdentifier,
};
use parking_lot::RwLock;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

/// A parsed list filter token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelFilter {
    /// `key:value` or `key=value`: the label must have this value.
    Equals {
        /// Label key.
        key: String,
        /// Required value.
        value: String,
    },
    /// `key`: the label must exist.
    Exists(String),
}

impl LabelFilter {
    /// Parses one filter token.
    ///
    /// ```
    /// use configmgr::store::LabelFilter;
    ///
    /// assert_eq!(
    ///     LabelFilter::parse("team:infra").unwrap(),
    ///     LabelFilter::Equals { key: "team".into(), value: "infra".into() }
    /// );
    /// assert_eq!(LabelFilter::parse("env").unwrap(), LabelFilter::Exists("env".into()));
    /// assert!(LabelFilter::parse(":x").is_err());
    /// ```
    pub fn parse(token: &str) -> ManagerResult<Self> {
        let token = token.trim();
        let filter = match token.find(|c| c == ':' || c == '=') {
            Some(at) => Self::Equals {
                key: token[..at].to_string(),
                value: token[at + 1..].to_string(),
            },
            None => Self::Exists(token.to_string()),
        };

        let key = match &filter {
            Self::Equals { key, .. } | Self::Exists(key) => key,
        };
        if key.is_empty() {
            return Err(ManagerError::bad_request(format!("invalid filter '{token}'")));
        }
        Ok(filter)
    }

    /// Returns true if `obj` satisfies the filter.
    pub fn matches(&self, obj: &ConfigObject) -> bool {
        let labels = &obj.metadata.labels;
        match self {
            Self::Equals { key, value } => labels.get(key) == Some(value),
            Self::Exists(key) => labels.contains_key(key),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<ResourceIdentifier, ConfigObject>,
    revision: u64,
}

impl State {
    fn next_version(&mut self) -> String {
        self.revision += 1;
        self.revision.to_string()
    }
}

/// A [`ConfigService`] holding objects in memory.
///
/// ```
/// use configmgr::store::MemoryStore;
/// use configmgr_core::{ConfigObject, ConfigService, LifecycleEvent, RequestContext, ResourceIdentifier};
///
/// # tokio_test::block_on(async {
/// let (store, mut events) = MemoryStore::with_event_channel(16);
/// let ctx = RequestContext::new();
/// let obj = ConfigObject::new(ResourceIdentifier::new("ns1", "cfg1"), serde_json::json!({}));
///
/// let created = store.add(&ctx, obj).await.unwrap();
/// assert_eq!(created.resource_version(), Some("1"));
/// assert!(matches!(events.recv().await, Some(LifecycleEvent::Added(_))));
/// # });
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    // Serializes writers so events leave in revision order.
    writer: Mutex<()>,
    events: Option<mpsc::Sender<LifecycleEvent>>,
    resync_needed: AtomicBool,
}

impl MemoryStore {
    /// Creates a store that publishes no events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store publishing into a new channel of `capacity`.
    pub fn with_event_channel(capacity: usize) -> (Self, mpsc::Receiver<LifecycleEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let store = Self {
            events: Some(tx),
            ..Self::default()
        };
        (store, rx)
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().objects.is_empty()
    }

    /// Returns the revision of the last write.
    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Returns true if an event was dropped since the last resync.
    pub fn resync_needed(&self) -> bool {
        self.resync_needed.load(Ordering::Acquire)
    }

    /// Publishes `PossiblyChanged` for every stored object and returns how
    /// many were published.
    ///
    /// Clears the resync flag; it is raised again if the channel fills up
    /// during the sweep.
    pub async fn resync(&self) -> usize {
        let _writer = self.writer.lock().await;
        self.resync_needed.store(false, Ordering::Release);
        let snapshot: Vec<ConfigObject> = self.state.read().objects.values().cloned().collect();
        let mut published = 0;
        for obj in snapshot {
            if self.publish(LifecycleEvent::PossiblyChanged(obj)) {
                published += 1;
            }
        }
        tracing::debug!(objects = published, "resync published");
        published
    }

    /// Hands `event` to the subscriber without waiting. Returns false if it
    /// was dropped.
    fn publish(&self, event: LifecycleEvent) -> bool {
        let Some(events) = &self.events else {
            return false;
        };
        let kind = event.kind();
        match events.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.resync_needed.store(true, Ordering::Release);
                tracing::warn!(
                    event = kind.as_str(),
                    id = %event.identifier(),
                    "event channel full, dropping event until the next resync"
                );
                false
            }
            Err(TrySendError::Closed(event)) => {
                tracing::debug!(
                    event = kind.as_str(),
                    id = %event.identifier(),
                    "no event subscriber, dropping event"
                );
                false
            }
        }
    }
}

#[async_trait]
impl ConfigService for MemoryStore {
    async fn list(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        filters: &[String],
    ) -> ManagerResult<ConfigList> {
        ctx.ensure_active()?;
        let filters = filters
            .iter()
            .map(|token| LabelFilter::parse(token))
            .collect::<ManagerResult<Vec<_>>>()?;

        let state = self.state.read();
        let items = state
            .objects
            .values()
            .filter(|obj| obj.identifier.namespace() == namespace)
            .filter(|obj| filters.iter().all(|f| f.matches(obj)))
            .cloned()
            .collect();
        Ok(ConfigList {
            items,
            resource_version: Some(state.revision.to_string()),
        })
    }

    async fn get(&self, ctx: &RequestContext, id: &ResourceIdentifier) -> ManagerResult<ConfigObject> {
        ctx.ensure_active()?;
        self.state
            .read()
            .objects
            .get(id)
            .cloned()
            .ok_or_else(|| ManagerError::not_found_resource(id.to_string()))
    }

    async fn add(&self, ctx: &RequestContext, mut obj: ConfigObject) -> ManagerResult<ConfigObject> {
        ctx.ensure_active()?;
        let _writer = self.writer.lock().await;

        let created = {
            let mut state = self.state.write();
            if state.objects.contains_key(&obj.identifier) {
                return Err(ManagerError::conflict(format!(
                    "Config '{}' already exists",
                    obj.identifier
                )));
            }
            let now = Utc::now();
            obj.metadata.resource_version = Some(state.next_version());
            obj.metadata.generation = 1;
            obj.metadata.created_at = Some(now);
            obj.metadata.updated_at = Some(now);
            state.objects.insert(obj.identifier.clone(), obj.clone());
            obj
        };

        tracing::debug!(id = %created.identifier, version = ?created.resource_version(), "stored new Config");
        self.publish(LifecycleEvent::Added(created.clone()));
        Ok(created)
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: &ResourceIdentifier,
        mut obj: ConfigObject,
    ) -> ManagerResult<ConfigObject> {
        ctx.ensure_active()?;
        if obj.identifier != *id {
            return Err(ManagerError::bad_request(format!(
                "object {} does not match {id}",
                obj.identifier
            )));
        }
        let _writer = self.writer.lock().await;

        let (old, new) = {
            let mut state = self.state.write();
            let Some(old) = state.objects.get(id).cloned() else {
                return Err(ManagerError::not_found_resource(id.to_string()));
            };
            if let Some(expected) = obj.resource_version() {
                if Some(expected) != old.resource_version() {
                    return Err(ManagerError::conflict(format!(
                        "resource version {expected} of {id} is stale"
                    )));
                }
            }
            if old.same_content(&obj) {
                return Ok(old);
            }

            obj.metadata.resource_version = Some(state.next_version());
            obj.metadata.generation = old.metadata.generation + 1;
            obj.metadata.created_at = old.metadata.created_at;
            obj.metadata.updated_at = Some(Utc::now());
            state.objects.insert(id.clone(), obj.clone());
            (old, obj)
        };

        tracing::debug!(%id, version = ?new.resource_version(), "stored Config update");
        self.publish(LifecycleEvent::updated(old, new.clone())?);
        Ok(new)
    }

    async fn delete(&self, ctx: &RequestContext, id: &ResourceIdentifier) -> ManagerResult<()> {
        ctx.ensure_active()?;
        let _writer = self.writer.lock().await;

        let removed = self
            .state
            .write()
            .objects
            .remove(id)
            .ok_or_else(|| ManagerError::not_found_resource(id.to_string()))?;

        tracing::debug!(%id, "removed Config");
        self.publish(LifecycleEvent::Deleted(removed));
        Ok(())
    }
}
