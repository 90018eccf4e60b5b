//! Request context types.
//!
//! The [`RequestContext`] is the immutable view of a request that handlers
//! pass to the service facade. The reconciler builds one per lifecycle event.

use crate::error::{ManagerError, ManagerResult};
use crate::identity::CallerIdentity;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use uuid::Uuid;

/// A unique identifier for each request, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for request tracking
/// and log correlation.
///
/// # Example
///
/// ```
/// use configmgr_core::RequestId;
///
/// let id = RequestId::new();
/// println!("Request ID: {}", id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Cooperative cancellation flag shared between a caller and the request it issued.
///
/// Clones observe the same state. Stages and handlers check it at their
/// I/O boundaries via [`RequestContext::ensure_active`].
///
/// ```
/// use configmgr_core::Cancellation;
///
/// let token = Cancellation::new();
/// let observer = token.clone();
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: Arc<CancellationInner>,
}

#[derive(Debug, Default)]
struct CancellationInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl Cancellation {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Completes when the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Per-namespace client settings loaded for a request.
///
/// The context-loading stage resolves it; handlers take the namespace from
/// it and service providers may pick credentials by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Namespace the request operates in.
    pub namespace: String,
}

impl ClientConfig {
    /// Creates the settings for `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

/// Per-request context handed to the service facade.
///
/// `RequestContext` carries:
/// - Unique request ID for correlation
/// - Caller identity (authenticated or anonymous)
/// - Trace/span IDs set by the tracing stage
/// - The matched operation ID
/// - The loaded [`ClientConfig`], if any
/// - A cancellation token
///
/// # Example
///
/// ```
/// use configmgr_core::RequestContext;
///
/// let ctx = RequestContext::new().with_operation_id("config-get");
/// assert_eq!(ctx.operation_id(), Some("config-get"));
/// assert!(ctx.ensure_active().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    identity: CallerIdentity,
    trace_id: Option<String>,
    span_id: Option<String>,
    operation_id: Option<String>,
    client: Option<ClientConfig>,
    cancellation: Cancellation,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a new request context with a fresh request ID.
    ///
    /// The identity defaults to [`CallerIdentity::Anonymous`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            identity: CallerIdentity::Anonymous,
            trace_id: None,
            span_id: None,
            operation_id: None,
            client: None,
            cancellation: Cancellation::new(),
            started_at: Instant::now(),
        }
    }

    /// Sets the caller identity.
    #[must_use]
    pub fn with_identity(mut self, identity: CallerIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the span ID.
    #[must_use]
    pub fn with_span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Sets the operation ID.
    #[must_use]
    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    /// Attaches the client settings loaded for this request.
    #[must_use]
    pub fn with_client_config(mut self, client: ClientConfig) -> Self {
        self.client = Some(client);
        self
    }

    /// Attaches a cancellation token shared with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the caller identity.
    #[must_use]
    pub const fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Returns the trace ID, if set.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Returns the span ID, if set.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Returns the operation ID, if set.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Returns the client settings, if a loader provided them.
    #[must_use]
    pub const fn client_config(&self) -> Option<&ClientConfig> {
        self.client.as_ref()
    }

    /// Returns the client settings or fails with a dependency error.
    pub fn require_client_config(&self) -> ManagerResult<&ClientConfig> {
        self.client.as_ref().ok_or_else(|| {
            ManagerError::dependency(format!(
                "no client configuration loaded for request {}",
                self.request_id
            ))
        })
    }

    /// Returns the cancellation token.
    #[must_use]
    pub const fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Returns `true` if the caller cancelled the request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fails with [`ManagerError::Cancelled`] if the request was cancelled.
    ///
    /// Call before starting store I/O.
    pub fn ensure_active(&self) -> ManagerResult<()> {
        if self.is_cancelled() {
            return Err(ManagerError::cancelled(format!(
                "request {} cancelled by caller",
                self.request_id
            )));
        }
        Ok(())
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
