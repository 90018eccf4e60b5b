//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries state through the pipeline. Stages may
//! add to it but never remove what an earlier stage wrote; once the pipeline
//! reaches the handler it is converted to an immutable [`RequestContext`].

use configmgr_core::{Cancellation, CallerIdentity, ClientConfig, RequestContext, RequestId};
use configmgr_router::Params;
use http::StatusCode;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// Context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use configmgr_middleware::MiddlewareContext;
/// use configmgr_core::CallerIdentity;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_identity(CallerIdentity::user("u1", vec!["admin".to_string()]));
///
/// assert!(ctx.identity().is_authenticated());
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    request_id: RequestId,
    identity: CallerIdentity,
    trace_id: Option<String>,
    span_id: Option<String>,
    operation_id: Option<String>,
    success_status: StatusCode,
    path_vars: Params,
    cancellation: Cancellation,
    started_at: Instant,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a context with a fresh request ID.
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
            success_status: StatusCode::OK,
            path_vars: Params::new(),
            cancellation: Cancellation::new(),
            started_at: Instant::now(),
            extensions: HashMap::new(),
        }
    }

    /// Creates the context for a matched route.
    #[must_use]
    pub fn for_route(
        operation_id: impl Into<String>,
        success_status: StatusCode,
        path_vars: Params,
    ) -> Self {
        let mut ctx = Self::new();
        ctx.operation_id = Some(operation_id.into());
        ctx.success_status = success_status;
        ctx.path_vars = path_vars;
        ctx
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the caller identity.
    #[must_use]
    pub fn identity(&self) -> &CallerIdentity {
        &self.identity
    }

    /// Sets the caller identity.
    ///
    /// Called by context loaders.
    pub fn set_identity(&mut self, identity: CallerIdentity) {
        self.identity = identity;
    }

    /// Returns the trace ID, if set.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Sets the trace ID.
    ///
    /// Called by the tracing stage.
    pub fn set_trace_id(&mut self, trace_id: String) {
        self.trace_id = Some(trace_id);
    }

    /// Returns the span ID, if set.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Sets the span ID.
    ///
    /// Called by the tracing stage.
    pub fn set_span_id(&mut self, span_id: String) {
        self.span_id = Some(span_id);
    }

    /// Returns the matched route's operation ID.
    #[must_use]
    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    /// Returns the status a successful reply is encoded with.
    #[must_use]
    pub fn success_status(&self) -> StatusCode {
        self.success_status
    }

    /// Returns a path variable bound by the route pattern.
    #[must_use]
    pub fn path_var(&self, name: &str) -> Option<&str> {
        self.path_vars.get(name)
    }

    /// Returns all bound path variables.
    #[must_use]
    pub fn path_vars(&self) -> &Params {
        &self.path_vars
    }

    /// Replaces the cancellation token with one shared with the caller.
    pub fn set_cancellation(&mut self, cancellation: Cancellation) {
        self.cancellation = cancellation;
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Returns true once the caller has cancelled the request.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Stores a typed extension value.
    ///
    /// Extensions are append-only: if a value of type `T` is already present
    /// it is kept and `value` is handed back as the error.
    ///
    /// # Example
    ///
    /// ```
    /// use configmgr_middleware::MiddlewareContext;
    ///
    /// struct Tenant(&'static str);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// assert!(ctx.insert_extension(Tenant("ns1")).is_ok());
    /// assert!(ctx.insert_extension(Tenant("ns2")).is_err());
    /// assert_eq!(ctx.get_extension::<Tenant>().unwrap().0, "ns1");
    /// ```
    pub fn insert_extension<T: Send + Sync + 'static>(&mut self, value: T) -> Result<(), T> {
        if self.has_extension::<T>() {
            return Err(value);
        }
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    /// Retrieves a typed extension value.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    /// Builds the immutable [`RequestContext`] handed to the service facade.
    ///
    /// A [`ClientConfig`] extension, if a loader inserted one, is carried
    /// over; other extensions stay in the pipeline.
    #[must_use]
    pub fn to_request_context(&self) -> RequestContext {
        let mut ctx = RequestContext::with_request_id(self.request_id)
            .with_identity(self.identity.clone())
            .with_cancellation(self.cancellation.clone());

        if let Some(trace_id) = &self.trace_id {
            ctx = ctx.with_trace_id(trace_id.clone());
        }
        if let Some(span_id) = &self.span_id {
            ctx = ctx.with_span_id(span_id.clone());
        }
        if let Some(op_id) = &self.operation_id {
            ctx = ctx.with_operation_id(op_id.clone());
        }
        if let Some(client) = self.get_extension::<ClientConfig>() {
            ctx = ctx.with_client_config(client.clone());
        }

        ctx
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
