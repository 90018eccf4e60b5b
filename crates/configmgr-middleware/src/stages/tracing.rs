//! Tracing stage.
//!
//! Opens one `tracing` span per request and runs the rest of the chain
//! inside it. The span is attached to the downstream future with
//! [`Instrument`], so it is exited when that future completes, whether the
//! chain succeeds, short-circuits, or fails.
//!
//! ## Trace Context Propagation
//!
//! Supports the [W3C Trace Context](https://www.w3.org/TR/trace-context/)
//! `traceparent` header. A valid header supplies the trace ID and parent
//! span ID; otherwise a fresh trace ID is generated.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{MiddlewareResult, Request};
use tracing::field::Empty;
use tracing::Instrument;
use uuid::Uuid;

/// The W3C Trace Context header.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Opens the request span and records trace identifiers in the context.
///
/// # Example
///
/// ```
/// use configmgr_middleware::stages::TracingMiddleware;
///
/// let middleware = TracingMiddleware::new("config-plugin");
/// assert_eq!(middleware.service_name(), "config-plugin");
/// ```
#[derive(Debug, Clone)]
pub struct TracingMiddleware {
    service_name: String,
}

impl TracingMiddleware {
    /// Creates the stage. `service_name` is recorded on every span.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Returns the service name recorded on spans.
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn extract_trace_context(request: &Request) -> Option<TraceContext> {
        let value = request.headers().get(TRACEPARENT_HEADER)?.to_str().ok()?;
        TraceContext::parse(value)
    }

    /// 128-bit trace ID as 32 hex chars.
    fn generate_trace_id() -> String {
        Uuid::now_v7().simple().to_string()
    }

    /// 64-bit span ID as 16 hex chars, taken from the random tail of a v7 UUID.
    fn generate_span_id() -> String {
        let id = Uuid::now_v7().simple().to_string();
        id[16..].to_string()
    }
}

impl Middleware for TracingMiddleware {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            let trace_context = Self::extract_trace_context(&request).unwrap_or_else(|| TraceContext {
                trace_id: Self::generate_trace_id(),
                parent_span_id: None,
                flags: TraceFlags::SAMPLED,
            });
            let span_id = Self::generate_span_id();

            let span = tracing::info_span!(
                "request",
                service = %self.service_name,
                method = %request.method(),
                path = %request.uri().path(),
                operation_id = ctx.operation_id().unwrap_or("unknown"),
                request_id = %ctx.request_id(),
                trace_id = %trace_context.trace_id,
                span_id = %span_id,
                status = Empty,
            );

            ctx.set_trace_id(trace_context.trace_id.clone());
            ctx.set_span_id(span_id);
            let _ = ctx.insert_extension(SpanInfo {
                service_name: self.service_name.clone(),
                method: request.method().to_string(),
                path: request.uri().path().to_string(),
                parent_span_id: trace_context.parent_span_id,
                sampled: trace_context.flags.is_sampled(),
                span: span.clone(),
            });

            let result = next.run(ctx, request).instrument(span.clone()).await;

            let status = match &result {
                Ok(_) => ctx.success_status(),
                Err(e) => e.status_code(),
            };
            span.record("status", status.as_u16());
            result
        })
    }
}

/// Parsed `traceparent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// The 128-bit trace ID as a hex string.
    pub trace_id: String,
    /// The parent span ID, if propagated from upstream.
    pub parent_span_id: Option<String>,
    /// Trace flags.
    pub flags: TraceFlags,
}

impl TraceContext {
    /// Parses `{version}-{trace-id}-{parent-span-id}-{flags}`.
    ///
    /// Only version `00` is accepted. All-zero trace or span IDs are invalid.
    pub fn parse(value: &str) -> Option<Self> {
        let mut parts = value.trim().split('-');
        let (version, trace_id, parent_span_id, flags) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || version != "00" {
            return None;
        }

        let is_hex = |s: &str, len: usize| {
            s.len() == len && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        };
        let all_zero = |s: &str| s.chars().all(|c| c == '0');
        if !is_hex(trace_id, 32) || all_zero(trace_id) {
            return None;
        }
        if !is_hex(parent_span_id, 16) || all_zero(parent_span_id) {
            return None;
        }
        if !is_hex(flags, 2) {
            return None;
        }

        Some(Self {
            trace_id: trace_id.to_string(),
            parent_span_id: Some(parent_span_id.to_string()),
            flags: TraceFlags(u8::from_str_radix(flags, 16).ok()?),
        })
    }
}

/// W3C trace flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// No flags set.
    pub const NONE: Self = Self(0x00);
    /// The trace is sampled.
    pub const SAMPLED: Self = Self(0x01);

    /// Returns true if the sampled flag is set.
    #[must_use]
    pub const fn is_sampled(self) -> bool {
        self.0 & 0x01 != 0
    }
}

/// Span details stored as a context extension for later stages and handlers.
#[derive(Debug, Clone)]
pub struct SpanInfo {
    /// The service name.
    pub service_name: String,
    /// The HTTP method.
    pub method: String,
    /// The request path.
    pub path: String,
    /// The parent span ID, if propagated.
    pub parent_span_id: Option<String>,
    /// Whether the upstream sampled this trace.
    pub sampled: bool,
    /// The request span.
    pub span: tracing::Span,
}
