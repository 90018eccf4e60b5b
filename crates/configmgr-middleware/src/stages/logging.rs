//! Logging stage.
//!
//! Logs request start and end and records request metrics. The downstream
//! result is returned exactly as received.
//!
//! | Outcome | Level |
//! |---------|-------|
//! | success | `info` |
//! | client error (4xx) | `debug` |
//! | server error (5xx) | `error` |

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{MiddlewareResult, Request};
use configmgr_telemetry::metrics::{record_request, InFlightGuard};

/// Request start/end logging and metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Creates the stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Coarse classification of a finished request, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The chain returned a reply.
    Success,
    /// The chain failed with a 4xx error.
    ClientError,
    /// The chain failed with a 5xx error.
    ServerError,
}

impl Outcome {
    /// Classifies a chain result.
    #[must_use]
    pub fn of(result: &MiddlewareResult) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) if e.is_client_error() => Self::ClientError,
            Err(_) => Self::ServerError,
        }
    }

    /// Returns the log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        }
    }
}

impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let request_id = ctx.request_id();
            let operation = ctx.operation_id().unwrap_or("unknown").to_string();

            tracing::info!(%method, %path, %request_id, operation_id = %operation, "request started");
            let _in_flight = InFlightGuard::new();

            let result = next.run(ctx, request).await;

            let duration = ctx.elapsed();
            let duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
            let outcome = Outcome::of(&result);
            let status = match &result {
                Ok(_) => ctx.success_status(),
                Err(e) => e.status_code(),
            };

            match (&result, outcome) {
                (Err(e), Outcome::ServerError) => tracing::error!(
                    %method, %path, %request_id,
                    status = status.as_u16(), duration_ms, outcome = outcome.as_str(),
                    error = %e,
                    "request failed"
                ),
                (Err(e), _) => tracing::debug!(
                    %method, %path, %request_id,
                    status = status.as_u16(), duration_ms, outcome = outcome.as_str(),
                    error = %e,
                    "request rejected"
                ),
                (Ok(_), _) => tracing::info!(
                    %method, %path, %request_id,
                    status = status.as_u16(), duration_ms, outcome = outcome.as_str(),
                    "request completed"
                ),
            }

            record_request(&operation, status.as_u16(), duration);
            result
        })
    }
}
