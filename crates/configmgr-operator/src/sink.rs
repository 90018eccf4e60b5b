//! Destinations for reconciler hook failures.

use configmgr_core::{ManagerError, RequestContext};
use tracing::error;

/// Receives hook failures after the reconciler has isolated them.
///
/// Reporting is synchronous and must not block; the event loop waits for it.
pub trait ErrorSink: Send + Sync {
    /// Reports one failure.
    fn report(&self, ctx: &RequestContext, error: &ManagerError);
}

/// Logs failures at error level. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingErrorSink;

impl ErrorSink for LoggingErrorSink {
    fn report(&self, ctx: &RequestContext, err: &ManagerError) {
        error!(
            request_id = %ctx.request_id(),
            category = ?err.category(),
            error = %err,
            "reconcile hook failed"
        );
    }
}

/// Adapts a closure into an [`ErrorSink`].
///
/// ```
/// use configmgr_core::{ManagerError, RequestContext};
/// use configmgr_operator::{ErrorSink, FnErrorSink};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let count = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&count);
/// let sink = FnErrorSink::new(move |_ctx: &RequestContext, _err: &ManagerError| {
///     seen.fetch_add(1, Ordering::SeqCst);
/// });
///
/// sink.report(&RequestContext::new(), &ManagerError::callback("boom"));
/// assert_eq!(count.load(Ordering::SeqCst), 1);
/// ```
pub struct FnErrorSink<F> {
    f: F,
}

impl<F> FnErrorSink<F>
where
    F: Fn(&RequestContext, &ManagerError) + Send + Sync,
{
    /// Wraps `f`.
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnErrorSink<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnErrorSink").finish_non_exhaustive()
    }
}

impl<F> ErrorSink for FnErrorSink<F>
where
    F: Fn(&RequestContext, &ManagerError) + Send + Sync,
{
    fn report(&self, ctx: &RequestContext, err: &ManagerError) {
        (self.f)(ctx, err);
    }
}
