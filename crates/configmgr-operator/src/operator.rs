//! The event loop.

use std::future::Future;

use configmgr_core::{CallerIdentity, LifecycleEvent, RequestContext};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::reconciler::{Outcome, Reconciler};
use crate::watcher::ResourceWatcher;

/// Identity the operator presents to hooks.
pub const OPERATOR_SERVICE_NAME: &str = "configmgr-operator";

/// Counters returned when the loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorStats {
    /// Events whose hook ran successfully.
    pub processed: u64,
    /// Redelivered events acknowledged without a hook call.
    pub skipped: u64,
    /// Events whose hook failed or panicked.
    pub failed: u64,
    /// Events outside the watched namespace.
    pub ignored: u64,
}

impl OperatorStats {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }

    /// Total events received.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.processed + self.skipped + self.failed + self.ignored
    }
}

/// Feeds lifecycle events to a [`Reconciler`], one at a time.
///
/// # Example
///
/// ```
/// use configmgr_operator::{ConfigWatcher, Operator, Reconciler};
/// use tokio::sync::mpsc;
///
/// # tokio_test::block_on(async {
/// let operator = Operator::new(Reconciler::new(ConfigWatcher::new()));
/// let (tx, rx) = mpsc::channel(16);
/// drop(tx);
///
/// let stats = operator.run(rx, std::future::pending()).await;
/// assert_eq!(stats.total(), 0);
/// # });
/// ```
#[derive(Debug)]
pub struct Operator<W> {
    reconciler: Reconciler<W>,
    watch_namespace: Option<String>,
}

impl<W: ResourceWatcher> Operator<W> {
    /// Watches every namespace.
    pub const fn new(reconciler: Reconciler<W>) -> Self {
        Self {
            reconciler,
            watch_namespace: None,
        }
    }

    /// Restricts the loop to one namespace. `None` watches all.
    #[must_use]
    pub fn with_watch_namespace(mut self, namespace: Option<String>) -> Self {
        self.watch_namespace = namespace;
        self
    }

    /// Returns the reconciler.
    pub const fn reconciler(&self) -> &Reconciler<W> {
        &self.reconciler
    }

    /// Runs until the channel closes or `shutdown` completes.
    ///
    /// An event already being reconciled when `shutdown` fires is finished
    /// first; events still queued are left in the channel.
    pub async fn run<S>(&self, mut events: mpsc::Receiver<LifecycleEvent>, shutdown: S) -> OperatorStats
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = OperatorStats::default();

        info!(
            namespace = self.watch_namespace.as_deref().unwrap_or("*"),
            "starting operator"
        );

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("operator received shutdown signal");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("event feed closed");
                        break;
                    };

                    if !self.watches(&event) {
                        debug!(id = %event.identifier(), "ignoring event outside watched namespace");
                        stats.ignored += 1;
                        continue;
                    }

                    let ctx = RequestContext::new()
                        .with_identity(CallerIdentity::service(OPERATOR_SERVICE_NAME));
                    stats.record(self.reconciler.handle(&ctx, event).await);
                }
            }
        }

        info!(
            processed = stats.processed,
            skipped = stats.skipped,
            failed = stats.failed,
            ignored = stats.ignored,
            "operator stopped"
        );
        stats
    }

    fn watches(&self, event: &LifecycleEvent) -> bool {
        self.watch_namespace
            .as_deref()
            .map_or(true, |ns| event.identifier().namespace() == ns)
    }
}
