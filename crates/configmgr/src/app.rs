//! Process wiring: store, reconciler, CRUD plugin and server.

use std::sync::Arc;
use std::time::Duration;

use configmgr_config::ManagerConfig;
use configmgr_core::{ConfigService, LifecycleEvent, ServiceProvider, StaticServiceProvider};
use configmgr_operator::{ConfigWatcher, Operator, OperatorStats, Reconciler, ResourceWatcher};
use configmgr_plugin::{Plugin, Server, ShutdownSignal};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::store::MemoryStore;

/// How often the store is checked for dropped events.
const RECOVERY_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// A fully wired `configmgr` process.
///
/// The CRUD plugin writes to a [`MemoryStore`]; the store's lifecycle events
/// feed the reconciler; a ticker publishes resync sweeps, periodically if
/// configured and whenever the store dropped an event. One
/// [`ShutdownSignal`] stops all of it.
pub struct App<W = ConfigWatcher> {
    config: ManagerConfig,
    store: Arc<MemoryStore>,
    events: Option<mpsc::Receiver<LifecycleEvent>>,
    operator: Arc<Operator<W>>,
    plugin: Plugin,
}

impl App<ConfigWatcher> {
    /// Wires the process with the logging watcher.
    ///
    /// # Errors
    ///
    /// Fails if the plugin routes cannot be registered.
    pub fn new(config: ManagerConfig) -> anyhow::Result<Self> {
        Self::with_watcher(config, ConfigWatcher::new())
    }
}

impl<W: ResourceWatcher + 'static> App<W> {
    /// Wires the process with custom reconcile hooks.
    ///
    /// # Errors
    ///
    /// Fails if the plugin routes cannot be registered.
    pub fn with_watcher(config: ManagerConfig, watcher: W) -> anyhow::Result<Self> {
        let (store, events) = if config.operator.enabled {
            let (store, events) = MemoryStore::with_event_channel(config.operator.channel_capacity);
            (store, Some(events))
        } else {
            (MemoryStore::new(), None)
        };
        let store = Arc::new(store);

        let provider: Arc<dyn ServiceProvider> = Arc::new(StaticServiceProvider::new(
            Arc::clone(&store) as Arc<dyn ConfigService>
        ));
        let plugin = Plugin::from_config(&config, provider)?;

        let reconciler = Reconciler::new(watcher).with_tombstone_limit(config.operator.tombstone_limit);
        let operator = Operator::new(reconciler)
            .with_watch_namespace(config.operator.watch_namespace.clone());

        Ok(Self {
            config,
            store,
            events,
            operator: Arc::new(operator),
            plugin,
        })
    }

    /// Returns the store.
    pub const fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Returns the operator.
    pub const fn operator(&self) -> &Arc<Operator<W>> {
        &self.operator
    }

    /// Returns the CRUD plugin.
    pub const fn plugin(&self) -> &Plugin {
        &self.plugin
    }

    /// Binds the configured address and runs until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Fails if the server cannot bind.
    pub async fn run(self, shutdown: ShutdownSignal) -> anyhow::Result<OperatorStats> {
        let listener = self.server().bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Runs on an already bound listener until `shutdown` fires.
    ///
    /// Returns the reconciler's counters once every task has stopped.
    ///
    /// # Errors
    ///
    /// Fails if the server fails.
    pub async fn serve(
        mut self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> anyhow::Result<OperatorStats> {
        let operator_task = self.events.take().map(|events| {
            let operator = Arc::clone(&self.operator);
            let stop = shutdown.recv();
            tokio::spawn(async move { operator.run(events, stop).await })
        });

        let resync_task = operator_task.is_some().then(|| {
            let sweep = self
                .config
                .operator
                .resync_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs);
            spawn_resync(Arc::clone(&self.store), sweep, shutdown.clone())
        });

        let served = self.server().serve(listener, shutdown.clone()).await;
        // A server error must still stop the background tasks.
        shutdown.trigger();

        if let Some(task) = resync_task {
            if let Err(e) = task.await {
                warn!(error = %e, "resync task failed");
            }
        }
        let stats = match operator_task {
            Some(task) => task.await.unwrap_or_else(|e| {
                warn!(error = %e, "operator task failed");
                OperatorStats::default()
            }),
            None => OperatorStats::default(),
        };

        served?;
        info!(
            processed = stats.processed,
            failed = stats.failed,
            "configmgr stopped"
        );
        Ok(stats)
    }

    fn server(&self) -> Server {
        Server::new(self.config.server.clone(), Arc::clone(self.plugin.router()))
            .with_service(self.config.plugin.service_name.clone(), env!("CARGO_PKG_VERSION"))
    }
}

impl<W> std::fmt::Debug for App<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("namespace", &self.config.plugin.namespace)
            .field("operator_enabled", &self.events.is_some())
            .field("objects", &self.store.len())
            .finish_non_exhaustive()
    }
}

fn spawn_resync(
    store: Arc<MemoryStore>,
    sweep: Option<Duration>,
    shutdown: ShutdownSignal,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut recovery = tokio::time::interval(RECOVERY_CHECK_INTERVAL);
        recovery.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut sweeper = sweep.map(|every| {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                () = shutdown.recv() => break,
                _ = recovery.tick() => {
                    if store.resync_needed() {
                        let published = store.resync().await;
                        warn!(objects = published, "resync after dropped events");
                    }
                }
                Some(_) = next_tick(sweeper.as_mut()) => {
                    let published = store.resync().await;
                    info!(objects = published, "resync sweep published");
                }
            }
        }
    })
}

async fn next_tick(ticker: Option<&mut tokio::time::Interval>) -> Option<tokio::time::Instant> {
    match ticker {
        Some(ticker) => Some(ticker.tick().await),
        None => std::future::pending().await,
    }
}
