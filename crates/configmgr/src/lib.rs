//! # configmgr
//!
//! Keeps Config resources in sync between a declarative store and their
//! observers, and serves CRUD access to them over HTTP.
//!
//! - [`operator`] - reconciler with exactly-once-per-version hook delivery
//! - [`plugin`] - CRUD router, handlers and HTTP server
//! - [`middleware`] - the ordered request pipeline
//! - [`store::MemoryStore`] - in-memory store publishing lifecycle events
//! - [`App`] - all of the above wired into one process
//!
//! ## Architecture
//!
//! ```text
//! HTTP → Server → JsonRouter → Pipeline → handler → MemoryStore
//!                                                       │ LifecycleEvent
//!                                                       ▼
//!                                   Operator → Reconciler → ResourceWatcher
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use configmgr::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ConfigLoader::new().with_env_prefix(ENV_PREFIX).load()?;
//! let stats = App::new(config)?.run(ShutdownSignal::with_os_signals()).await?;
//! println!("reconciled {} events", stats.processed);
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/configmgr/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod app;
pub mod store;

pub use app::App;

pub use configmgr_config as config;
pub use configmgr_core as core;
pub use configmgr_middleware as middleware;
pub use configmgr_operator as operator;
pub use configmgr_plugin as plugin;
pub use configmgr_router as router;
pub use configmgr_telemetry as telemetry;

/// Common imports.
pub mod prelude {
    pub use crate::store::{LabelFilter, MemoryStore};
    pub use crate::App;

    pub use configmgr_config::{ConfigLoader, ManagerConfig, ENV_PREFIX};
    pub use configmgr_core::{
        CallerIdentity, ConfigList, ConfigObject, ConfigPayload, ConfigService, LifecycleEvent,
        ManagerError, ManagerResult, RequestContext, ResourceIdentifier, ServiceProvider,
        StaticServiceProvider,
    };
    pub use configmgr_middleware::stages::AuthorizationMiddleware;
    pub use configmgr_middleware::{Pipeline, Reply};
    pub use configmgr_operator::{
        ConfigWatcher, ErrorSink, Operator, OperatorStats, Reconciler, ResourceWatcher,
    };
    pub use configmgr_plugin::{JsonRouter, Plugin, Server, ShutdownSignal};
}
