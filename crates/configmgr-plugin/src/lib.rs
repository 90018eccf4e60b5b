//! # Config Manager Plugin
//!
//! CRUD access to Config resources over HTTP.
//!
//! - [`JsonRouter`] - route table plus middleware pipeline; matches a
//!   request, runs the pipeline and handler, encodes the JSON reply
//! - [`Plugin`] - registers the five Config routes for one namespace
//! - [`Server`] - hyper HTTP/1 server with `/health`, `/metrics`, request
//!   deadlines and graceful shutdown
//!
//! ## Request flow
//!
//! ```text
//! TCP → Server (body limit, deadline) → JsonRouter (match)
//!     → Pipeline (tracing → logging → context → authz) → handler
//!     → ConfigService → Reply → JSON / error envelope
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use configmgr_config::ManagerConfig;
//! use configmgr_core::ServiceProvider;
//! use configmgr_plugin::{Plugin, Server, ShutdownSignal};
//!
//! # async fn run(provider: Arc<dyn ServiceProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ManagerConfig::default();
//! let plugin = Plugin::from_config(&config, provider)?;
//! Server::new(config.server.clone(), Arc::clone(plugin.router()))
//!     .run_with_shutdown(ShutdownSignal::with_os_signals())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/configmgr-plugin/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod handlers;
mod json_router;
mod plugin;
mod server;
mod shutdown;

pub use error::ServerError;
pub use json_router::{JsonHandler, JsonRouter, RouteSpec, Subroute, REQUEST_ID_HEADER};
pub use plugin::{authorization_from_config, operations, Plugin};
pub use server::{HealthStatus, Server};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownSignal};
