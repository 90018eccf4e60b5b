//! # Config Manager Middleware
//!
//! The ordered middleware pipeline every routed CRUD request passes through.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → Tracing → Logging → ContextLoading → Authorization → Handler
//!                                                                   ↓
//! Reply   ←─────────────── (wrap-around, outer stages observe) ─────┘
//! ```
//!
//! | Stage | Middleware      | Purpose                                   |
//! |-------|-----------------|-------------------------------------------|
//! | 1     | Tracing         | Request span, W3C trace context           |
//! | 2     | Logging         | Start/end logs, request metrics           |
//! | 3     | Context loading | Caller identity, per-namespace settings   |
//! | 4     | Authorization   | RBAC or custom policy evaluation          |
//!
//! Stages run strictly in registration order. A stage that returns without
//! calling [`Next::run`] short-circuits every later stage and the handler.
//! The first failure in chain order is returned unchanged.
//!
//! ## Example
//!
//! ```
//! use configmgr_middleware::{MiddlewareContext, Pipeline, Reply};
//! use configmgr_middleware::stages::AuthorizationMiddleware;
//! use bytes::Bytes;
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::standard("config-plugin", Vec::new(), AuthorizationMiddleware::allow_all());
//! let request = http::Request::builder().uri("/v1/configs").body(Bytes::new()).unwrap();
//!
//! let mut ctx = MiddlewareContext::new();
//! let reply = pipeline
//!     .process(&mut ctx, request, |_ctx, _req| Box::pin(async { Ok(Reply::Empty) }))
//!     .await
//!     .unwrap();
//! assert!(reply.is_empty());
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/configmgr-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, HandlerFn, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use types::{MiddlewareResult, Reply, Request};
