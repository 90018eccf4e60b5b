//! Core middleware trait and continuation.
//!
//! A stage receives the context, the request and a [`Next`] holding the rest
//! of the chain. Calling [`Next::run`] continues; returning without calling
//! it short-circuits every later stage and the handler. Code after the
//! `run().await` executes on the way back out.
//!
//! # Example
//!
//! ```
//! use configmgr_middleware::{BoxFuture, Middleware, MiddlewareContext, MiddlewareResult, Next, Request};
//!
//! struct Audit;
//!
//! impl Middleware for Audit {
//!     fn name(&self) -> &'static str {
//!         "audit"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, MiddlewareResult> {
//!         Box::pin(async move {
//!             let result = next.run(ctx, request).await;
//!             tracing::debug!(ok = result.is_ok(), "audited");
//!             result
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{MiddlewareResult, Request};
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The terminal handler of a chain.
pub type HandlerFn<'a> =
    Box<dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + 'a>;

/// A pipeline stage.
///
/// # Invariants
///
/// - Call `next.run()` at most once; not calling it short-circuits
/// - Return downstream errors unchanged; observe them, never rewrite them
pub trait Middleware: Send + Sync + 'static {
    /// Returns the stage name used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, optionally delegating to `next`.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult>;
}

/// The rest of the chain: either another stage or the terminal handler.
///
/// `run` consumes `self`, so the chain can be continued at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(HandlerFn<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that invokes `middleware` and then `next`.
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or the handler.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> MiddlewareResult {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            NextInner::Chain { middleware, .. } => {
                f.debug_tuple("Next::Chain").field(&middleware.name()).finish()
            }
            NextInner::Handler(_) => f.write_str("Next::Handler"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reply;
    use bytes::Bytes;
    use configmgr_core::ManagerError;
    use std::sync::{Arc, Mutex};

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, MiddlewareResult> {
            Box::pin(async move {
                self.log.lock().unwrap().push(format!("{}:pre", self.name));
                let result = next.run(ctx, request).await;
                self.log.lock().unwrap().push(format!("{}:post", self.name));
                result
            })
        }
    }

    fn request() -> Request {
        http::Request::builder().uri("/v1/configs").body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_next_handler() {
        let mut ctx = MiddlewareContext::new();
        let next = Next::handler(|_ctx, _req| Box::pin(async { Ok(Reply::Empty) }));

        let result = next.run(&mut ctx, request()).await;
        assert_eq!(result.unwrap(), Reply::Empty);
    }

    #[tokio::test]
    async fn test_chain_wraps_around() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let outer = Recorder { name: "outer", log: log.clone() };
        let inner = Recorder { name: "inner", log: log.clone() };

        let handler_log = log.clone();
        let handler = Next::handler(move |_ctx, _req| {
            handler_log.lock().unwrap().push("handler".to_string());
            Box::pin(async { Err(ManagerError::not_found("missing")) })
        });
        let next = Next::new(&outer, Next::new(&inner, handler));

        let mut ctx = MiddlewareContext::new();
        let err = next.run(&mut ctx, request()).await.unwrap_err();
        assert_eq!(err.message(), "missing");

        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:pre", "inner:pre", "handler", "inner:post", "outer:post"]
        );
    }
}
