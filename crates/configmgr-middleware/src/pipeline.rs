//! Ordered middleware pipeline.
//!
//! Stages run strictly in registration order. There is no priority system:
//! the only way to place authorization after context loading is to register
//! it after context loading, which [`Pipeline::standard`] does.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::{
    AuthorizationMiddleware, ContextLoader, ContextLoadingMiddleware, LoggingMiddleware,
    TracingMiddleware,
};
use crate::types::{MiddlewareResult, Request};
use std::sync::Arc;

/// A type-erased stage.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An immutable, ordered chain of stages.
///
/// # Example
///
/// ```
/// use configmgr_middleware::Pipeline;
/// use configmgr_middleware::stages::AuthorizationMiddleware;
///
/// let pipeline = Pipeline::standard("config-plugin", Vec::new(), AuthorizationMiddleware::allow_all());
/// assert_eq!(
///     pipeline.stage_names(),
///     vec!["tracing", "logging", "context_loading", "authorization"]
/// );
/// ```
#[derive(Clone)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Builds the fixed request pipeline:
    /// tracing → logging → context loading → authorization.
    #[must_use]
    pub fn standard(
        service_name: impl Into<String>,
        loaders: Vec<Arc<dyn ContextLoader>>,
        authorization: AuthorizationMiddleware,
    ) -> Self {
        Self::builder()
            .stage(TracingMiddleware::new(service_name))
            .stage(LoggingMiddleware::new())
            .stage(ContextLoadingMiddleware::new(loaders))
            .stage(authorization)
            .build()
    }

    /// Runs `request` through every stage and then `handler`.
    ///
    /// Returns the first failure in chain order, unchanged.
    pub async fn process<H>(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        handler: H,
    ) -> MiddlewareResult
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + 'static,
    {
        let next = self.build_chain(handler);
        next.run(ctx, request).await
    }

    /// Builds the chain back to front so the first stage runs first.
    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns stage names in execution order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage. Stages run in the order they are added.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Appends an already shared stage.
    #[must_use]
    pub fn shared_stage(mut self, middleware: BoxedMiddleware) -> Self {
        self.stages.push(middleware);
        self
    }

    /// Freezes the stage order.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reply;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct OrderTracking {
        name: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Middleware for OrderTracking {
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
                self.order.lock().unwrap().push(self.name);
                next.run(ctx, request).await
            })
        }
    }

    fn request() -> Request {
        http::Request::builder().uri("/test").body(Bytes::new()).unwrap()
    }

    #[tokio::test]
    async fn test_pipeline_executes_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let pipeline = Pipeline::builder()
            .stage(OrderTracking { name: "first", order: order.clone() })
            .stage(OrderTracking { name: "second", order: order.clone() })
            .stage(OrderTracking { name: "third", order: order.clone() })
            .build();

        let mut ctx = MiddlewareContext::new();
        let result = pipeline
            .process(&mut ctx, request(), |_ctx, _req| Box::pin(async { Ok(Reply::Empty) }))
            .await;

        assert!(result.is_ok());
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(pipeline.stage_names(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_empty_pipeline_runs_handler() {
        let pipeline = Pipeline::builder().build();
        assert_eq!(pipeline.stage_count(), 0);

        let mut ctx = MiddlewareContext::new();
        let result = pipeline
            .process(&mut ctx, request(), |_ctx, _req| {
                Box::pin(async { Ok(Reply::Json(serde_json::json!({"ok": true}))) })
            })
            .await;

        assert_eq!(result.unwrap(), Reply::Json(serde_json::json!({"ok": true})));
    }
}
