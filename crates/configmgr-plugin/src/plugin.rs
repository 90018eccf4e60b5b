//! Config CRUD plugin wiring.
//!
//! ```text
//! GET    /v1/configs          config-list    200
//! POST   /v1/configs          config-create  201
//! GET    /v1/configs/{name}   config-get     200
//! PUT    /v1/configs/{name}   config-update  200
//! DELETE /v1/configs/{name}   config-delete  204
//! ```

use std::sync::Arc;

use bytes::Bytes;
use configmgr_config::{AuthorizationConfig, AuthorizationMode, ManagerConfig};
use configmgr_core::ServiceProvider;
use configmgr_middleware::stages::{
    AuthorizationMiddleware, ContextLoader, HeaderIdentityLoader, StaticClientConfigLoader,
};
use configmgr_middleware::{BoxFuture, MiddlewareContext, MiddlewareResult, Pipeline, Request};
use configmgr_router::RouteError;
use http::{Method, Response, StatusCode};

use crate::handlers::ConfigHandlers;
use crate::json_router::JsonRouter;

/// Operation IDs of the Config routes, as referenced by RBAC roles.
pub mod operations {
    /// `GET /v1/configs`
    pub const LIST: &str = "config-list";
    /// `GET /v1/configs/{name}`
    pub const GET: &str = "config-get";
    /// `POST /v1/configs`
    pub const CREATE: &str = "config-create";
    /// `PUT /v1/configs/{name}`
    pub const UPDATE: &str = "config-update";
    /// `DELETE /v1/configs/{name}`
    pub const DELETE: &str = "config-delete";

    /// Every operation, in registration order.
    pub const ALL: [&str; 5] = [LIST, CREATE, GET, UPDATE, DELETE];
}

/// Builds the authorization stage described by `config`.
pub fn authorization_from_config(config: &AuthorizationConfig) -> AuthorizationMiddleware {
    match config.mode {
        AuthorizationMode::AllowAll => AuthorizationMiddleware::allow_all(),
        AuthorizationMode::DenyAll => AuthorizationMiddleware::deny_all(),
        AuthorizationMode::Rbac => {
            let builder = AuthorizationMiddleware::rbac()
                .allow_anonymous_operations(config.anonymous_operations.iter().cloned());
            config
                .roles
                .iter()
                .fold(builder, |builder, (role, ops)| {
                    builder.allow_role(role.as_str(), ops.iter().cloned())
                })
                .build()
        }
    }
}

/// The Config CRUD plugin: one provider, one router.
///
/// Each request's namespace comes from the [`ClientConfig`](configmgr_core::ClientConfig)
/// a context loader puts in the pipeline, so the pipeline must carry one
/// (for example [`StaticClientConfigLoader`]). Without it handlers fail with a
/// dependency error.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use configmgr_core::{ServiceProvider, StaticServiceProvider};
/// use configmgr_middleware::stages::{ContextLoadingMiddleware, StaticClientConfigLoader};
/// use configmgr_middleware::Pipeline;
/// use configmgr_plugin::Plugin;
/// # use configmgr_core::{ConfigList, ConfigObject, ConfigService, ManagerResult, RequestContext, ResourceIdentifier};
/// # struct Empty;
/// # #[async_trait::async_trait]
/// # impl ConfigService for Empty {
/// #     async fn list(&self, _: &RequestContext, _: &str, _: &[String]) -> ManagerResult<ConfigList> { Ok(ConfigList::default()) }
/// #     async fn get(&self, _: &RequestContext, id: &ResourceIdentifier) -> ManagerResult<ConfigObject> { Err(configmgr_core::ManagerError::not_found(id.to_string())) }
/// #     async fn add(&self, _: &RequestContext, obj: ConfigObject) -> ManagerResult<ConfigObject> { Ok(obj) }
/// #     async fn update(&self, _: &RequestContext, _: &ResourceIdentifier, obj: ConfigObject) -> ManagerResult<ConfigObject> { Ok(obj) }
/// #     async fn delete(&self, _: &RequestContext, _: &ResourceIdentifier) -> ManagerResult<()> { Ok(()) }
/// # }
///
/// # tokio_test::block_on(async {
/// let provider: Arc<dyn ServiceProvider> = Arc::new(StaticServiceProvider::new(Arc::new(Empty)));
/// let pipeline = Pipeline::builder()
///     .stage(ContextLoadingMiddleware::new(vec![Arc::new(StaticClientConfigLoader::new("ns1"))]))
///     .build();
/// let plugin = Plugin::new(provider, pipeline).unwrap();
///
/// let request = http::Request::get("/v1/configs").body(bytes::Bytes::new()).unwrap();
/// assert_eq!(plugin.dispatch(request).await.status(), http::StatusCode::OK);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Plugin {
    router: Arc<JsonRouter>,
}

impl Plugin {
    /// Registers the Config routes behind `pipeline`.
    ///
    /// # Errors
    ///
    /// Fails only if route registration fails.
    pub fn new(provider: Arc<dyn ServiceProvider>, pipeline: Pipeline) -> Result<Self, RouteError> {
        let handlers = Arc::new(ConfigHandlers::new(provider));
        let mut router = JsonRouter::new(pipeline);

        {
            let mut v1 = router.subroute("v1/");
            v1.handle("configs", Method::GET, operations::LIST, list(&handlers))?
                .handle_with_code(
                    "configs",
                    Method::POST,
                    operations::CREATE,
                    create(&handlers),
                    StatusCode::CREATED,
                )?;

            let mut configs = v1.subroute("configs/");
            configs
                .handle("{name}", Method::GET, operations::GET, get(&handlers))?
                .handle("{name}", Method::PUT, operations::UPDATE, update(&handlers))?
                .handle_with_code(
                    "{name}",
                    Method::DELETE,
                    operations::DELETE,
                    delete(&handlers),
                    StatusCode::NO_CONTENT,
                )?;
        }

        tracing::info!(routes = router.routes().len(), "config plugin initialized");

        Ok(Self {
            router: Arc::new(router),
        })
    }

    /// Builds the plugin with the standard pipeline described by `config`.
    ///
    /// Identity comes from the request headers, and every request is bound to
    /// `config.plugin.namespace`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn from_config(
        config: &ManagerConfig,
        provider: Arc<dyn ServiceProvider>,
    ) -> Result<Self, RouteError> {
        let loaders: Vec<Arc<dyn ContextLoader>> = vec![
            Arc::new(HeaderIdentityLoader),
            Arc::new(StaticClientConfigLoader::new(config.plugin.namespace.clone())),
        ];
        let pipeline = Pipeline::standard(
            config.plugin.service_name.clone(),
            loaders,
            authorization_from_config(&config.authorization),
        );
        tracing::info!(namespace = %config.plugin.namespace, "binding config plugin to namespace");
        Self::new(provider, pipeline)
    }

    /// Returns the shared router, ready to hand to a server.
    pub const fn router(&self) -> &Arc<JsonRouter> {
        &self.router
    }

    /// Dispatches one request.
    pub async fn dispatch(&self, request: Request) -> Response<Bytes> {
        self.router.dispatch(request).await
    }
}

type Route = Box<
    dyn Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + Sync,
>;

fn name_of(ctx: &MiddlewareContext) -> String {
    ctx.path_var("name").unwrap_or_default().to_string()
}

fn list(handlers: &Arc<ConfigHandlers>) -> Route {
    let handlers = Arc::clone(handlers);
    Box::new(move |ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, MiddlewareResult> {
        let handlers = Arc::clone(&handlers);
        let ctx = ctx.to_request_context();
        Box::pin(async move { handlers.list(ctx, request).await })
    })
}

fn get(handlers: &Arc<ConfigHandlers>) -> Route {
    let handlers = Arc::clone(handlers);
    Box::new(move |ctx: &mut MiddlewareContext, _request: Request| -> BoxFuture<'static, MiddlewareResult> {
        let handlers = Arc::clone(&handlers);
        let name = name_of(ctx);
        let ctx = ctx.to_request_context();
        Box::pin(async move { handlers.get(ctx, name).await })
    })
}

fn create(handlers: &Arc<ConfigHandlers>) -> Route {
    let handlers = Arc::clone(handlers);
    Box::new(move |ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, MiddlewareResult> {
        let handlers = Arc::clone(&handlers);
        let ctx = ctx.to_request_context();
        Box::pin(async move { handlers.create(ctx, request).await })
    })
}

fn update(handlers: &Arc<ConfigHandlers>) -> Route {
    let handlers = Arc::clone(handlers);
    Box::new(move |ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, MiddlewareResult> {
        let handlers = Arc::clone(&handlers);
        let name = name_of(ctx);
        let ctx = ctx.to_request_context();
        Box::pin(async move { handlers.update(ctx, name, request).await })
    })
}

fn delete(handlers: &Arc<ConfigHandlers>) -> Route {
    let handlers = Arc::clone(handlers);
    Box::new(move |ctx: &mut MiddlewareContext, _request: Request| -> BoxFuture<'static, MiddlewareResult> {
        let handlers = Arc::clone(&handlers);
        let name = name_of(ctx);
        let ctx = ctx.to_request_context();
        Box::pin(async move { handlers.delete(ctx, name).await })
    })
}
