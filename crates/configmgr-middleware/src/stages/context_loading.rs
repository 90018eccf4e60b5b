//! Context-loading stage.
//!
//! Runs each configured [`ContextLoader`] in order before the request reaches
//! authorization. Loaders populate the [`MiddlewareContext`] with what later
//! stages and the handler need (caller identity, per-namespace client
//! configuration). A loader failure ends the request: later stages and the
//! handler never run.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{MiddlewareResult, Request};
use async_trait::async_trait;
use configmgr_core::{CallerIdentity, ClientConfig, ManagerError, ManagerResult};
use std::sync::Arc;

/// Header carrying the authenticated user ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying a comma-separated list of the user's roles.
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// Header carrying a service account name.
pub const SERVICE_NAME_HEADER: &str = "x-service-name";

/// Loads per-request state into the context.
///
/// Errors are returned to the caller unchanged. A store or credential
/// failure should be a [`ManagerError::Dependency`](configmgr_core::ManagerError::Dependency),
/// optionally carrying a status code.
#[async_trait]
pub trait ContextLoader: Send + Sync {
    /// Returns the loader name used in logs.
    fn name(&self) -> &'static str;

    /// Populates `ctx` for `request`.
    async fn load(&self, ctx: &mut MiddlewareContext, request: &Request) -> ManagerResult<()>;
}

/// Runs the configured loaders, short-circuiting on the first failure.
#[derive(Clone, Default)]
pub struct ContextLoadingMiddleware {
    loaders: Vec<Arc<dyn ContextLoader>>,
}

impl ContextLoadingMiddleware {
    /// Creates the stage with loaders that run in the given order.
    #[must_use]
    pub fn new(loaders: Vec<Arc<dyn ContextLoader>>) -> Self {
        Self { loaders }
    }

    /// Returns the loader names in order.
    #[must_use]
    pub fn loader_names(&self) -> Vec<&'static str> {
        self.loaders.iter().map(|l| l.name()).collect()
    }
}

impl std::fmt::Debug for ContextLoadingMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextLoadingMiddleware")
            .field("loaders", &self.loader_names())
            .finish()
    }
}

impl Middleware for ContextLoadingMiddleware {
    fn name(&self) -> &'static str {
        "context_loading"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            for loader in &self.loaders {
                if ctx.is_cancelled() {
                    return Err(ManagerError::cancelled("request cancelled during context loading"));
                }
                if let Err(e) = loader.load(ctx, &request).await {
                    tracing::debug!(
                        loader = loader.name(),
                        request_id = %ctx.request_id(),
                        error = %e,
                        "context loading failed"
                    );
                    return Err(e);
                }
            }
            next.run(ctx, request).await
        })
    }
}

/// Derives the caller identity from trusted request headers.
///
/// Intended to sit behind an authenticating proxy that sets the headers.
///
/// | Headers present | Identity |
/// |-----------------|----------|
/// | `x-user-id` (+ optional `x-user-roles`) | `User` |
/// | `x-service-name` | `Service` |
/// | neither | `Anonymous` |
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderIdentityLoader;

impl HeaderIdentityLoader {
    /// Extracts an identity from request headers.
    #[must_use]
    pub fn identity_from(request: &Request) -> CallerIdentity {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(user_id) = header(USER_ID_HEADER) {
            let roles = header(USER_ROLES_HEADER)
                .map(|roles| {
                    roles
                        .split(',')
                        .map(str::trim)
                        .filter(|r| !r.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default();
            return CallerIdentity::user(user_id, roles);
        }

        header(SERVICE_NAME_HEADER).map_or(CallerIdentity::Anonymous, CallerIdentity::service)
    }
}

#[async_trait]
impl ContextLoader for HeaderIdentityLoader {
    fn name(&self) -> &'static str {
        "header_identity"
    }

    async fn load(&self, ctx: &mut MiddlewareContext, request: &Request) -> ManagerResult<()> {
        ctx.set_identity(Self::identity_from(request));
        Ok(())
    }
}

/// Inserts a fixed [`ClientConfig`] into every request context.
///
/// The handler reads the namespace from it; a provider may use it to pick
/// credentials. Loading a second, different configuration for the same
/// request is an internal error.
#[derive(Debug, Clone)]
pub struct StaticClientConfigLoader {
    config: ClientConfig,
}

impl StaticClientConfigLoader {
    /// Creates a loader for `namespace`.
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(namespace),
        }
    }
}

#[async_trait]
impl ContextLoader for StaticClientConfigLoader {
    fn name(&self) -> &'static str {
        "static_client_config"
    }

    async fn load(&self, ctx: &mut MiddlewareContext, _request: &Request) -> ManagerResult<()> {
        match ctx.insert_extension(self.config.clone()) {
            Ok(()) => Ok(()),
            Err(_) if ctx.get_extension::<ClientConfig>() == Some(&self.config) => Ok(()),
            Err(rejected) => Err(ManagerError::internal(format!(
                "client configuration for namespace '{}' conflicts with one already loaded",
                rejected.namespace
            ))),
        }
    }
}
