//! Config CRUD handlers.

use std::sync::Arc;

use configmgr_core::{
    ConfigPayload, ConfigService, ErrorCategory, ManagerError, ManagerResult, RequestContext,
    ResourceIdentifier, ServiceProvider,
};
use configmgr_middleware::{MiddlewareResult, Reply, Request};
use serde::Deserialize;
use tracing::{error, info_span, Instrument};

/// Query parameters of the list route.
#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    #[serde(default)]
    filters: Option<String>,
}

/// Splits the `filters` parameter on `,`, dropping empty tokens.
pub(crate) fn parse_filters(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .filter(|token| !token.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn list_filters(request: &Request) -> ManagerResult<Vec<String>> {
    let query: ListQuery = match request.uri().query() {
        Some(q) => serde_urlencoded::from_str(q)
            .map_err(|e| ManagerError::bad_request(format!("invalid query string: {e}")))?,
        None => ListQuery::default(),
    };
    Ok(parse_filters(query.filters.as_deref()))
}

/// Config handlers. The namespace of each request comes from the
/// [`ClientConfig`](configmgr_core::ClientConfig) loaded by the pipeline.
pub(crate) struct ConfigHandlers {
    provider: Arc<dyn ServiceProvider>,
}

impl ConfigHandlers {
    pub(crate) fn new(provider: Arc<dyn ServiceProvider>) -> Self {
        Self { provider }
    }

    fn namespace(ctx: &RequestContext) -> ManagerResult<&str> {
        Ok(ctx.require_client_config()?.namespace.as_str())
    }

    fn identifier(ctx: &RequestContext, name: &str) -> ManagerResult<ResourceIdentifier> {
        Ok(ResourceIdentifier::new(Self::namespace(ctx)?, name))
    }

    async fn service(&self, ctx: &RequestContext) -> ManagerResult<Arc<dyn ConfigService>> {
        ctx.ensure_active()?;
        self.provider.config_service(ctx).await.map_err(|e| {
            error!(
                request_id = %ctx.request_id(),
                trace_id = ctx.trace_id().unwrap_or(""),
                error = %e,
                "failed to resolve config service"
            );
            if e.category() == ErrorCategory::Dependency {
                e
            } else {
                ManagerError::dependency_with_source("failed to resolve config service", e)
            }
        })
    }

    fn log_store_error(ctx: &RequestContext, action: &str, err: ManagerError) -> ManagerError {
        if !err.is_client_error() {
            error!(
                request_id = %ctx.request_id(),
                trace_id = ctx.trace_id().unwrap_or(""),
                error = %err,
                "error {action}"
            );
        }
        err
    }

    pub(crate) async fn list(&self, ctx: RequestContext, request: Request) -> MiddlewareResult {
        async {
            let filters = list_filters(&request)?;
            let svc = self.service(&ctx).await?;
            let namespace = Self::namespace(&ctx)?;
            ctx.ensure_active()?;
            let list = svc
                .list(&ctx, namespace, &filters)
                .await
                .map_err(|e| Self::log_store_error(&ctx, "listing Configs", e))?;
            Reply::json(&list)
        }
        .instrument(info_span!("config-list"))
        .await
    }

    pub(crate) async fn get(&self, ctx: RequestContext, name: String) -> MiddlewareResult {
        async {
            let svc = self.service(&ctx).await?;
            let id = Self::identifier(&ctx, &name)?;
            ctx.ensure_active()?;
            let obj = svc
                .get(&ctx, &id)
                .await
                .map_err(|e| Self::log_store_error(&ctx, &format!("getting Config '{name}'"), e))?;
            Reply::json(&obj)
        }
        .instrument(info_span!("config-get", name = %name))
        .await
    }

    pub(crate) async fn create(&self, ctx: RequestContext, request: Request) -> MiddlewareResult {
        async {
            let payload = ConfigPayload::from_slice(request.body())?;
            let svc = self.service(&ctx).await?;
            let obj = payload.into_object(Self::namespace(&ctx)?, None)?;
            ctx.ensure_active()?;
            let created = svc
                .add(&ctx, obj)
                .await
                .map_err(|e| Self::log_store_error(&ctx, "creating new Config", e))?;
            Reply::json(&created)
        }
        .instrument(info_span!("config-create"))
        .await
    }

    pub(crate) async fn update(
        &self,
        ctx: RequestContext,
        name: String,
        request: Request,
    ) -> MiddlewareResult {
        async {
            let payload = ConfigPayload::from_update_slice(request.body())?;
            let svc = self.service(&ctx).await?;
            let obj = payload.into_object(Self::namespace(&ctx)?, Some(&name))?;
            let id = obj.identifier.clone();
            ctx.ensure_active()?;
            let updated = svc
                .update(&ctx, &id, obj)
                .await
                .map_err(|e| Self::log_store_error(&ctx, &format!("updating Config '{name}'"), e))?;
            Reply::json(&updated)
        }
        .instrument(info_span!("config-update", name = %name))
        .await
    }

    pub(crate) async fn delete(&self, ctx: RequestContext, name: String) -> MiddlewareResult {
        async {
            let svc = self.service(&ctx).await?;
            ctx.ensure_active()?;
            let id = Self::identifier(&ctx, &name)?;
            svc.delete(&ctx, &id)
                .await
                .map_err(|e| Self::log_store_error(&ctx, &format!("deleting Config '{name}'"), e))?;
            Ok::<_, ManagerError>(Reply::Empty)
        }
        .instrument(info_span!("config-delete", name = %name))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters() {
        assert_eq!(
            parse_filters(Some("team:infra,env:prod")),
            vec!["team:infra", "env:prod"]
        );
        assert_eq!(parse_filters(Some("team:infra,,env=prod,")), vec!["team:infra", "env=prod"]);
        assert!(parse_filters(Some("")).is_empty());
        assert!(parse_filters(None).is_empty());
    }

    #[test]
    fn test_list_filters_decodes_query() {
        let request = http::Request::get("/v1/configs?filters=team%3Ainfra%2Cenv%3Aprod&limit=5")
            .body(bytes::Bytes::new())
            .unwrap();
        assert_eq!(list_filters(&request).unwrap(), vec!["team:infra", "env:prod"]);

        let request = http::Request::get("/v1/configs").body(bytes::Bytes::new()).unwrap();
        assert!(list_filters(&request).unwrap().is_empty());
    }
}
