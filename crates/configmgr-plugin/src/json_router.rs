//! The CRUD router.
//!
//! [`JsonRouter`] owns the route table and the middleware [`Pipeline`]. A
//! request is matched, given a [`MiddlewareContext`] carrying the route's
//! operation ID and path variables, run through the pipeline to its handler,
//! and the result encoded as JSON.
//!
//! | Result | Status | Body |
//! |--------|--------|------|
//! | `Ok(Reply::Json(v))` | route success status | `v` |
//! | `Ok(Reply::Empty)` | route success status | empty |
//! | `Err(e)` | `e.status_code()` | [`ErrorEnvelope`](configmgr_core::ErrorEnvelope) |
//! | no route for the path | 404 | envelope |
//! | path known, method not | 405 with `Allow` | envelope |
//! | a stage or handler panicked | 500 | `Internal` envelope |

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use configmgr_core::{panic_message, Cancellation, ManagerError};
use configmgr_middleware::{
    BoxFuture, MiddlewareContext, MiddlewareResult, Pipeline, Reply, Request,
};
use configmgr_router::{Lookup, RouteError, Router};
use futures_util::FutureExt;
use http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use http::{Method, Response, StatusCode};

/// Header echoing the request ID on every routed response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A route handler.
///
/// Handlers read what they need from the context synchronously and return a
/// `'static` future, so the context stays owned by the pipeline.
pub type JsonHandler = Arc<
    dyn Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult> + Send + Sync,
>;

/// A registered route. Immutable once the router is built.
#[derive(Clone)]
pub struct RouteSpec {
    pattern: String,
    method: Method,
    operation_id: String,
    success_status: StatusCode,
    handler: JsonHandler,
}

impl RouteSpec {
    /// Returns the fully expanded path pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the operation ID used by authorization and metrics.
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Returns the status of a successful response.
    pub const fn success_status(&self) -> StatusCode {
        self.success_status
    }
}

impl std::fmt::Debug for RouteSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteSpec")
            .field("pattern", &self.pattern)
            .field("method", &self.method)
            .field("operation_id", &self.operation_id)
            .field("success_status", &self.success_status)
            .finish_non_exhaustive()
    }
}

/// Routes requests through the pipeline to handlers and encodes replies.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use configmgr_middleware::{Pipeline, Reply};
/// use configmgr_plugin::JsonRouter;
/// use http::{Method, StatusCode};
///
/// # tokio_test::block_on(async {
/// let mut router = JsonRouter::new(Pipeline::builder().build());
/// router
///     .subroute("v1/")
///     .handle("ping", Method::GET, "ping", |_ctx, _req| {
///         Box::pin(async { Ok(Reply::Json(serde_json::json!({"ok": true}))) })
///     })
///     .unwrap();
///
/// let request = http::Request::get("/v1/ping").body(Bytes::new()).unwrap();
/// let response = router.dispatch(request).await;
/// assert_eq!(response.status(), StatusCode::OK);
/// # });
/// ```
pub struct JsonRouter {
    routes: Router<RouteSpec>,
    pipeline: Pipeline,
}

impl JsonRouter {
    /// Creates an empty router whose routes all run through `pipeline`.
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            routes: Router::new(),
            pipeline,
        }
    }

    /// Registers a route answering `200 OK` on success.
    ///
    /// # Errors
    ///
    /// [`RouteError::Duplicate`] if `(method, pattern)` is taken,
    /// [`RouteError::InvalidPattern`] if the pattern is malformed.
    pub fn handle<H>(
        &mut self,
        pattern: &str,
        method: Method,
        operation_id: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + Sync
            + 'static,
    {
        self.handle_with_code(pattern, method, operation_id, handler, StatusCode::OK)
    }

    /// Registers a route answering `success_status` on success.
    ///
    /// # Errors
    ///
    /// Same as [`handle`](Self::handle).
    pub fn handle_with_code<H>(
        &mut self,
        pattern: &str,
        method: Method,
        operation_id: &str,
        handler: H,
        success_status: StatusCode,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + Sync
            + 'static,
    {
        let pattern = join_path("", pattern);
        let spec = RouteSpec {
            pattern: pattern.clone(),
            method: method.clone(),
            operation_id: operation_id.to_string(),
            success_status,
            handler: Arc::new(handler),
        };
        self.routes.insert(&pattern, method.clone(), spec)?;
        tracing::debug!(%method, %pattern, operation_id, "registered route");
        Ok(self)
    }

    /// Returns a registration scope that prefixes every pattern with `prefix`.
    pub fn subroute(&mut self, prefix: &str) -> Subroute<'_> {
        Subroute {
            router: self,
            prefix: join_path("", prefix),
        }
    }

    /// Returns the registered `(method, pattern)` pairs in registration order.
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.routes
            .routes()
            .map(|(method, pattern)| (method.clone(), pattern.to_string()))
            .collect()
    }

    /// Returns the pipeline.
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Dispatches a request with a fresh cancellation token.
    pub async fn dispatch(&self, request: Request) -> Response<Bytes> {
        self.dispatch_with(request, Cancellation::new()).await
    }

    /// Dispatches a request whose caller may cancel it through `cancellation`.
    pub async fn dispatch_with(&self, request: Request, cancellation: Cancellation) -> Response<Bytes> {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let route = match self.routes.lookup(&method, &path) {
            Lookup::Found(route) => route,
            Lookup::MethodNotAllowed { allowed } => {
                let err = ManagerError::method_not_allowed(format!(
                    "method {method} is not allowed for {path}"
                ));
                let mut response = encode_error(&err, None);
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                return response;
            }
            Lookup::NotFound => {
                let err = ManagerError::not_found(format!("no route for {method} {path}"));
                return encode_error(&err, None);
            }
        };

        let spec = route.value;
        let mut ctx =
            MiddlewareContext::for_route(spec.operation_id.clone(), spec.success_status, route.params);
        ctx.set_cancellation(cancellation);

        let handler = Arc::clone(&spec.handler);
        let processed = AssertUnwindSafe(
            self.pipeline
                .process(&mut ctx, request, move |ctx, request| handler(ctx, request)),
        )
        .catch_unwind()
        .await;

        let result = processed.unwrap_or_else(|payload| {
            tracing::error!(
                operation_id = %spec.operation_id,
                request_id = %ctx.request_id(),
                panic = panic_message(payload.as_ref()),
                "request handling panicked"
            );
            Err(ManagerError::internal(format!(
                "internal error while handling {}",
                spec.operation_id
            )))
        });

        encode(&ctx, result)
    }
}

impl std::fmt::Debug for JsonRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRouter")
            .field("routes", &self.routes())
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

/// A registration scope with a path prefix.
///
/// Created by [`JsonRouter::subroute`]; scopes nest.
#[derive(Debug)]
pub struct Subroute<'a> {
    router: &'a mut JsonRouter,
    prefix: String,
}

impl Subroute<'_> {
    /// Registers `prefix + pattern` answering `200 OK`.
    ///
    /// # Errors
    ///
    /// Same as [`JsonRouter::handle`].
    pub fn handle<H>(
        &mut self,
        pattern: &str,
        method: Method,
        operation_id: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + Sync
            + 'static,
    {
        self.handle_with_code(pattern, method, operation_id, handler, StatusCode::OK)
    }

    /// Registers `prefix + pattern` answering `success_status`.
    ///
    /// # Errors
    ///
    /// Same as [`JsonRouter::handle`].
    pub fn handle_with_code<H>(
        &mut self,
        pattern: &str,
        method: Method,
        operation_id: &str,
        handler: H,
        success_status: StatusCode,
    ) -> Result<&mut Self, RouteError>
    where
        H: Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, MiddlewareResult>
            + Send
            + Sync
            + 'static,
    {
        let full = join_path(&self.prefix, pattern);
        self.router
            .handle_with_code(&full, method, operation_id, handler, success_status)?;
        Ok(self)
    }

    /// Returns a nested scope.
    pub fn subroute(&mut self, prefix: &str) -> Subroute<'_> {
        Subroute {
            prefix: join_path(&self.prefix, prefix),
            router: self.router,
        }
    }

    /// Returns this scope's prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

/// Joins path fragments with single slashes and a leading slash.
fn join_path(prefix: &str, pattern: &str) -> String {
    let segments: Vec<&str> = prefix
        .split('/')
        .chain(pattern.split('/'))
        .filter(|s| !s.is_empty())
        .collect();
    format!("/{}", segments.join("/"))
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Encodes an error as an envelope response.
pub(crate) fn encode_error(err: &ManagerError, request_id: Option<&str>) -> Response<Bytes> {
    let envelope = err.to_envelope(request_id);
    let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| {
        br#"{"error":{"code":"INTERNAL_ERROR","message":"failed to encode error"}}"#.to_vec()
    });
    json_response(err.status_code(), body)
}

fn encode(ctx: &MiddlewareContext, result: MiddlewareResult) -> Response<Bytes> {
    let request_id = ctx.request_id().to_string();

    let mut response = match result {
        Ok(Reply::Json(value)) => match serde_json::to_vec(&value) {
            Ok(body) => json_response(ctx.success_status(), body),
            Err(e) => encode_error(
                &ManagerError::internal(format!("failed to encode response: {e}")),
                Some(&request_id),
            ),
        },
        Ok(Reply::Empty) => {
            let mut response = Response::new(Bytes::new());
            *response.status_mut() = ctx.success_status();
            response
        }
        Err(err) => encode_error(&err, Some(&request_id)),
    };

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn empty_pipeline() -> Pipeline {
        Pipeline::builder().build()
    }

    fn request(method: Method, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
    }

    fn body_json(response: &Response<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn echo_name(ctx: &mut MiddlewareContext, _req: Request) -> BoxFuture<'static, MiddlewareResult> {
        let name = ctx.path_var("name").map(ToString::to_string);
        Box::pin(async move { Ok(Reply::Json(json!({ "name": name }))) })
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "v1/"), "/v1");
        assert_eq!(join_path("/v1", "configs"), "/v1/configs");
        assert_eq!(join_path("/v1/configs", "{name}"), "/v1/configs/{name}");
        assert_eq!(join_path("v1//", "/configs/"), "/v1/configs");
    }

    #[test]
    fn test_subroute_expands_patterns() {
        let mut router = JsonRouter::new(empty_pipeline());
        {
            let mut v1 = router.subroute("v1/");
            v1.handle("configs", Method::GET, "config-list", echo_name).unwrap();
            v1.subroute("configs/")
                .handle("{name}", Method::GET, "config-get", echo_name)
                .unwrap();
        }

        assert_eq!(
            router.routes(),
            vec![
                (Method::GET, "/v1/configs".to_string()),
                (Method::GET, "/v1/configs/{name}".to_string()),
            ]
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut router = JsonRouter::new(empty_pipeline());
        router
            .handle("/v1/configs/{name}", Method::GET, "config-get", echo_name)
            .unwrap();

        let err = router
            .subroute("v1")
            .subroute("configs")
            .handle("{name}", Method::GET, "config-get-again", echo_name)
            .unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { pattern, .. } if pattern == "/v1/configs/{name}"));
    }

    #[test]
    fn test_catch_all_rejected() {
        let mut router = JsonRouter::new(empty_pipeline());
        let err = router
            .handle("/v1/*rest", Method::GET, "any", echo_name)
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn test_dispatch_binds_path_variables() {
        let mut router = JsonRouter::new(empty_pipeline());
        router
            .handle("/v1/configs/{name}", Method::GET, "config-get", echo_name)
            .unwrap();

        let response = router.dispatch(request(Method::GET, "/v1/configs/cfg1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(&response), json!({"name": "cfg1"}));
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_envelope() {
        let router = JsonRouter::new(empty_pipeline());
        let response = router.dispatch(request(Method::GET, "/v2/nothing")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(&response)["error"]["category"], "not_found");
    }

    #[tokio::test]
    async fn test_unbound_method_is_405_with_allow() {
        let mut router = JsonRouter::new(empty_pipeline());
        router
            .handle("/v1/configs", Method::GET, "config-list", echo_name)
            .unwrap();
        router
            .handle_with_code("/v1/configs", Method::POST, "config-create", echo_name, StatusCode::CREATED)
            .unwrap();

        let response = router.dispatch(request(Method::PATCH, "/v1/configs")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers()[ALLOW].to_str().unwrap();
        assert!(allow.contains("GET"));
        assert!(allow.contains("POST"));
    }

    #[tokio::test]
    async fn test_empty_reply_uses_route_status() {
        let mut router = JsonRouter::new(empty_pipeline());
        router
            .handle_with_code(
                "/v1/configs/{name}",
                Method::DELETE,
                "config-delete",
                |_ctx, _req| Box::pin(async { Ok(Reply::Empty) }),
                StatusCode::NO_CONTENT,
            )
            .unwrap();

        let response = router.dispatch(request(Method::DELETE, "/v1/configs/cfg1")).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_uses_error_status() {
        let mut router = JsonRouter::new(empty_pipeline());
        router
            .handle("/v1/configs/{name}", Method::PUT, "config-update", |_ctx, _req| {
                Box::pin(async {
                    Err(ManagerError::dependency_with_status(
                        StatusCode::CONFLICT,
                        "resource version mismatch",
                    ))
                })
            })
            .unwrap();
        router
            .handle("/v1/configs", Method::GET, "config-list", |_ctx, _req| {
                Box::pin(async { Err(ManagerError::dependency("store unreachable")) })
            })
            .unwrap();

        let response = router.dispatch(request(Method::PUT, "/v1/configs/cfg1")).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(&response);
        assert_eq!(body["error"]["status"], 409);
        assert_eq!(
            body["request_id"].as_str(),
            response.headers()[REQUEST_ID_HEADER].to_str().ok()
        );

        let response = router.dispatch(request(Method::GET, "/v1/configs")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
