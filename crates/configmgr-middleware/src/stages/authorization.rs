//! Authorization stage.
//!
//! Decides whether the loaded caller may invoke the matched operation. Runs
//! after context loading, so the identity it sees is the one the loaders
//! produced.
//!
//! A denial never reaches the handler:
//!
//! | Caller | Error | Status |
//! |--------|-------|--------|
//! | anonymous | `Authentication` | 401 |
//! | authenticated | `Authorization` | 403 |
//!
//! # Example
//!
//! ```
//! use configmgr_middleware::stages::AuthorizationMiddleware;
//!
//! let rbac = AuthorizationMiddleware::rbac()
//!     .allow_role("admin", ["*"])
//!     .allow_role("viewer", ["config-list", "config-get"])
//!     .build();
//! # let _ = rbac;
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{MiddlewareResult, Request};
use configmgr_core::{CallerIdentity, ManagerError};
use configmgr_telemetry::metrics::record_authz_decision;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Operation ID wildcard granting every operation.
pub const ANY_OPERATION: &str = "*";

/// Enforces an access policy on every routed request.
#[derive(Debug, Clone)]
pub struct AuthorizationMiddleware {
    mode: AuthorizationMode,
}

#[derive(Debug, Clone)]
enum AuthorizationMode {
    AllowAll,
    DenyAll,
    Rbac(Arc<RbacConfig>),
    Custom(Arc<dyn PolicyEvaluator>),
}

#[derive(Debug, Default)]
struct RbacConfig {
    role_permissions: HashMap<String, HashSet<String>>,
    anonymous_operations: HashSet<String>,
    allow_anonymous: bool,
}

/// A pluggable policy.
pub trait PolicyEvaluator: Send + Sync + std::fmt::Debug {
    /// Decides whether `identity` may invoke `operation_id`.
    fn evaluate(&self, identity: &CallerIdentity, operation_id: &str) -> PolicyDecision;
}

/// The outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The request may proceed.
    Allow,
    /// The request is rejected.
    Deny {
        /// Why access was denied.
        reason: String,
    },
}

impl AuthorizationMiddleware {
    /// Permits every request.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            mode: AuthorizationMode::AllowAll,
        }
    }

    /// Rejects every request.
    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            mode: AuthorizationMode::DenyAll,
        }
    }

    /// Starts a role-based policy.
    #[must_use]
    pub fn rbac() -> RbacBuilder {
        RbacBuilder::default()
    }

    /// Delegates decisions to `evaluator`.
    #[must_use]
    pub fn custom<P: PolicyEvaluator + 'static>(evaluator: P) -> Self {
        Self {
            mode: AuthorizationMode::Custom(Arc::new(evaluator)),
        }
    }

    /// Evaluates the policy for `identity` and `operation_id`.
    #[must_use]
    pub fn evaluate(&self, identity: &CallerIdentity, operation_id: &str) -> PolicyDecision {
        match &self.mode {
            AuthorizationMode::AllowAll => PolicyDecision::Allow,
            AuthorizationMode::DenyAll => PolicyDecision::Deny {
                reason: "access denied by policy".to_string(),
            },
            AuthorizationMode::Rbac(config) => Self::evaluate_rbac(config, identity, operation_id),
            AuthorizationMode::Custom(evaluator) => evaluator.evaluate(identity, operation_id),
        }
    }

    fn evaluate_rbac(
        config: &RbacConfig,
        identity: &CallerIdentity,
        operation_id: &str,
    ) -> PolicyDecision {
        if !identity.is_authenticated() {
            if config.allow_anonymous || config.anonymous_operations.contains(operation_id) {
                return PolicyDecision::Allow;
            }
            return PolicyDecision::Deny {
                reason: "anonymous access not permitted".to_string(),
            };
        }

        let roles = identity.roles();
        let granted = roles.iter().any(|role| {
            config.role_permissions.get(role).is_some_and(|ops| {
                ops.contains(ANY_OPERATION) || ops.contains(operation_id)
            })
        });
        if granted {
            return PolicyDecision::Allow;
        }

        PolicyDecision::Deny {
            reason: format!("no permission for operation '{operation_id}' with roles {roles:?}"),
        }
    }

    fn denial(identity: &CallerIdentity, operation_id: &str, reason: String) -> ManagerError {
        if identity.is_authenticated() {
            ManagerError::authorization_for_operation(reason, operation_id)
        } else {
            ManagerError::authentication(reason)
        }
    }
}

impl Middleware for AuthorizationMiddleware {
    fn name(&self) -> &'static str {
        "authorization"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, MiddlewareResult> {
        Box::pin(async move {
            let operation_id = ctx.operation_id().unwrap_or("unknown").to_string();
            let decision = self.evaluate(ctx.identity(), &operation_id);

            match decision {
                PolicyDecision::Allow => {
                    record_authz_decision(true, "allowed");
                    let _ = ctx.insert_extension(AuthorizationResult {
                        allowed: true,
                        operation_id,
                        reason: None,
                    });
                    next.run(ctx, request).await
                }
                PolicyDecision::Deny { reason } => {
                    let label = if ctx.identity().is_authenticated() {
                        "forbidden"
                    } else {
                        "unauthenticated"
                    };
                    record_authz_decision(false, label);
                    let error = Self::denial(ctx.identity(), &operation_id, reason.clone());
                    tracing::debug!(
                        caller = %ctx.identity().log_id(),
                        operation_id = %operation_id,
                        reason = %reason,
                        "request denied"
                    );
                    let _ = ctx.insert_extension(AuthorizationResult {
                        allowed: false,
                        operation_id,
                        reason: Some(reason),
                    });
                    Err(error)
                }
            }
        })
    }
}

/// The decision, stored as a context extension for auditing.
#[derive(Debug, Clone)]
pub struct AuthorizationResult {
    /// Whether the request was allowed.
    pub allowed: bool,
    /// The evaluated operation.
    pub operation_id: String,
    /// Denial reason, if denied.
    pub reason: Option<String>,
}

/// Builder for a role-based policy.
#[derive(Debug, Default)]
pub struct RbacBuilder {
    config: RbacConfig,
}

impl RbacBuilder {
    /// Grants `role` the given operation IDs. Use `["*"]` for every operation.
    #[must_use]
    pub fn allow_role<S, I>(mut self, role: S, operations: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.config
            .role_permissions
            .entry(role.into())
            .or_default()
            .extend(operations.into_iter().map(Into::into));
        self
    }

    /// Lets anonymous callers invoke the given operations.
    #[must_use]
    pub fn allow_anonymous_operations<I>(mut self, operations: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.config
            .anonymous_operations
            .extend(operations.into_iter().map(Into::into));
        self
    }

    /// Lets anonymous callers invoke every operation.
    #[must_use]
    pub fn allow_anonymous(mut self) -> Self {
        self.config.allow_anonymous = true;
        self
    }

    /// Finishes the policy.
    #[must_use]
    pub fn build(self) -> AuthorizationMiddleware {
        AuthorizationMiddleware {
            mode: AuthorizationMode::Rbac(Arc::new(self.config)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reply;
    use bytes::Bytes;
    use configmgr_core::ErrorCategory;
    use configmgr_router::Params;
    use http::StatusCode;

    fn request() -> Request {
        http::Request::builder().uri("/v1/configs").body(Bytes::new()).unwrap()
    }

    fn ctx_for(operation_id: &str, identity: CallerIdentity) -> MiddlewareContext {
        let mut ctx = MiddlewareContext::for_route(operation_id, StatusCode::OK, Params::new());
        ctx.set_identity(identity);
        ctx
    }

    fn ok_handler<'a>() -> Next<'a> {
        Next::handler(|_ctx, _req| Box::pin(async { Ok(Reply::Empty) }))
    }

    fn viewer() -> CallerIdentity {
        CallerIdentity::user("u1", vec!["viewer".to_string()])
    }

    #[tokio::test]
    async fn test_allow_all_records_result() {
        let middleware = AuthorizationMiddleware::allow_all();
        let mut ctx = ctx_for("config-list", CallerIdentity::Anonymous);

        middleware.process(&mut ctx, request(), ok_handler()).await.unwrap();

        let result = ctx.get_extension::<AuthorizationResult>().unwrap();
        assert!(result.allowed);
        assert_eq!(result.operation_id, "config-list");
    }

    #[tokio::test]
    async fn test_deny_all_authenticated_is_forbidden() {
        let middleware = AuthorizationMiddleware::deny_all();
        let mut ctx = ctx_for("config-list", viewer());

        let err = middleware.process(&mut ctx, request(), ok_handler()).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert!(!ctx.get_extension::<AuthorizationResult>().unwrap().allowed);
    }

    #[tokio::test]
    async fn test_deny_all_anonymous_is_unauthenticated() {
        let middleware = AuthorizationMiddleware::deny_all();
        let mut ctx = ctx_for("config-list", CallerIdentity::Anonymous);

        let err = middleware.process(&mut ctx, request(), ok_handler()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authentication);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rbac_grants_listed_operations() {
        let middleware = AuthorizationMiddleware::rbac()
            .allow_role("viewer", ["config-list", "config-get"])
            .build();

        let mut ctx = ctx_for("config-get", viewer());
        assert!(middleware.process(&mut ctx, request(), ok_handler()).await.is_ok());

        let mut ctx = ctx_for("config-delete", viewer());
        let err = middleware.process(&mut ctx, request(), ok_handler()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Authorization);
    }

    #[test]
    fn test_rbac_wildcard_and_anonymous_operations() {
        let middleware = AuthorizationMiddleware::rbac()
            .allow_role("admin", [ANY_OPERATION])
            .allow_anonymous_operations(["config-list"])
            .build();
        let admin = CallerIdentity::user("root", vec!["admin".to_string()]);

        assert_eq!(middleware.evaluate(&admin, "config-delete"), PolicyDecision::Allow);
        assert_eq!(
            middleware.evaluate(&CallerIdentity::Anonymous, "config-list"),
            PolicyDecision::Allow
        );
        assert!(matches!(
            middleware.evaluate(&CallerIdentity::Anonymous, "config-create"),
            PolicyDecision::Deny { .. }
        ));
    }

    #[test]
    fn test_allow_role_accumulates() {
        let middleware = AuthorizationMiddleware::rbac()
            .allow_role("viewer", ["config-list"])
            .allow_role("viewer", ["config-get"])
            .build();

        assert_eq!(middleware.evaluate(&viewer(), "config-list"), PolicyDecision::Allow);
        assert_eq!(middleware.evaluate(&viewer(), "config-get"), PolicyDecision::Allow);
    }

    #[derive(Debug)]
    struct ServicesOnly;

    impl PolicyEvaluator for ServicesOnly {
        fn evaluate(&self, identity: &CallerIdentity, _operation_id: &str) -> PolicyDecision {
            if matches!(identity, CallerIdentity::Service { .. }) {
                PolicyDecision::Allow
            } else {
                PolicyDecision::Deny {
                    reason: "services only".to_string(),
                }
            }
        }
    }

    #[tokio::test]
    async fn test_custom_evaluator() {
        let middleware = AuthorizationMiddleware::custom(ServicesOnly);

        let mut ctx = ctx_for("config-update", CallerIdentity::service("operator"));
        assert!(middleware.process(&mut ctx, request(), ok_handler()).await.is_ok());

        let mut ctx = ctx_for("config-update", viewer());
        let err = middleware.process(&mut ctx, request(), ok_handler()).await.unwrap_err();
        assert_eq!(err.message(), "services only");
    }
}
