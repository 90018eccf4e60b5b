//! Built-in pipeline stages.
//!
//! [`Pipeline::standard`](crate::Pipeline::standard) runs them in this order:
//!
//! 1. [`TracingMiddleware`] - request span and trace context
//! 2. [`LoggingMiddleware`] - start/end logs and request metrics
//! 3. [`ContextLoadingMiddleware`] - caller identity and client configuration
//! 4. [`AuthorizationMiddleware`] - access policy

mod authorization;
mod context_loading;
mod logging;
mod tracing;

pub use authorization::{
    AuthorizationMiddleware, AuthorizationResult, PolicyDecision, PolicyEvaluator, RbacBuilder,
    ANY_OPERATION,
};
pub use context_loading::{
    ContextLoader, ContextLoadingMiddleware, HeaderIdentityLoader,
    StaticClientConfigLoader, SERVICE_NAME_HEADER, USER_ID_HEADER, USER_ROLES_HEADER,
};
pub use logging::{LoggingMiddleware, Outcome};
pub use tracing::{SpanInfo, TraceContext, TraceFlags, TracingMiddleware, TRACEPARENT_HEADER};
