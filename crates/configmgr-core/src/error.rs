//! Error types for the Config manager.
//!
//! [`ManagerError`] is tagged at the point of origin and carried unchanged
//! through the middleware pipeline and router. Each variant maps to an
//! [`ErrorCategory`], which in turn maps to an HTTP status code:
//!
//! | `ErrorCategory` | Status |
//! |---|---|
//! | `BadRequest` | 400 |
//! | `Authentication` | 401 |
//! | `Authorization` | 403 |
//! | `NotFound` | 404 |
//! | `MethodNotAllowed` | 405 |
//! | `Cancelled` | 408 |
//! | `Conflict` | 409 |
//! | `Dependency` | 500, or the code the dependency attached |
//! | `Callback` | 500 |
//! | `Internal` | 500 |

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`ManagerError`].
pub type ManagerResult<T> = Result<T, ManagerError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed input (bad body, invalid name).
    BadRequest,
    /// Missing or invalid credentials.
    Authentication,
    /// The principal lacks access.
    Authorization,
    /// Object or route absent.
    NotFound,
    /// Path exists but the method is not registered.
    MethodNotAllowed,
    /// Conflicting write (e.g. object already exists).
    Conflict,
    /// Store or context-loading failure.
    Dependency,
    /// Reconciler hook failure.
    Callback,
    /// The caller cancelled the request.
    Cancelled,
    /// Anything else.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Authorization => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::Dependency | Self::Callback | Self::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` for categories caused by the caller rather than the server.
    ///
    /// Client errors are never logged as server faults.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::BadRequest
                | Self::Authentication
                | Self::Authorization
                | Self::NotFound
                | Self::MethodNotAllowed
                | Self::Conflict
                | Self::Cancelled
        )
    }
}

/// Standard error type for the Config manager.
///
/// # Example
///
/// ```
/// use configmgr_core::{ManagerError, ErrorCategory};
/// use http::StatusCode;
///
/// let err = ManagerError::not_found_resource("ns1/cfg1");
/// assert_eq!(err.category(), ErrorCategory::NotFound);
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
///
/// // A dependency may attach its own status code, which is forwarded verbatim.
/// let err = ManagerError::dependency_with_status(StatusCode::CONFLICT, "already exists");
/// assert_eq!(err.status_code(), StatusCode::CONFLICT);
/// ```
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Malformed request input.
    #[error("bad request: {message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// Authentication failed or is missing.
    #[error("authentication required: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// Authorization denied.
    #[error("access denied: {message}")]
    Authorization {
        /// Human-readable error message.
        message: String,
        /// The operation that was denied.
        operation_id: Option<String>,
    },

    /// Resource or route not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
        /// Identifier of the missing resource, if any.
        resource_id: Option<String>,
    },

    /// Method not registered for a known path.
    #[error("method not allowed: {message}")]
    MethodNotAllowed {
        /// Human-readable error message.
        message: String,
    },

    /// Conflicting write.
    #[error("conflict: {message}")]
    Conflict {
        /// Human-readable error message.
        message: String,
    },

    /// A dependency (store, context loader) failed.
    #[error("dependency error: {message}")]
    Dependency {
        /// Human-readable error message.
        message: String,
        /// Status code attached by the dependency, forwarded verbatim.
        status: Option<StatusCode>,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A reconciler hook failed or panicked.
    #[error("callback failed: {message}")]
    Callback {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The request was cancelled by its caller.
    #[error("request cancelled: {message}")]
    Cancelled {
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl ManagerError {
    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[must_use]
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an authorization error.
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
            operation_id: None,
        }
    }

    /// Creates an authorization error with operation context.
    #[must_use]
    pub fn authorization_for_operation(
        message: impl Into<String>,
        operation_id: impl Into<String>,
    ) -> Self {
        Self::Authorization {
            message: message.into(),
            operation_id: Some(operation_id.into()),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            resource_id: None,
        }
    }

    /// Creates a not found error for a Config object.
    #[must_use]
    pub fn not_found_resource(resource_id: impl Into<String>) -> Self {
        let resource_id = resource_id.into();
        Self::NotFound {
            message: format!("Config '{resource_id}' not found"),
            resource_id: Some(resource_id),
        }
    }

    /// Creates a method not allowed error.
    #[must_use]
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            message: message.into(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a dependency error without a specific status code.
    #[must_use]
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Creates a dependency error carrying an explicit status code.
    #[must_use]
    pub fn dependency_with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Creates a dependency error wrapping a source error.
    pub fn dependency_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Dependency {
            message: message.into(),
            status: None,
            source: Some(source.into()),
        }
    }

    /// Creates a callback error.
    #[must_use]
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a callback error wrapping a source error.
    pub fn callback_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Callback {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::BadRequest { .. } => ErrorCategory::BadRequest,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Authorization { .. } => ErrorCategory::Authorization,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::MethodNotAllowed { .. } => ErrorCategory::MethodNotAllowed,
            Self::Conflict { .. } => ErrorCategory::Conflict,
            Self::Dependency { .. } => ErrorCategory::Dependency,
            Self::Callback { .. } => ErrorCategory::Callback,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    ///
    /// An explicit code attached by a dependency wins over the category default.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Dependency {
                status: Some(status),
                ..
            } => *status,
            _ => self.category().default_status_code(),
        }
    }

    /// Returns `true` if the error was caused by the caller.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Returns the bare message, without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message }
            | Self::Authentication { message }
            | Self::Authorization { message, .. }
            | Self::NotFound { message, .. }
            | Self::MethodNotAllowed { message }
            | Self::Conflict { message }
            | Self::Dependency { message, .. }
            | Self::Callback { message, .. }
            | Self::Cancelled { message }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                category: self.category(),
                status: self.status_code().as_u16(),
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    /// Returns a machine-readable error code.
    const fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "BAD_REQUEST",
            Self::Authentication { .. } => "AUTHENTICATION_REQUIRED",
            Self::Authorization { .. } => "ACCESS_DENIED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            Self::Conflict { .. } => "CONFLICT",
            Self::Dependency { .. } => "DEPENDENCY_ERROR",
            Self::Callback { .. } => "CALLBACK_ERROR",
            Self::Cancelled { .. } => "CANCELLED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound {
                resource_id: Some(id),
                ..
            } => Some(serde_json::json!({ "resource_id": id })),
            Self::Authorization {
                operation_id: Some(op),
                ..
            } => Some(serde_json::json!({ "operation_id": op })),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ManagerError {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(err.to_string())
    }
}

/// Extracts the message of a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Serializable error envelope for HTTP responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// HTTP status code carried by the response.
    pub status: u16,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_from_payload() {
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("boom"));
        let fixed: Box<dyn std::any::Any + Send> = Box::new("static boom");
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(owned.as_ref()), "boom");
        assert_eq!(panic_message(fixed.as_ref()), "static boom");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_category_status_codes() {
        assert_eq!(
            ManagerError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ManagerError::authentication("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ManagerError::authorization("x").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ManagerError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ManagerError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unannotated_dependency_defaults_to_500() {
        let err = ManagerError::dependency("store unreachable");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_dependency_status_is_forwarded() {
        let err = ManagerError::dependency_with_status(StatusCode::UNPROCESSABLE_ENTITY, "bad spec");
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.category(), ErrorCategory::Dependency);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_envelope_serialization() {
        let err = ManagerError::not_found_resource("ns1/cfg1");
        let envelope = err.to_envelope(Some("req-1"));
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["category"], "not_found");
        assert_eq!(json["error"]["status"], 404);
        assert_eq!(json["error"]["details"]["resource_id"], "ns1/cfg1");
        assert_eq!(json["request_id"], "req-1");
    }

    #[test]
    fn test_envelope_omits_missing_request_id() {
        let envelope = ManagerError::internal("boom").to_envelope(None);
        let json = serde_json::to_value(&envelope).unwrap();
        assert!(json.get("request_id").is_none());
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn test_message_has_no_prefix() {
        let err = ManagerError::conflict("Config 'ns1/a' already exists");
        assert_eq!(err.message(), "Config 'ns1/a' already exists");
        assert_eq!(err.to_string(), "conflict: Config 'ns1/a' already exists");
    }

    #[test]
    fn test_json_error_is_bad_request() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ManagerError = parse_err.into();
        assert_eq!(err.category(), ErrorCategory::BadRequest);
    }

    #[test]
    fn test_client_error_categories() {
        assert!(ErrorCategory::NotFound.is_client_error());
        assert!(ErrorCategory::Authorization.is_client_error());
        assert!(!ErrorCategory::Dependency.is_client_error());
        assert!(!ErrorCategory::Callback.is_client_error());
    }
}
