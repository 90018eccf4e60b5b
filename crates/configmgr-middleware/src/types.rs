//! Request and reply types used throughout the pipeline.

use bytes::Bytes;
use configmgr_core::{ManagerError, ManagerResult};
use serde::Serialize;

/// The request type seen by stages and handlers.
///
/// The body is fully collected before dispatch.
pub type Request = http::Request<Bytes>;

/// What a stage or handler produces on success.
///
/// The router encodes [`Reply::Json`] as the response body and
/// [`Reply::Empty`] as an empty body, both with the route's success status.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A JSON document.
    Json(serde_json::Value),
    /// No body (delete-style handlers).
    Empty,
}

impl Reply {
    /// Serializes `value` into a JSON reply.
    pub fn json<T: Serialize>(value: &T) -> ManagerResult<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| ManagerError::internal(format!("failed to encode reply: {e}")))
    }

    /// Returns true for [`Reply::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// The result of running a stage, the rest of the chain, or a handler.
pub type MiddlewareResult = Result<Reply, ManagerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_reply() {
        #[derive(Serialize)]
        struct Body {
            name: &'static str,
        }

        let reply = Reply::json(&Body { name: "cfg1" }).unwrap();
        assert_eq!(reply, Reply::Json(json!({"name": "cfg1"})));
        assert!(!reply.is_empty());
    }

    #[test]
    fn test_empty_reply() {
        assert!(Reply::Empty.is_empty());
    }
}
