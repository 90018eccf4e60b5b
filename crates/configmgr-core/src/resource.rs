//! The Config resource model.
//!
//! A [`ConfigObject`] is addressed by a [`ResourceIdentifier`] and carries
//! store-assigned [`ObjectMetadata`] plus an opaque `spec` payload. The core
//! never interprets `spec`.

use crate::error::{ManagerError, ManagerResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The only kind this system manages.
pub const CONFIG_KIND: &str = "Config";

/// Maximum length of an object name, matching Kubernetes DNS subdomain names.
const MAX_NAME_LEN: usize = 253;

fn default_kind() -> String {
    CONFIG_KIND.to_string()
}

/// Uniquely addresses one Config object.
///
/// Identifiers are immutable once built and order by `(namespace, name)`.
///
/// ```
/// use configmgr_core::ResourceIdentifier;
///
/// let id = ResourceIdentifier::new("ns1", "cfg1");
/// assert_eq!(id.kind(), "Config");
/// assert_eq!(id.to_string(), "ns1/cfg1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    namespace: String,
    name: String,
    #[serde(default = "default_kind")]
    kind: String,
}

impl ResourceIdentifier {
    /// Creates an identifier for a Config object.
    #[must_use]
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            kind: default_kind(),
        }
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the kind (always [`CONFIG_KIND`]).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Store-owned metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    /// Opaque version token assigned by the store on every write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Monotonic write counter assigned by the store.
    #[serde(default)]
    pub generation: u64,
    /// Labels used for list filtering.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Free-form annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A Config resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigObject {
    /// Address of the object.
    pub identifier: ResourceIdentifier,
    /// Store-owned metadata.
    #[serde(default)]
    pub metadata: ObjectMetadata,
    /// Domain payload, opaque to this crate.
    #[serde(default)]
    pub spec: serde_json::Value,
}

impl ConfigObject {
    /// Creates an object with empty metadata.
    #[must_use]
    pub fn new(identifier: ResourceIdentifier, spec: serde_json::Value) -> Self {
        Self {
            identifier,
            metadata: ObjectMetadata::default(),
            spec,
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.labels.insert(key.into(), value.into());
        self
    }

    /// Returns the resource version, if the store assigned one.
    #[must_use]
    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_deref()
    }

    /// Returns the `(identifier, version)` pair the reconciler keys on.
    #[must_use]
    pub fn version_key(&self) -> (&ResourceIdentifier, Option<&str>) {
        (&self.identifier, self.resource_version())
    }

    /// Compares user-owned content, ignoring store-assigned metadata.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.metadata.labels == other.metadata.labels
            && self.metadata.annotations == other.metadata.annotations
            && self.spec == other.spec
    }
}

/// Request-body form of a Config object.
///
/// Updates also accept the full object form a read returns; see
/// [`from_update_slice`](Self::from_update_slice).
///
/// ```
/// use configmgr_core::ConfigPayload;
///
/// let payload: ConfigPayload =
///     serde_json::from_str(r#"{"name":"cfg1","spec":{"k":"v"}}"#).unwrap();
/// let obj = payload.into_object("ns1", None).unwrap();
/// assert_eq!(obj.identifier.namespace(), "ns1");
/// assert_eq!(obj.identifier.name(), "cfg1");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPayload {
    /// Object name. Required on create, optional on update.
    #[serde(default)]
    pub name: Option<String>,
    /// Labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Annotations.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    /// Domain payload.
    #[serde(default)]
    pub spec: serde_json::Value,
    /// Version the caller last read. A stale value makes the store reject
    /// the update.
    #[serde(default, rename = "resourceVersion", skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    /// Namespace named by a full-object body. Must match the request's.
    #[serde(skip)]
    pub namespace: Option<String>,
}

impl From<ConfigObject> for ConfigPayload {
    /// Keeps user-owned fields and the resource version; drops the
    /// generation and timestamps.
    fn from(obj: ConfigObject) -> Self {
        let ResourceIdentifier {
            namespace, name, ..
        } = obj.identifier;
        Self {
            name: Some(name),
            labels: obj.metadata.labels,
            annotations: obj.metadata.annotations,
            spec: obj.spec,
            resource_version: obj.metadata.resource_version,
            namespace: Some(namespace),
        }
    }
}

impl ConfigPayload {
    /// Decodes a request body.
    ///
    /// Malformed bodies are a [`ManagerError::BadRequest`].
    pub fn from_slice(body: &[u8]) -> ManagerResult<Self> {
        if body.is_empty() {
            return Err(ManagerError::bad_request("request body is empty"));
        }
        Ok(serde_json::from_slice(body)?)
    }

    /// Decodes an update body.
    ///
    /// A body with an `identifier` field is read as a full [`ConfigObject`],
    /// so the result of a read can be modified and sent back as is.
    ///
    /// ```
    /// use configmgr_core::ConfigPayload;
    ///
    /// let body = br#"{
    ///     "identifier": {"namespace": "ns1", "name": "cfg1", "kind": "Config"},
    ///     "metadata": {"resourceVersion": "4", "generation": 2},
    ///     "spec": {"k": "v"}
    /// }"#;
    /// let obj = ConfigPayload::from_update_slice(body)
    ///     .unwrap()
    ///     .into_object("ns1", Some("cfg1"))
    ///     .unwrap();
    /// assert_eq!(obj.resource_version(), Some("4"));
    /// assert_eq!(obj.metadata.generation, 0);
    /// ```
    pub fn from_update_slice(body: &[u8]) -> ManagerResult<Self> {
        if body.is_empty() {
            return Err(ManagerError::bad_request("request body is empty"));
        }
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if value.get("identifier").is_some() {
            let obj: ConfigObject = serde_json::from_value(value)?;
            return Ok(obj.into());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Builds an object in `namespace`.
    ///
    /// `path_name` is the name bound from the request path (update). When
    /// both a path name and a body name are present they must agree, as must
    /// a body namespace and `namespace`.
    pub fn into_object(self, namespace: &str, path_name: Option<&str>) -> ManagerResult<ConfigObject> {
        if let Some(body_ns) = self.namespace.as_deref().filter(|ns| *ns != namespace) {
            return Err(ManagerError::bad_request(format!(
                "body namespace '{body_ns}' does not match '{namespace}'"
            )));
        }
        let name = match (path_name, self.name.as_deref()) {
            (Some(path), Some(body)) if path != body => {
                return Err(ManagerError::bad_request(format!(
                    "body name '{body}' does not match path name '{path}'"
                )))
            }
            (Some(path), _) => path.to_string(),
            (None, Some(body)) => body.to_string(),
            (None, None) => return Err(ManagerError::bad_request("missing field `name`")),
        };
        validate_name(&name)?;

        Ok(ConfigObject {
            identifier: ResourceIdentifier::new(namespace, name),
            metadata: ObjectMetadata {
                resource_version: self.resource_version,
                labels: self.labels,
                annotations: self.annotations,
                ..ObjectMetadata::default()
            },
            spec: self.spec,
        })
    }
}

/// Validates an object name: lowercase alphanumerics, `-` and `.`, starting
/// and ending with an alphanumeric.
pub fn validate_name(name: &str) -> ManagerResult<()> {
    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let ok = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.chars().all(|c| valid_char(c) || c == '-' || c == '.')
        && name.chars().next().is_some_and(valid_char)
        && name.chars().last().is_some_and(valid_char);

    if ok {
        Ok(())
    } else {
        Err(ManagerError::bad_request(format!("invalid Config name '{name}'")))
    }
}

/// The list envelope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigList {
    /// Matching objects, ordered by name.
    pub items: Vec<ConfigObject>,
    /// Store version at the time of listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifier_serializes_with_kind() {
        let id = ResourceIdentifier::new("ns1", "cfg1");
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, json!({"namespace": "ns1", "name": "cfg1", "kind": "Config"}));
    }

    #[test]
    fn test_identifier_kind_defaults_on_decode() {
        let id: ResourceIdentifier =
            serde_json::from_value(json!({"namespace": "ns1", "name": "cfg1"})).unwrap();
        assert_eq!(id.kind(), CONFIG_KIND);
    }

    #[test]
    fn test_payload_rejects_unknown_fields() {
        let err = serde_json::from_str::<ConfigPayload>(r#"{"name":"a","bogus":1}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_payload_empty_body_is_bad_request() {
        let err = ConfigPayload::from_slice(b"").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::BadRequest);
    }

    #[test]
    fn test_payload_malformed_body_is_bad_request() {
        let err = ConfigPayload::from_slice(b"{\"name\":").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::BadRequest);
    }

    #[test]
    fn test_payload_name_mismatch() {
        let payload = ConfigPayload {
            name: Some("other".to_string()),
            ..ConfigPayload::default()
        };
        assert!(payload.into_object("ns1", Some("cfg1")).is_err());
    }

    #[test]
    fn test_payload_path_name_wins_when_body_omits_name() {
        let obj = ConfigPayload::default().into_object("ns1", Some("cfg1")).unwrap();
        assert_eq!(obj.identifier, ResourceIdentifier::new("ns1", "cfg1"));
    }

    #[test]
    fn test_payload_requires_name_on_create() {
        assert!(ConfigPayload::default().into_object("ns1", None).is_err());
    }

    #[test]
    fn test_update_body_accepts_read_result() {
        let mut read = ConfigObject::new(ResourceIdentifier::new("ns1", "cfg1"), json!({"k": "v"}))
            .with_label("team", "infra");
        read.metadata.resource_version = Some("3".to_string());
        read.metadata.generation = 2;
        read.metadata.created_at = Some(Utc::now());
        let body = serde_json::to_vec(&read).unwrap();

        let obj = ConfigPayload::from_update_slice(&body)
            .unwrap()
            .into_object("ns1", Some("cfg1"))
            .unwrap();

        assert!(obj.same_content(&read));
        assert_eq!(obj.resource_version(), Some("3"));
        assert_eq!(obj.metadata.generation, 0);
        assert!(obj.metadata.created_at.is_none());
    }

    #[test]
    fn test_update_body_payload_form_carries_version() {
        let obj = ConfigPayload::from_update_slice(br#"{"resourceVersion":"5","spec":{}}"#)
            .unwrap()
            .into_object("ns1", Some("cfg1"))
            .unwrap();
        assert_eq!(obj.resource_version(), Some("5"));

        let err = ConfigPayload::from_update_slice(br#"{"spec":{},"bogus":1}"#).unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::BadRequest);
    }

    #[test]
    fn test_update_body_rejects_other_namespace_or_name() {
        let body = serde_json::to_vec(&ConfigObject::new(
            ResourceIdentifier::new("ns2", "cfg1"),
            json!({}),
        ))
        .unwrap();
        let payload = ConfigPayload::from_update_slice(&body).unwrap();
        assert!(payload.clone().into_object("ns1", Some("cfg1")).is_err());
        assert!(payload.into_object("ns2", Some("other")).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("cfg1").is_ok());
        assert!(validate_name("team.infra-prod").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("Upper").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name("has/slash").is_err());
        assert!(validate_name(&"a".repeat(254)).is_err());
    }

    #[test]
    fn test_same_content_ignores_store_metadata() {
        let a = ConfigObject::new(ResourceIdentifier::new("ns", "a"), json!({"k": "v"}));
        let mut b = a.clone();
        b.metadata.resource_version = Some("7".to_string());
        b.metadata.generation = 3;
        assert!(a.same_content(&b));

        b.spec = json!({"k": "other"});
        assert!(!a.same_content(&b));
    }
}
