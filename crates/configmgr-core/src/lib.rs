//! # Config Manager Core
//!
//! Core types and traits shared by every crate of the Config manager.
//!
//! - [`ResourceIdentifier`], [`ConfigObject`], [`ConfigList`] - the resource model
//! - [`LifecycleEvent`] - watch feed events consumed by the reconciler
//! - [`ManagerError`] - error taxonomy and the response [`ErrorEnvelope`]
//! - [`RequestContext`] - per-call context handed to the service facade
//! - [`ConfigService`] / [`ServiceProvider`] - the injected store facade

#![doc(html_root_url = "https://docs.rs/configmgr-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;
mod event;
mod identity;
pub mod resource;
mod service;

pub use context::{Cancellation, ClientConfig, RequestContext, RequestId};
pub use error::{
    panic_message, ErrorCategory, ErrorDetail, ErrorEnvelope, ManagerError, ManagerResult,
};
pub use event::{EventKind, LifecycleEvent};
pub use identity::CallerIdentity;
pub use resource::{
    ConfigList, ConfigObject, ConfigPayload, ObjectMetadata, ResourceIdentifier, CONFIG_KIND,
};
pub use service::{ConfigService, ServiceProvider, StaticServiceProvider};
