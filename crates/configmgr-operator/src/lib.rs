//! Reconciler for Config lifecycle events.
//!
//! A [`ResourceWatcher`] supplies the side effects. The [`Reconciler`] wraps
//! it with delivery discipline: one hook call per observed
//! `(identifier, resource_version)`, tombstones for deleted objects, resync
//! that always runs, and isolation of hook errors and panics into an
//! [`ErrorSink`]. The [`Operator`] drains an event channel into the
//! reconciler until the channel closes or shutdown is requested.
//!
//! ```
//! use configmgr_core::{ConfigObject, LifecycleEvent, ResourceIdentifier};
//! use configmgr_operator::{ConfigWatcher, Operator, Reconciler};
//! use tokio::sync::mpsc;
//!
//! # tokio_test::block_on(async {
//! let (tx, rx) = mpsc::channel(8);
//! let obj = ConfigObject::new(ResourceIdentifier::new("ns1", "cfg1"), serde_json::json!({}));
//! tx.send(LifecycleEvent::Added(obj)).await.unwrap();
//! drop(tx);
//!
//! let operator = Operator::new(Reconciler::new(ConfigWatcher::new()));
//! let stats = operator.run(rx, std::future::pending()).await;
//! assert_eq!(stats.processed, 1);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/configmgr-operator/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod operator;
mod reconciler;
mod sink;
mod watcher;

pub use operator::{Operator, OperatorStats, OPERATOR_SERVICE_NAME};
pub use reconciler::{Outcome, Reconciler, DEFAULT_TOMBSTONE_LIMIT};
pub use sink::{ErrorSink, FnErrorSink, LoggingErrorSink};
pub use watcher::{ConfigWatcher, ResourceWatcher};
