//! End to end: HTTP writes reach the reconciler hooks.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use configmgr::prelude::*;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    fn snapshot(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl ResourceWatcher for Journal {
    async fn add(&self, _ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
        self.entries.lock().push(format!("add {}", obj.identifier));
        Ok(())
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        _old: &ConfigObject,
        new: &ConfigObject,
    ) -> ManagerResult<()> {
        self.entries.lock().push(format!("update {}", new.identifier));
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
        self.entries.lock().push(format!("delete {}", obj.identifier));
        Ok(())
    }

    async fn sync(&self, _ctx: &RequestContext, obj: &ConfigObject) -> ManagerResult<()> {
        self.entries.lock().push(format!("sync {}", obj.identifier));
        Ok(())
    }
}

async fn send(addr: std::net::SocketAddr, method: &str, path: &str, body: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let raw = format!(
        "{method} {path} HTTP/1.1\r\nHost: test\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

async fn wait_for(journal: &Journal, count: usize) {
    for _ in 0..100 {
        if journal.snapshot().len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn config() -> ManagerConfig {
    let mut config = ManagerConfig::default();
    config.plugin.namespace = "ns1".to_string();
    config.server.shutdown_timeout_secs = 1;
    config
}

#[tokio::test]
async fn test_crud_writes_drive_the_reconciler() {
    let app = App::with_watcher(config(), Journal::default()).unwrap();
    let operator = Arc::clone(app.operator());
    let store = Arc::clone(app.store());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(app.serve(listener, shutdown.clone()));

    let created = send(addr, "POST", "/v1/configs", r#"{"name":"cfg1","spec":{"k":"v"}}"#).await;
    assert!(created.starts_with("HTTP/1.1 201"), "{created}");

    let updated = send(addr, "PUT", "/v1/configs/cfg1", r#"{"spec":{"k":"w"}}"#).await;
    assert!(updated.starts_with("HTTP/1.1 200"), "{updated}");

    let deleted = send(addr, "DELETE", "/v1/configs/cfg1", "").await;
    assert!(deleted.starts_with("HTTP/1.1 204"), "{deleted}");

    let journal = operator.reconciler().watcher();
    wait_for(journal, 3).await;
    assert_eq!(
        journal.snapshot(),
        vec!["add ns1/cfg1", "update ns1/cfg1", "delete ns1/cfg1"]
    );
    assert!(store.is_empty());

    shutdown.trigger();
    let stats = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("app should stop")
        .unwrap()
        .unwrap();
    assert_eq!(stats.processed, 3);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_resync_sweep_reaches_sync_hook() {
    let mut config = config();
    config.operator.resync_interval_secs = Some(1);
    let app = App::with_watcher(config, Journal::default()).unwrap();
    let operator = Arc::clone(app.operator());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(app.serve(listener, shutdown.clone()));

    send(addr, "POST", "/v1/configs", r#"{"name":"cfg1"}"#).await;

    let journal = operator.reconciler().watcher();
    for _ in 0..300 {
        if journal.snapshot().iter().any(|e| e.starts_with("sync")) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(journal.snapshot(), vec!["add ns1/cfg1", "sync ns1/cfg1"]);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("app should stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_disabled_operator_still_serves_crud() {
    let mut config = config();
    config.operator.enabled = false;
    let app = App::new(config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(app.serve(listener, shutdown.clone()));

    let created = send(addr, "POST", "/v1/configs", r#"{"name":"cfg1"}"#).await;
    assert!(created.starts_with("HTTP/1.1 201"), "{created}");
    let listed = send(addr, "GET", "/v1/configs", "").await;
    assert!(listed.contains(r#""name":"cfg1""#), "{listed}");

    shutdown.trigger();
    let stats = tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("app should stop")
        .unwrap()
        .unwrap();
    assert_eq!(stats, OperatorStats::default());
}

fn response_json(response: &str) -> serde_json::Value {
    let body = response.split("\r\n\r\n").nth(1).unwrap_or_default();
    serde_json::from_str(body).unwrap()
}

#[tokio::test]
async fn test_read_result_can_be_written_back() {
    let mut config = config();
    config.operator.enabled = false;
    let app = App::new(config).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let running = tokio::spawn(app.serve(listener, shutdown.clone()));

    send(addr, "POST", "/v1/configs", r#"{"name":"cfg1","spec":{"k":"v"}}"#).await;
    let read = response_json(&send(addr, "GET", "/v1/configs/cfg1", "").await);
    assert_eq!(read["metadata"]["resourceVersion"], "1");

    let unchanged = send(addr, "PUT", "/v1/configs/cfg1", &read.to_string()).await;
    assert!(unchanged.starts_with("HTTP/1.1 200"), "{unchanged}");
    assert_eq!(response_json(&unchanged)["metadata"]["resourceVersion"], "1");

    let mut edited = read.clone();
    edited["spec"] = serde_json::json!({"k": "w"});
    let updated = send(addr, "PUT", "/v1/configs/cfg1", &edited.to_string()).await;
    assert!(updated.starts_with("HTTP/1.1 200"), "{updated}");
    let updated = response_json(&updated);
    assert_eq!(updated["metadata"]["resourceVersion"], "2");
    assert_eq!(updated["metadata"]["generation"], 2);
    assert_eq!(updated["spec"], serde_json::json!({"k": "w"}));

    // Still carries version 1.
    edited["spec"] = serde_json::json!({"k": "x"});
    let stale = send(addr, "PUT", "/v1/configs/cfg1", &edited.to_string()).await;
    assert!(stale.starts_with("HTTP/1.1 409"), "{stale}");
    assert_eq!(response_json(&stale)["error"]["category"], "conflict");

    let payload = r#"{"resourceVersion":"1","spec":{"k":"y"}}"#;
    let stale = send(addr, "PUT", "/v1/configs/cfg1", payload).await;
    assert!(stale.starts_with("HTTP/1.1 409"), "{stale}");

    let current = response_json(&send(addr, "GET", "/v1/configs/cfg1", "").await);
    assert_eq!(current["spec"], serde_json::json!({"k": "w"}));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("app should stop")
        .unwrap()
        .unwrap();
}
