//! IPC integration tests: a `RemoteStore` talking to the store host over a
//! Unix socket in a temp dir.

use std::time::Duration;

use notewall_core::config::StoreClientConfig;
use notewall_core::{DisplaySignal, MemoryStore, RemoteStore, SessionStore, SignalBus};
use notewall_server::server::run_unix_server;
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;

struct Host {
    store: MemoryStore,
    signals: SignalBus,
    shutdown: broadcast::Sender<()>,
    socket_path: String,
    _dir: tempfile::TempDir,
}

fn client_config() -> StoreClientConfig {
    StoreClientConfig {
        reconnect_initial_ms: 20,
        reconnect_max_ms: 200,
        request_timeout_ms: 2000,
    }
}

async fn start_host() -> Host {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("notewall.sock").to_string_lossy().into_owned();
    let store = MemoryStore::new();
    let signals = SignalBus::new();
    let (shutdown, rx) = broadcast::channel(1);

    let path = socket_path.clone();
    let host_store = store.clone();
    let host_signals = signals.clone();
    tokio::spawn(async move {
        run_unix_server(&path, host_store, host_signals, rx).await.unwrap();
    });

    Host {
        store,
        signals,
        shutdown,
        socket_path,
        _dir: dir,
    }
}

async fn connected_client(host: &Host) -> RemoteStore {
    let remote = RemoteStore::connect(&host.socket_path, &client_config());
    let mut connectivity = remote.connectivity();
    tokio::time::timeout(Duration::from_secs(5), connectivity.wait_for(|c| *c))
        .await
        .expect("client did not connect")
        .unwrap();
    remote
}

async fn next_value(sub: &mut notewall_core::Subscription) -> Value {
    tokio::time::timeout(Duration::from_secs(3), sub.next())
        .await
        .expect("no snapshot in time")
        .expect("subscription closed")
}

// ===========================================================================
// TEST 1: writes from the client land in the host tree and come back as pushes
// ===========================================================================
#[tokio::test]
async fn test_write_and_subscribe_roundtrip() {
    let host = start_host().await;
    let remote = connected_client(&host).await;

    let mut sub = remote.subscribe("sessions").await.unwrap();
    assert_eq!(next_value(&mut sub).await, Value::Null);

    remote
        .write("sessions/a", json!({"sessionId": "a", "status": "pending", "createdAt": 1}))
        .await
        .unwrap();
    let pushed = next_value(&mut sub).await;
    assert_eq!(pushed["a"]["status"], "pending");
    assert_eq!(host.store.snapshot()["sessions"]["a"]["createdAt"], 1);

    let mut fields = Map::new();
    fields.insert("status".to_string(), json!("ready_for_display"));
    remote.patch("sessions/a", fields).await.unwrap();
    let pushed = next_value(&mut sub).await;
    assert_eq!(pushed["a"]["status"], "ready_for_display");
    assert_eq!(pushed["a"]["createdAt"], 1);

    let _ = host.shutdown.send(());
}

// ===========================================================================
// TEST 2: write_if_absent sets a field only once across the wire
// ===========================================================================
#[tokio::test]
async fn test_write_if_absent_over_ipc() {
    let host = start_host().await;
    let remote = connected_client(&host).await;

    assert!(remote.write_if_absent("sessions/a/displayedAt", json!(100)).await.unwrap());
    assert!(!remote.write_if_absent("sessions/a/displayedAt", json!(200)).await.unwrap());
    assert_eq!(host.store.snapshot()["sessions"]["a"]["displayedAt"], 100);

    let _ = host.shutdown.send(());
}

// ===========================================================================
// TEST 3: host-side writes reach remote subscribers
// ===========================================================================
#[tokio::test]
async fn test_host_writes_pushed_to_client() {
    let host = start_host().await;
    let remote = connected_client(&host).await;
    let mut sub = remote.subscribe("displaySettings").await.unwrap();
    next_value(&mut sub).await;

    host.store
        .write("displaySettings", json!({"displayMode": "portrait"}))
        .await
        .unwrap();
    let pushed = next_value(&mut sub).await;
    assert_eq!(pushed["displayMode"], "portrait");

    let _ = host.shutdown.send(());
}

// ===========================================================================
// TEST 4: display signals are relayed to connected clients
// ===========================================================================
#[tokio::test]
async fn test_signal_relay() {
    let host = start_host().await;
    let remote = connected_client(&host).await;
    let mut signals = remote.signals().subscribe();

    // The host subscribes per connection; retry until the relay is attached.
    let mut received = None;
    for _ in 0..50 {
        host.signals.publish(DisplaySignal::ResetSlideshow);
        if let Ok(Ok(signal)) = tokio::time::timeout(Duration::from_millis(50), signals.recv()).await {
            received = Some(signal);
            break;
        }
    }
    assert_eq!(received, Some(DisplaySignal::ResetSlideshow));

    let _ = host.shutdown.send(());
}

// ===========================================================================
// TEST 5: invalid paths are reported back as errors
// ===========================================================================
#[tokio::test]
async fn test_root_delete_rejected_over_ipc() {
    let host = start_host().await;
    let remote = connected_client(&host).await;

    assert!(remote.delete("/").await.is_err());

    let _ = host.shutdown.send(());
}
