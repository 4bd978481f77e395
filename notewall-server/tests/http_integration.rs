//! HTTP integration tests for the Notewall moderation API
//!
//! Full handler dispatch through the Axum router with `oneshot`, backed by an
//! in-process `MemoryStore`. No sockets or external services needed.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use notewall_core::display::DisplayFrame;
use notewall_core::models::{decode_sessions, SessionStatus};
use notewall_core::{MemoryStore, ModerationController, NotewallConfig, SessionStore, SignalBus};
use notewall_server::http::{build_router, HttpState};
use notewall_server::subsystems::display::DisplayRuntime;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};

// For oneshot testing
use axum::body::Body;
use axum::http::Request;
use tower::ServiceExt;

struct Harness {
    store: MemoryStore,
    signals: SignalBus,
    state: Arc<HttpState>,
}

fn make_harness(display: Option<watch::Receiver<DisplayFrame>>, store: MemoryStore, signals: SignalBus) -> Harness {
    let config = NotewallConfig::default();
    let shared: Arc<dyn SessionStore> = Arc::new(store.clone());
    let moderation = ModerationController::new(shared.clone(), signals.clone(), config.moderation.clone());
    let state = Arc::new(HttpState {
        store: shared,
        moderation,
        config,
        display,
    });
    Harness { store, signals, state }
}

fn harness() -> Harness {
    make_harness(None, MemoryStore::new(), SignalBus::new())
}

async fn call(state: &Arc<HttpState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let app = build_router(state.clone());
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };
    let resp = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn sarah() -> Value {
    json!({
        "recipient": "Sarah",
        "sender": "Mike",
        "drawingImage": "iVBORw0KGgo=",
        "templateTheme": "watercolor",
    })
}

// ===========================================================================
// TEST 1: GET /health and /version via oneshot
// ===========================================================================
#[tokio::test]
async fn test_health_and_version() {
    let h = harness();

    let (status, body) = call(&h.state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["display"], false);

    let (status, body) = call(&h.state, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["protocol"], "notewall/1");
}

// ===========================================================================
// TEST 2: health degrades when the store is offline
// ===========================================================================
#[tokio::test]
async fn test_health_degraded_when_offline() {
    let h = harness();
    h.store.set_connected(false);

    let (status, body) = call(&h.state, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

// ===========================================================================
// TEST 3: submit → pending → approve → live
// ===========================================================================
#[tokio::test]
async fn test_submit_then_approve() {
    let h = harness();

    let (status, body) = call(&h.state, "POST", "/sessions", Some(sarah())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["sessionId"].as_str().unwrap().to_string();
    assert_eq!(body["session"]["status"], "pending");

    let (_, pending) = call(&h.state, "GET", "/sessions?partition=pending", None).await;
    assert_eq!(pending["count"], 1);
    assert_eq!(pending["sessions"][0]["sessionId"], id.as_str());

    let (status, body) = call(&h.state, "POST", &format!("/sessions/{}/approve", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);

    let (_, pending) = call(&h.state, "GET", "/sessions?partition=pending", None).await;
    assert_eq!(pending["count"], 0);
    let (_, live) = call(&h.state, "GET", "/sessions?partition=live", None).await;
    assert_eq!(live["count"], 1);
    assert_eq!(live["sessions"][0]["status"], "ready_for_display");
}

// ===========================================================================
// TEST 4: reject then restore returns the note to pending
// ===========================================================================
#[tokio::test]
async fn test_reject_and_restore() {
    let h = harness();
    let (_, body) = call(&h.state, "POST", "/sessions", Some(sarah())).await;
    let id = body["sessionId"].as_str().unwrap().to_string();

    call(&h.state, "POST", &format!("/sessions/{}/reject", id), None).await;
    let (_, stats) = call(&h.state, "GET", "/stats", None).await;
    assert_eq!(stats["rejected"], 1);
    assert_eq!(stats["pending"], 0);

    call(&h.state, "POST", &format!("/sessions/{}/restore", id), None).await;
    let (_, stats) = call(&h.state, "GET", "/stats", None).await;
    assert_eq!(stats["rejected"], 0);
    assert_eq!(stats["pending"], 1);
}

// ===========================================================================
// TEST 5: DELETE requires the typed confirmation
// ===========================================================================
#[tokio::test]
async fn test_delete_requires_confirmation() {
    let h = harness();
    let (_, body) = call(&h.state, "POST", "/sessions", Some(sarah())).await;
    let id = body["sessionId"].as_str().unwrap().to_string();
    let uri = format!("/sessions/{}", id);

    let (status, _) = call(&h.state, "DELETE", &uri, Some(json!({"confirmation": "delete"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.store.snapshot()["sessions"].get(&id).is_some());

    let (status, _) = call(&h.state, "DELETE", &uri, Some(json!({"confirmation": "DELETE"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.store.snapshot().get("sessions").is_none());

    let (status, _) = call(&h.state, "DELETE", &uri, Some(json!({"confirmation": "DELETE"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// TEST 6: slideshow reset is broadcast, store untouched
// ===========================================================================
#[tokio::test]
async fn test_reset_broadcasts_signal() {
    let h = harness();
    let mut rx = h.signals.subscribe();
    let before = h.store.snapshot();

    let (status, _) = call(&h.state, "POST", "/slideshow/reset", Some(json!({"confirmation": "nope"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(&h.state, "POST", "/slideshow/reset", Some(json!({"confirmation": "RESET"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receivers"], 1);

    let signal = rx.try_recv().unwrap();
    assert_eq!(signal, notewall_core::DisplaySignal::ResetSlideshow);
    assert_eq!(h.store.snapshot(), before);
}

// ===========================================================================
// TEST 7: PATCH /settings merges and validates
// ===========================================================================
#[tokio::test]
async fn test_settings_roundtrip() {
    let h = harness();

    let (status, body) = call(&h.state, "GET", "/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["displayMode"], "landscape");

    let (status, _) = call(&h.state, "PATCH", "/settings", Some(json!({"cardsPerRow": 9}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let patch = json!({"displayMode": "portrait", "cardsPerRow": 3, "branding": {"headerFont": "Georgia"}});
    let (status, body) = call(&h.state, "PATCH", "/settings", Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["displayMode"], "portrait");
    assert_eq!(body["cardsPerRow"], 3);

    let stored = h.store.snapshot();
    assert_eq!(stored["displaySettings"]["displayMode"], "portrait");
    assert_eq!(stored["displaySettings"]["branding"]["headerFont"], "Georgia");
}

// ===========================================================================
// TEST 8: approved note reaches the in-process display and is marked displaying
// ===========================================================================
#[tokio::test]
async fn test_end_to_end_display_pickup() {
    let store = MemoryStore::new();
    let signals = SignalBus::new();
    let config = NotewallConfig::default();
    let (runtime, frames) = DisplayRuntime::new(Arc::new(store.clone()), signals.clone(), config.display.clone());
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(runtime.run(shutdown_rx));

    let h = make_harness(Some(frames), store, signals);

    let (_, body) = call(&h.state, "POST", "/sessions", Some(sarah())).await;
    let id = body["sessionId"].as_str().unwrap().to_string();
    call(&h.state, "POST", &format!("/sessions/{}/approve", id), None).await;

    let mut picked_up = false;
    for _ in 0..100 {
        let sessions = decode_sessions(&h.store.get("sessions").await.unwrap());
        if sessions[0].status == SessionStatus::Displaying {
            assert!(sessions[0].displayed_at.is_some());
            picked_up = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(picked_up, "display never marked the note displaying");

    // Displaying still counts as live
    let (_, live) = call(&h.state, "GET", "/sessions?partition=live", None).await;
    assert_eq!(live["count"], 1);

    let (status, frame) = call(&h.state, "GET", "/display", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(frame["noteCount"], 1);
    assert_eq!(frame["landscape"][0]["note"]["recipient"], "Sarah");

    let _ = shutdown_tx.send(());
}
