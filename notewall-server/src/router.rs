use notewall_core::ipc::{StoreRequest, StoreResponse};
use notewall_core::{MemoryStore, SessionStore};
use serde_json::json;

/// Handle one stateless store request against the hosted tree.
/// Subscriptions are per-connection and handled by the IPC server.
pub async fn handle_request(request: StoreRequest, store: &MemoryStore) -> StoreResponse {
    match request {
        StoreRequest::Ping => StoreResponse::pong(),
        StoreRequest::Write { path, value } => match store.write(&path, value).await {
            Ok(()) => StoreResponse::ok(json!({ "path": path })),
            Err(e) => StoreResponse::err(e.to_string()),
        },
        StoreRequest::Patch { path, fields } => match store.patch(&path, fields).await {
            Ok(()) => StoreResponse::ok(json!({ "path": path })),
            Err(e) => StoreResponse::err(e.to_string()),
        },
        StoreRequest::Delete { path } => match store.delete(&path).await {
            Ok(()) => StoreResponse::ok(json!({ "path": path })),
            Err(e) => StoreResponse::err(e.to_string()),
        },
        StoreRequest::WriteIfAbsent { path, value } => {
            match store.write_if_absent(&path, value).await {
                Ok(written) => StoreResponse::ok(json!({ "path": path, "written": written })),
                Err(e) => StoreResponse::err(e.to_string()),
            }
        }
        StoreRequest::Subscribe { .. } | StoreRequest::Unsubscribe { .. } => {
            StoreResponse::err("subscriptions require a connection")
        }
    }
}
