//! Store host IPC protocol.
//!
//! Frames are MessagePack payloads behind a 4-byte little-endian length
//! prefix. A client sends [`RequestFrame`]s; the host answers each with a
//! [`ServerFrame::Reply`] carrying the same id and pushes
//! [`ServerFrame::Snapshot`]s for every subscription (keyed by the id of the
//! `Subscribe` request) and [`ServerFrame::Signal`]s for display signals.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::codec::LengthDelimitedCodec;

use crate::error::NotewallError;
use crate::signal::DisplaySignal;

pub const PROTOCOL_VERSION: &str = "notewall/1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StoreRequest {
    Ping,
    Subscribe { path: String },
    Unsubscribe { sub: u64 },
    Write { path: String, value: Value },
    Patch { path: String, fields: Map<String, Value> },
    Delete { path: String },
    WriteIfAbsent { path: String, value: Value },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestFrame {
    pub id: u64,
    pub request: StoreRequest,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerFrame {
    Reply { id: u64, response: StoreResponse },
    Snapshot { sub: u64, value: Value },
    Signal { signal: DisplaySignal },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreResponse {
    pub status: String,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub version: String,
}

impl StoreResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    /// Convert into the `data` payload or a store error.
    pub fn into_result(self) -> Result<Value, NotewallError> {
        if self.is_ok() {
            Ok(self.data.unwrap_or(Value::Null))
        } else {
            Err(NotewallError::Store(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder().little_endian().new_codec()
}

pub fn encode<T: Serialize>(frame: &T) -> Result<Bytes, NotewallError> {
    rmp_serde::to_vec_named(frame)
        .map(Bytes::from)
        .map_err(|e| NotewallError::Ipc(format!("Serialization error: {}", e)))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, NotewallError> {
    rmp_serde::from_slice(bytes).map_err(|e| NotewallError::Ipc(format!("Deserialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_request_survives_msgpack() {
        let mut fields = Map::new();
        fields.insert("status".to_string(), json!("rejected"));
        let frame = RequestFrame {
            id: 7,
            request: StoreRequest::Patch {
                path: "sessions/a".to_string(),
                fields,
            },
        };
        let decoded: RequestFrame = decode(&encode(&frame).unwrap()).unwrap();
        assert_eq!(decoded.id, 7);
        match decoded.request {
            StoreRequest::Patch { path, fields } => {
                assert_eq!(path, "sessions/a");
                assert_eq!(fields["status"], "rejected");
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_snapshot_keeps_integer_timestamps() {
        let frame = ServerFrame::Snapshot {
            sub: 3,
            value: json!({"a": {"createdAt": 1_700_000_000_123_i64}}),
        };
        let decoded: ServerFrame = decode(&encode(&frame).unwrap()).unwrap();
        match decoded {
            ServerFrame::Snapshot { sub, value } => {
                assert_eq!(sub, 3);
                assert_eq!(value["a"]["createdAt"].as_i64(), Some(1_700_000_000_123));
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_error_response_into_result() {
        assert!(StoreResponse::err("boom").into_result().is_err());
        assert_eq!(StoreResponse::pong().into_result().unwrap()["pong"], true);
    }
}
