use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;
use serde_json::Value as JsonValue;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaybeBatch<T> {
    Batch(Vec<T>),
    Single(T),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: JsonValue,
    pub method: String,
    #[serde(default = "default_params")]
    pub params: JsonValue,
}

/// A request as the client sent it, next to its parsed view.
///
/// `raw` is what gets forwarded when the request is passed through, so absent
/// members stay absent and unknown members survive.
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub raw: Box<RawValue>,
    pub req: RpcRequest,
}

impl ClientRequest {
    pub fn from_raw(raw: Box<RawValue>) -> serde_json::Result<Self> {
        let req = serde_json::from_str(raw.get())?;
        Ok(Self { raw, req })
    }
}

/// Answer to one client request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Upstream response body, byte for byte.
    Forwarded(Box<RawValue>),
    /// Response assembled by the proxy.
    Built(RpcResponse),
}

/// A JSON-RPC response envelope.
///
/// `result: null` is kept distinct from a missing `result` so upstream
/// responses can be passed through without changing their shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: JsonValue,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl RpcResponse {
    pub fn result(jsonrpc: String, id: JsonValue, result: JsonValue) -> Self {
        Self {
            jsonrpc,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(jsonrpc: String, id: JsonValue, error: RpcError) -> Self {
        Self {
            jsonrpc,
            id,
            result: None,
            error: Some(error),
        }
    }
}

fn default_version() -> String {
    JSONRPC_VERSION.to_owned()
}

fn default_params() -> JsonValue {
    JsonValue::Array(Vec::new())
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}
