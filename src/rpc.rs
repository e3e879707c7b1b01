//! JSON-RPC 2.0 wire types shared by the tool host and the client shell.
//!
//! Both transports carry exactly one message per frame: one line on stdio,
//! one request body on HTTP.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::AppError;

pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC 2.0 request. A request without `id` is a notification;
/// `"id": null` is still a request and is answered with a null id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier for correlating responses.
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    /// Method name (e.g., "initialize", "tools/call").
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// `Some` whenever the member is present, including `null`. Absent ids
/// fall back to `None` through `#[serde(default)]`.
fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Protocol version (always "2.0").
    pub jsonrpc: String,
    /// Matching request identifier (`null` when the request could not be read).
    pub id: Value,
    /// Successful result (mutually exclusive with `error`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error object (mutually exclusive with `result`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Standard JSON-RPC error codes.
pub mod error_codes {
    /// Parse error: invalid JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// Invalid request: missing required fields.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method not found.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid params.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i64 = -32603;
}

impl RpcRequest {
    /// Create a new JSON-RPC 2.0 request.
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(Value::from(id)),
            method: method.to_string(),
            params,
        }
    }

    /// Create a notification (no id, no response expected).
    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.to_string(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

impl RpcResponse {
    /// Check if this response indicates an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Create a successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: Value, code: i64, message: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }

    /// Create an error response from an application error.
    ///
    /// The vendor response body, when the error carries one, goes into `data`.
    pub fn from_app_error(id: Value, err: &AppError) -> Self {
        let mut response = Self::error(id, err.rpc_code(), &err.to_string());
        if let (Some(error), Some(body)) = (response.error.as_mut(), err.response_body()) {
            error.data = Some(serde_json::json!({ "responseBody": body }));
        }
        response
    }

    /// Unwraps the result, turning a JSON-RPC error into an `AppError`.
    pub fn into_result(self) -> Result<Value, AppError> {
        if let Some(err) = self.error {
            return Err(AppError::ExternalApi {
                status: None,
                message: format!("MCP error {}: {}", err.code, err.message),
                body: err.data.map(|d| d.to_string()),
            });
        }
        Ok(self.result.unwrap_or(Value::Object(Default::default())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_correctly() {
        let req = RpcRequest::new(
            1,
            "tools/call",
            Some(json!({"name": "credit_score", "arguments": {"ssn": "123-45-6789"}})),
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 1);
        assert_eq!(json["method"], "tools/call");
        assert_eq!(json["params"]["name"], "credit_score");
    }

    #[test]
    fn notification_omits_id() {
        let req = RpcRequest::notification("notifications/initialized", None);
        let text = serde_json::to_string(&req).unwrap();
        assert!(!text.contains("\"id\""));
        assert!(!text.contains("\"params\""));

        let parsed: RpcRequest = serde_json::from_str(&text).unwrap();
        assert!(parsed.is_notification());
    }

    #[test]
    fn null_id_is_a_request_not_a_notification() {
        let parsed: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert!(!parsed.is_notification());
        assert_eq!(parsed.id, Some(Value::Null));

        let absent: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"ping"}"#).unwrap();
        assert!(absent.is_notification());
    }

    #[test]
    fn string_ids_are_preserved() {
        let parsed: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":"abc-1","method":"ping"}"#).unwrap();
        assert_eq!(parsed.id, Some(json!("abc-1")));
    }

    #[test]
    fn error_response_round_trip() {
        let resp = RpcResponse::error(json!(3), error_codes::METHOD_NOT_FOUND, "Method not found");
        assert!(resp.is_error());
        let text = serde_json::to_string(&resp).unwrap();
        assert!(!text.contains("\"result\""));

        let err = resp.into_result().unwrap_err();
        assert!(err.to_string().contains("-32601"));
    }

    #[test]
    fn app_error_body_lands_in_data() {
        let err = AppError::ExternalApi {
            status: Some(502),
            message: "upstream".into(),
            body: Some("gateway down".into()),
        };
        let resp = RpcResponse::from_app_error(json!(9), &err);
        let error = resp.error.unwrap();
        assert_eq!(error.code, error_codes::INTERNAL_ERROR);
        assert_eq!(error.data.unwrap()["responseBody"], "gateway down");
    }
}
