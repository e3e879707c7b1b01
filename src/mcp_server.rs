//! JSON-RPC dispatcher for the credit tool host.
//!
//! `McpServer` owns the tool and prompt registries and answers the handful of
//! methods an agent needs: the `initialize` handshake, `ping`, listing and
//! calling tools, and listing and rendering prompts. Transports hand it one
//! decoded message at a time and write back whatever it returns.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::errors::AppError;
use crate::prompts::{CreditScorePrompt, PromptRegistry};
use crate::rpc::{error_codes, RpcRequest, RpcResponse, JSONRPC_VERSION};
use crate::services::ReportSource;
use crate::tools::{CreditScoreTool, ToolOutput, ToolRegistry};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "experian-credit";

/// Name and version reported by `initialize`.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Clone)]
pub struct McpServer {
    info: ServerInfo,
    tools: ToolRegistry,
    prompts: PromptRegistry,
}

impl McpServer {
    pub fn new(info: ServerInfo, tools: ToolRegistry, prompts: PromptRegistry) -> Self {
        Self {
            info,
            tools,
            prompts,
        }
    }

    /// The credit tool host: `credit_score` over `source` plus the assessment prompt.
    pub fn credit_host(source: Arc<dyn ReportSource>) -> Self {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(CreditScoreTool::new(source)));

        let mut prompts = PromptRegistry::new();
        prompts.register(Arc::new(CreditScorePrompt));

        Self::new(ServerInfo::default(), tools, prompts)
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// Handles one raw message. `None` means nothing should be written back.
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let response = match parse_request(line) {
            Ok(request) => self.handle(request).await?,
            Err(response) => response,
        };

        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                None
            }
        }
    }

    /// Handles one request. Notifications never get a response.
    pub async fn handle(&self, request: RpcRequest) -> Option<RpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };

        tracing::debug!("→ {} (id {})", request.method, id);
        let params = request.params.unwrap_or(Value::Null);

        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.initialize(&params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.call_tool(&params).await,
            "prompts/list" => Ok(json!({ "prompts": self.prompts.definitions() })),
            "prompts/get" => self.get_prompt(&params),
            other => Err(AppError::NotFound(format!("Method not found: {}", other))),
        };

        Some(match outcome {
            Ok(result) => RpcResponse::success(id, result),
            Err(e) => {
                tracing::warn!("{} failed: {}", request.method, e);
                RpcResponse::from_app_error(id, &e)
            }
        })
    }

    fn handle_notification(&self, request: &RpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => tracing::info!("Client initialized"),
            "notifications/cancelled" => tracing::debug!("Client cancelled a request"),
            other => tracing::debug!("Ignoring notification {}", other),
        }
    }

    fn initialize(&self, params: &Value) -> Value {
        let client = params
            .pointer("/clientInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        tracing::info!("Initialize from client '{}'", client);

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {},
                "prompts": {}
            },
            "serverInfo": {
                "name": self.info.name,
                "version": self.info.version
            }
        })
    }

    async fn call_tool(&self, params: &Value) -> Result<Value, AppError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::BadRequest("tools/call requires 'name'".to_string()))?;
        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

        tracing::info!("Calling tool {}", name);
        let output = self.tools.call(name, arguments).await?;
        tool_result(output)
    }

    fn get_prompt(&self, params: &Value) -> Result<Value, AppError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::BadRequest("prompts/get requires 'name'".to_string()))?;
        let prompt = self
            .prompts
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown prompt: {}", name)))?;

        let arguments = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
        let text = prompt.render(&arguments)?;

        Ok(json!({
            "description": prompt.description(),
            "messages": [{
                "role": "user",
                "content": { "type": "text", "text": text }
            }]
        }))
    }
}

/// Wraps a tool output in the `tools/call` result shape.
fn tool_result(output: ToolOutput) -> Result<Value, AppError> {
    let text = serde_json::to_string_pretty(&output.structured)?;
    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": output.structured,
        "isError": output.is_error
    }))
}

/// Decodes one JSON-RPC message, or builds the error response for it.
pub fn parse_request(text: &str) -> Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_str(text).map_err(|e| {
        tracing::warn!("Unparseable message: {}", e);
        RpcResponse::error(Value::Null, error_codes::PARSE_ERROR, "Parse error")
    })?;
    request_from_value(value)
}

/// Validates an already-decoded message as a JSON-RPC 2.0 request.
pub fn request_from_value(value: Value) -> Result<RpcRequest, RpcResponse> {
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let invalid =
        |id: Value| RpcResponse::error(id, error_codes::INVALID_REQUEST, "Invalid Request");

    if value.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(invalid(id));
    }
    if !value.get("method").map(Value::is_string).unwrap_or(false) {
        return Err(invalid(id));
    }

    serde_json::from_value(value).map_err(|e| {
        tracing::warn!("Invalid request: {}", e);
        invalid(id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedSource(Value);

    #[async_trait]
    impl ReportSource for FixedSource {
        async fn fetch_report(&self, _ssn_digits: &str) -> Result<Value, AppError> {
            Ok(self.0.clone())
        }

        fn describe(&self) -> String {
            "fixed".to_string()
        }
    }

    fn server() -> McpServer {
        McpServer::credit_host(Arc::new(FixedSource(json!({
            "creditProfile": [{
                "riskModel": [{"score": "0750", "modelIndicator": "V4"}]
            }]
        }))))
    }

    async fn roundtrip(server: &McpServer, line: &str) -> Value {
        let text = server.handle_line(line).await.expect("response expected");
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let resp = roundtrip(
            &server(),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"clientInfo":{"name":"t"}}}"#,
        )
        .await;
        assert_eq!(resp["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(resp["result"]["serverInfo"]["name"], SERVER_NAME);
        assert!(resp["result"]["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let out = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn test_null_id_is_answered() {
        let resp = roundtrip(&server(), r#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).await;
        assert!(resp["id"].is_null());
        assert_eq!(resp["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_call_shapes_content() {
        let resp = roundtrip(
            &server(),
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"credit_score","arguments":{"ssn":"123-45-6789"}}}"#,
        )
        .await;

        let result = &resp["result"];
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["credit_score_info"]["score"], 750);
        assert_eq!(result["content"][0]["type"], "text");
        let text: Value =
            serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(text, result["structuredContent"]);
    }

    #[tokio::test]
    async fn test_error_codes() {
        let s = server();

        let parse = roundtrip(&s, "{not json").await;
        assert_eq!(parse["error"]["code"], error_codes::PARSE_ERROR);
        assert!(parse["id"].is_null());

        let invalid = roundtrip(&s, r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#).await;
        assert_eq!(invalid["error"]["code"], error_codes::INVALID_REQUEST);
        assert_eq!(invalid["id"], 5);

        let unknown = roundtrip(&s, r#"{"jsonrpc":"2.0","id":6,"method":"resources/list"}"#).await;
        assert_eq!(unknown["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let bad_tool = roundtrip(
            &s,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"nope"}}"#,
        )
        .await;
        assert_eq!(bad_tool["error"]["code"], error_codes::METHOD_NOT_FOUND);

        let bad_ssn = roundtrip(
            &s,
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"credit_score","arguments":{"ssn":"abc"}}}"#,
        )
        .await;
        assert_eq!(bad_ssn["error"]["code"], error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_prompts_get() {
        let resp = roundtrip(
            &server(),
            r#"{"jsonrpc":"2.0","id":3,"method":"prompts/get","params":{"name":"build_credit_score_prompt","arguments":{"score":"700"}}}"#,
        )
        .await;
        let message = &resp["result"]["messages"][0];
        assert_eq!(message["role"], "user");
        assert!(message["content"]["text"]
            .as_str()
            .unwrap()
            .ends_with("credit score of 700."));
    }
}
