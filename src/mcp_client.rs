//! Client side of the tool-host protocol.
//!
//! [`McpClient`] has a single transport-specific operation, `call`, plus typed
//! helpers for the methods the assessment flow uses. Two transports:
//! [`HttpMcpClient`] posts to `/mcp`, [`StdioMcpClient`] spawns the server and
//! talks to it over its stdin/stdout.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;

use crate::errors::{AppError, ResultExt};
use crate::mcp_server::PROTOCOL_VERSION;
use crate::rpc::{RpcRequest, RpcResponse};

/// How long [`StdioMcpClient::shutdown`] waits before killing the server.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Tool as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Prompt as listed by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePrompt {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<RemotePromptArgument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemotePromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCallResult {
    #[serde(default)]
    pub content: Vec<ContentItem>,
    #[serde(rename = "structuredContent", default)]
    pub structured_content: Option<Value>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Text of the first text content item.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|c| c.kind == "text")
            .map(|c| c.text.as_str())
    }

    /// Structured result, falling back to parsing the text content as JSON.
    pub fn json(&self) -> Result<Value, AppError> {
        if let Some(value) = &self.structured_content {
            return Ok(value.clone());
        }
        let text = self
            .text()
            .ok_or_else(|| AppError::external("Tool result has no text content"))?;
        Ok(serde_json::from_str(text)?)
    }
}

#[async_trait]
pub trait McpClient: Send + Sync {
    /// Sends a request and returns its result (JSON-RPC errors become `Err`).
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, AppError>;

    /// Sends a notification; no response is expected.
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), AppError>;

    /// `initialize` followed by `notifications/initialized`.
    async fn initialize(&self) -> Result<Value, AppError> {
        let result = self
            .call(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "credit-client",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await
            .context("initialize")?;
        self.notify("notifications/initialized", None).await?;
        Ok(result)
    }

    async fn list_tools(&self) -> Result<Vec<RemoteTool>, AppError> {
        let result = self.call("tools/list", None).await.context("tools/list")?;
        Ok(serde_json::from_value(
            result.get("tools").cloned().unwrap_or_else(|| json!([])),
        )?)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult, AppError> {
        let result = self
            .call(
                "tools/call",
                Some(json!({ "name": name, "arguments": arguments })),
            )
            .await
            .with_context(|| format!("tools/call {}", name))?;
        Ok(serde_json::from_value(result)?)
    }

    async fn list_prompts(&self) -> Result<Vec<RemotePrompt>, AppError> {
        let result = self.call("prompts/list", None).await.context("prompts/list")?;
        Ok(serde_json::from_value(
            result.get("prompts").cloned().unwrap_or_else(|| json!([])),
        )?)
    }

    /// Renders a prompt and returns the text of its first message.
    async fn get_prompt(&self, name: &str, arguments: Value) -> Result<String, AppError> {
        let result = self
            .call(
                "prompts/get",
                Some(json!({ "name": name, "arguments": arguments })),
            )
            .await
            .with_context(|| format!("prompts/get {}", name))?;

        result
            .pointer("/messages/0/content/text")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::external(format!("Prompt {} returned no text", name)))
    }
}

/// Chat-completion function tool built from a listed tool.
pub fn to_llm_tool(tool: &RemoteTool) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema
        }
    })
}

/// Client for the streamable-http transport.
pub struct HttpMcpClient {
    client: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpMcpClient {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::external(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn post(&self, request: &RpcRequest) -> Result<reqwest::Response, AppError> {
        self.client
            .post(&self.url)
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("POST {} failed: {}", self.url, e)))
    }
}

#[async_trait]
impl McpClient for HttpMcpClient {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest::new(id, method, params);
        tracing::debug!("→ {} (id {})", method, id);

        let response = self.post(&request).await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalApi {
                status: Some(status.as_u16()),
                message: format!("{} rejected by server", method),
                body: Some(error_text),
            });
        }

        let rpc: RpcResponse = response.json().await.map_err(|e| {
            AppError::external(format!("Failed to parse {} response: {}", method, e))
        })?;
        rpc.into_result()
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), AppError> {
        let response = self.post(&RpcRequest::notification(method, params)).await?;
        match response.status() {
            StatusCode::ACCEPTED | StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            status => Err(AppError::ExternalApi {
                status: Some(status.as_u16()),
                message: format!("{} notification rejected", method),
                body: None,
            }),
        }
    }
}

struct StdioChannel {
    /// `None` once [`StdioMcpClient::shutdown`] has closed the pipe.
    stdin: Option<ChildStdin>,
    stdout: Lines<BufReader<ChildStdout>>,
}

/// Client for the stdio transport. Owns the spawned server process.
pub struct StdioMcpClient {
    channel: Mutex<StdioChannel>,
    child: Mutex<Child>,
    next_id: AtomicU64,
}

impl StdioMcpClient {
    /// Spawns `program args...` with the current environment and stderr passed through.
    pub async fn spawn(program: &Path, args: &[String]) -> Result<Self, AppError> {
        tracing::info!("Starting server: {} {}", program.display(), args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Spawning {}", program.display()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::InternalError("child stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::InternalError("child stdout unavailable".to_string()))?;

        Ok(Self {
            channel: Mutex::new(StdioChannel {
                stdin: Some(stdin),
                stdout: BufReader::new(stdout).lines(),
            }),
            child: Mutex::new(child),
            next_id: AtomicU64::new(1),
        })
    }

    async fn send(channel: &mut StdioChannel, request: &RpcRequest) -> Result<(), AppError> {
        let stdin = channel
            .stdin
            .as_mut()
            .ok_or_else(|| AppError::InternalError("server stdin already closed".to_string()))?;
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        stdin
            .write_all(line.as_bytes())
            .await
            .context("Writing to server stdin")?;
        stdin.flush().await.context("Flushing server stdin")?;
        Ok(())
    }

    /// Closes the server's stdin and waits briefly for it to exit.
    ///
    /// Returns the exit status, or `None` if the server had to be killed.
    pub async fn shutdown(&self) -> Result<Option<ExitStatus>, AppError> {
        // dropping the handle closes the pipe, which the server reads as EOF
        drop(self.channel.lock().await.stdin.take());

        let mut child = self.child.lock().await;
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, child.wait()).await {
            Ok(status) => {
                let status = status.context("Waiting for server")?;
                tracing::debug!("Server exited with {}", status);
                Ok(Some(status))
            }
            Err(_) => {
                tracing::warn!("Server did not exit; killing it");
                child.kill().await.context("Killing server")?;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl McpClient for StdioMcpClient {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = RpcRequest::new(id, method, params);
        let expected = Value::from(id);

        let mut channel = self.channel.lock().await;
        tracing::debug!("→ {} (id {})", method, id);
        Self::send(&mut channel, &request).await?;

        loop {
            let line = channel
                .stdout
                .next_line()
                .await
                .context("Reading server stdout")?
                .ok_or_else(|| {
                    AppError::external(format!("Server closed stdout before answering {}", method))
                })?;

            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RpcResponse>(&line) {
                Ok(response) if response.id == expected => return response.into_result(),
                Ok(response) => {
                    tracing::debug!("Skipping response for id {}", response.id);
                }
                Err(_) => {
                    tracing::debug!("Skipping non-response line from server");
                }
            }
        }
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), AppError> {
        let mut channel = self.channel.lock().await;
        Self::send(&mut channel, &RpcRequest::notification(method, params)).await
    }
}
