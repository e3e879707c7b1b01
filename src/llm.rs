//! Client for an OpenAI-compatible chat-completion endpoint.
//!
//! Only what the assessment flow needs: plain messages, function tools, and
//! the tool calls the model asks for.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::errors::AppError;

pub const TEMPERATURE: f32 = 1.0;
pub const MAX_TOKENS: u32 = 1000;
pub const TOP_P: f32 = 1.0;

/// Message role in a chat conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    /// Result of a tool call, answering `tool_call_id`.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Tool calls requested by the model, if any.
    pub fn requested_tool_calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

/// Function call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as sent by the model.
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Decoded arguments; an empty string means no arguments.
    pub fn parsed_arguments(&self) -> Result<Value, AppError> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_str(&self.arguments).map_err(|e| {
            AppError::BadRequest(format!(
                "model sent invalid arguments for {}: {}",
                self.name, e
            ))
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [Value],
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

fn no_tools(tools: &&[Value]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

/// Token usage reported by the endpoint.
#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

/// Chat-completion client authenticated with a bearer token.
pub struct ChatCompletionClient {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl ChatCompletionClient {
    /// Creates a client; fails with `Config` when no API key is configured.
    pub fn new(config: &LlmConfig) -> Result<Self, AppError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AppError::Config("GITHUB_TOKEN is not set".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AppError::external(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", config.endpoint),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the conversation and returns the first choice's message.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<ChatMessage, AppError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            tools,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        tracing::info!(
            "Sending {} messages to {} ({} tools)",
            messages.len(),
            self.model,
            tools.len()
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Chat completion request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Chat completion returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApi {
                status: Some(status.as_u16()),
                message: "Chat completion rejected".to_string(),
                body: Some(error_text),
            });
        }

        let data: ChatCompletionResponse = response.json().await.map_err(|e| {
            AppError::external(format!("Failed to parse chat completion response: {}", e))
        })?;

        if let Some(usage) = &data.usage {
            tracing::debug!(
                "Token usage: prompt={:?} completion={:?} total={:?}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::external("Chat completion returned no choices"))?;
        tracing::debug!("Finish reason: {:?}", choice.finish_reason);

        Ok(choice.message)
    }
}
