//! Loan risk assessment flow driven through the tool host.
//!
//! Connects the pieces the client shell needs: tool discovery, the credit
//! lookup, prompt rendering, and (optionally) a chat-completion round trip
//! in which the model may call the host's tools itself.

use serde_json::{json, Value};

use crate::errors::AppError;
use crate::llm::{ChatCompletionClient, ChatMessage, FunctionCall};
use crate::mcp_client::{to_llm_tool, McpClient, RemoteTool};
use crate::models::ReducedCreditResult;
use crate::prompts::CREDIT_SCORE_PROMPT;
use crate::tools::CREDIT_SCORE_TOOL;

pub const SYSTEM_PROMPT: &str = "You are a helpful financial assistant that generates loan risk assessments based on credit score information.";

/// Everything the flow produced, for the caller to print.
#[derive(Debug, Clone)]
pub struct AssessmentOutcome {
    pub tools: Vec<RemoteTool>,
    /// Structured `credit_score` result (a reduced result or an error payload).
    pub credit_result: Value,
    pub credit_lookup_failed: bool,
    pub prompt: String,
    pub assessment: Option<Assessment>,
}

/// What the model said.
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    /// Final answer after the model's tool calls were answered.
    AfterToolCalls {
        tool_calls: usize,
        content: Option<String>,
    },
    /// The model answered straight away.
    Direct(Option<String>),
}

impl AssessmentOutcome {
    /// Reduced result, when the lookup succeeded.
    pub fn reduced(&self) -> Option<ReducedCreditResult> {
        if self.credit_lookup_failed {
            return None;
        }
        serde_json::from_value(self.credit_result.clone()).ok()
    }
}

/// Runs the assessment for `ssn`. The LLM step runs only when `llm` is given.
pub async fn run_assessment(
    client: &dyn McpClient,
    llm: Option<&ChatCompletionClient>,
    ssn: &str,
) -> Result<AssessmentOutcome, AppError> {
    let init = client.initialize().await?;
    let server_name = init
        .pointer("/serverInfo/name")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let server_version = init
        .pointer("/serverInfo/version")
        .and_then(Value::as_str)
        .unwrap_or("");
    tracing::info!("✓ Session initialized with {} {}", server_name, server_version);

    let tools = client.list_tools().await?;
    for tool in &tools {
        tracing::info!("Tool available: {}", tool.name);
    }
    let llm_tools: Vec<Value> = tools.iter().map(to_llm_tool).collect();

    let call = client
        .call_tool(CREDIT_SCORE_TOOL, json!({ "ssn": ssn }))
        .await?;
    let credit_result = call.json()?;
    if call.is_error {
        let message = credit_result
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        tracing::warn!("credit_score returned an error: {}", message);
    } else if let Ok(reduced) = serde_json::from_value::<ReducedCreditResult>(credit_result.clone())
    {
        log_summary(&reduced);
    }

    let prompts = client.list_prompts().await?;
    tracing::info!(
        "Prompts available: {}",
        prompts
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let prompt = client
        .get_prompt(
            CREDIT_SCORE_PROMPT,
            json!({ "credit_report": credit_result.to_string() }),
        )
        .await?;

    let assessment = match llm {
        Some(llm) => Some(ask_model(client, llm, &prompt, &llm_tools).await?),
        None => None,
    };

    Ok(AssessmentOutcome {
        tools,
        credit_result,
        credit_lookup_failed: call.is_error,
        prompt,
        assessment,
    })
}

/// One model turn, plus a second turn if the model asked for tool calls.
pub async fn ask_model(
    client: &dyn McpClient,
    llm: &ChatCompletionClient,
    prompt: &str,
    tools: &[Value],
) -> Result<Assessment, AppError> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];

    let reply = llm.complete(&messages, tools).await?;
    let calls = reply.requested_tool_calls().to_vec();
    if calls.is_empty() {
        tracing::info!("Model answered without tool calls");
        return Ok(Assessment::Direct(reply.content));
    }

    messages.push(reply);
    for call in &calls {
        tracing::info!("Model requested tool {}", call.function.name);
        let content = match run_tool_call(client, &call.function).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Tool call {} failed: {}", call.function.name, e);
                json!({ "error": e.to_string() }).to_string()
            }
        };
        messages.push(ChatMessage::tool(call.id.clone(), content));
    }

    tracing::info!("Calling model again with {} tool results", calls.len());
    let final_reply = llm.complete(&messages, tools).await?;

    Ok(Assessment::AfterToolCalls {
        tool_calls: calls.len(),
        content: final_reply.content,
    })
}

async fn run_tool_call(client: &dyn McpClient, function: &FunctionCall) -> Result<String, AppError> {
    let arguments = function.parsed_arguments()?;
    let result = client.call_tool(&function.name, arguments).await?;
    match result.text() {
        Some(text) => Ok(text.to_string()),
        None => Ok(result.json()?.to_string()),
    }
}

fn log_summary(result: &ReducedCreditResult) {
    let info = &result.credit_score_info;
    tracing::info!("Experian credit score: {}", info.score);
    tracing::info!("Consumer name: {}", result.full_name());
    tracing::info!("Date of birth: {}", result.date_of_birth);
    tracing::info!("Report date: {}", result.report_date);
    tracing::info!("Model indicator: {}", info.model_indicator);
    tracing::info!("Evaluation: {}", info.evaluation);
    tracing::info!(
        "Score factors: {}",
        info.score_factors
            .iter()
            .map(|f| format!("{}({})", f.code, f.importance))
            .collect::<Vec<_>>()
            .join(", ")
    );
}
