//! Tools exposed to the language-model agent through the tool host.
//!
//! A [`Tool`] names itself, describes its input with a JSON schema, and turns
//! JSON arguments into a [`ToolOutput`]. The [`ToolRegistry`] keeps them in
//! registration order for `tools/list` and dispatches `tools/call`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::Instrument;

use crate::errors::AppError;
use crate::models::{normalize_ssn, ToolErrorPayload};
use crate::redaction::{mask_ssn, ssn_fingerprint};
use crate::reducer::reduce_report;
use crate::services::ReportSource;

/// Result of a tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub structured: Value,
    /// True when `structured` describes a failure the caller should see.
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success<T: Serialize>(value: &T) -> Result<Self, AppError> {
        Ok(Self {
            structured: serde_json::to_value(value)?,
            is_error: false,
        })
    }

    pub fn failure<T: Serialize>(value: &T) -> Result<Self, AppError> {
        Ok(Self {
            structured: serde_json::to_value(value)?,
            is_error: true,
        })
    }
}

/// Tool definition as advertised by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in `tools/call`
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema for arguments
    fn input_schema(&self) -> Value;

    /// Run the tool. `Err` is reserved for caller mistakes (bad arguments);
    /// upstream failures come back as `ToolOutput { is_error: true, .. }`.
    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AppError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool; a later registration with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.retain(|t| t.name() != tool.name());
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutput, AppError> {
        let tool = self
            .get(name)
            .ok_or_else(|| AppError::NotFound(format!("Unknown tool: {}", name)))?;
        tool.execute(arguments).await
    }
}

pub const CREDIT_SCORE_TOOL: &str = "credit_score";

/// Looks up an applicant's credit report and returns the reduced summary.
pub struct CreditScoreTool {
    source: Arc<dyn ReportSource>,
}

impl CreditScoreTool {
    pub fn new(source: Arc<dyn ReportSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for CreditScoreTool {
    fn name(&self) -> &str {
        CREDIT_SCORE_TOOL
    }

    fn description(&self) -> &str {
        "Fetch the credit score and credit summary for an applicant from the Experian credit profile API.\n\
         Args:\n    ssn (str): Social Security Number of the applicant.\n\
         Returns:\n    dict: Consumer name, date of birth, report date and credit score information."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ssn": {
                    "title": "Ssn",
                    "type": "string",
                    "description": "Social Security Number of the applicant, e.g. 123-45-6789"
                }
            },
            "required": ["ssn"]
        })
    }

    async fn execute(&self, arguments: Value) -> Result<ToolOutput, AppError> {
        let requested = arguments
            .get("ssn")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::BadRequest("missing required argument 'ssn'".to_string()))?;
        let digits = normalize_ssn(requested)?;

        let call_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "credit_score",
            %call_id,
            applicant = %ssn_fingerprint(&digits)
        );

        async move {
            tracing::info!(
                "Fetching credit report for {} via {}",
                mask_ssn(&digits),
                self.source.describe()
            );

            match self.source.fetch_report(&digits).await {
                Ok(raw) => {
                    let result = reduce_report(&raw, requested);
                    tracing::info!(
                        "✓ Credit score {} (model {})",
                        result.credit_score_info.score,
                        result.credit_score_info.model_indicator
                    );
                    ToolOutput::success(&result)
                }
                Err(e) => {
                    tracing::error!("Credit report lookup failed: {}", e);
                    if let Some(body) = e.response_body() {
                        tracing::debug!("Response body: {}", body);
                    }
                    ToolOutput::failure(&ToolErrorPayload {
                        error: e.to_string(),
                        ssn: requested.to_string(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StubSource {
        response: Result<Value, AppError>,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReportSource for StubSource {
        async fn fetch_report(&self, ssn_digits: &str) -> Result<Value, AppError> {
            self.seen.lock().unwrap().push(ssn_digits.to_string());
            self.response.clone()
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }
    }

    fn tool_with(response: Result<Value, AppError>) -> (CreditScoreTool, Arc<StubSource>) {
        let source = Arc::new(StubSource {
            response,
            seen: Mutex::new(Vec::new()),
        });
        (CreditScoreTool::new(source.clone()), source)
    }

    #[tokio::test]
    async fn test_success_returns_reduced_result() {
        let (tool, source) = tool_with(Ok(json!({
            "creditProfile": [{"riskModel": [{"score": "0688", "modelIndicator": "V4"}]}]
        })));

        let output = tool.execute(json!({"ssn": "123-45-6789"})).await.unwrap();

        assert!(!output.is_error);
        assert_eq!(output.structured["credit_score_info"]["score"], 688);
        assert_eq!(output.structured["ssn"], "123-45-6789");
        assert_eq!(source.seen.lock().unwrap().as_slice(), ["123456789"]);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_error_value() {
        let (tool, _) = tool_with(Err(AppError::ExternalApi {
            status: Some(503),
            message: "Credit report request rejected".into(),
            body: Some("maintenance".into()),
        }));

        let output = tool.execute(json!({"ssn": "123456789"})).await.unwrap();

        assert!(output.is_error);
        assert_eq!(output.structured["ssn"], "123456789");
        assert!(output.structured["error"]
            .as_str()
            .unwrap()
            .contains("503"));
    }

    #[tokio::test]
    async fn test_bad_arguments_rejected_before_lookup() {
        let (tool, source) = tool_with(Ok(json!({})));

        let missing = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(missing, AppError::BadRequest(_)));

        let malformed = tool.execute(json!({"ssn": "12-34"})).await.unwrap_err();
        assert!(matches!(malformed, AppError::BadRequest(_)));

        let non_ascii = tool.execute(json!({"ssn": "١٢٣-٤٥-٦٧٨٩"})).await.unwrap_err();
        assert!(matches!(non_ascii, AppError::BadRequest(_)));

        assert!(source.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_dispatch() {
        let (tool, _) = tool_with(Ok(json!({})));
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(tool));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].name, CREDIT_SCORE_TOOL);
        assert_eq!(
            registry.definitions()[0].input_schema["required"],
            json!(["ssn"])
        );

        let err = registry.call("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
