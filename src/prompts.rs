use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::errors::AppError;

/// Argument advertised by `prompts/list`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// Prompt definition as advertised by `prompts/list`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
}

/// A named prompt template the host renders for the agent.
pub trait Prompt: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn arguments(&self) -> Vec<PromptArgument>;

    /// Render the prompt text. Argument problems are `AppError::BadRequest`.
    fn render(&self, arguments: &Value) -> Result<String, AppError>;

    fn to_definition(&self) -> PromptDefinition {
        PromptDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            arguments: self.arguments(),
        }
    }
}

#[derive(Default, Clone)]
pub struct PromptRegistry {
    prompts: Vec<Arc<dyn Prompt>>,
}

impl PromptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, prompt: Arc<dyn Prompt>) {
        self.prompts.retain(|p| p.name() != prompt.name());
        self.prompts.push(prompt);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Prompt>> {
        self.prompts.iter().find(|p| p.name() == name).cloned()
    }

    pub fn definitions(&self) -> Vec<PromptDefinition> {
        self.prompts.iter().map(|p| p.to_definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

pub const CREDIT_SCORE_PROMPT: &str = "build_credit_score_prompt";

/// What the assessment prompt is built from.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    Score(i64),
    /// Reduced credit result, or whatever text the caller passed if it was not JSON.
    CreditReport(CreditReportText),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreditReportText {
    Json(Value),
    Raw(String),
}

impl PromptInput {
    /// Reads `credit_report` (preferred) or `score` from prompt arguments.
    pub fn from_arguments(arguments: &Value) -> Result<Self, AppError> {
        match arguments.get("credit_report") {
            Some(Value::String(text)) => {
                return Ok(match serde_json::from_str::<Value>(text) {
                    Ok(value) => PromptInput::CreditReport(CreditReportText::Json(value)),
                    Err(_) => PromptInput::CreditReport(CreditReportText::Raw(text.clone())),
                });
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                return Ok(PromptInput::CreditReport(CreditReportText::Json(
                    other.clone(),
                )))
            }
        }

        match arguments.get("score") {
            Some(Value::Number(n)) => n.as_i64().map(PromptInput::Score).ok_or_else(|| {
                AppError::BadRequest(format!("score must be an integer, got {}", n))
            }),
            Some(Value::String(s)) => s.trim().parse::<i64>().map(PromptInput::Score).map_err(
                |_| AppError::BadRequest(format!("score must be an integer, got '{}'", s)),
            ),
            Some(Value::Null) | None => Err(AppError::BadRequest(
                "either 'credit_report' or 'score' is required".to_string(),
            )),
            Some(other) => Err(AppError::BadRequest(format!(
                "score must be an integer, got {}",
                other
            ))),
        }
    }

    pub fn render(&self) -> String {
        match self {
            PromptInput::Score(score) => format!(
                "You are a financial assistant. Generate a loan risk assessment for an applicant with a credit score of {}.",
                score
            ),
            PromptInput::CreditReport(report) => {
                let text = match report {
                    CreditReportText::Json(value) => value.to_string(),
                    CreditReportText::Raw(raw) => raw.clone(),
                };
                format!(
                    "You are a financial loan officer assistant. Generate an extensive loan risk assessment for this applicant based on this credit report: {}",
                    text
                )
            }
        }
    }
}

/// Loan-risk assessment prompt for a credit score or a reduced credit report.
pub struct CreditScorePrompt;

impl Prompt for CreditScorePrompt {
    fn name(&self) -> &str {
        CREDIT_SCORE_PROMPT
    }

    fn description(&self) -> &str {
        "Generate a loan risk assessment prompt for an applicant from their credit report (or bare credit score)."
    }

    fn arguments(&self) -> Vec<PromptArgument> {
        vec![
            PromptArgument {
                name: "credit_report".to_string(),
                description: "Credit summary returned by the credit_score tool, as JSON".to_string(),
                required: false,
            },
            PromptArgument {
                name: "score".to_string(),
                description: "Credit score, used when no credit report is given".to_string(),
                required: false,
            },
        ]
    }

    fn render(&self, arguments: &Value) -> Result<String, AppError> {
        Ok(PromptInput::from_arguments(arguments)?.render())
    }
}
