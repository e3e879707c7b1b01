use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

// ============ Tool Output Models ============

/// Flat credit summary returned by the `credit_score` tool.
///
/// Every field defaults when the vendor response lacks it, so a partially
/// populated report still deserializes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReducedCreditResult {
    /// SSN on file (from the report), or the requested SSN.
    pub ssn: String,
    pub consumer_name: ConsumerName,
    /// `"{month}/{day}/{year}"` exactly as the vendor spells each part.
    pub date_of_birth: String,
    pub report_date: String,
    pub credit_score_info: CreditScoreInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsumerName {
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditScoreInfo {
    pub score: i64,
    pub model_indicator: String,
    pub evaluation: String,
    pub score_factors: Vec<ScoreFactor>,
}

/// Reason code contributing to the score, with its rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreFactor {
    pub code: String,
    pub importance: String,
}

impl ReducedCreditResult {
    pub fn full_name(&self) -> String {
        [
            self.consumer_name.first_name.as_str(),
            self.consumer_name.middle_name.as_str(),
            self.consumer_name.last_name.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Error value surfaced by the tool when the token or report stage fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolErrorPayload {
    pub error: String,
    pub ssn: String,
}

// ============ SSN Input ============

/// Validates an SSN as given to the tool and returns its nine digits.
///
/// Accepts `123-45-6789` and `123456789`.
pub fn normalize_ssn(input: &str) -> Result<String, AppError> {
    static SSN_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = SSN_REGEX.get_or_init(|| Regex::new(r"^[0-9]{3}-?[0-9]{2}-?[0-9]{4}$").unwrap());

    let trimmed = input.trim();
    if !regex.is_match(trimmed) {
        return Err(AppError::BadRequest(
            "ssn must be nine digits, optionally formatted as 123-45-6789".to_string(),
        ));
    }

    Ok(trimmed.chars().filter(|c| c.is_ascii_digit()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_ssn_accepts_both_forms() {
        assert_eq!(normalize_ssn("123-45-6789").unwrap(), "123456789");
        assert_eq!(normalize_ssn("123456789").unwrap(), "123456789");
        assert_eq!(normalize_ssn(" 666-12-3456 ").unwrap(), "666123456");
    }

    #[test]
    fn test_normalize_ssn_rejects_malformed() {
        for bad in ["", "12-345-6789", "1234567890", "abc-de-fghi", "123 45 6789"] {
            let err = normalize_ssn(bad).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_normalize_ssn_rejects_non_ascii_digits() {
        // Arabic-Indic and fullwidth digits are Unicode \d but not SSN digits
        for bad in ["١٢٣-٤٥-٦٧٨٩", "１２３４５６７８９", "12३-45-6789"] {
            let err = normalize_ssn(bad).unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_partial_json_deserializes_with_defaults() {
        let parsed: ReducedCreditResult = serde_json::from_value(json!({
            "ssn": "999999999",
            "credit_score_info": {"score": 701}
        }))
        .unwrap();

        assert_eq!(parsed.credit_score_info.score, 701);
        assert!(parsed.credit_score_info.score_factors.is_empty());
        assert_eq!(parsed.consumer_name, ConsumerName::default());
    }

    #[test]
    fn test_full_name_skips_empty_parts() {
        let result = ReducedCreditResult {
            consumer_name: ConsumerName {
                first_name: "JOHN".into(),
                middle_name: "".into(),
                last_name: "CANN".into(),
            },
            ..Default::default()
        };
        assert_eq!(result.full_name(), "JOHN CANN");
    }

    #[test]
    fn test_error_payload_shape() {
        let payload = ToolErrorPayload {
            error: "External API error (503): unavailable".into(),
            ssn: "123-45-6789".into(),
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value, json!({"error": "External API error (503): unavailable", "ssn": "123-45-6789"}));
    }
}
