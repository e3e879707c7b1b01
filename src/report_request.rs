use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ExperianConfig;
use crate::errors::{AppError, ResultExt};

/// Sandbox request body for Experian's Credit Profile v2 endpoint.
const SANDBOX_REQUEST: &str = include_str!("../data/credit_report_request.json");

/// Request body for the credit-report endpoint.
///
/// The vendor schema is large and mostly opaque to us, so the body is kept
/// as JSON. Only the requestor codes and the applicant SSN are ever touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditReportRequest {
    body: Value,
}

impl CreditReportRequest {
    /// Wraps an existing body; it must be a JSON object.
    pub fn from_value(body: Value) -> Result<Self, AppError> {
        if !body.is_object() {
            return Err(AppError::Config(
                "credit report request body must be a JSON object".to_string(),
            ));
        }
        Ok(Self { body })
    }

    /// The built-in sandbox test applicant.
    pub fn sandbox_default() -> Result<Self, AppError> {
        let body: Value = serde_json::from_str(SANDBOX_REQUEST)?;
        Self::from_value(body)
    }

    /// Loads a request body verbatim from a JSON fixture file.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Reading request fixture {}", path.display()))?;
        let body: Value = serde_json::from_str(&raw).map_err(|e| {
            AppError::Config(format!(
                "request fixture {} is not valid JSON: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_value(body)
    }

    /// Fixture from config (or the sandbox default) with requestor codes applied.
    pub fn from_config(config: &ExperianConfig) -> Result<Self, AppError> {
        let mut request = match config.request_fixture.as_deref() {
            Some(path) => {
                tracing::info!("Loading credit report request from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::sandbox_default()?,
        };

        if let Some(code) = &config.subscriber_code {
            request.set_path(&["requestor", "subscriberCode"], Value::from(code.as_str()));
        }
        if let Some(company) = &config.company_id {
            request.set_path(&["requestor", "companyId"], Value::from(company.as_str()));
        }

        Ok(request)
    }

    /// Copy of this request targeting the given applicant SSN (nine digits).
    pub fn with_ssn(&self, ssn_digits: &str) -> Self {
        let mut request = self.clone();
        request.set_path(
            &["consumerPii", "primaryApplicant", "ssn", "ssn"],
            Value::from(ssn_digits),
        );
        request
    }

    /// Applicant SSN currently in the body, if any.
    pub fn applicant_ssn(&self) -> Option<&str> {
        self.body
            .pointer("/consumerPii/primaryApplicant/ssn/ssn")
            .and_then(Value::as_str)
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Sets a nested key, replacing any non-object value found on the way.
    fn set_path(&mut self, path: &[&str], value: Value) {
        let Some((last, parents)) = path.split_last() else {
            return;
        };

        let mut node = &mut self.body;
        for key in parents {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = match node {
                Value::Object(map) => map
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
                _ => return,
            };
        }

        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            map.insert(last.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_sandbox_default_loads() {
        let request = CreditReportRequest::sandbox_default().unwrap();
        assert_eq!(request.applicant_ssn(), Some("111111111"));
        assert_eq!(request.body()["permissiblePurpose"]["type"], "08");
    }

    #[test]
    fn test_with_ssn_replaces_applicant() {
        let request = CreditReportRequest::sandbox_default().unwrap();
        let targeted = request.with_ssn("123456789");

        assert_eq!(targeted.applicant_ssn(), Some("123456789"));
        // source request untouched
        assert_eq!(request.applicant_ssn(), Some("111111111"));
        assert_eq!(
            targeted.body()["consumerPii"]["primaryApplicant"]["name"]["lastName"],
            "CANN"
        );
    }

    #[test]
    fn test_with_ssn_creates_missing_path() {
        let request = CreditReportRequest::from_value(json!({"permissiblePurpose": {"type": "08"}}))
            .unwrap()
            .with_ssn("999999999");

        assert_eq!(request.applicant_ssn(), Some("999999999"));
    }

    #[test]
    fn test_requestor_codes_from_config() {
        let mut config = ExperianConfig::offline();
        config.subscriber_code = Some("3333333".to_string());
        config.company_id = Some("ACME".to_string());

        let request = CreditReportRequest::from_config(&config).unwrap();
        assert_eq!(request.body()["requestor"]["subscriberCode"], "3333333");
        assert_eq!(request.body()["requestor"]["companyId"], "ACME");
    }

    #[test]
    fn test_fixture_file_loaded_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"consumerPii": {{"names": [{{"firstName": "John"}}]}}}}"#).unwrap();

        let mut config = ExperianConfig::offline();
        config.request_fixture = Some(file.path().to_path_buf());

        let request = CreditReportRequest::from_config(&config).unwrap();
        assert_eq!(request.body()["consumerPii"]["names"][0]["firstName"], "John");
        assert!(request.body().get("requestor").is_none());
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(CreditReportRequest::from_value(json!([1, 2, 3])).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = CreditReportRequest::from_file(file.path()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
