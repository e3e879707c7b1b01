use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{AppError, ResultExt};
use crate::redaction::mask_ssn;
use crate::report_request::CreditReportRequest;
use crate::session::ExperianSession;

/// Where raw credit reports come from.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch the raw vendor report for an applicant SSN (nine digits).
    async fn fetch_report(&self, ssn_digits: &str) -> Result<Value, AppError>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// Live Experian Credit Profile lookups.
pub struct LiveReportSource {
    session: Arc<ExperianSession>,
    template: CreditReportRequest,
}

impl LiveReportSource {
    pub fn new(session: Arc<ExperianSession>, template: CreditReportRequest) -> Self {
        Self { session, template }
    }
}

#[async_trait]
impl ReportSource for LiveReportSource {
    async fn fetch_report(&self, ssn_digits: &str) -> Result<Value, AppError> {
        let request = self.template.with_ssn(ssn_digits);
        tracing::debug!(
            "Credit report request for applicant {}",
            mask_ssn(ssn_digits)
        );
        self.session.request_report(&request).await
    }

    fn describe(&self) -> String {
        "experian".to_string()
    }
}

/// Saved vendor response read from disk on every call; no network access.
pub struct FixtureReportSource {
    path: PathBuf,
}

impl FixtureReportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSource for FixtureReportSource {
    async fn fetch_report(&self, ssn_digits: &str) -> Result<Value, AppError> {
        tracing::info!(
            "Serving fixture credit report {} for applicant {}",
            self.path.display(),
            mask_ssn(ssn_digits)
        );
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Reading report fixture {}", self.path.display()))?;
        let report: Value = serde_json::from_str(&raw)?;
        Ok(report)
    }

    fn describe(&self) -> String {
        format!("fixture:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_fixture_source_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"creditProfile": []}}"#).unwrap();

        let source = FixtureReportSource::new(file.path());
        let report = source.fetch_report("123456789").await.unwrap();
        assert!(report["creditProfile"].as_array().unwrap().is_empty());
        assert!(source.describe().starts_with("fixture:"));
    }

    #[tokio::test]
    async fn test_fixture_source_missing_file() {
        let source = FixtureReportSource::new("/nonexistent/report.json");
        let err = source.fetch_report("123456789").await.unwrap_err();
        assert!(err.to_string().contains("Reading report fixture"));
    }
}
