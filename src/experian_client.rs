use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{Credentials, ExperianConfig};
use crate::errors::AppError;
use crate::report_request::CreditReportRequest;

/// Bearer token issued by Experian's OAuth endpoint.
#[derive(Clone)]
pub struct AccessToken {
    pub value: String,
    pub issued_at: DateTime<Utc>,
    /// Lifetime reported by the token endpoint, in seconds.
    pub expires_in: Option<i64>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"[REDACTED]")
            .field("issued_at", &self.issued_at)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_in: Option<i64>) -> Self {
        Self {
            value: value.into(),
            issued_at: Utc::now(),
            expires_in,
        }
    }

    /// True once `now` is within `margin` of the reported expiry.
    ///
    /// Tokens without a reported lifetime never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        match self.expires_in {
            Some(secs) => now + margin >= self.issued_at + chrono::Duration::seconds(secs),
            None => false,
        }
    }
}

/// Client for Experian's OAuth token and Credit Profile endpoints.
#[derive(Clone)]
pub struct ExperianClient {
    client: reqwest::Client,
    token_url: String,
    report_url: String,
    credentials: Option<Credentials>,
    client_reference_id: String,
    subscriber_code: Option<String>,
}

impl ExperianClient {
    /// Creates a new `ExperianClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint, credential and header settings.
    pub fn new(config: &ExperianConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::external(format!("Failed to create Experian client: {}", e)))?;

        Ok(Self {
            client,
            token_url: config.token_url(),
            report_url: config.credit_report_url(),
            credentials: config.credentials.clone(),
            client_reference_id: config.client_reference_id.clone(),
            subscriber_code: config.subscriber_code.clone(),
        })
    }

    /// Obtains a bearer token with the OAuth2 password (ROPC) grant.
    ///
    /// # Returns
    ///
    /// * `Result<AccessToken, AppError>` - The token, `Unauthorized` when the
    ///   credentials are rejected, or `ExternalApi` for any other failure.
    pub async fn fetch_token(&self) -> Result<AccessToken, AppError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            AppError::Config("Experian credentials are not configured".to_string())
        })?;

        let form = [
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];

        tracing::info!("Requesting Experian access token");
        // Redact secrets from logs to prevent credential exposure
        tracing::debug!(
            "Token request: POST {} username={} client_id={} password=[REDACTED] client_secret=[REDACTED]",
            self.token_url,
            credentials.username,
            credentials.client_id
        );

        let response = self
            .client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Experian rejected credentials ({}): {}", status, error_text);
            return Err(AppError::Unauthorized(format!(
                "token endpoint returned {}: {}",
                status, error_text
            )));
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Experian token endpoint returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApi {
                status: Some(status.as_u16()),
                message: "Token request rejected".to_string(),
                body: Some(error_text),
            });
        }

        let payload: Value = response.json().await.map_err(|e| {
            AppError::external(format!("Failed to parse token response: {}", e))
        })?;

        let value = payload
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::external("Token response missing 'access_token' field"))?;

        // Experian reports expires_in as a string; accept numbers too
        let expires_in = payload.get("expires_in").and_then(|v| match v {
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        });

        tracing::info!("✓ Obtained Experian access token (expires_in: {:?})", expires_in);
        Ok(AccessToken::new(value, expires_in))
    }

    /// Posts a credit-report request and returns the raw vendor JSON.
    ///
    /// # Arguments
    ///
    /// * `token` - Bearer token from `fetch_token`.
    /// * `request` - Vendor request body.
    pub async fn request_report(
        &self,
        token: &AccessToken,
        request: &CreditReportRequest,
    ) -> Result<Value, AppError> {
        tracing::info!("Requesting credit report from Experian");
        tracing::debug!(
            "Credit report request: POST {} clientReferenceId={} Subcode={}",
            self.report_url,
            self.client_reference_id,
            self.subscriber_code.as_deref().unwrap_or("(not set)")
        );

        let mut builder = self
            .client
            .post(&self.report_url)
            .header("Authorization", format!("Bearer {}", token.value))
            .header("Accept", "application/json")
            .header("clientReferenceId", &self.client_reference_id);
        if let Some(code) = &self.subscriber_code {
            builder = builder.header("Subcode", code);
        }

        let response = builder
            .json(request.body())
            .send()
            .await
            .map_err(|e| AppError::external(format!("Credit report request failed: {}", e)))?;

        let status = response.status();
        tracing::debug!("Credit report response status: {}", status);

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Experian credit report returned error {}", status);
            tracing::debug!("Credit report error body: {}", error_text);
            return Err(AppError::ExternalApi {
                status: Some(status.as_u16()),
                message: "Credit report request rejected".to_string(),
                body: Some(error_text),
            });
        }

        let data: Value = response.json().await.map_err(|e| {
            AppError::external(format!("Failed to parse credit report response: {}", e))
        })?;

        tracing::info!("✓ Credit report received");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ExperianClient::new(&ExperianConfig::offline());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_token_without_credentials() {
        let client = ExperianClient::new(&ExperianConfig::offline()).unwrap();
        let err = client.fetch_token().await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_token_expiry() {
        let token = AccessToken::new("abc", Some(1800));
        let margin = chrono::Duration::seconds(60);

        assert!(!token.is_expired_at(token.issued_at, margin));
        assert!(token.is_expired_at(token.issued_at + chrono::Duration::seconds(1741), margin));

        let forever = AccessToken::new("abc", None);
        assert!(!forever.is_expired_at(Utc::now() + chrono::Duration::days(365), margin));
    }

    #[test]
    fn test_token_debug_redacted() {
        let token = AccessToken::new("eyJsecret", Some(10));
        assert!(!format!("{:?}", token).contains("eyJsecret"));
    }
}
