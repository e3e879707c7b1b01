use serde_json::Value;
use tokio::sync::RwLock;

use crate::errors::{AppError, ResultExt};
use crate::experian_client::{AccessToken, ExperianClient};
use crate::report_request::CreditReportRequest;

/// Tokens are refreshed this long before their reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Experian client plus the bearer token it is currently using.
///
/// The token is fetched once (normally at startup) and reused for every
/// report. It is refetched only when the token endpoint reported a lifetime
/// and that lifetime has run out.
pub struct ExperianSession {
    client: ExperianClient,
    token: RwLock<Option<AccessToken>>,
}

impl ExperianSession {
    pub fn new(client: ExperianClient) -> Self {
        Self {
            client,
            token: RwLock::new(None),
        }
    }

    /// Creates a session and fetches its first token.
    pub async fn connect(client: ExperianClient) -> Result<Self, AppError> {
        let session = Self::new(client);
        session.refresh().await?;
        Ok(session)
    }

    /// Current token, refetching it if missing or expired.
    pub async fn bearer(&self) -> Result<AccessToken, AppError> {
        let margin = chrono::Duration::seconds(EXPIRY_MARGIN_SECS);
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if !token.is_expired_at(chrono::Utc::now(), margin) {
                    return Ok(token.clone());
                }
                tracing::info!("Experian access token expired; refreshing");
            }
        }

        let mut guard = self.token.write().await;
        // another caller may have refreshed while this one waited for the lock
        if let Some(token) = guard.as_ref() {
            if !token.is_expired_at(chrono::Utc::now(), margin) {
                return Ok(token.clone());
            }
        }
        self.fetch_into(&mut guard).await
    }

    /// Fetches a new token unconditionally and stores it.
    pub async fn refresh(&self) -> Result<AccessToken, AppError> {
        let mut guard = self.token.write().await;
        self.fetch_into(&mut guard).await
    }

    async fn fetch_into(&self, slot: &mut Option<AccessToken>) -> Result<AccessToken, AppError> {
        let token = self
            .client
            .fetch_token()
            .await
            .context("Obtaining Experian access token")?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Requests a credit report using the session token.
    pub async fn request_report(&self, request: &CreditReportRequest) -> Result<Value, AppError> {
        let token = self.bearer().await?;
        self.client.request_report(&token, request).await
    }

    pub async fn has_token(&self) -> bool {
        self.token.read().await.is_some()
    }
}
