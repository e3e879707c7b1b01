use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_EXPERIAN_BASE_URL: &str = "https://sandbox-us-api.experian.com";
pub const DEFAULT_CLIENT_REFERENCE_ID: &str = "SBMYSQL";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LLM_ENDPOINT: &str = "https://models.github.ai/inference";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4.1";

const CREDENTIAL_VARS: [&str; 4] = [
    "EXPERIAN_USERNAME",
    "EXPERIAN_PASSWORD",
    "EXPERIAN_CLIENT_ID",
    "EXPERIAN_CLIENT_SECRET",
];

/// Experian OAuth credentials (ROPC grant).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Settings for the Experian token and credit-report endpoints.
#[derive(Debug, Clone)]
pub struct ExperianConfig {
    pub base_url: String,
    /// `None` when any of the four credential variables is unset.
    pub credentials: Option<Credentials>,
    /// Names of the credential variables that were missing or empty.
    pub missing_credentials: Vec<&'static str>,
    pub company_id: Option<String>,
    pub subscriber_code: Option<String>,
    pub client_reference_id: String,
    pub request_fixture: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl ExperianConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing_credentials: Vec<&'static str> = CREDENTIAL_VARS
            .iter()
            .copied()
            .filter(|&key| non_empty(key).is_none())
            .collect();

        let credentials = match (
            non_empty("EXPERIAN_USERNAME"),
            non_empty("EXPERIAN_PASSWORD"),
            non_empty("EXPERIAN_CLIENT_ID"),
            non_empty("EXPERIAN_CLIENT_SECRET"),
        ) {
            (Some(username), Some(password), Some(client_id), Some(client_secret)) => {
                Some(Credentials {
                    username,
                    password,
                    client_id,
                    client_secret,
                })
            }
            _ => None,
        };

        let config = Self {
            base_url: lookup("EXPERIAN_BASE_URL")
                .unwrap_or_else(|| DEFAULT_EXPERIAN_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            credentials,
            missing_credentials,
            company_id: non_empty("EXPERIAN_COMPANY_ID"),
            // Docs use "subscriberCode", some headers "Subcode"; accept every spelling.
            subscriber_code: non_empty("EXPERIAN_SUBSCRIBER_CODE")
                .or_else(|| non_empty("EXPERIAN_SUBCODE"))
                .or_else(|| non_empty("EXPERIAN_SUB_CODE")),
            client_reference_id: non_empty("EXPERIAN_CLIENT_REFERENCE_ID")
                .unwrap_or_else(|| DEFAULT_CLIENT_REFERENCE_ID.to_string()),
            request_fixture: non_empty("EXPERIAN_REQUEST_FIXTURE").map(PathBuf::from),
            timeout_secs: match lookup("EXPERIAN_TIMEOUT_SECS") {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("EXPERIAN_TIMEOUT_SECS must be a positive number of seconds")
                })?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };

        config.validate()?;

        tracing::debug!("Experian Base URL: {}", config.base_url);
        tracing::debug!(
            "Experian credentials: {}",
            if config.credentials.is_some() {
                "present"
            } else {
                "missing"
            }
        );
        tracing::debug!("Client reference id: {}", config.client_reference_id);

        Ok(config)
    }

    /// Config for fixture-backed operation: no credentials, sandbox defaults.
    pub fn offline() -> Self {
        Self {
            base_url: DEFAULT_EXPERIAN_BASE_URL.to_string(),
            credentials: None,
            missing_credentials: CREDENTIAL_VARS.to_vec(),
            company_id: None,
            subscriber_code: None,
            client_reference_id: DEFAULT_CLIENT_REFERENCE_ID.to_string(),
            request_fixture: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("EXPERIAN_BASE_URL must start with http:// or https://");
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("EXPERIAN_BASE_URL is not a valid URL: {}", e))?;
        if self.timeout_secs == 0 {
            anyhow::bail!("EXPERIAN_TIMEOUT_SECS must be greater than zero");
        }
        Ok(())
    }

    /// Credentials for live mode, or an error naming every missing variable.
    pub fn require_credentials(&self) -> anyhow::Result<&Credentials> {
        self.credentials.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "Missing required env vars: {}. Create an .env file with these values.",
                self.missing_credentials.join(", ")
            )
        })
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v1/token", self.base_url)
    }

    pub fn credit_report_url(&self) -> String {
        format!(
            "{}/consumerservices/credit-profile/v2/credit-report",
            self.base_url
        )
    }
}

/// Settings for the OpenAI-compatible chat-completion endpoint.
#[derive(Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    /// Bearer token; the LLM step is skipped without one.
    pub api_key: Option<String>,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl LlmConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("LLM_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            anyhow::bail!("LLM_ENDPOINT must start with http:// or https://");
        }

        let config = Self {
            endpoint,
            model: lookup("LLM_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            api_key: lookup("GITHUB_TOKEN").filter(|v| !v.trim().is_empty()),
        };

        tracing::debug!("LLM endpoint: {} (model {})", config.endpoint, config.model);
        Ok(config)
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}
