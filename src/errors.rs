use std::fmt;

use crate::rpc::error_codes;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Missing or malformed configuration.
    Config(String),
    /// Credentials rejected by the OAuth token endpoint.
    Unauthorized(String),
    /// Error interacting with an external API.
    ExternalApi {
        /// HTTP status, when a response was received.
        status: Option<u16>,
        /// What went wrong.
        message: String,
        /// Raw response body, kept for diagnostics.
        body: Option<String>,
    },
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Unknown tool, prompt or method.
    NotFound(String),
    /// Internal error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// Shorthand for an `ExternalApi` error without a response.
    pub fn external(message: impl Into<String>) -> Self {
        AppError::ExternalApi {
            status: None,
            message: message.into(),
            body: None,
        }
    }

    /// Maps the error onto a JSON-RPC error code.
    pub fn rpc_code(&self) -> i64 {
        match self {
            AppError::BadRequest(_) => error_codes::INVALID_PARAMS,
            AppError::NotFound(_) => error_codes::METHOD_NOT_FOUND,
            AppError::WithContext { source, .. } => source.rpc_code(),
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Response body text attached to the error, if any.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            AppError::ExternalApi { body, .. } => body.as_deref(),
            AppError::WithContext { source, .. } => source.response_body(),
            _ => None,
        }
    }

    /// True when the root cause is a rejected credential.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            AppError::Unauthorized(_) => true,
            AppError::WithContext { source, .. } => source.is_unauthorized(),
            _ => false,
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::ExternalApi {
                status: Some(status),
                message,
                ..
            } => write!(f, "External API error ({}): {}", status, message),
            AppError::ExternalApi { message, .. } => write!(f, "External API error: {}", message),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    /// Converts a `reqwest::Error` into an `AppError`.
    fn from(err: reqwest::Error) -> Self {
        AppError::ExternalApi {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            body: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(format!("IO error: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for std::io::Error to add context
impl<T> ResultExt<T> for Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_chain_display() {
        let err: Result<(), AppError> = Err(AppError::Unauthorized("bad password".to_string()));
        let err = err.context("Fetching Experian token").unwrap_err();

        assert_eq!(
            err.to_string(),
            "Fetching Experian token: Unauthorized: bad password"
        );
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_rpc_codes() {
        assert_eq!(AppError::BadRequest("x".into()).rpc_code(), -32602);
        assert_eq!(AppError::NotFound("x".into()).rpc_code(), -32601);
        assert_eq!(AppError::external("x").rpc_code(), -32603);

        let wrapped = AppError::WithContext {
            source: Box::new(AppError::BadRequest("ssn".into())),
            context: "tools/call".into(),
        };
        assert_eq!(wrapped.rpc_code(), -32602);
    }

    #[test]
    fn test_response_body_passthrough() {
        let err = AppError::ExternalApi {
            status: Some(400),
            message: "Credit report request rejected".into(),
            body: Some(r#"{"errors":[]}"#.into()),
        };
        let wrapped = AppError::WithContext {
            source: Box::new(err),
            context: "credit_score".into(),
        };

        assert_eq!(wrapped.response_body(), Some(r#"{"errors":[]}"#));
        assert!(wrapped.to_string().contains("(400)"));
    }
}
