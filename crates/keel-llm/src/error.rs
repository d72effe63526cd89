use http::StatusCode;
use keel_core::HttpError;
use thiserror::Error;

/// Errors that can occur while serving a chat completion
#[derive(Debug, Error)]
pub enum LlmError {
    /// Request lacks a valid bearer token
    #[error("invalid API key")]
    Unauthorized,

    /// Gateway configuration cannot serve the request
    ///
    /// Raised when neither the requested nor the fallback model is usable,
    /// and at startup when optimisation is enabled without strategies.
    #[error("{0}")]
    Configuration(String),

    /// Selected strategy is not registered
    #[error("unknown optimisation strategy: {name}")]
    UnknownStrategy { name: String },

    /// Strategy returned an error or panicked
    #[error("optimisation failed: {cause}")]
    OptimisationFailed { cause: String },

    /// Backend returned an error
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Error during streaming response
    #[error("streaming error: {0}")]
    Streaming(String),

    /// Client sent a malformed or invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HttpError for LlmError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_)
            | Self::UnknownStrategy { .. }
            | Self::OptimisationFailed { .. }
            | Self::Streaming(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &str {
        match self {
            Self::Unauthorized => "authentication_error",
            Self::Configuration(_) => "configuration_error",
            Self::UnknownStrategy { .. } => "unknown_strategy_error",
            Self::OptimisationFailed { .. } => "optimisation_error",
            Self::Upstream(_) => "upstream_error",
            Self::Streaming(_) => "streaming_error",
            Self::InvalidRequest(_) => "invalid_request_error",
            Self::Internal(_) => "internal_error",
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::Internal(_) => "an internal error occurred".to_owned(),
            other => other.to_string(),
        }
    }
}

/// Failure reported by an optimisation strategy
///
/// Never reaches clients directly; the gateway folds it into
/// [`LlmError::OptimisationFailed`].
#[derive(Debug, Error)]
pub enum StrategyError {
    /// Strategy could not obtain a completion from the backend
    #[error("backend call failed: {0}")]
    Backend(#[from] LlmError),

    /// Strategy produced no usable output
    #[error("strategy produced no output")]
    EmptyOutput,

    /// Any other strategy-specific failure
    #[error("{0}")]
    Failed(String),
}

impl From<StrategyError> for LlmError {
    fn from(error: StrategyError) -> Self {
        Self::OptimisationFailed {
            cause: error.to_string(),
        }
    }
}
