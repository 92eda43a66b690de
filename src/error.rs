use thiserror::Error;

/// Core error types
#[derive(Error, Debug)]
pub enum CoreError {
    /// Principal is not allowed to see the requested scope
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested entity or subset does not exist for this principal
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or out-of-range request input
    #[error("Bad parameter: {0}")]
    BadParameter(String),

    /// Document store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status the embedding edge should map this error to
    pub fn status_code(&self) -> u16 {
        match self {
            CoreError::Forbidden(_) => 403,
            CoreError::NotFound(_) => 404,
            CoreError::BadParameter(_) => 400,
            CoreError::Store(_) => 502,
            CoreError::Configuration(_) => 500,
            CoreError::Internal(_) => 500,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::BadParameter(_) => "BAD_PARAMETER",
            CoreError::Store(_) => "STORE_ERROR",
            CoreError::Configuration(_) => "CONFIGURATION_ERROR",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::BadParameter(err.to_string())
    }
}

/// Conversion from reqwest::Error
impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        CoreError::Store(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CoreError>;
