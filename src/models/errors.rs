//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code for debugging and monitoring.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - Domain errors map to 4xx responses
//! - Upstream/runner errors map to 5xx responses

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Input / domain errors
    // ============================================
    /// Request failed validation
    InvalidInput,
    /// Requested entity does not exist
    NotFound,
    /// Contract source is not verified on the explorer
    NotVerified,
    /// Network is not in the supported set
    UnsupportedNetwork,
    /// Unique key already taken
    Conflict,

    // ============================================
    // Upstream errors
    // ============================================
    /// Transient transport failure (retryable)
    TransportError,
    /// Upstream service rejected the request (non-retryable)
    ProviderError,
    /// LLM safety filter blocked the request
    ContentBlocked,
    /// Upstream payload could not be parsed
    ParseError,

    // ============================================
    // Analysis runner errors
    // ============================================
    /// Slither sidecar container is not running
    RunnerUnavailable,
    /// Slither execution failed
    RunnerError,

    // ============================================
    // Generic
    // ============================================
    /// Unexpected internal failure
    Internal,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "INVALID_INPUT",
            Self::NotFound => "NOT_FOUND",
            Self::NotVerified => "NOT_VERIFIED",
            Self::UnsupportedNetwork => "UNSUPPORTED_NETWORK",
            Self::Conflict => "CONFLICT",
            Self::TransportError => "TRANSPORT_ERROR",
            Self::ProviderError => "PROVIDER_ERROR",
            Self::ContentBlocked => "CONTENT_BLOCKED",
            Self::ParseError => "PARSE_ERROR",
            Self::RunnerUnavailable => "RUNNER_UNAVAILABLE",
            Self::RunnerError => "RUNNER_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput | Self::UnsupportedNetwork => 400,
            Self::NotFound | Self::NotVerified => 404,
            Self::Conflict => 409,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError)
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    pub fn not_verified(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotVerified, msg)
    }

    pub fn unsupported_network(network: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedNetwork,
            format!("Unsupported network: {}", network),
        )
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransportError, msg)
    }

    pub fn provider(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderError, msg)
    }

    pub fn content_blocked(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::ContentBlocked, reason)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, msg)
    }

    pub fn runner_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RunnerUnavailable, msg)
    }

    pub fn runner(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RunnerError, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::TransportError, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::TransportError, "Connection failed")
        } else {
            Self::with_source(ErrorCode::TransportError, "HTTP request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::ParseError, "JSON parse error", err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::new(ErrorCode::NotFound, "Record not found"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::new(ErrorCode::Conflict, "Unique key already exists")
            }
            _ => Self::with_source(ErrorCode::Internal, "Database error", err),
        }
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        Self::with_source(ErrorCode::TransportError, "Redis error", err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Internal, "IO error", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = AppError::runner_unavailable("container is down");
        assert_eq!(err.code, ErrorCode::RunnerUnavailable);
        assert_eq!(err.code_str(), "RUNNER_UNAVAILABLE");
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::TransportError.is_retryable());
        assert!(!ErrorCode::ProviderError.is_retryable());
        assert!(!ErrorCode::ContentBlocked.is_retryable());
    }

    #[test]
    fn test_http_status() {
        assert_eq!(ErrorCode::InvalidInput.http_status(), 400);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::NotVerified.http_status(), 404);
        assert_eq!(ErrorCode::Conflict.http_status(), 409);
        assert_eq!(ErrorCode::RunnerError.http_status(), 500);
    }
}
