//! API Request/Response Types

use crate::models::errors::AppError;
use serde::{Deserialize, Serialize};

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "INVALID_INPUT".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: err.source.as_ref().map(|s| s.to_string()),
        }
    }
}

// ============================================
// Contracts
// ============================================

#[derive(Debug, Deserialize)]
pub struct NetworkQuery {
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_network() -> String {
    "ethereum".to_string()
}

#[derive(Debug, Serialize)]
pub struct NetworkInfo {
    pub network: String,
    pub chain_id: u64,
}

// ============================================
// Analysis
// ============================================

#[derive(Debug, Deserialize)]
pub struct StaticAnalysisRequest {
    pub source_code: String,
}

#[derive(Debug, Deserialize)]
pub struct DynamicAnalysisRequest {
    pub source_code: String,
}

// ============================================
// Test generation
// ============================================

#[derive(Debug, Deserialize)]
pub struct TestCaseGenerateRequest {
    pub source_code: String,
    #[serde(default = "default_framework")]
    pub test_framework: String,
    #[serde(default = "default_language")]
    pub test_language: String,
}

fn default_framework() -> String {
    "hardhat".to_string()
}

fn default_language() -> String {
    "javascript".to_string()
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: bool,
    pub cache: bool,
    pub slither_container: bool,
}
