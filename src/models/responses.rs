//! Service response payloads
//!
//! These are the artifacts the orchestrator emits. They double as cache
//! values: the same JSON shape lives in the L1 store and (for analyses) in
//! the L2 payload columns, so every type here round-trips through serde.

use crate::llm::SecurityAssessment;
use crate::slither::{SeveritySummary, SlitherIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached contract row as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractResponse {
    pub address: String,
    pub network: String,
    pub source_code: String,
    pub contract_name: String,
    pub compiler_version: String,
    pub source_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a source-code fetch. `cached_at` is set only when the source
/// was served from the contract cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractSourceResponse {
    pub address: String,
    pub network: String,
    pub source_code: String,
    pub source_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

/// Static analysis report keyed by source fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticAnalysisResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub issues: Vec<SlitherIssue>,
    pub total_issues: usize,
    #[serde(default)]
    pub severity_summary: SeveritySummary,
    pub analyzed_at: DateTime<Utc>,
    pub source_hash: String,
}

/// LLM security assessment keyed by source fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicAnalysisResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub analysis: SecurityAssessment,
    pub total_issues: usize,
    pub analyzed_at: DateTime<Utc>,
    pub source_hash: String,
}

/// Generated unit tests keyed by source fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub test_code: String,
    pub test_framework: String,
    pub test_language: String,
    pub file_name: String,
    pub source_hash: String,
    pub warnings_and_recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
