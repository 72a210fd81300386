//! Persisted entities
//!
//! Row types for the relational store. Orchestrator services own entity
//! construction; repositories own persistence. `source_hash` is always the
//! fingerprint of the exact source text stored alongside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Verified contract fetched from a block explorer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub address: String,
    pub network: String,
    pub source_code: String,
    pub contract_name: String,
    pub compiler_version: String,
    pub source_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Slither output for one unique source fingerprint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StaticAnalysis {
    pub id: Uuid,
    pub source_hash: String,
    pub slither_output: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// LLM security assessment for one unique source fingerprint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DynamicAnalysis {
    pub id: Uuid,
    pub source_hash: String,
    pub llm_response: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generated unit tests for one unique source fingerprint.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GeneratedTestCases {
    pub id: Uuid,
    pub source_hash: String,
    pub test_code: String,
    pub test_framework: String,
    pub test_language: String,
    pub file_name: String,
    pub warnings_and_recommendations: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
