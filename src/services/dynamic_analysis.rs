//! Dynamic Analysis Service
//!
//! LLM-based security assessment, fingerprint-keyed like the static side.
//! The model's verdict is cached only when it reports success; a degraded
//! response is still returned to the caller.

use crate::cache::TieredCache;
use crate::domain::SourceHash;
use crate::fingerprint;
use crate::llm::LlmClient;
use crate::models::errors::{AppError, AppResult};
use crate::models::responses::DynamicAnalysisResponse;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct DynamicAnalysisService {
    llm: Arc<LlmClient>,
    cache: TieredCache<DynamicAnalysisResponse>,
}

impl DynamicAnalysisService {
    pub fn new(llm: Arc<LlmClient>, cache: TieredCache<DynamicAnalysisResponse>) -> Self {
        Self { llm, cache }
    }

    /// Assess a source artifact, reusing a cached verdict for a known
    /// fingerprint.
    pub async fn analyze(&self, source_code: &str) -> AppResult<DynamicAnalysisResponse> {
        if source_code.trim().is_empty() {
            return Err(AppError::invalid_input("Source code cannot be empty"));
        }

        let source_hash = fingerprint::source_hash(source_code);

        if let Some(cached) = self.cache.get(&[&source_hash]).await {
            info!("Returning cached dynamic analysis for {}", source_hash);
            return Ok(cached);
        }

        let result = self.llm.analyze_security(source_code).await?;

        info!(
            "Dynamic analysis completed for {}: {} vulnerabilities, risk {:?}",
            source_hash,
            result.analysis.vulnerabilities.len(),
            result.analysis.risk_level
        );

        let response = DynamicAnalysisResponse {
            success: result.success,
            message: result.error,
            total_issues: result.analysis.vulnerabilities.len(),
            analysis: result.analysis,
            analyzed_at: Utc::now(),
            source_hash: source_hash.clone(),
        };

        if response.success {
            self.cache.put_detached(vec![source_hash], response.clone());
        }

        Ok(response)
    }

    /// Read a cached assessment by fingerprint.
    pub async fn get(&self, source_hash: &str) -> AppResult<DynamicAnalysisResponse> {
        let hash = SourceHash::parse(source_hash)?;

        self.cache.get(&[hash.as_str()]).await.ok_or_else(|| {
            AppError::not_found(format!("Dynamic analysis not found for {}", hash))
        })
    }
}
