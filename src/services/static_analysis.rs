//! Static Analysis Service
//!
//! Fingerprints the source, serves the analysis cache, and runs the Slither
//! pipeline on a miss. Concurrent runs are bounded by a semaphore sized to
//! the sidecar container's CPU allowance.

use crate::cache::TieredCache;
use crate::domain::SourceHash;
use crate::fingerprint;
use crate::models::errors::{AppError, AppResult};
use crate::models::responses::StaticAnalysisResponse;
use crate::slither::{severity_summary, SlitherRunner};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

pub struct StaticAnalysisService {
    runner: Arc<SlitherRunner>,
    cache: TieredCache<StaticAnalysisResponse>,
    run_permits: Arc<Semaphore>,
}

impl StaticAnalysisService {
    pub fn new(
        runner: Arc<SlitherRunner>,
        cache: TieredCache<StaticAnalysisResponse>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            runner,
            cache,
            run_permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Analyze a source artifact, reusing a cached result when its
    /// fingerprint has been analyzed before.
    pub async fn analyze(&self, source_code: &str) -> AppResult<StaticAnalysisResponse> {
        if source_code.trim().is_empty() {
            return Err(AppError::invalid_input("Source code cannot be empty"));
        }

        let source_hash = fingerprint::source_hash(source_code);

        if let Some(cached) = self.cache.get(&[&source_hash]).await {
            info!("Returning cached static analysis for {}", source_hash);
            return Ok(cached);
        }

        let _permit = self
            .run_permits
            .acquire()
            .await
            .map_err(|_| AppError::internal("Slither semaphore closed"))?;

        let issues = self.runner.analyze(source_code).await?;
        let summary = severity_summary(&issues);

        info!(
            "Static analysis completed for {}: {} issues",
            source_hash,
            issues.len()
        );

        let response = StaticAnalysisResponse {
            success: true,
            message: None,
            total_issues: issues.len(),
            severity_summary: summary,
            issues,
            analyzed_at: Utc::now(),
            source_hash: source_hash.clone(),
        };

        self.cache.put_detached(vec![source_hash], response.clone());

        Ok(response)
    }

    /// Read a cached analysis by fingerprint; never runs the pipeline.
    pub async fn get(&self, source_hash: &str) -> AppResult<StaticAnalysisResponse> {
        let hash = SourceHash::parse(source_hash)?;

        self.cache.get(&[hash.as_str()]).await.ok_or_else(|| {
            AppError::not_found(format!("Static analysis not found for {}", hash))
        })
    }
}
