//! Test-Case Generation Service
//!
//! Composes both analysis results (when cached; their absence is not fatal)
//! into a test-generation prompt, parses the model's free-form answer and
//! prepends heuristic warnings derived from the analyses.

use crate::cache::TieredCache;
use crate::domain::{SourceHash, TestFramework, TestLanguage};
use crate::fingerprint;
use crate::llm::{LlmClient, RiskLevel};
use crate::models::errors::{AppError, AppResult};
use crate::models::responses::{
    DynamicAnalysisResponse, StaticAnalysisResponse, TestCaseResponse,
};
use crate::testparse;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct TestCaseService {
    llm: Arc<LlmClient>,
    cache: TieredCache<TestCaseResponse>,
    static_cache: TieredCache<StaticAnalysisResponse>,
    dynamic_cache: TieredCache<DynamicAnalysisResponse>,
}

impl TestCaseService {
    pub fn new(
        llm: Arc<LlmClient>,
        cache: TieredCache<TestCaseResponse>,
        static_cache: TieredCache<StaticAnalysisResponse>,
        dynamic_cache: TieredCache<DynamicAnalysisResponse>,
    ) -> Self {
        Self {
            llm,
            cache,
            static_cache,
            dynamic_cache,
        }
    }

    /// Generate unit tests for a source artifact.
    pub async fn generate(
        &self,
        source_code: &str,
        test_framework: &str,
        test_language: &str,
    ) -> AppResult<TestCaseResponse> {
        if source_code.trim().is_empty() {
            return Err(AppError::invalid_input("Source code cannot be empty"));
        }
        let framework: TestFramework = test_framework.parse()?;
        let language: TestLanguage = test_language.parse()?;

        let source_hash = fingerprint::source_hash(source_code);

        if let Some(cached) = self.cache.get(&[&source_hash]).await {
            info!("Returning cached test cases for {}", source_hash);
            return Ok(cached);
        }

        // Opportunistic context: pass whatever analyses are already cached
        let static_result = self.static_cache.get(&[&source_hash]).await;
        let dynamic_result = self.dynamic_cache.get(&[&source_hash]).await;

        let static_context = static_result
            .as_ref()
            .and_then(|r| serde_json::to_string(r).ok())
            .unwrap_or_default();
        let dynamic_context = dynamic_result
            .as_ref()
            .and_then(|r| serde_json::to_string(r).ok())
            .unwrap_or_default();

        let llm_response = self
            .llm
            .generate_test_cases(
                source_code,
                framework.as_str(),
                language.as_str(),
                &static_context,
                &dynamic_context,
            )
            .await?;

        let parsed = testparse::parse_test_response(&llm_response);

        let contract_name = testparse::extract_contract_name(source_code);
        let file_name = format!("{}.test.{}", contract_name, language.extension());

        let mut warnings =
            analysis_warnings(static_result.as_ref(), dynamic_result.as_ref());
        warnings.extend(parsed.warnings);

        info!(
            "Generated test cases for {} ({} chars, {} warnings)",
            contract_name,
            parsed.test_code.len(),
            warnings.len()
        );

        let response = TestCaseResponse {
            success: true,
            message: None,
            test_code: parsed.test_code,
            test_framework: framework.as_str().to_string(),
            test_language: language.as_str().to_string(),
            file_name,
            source_hash: source_hash.clone(),
            warnings_and_recommendations: warnings,
            generated_at: Utc::now(),
        };

        self.cache.put_detached(vec![source_hash], response.clone());

        Ok(response)
    }

    /// Read cached generated tests by fingerprint.
    pub async fn get(&self, source_hash: &str) -> AppResult<TestCaseResponse> {
        let hash = SourceHash::parse(source_hash)?;

        self.cache.get(&[hash.as_str()]).await.ok_or_else(|| {
            AppError::not_found(format!("Generated test cases not found for {}", hash))
        })
    }
}

/// Heuristic warnings derived from whichever analyses were available.
fn analysis_warnings(
    static_result: Option<&StaticAnalysisResponse>,
    dynamic_result: Option<&DynamicAnalysisResponse>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    match static_result.filter(|r| r.success) {
        Some(result) => {
            if result.total_issues > 0 {
                warnings.push(format!(
                    "Static analysis found {} security issues. Ensure your tests cover these vulnerabilities.",
                    result.total_issues
                ));
            }
            if result.severity_summary.high > 0 {
                warnings.push(format!(
                    "Found {} high-severity issues. Priority testing recommended for these vulnerabilities.",
                    result.severity_summary.high
                ));
            }
            if result.severity_summary.medium > 0 {
                warnings.push(format!(
                    "Found {} medium-severity issues. Include edge case testing.",
                    result.severity_summary.medium
                ));
            }
        }
        None => warnings.push(
            "No static analysis data available. Consider running Slither analysis for better security coverage."
                .to_string(),
        ),
    }

    match dynamic_result.filter(|r| r.success) {
        Some(result) => {
            if result.total_issues > 0 {
                warnings.push(format!(
                    "AI security analysis identified {} potential vulnerabilities. Review test coverage for these areas.",
                    result.total_issues
                ));
            }
            match result.analysis.risk_level {
                RiskLevel::Critical | RiskLevel::High => warnings.push(
                    "High risk level detected. Implement comprehensive security testing including access control, reentrancy, and overflow tests."
                        .to_string(),
                ),
                RiskLevel::Medium => warnings.push(
                    "Medium risk level detected. Include boundary testing and input validation tests."
                        .to_string(),
                ),
                RiskLevel::Low => warnings.push(
                    "Low risk level detected. Focus on functionality and edge case testing."
                        .to_string(),
                ),
            }
        }
        None => warnings.push(
            "No AI security analysis data available. Tests will focus on general smart contract best practices."
                .to_string(),
        ),
    }

    warnings.push(
        "Always run tests against multiple scenarios including edge cases and boundary conditions."
            .to_string(),
    );
    warnings.push(
        "Consider using fuzzing and property-based testing for comprehensive coverage.".to_string(),
    );
    warnings.push(
        "Ensure your test environment matches production conditions including gas limits and network conditions."
            .to_string(),
    );

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::SecurityAssessment;
    use crate::slither::SeveritySummary;

    fn static_response(high: usize, medium: usize) -> StaticAnalysisResponse {
        StaticAnalysisResponse {
            success: true,
            message: None,
            issues: Vec::new(),
            total_issues: high + medium,
            severity_summary: SeveritySummary {
                high,
                medium,
                low: 0,
                informational: 0,
            },
            analyzed_at: Utc::now(),
            source_hash: "a".repeat(64),
        }
    }

    fn dynamic_response(risk_level: RiskLevel, total_issues: usize) -> DynamicAnalysisResponse {
        DynamicAnalysisResponse {
            success: true,
            message: None,
            analysis: SecurityAssessment {
                contract_name: None,
                compiler_version: None,
                security_score: 50,
                risk_level,
                summary: String::new(),
                vulnerabilities: Vec::new(),
                good_practices: serde_json::Value::Null,
                recommendations: serde_json::Value::Null,
            },
            total_issues,
            analyzed_at: Utc::now(),
            source_hash: "a".repeat(64),
        }
    }

    #[test]
    fn test_warnings_without_any_analysis() {
        let warnings = analysis_warnings(None, None);
        assert!(warnings[0].contains("No static analysis data available"));
        assert!(warnings[1].contains("No AI security analysis data available"));
        // Always-on advice is still appended
        assert!(warnings.iter().any(|w| w.contains("fuzzing")));
    }

    #[test]
    fn test_warnings_reflect_severity_counts() {
        let static_result = static_response(2, 1);
        let dynamic_result = dynamic_response(RiskLevel::High, 3);
        let warnings = analysis_warnings(Some(&static_result), Some(&dynamic_result));

        assert!(warnings.iter().any(|w| w.contains("3 security issues")));
        assert!(warnings.iter().any(|w| w.contains("2 high-severity")));
        assert!(warnings.iter().any(|w| w.contains("1 medium-severity")));
        assert!(warnings.iter().any(|w| w.contains("3 potential vulnerabilities")));
        assert!(warnings.iter().any(|w| w.contains("High risk level detected")));
    }

    #[test]
    fn test_low_risk_message() {
        let dynamic_result = dynamic_response(RiskLevel::Low, 0);
        let warnings = analysis_warnings(None, Some(&dynamic_result));
        assert!(warnings.iter().any(|w| w.contains("Low risk level detected")));
    }
}
