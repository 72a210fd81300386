//! Generative-Model API Client
//!
//! Drives the two LLM-backed operations: the security assessment of a
//! contract source and free-form test-case generation. Requests are retried
//! with linear backoff on transient failures (5xx, 429); other client errors
//! fail immediately. The model responds with free-form text, so the security
//! assessment is decoded from the first `{` to the last `}` of the body.

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_SOURCE_CODE_SIZE: usize = 1024 * 1024;

// ============================================
// Wire format
// ============================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
    #[serde(rename = "safetySettings")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
    role: &'static str,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

// ============================================
// Security assessment
// ============================================

/// Risk classification emitted by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub title: String,
    pub severity: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<serde_json::Value>,
}

/// Structured security assessment decoded from the model's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAssessment {
    #[serde(default)]
    pub contract_name: Option<String>,
    #[serde(default)]
    pub compiler_version: Option<String>,
    pub security_score: i32,
    pub risk_level: RiskLevel,
    pub summary: String,
    #[serde(default)]
    pub vulnerabilities: Vec<Vulnerability>,
    #[serde(default)]
    pub good_practices: serde_json::Value,
    #[serde(default)]
    pub recommendations: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityAnalysis {
    pub success: bool,
    pub analysis: SecurityAssessment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================
// Client
// ============================================

/// Generative-model API client
pub struct LlmClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(api_key: impl Into<String>, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );

        Self {
            api_key: api_key.into(),
            model,
            base_url,
            client: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            max_retries: MAX_RETRIES,
        }
    }

    /// Override the API endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run a security assessment over a contract source.
    pub async fn analyze_security(&self, source_code: &str) -> AppResult<SecurityAnalysis> {
        validate_source_code(source_code)?;

        let prompt = format!("{}{}", prompts::SECURITY_ANALYSIS_PROMPT, source_code);
        let text = self.generate_with_retry(prompt).await?;

        parse_security_analysis(&text)
    }

    /// Generate test cases for a contract, informed by both analyses.
    /// Returns the model's free-form text; parsing is the caller's concern.
    pub async fn generate_test_cases(
        &self,
        source_code: &str,
        test_framework: &str,
        test_language: &str,
        static_context: &str,
        dynamic_context: &str,
    ) -> AppResult<String> {
        validate_source_code(source_code)?;

        let prompt = prompts::build_test_generation_prompt(
            source_code,
            test_framework,
            test_language,
            static_context,
            dynamic_context,
        );

        self.generate_with_retry(prompt).await
    }

    async fn generate_with_retry(&self, prompt: String) -> AppResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
                role: "user",
            }],
            generation_config: GenerationConfig {
                // Low temperature for consistent analysis
                temperature: 0.1,
                max_output_tokens: 4096,
            },
            safety_settings: default_safety_settings(),
        };

        let mut last_err = AppError::internal("LLM request was never attempted");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = RETRY_DELAY * attempt;
                debug!("⏳ LLM retry {} after {:?}", attempt, delay);
                tokio::time::sleep(delay).await;
            }

            match self.generate(&request).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    let retryable = err.code.is_retryable();
                    warn!("LLM request attempt {} failed: {}", attempt + 1, err);
                    last_err = err;
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_err)
    }

    async fn generate(&self, request: &GenerateRequest) -> AppResult<String> {
        let url = format!("{}?key={}", self.base_url, self.api_key);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = extract_error_message(&body)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

            // 5xx and 429 are transient; other 4xx are terminal
            let code = if status.is_server_error() || status.as_u16() == 429 {
                ErrorCode::TransportError
            } else {
                ErrorCode::ProviderError
            };
            return Err(AppError::new(
                code,
                format!("LLM API error (status {}): {}", status.as_u16(), message),
            ));
        }

        let decoded: GenerateResponse = serde_json::from_slice(&body)?;

        if let Some(feedback) = &decoded.prompt_feedback {
            if let Some(reason) = feedback.block_reason.as_deref().filter(|r| !r.is_empty()) {
                return Err(AppError::content_blocked(format!(
                    "Request blocked by safety filter: {}",
                    reason
                )));
            }
        }

        let text = decoded
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::parse("Empty response from LLM API"))?;

        info!("🤖 LLM responded with {} chars", text.len());
        Ok(text)
    }
}

fn validate_source_code(source_code: &str) -> AppResult<()> {
    if source_code.trim().is_empty() {
        return Err(AppError::invalid_input("Source code cannot be empty"));
    }
    if source_code.len() > MAX_SOURCE_CODE_SIZE {
        return Err(AppError::invalid_input(format!(
            "Source code too large (max {} bytes)",
            MAX_SOURCE_CODE_SIZE
        )));
    }
    Ok(())
}

fn default_safety_settings() -> Vec<SafetySetting> {
    [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ]
    .into_iter()
    .map(|category| SafetySetting {
        category,
        threshold: "BLOCK_MEDIUM_AND_ABOVE",
    })
    .collect()
}

fn extract_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Slice the JSON object out of free-form model text: first `{` to last `}`.
pub fn extract_json(text: &str) -> AppResult<&str> {
    let start = text
        .find('{')
        .ok_or_else(|| AppError::parse("No JSON object found in LLM response"))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| AppError::parse("No JSON object found in LLM response"))?;
    if end < start {
        return Err(AppError::parse("Malformed JSON object in LLM response"));
    }
    Ok(&text[start..=end])
}

fn parse_security_analysis(text: &str) -> AppResult<SecurityAnalysis> {
    let json = extract_json(text)?;
    serde_json::from_str(json)
        .map_err(|e| AppError::parse(format!("Failed to decode security analysis: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_wrapped_text() {
        let text = "Here is the audit:\n```json\n{\"success\": true}\n```\nDone.";
        assert_eq!(extract_json(text).unwrap(), "{\"success\": true}");
    }

    #[test]
    fn test_extract_json_missing_braces() {
        assert!(extract_json("no json here").is_err());
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn test_parse_security_analysis() {
        let text = r#"Some preamble.
{
  "success": true,
  "analysis": {
    "contract_name": "EtherStore",
    "security_score": 70,
    "risk_level": "CRITICAL",
    "summary": "Reentrancy in withdraw.",
    "vulnerabilities": [
      {"title": "Reentrancy", "severity": "CRITICAL", "description": "CEI violated."}
    ],
    "good_practices": ["Uses ^0.8.0"],
    "recommendations": []
  }
}"#;
        let parsed = parse_security_analysis(text).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.analysis.security_score, 70);
        assert_eq!(parsed.analysis.risk_level, RiskLevel::Critical);
        assert_eq!(parsed.analysis.vulnerabilities.len(), 1);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_security_analysis("{not valid json}").is_err());
    }

    #[test]
    fn test_risk_level_serde_uppercase() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::High).unwrap(),
            "\"HIGH\""
        );
        assert_eq!(
            serde_json::from_str::<RiskLevel>("\"LOW\"").unwrap(),
            RiskLevel::Low
        );
    }
}
