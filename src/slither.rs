//! Slither Static Analysis Runner
//!
//! Drives the Slither pipeline against a long-lived sidecar container:
//!
//! stage host dir -> docker cp -> npm install -> detect solc version
//!   -> run slither (5 min deadline) -> parse JSON -> async cleanup
//!
//! Concurrent analyses are isolated by a per-request UUID workspace inside
//! the shared container. Slither signals findings via a nonzero exit code,
//! so the exit code is treated as informational: the JSON on stdout is the
//! ground truth.

use crate::models::errors::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(300);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(180);
const COPY_TIMEOUT: Duration = Duration::from_secs(60);
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_DESCRIPTION_LENGTH: usize = 200;
const DEFAULT_SOLC_VERSION: &str = "0.8.20";

lazy_static! {
    static ref PRAGMA_VERSION_RE: Regex =
        Regex::new(r"pragma\s+solidity\s+[^\d]*(\d+\.\d+)").unwrap();
}

// ============================================
// Report types
// ============================================

/// One finding mapped from a Slither detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlitherIssue {
    #[serde(rename = "type")]
    pub issue_type: String,
    pub title: String,
    pub description: String,
    pub severity: String,
    pub confidence: String,
    pub location: String,
    pub reference: String,
}

/// Issue counts by severity. Severities outside HIGH/MEDIUM/LOW count as
/// informational, so the four buckets always sum to the issue total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub informational: usize,
}

// ============================================
// Slither JSON schema
// ============================================

#[derive(Debug, Deserialize)]
struct SlitherJson {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    results: SlitherResults,
}

#[derive(Debug, Default, Deserialize)]
struct SlitherResults {
    #[serde(default)]
    detectors: Vec<Detector>,
}

#[derive(Debug, Deserialize)]
struct Detector {
    #[serde(default)]
    check: String,
    #[serde(default)]
    impact: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(rename = "first_markdown_element", default)]
    reference: String,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(default)]
    source_mapping: SourceMapping,
}

#[derive(Debug, Default, Deserialize)]
struct SourceMapping {
    #[serde(default)]
    lines: Vec<u64>,
}

// ============================================
// Runner
// ============================================

/// Slither pipeline runner against a named sidecar container.
pub struct SlitherRunner {
    container_name: String,
    workspace_path: String,
}

impl SlitherRunner {
    pub fn new(container_name: impl Into<String>, workspace_path: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            workspace_path: workspace_path.into(),
        }
    }

    /// Probe whether the sidecar container is running.
    pub async fn is_container_running(&self) -> bool {
        match run_command(
            "docker",
            &["inspect", "-f", "{{.State.Running}}", &self.container_name],
            Duration::from_secs(10),
        )
        .await
        {
            Ok((stdout, _, 0)) => stdout.trim() == "true",
            Ok(_) => false,
            Err(err) => {
                error!("Failed to check container status: {}", err);
                false
            }
        }
    }

    /// Run the full pipeline for one source artifact and return its issues.
    pub async fn analyze(&self, source: &str) -> AppResult<Vec<SlitherIssue>> {
        if !self.is_container_running().await {
            return Err(AppError::runner_unavailable(format!(
                "Slither container '{}' is not running",
                self.container_name
            )));
        }

        let analysis_id = Uuid::new_v4().to_string();
        info!("🔬 Starting static analysis {}", analysis_id);

        let host_dir = self.stage_workspace(&analysis_id, source).await?;
        let container_dir = format!(
            "{}/{}",
            self.workspace_path.trim_end_matches('/'),
            analysis_id
        );

        let result = self.run_pipeline(&host_dir, &container_dir).await;

        // Host staging dir goes away on every exit path; container cleanup is
        // detached and best-effort.
        if let Err(err) = tokio::fs::remove_dir_all(&host_dir).await {
            warn!("Failed to remove host workspace {:?}: {}", host_dir, err);
        }
        self.spawn_container_cleanup(container_dir);

        result
    }

    async fn run_pipeline(
        &self,
        host_dir: &Path,
        container_dir: &str,
    ) -> AppResult<Vec<SlitherIssue>> {
        self.copy_into_container(host_dir).await?;
        self.install_dependencies(container_dir).await?;

        let solc_version = self.detect_solidity_version(container_dir).await;
        let output = self.run_slither(container_dir, &solc_version).await?;

        Ok(parse_slither_output(&output))
    }

    /// Create `<tmp>/<analysis_id>/` holding `Contract.sol` and a
    /// `package.json` declaring the common dependency libraries.
    async fn stage_workspace(&self, analysis_id: &str, source: &str) -> AppResult<PathBuf> {
        let host_dir = std::env::temp_dir().join(analysis_id);
        tokio::fs::create_dir_all(&host_dir).await?;

        let contract_file = host_dir.join("Contract.sol");
        tokio::fs::write(&contract_file, source).await?;
        tokio::fs::write(host_dir.join("package.json"), package_json()).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&host_dir, std::fs::Permissions::from_mode(0o755)).await?;
            tokio::fs::set_permissions(&contract_file, std::fs::Permissions::from_mode(0o644))
                .await?;
        }

        Ok(host_dir)
    }

    async fn copy_into_container(&self, host_dir: &Path) -> AppResult<()> {
        let target = format!("{}:{}", self.container_name, self.workspace_path);
        let host = host_dir.to_string_lossy();

        let (_, stderr, code) =
            run_command("docker", &["cp", &host, &target], COPY_TIMEOUT).await?;

        if code != 0 {
            return Err(AppError::runner(format!(
                "Failed to copy workspace into container: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn install_dependencies(&self, container_dir: &str) -> AppResult<()> {
        let script = format!("cd {} && npm install", container_dir);
        let (_, stderr, code) = run_command(
            "docker",
            &["exec", &self.container_name, "bash", "-c", &script],
            INSTALL_TIMEOUT,
        )
        .await?;

        if code != 0 {
            return Err(AppError::runner(format!(
                "Dependency install failed: {}",
                stderr.trim()
            )));
        }
        debug!("📦 npm install completed in {}", container_dir);
        Ok(())
    }

    /// Read the first 1 KiB of the staged contract and map its pragma to a
    /// pinned solc patch release. Defaults to 0.8.20 when unsure.
    async fn detect_solidity_version(&self, container_dir: &str) -> String {
        let contract_path = format!("{}/Contract.sol", container_dir);
        let head = match run_command(
            "docker",
            &["exec", &self.container_name, "head", "-c", "1024", &contract_path],
            Duration::from_secs(10),
        )
        .await
        {
            Ok((stdout, _, 0)) => stdout,
            _ => return DEFAULT_SOLC_VERSION.to_string(),
        };

        let version = resolve_solc_version(&head);
        info!("🧭 Detected Solidity version: {}", version);
        version
    }

    async fn run_slither(&self, container_dir: &str, solc_version: &str) -> AppResult<String> {
        let script = format!(
            "cd {} && slither Contract.sol --solc-remaps '@openzeppelin=node_modules/@openzeppelin' --solc-solcs-select {} --json -",
            container_dir, solc_version
        );

        info!("🐍 Executing Slither in {}", container_dir);

        let (stdout, stderr, code) = run_command(
            "docker",
            &["exec", &self.container_name, "bash", "-c", &script],
            ANALYSIS_TIMEOUT,
        )
        .await?;

        let mut output = stdout;
        if output.is_empty() && !stderr.is_empty() {
            output = stderr.clone();
        }

        if code != 0 {
            // Slither exits nonzero when it finds issues; the JSON body is
            // the ground truth.
            if !output.is_empty()
                && (output.contains(r#""success": true"#) || output.contains(r#""results""#))
            {
                info!("Slither completed with findings (exit code {})", code);
                return Ok(output);
            }

            return Err(AppError::runner(format!(
                "Slither execution failed (exit code {}): {}",
                code,
                stderr.trim()
            )));
        }

        Ok(output)
    }

    fn spawn_container_cleanup(&self, container_dir: String) {
        let container_name = self.container_name.clone();
        tokio::spawn(async move {
            let result = run_command(
                "docker",
                &["exec", &container_name, "rm", "-rf", &container_dir],
                CLEANUP_TIMEOUT,
            )
            .await;

            match result {
                Ok((_, _, 0)) => debug!("🧹 Cleaned container workspace {}", container_dir),
                Ok((_, stderr, code)) => warn!(
                    "Container cleanup exited {} for {}: {}",
                    code,
                    container_dir,
                    stderr.trim()
                ),
                Err(err) => warn!("Container cleanup failed for {}: {}", container_dir, err),
            }
        });
    }
}

fn package_json() -> &'static str {
    r#"{
  "name": "slither-analysis",
  "version": "1.0.0",
  "dependencies": {
    "@openzeppelin/contracts": "^4.9.0",
    "@openzeppelin/contracts-upgradeable": "^4.9.0",
    "@chainlink/contracts": "^0.6.1",
    "@uniswap/v2-core": "^1.0.1",
    "@uniswap/v3-core": "^1.0.0",
    "@aave/protocol-v2": "^1.0.0",
    "@aave/core-v3": "^1.16.2"
  }
}
"#
}

/// Map a pragma's major.minor to a pinned patch release.
fn resolve_solc_version(source_head: &str) -> String {
    let captured = match PRAGMA_VERSION_RE
        .captures(source_head)
        .and_then(|caps| caps.get(1))
    {
        Some(m) => m.as_str(),
        None => return DEFAULT_SOLC_VERSION.to_string(),
    };

    match captured {
        "0.8" => "0.8.20",
        "0.7" => "0.7.6",
        "0.6" => "0.6.12",
        "0.5" => "0.5.16",
        _ => DEFAULT_SOLC_VERSION,
    }
    .to_string()
}

// ============================================
// Output parsing
// ============================================

/// Decode Slither's JSON output into issues. A run that produced no
/// parseable JSON, or reported `success != true`, yields an empty list:
/// that is a successful run with no detectors, not an error.
pub fn parse_slither_output(output: &str) -> Vec<SlitherIssue> {
    let decoded: SlitherJson = match serde_json::from_str(output) {
        Ok(decoded) => decoded,
        Err(err) => {
            warn!("Failed to parse Slither JSON output: {}", err);
            return Vec::new();
        }
    };

    if !decoded.success {
        return Vec::new();
    }

    decoded
        .results
        .detectors
        .into_iter()
        .map(|detector| SlitherIssue {
            issue_type: "detector".to_string(),
            title: format_title(&detector.check),
            description: clean_description(&detector.description),
            severity: detector.impact.to_uppercase(),
            confidence: detector.confidence,
            location: format_location(&detector.elements),
            reference: detector.reference,
        })
        .collect()
}

/// Aggregate issue counts by severity.
pub fn severity_summary(issues: &[SlitherIssue]) -> SeveritySummary {
    let mut summary = SeveritySummary::default();
    for issue in issues {
        match issue.severity.as_str() {
            "HIGH" => summary.high += 1,
            "MEDIUM" => summary.medium += 1,
            "LOW" => summary.low += 1,
            _ => summary.informational += 1,
        }
    }
    summary
}

/// `reentrancy-eth` -> `Reentrancy Eth`
fn format_title(check: &str) -> String {
    check
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse whitespace and truncate to 200 chars with an ellipsis.
fn clean_description(description: &str) -> String {
    let cleaned = description.replace("\\n", " ").replace("\\t", " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if cleaned.chars().count() > MAX_DESCRIPTION_LENGTH {
        let truncated: String = cleaned.chars().take(MAX_DESCRIPTION_LENGTH - 3).collect();
        format!("{}...", truncated)
    } else {
        cleaned
    }
}

/// Location from the first element's source mapping:
/// `""`, `Contract.sol:L14` or `Contract.sol:L14-L20`.
fn format_location(elements: &[Element]) -> String {
    let lines = match elements.first() {
        Some(element) if !element.source_mapping.lines.is_empty() => &element.source_mapping.lines,
        _ => return String::new(),
    };

    let first = lines[0];
    let last = lines[lines.len() - 1];

    if first == last {
        format!("Contract.sol:L{}", first)
    } else {
        format!("Contract.sol:L{}-L{}", first, last)
    }
}

// ============================================
// Process execution
// ============================================

/// Run a host command with a deadline, capturing stdout/stderr and exit code.
async fn run_command(
    cmd: &str,
    args: &[&str],
    deadline: Duration,
) -> AppResult<(String, String, i32)> {
    let result = timeout(deadline, Command::new(cmd).args(args).output()).await;

    match result {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let code = output.status.code().unwrap_or(-1);
            Ok((stdout, stderr, code))
        }
        Ok(Err(err)) => Err(AppError::runner(format!(
            "Failed to execute {}: {}",
            cmd, err
        ))),
        Err(_) => Err(AppError::runner(format!(
            "{} timed out after {:?}",
            cmd, deadline
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output_with_findings() {
        let output = r#"{"success":true,"results":{"detectors":[{"check":"reentrancy-eth","impact":"High","confidence":"Medium","description":"Reentrancy in withdraw","elements":[{"source_mapping":{"lines":[14,15,16,17,18,19,20]}}],"first_markdown_element":"Contract.sol#L14"}]}}"#;

        let issues = parse_slither_output(output);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].title, "Reentrancy Eth");
        assert_eq!(issues[0].severity, "HIGH");
        assert_eq!(issues[0].location, "Contract.sol:L14-L20");
        assert_eq!(issues[0].reference, "Contract.sol#L14");

        let summary = severity_summary(&issues);
        assert_eq!(summary.high, 1);
        assert_eq!(summary.medium, 0);
        assert_eq!(summary.low, 0);
        assert_eq!(summary.informational, 0);
    }

    #[test]
    fn test_parse_output_no_findings() {
        let issues = parse_slither_output(r#"{"success":true,"results":{"detectors":[]}}"#);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_parse_unsuccessful_or_garbage_is_empty() {
        assert!(parse_slither_output(r#"{"success":false,"results":{"detectors":[]}}"#).is_empty());
        assert!(parse_slither_output("Traceback (most recent call last): ...").is_empty());
        assert!(parse_slither_output("").is_empty());
    }

    #[test]
    fn test_severity_counts_sum_to_total() {
        let output = r#"{"success":true,"results":{"detectors":[
            {"check":"a","impact":"High","confidence":"High","description":"x","elements":[],"first_markdown_element":""},
            {"check":"b","impact":"Medium","confidence":"High","description":"x","elements":[],"first_markdown_element":""},
            {"check":"c","impact":"Low","confidence":"High","description":"x","elements":[],"first_markdown_element":""},
            {"check":"d","impact":"Informational","confidence":"High","description":"x","elements":[],"first_markdown_element":""},
            {"check":"e","impact":"Optimization","confidence":"High","description":"x","elements":[],"first_markdown_element":""}
        ]}}"#;

        let issues = parse_slither_output(output);
        let summary = severity_summary(&issues);
        assert_eq!(
            summary.high + summary.medium + summary.low + summary.informational,
            issues.len()
        );
        assert_eq!(summary.informational, 2);
    }

    #[test]
    fn test_location_single_line() {
        let output = r#"{"success":true,"results":{"detectors":[{"check":"x","impact":"Low","confidence":"High","description":"y","elements":[{"source_mapping":{"lines":[42]}}],"first_markdown_element":""}]}}"#;
        assert_eq!(parse_slither_output(output)[0].location, "Contract.sol:L42");
    }

    #[test]
    fn test_location_empty_elements() {
        let output = r#"{"success":true,"results":{"detectors":[{"check":"x","impact":"Low","confidence":"High","description":"y","elements":[],"first_markdown_element":""}]}}"#;
        assert_eq!(parse_slither_output(output)[0].location, "");
    }

    #[test]
    fn test_description_cleanup_and_truncation() {
        let long = format!("word\\n\\t{}", "a".repeat(300));
        let cleaned = clean_description(&long);
        assert!(cleaned.starts_with("word a"));
        assert_eq!(cleaned.chars().count(), MAX_DESCRIPTION_LENGTH);
        assert!(cleaned.ends_with("..."));
    }

    #[test]
    fn test_title_formatting() {
        assert_eq!(format_title("reentrancy-eth"), "Reentrancy Eth");
        assert_eq!(format_title("unchecked-lowlevel"), "Unchecked Lowlevel");
        assert_eq!(format_title("shadowing"), "Shadowing");
    }

    #[test]
    fn test_resolve_solc_version() {
        assert_eq!(resolve_solc_version("pragma solidity ^0.8.19;"), "0.8.20");
        assert_eq!(resolve_solc_version("pragma solidity >=0.7.0 <0.9.0;"), "0.7.6");
        assert_eq!(resolve_solc_version("pragma solidity 0.6.12;"), "0.6.12");
        assert_eq!(resolve_solc_version("pragma solidity ^0.5.0;"), "0.5.16");
        assert_eq!(resolve_solc_version("no pragma here"), "0.8.20");
        assert_eq!(resolve_solc_version("pragma solidity ^0.4.24;"), "0.8.20");
    }
}
