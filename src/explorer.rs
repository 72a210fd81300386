//! Block Explorer API Client
//!
//! Fetches verified contract source code and metadata from the explorer's
//! unified multi-chain API. Verified sources arrive in one of three shapes:
//! raw Solidity text, a JSON map of file paths to `{content}`, or the
//! double-brace-wrapped "standard JSON" bundle with a top-level `sources`
//! field. Whatever the shape, callers get back a single canonical source:
//! the main contract file, selected by priority rules.

use crate::domain::{ContractAddress, Network};
use crate::models::errors::{AppError, AppResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

const EXPLORER_API_BASE_URL: &str = "https://api.etherscan.io/v2/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_SIZE: usize = 50 * 1024 * 1024;

/// Library path prefixes that are never the main contract file
const LIBRARY_PREFIXES: [&str; 7] = [
    "@openzeppelin",
    "@chainlink",
    "@uniswap",
    "@aave",
    "@gnosis",
    "@compound",
    "node_modules",
];

/// Verified contract metadata with canonicalised single-file source.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractInfo {
    #[serde(rename = "SourceCode", default)]
    pub source_code: String,
    #[serde(rename = "ContractName", default)]
    pub contract_name: String,
    #[serde(rename = "CompilerVersion", default)]
    pub compiler_version: String,
    #[serde(rename = "LicenseType", default)]
    pub license_type: String,
    #[serde(rename = "Proxy", default)]
    pub proxy: String,
    #[serde(rename = "Implementation", default)]
    pub implementation: String,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    status: String,
    message: String,
    result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SourceFile {
    content: String,
}

/// Block explorer API client with a pooled connection
pub struct ExplorerClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ExplorerClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: EXPLORER_API_BASE_URL.to_string(),
            client: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .pool_max_idle_per_host(10)
                .pool_idle_timeout(Duration::from_secs(30))
                .build()
                .expect("failed to build HTTP client"),
        }
    }

    /// Override the API endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch verified contract details with canonicalised source code.
    pub async fn get_contract_details(
        &self,
        address: &ContractAddress,
        network: Network,
    ) -> AppResult<ContractInfo> {
        let mut info = self.fetch_contract_info(address, network).await?;

        if info.source_code.is_empty() {
            return Err(AppError::not_verified(format!(
                "No verified source code for {} on {}",
                address, network
            )));
        }

        info.source_code = extract_main_source(&info.source_code, &info.contract_name)?;
        Ok(info)
    }

    async fn fetch_contract_info(
        &self,
        address: &ContractAddress,
        network: Network,
    ) -> AppResult<ContractInfo> {
        let url = format!(
            "{}?module=contract&action=getsourcecode&address={}&chainid={}&apikey={}",
            self.base_url,
            address,
            network.chain_id(),
            self.api_key
        );

        info!("🔍 Explorer: fetching source for {} on {}", address, network);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::transport(format!(
                "Explorer API returned status {}",
                response.status()
            )));
        }

        if let Some(len) = response.content_length() {
            if len as usize > MAX_RESPONSE_SIZE {
                return Err(AppError::transport(format!(
                    "Explorer response too large: {} bytes",
                    len
                )));
            }
        }

        let body = response.bytes().await?;
        if body.len() > MAX_RESPONSE_SIZE {
            return Err(AppError::transport(format!(
                "Explorer response too large: {} bytes",
                body.len()
            )));
        }

        let envelope: ApiEnvelope = serde_json::from_slice(&body)?;

        if envelope.status != "1" {
            warn!(
                "Explorer returned status {} for {}: {}",
                envelope.status, address, envelope.message
            );
            return Err(AppError::not_verified(format!(
                "Contract source code not found or not verified: {}",
                envelope.message
            )));
        }

        let mut records: Vec<ContractInfo> = serde_json::from_value(envelope.result)
            .map_err(|e| AppError::parse(format!("Malformed explorer result: {}", e)))?;

        if records.is_empty() {
            return Err(AppError::not_verified(format!(
                "No contract information found for {}",
                address
            )));
        }

        Ok(records.swap_remove(0))
    }
}

/// Extract the canonical single-file source from whatever shape the explorer
/// returned. Raw text passes through unchanged.
pub fn extract_main_source(source_code: &str, contract_name: &str) -> AppResult<String> {
    if source_code.is_empty() {
        return Err(AppError::not_verified("Empty source code"));
    }

    // Raw Solidity text, not a bundle
    if !source_code.starts_with('{') {
        return Ok(source_code.to_string());
    }

    // "Standard JSON" bundles are wrapped in an extra brace pair
    let mut candidate = source_code.to_string();
    if candidate.starts_with("{{") && candidate.ends_with("}}") && candidate.len() >= 4 {
        candidate = candidate[1..candidate.len() - 1].to_string();
    }

    let raw: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&candidate) {
        Ok(map) => map,
        // Not parseable as a bundle after all; treat as raw source
        Err(_) => return Ok(source_code.to_string()),
    };

    let sources: BTreeMap<String, SourceFile> = if let Some(sources_raw) = raw.get("sources") {
        serde_json::from_value(sources_raw.clone())
            .map_err(|e| AppError::parse(format!("Malformed sources bundle: {}", e)))?
    } else {
        // Direct map of file paths to {content}
        raw.into_iter()
            .filter_map(|(path, value)| {
                serde_json::from_value::<SourceFile>(value)
                    .ok()
                    .map(|file| (path, file))
            })
            .collect()
    };

    if sources.is_empty() {
        return Err(AppError::parse("Source bundle contains no files"));
    }

    debug!(
        "📦 Bundle with {} files, selecting main file for {}",
        sources.len(),
        contract_name
    );

    Ok(pick_main_file(&sources, contract_name))
}

/// Select the main contract file from a multi-file bundle.
fn pick_main_file(sources: &BTreeMap<String, SourceFile>, contract_name: &str) -> String {
    let exact_in_contracts = format!("contracts/{}.sol", contract_name);
    let exact_suffix = format!("/{}.sol", contract_name);
    let exact_name = format!("{}.sol", contract_name);

    let patterns: [&dyn Fn(&str) -> bool; 4] = [
        &|path| path.ends_with(&exact_in_contracts),
        &|path| path.ends_with(&exact_suffix) || path == exact_name,
        &|path| path.contains("contracts/") && path.ends_with(".sol") && !is_library_path(path),
        &|path| path.ends_with(".sol") && !is_library_path(path),
    ];

    for pattern in patterns {
        for (path, file) in sources {
            if pattern(path) {
                return file.content.clone();
            }
        }
    }

    // Fallback: first file in the bundle
    sources
        .values()
        .next()
        .map(|file| file.content.clone())
        .unwrap_or_default()
}

fn is_library_path(path: &str) -> bool {
    let lower = path.to_lowercase();
    LIBRARY_PREFIXES.iter().any(|lib| lower.contains(lib))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_source_passes_through() {
        let raw = "pragma solidity ^0.8.0; contract Token {}";
        assert_eq!(extract_main_source(raw, "Token").unwrap(), raw);
    }

    #[test]
    fn test_standard_json_bundle_picks_main_file() {
        let bundle = r#"{{"sources":{"contracts/MyToken.sol":{"content":"pragma solidity ^0.8.0; contract MyToken{}"},"@openzeppelin/contracts/token/ERC20.sol":{"content":"library code"}}}}"#;
        let source = extract_main_source(bundle, "MyToken").unwrap();
        assert_eq!(source, "pragma solidity ^0.8.0; contract MyToken{}");
    }

    #[test]
    fn test_file_map_without_sources_field() {
        let bundle = r#"{"Token.sol":{"content":"contract Token {}"},"Helper.sol":{"content":"contract Helper {}"}}"#;
        let source = extract_main_source(bundle, "Token").unwrap();
        assert_eq!(source, "contract Token {}");
    }

    #[test]
    fn test_library_files_are_skipped() {
        let bundle = r#"{"sources":{"@openzeppelin/contracts/Ownable.sol":{"content":"library"},"src/Vault.sol":{"content":"contract Vault {}"}}}"#;
        let source = extract_main_source(bundle, "Vault").unwrap();
        assert_eq!(source, "contract Vault {}");
    }

    #[test]
    fn test_contracts_dir_preferred_over_other_matches() {
        let bundle = r#"{"sources":{"test/MyToken.sol":{"content":"test copy"},"contracts/MyToken.sol":{"content":"real"}}}"#;
        assert_eq!(extract_main_source(bundle, "MyToken").unwrap(), "real");
    }

    #[test]
    fn test_fallback_to_first_file_when_nothing_matches() {
        let bundle = r#"{"sources":{"@openzeppelin/A.sol":{"content":"a"},"@openzeppelin/B.sol":{"content":"b"}}}"#;
        // BTreeMap keeps paths sorted, so the first bundle entry wins
        assert_eq!(extract_main_source(bundle, "Missing").unwrap(), "a");
    }

    #[test]
    fn test_empty_source_is_not_verified() {
        let err = extract_main_source("", "Token").unwrap_err();
        assert_eq!(err.code_str(), "NOT_VERIFIED");
    }

    #[test]
    fn test_unparseable_brace_text_treated_as_raw() {
        let odd = "{ this is not json";
        assert_eq!(extract_main_source(odd, "Token").unwrap(), odd);
    }
}
