//! Domain value types
//!
//! Smart constructors that validate once and yield opaque typed values.
//! Entities never hold unvalidated strings after construction.

use crate::models::errors::{AppError, AppResult};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref ADDRESS_RE: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
    static ref SOURCE_HASH_RE: Regex = Regex::new(r"^[0-9a-fA-F]{64}$").unwrap();
}

// ============================================
// Contract address
// ============================================

/// Validated EVM contract address, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(String);

impl ContractAddress {
    pub fn parse(raw: &str) -> AppResult<Self> {
        if !ADDRESS_RE.is_match(raw) {
            return Err(AppError::invalid_input(format!(
                "Invalid contract address: {}",
                raw
            )));
        }
        Ok(Self(raw.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================
// Network
// ============================================

/// Supported blockchain networks with their explorer chain IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Polygon,
    Bsc,
    Base,
    Arbitrum,
    Avalanche,
    Optimism,
    Gnosis,
    Fantom,
    Celo,
}

impl Network {
    pub const ALL: [Network; 10] = [
        Network::Ethereum,
        Network::Polygon,
        Network::Bsc,
        Network::Base,
        Network::Arbitrum,
        Network::Avalanche,
        Network::Optimism,
        Network::Gnosis,
        Network::Fantom,
        Network::Celo,
    ];

    /// Explorer chain ID used in API query parameters
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Polygon => 137,
            Network::Bsc => 56,
            Network::Base => 8453,
            Network::Arbitrum => 42161,
            Network::Avalanche => 43114,
            Network::Optimism => 10,
            Network::Gnosis => 100,
            Network::Fantom => 250,
            Network::Celo => 42220,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Polygon => "polygon",
            Network::Bsc => "bsc",
            Network::Base => "base",
            Network::Arbitrum => "arbitrum",
            Network::Avalanche => "avalanche",
            Network::Optimism => "optimism",
            Network::Gnosis => "gnosis",
            Network::Fantom => "fantom",
            Network::Celo => "celo",
        }
    }
}

impl FromStr for Network {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ethereum" => Ok(Network::Ethereum),
            "polygon" => Ok(Network::Polygon),
            "bsc" => Ok(Network::Bsc),
            "base" => Ok(Network::Base),
            "arbitrum" => Ok(Network::Arbitrum),
            "avalanche" => Ok(Network::Avalanche),
            "optimism" => Ok(Network::Optimism),
            "gnosis" => Ok(Network::Gnosis),
            "fantom" => Ok(Network::Fantom),
            "celo" => Ok(Network::Celo),
            other => Err(AppError::unsupported_network(other)),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================
// Source hash
// ============================================

/// Validated source fingerprint: 64 lowercase hex chars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceHash(String);

impl SourceHash {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if !SOURCE_HASH_RE.is_match(trimmed) {
            return Err(AppError::invalid_input(format!(
                "Invalid source hash: {}",
                raw
            )));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================
// Compiler version
// ============================================

/// Compiler version string as reported by the explorer,
/// e.g. `v0.8.7+commit.e28d00a7`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerVersion(String);

impl CompilerVersion {
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > 50 {
            return Err(AppError::parse(format!(
                "Invalid compiler version: {:?}",
                raw
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================
// Test framework / language
// ============================================

/// Supported test frameworks for generated test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestFramework {
    Hardhat,
    Truffle,
    Foundry,
    Brownie,
}

impl TestFramework {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestFramework::Hardhat => "hardhat",
            TestFramework::Truffle => "truffle",
            TestFramework::Foundry => "foundry",
            TestFramework::Brownie => "brownie",
        }
    }
}

impl FromStr for TestFramework {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hardhat" => Ok(TestFramework::Hardhat),
            "truffle" => Ok(TestFramework::Truffle),
            "foundry" => Ok(TestFramework::Foundry),
            "brownie" => Ok(TestFramework::Brownie),
            other => Err(AppError::invalid_input(format!(
                "Unsupported test framework: {}",
                other
            ))),
        }
    }
}

/// Supported test languages with their file extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestLanguage {
    JavaScript,
    TypeScript,
    Solidity,
    Python,
}

impl TestLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestLanguage::JavaScript => "javascript",
            TestLanguage::TypeScript => "typescript",
            TestLanguage::Solidity => "solidity",
            TestLanguage::Python => "python",
        }
    }

    /// File extension for generated test files
    pub fn extension(&self) -> &'static str {
        match self {
            TestLanguage::JavaScript => "js",
            TestLanguage::TypeScript => "ts",
            TestLanguage::Solidity => "sol",
            TestLanguage::Python => "py",
        }
    }
}

impl FromStr for TestLanguage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "javascript" | "js" => Ok(TestLanguage::JavaScript),
            "typescript" | "ts" => Ok(TestLanguage::TypeScript),
            "solidity" | "sol" => Ok(TestLanguage::Solidity),
            "python" | "py" => Ok(TestLanguage::Python),
            other => Err(AppError::invalid_input(format!(
                "Unsupported test language: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_address_accepts_checksummed_and_normalizes() {
        let addr = ContractAddress::parse("0xdAC17F958D2ee523a2206206994597C13D831ec7").unwrap();
        assert_eq!(addr.as_str(), "0xdac17f958d2ee523a2206206994597c13d831ec7");
    }

    #[test]
    fn test_address_rejects_malformed() {
        assert!(ContractAddress::parse("dac17f958d2ee523a2206206994597c13d831ec7").is_err());
        assert!(ContractAddress::parse("0x1234").is_err());
        assert!(ContractAddress::parse("0xZZC17F958D2ee523a2206206994597C13D831ec7").is_err());
        assert!(ContractAddress::parse("").is_err());
    }

    proptest! {
        #[test]
        fn prop_address_validator_matches_pattern(raw in "\\PC*") {
            let expected = raw.len() == 42
                && raw.starts_with("0x")
                && raw[2..].chars().all(|c| c.is_ascii_hexdigit());
            prop_assert_eq!(ContractAddress::parse(&raw).is_ok(), expected);
        }
    }

    #[test]
    fn test_network_chain_ids() {
        assert_eq!(Network::Ethereum.chain_id(), 1);
        assert_eq!(Network::Polygon.chain_id(), 137);
        assert_eq!(Network::Base.chain_id(), 8453);
        assert_eq!(Network::Celo.chain_id(), 42220);
    }

    #[test]
    fn test_network_round_trip() {
        for network in Network::ALL {
            assert_eq!(network.as_str().parse::<Network>().unwrap(), network);
        }
        assert!("solana".parse::<Network>().is_err());
    }

    #[test]
    fn test_source_hash_normalizes_case() {
        let hash = SourceHash::parse(
            "E3B0C44298FC1C149AFBF4C8996FB92427AE41E4649B934CA495991B7852B855",
        )
        .unwrap();
        assert_eq!(
            hash.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert!(SourceHash::parse("abc123").is_err());
    }

    #[test]
    fn test_compiler_version() {
        let version = CompilerVersion::parse(" v0.8.7+commit.e28d00a7 ").unwrap();
        assert_eq!(version.as_str(), "v0.8.7+commit.e28d00a7");
        assert!(CompilerVersion::parse("").is_err());
        assert!(CompilerVersion::parse(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_language_aliases() {
        assert_eq!("ts".parse::<TestLanguage>().unwrap(), TestLanguage::TypeScript);
        assert_eq!("sol".parse::<TestLanguage>().unwrap(), TestLanguage::Solidity);
        assert_eq!(TestLanguage::Python.extension(), "py");
        assert!("rust".parse::<TestLanguage>().is_err());
    }

    #[test]
    fn test_framework_parsing() {
        assert_eq!("Hardhat".parse::<TestFramework>().unwrap(), TestFramework::Hardhat);
        assert!("jest".parse::<TestFramework>().is_err());
    }
}
