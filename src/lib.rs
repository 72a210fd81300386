//! Solaudit Library
//!
//! Smart-contract security analysis backend:
//! - Verified source fetching from multi-chain block explorers
//! - Slither static analysis in a sidecar container
//! - LLM-based dynamic security assessment
//! - Unit-test generation informed by both analyses
//!
//! Every artifact is keyed by the SHA-256 fingerprint of its source and
//! served through a two-tier cache (Redis L1, Postgres L2).

pub mod api;
pub mod cache;
pub mod config;
pub mod domain;
pub mod entities;
pub mod explorer;
pub mod fingerprint;
pub mod llm;
pub mod models;
pub mod prompts;
pub mod repository;
pub mod services;
pub mod slither;
pub mod testparse;

pub use config::AppConfig;
pub use domain::{
    CompilerVersion, ContractAddress, Network, SourceHash, TestFramework, TestLanguage,
};
pub use models::errors::{AppError, AppResult, ErrorCode};
