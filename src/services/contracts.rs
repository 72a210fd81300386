//! Contract Source-Code Service
//!
//! Serves verified contract sources out of the contract cache, falling back
//! to the block explorer on a miss. The fetched contract is cached in a
//! detached write; the caller gets the fresh source immediately with
//! `cached_at` unset.

use crate::cache::TieredCache;
use crate::domain::{CompilerVersion, ContractAddress, Network};
use crate::explorer::ExplorerClient;
use crate::fingerprint;
use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::responses::{ContractResponse, ContractSourceResponse};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

pub struct ContractService {
    explorer: Arc<ExplorerClient>,
    cache: TieredCache<ContractResponse>,
}

impl ContractService {
    pub fn new(explorer: Arc<ExplorerClient>, cache: TieredCache<ContractResponse>) -> Self {
        Self { explorer, cache }
    }

    /// Fetch verified source code, serving from cache when possible.
    pub async fn fetch_source_code(
        &self,
        address: &str,
        network: &str,
    ) -> AppResult<ContractSourceResponse> {
        let address = ContractAddress::parse(address)?;
        let network: Network = network.parse()?;

        if let Some(cached) = self.cache.get(&[address.as_str(), network.as_str()]).await {
            info!("Returning cached source for {} on {}", address, network);
            return Ok(ContractSourceResponse {
                address: cached.address,
                network: cached.network,
                source_code: cached.source_code,
                source_hash: cached.source_hash,
                cached_at: Some(cached.created_at),
            });
        }

        let contract_info = self
            .explorer
            .get_contract_details(&address, network)
            .await
            .map_err(|err| {
                // Unverified contracts are a not-found condition at this boundary
                if err.code == ErrorCode::NotVerified {
                    AppError::not_found(format!(
                        "Contract not found or not verified: {} on {}",
                        address, network
                    ))
                } else {
                    err
                }
            })?;

        let compiler_version = CompilerVersion::parse(&contract_info.compiler_version)?;
        let source_hash = fingerprint::source_hash(&contract_info.source_code);
        let now = Utc::now();

        let response = ContractResponse {
            address: address.to_string(),
            network: network.as_str().to_string(),
            source_code: contract_info.source_code,
            contract_name: contract_info.contract_name,
            compiler_version: compiler_version.to_string(),
            source_hash: source_hash.clone(),
            created_at: now,
            updated_at: now,
        };

        self.cache.put_detached(
            vec![address.to_string(), network.as_str().to_string()],
            response.clone(),
        );

        Ok(ContractSourceResponse {
            address: response.address,
            network: response.network,
            source_code: response.source_code,
            source_hash,
            cached_at: None,
        })
    }

    /// Read an already-cached contract; never reaches out to the explorer.
    pub async fn get_contract(
        &self,
        address: &str,
        network: &str,
    ) -> AppResult<ContractResponse> {
        let address = ContractAddress::parse(address)?;
        let network: Network = network.parse()?;

        self.cache
            .get(&[address.as_str(), network.as_str()])
            .await
            .ok_or_else(|| {
                AppError::not_found(format!(
                    "Contract not found: {} on {}",
                    address, network
                ))
            })
    }
}
