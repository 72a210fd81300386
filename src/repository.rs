//! Durable Persistence (L2)
//!
//! Postgres repositories for the four artifact kinds. Upsert-by-natural-key
//! is the only mutation path: `(address, network)` for contracts and
//! `source_hash` for everything else, so concurrent duplicate computations
//! collapse into one row.

use crate::entities::{Contract, DynamicAnalysis, GeneratedTestCases, StaticAnalysis};
use crate::models::errors::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

// ============================================
// Contracts
// ============================================

#[derive(Clone)]
pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_address_and_network(
        &self,
        address: &str,
        network: &str,
    ) -> AppResult<Option<Contract>> {
        let contract = sqlx::query_as::<_, Contract>(
            "SELECT * FROM contracts
             WHERE address = $1 AND network = $2 AND deleted_at IS NULL",
        )
        .bind(address)
        .bind(network)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contract)
    }

    pub async fn upsert(&self, contract: &Contract) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO contracts
                 (id, address, network, source_code, contract_name, compiler_version, source_hash)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (address, network) DO UPDATE SET
                 source_code = EXCLUDED.source_code,
                 contract_name = EXCLUDED.contract_name,
                 compiler_version = EXCLUDED.compiler_version,
                 source_hash = EXCLUDED.source_hash,
                 updated_at = now()",
        )
        .bind(contract.id)
        .bind(&contract.address)
        .bind(&contract.network)
        .bind(&contract.source_code)
        .bind(&contract.contract_name)
        .bind(&contract.compiler_version)
        .bind(&contract.source_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================
// Static analysis
// ============================================

#[derive(Clone)]
pub struct StaticAnalysisRepository {
    pool: PgPool,
}

impl StaticAnalysisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_source_hash(&self, source_hash: &str) -> AppResult<Option<StaticAnalysis>> {
        let analysis = sqlx::query_as::<_, StaticAnalysis>(
            "SELECT * FROM static_analysis WHERE source_hash = $1",
        )
        .bind(source_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(analysis)
    }

    pub async fn upsert(
        &self,
        source_hash: &str,
        slither_output: &serde_json::Value,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO static_analysis (id, source_hash, slither_output)
             VALUES ($1, $2, $3)
             ON CONFLICT (source_hash) DO UPDATE SET
                 slither_output = EXCLUDED.slither_output,
                 updated_at = now()",
        )
        .bind(Uuid::new_v4())
        .bind(source_hash)
        .bind(slither_output)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================
// Dynamic analysis
// ============================================

#[derive(Clone)]
pub struct DynamicAnalysisRepository {
    pool: PgPool,
}

impl DynamicAnalysisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_source_hash(
        &self,
        source_hash: &str,
    ) -> AppResult<Option<DynamicAnalysis>> {
        let analysis = sqlx::query_as::<_, DynamicAnalysis>(
            "SELECT * FROM dynamic_analysis WHERE source_hash = $1",
        )
        .bind(source_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(analysis)
    }

    pub async fn upsert(&self, source_hash: &str, llm_response: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO dynamic_analysis (id, source_hash, llm_response)
             VALUES ($1, $2, $3)
             ON CONFLICT (source_hash) DO UPDATE SET
                 llm_response = EXCLUDED.llm_response,
                 updated_at = now()",
        )
        .bind(Uuid::new_v4())
        .bind(source_hash)
        .bind(llm_response)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ============================================
// Generated test cases
// ============================================

#[derive(Clone)]
pub struct GeneratedTestCasesRepository {
    pool: PgPool,
}

impl GeneratedTestCasesRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_source_hash(
        &self,
        source_hash: &str,
    ) -> AppResult<Option<GeneratedTestCases>> {
        let tests = sqlx::query_as::<_, GeneratedTestCases>(
            "SELECT * FROM generated_test_cases WHERE source_hash = $1",
        )
        .bind(source_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tests)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn upsert(
        &self,
        source_hash: &str,
        test_code: &str,
        test_framework: &str,
        test_language: &str,
        file_name: &str,
        warnings: &serde_json::Value,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO generated_test_cases
                 (id, source_hash, test_code, test_framework, test_language, file_name,
                  warnings_and_recommendations)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (source_hash) DO UPDATE SET
                 test_code = EXCLUDED.test_code,
                 test_framework = EXCLUDED.test_framework,
                 test_language = EXCLUDED.test_language,
                 file_name = EXCLUDED.file_name,
                 warnings_and_recommendations = EXCLUDED.warnings_and_recommendations,
                 updated_at = now()",
        )
        .bind(Uuid::new_v4())
        .bind(source_hash)
        .bind(test_code)
        .bind(test_framework)
        .bind(test_language)
        .bind(file_name)
        .bind(warnings)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
