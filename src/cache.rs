//! Two-Tier Analysis Cache
//!
//! One generic cache serves every artifact kind, parameterised by key
//! prefix, serde and a repository adapter: Redis is the fast L1, the
//! relational repositories are the durable L2. Reads fall through L1 to L2
//! and warm L1 asynchronously on an L2 hit; writes go through to L2 first
//! and then to L1 in a detached task. Cache failures never fail a request:
//! read errors degrade to a miss, write errors are logged and dropped.
//!
//! Detached writes deliberately do not inherit request cancellation - each
//! runs under its own 30-second deadline so a client disconnect cannot lose
//! a freshly computed result.

use crate::entities::Contract;
use crate::models::errors::{AppError, AppResult};
use crate::models::responses::{
    ContractResponse, DynamicAnalysisResponse, StaticAnalysisResponse, TestCaseResponse,
};
use crate::repository::{
    ContractRepository, DynamicAnalysisRepository, GeneratedTestCasesRepository,
    StaticAnalysisRepository,
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Default TTL for L1 entries: 30 minutes
const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
/// Deadline for detached cache writes
const DETACHED_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Cache key prefixes
pub const CONTRACT_PREFIX: &str = "contract";
pub const STATIC_ANALYSIS_PREFIX: &str = "static_analysis";
pub const DYNAMIC_ANALYSIS_PREFIX: &str = "dynamic_analysis";
pub const TEST_CASES_PREFIX: &str = "test_cases";

/// L2 adapter: loads and stores one artifact kind by its natural key parts.
#[async_trait]
pub trait CacheRepository<T>: Send + Sync {
    async fn load(&self, parts: &[&str]) -> AppResult<Option<T>>;
    async fn store(&self, parts: &[&str], value: &T) -> AppResult<()>;
}

/// Generic two-tier cache for one artifact kind.
pub struct TieredCache<T> {
    prefix: &'static str,
    redis: Option<ConnectionManager>,
    repository: Arc<dyn CacheRepository<T>>,
    ttl_secs: u64,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<T> Clone for TieredCache<T> {
    fn clone(&self) -> Self {
        Self {
            prefix: self.prefix,
            redis: self.redis.clone(),
            repository: self.repository.clone(),
            ttl_secs: self.ttl_secs,
            hits: self.hits.clone(),
            misses: self.misses.clone(),
        }
    }
}

impl<T> TieredCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(
        prefix: &'static str,
        redis: Option<ConnectionManager>,
        repository: Arc<dyn CacheRepository<T>>,
    ) -> Self {
        Self {
            prefix,
            redis,
            repository,
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    fn build_key(&self, parts: &[&str]) -> String {
        let mut key = self.prefix.to_string();
        for part in parts {
            key.push(':');
            key.push_str(part);
        }
        key
    }

    /// Read through L1 then L2. A miss is not an error; L1 decode failures
    /// and L2 read failures degrade to a miss.
    pub async fn get(&self, parts: &[&str]) -> Option<T> {
        let key = self.build_key(parts);

        if let Some(redis) = &self.redis {
            let mut conn = redis.clone();
            match conn.get::<_, Option<String>>(&key).await {
                Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                    Ok(value) => {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        info!("✅ CACHE HIT (L1): {}", key);
                        return Some(value);
                    }
                    // A future writer will overwrite; no eviction needed
                    Err(err) => debug!("Undecodable L1 entry for {}: {}", key, err),
                },
                Ok(None) => debug!("📭 L1 miss: {}", key),
                Err(err) => warn!("L1 read failed for {}: {}", key, err),
            }
        }

        match self.repository.load(parts).await {
            Ok(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                info!("✅ CACHE HIT (L2): {}", key);
                self.warm_l1(key, value.clone());
                Some(value)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("📭 CACHE MISS: {}", key);
                None
            }
            Err(err) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                warn!("L2 read failed for {} (treating as miss): {}", key, err);
                None
            }
        }
    }

    /// Write through: L2 first (errors logged and swallowed), then L1 in a
    /// detached task.
    pub async fn put(&self, parts: &[&str], value: &T) {
        let key = self.build_key(parts);

        if let Err(err) = self.repository.store(parts, value).await {
            error!("Failed to persist {} to L2: {}", key, err);
        }

        self.warm_l1(key.clone(), value.clone());
        info!("💾 CACHE SET: {} (TTL: {}s)", key, self.ttl_secs);
    }

    /// Fire-and-forget write with a fresh deadline, decoupled from the
    /// calling request's lifetime.
    pub fn put_detached(&self, parts: Vec<String>, value: T) {
        let cache = self.clone();
        tokio::spawn(async move {
            let borrowed: Vec<&str> = parts.iter().map(|p| p.as_str()).collect();
            if tokio::time::timeout(DETACHED_WRITE_TIMEOUT, cache.put(&borrowed, &value))
                .await
                .is_err()
            {
                warn!(
                    "Detached cache write timed out for {}",
                    cache.build_key(&borrowed)
                );
            }
        });
    }

    fn warm_l1(&self, key: String, value: T) {
        let Some(redis) = self.redis.clone() else {
            return;
        };
        let ttl_secs = self.ttl_secs;

        tokio::spawn(async move {
            let payload = match serde_json::to_string(&value) {
                Ok(payload) => payload,
                Err(err) => {
                    error!("Failed to serialize cache entry {}: {}", key, err);
                    return;
                }
            };

            let mut conn = redis;
            let write = conn.set_ex::<_, _, ()>(&key, payload, ttl_secs);
            match tokio::time::timeout(DETACHED_WRITE_TIMEOUT, write).await {
                Ok(Ok(())) => debug!("🔥 L1 warmed: {}", key),
                Ok(Err(err)) => warn!("L1 write failed for {}: {}", key, err),
                Err(_) => warn!("L1 write timed out for {}", key),
            }
        });
    }

    /// (hits, misses) counters for monitoring
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

// ============================================
// Repository adapters
// ============================================

pub struct ContractCacheRepository {
    repo: ContractRepository,
}

impl ContractCacheRepository {
    pub fn new(repo: ContractRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CacheRepository<ContractResponse> for ContractCacheRepository {
    async fn load(&self, parts: &[&str]) -> AppResult<Option<ContractResponse>> {
        let (address, network) = match parts {
            [address, network] => (*address, *network),
            _ => return Err(AppError::internal("Malformed contract cache key")),
        };

        let contract = self.repo.find_by_address_and_network(address, network).await?;
        Ok(contract.map(|c| ContractResponse {
            address: c.address,
            network: c.network,
            source_code: c.source_code,
            contract_name: c.contract_name,
            compiler_version: c.compiler_version,
            source_hash: c.source_hash,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }))
    }

    async fn store(&self, _parts: &[&str], value: &ContractResponse) -> AppResult<()> {
        let now = chrono::Utc::now();
        let contract = Contract {
            id: Uuid::new_v4(),
            address: value.address.clone(),
            network: value.network.clone(),
            source_code: value.source_code.clone(),
            contract_name: value.contract_name.clone(),
            compiler_version: value.compiler_version.clone(),
            source_hash: value.source_hash.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.repo.upsert(&contract).await
    }
}

pub struct StaticAnalysisCacheRepository {
    repo: StaticAnalysisRepository,
}

impl StaticAnalysisCacheRepository {
    pub fn new(repo: StaticAnalysisRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CacheRepository<StaticAnalysisResponse> for StaticAnalysisCacheRepository {
    async fn load(&self, parts: &[&str]) -> AppResult<Option<StaticAnalysisResponse>> {
        let source_hash = parts
            .first()
            .ok_or_else(|| AppError::internal("Malformed static analysis cache key"))?;

        let row = self.repo.find_by_source_hash(source_hash).await?;
        Ok(row.and_then(|r| serde_json::from_value(r.slither_output).ok()))
    }

    async fn store(&self, parts: &[&str], value: &StaticAnalysisResponse) -> AppResult<()> {
        let source_hash = parts
            .first()
            .ok_or_else(|| AppError::internal("Malformed static analysis cache key"))?;

        let payload = serde_json::to_value(value)?;
        self.repo.upsert(source_hash, &payload).await
    }
}

pub struct DynamicAnalysisCacheRepository {
    repo: DynamicAnalysisRepository,
}

impl DynamicAnalysisCacheRepository {
    pub fn new(repo: DynamicAnalysisRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CacheRepository<DynamicAnalysisResponse> for DynamicAnalysisCacheRepository {
    async fn load(&self, parts: &[&str]) -> AppResult<Option<DynamicAnalysisResponse>> {
        let source_hash = parts
            .first()
            .ok_or_else(|| AppError::internal("Malformed dynamic analysis cache key"))?;

        let row = self.repo.find_by_source_hash(source_hash).await?;
        Ok(row.and_then(|r| serde_json::from_str(&r.llm_response).ok()))
    }

    async fn store(&self, parts: &[&str], value: &DynamicAnalysisResponse) -> AppResult<()> {
        let source_hash = parts
            .first()
            .ok_or_else(|| AppError::internal("Malformed dynamic analysis cache key"))?;

        let payload = serde_json::to_string(value)?;
        self.repo.upsert(source_hash, &payload).await
    }
}

pub struct TestCasesCacheRepository {
    repo: GeneratedTestCasesRepository,
}

impl TestCasesCacheRepository {
    pub fn new(repo: GeneratedTestCasesRepository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl CacheRepository<TestCaseResponse> for TestCasesCacheRepository {
    async fn load(&self, parts: &[&str]) -> AppResult<Option<TestCaseResponse>> {
        let source_hash = parts
            .first()
            .ok_or_else(|| AppError::internal("Malformed test cases cache key"))?;

        let row = self.repo.find_by_source_hash(source_hash).await?;
        Ok(row.map(|r| TestCaseResponse {
            success: true,
            message: None,
            test_code: r.test_code,
            test_framework: r.test_framework,
            test_language: r.test_language,
            file_name: r.file_name,
            source_hash: r.source_hash,
            warnings_and_recommendations: serde_json::from_value(r.warnings_and_recommendations)
                .unwrap_or_default(),
            generated_at: r.updated_at,
        }))
    }

    async fn store(&self, parts: &[&str], value: &TestCaseResponse) -> AppResult<()> {
        let source_hash = parts
            .first()
            .ok_or_else(|| AppError::internal("Malformed test cases cache key"))?;

        let warnings = serde_json::to_value(&value.warnings_and_recommendations)?;
        self.repo
            .upsert(
                source_hash,
                &value.test_code,
                &value.test_framework,
                &value.test_language,
                &value.file_name,
                &warnings,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeRepo {
        rows: Mutex<HashMap<String, String>>,
        fail_reads: bool,
        fail_writes: bool,
    }

    #[async_trait]
    impl CacheRepository<String> for FakeRepo {
        async fn load(&self, parts: &[&str]) -> AppResult<Option<String>> {
            if self.fail_reads {
                return Err(AppError::internal("repo read failure"));
            }
            Ok(self.rows.lock().unwrap().get(parts[0]).cloned())
        }

        async fn store(&self, parts: &[&str], value: &String) -> AppResult<()> {
            if self.fail_writes {
                return Err(AppError::internal("repo write failure"));
            }
            self.rows
                .lock()
                .unwrap()
                .insert(parts[0].to_string(), value.clone());
            Ok(())
        }
    }

    fn cache_with(repo: FakeRepo) -> TieredCache<String> {
        TieredCache::new("unit", None, Arc::new(repo))
    }

    #[test]
    fn test_key_format() {
        let cache = cache_with(FakeRepo::default());
        assert_eq!(cache.build_key(&["0xabc", "ethereum"]), "unit:0xabc:ethereum");
        assert_eq!(cache.build_key(&["deadbeef"]), "unit:deadbeef");
    }

    #[tokio::test]
    async fn test_round_trip_through_l2() {
        let cache = cache_with(FakeRepo::default());
        assert!(cache.get(&["k"]).await.is_none());

        cache.put(&["k"], &"v".to_string()).await;
        assert_eq!(cache.get(&["k"]).await, Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_read_errors_degrade_to_miss() {
        let cache = cache_with(FakeRepo {
            fail_reads: true,
            ..Default::default()
        });
        assert!(cache.get(&["k"]).await.is_none());
    }

    #[tokio::test]
    async fn test_write_errors_are_swallowed() {
        let cache = cache_with(FakeRepo {
            fail_writes: true,
            ..Default::default()
        });
        // Must not panic or propagate
        cache.put(&["k"], &"v".to_string()).await;
        assert!(cache.get(&["k"]).await.is_none());
    }

    #[tokio::test]
    async fn test_detached_put_lands_in_l2() {
        let cache = cache_with(FakeRepo::default());
        cache.put_detached(vec!["k".to_string()], "v".to_string());

        // The detached write races this read; poll briefly
        for _ in 0..50 {
            if cache.get(&["k"]).await.is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("detached write never landed");
    }

    #[tokio::test]
    async fn test_hit_miss_counters() {
        let cache = cache_with(FakeRepo::default());
        cache.get(&["missing"]).await;
        cache.put(&["k"], &"v".to_string()).await;
        cache.get(&["k"]).await;

        let (hits, misses) = cache.stats();
        assert_eq!(hits, 1);
        assert_eq!(misses, 1);
    }
}
