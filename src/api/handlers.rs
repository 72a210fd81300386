//! API Request Handlers

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

use super::types::*;
use crate::domain::Network;
use crate::models::errors::AppError;
use crate::models::responses::{
    ContractResponse, ContractSourceResponse, DynamicAnalysisResponse, StaticAnalysisResponse,
    TestCaseResponse,
};
use crate::services::{
    ContractService, DynamicAnalysisService, StaticAnalysisService, TestCaseService,
};
use crate::slither::SlitherRunner;

/// Shared application state
pub struct AppState {
    pub contracts: ContractService,
    pub static_analysis: StaticAnalysisService,
    pub dynamic_analysis: DynamicAnalysisService,
    pub test_cases: TestCaseService,
    pub runner: Arc<SlitherRunner>,
    pub db: PgPool,
    pub redis: Option<ConnectionManager>,
    pub start_time: Instant,
}

impl AppState {
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type HandlerResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

fn ok<T: serde::Serialize>(data: T, start: Instant) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

fn fail(err: AppError, start: Instant) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!("Request failed: {}", err);
    }
    (
        status,
        Json(ApiResponse::error(
            ApiError::from(&err),
            start.elapsed().as_secs_f64() * 1000.0,
        )),
    )
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let database = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    let cache = match &state.redis {
        Some(redis) => {
            let mut conn = redis.clone();
            redis::cmd("PING")
                .query_async::<_, String>(&mut conn)
                .await
                .is_ok()
        }
        // L1 disabled is not a degradation
        None => true,
    };
    let slither_container = state.runner.is_container_running().await;

    let status = if database && cache && slither_container {
        "healthy"
    } else {
        "degraded"
    };

    let data = HealthData {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        database,
        cache,
        slither_container,
    };

    ok(data, start)
}

// ============================================
// Networks
// ============================================

pub async fn list_networks() -> Json<ApiResponse<Vec<NetworkInfo>>> {
    let start = Instant::now();

    let networks = Network::ALL
        .iter()
        .map(|n| NetworkInfo {
            network: n.as_str().to_string(),
            chain_id: n.chain_id(),
        })
        .collect();

    ok(networks, start)
}

// ============================================
// Contracts
// ============================================

pub async fn get_contract(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> HandlerResult<ContractResponse> {
    let start = Instant::now();

    match state.contracts.get_contract(&address, &query.network).await {
        Ok(contract) => Ok(ok(contract, start)),
        Err(err) => Err(fail(err, start)),
    }
}

pub async fn fetch_contract_source(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(query): Query<NetworkQuery>,
) -> HandlerResult<ContractSourceResponse> {
    let start = Instant::now();

    match state
        .contracts
        .fetch_source_code(&address, &query.network)
        .await
    {
        Ok(source) => Ok(ok(source, start)),
        Err(err) => Err(fail(err, start)),
    }
}

// ============================================
// Static Analysis
// ============================================

pub async fn analyze_static(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StaticAnalysisRequest>,
) -> HandlerResult<StaticAnalysisResponse> {
    let start = Instant::now();

    match state.static_analysis.analyze(&req.source_code).await {
        Ok(analysis) => Ok(ok(analysis, start)),
        Err(err) => Err(fail(err, start)),
    }
}

pub async fn get_static_analysis(
    State(state): State<Arc<AppState>>,
    Path(source_hash): Path<String>,
) -> HandlerResult<StaticAnalysisResponse> {
    let start = Instant::now();

    match state.static_analysis.get(&source_hash).await {
        Ok(analysis) => Ok(ok(analysis, start)),
        Err(err) => Err(fail(err, start)),
    }
}

// ============================================
// Dynamic Analysis
// ============================================

pub async fn analyze_dynamic(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DynamicAnalysisRequest>,
) -> HandlerResult<DynamicAnalysisResponse> {
    let start = Instant::now();

    match state.dynamic_analysis.analyze(&req.source_code).await {
        Ok(analysis) => Ok(ok(analysis, start)),
        Err(err) => Err(fail(err, start)),
    }
}

pub async fn get_dynamic_analysis(
    State(state): State<Arc<AppState>>,
    Path(source_hash): Path<String>,
) -> HandlerResult<DynamicAnalysisResponse> {
    let start = Instant::now();

    match state.dynamic_analysis.get(&source_hash).await {
        Ok(analysis) => Ok(ok(analysis, start)),
        Err(err) => Err(fail(err, start)),
    }
}

// ============================================
// Test Cases
// ============================================

pub async fn generate_test_cases(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TestCaseGenerateRequest>,
) -> HandlerResult<TestCaseResponse> {
    let start = Instant::now();

    match state
        .test_cases
        .generate(&req.source_code, &req.test_framework, &req.test_language)
        .await
    {
        Ok(tests) => Ok(ok(tests, start)),
        Err(err) => Err(fail(err, start)),
    }
}

pub async fn get_test_cases(
    State(state): State<Arc<AppState>>,
    Path(source_hash): Path<String>,
) -> HandlerResult<TestCaseResponse> {
    let start = Instant::now();

    match state.test_cases.get(&source_hash).await {
        Ok(tests) => Ok(ok(tests, start)),
        Err(err) => Err(fail(err, start)),
    }
}
