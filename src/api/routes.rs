//! API Route Configuration

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{self, AppState};
use super::middleware::{auth_middleware, logging_middleware, rate_limit_middleware};

/// Create the API router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API v1 routes
    let api_v1 = Router::new()
        // Health & Networks
        .route("/health", get(handlers::health_check))
        .route("/networks", get(handlers::list_networks))
        // Contracts
        .route("/contracts/:address", get(handlers::get_contract))
        .route(
            "/contracts/:address/source-code",
            get(handlers::fetch_contract_source),
        )
        // Static analysis (Slither)
        .route("/static-analysis", post(handlers::analyze_static))
        .route(
            "/static-analysis/:source_hash",
            get(handlers::get_static_analysis),
        )
        // Dynamic analysis (LLM)
        .route("/dynamic-analysis", post(handlers::analyze_dynamic))
        .route(
            "/dynamic-analysis/:source_hash",
            get(handlers::get_dynamic_analysis),
        )
        // Test generation
        .route("/test-cases/generate", post(handlers::generate_test_cases))
        .route("/test-cases/:source_hash", get(handlers::get_test_cases));

    // Build full router
    Router::new()
        .nest("/api/v1", api_v1)
        // Also expose health at root for convenience
        .route("/health", get(handlers::health_check))
        .with_state(state)
        // Middleware (order matters - bottom runs first)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(rate_limit_middleware))
        .layer(middleware::from_fn(auth_middleware))
}
