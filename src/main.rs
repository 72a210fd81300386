//! Solaudit API Server
//!
//! Smart-contract security analysis backend.
//!
//! Usage:
//!   cargo run
//!
//! Environment:
//!   HOST / PORT              - Bind address (default: 0.0.0.0:8080)
//!   DATABASE_URL             - Postgres DSN
//!   REDIS_URL                - Redis URL (optional; L1 cache disabled if unset)
//!   ETHERSCAN_API_KEY        - Block explorer API key
//!   GEMINI_API_KEY           - LLM API key
//!   SLITHER_CONTAINER_NAME   - Sidecar container name (default: slither)
//!   WORKSPACE_PATH           - Workspace root inside the container (default: /workspace)
//!   RUST_LOG                 - Log level (default: info)

use redis::aio::ConnectionManager;
use solaudit::api::{create_router, handlers::AppState, start_cleanup_task};
use solaudit::cache::{
    ContractCacheRepository, DynamicAnalysisCacheRepository, StaticAnalysisCacheRepository,
    TestCasesCacheRepository, TieredCache, CONTRACT_PREFIX, DYNAMIC_ANALYSIS_PREFIX,
    STATIC_ANALYSIS_PREFIX, TEST_CASES_PREFIX,
};
use solaudit::config::AppConfig;
use solaudit::explorer::ExplorerClient;
use solaudit::llm::LlmClient;
use solaudit::repository::{
    ContractRepository, DynamicAnalysisRepository, GeneratedTestCasesRepository,
    StaticAnalysisRepository,
};
use solaudit::services::{
    ContractService, DynamicAnalysisService, StaticAnalysisService, TestCaseService,
};
use solaudit::slither::SlitherRunner;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .compact()
        .init();

    print_banner();

    let config = AppConfig::default();

    // L2: Postgres pool + embedded migrations
    let db = PgPoolOptions::new()
        .max_connections(25)
        .min_connections(5)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    info!("🗄️  Connected to Postgres, migrations applied");

    // L1: Redis (optional)
    let redis = match &config.redis_url {
        Some(url) => match redis::Client::open(url.as_str()) {
            Ok(client) => match ConnectionManager::new(client).await {
                Ok(conn) => {
                    info!("⚡ Connected to Redis (L1 cache enabled)");
                    Some(conn)
                }
                Err(err) => {
                    warn!("Redis unavailable, running L2-only: {}", err);
                    None
                }
            },
            Err(err) => {
                warn!("Invalid REDIS_URL, running L2-only: {}", err);
                None
            }
        },
        None => {
            info!("REDIS_URL not set, running L2-only");
            None
        }
    };

    // Repositories
    let contract_repo = ContractRepository::new(db.clone());
    let static_repo = StaticAnalysisRepository::new(db.clone());
    let dynamic_repo = DynamicAnalysisRepository::new(db.clone());
    let test_cases_repo = GeneratedTestCasesRepository::new(db.clone());

    // Two-tier caches, one per artifact kind
    let contract_cache = TieredCache::new(
        CONTRACT_PREFIX,
        redis.clone(),
        Arc::new(ContractCacheRepository::new(contract_repo)),
    );
    let static_cache = TieredCache::new(
        STATIC_ANALYSIS_PREFIX,
        redis.clone(),
        Arc::new(StaticAnalysisCacheRepository::new(static_repo)),
    );
    let dynamic_cache = TieredCache::new(
        DYNAMIC_ANALYSIS_PREFIX,
        redis.clone(),
        Arc::new(DynamicAnalysisCacheRepository::new(dynamic_repo)),
    );
    let test_cases_cache = TieredCache::new(
        TEST_CASES_PREFIX,
        redis.clone(),
        Arc::new(TestCasesCacheRepository::new(test_cases_repo)),
    );

    // External collaborators
    let explorer = Arc::new(ExplorerClient::new(config.explorer_api_key.clone()));
    let llm = Arc::new(LlmClient::new(
        config.llm_api_key.clone(),
        Some(config.llm_model.clone()),
    ));
    let runner = Arc::new(SlitherRunner::new(
        config.slither_container.clone(),
        config.workspace_path.clone(),
    ));

    if !runner.is_container_running().await {
        warn!(
            "⚠️  Slither container '{}' is not running; static analysis will fail until it starts",
            config.slither_container
        );
    }

    // Orchestrator services
    let state = Arc::new(AppState {
        contracts: ContractService::new(explorer, contract_cache),
        static_analysis: StaticAnalysisService::new(
            runner.clone(),
            static_cache.clone(),
            config.slither_max_concurrency,
        ),
        dynamic_analysis: DynamicAnalysisService::new(llm.clone(), dynamic_cache.clone()),
        test_cases: TestCaseService::new(llm, test_cases_cache, static_cache, dynamic_cache),
        runner,
        db,
        redis,
        start_time: Instant::now(),
    });

    start_cleanup_task();

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("🚀 Solaudit API starting on http://{}", addr);
    info!("");
    info!("Endpoints:");
    info!("  GET  /api/v1/contracts/:address              - Read cached contract");
    info!("  GET  /api/v1/contracts/:address/source-code  - Fetch + cache verified source");
    info!("  POST /api/v1/static-analysis                 - Slither analysis");
    info!("  POST /api/v1/dynamic-analysis                - LLM security assessment");
    info!("  POST /api/v1/test-cases/generate             - Generate unit tests");
    info!("  GET  /api/v1/health                          - Liveness");
    info!("");
    info!("Press Ctrl+C for graceful shutdown");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("🛑 Shutdown signal received, draining detached cache writes...");
    // Detached writes carry their own 30s deadline; give them a moment
    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    info!("👋 Solaudit API shutdown complete");

    Ok(())
}

fn print_banner() {
    println!(
        r#"
    ╔══════════════════════════════════════════════════╗
    ║                                                  ║
    ║   S O L A U D I T                                ║
    ║                                                  ║
    ║   Smart Contract Security Analysis API  v0.1.0   ║
    ║   source fetch · slither · llm · test gen        ║
    ║                                                  ║
    ╚══════════════════════════════════════════════════╝
    "#
    );
}
