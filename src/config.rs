//! Configuration module
//! All knobs come from environment variables with sensible defaults.

use std::time::Duration;

/// Application configuration, resolved once at startup and passed by wiring.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP bind host
    pub host: String,
    /// HTTP bind port
    pub port: u16,

    /// Postgres DSN (L2 durable store)
    pub database_url: String,
    /// Redis URL (L1 cache); empty disables the L1 tier
    pub redis_url: Option<String>,

    /// Block explorer API key
    pub explorer_api_key: String,
    /// LLM API key
    pub llm_api_key: String,
    /// LLM model identifier
    pub llm_model: String,

    /// Name of the long-lived Slither sidecar container
    pub slither_container: String,
    /// Workspace root inside the container
    pub workspace_path: String,
    /// Bound on concurrent Slither runs
    pub slither_max_concurrency: usize,

    /// Per-request deadline for explorer and LLM calls
    pub upstream_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/solaudit".to_string()),
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.is_empty()),
            explorer_api_key: std::env::var("ETHERSCAN_API_KEY").unwrap_or_default(),
            llm_api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            llm_model: std::env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            slither_container: std::env::var("SLITHER_CONTAINER_NAME")
                .unwrap_or_else(|_| "slither".to_string()),
            workspace_path: std::env::var("WORKSPACE_PATH")
                .unwrap_or_else(|_| "/workspace".to_string()),
            slither_max_concurrency: std::env::var("SLITHER_MAX_CONCURRENCY")
                .ok()
                .and_then(|n| n.parse().ok())
                .unwrap_or(4),
            upstream_timeout: Duration::from_secs(30),
        }
    }
}
