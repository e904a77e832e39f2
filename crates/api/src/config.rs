use std::str::FromStr;

use mira_core::rating::{
    RatingConfig, DEFAULT_BETA, DEFAULT_EXPLOITATION_WINDOW, DEFAULT_EXPLORATION_FRACTION,
    DEFAULT_INITIAL_MU, DEFAULT_INITIAL_SIGMA, DEFAULT_KAPPA, DEFAULT_ORDINAL_K,
    DEFAULT_SIGMA_FLOOR, DEFAULT_TARGET_SIGMA,
};

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for the database pool to close (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Maximum pooled database connections (default: `20`).
    pub db_max_connections: u32,
    /// Rating model and pair selection parameters.
    pub ranking: RatingConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DB_MAX_CONNECTIONS`   | `20`                       |
    ///
    /// Ranking parameters are read by [`ranking_config_from_env`].
    ///
    /// Panics on unparsable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 20),
            ranking: ranking_config_from_env(),
        }
    }
}

/// Load the rating parameters from `RANKING_*` environment variables.
///
/// | Env Var                        | Default |
/// |--------------------------------|---------|
/// | `RANKING_INITIAL_MU`           | `0.0`   |
/// | `RANKING_INITIAL_SIGMA`        | `1.0`   |
/// | `RANKING_BETA`                 | `0.5`   |
/// | `RANKING_KAPPA`                | `0.0001`|
/// | `RANKING_SIGMA_FLOOR`          | `0.05`  |
/// | `RANKING_TARGET_SIGMA`         | `0.5`   |
/// | `RANKING_ORDINAL_K`            | `3.0`   |
/// | `RANKING_EXPLORATION_FRACTION` | `0.5`   |
/// | `RANKING_EXPLOITATION_WINDOW`  | `5`     |
///
/// Panics if a value does not parse or the combination is inconsistent.
pub fn ranking_config_from_env() -> RatingConfig {
    let config = RatingConfig {
        initial_mu: env_or("RANKING_INITIAL_MU", DEFAULT_INITIAL_MU),
        initial_sigma: env_or("RANKING_INITIAL_SIGMA", DEFAULT_INITIAL_SIGMA),
        beta: env_or("RANKING_BETA", DEFAULT_BETA),
        kappa: env_or("RANKING_KAPPA", DEFAULT_KAPPA),
        sigma_floor: env_or("RANKING_SIGMA_FLOOR", DEFAULT_SIGMA_FLOOR),
        target_sigma: env_or("RANKING_TARGET_SIGMA", DEFAULT_TARGET_SIGMA),
        ordinal_k: env_or("RANKING_ORDINAL_K", DEFAULT_ORDINAL_K),
        exploration_fraction: env_or("RANKING_EXPLORATION_FRACTION", DEFAULT_EXPLORATION_FRACTION),
        exploitation_window: env_or("RANKING_EXPLOITATION_WINDOW", DEFAULT_EXPLOITATION_WINDOW),
    };

    if let Err(e) = config.validate() {
        panic!("Invalid ranking configuration: {e}");
    }
    config
}

/// Read and parse an environment variable, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}
