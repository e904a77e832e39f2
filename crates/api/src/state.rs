use std::sync::Arc;

use crate::config::ServerConfig;
use crate::pair_history::PairHistory;

/// Shared application state available to all handlers via axum's `State` extractor.
///
/// Cheap to clone: every field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: mira_db::DbPool,
    /// Server configuration, including the rating parameters.
    pub config: Arc<ServerConfig>,
    /// Most recently proposed pair per metric.
    pub pair_history: Arc<PairHistory>,
}

impl AppState {
    pub fn new(pool: mira_db::DbPool, config: ServerConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            pair_history: Arc::new(PairHistory::new()),
        }
    }
}
