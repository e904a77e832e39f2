//! Shared query parameter types for API handlers.

use serde::Deserialize;

/// Generic pagination parameters (`?limit=&offset=`).
///
/// Values are clamped in the handlers via `clamp_limit` / `clamp_offset`.
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Leaderboard page selection (`?page=&per_page=`), 1-based.
#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}
