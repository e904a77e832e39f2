//! Limits for list and leaderboard pagination.

/// Default row count for `?limit=&offset=` listings.
pub const DEFAULT_LIST_LIMIT: i64 = 50;
/// Maximum row count for `?limit=&offset=` listings.
pub const MAX_LIST_LIMIT: i64 = 200;

/// Default leaderboard page size.
pub const DEFAULT_PER_PAGE: i64 = 20;
/// Maximum leaderboard page size.
pub const MAX_PER_PAGE: i64 = 100;

/// Clamp a user-provided limit to valid bounds.
pub fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> i64 {
    limit.unwrap_or(default).max(1).min(max)
}

/// Clamp a user-provided offset to non-negative.
pub fn clamp_offset(offset: Option<i64>) -> i64 {
    offset.unwrap_or(0).max(0)
}

/// Clamp a 1-based page number.
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}
