pub mod health;
pub mod metrics;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /metrics                                  list, create
/// /metrics/{id}                             get, update, delete
/// /metrics/{id}/images                      list ranked images
/// /metrics/{id}/images/import               import from experiments (POST)
/// /metrics/{id}/images/{image_id}           remove from ranking (DELETE)
/// /metrics/{id}/pair                        next pair to compare
/// /metrics/{id}/comparisons                 history, record
/// /metrics/{id}/comparisons/undo            undo latest (POST)
/// /metrics/{id}/progress                    convergence
/// /metrics/{id}/leaderboard                 ranked, paginated
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/metrics", metrics::router())
}
