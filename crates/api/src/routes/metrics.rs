//! Route definitions for metrics and their ranking sessions.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{metrics, ranking};
use crate::state::AppState;

/// Routes mounted at `/metrics`.
///
/// ```text
/// GET    /                            -> list_metrics
/// POST   /                            -> create_metric
/// GET    /{id}                        -> get_metric
/// PUT    /{id}                        -> update_metric
/// DELETE /{id}                        -> delete_metric
///
/// GET    /{id}/images                 -> list_images
/// POST   /{id}/images/import          -> import_images
/// DELETE /{id}/images/{image_id}      -> delete_image
///
/// GET    /{id}/pair                   -> get_pair
/// GET    /{id}/comparisons            -> list_comparisons
/// POST   /{id}/comparisons            -> record_comparison
/// POST   /{id}/comparisons/undo       -> undo_comparison
/// GET    /{id}/progress               -> get_progress
/// GET    /{id}/leaderboard            -> get_leaderboard
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(metrics::list_metrics).post(metrics::create_metric))
        .route(
            "/{id}",
            get(metrics::get_metric)
                .put(metrics::update_metric)
                .delete(metrics::delete_metric),
        )
        .route("/{id}/images", get(ranking::list_images))
        .route("/{id}/images/import", post(ranking::import_images))
        .route("/{id}/images/{image_id}", delete(ranking::delete_image))
        .route("/{id}/pair", get(ranking::get_pair))
        .route(
            "/{id}/comparisons",
            get(ranking::list_comparisons).post(ranking::record_comparison),
        )
        .route("/{id}/comparisons/undo", post(ranking::undo_comparison))
        .route("/{id}/progress", get(ranking::get_progress))
        .route("/{id}/leaderboard", get(ranking::get_leaderboard))
}
