//! Handlers for a metric's ranking session.
//!
//! Covers the ranked image set (list, import, remove), pair proposals,
//! recording and undoing comparisons, progress, and the leaderboard.
//! Reads work from a single consistent snapshot of the metric; writes are
//! serialized per metric inside the repositories.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mira_core::convergence::compute_progress;
use mira_core::error::CoreError;
use mira_core::leaderboard::{page_range, percentile, rank_items};
use mira_core::pagination::{
    clamp_limit, clamp_offset, clamp_page, DEFAULT_LIST_LIMIT, DEFAULT_PER_PAGE, MAX_LIST_LIMIT,
    MAX_PER_PAGE,
};
use mira_core::pairing::{select_pair, Phase};
use mira_core::types::DbId;
use mira_db::models::comparison::RecordComparison;
use mira_db::models::metric_image::{ImportMetricImages, ImportResult, MetricImage, RankingSnapshot};
use mira_db::repositories::{ComparisonRepo, MetricImageRepo, MetricRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::query::{LeaderboardParams, PaginationParams};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Two images to compare, in the order they should be presented.
#[derive(Debug, Serialize)]
pub struct PairResponse {
    pub image_a: MetricImage,
    pub image_b: MetricImage,
    /// Sequence number the comparison will receive if recorded next.
    pub comparison_number: i64,
    pub phase: Phase,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub metric_image_id: DbId,
    pub ordinal_score: f64,
    pub percentile: f64,
    pub mu: f64,
    pub sigma: f64,
    pub comparison_count: i32,
    pub original_filename: String,
    pub thumbnail_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardPage {
    pub items: Vec<LeaderboardEntry>,
    pub total: usize,
    pub page: i64,
    pub per_page: i64,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fail with 404 unless the metric exists.
async fn require_metric(state: &AppState, metric_id: DbId) -> AppResult<()> {
    MetricRepo::find_by_id(&state.pool, metric_id)
        .await?
        .map(|_| ())
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Metric",
            id: metric_id,
        }))
}

async fn load_snapshot(state: &AppState, metric_id: DbId) -> AppResult<RankingSnapshot> {
    MetricImageRepo::ranking_snapshot(&state.pool, metric_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Metric",
            id: metric_id,
        }))
}

// ---------------------------------------------------------------------------
// Ranked images
// ---------------------------------------------------------------------------

/// GET /api/v1/metrics/{id}/images
pub async fn list_images(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
    AppQuery(params): AppQuery<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    require_metric(&state, metric_id).await?;

    let images = MetricImageRepo::list_for_metric(&state.pool, metric_id, limit, offset).await?;

    Ok(Json(DataResponse { data: images }))
}

/// POST /api/v1/metrics/{id}/images/import
///
/// Add the images (or cell crops) of the given experiments. Images already
/// in the metric are skipped.
pub async fn import_images(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
    AppJson(input): AppJson<ImportMetricImages>,
) -> AppResult<impl IntoResponse> {
    let imported_count = MetricImageRepo::import(
        &state.pool,
        metric_id,
        &input.experiment_ids,
        input.source,
        state.config.ranking.initial_rating(),
    )
    .await?;

    tracing::info!(metric_id, imported_count, source = ?input.source, "Images imported");

    Ok(Json(DataResponse {
        data: ImportResult { imported_count },
    }))
}

/// DELETE /api/v1/metrics/{id}/images/{image_id}
pub async fn delete_image(
    State(state): State<AppState>,
    AppPath((metric_id, image_id)): AppPath<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    MetricImageRepo::delete(&state.pool, metric_id, image_id).await?;
    state.pair_history.forget(metric_id).await;

    tracing::info!(metric_id, image_id, "Image removed from ranking");

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------

/// GET /api/v1/metrics/{id}/pair
///
/// Propose the next pair. Does not mutate the ranking; asking again without
/// recording moves on to a different pair whenever one exists.
pub async fn get_pair(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = load_snapshot(&state, metric_id).await?;
    let candidates: Vec<_> = snapshot.images.iter().map(MetricImage::candidate).collect();

    let avoid = state.pair_history.last(metric_id).await;
    let proposed = select_pair(metric_id, &candidates, avoid, &state.config.ranking)?;
    state
        .pair_history
        .remember(metric_id, proposed.unordered())
        .await;

    let (first, second) = if rand::random::<bool>() {
        (proposed.first, proposed.second)
    } else {
        (proposed.second, proposed.first)
    };
    let image = |id: DbId| {
        snapshot.find(id).cloned().ok_or_else(|| {
            AppError::InternalError(format!("Selected image {id} missing from metric {metric_id}"))
        })
    };

    let pair = PairResponse {
        image_a: image(first)?,
        image_b: image(second)?,
        comparison_number: snapshot.next_comparison_number(),
        phase: proposed.phase,
    };

    tracing::debug!(
        metric_id,
        image_a_id = pair.image_a.id,
        image_b_id = pair.image_b.id,
        phase = pair.phase.as_str(),
        "Pair proposed",
    );

    Ok(Json(DataResponse { data: pair }))
}

/// POST /api/v1/metrics/{id}/comparisons
pub async fn record_comparison(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
    AppJson(input): AppJson<RecordComparison>,
) -> AppResult<impl IntoResponse> {
    let comparison =
        ComparisonRepo::record(&state.pool, metric_id, &input, &state.config.ranking).await?;
    state.pair_history.forget(metric_id).await;

    tracing::info!(
        metric_id,
        comparison_id = comparison.id,
        sequence_number = comparison.sequence_number,
        winner_id = comparison.winner_id,
        "Comparison recorded",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: comparison })))
}

/// GET /api/v1/metrics/{id}/comparisons
///
/// Comparison history, newest first.
pub async fn list_comparisons(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
    AppQuery(params): AppQuery<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);
    require_metric(&state, metric_id).await?;

    let comparisons = ComparisonRepo::list_for_metric(&state.pool, metric_id, limit, offset).await?;

    Ok(Json(DataResponse { data: comparisons }))
}

/// POST /api/v1/metrics/{id}/comparisons/undo
///
/// Revert the latest comparison and return it.
pub async fn undo_comparison(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
) -> AppResult<impl IntoResponse> {
    let undone = ComparisonRepo::undo_last(&state.pool, metric_id).await?;
    state.pair_history.forget(metric_id).await;

    tracing::info!(
        metric_id,
        comparison_id = undone.id,
        sequence_number = undone.sequence_number,
        "Comparison undone",
    );

    Ok(Json(DataResponse { data: undone }))
}

// ---------------------------------------------------------------------------
// Progress and leaderboard
// ---------------------------------------------------------------------------

/// GET /api/v1/metrics/{id}/progress
pub async fn get_progress(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
) -> AppResult<impl IntoResponse> {
    let snapshot = load_snapshot(&state, metric_id).await?;
    let sigmas: Vec<f64> = snapshot.images.iter().map(|image| image.sigma).collect();

    let progress = compute_progress(
        &sigmas,
        i64::from(snapshot.metric.comparison_count),
        &state.config.ranking,
    );

    Ok(Json(DataResponse { data: progress }))
}

/// GET /api/v1/metrics/{id}/leaderboard
///
/// Ranked images, best first. Ranks are 1-based and unique per row.
pub async fn get_leaderboard(
    State(state): State<AppState>,
    AppPath(metric_id): AppPath<DbId>,
    AppQuery(params): AppQuery<LeaderboardParams>,
) -> AppResult<impl IntoResponse> {
    let page = clamp_page(params.page);
    let per_page = clamp_limit(params.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);
    let ordinal_k = state.config.ranking.ordinal_k;

    let snapshot = load_snapshot(&state, metric_id).await?;
    let total = snapshot.images.len();
    let window = page_range(page, per_page, total);
    let ranked = rank_items(snapshot.images, |image| image.standing(ordinal_k));

    let items = ranked
        .into_iter()
        .skip(window.start)
        .take(window.len())
        .map(|(rank, image)| LeaderboardEntry {
            rank,
            metric_image_id: image.id,
            ordinal_score: image.rating().ordinal(ordinal_k),
            percentile: percentile(rank, total),
            mu: image.mu,
            sigma: image.sigma,
            comparison_count: image.comparison_count,
            original_filename: image.original_filename,
            thumbnail_path: image.thumbnail_path,
        })
        .collect();

    Ok(Json(DataResponse {
        data: LeaderboardPage {
            items,
            total,
            page,
            per_page,
        },
    }))
}
