//! Handlers for metric CRUD.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use mira_core::error::CoreError;
use mira_core::metric::normalize_metric_name;
use mira_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT};
use mira_core::types::DbId;
use mira_db::models::metric::{CreateMetric, UpdateMetric};
use mira_db::repositories::MetricRepo;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/metrics
pub async fn create_metric(
    State(state): State<AppState>,
    AppJson(input): AppJson<CreateMetric>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let name = normalize_metric_name(&input.name)?;

    let metric = MetricRepo::create(&state.pool, &name, input.description.as_deref()).await?;

    tracing::info!(metric_id = metric.id, name = %metric.name, "Metric created");

    Ok((StatusCode::CREATED, Json(DataResponse { data: metric })))
}

/// GET /api/v1/metrics
///
/// Most recently created first.
pub async fn list_metrics(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, MAX_LIST_LIMIT);
    let offset = clamp_offset(params.offset);

    let metrics = MetricRepo::list(&state.pool, limit, offset).await?;

    Ok(Json(DataResponse { data: metrics }))
}

/// GET /api/v1/metrics/{id}
pub async fn get_metric(
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<impl IntoResponse> {
    let metric = MetricRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Metric",
            id,
        }))?;

    Ok(Json(DataResponse { data: metric }))
}

/// PUT /api/v1/metrics/{id}
///
/// Update a metric's name and/or description.
pub async fn update_metric(
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    AppJson(input): AppJson<UpdateMetric>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let name = input
        .name
        .as_deref()
        .map(normalize_metric_name)
        .transpose()?;

    let metric = MetricRepo::update(&state.pool, id, name.as_deref(), input.description.as_deref())
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Metric",
            id,
        }))?;

    tracing::info!(metric_id = id, "Metric updated");

    Ok(Json(DataResponse { data: metric }))
}

/// DELETE /api/v1/metrics/{id}
///
/// Removes the metric together with its ranked images and comparison log.
pub async fn delete_metric(
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<impl IntoResponse> {
    let deleted = MetricRepo::delete(&state.pool, id).await?;

    if !deleted {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Metric",
            id,
        }));
    }

    state.pair_history.forget(id).await;
    tracing::info!(metric_id = id, "Metric deleted");

    Ok(StatusCode::NO_CONTENT)
}
