//! Metric entity model and DTOs.

use mira_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `metrics` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Metric {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub image_count: i32,
    pub comparison_count: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a metric.
///
/// The name is trimmed and checked by `normalize_metric_name` before insert.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMetric {
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// DTO for updating a metric. Absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateMetric {
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}
