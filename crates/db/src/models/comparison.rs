//! Comparison log entry model and DTOs.

use mira_core::rating::Rating;
use mira_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `comparisons` table.
///
/// The `*_before` snapshot columns are internal to undo and are not
/// serialized.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comparison {
    pub id: DbId,
    pub metric_id: DbId,
    pub image_a_id: DbId,
    pub image_b_id: DbId,
    pub winner_id: DbId,
    pub response_time_ms: i64,
    pub sequence_number: i64,
    #[serde(skip_serializing)]
    pub image_a_mu_before: f64,
    #[serde(skip_serializing)]
    pub image_a_sigma_before: f64,
    #[serde(skip_serializing)]
    pub image_b_mu_before: f64,
    #[serde(skip_serializing)]
    pub image_b_sigma_before: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Comparison {
    /// Rating of image A before this comparison was applied.
    pub fn image_a_before(&self) -> Rating {
        Rating::new(self.image_a_mu_before, self.image_a_sigma_before)
    }

    /// Rating of image B before this comparison was applied.
    pub fn image_b_before(&self) -> Rating {
        Rating::new(self.image_b_mu_before, self.image_b_sigma_before)
    }
}

/// DTO for recording a decided comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordComparison {
    pub image_a_id: DbId,
    pub image_b_id: DbId,
    pub winner_id: DbId,
    pub response_time_ms: i64,
    /// The comparison number shown with the pair; checked when present.
    pub comparison_number: Option<i64>,
}
