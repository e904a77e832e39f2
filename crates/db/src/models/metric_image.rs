//! Rankable image ("metric image") model and DTOs.

use mira_core::import::ImportSource;
use mira_core::leaderboard::Standing;
use mira_core::pairing::Candidate;
use mira_core::rating::Rating;
use mira_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::metric::Metric;

/// A row from the `metric_images` table.
///
/// Exactly one of `image_id` and `cell_crop_id` is set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MetricImage {
    pub id: DbId,
    pub metric_id: DbId,
    pub image_id: Option<DbId>,
    pub cell_crop_id: Option<DbId>,
    pub mu: f64,
    pub sigma: f64,
    pub comparison_count: i32,
    pub original_filename: String,
    pub thumbnail_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MetricImage {
    pub fn rating(&self) -> Rating {
        Rating::new(self.mu, self.sigma)
    }

    pub fn candidate(&self) -> Candidate {
        Candidate {
            id: self.id,
            rating: self.rating(),
            comparison_count: self.comparison_count,
        }
    }

    pub fn standing(&self, ordinal_k: f64) -> Standing {
        Standing {
            id: self.id,
            ordinal: self.rating().ordinal(ordinal_k),
            comparison_count: self.comparison_count,
        }
    }
}

/// A metric and all of its images read from one consistent snapshot.
#[derive(Debug, Clone)]
pub struct RankingSnapshot {
    pub metric: Metric,
    pub images: Vec<MetricImage>,
}

impl RankingSnapshot {
    /// Sequence number the next recorded comparison will receive.
    pub fn next_comparison_number(&self) -> i64 {
        i64::from(self.metric.comparison_count) + 1
    }

    pub fn find(&self, id: DbId) -> Option<&MetricImage> {
        self.images.iter().find(|image| image.id == id)
    }
}

/// DTO for importing experiment images into a metric.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportMetricImages {
    pub experiment_ids: Vec<DbId>,
    #[serde(default)]
    pub source: ImportSource,
}

/// Result of an import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub imported_count: i64,
}
