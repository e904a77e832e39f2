//! Experiment, image, and cell crop rows referenced by metric imports.

use mira_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `experiments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Experiment {
    pub id: DbId,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `images` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Image {
    pub id: DbId,
    pub experiment_id: DbId,
    pub filename: String,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `cell_crops` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CellCrop {
    pub id: DbId,
    pub image_id: DbId,
    pub crop_index: i32,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for registering an image under an experiment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateImage {
    pub experiment_id: DbId,
    pub filename: String,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
}

/// DTO for registering a cell crop cut from an image.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCellCrop {
    pub image_id: DbId,
    pub crop_index: i32,
    pub file_path: String,
    pub thumbnail_path: Option<String>,
}
