//! Repository for experiments and the images they hold.
//!
//! Experiment management lives outside the ranking service; this repository
//! only registers rows and answers the existence checks imports need.

use mira_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::experiment::{CellCrop, CreateCellCrop, CreateImage, Experiment, Image};

/// Column list for `experiments` queries.
const EXPERIMENT_COLUMNS: &str = "id, name, created_at, updated_at";

/// Column list for `images` queries.
const IMAGE_COLUMNS: &str =
    "id, experiment_id, filename, file_path, thumbnail_path, created_at, updated_at";

/// Column list for `cell_crops` queries.
const CELL_CROP_COLUMNS: &str =
    "id, image_id, crop_index, file_path, thumbnail_path, created_at, updated_at";

pub struct ExperimentRepo;

impl ExperimentRepo {
    /// Register a new experiment.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Experiment, sqlx::Error> {
        let sql = format!("INSERT INTO experiments (name) VALUES ($1) RETURNING {EXPERIMENT_COLUMNS}");
        sqlx::query_as::<_, Experiment>(&sql)
            .bind(name)
            .fetch_one(pool)
            .await
    }

    /// Register an image under an experiment.
    pub async fn create_image(pool: &PgPool, input: &CreateImage) -> Result<Image, sqlx::Error> {
        let sql = format!(
            "INSERT INTO images (experiment_id, filename, file_path, thumbnail_path) \
             VALUES ($1, $2, $3, $4) RETURNING {IMAGE_COLUMNS}"
        );
        sqlx::query_as::<_, Image>(&sql)
            .bind(input.experiment_id)
            .bind(&input.filename)
            .bind(&input.file_path)
            .bind(&input.thumbnail_path)
            .fetch_one(pool)
            .await
    }

    /// Register a cell crop cut from an image.
    pub async fn create_cell_crop(
        pool: &PgPool,
        input: &CreateCellCrop,
    ) -> Result<CellCrop, sqlx::Error> {
        let sql = format!(
            "INSERT INTO cell_crops (image_id, crop_index, file_path, thumbnail_path) \
             VALUES ($1, $2, $3, $4) RETURNING {CELL_CROP_COLUMNS}"
        );
        sqlx::query_as::<_, CellCrop>(&sql)
            .bind(input.image_id)
            .bind(input.crop_index)
            .bind(&input.file_path)
            .bind(&input.thumbnail_path)
            .fetch_one(pool)
            .await
    }

    /// Return which of `ids` exist.
    pub(crate) async fn existing_ids(
        conn: &mut PgConnection,
        ids: &[DbId],
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as("SELECT id FROM experiments WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(conn)
            .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
