//! Repository for the `metric_images` table.
//!
//! Owns the item side of ranking: consistent snapshots for reads, imports
//! from experiments, and item removal with comparison log cleanup.

use mira_core::error::CoreError;
use mira_core::import::{normalize_experiment_ids, ImportSource};
use mira_core::rating::Rating;
use mira_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::RepoError;
use crate::models::metric_image::{MetricImage, RankingSnapshot};
use crate::repositories::{ExperimentRepo, MetricRepo};

/// Column list for `metric_images` queries.
const COLUMNS: &str = "id, metric_id, image_id, cell_crop_id, mu, sigma, comparison_count, \
                       original_filename, thumbnail_path, created_at, updated_at";

/// Provides ranking-aware operations on a metric's images.
pub struct MetricImageRepo;

impl MetricImageRepo {
    /// List a metric's images in import order.
    pub async fn list_for_metric(
        pool: &PgPool,
        metric_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MetricImage>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM metric_images \
             WHERE metric_id = $1 ORDER BY id LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, MetricImage>(&sql)
            .bind(metric_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Read a metric together with all of its images from one snapshot.
    ///
    /// Runs in a read-only `REPEATABLE READ` transaction so the metric's
    /// counters and the image ratings agree with each other, without
    /// waiting on writers holding the metric lock. Returns `None` if the
    /// metric does not exist.
    pub async fn ranking_snapshot(
        pool: &PgPool,
        metric_id: DbId,
    ) -> Result<Option<RankingSnapshot>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some(metric) = MetricRepo::find_in(&mut tx, metric_id).await? else {
            tx.commit().await?;
            return Ok(None);
        };

        let sql = format!("SELECT {COLUMNS} FROM metric_images WHERE metric_id = $1 ORDER BY id");
        let images = sqlx::query_as::<_, MetricImage>(&sql)
            .bind(metric_id)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(RankingSnapshot { metric, images }))
    }

    /// Lock one of a metric's images for the rest of the transaction.
    pub(crate) async fn lock(
        conn: &mut PgConnection,
        metric_id: DbId,
        id: DbId,
    ) -> Result<Option<MetricImage>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM metric_images WHERE id = $1 AND metric_id = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, MetricImage>(&sql)
            .bind(id)
            .bind(metric_id)
            .fetch_optional(conn)
            .await
    }

    /// Overwrite an image's rating and shift its comparison count.
    pub(crate) async fn set_rating(
        conn: &mut PgConnection,
        id: DbId,
        rating: Rating,
        comparison_delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE metric_images SET \
                mu = $2, \
                sigma = $3, \
                comparison_count = comparison_count + $4 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(rating.mu)
        .bind(rating.sigma)
        .bind(comparison_delta)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Copy images (or their cell crops) from experiments into a metric.
    ///
    /// Images already present in the metric are skipped, so re-importing the
    /// same experiments is a no-op. New items start at `initial`. Returns the
    /// number of items added.
    pub async fn import(
        pool: &PgPool,
        metric_id: DbId,
        experiment_ids: &[DbId],
        source: ImportSource,
        initial: Rating,
    ) -> Result<i64, RepoError> {
        let experiment_ids = normalize_experiment_ids(experiment_ids)?;

        let mut tx = pool.begin().await?;
        MetricRepo::lock(&mut tx, metric_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Metric",
                id: metric_id,
            })?;

        let existing = ExperimentRepo::existing_ids(&mut tx, &experiment_ids).await?;
        if let Some(missing) = experiment_ids.iter().find(|id| !existing.contains(id)) {
            return Err(CoreError::NotFound {
                entity: "Experiment",
                id: *missing,
            }
            .into());
        }

        let sql = match source {
            ImportSource::Images => {
                "INSERT INTO metric_images \
                    (metric_id, image_id, mu, sigma, original_filename, thumbnail_path) \
                 SELECT $1, i.id, $3, $4, i.filename, i.thumbnail_path \
                 FROM images i \
                 WHERE i.experiment_id = ANY($2) \
                   AND NOT EXISTS ( \
                       SELECT 1 FROM metric_images m \
                       WHERE m.metric_id = $1 AND m.image_id = i.id) \
                 ORDER BY i.id"
            }
            ImportSource::Crops => {
                "INSERT INTO metric_images \
                    (metric_id, cell_crop_id, mu, sigma, original_filename, thumbnail_path) \
                 SELECT $1, c.id, $3, $4, i.filename, c.thumbnail_path \
                 FROM cell_crops c \
                 JOIN images i ON i.id = c.image_id \
                 WHERE i.experiment_id = ANY($2) \
                   AND NOT EXISTS ( \
                       SELECT 1 FROM metric_images m \
                       WHERE m.metric_id = $1 AND m.cell_crop_id = c.id) \
                 ORDER BY c.id"
            }
        };

        let imported = sqlx::query(sql)
            .bind(metric_id)
            .bind(&experiment_ids)
            .bind(initial.mu)
            .bind(initial.sigma)
            .execute(&mut *tx)
            .await?
            .rows_affected() as i64;

        MetricRepo::adjust_counts(&mut tx, metric_id, imported, 0).await?;
        tx.commit().await?;

        tracing::debug!(metric_id, imported, ?source, "Metric images imported");
        Ok(imported)
    }

    /// Remove an image from a metric.
    ///
    /// Comparisons involving the image are deleted, each opponent's
    /// comparison count drops accordingly (their ratings keep what they
    /// learned), and the remaining log is renumbered so sequence numbers
    /// stay gapless.
    pub async fn delete(pool: &PgPool, metric_id: DbId, id: DbId) -> Result<(), RepoError> {
        let mut tx = pool.begin().await?;
        MetricRepo::lock(&mut tx, metric_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Metric",
                id: metric_id,
            })?;
        Self::lock(&mut tx, metric_id, id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "MetricImage",
                id,
            })?;

        sqlx::query(
            "UPDATE metric_images m SET comparison_count = m.comparison_count - o.n::INTEGER \
             FROM ( \
                 SELECT CASE WHEN image_a_id = $2 THEN image_b_id ELSE image_a_id END AS opponent_id, \
                        COUNT(*) AS n \
                 FROM comparisons \
                 WHERE metric_id = $1 AND (image_a_id = $2 OR image_b_id = $2) \
                 GROUP BY 1 \
             ) o \
             WHERE m.id = o.opponent_id",
        )
        .bind(metric_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let removed_comparisons = sqlx::query(
            "DELETE FROM comparisons \
             WHERE metric_id = $1 AND (image_a_id = $2 OR image_b_id = $2)",
        )
        .bind(metric_id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected() as i64;

        sqlx::query("DELETE FROM metric_images WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if removed_comparisons > 0 {
            sqlx::query(
                "UPDATE comparisons c SET sequence_number = r.rn \
                 FROM ( \
                     SELECT id, ROW_NUMBER() OVER (ORDER BY sequence_number) AS rn \
                     FROM comparisons WHERE metric_id = $1 \
                 ) r \
                 WHERE c.id = r.id AND c.sequence_number <> r.rn",
            )
            .bind(metric_id)
            .execute(&mut *tx)
            .await?;
        }

        MetricRepo::adjust_counts(&mut tx, metric_id, -1, -removed_comparisons).await?;
        tx.commit().await?;

        tracing::debug!(metric_id, image_id = id, removed_comparisons, "Metric image deleted");
        Ok(())
    }
}
