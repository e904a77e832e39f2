//! Repository for the `comparisons` table (the per-metric comparison log).
//!
//! Recording and undoing both lock the metric row first, so the two are
//! serialized per metric and sequence numbers stay strictly increasing and
//! gapless.

use mira_core::comparison::{check_comparison_number, resolve_outcome, validate_response_time};
use mira_core::error::CoreError;
use mira_core::rating::{update, RatingConfig};
use mira_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::error::RepoError;
use crate::models::comparison::{Comparison, RecordComparison};
use crate::repositories::{MetricImageRepo, MetricRepo};

/// Column list for `comparisons` queries.
const COLUMNS: &str = "id, metric_id, image_a_id, image_b_id, winner_id, response_time_ms, \
                       sequence_number, image_a_mu_before, image_a_sigma_before, \
                       image_b_mu_before, image_b_sigma_before, created_at, updated_at";

pub struct ComparisonRepo;

impl ComparisonRepo {
    /// Record a decided comparison and update both images' ratings.
    ///
    /// Validation runs before the transaction opens; the log entry, both
    /// rating updates, and the metric counter commit together or not at all.
    pub async fn record(
        pool: &PgPool,
        metric_id: DbId,
        input: &RecordComparison,
        config: &RatingConfig,
    ) -> Result<Comparison, RepoError> {
        let outcome = resolve_outcome(input.image_a_id, input.image_b_id, input.winner_id)?;
        validate_response_time(input.response_time_ms)?;

        let mut tx = pool.begin().await?;
        MetricRepo::lock(&mut tx, metric_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Metric",
                id: metric_id,
            })?;

        let sequence_number = Self::next_sequence(&mut tx, metric_id).await?;
        check_comparison_number(input.comparison_number, sequence_number)?;

        let image_a = MetricImageRepo::lock(&mut tx, metric_id, input.image_a_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "MetricImage",
                id: input.image_a_id,
            })?;
        let image_b = MetricImageRepo::lock(&mut tx, metric_id, input.image_b_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "MetricImage",
                id: input.image_b_id,
            })?;

        let (winner, loser) = if outcome.winner_id == image_a.id {
            (&image_a, &image_b)
        } else {
            (&image_b, &image_a)
        };
        let (winner_after, loser_after) = update(&winner.rating(), &loser.rating(), config);

        MetricImageRepo::set_rating(&mut tx, winner.id, winner_after, 1).await?;
        MetricImageRepo::set_rating(&mut tx, loser.id, loser_after, 1).await?;

        let sql = format!(
            "INSERT INTO comparisons \
                (metric_id, image_a_id, image_b_id, winner_id, response_time_ms, sequence_number, \
                 image_a_mu_before, image_a_sigma_before, image_b_mu_before, image_b_sigma_before) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        let comparison = sqlx::query_as::<_, Comparison>(&sql)
            .bind(metric_id)
            .bind(image_a.id)
            .bind(image_b.id)
            .bind(outcome.winner_id)
            .bind(input.response_time_ms)
            .bind(sequence_number)
            .bind(image_a.mu)
            .bind(image_a.sigma)
            .bind(image_b.mu)
            .bind(image_b.sigma)
            .fetch_one(&mut *tx)
            .await?;

        MetricRepo::adjust_counts(&mut tx, metric_id, 0, 1).await?;
        tx.commit().await?;

        Ok(comparison)
    }

    /// Revert the most recent comparison of a metric.
    ///
    /// Both images get back the exact rating stored with the entry and lose
    /// one comparison; the entry is deleted and returned.
    pub async fn undo_last(pool: &PgPool, metric_id: DbId) -> Result<Comparison, RepoError> {
        let mut tx = pool.begin().await?;
        MetricRepo::lock(&mut tx, metric_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "Metric",
                id: metric_id,
            })?;

        let sql = format!(
            "SELECT {COLUMNS} FROM comparisons \
             WHERE metric_id = $1 ORDER BY sequence_number DESC LIMIT 1"
        );
        let last = sqlx::query_as::<_, Comparison>(&sql)
            .bind(metric_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(CoreError::NoHistory { metric_id })?;

        MetricImageRepo::set_rating(&mut tx, last.image_a_id, last.image_a_before(), -1).await?;
        MetricImageRepo::set_rating(&mut tx, last.image_b_id, last.image_b_before(), -1).await?;

        sqlx::query("DELETE FROM comparisons WHERE id = $1")
            .bind(last.id)
            .execute(&mut *tx)
            .await?;

        MetricRepo::adjust_counts(&mut tx, metric_id, 0, -1).await?;
        tx.commit().await?;

        Ok(last)
    }

    /// List a metric's comparisons, newest first.
    pub async fn list_for_metric(
        pool: &PgPool,
        metric_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comparison>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM comparisons \
             WHERE metric_id = $1 ORDER BY sequence_number DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Comparison>(&sql)
            .bind(metric_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Sequence number the next comparison of a metric will receive.
    async fn next_sequence(conn: &mut PgConnection, metric_id: DbId) -> Result<i64, sqlx::Error> {
        let (next,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(sequence_number), 0) + 1 FROM comparisons WHERE metric_id = $1",
        )
        .bind(metric_id)
        .fetch_one(conn)
        .await?;
        Ok(next)
    }
}
