//! Repository for the `metrics` table.

use mira_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::metric::Metric;

/// Column list for `metrics` queries.
const COLUMNS: &str =
    "id, name, description, image_count, comparison_count, created_at, updated_at";

/// Provides CRUD operations for metrics.
pub struct MetricRepo;

impl MetricRepo {
    /// Insert a new metric. `name` is expected to be normalized already.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        description: Option<&str>,
    ) -> Result<Metric, sqlx::Error> {
        let sql = format!(
            "INSERT INTO metrics (name, description) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Metric>(&sql)
            .bind(name)
            .bind(description)
            .fetch_one(pool)
            .await
    }

    /// Find a metric by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Metric>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM metrics WHERE id = $1");
        sqlx::query_as::<_, Metric>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List metrics, most recently created first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Metric>, sqlx::Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM metrics ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Metric>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update a metric's name and/or description. Returns `None` if not found.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Option<Metric>, sqlx::Error> {
        let sql = format!(
            "UPDATE metrics SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description) \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Metric>(&sql)
            .bind(id)
            .bind(name)
            .bind(description)
            .fetch_optional(pool)
            .await
    }

    /// Delete a metric and, by cascade, its images and comparisons.
    /// Returns `true` if a row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM metrics WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a metric on an existing connection or transaction, without locking.
    pub(crate) async fn find_in(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Metric>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM metrics WHERE id = $1");
        sqlx::query_as::<_, Metric>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Lock a metric row for the rest of the transaction.
    ///
    /// Every mutation of a metric's images or comparison log takes this lock
    /// first, which serializes writers per metric.
    pub(crate) async fn lock(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<Metric>, sqlx::Error> {
        let sql = format!("SELECT {COLUMNS} FROM metrics WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Metric>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Adjust the denormalized counters of a locked metric.
    pub(crate) async fn adjust_counts(
        conn: &mut PgConnection,
        id: DbId,
        image_delta: i64,
        comparison_delta: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE metrics SET \
                image_count = image_count + $2::INTEGER, \
                comparison_count = comparison_count + $3::INTEGER \
             WHERE id = $1",
        )
        .bind(id)
        .bind(image_delta)
        .bind(comparison_delta)
        .execute(conn)
        .await?;
        Ok(())
    }
}
