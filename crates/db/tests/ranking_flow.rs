//! Integration tests for the ranking repositories.
//!
//! Exercises import, record, undo, and item removal against a real database:
//! - Record/undo round trip on a two-image metric
//! - Gapless sequence numbers across record, undo, and delete
//! - Rejected comparisons leave no trace
//! - Idempotent imports from images and cell crops
//! - Cascade delete of a metric

use assert_matches::assert_matches;
use mira_core::error::CoreError;
use mira_core::import::ImportSource;
use mira_core::rating::RatingConfig;
use mira_db::error::RepoError;
use mira_db::models::comparison::RecordComparison;
use mira_db::models::experiment::{CreateCellCrop, CreateImage};
use mira_db::models::metric::Metric;
use mira_db::models::metric_image::MetricImage;
use mira_db::repositories::{ComparisonRepo, ExperimentRepo, MetricImageRepo, MetricRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create an experiment holding `count` images and return its id.
async fn seed_experiment(pool: &PgPool, name: &str, count: usize) -> i64 {
    let experiment = ExperimentRepo::create(pool, name).await.unwrap();
    for i in 0..count {
        ExperimentRepo::create_image(
            pool,
            &CreateImage {
                experiment_id: experiment.id,
                filename: format!("{name}_{i}.tif"),
                file_path: format!("/data/{name}/{i}.tif"),
                thumbnail_path: Some(format!("/thumbs/{name}/{i}.png")),
            },
        )
        .await
        .unwrap();
    }
    experiment.id
}

/// Create a metric and import `count` fresh images into it.
async fn seed_metric(pool: &PgPool, name: &str, count: usize) -> (Metric, Vec<MetricImage>) {
    let metric = MetricRepo::create(pool, name, None).await.unwrap();
    let experiment_id = seed_experiment(pool, name, count).await;
    let config = RatingConfig::default();
    MetricImageRepo::import(
        pool,
        metric.id,
        &[experiment_id],
        ImportSource::Images,
        config.initial_rating(),
    )
    .await
    .unwrap();
    let images = MetricImageRepo::list_for_metric(pool, metric.id, 100, 0)
        .await
        .unwrap();
    (metric, images)
}

fn decide(a: i64, b: i64, winner: i64) -> RecordComparison {
    RecordComparison {
        image_a_id: a,
        image_b_id: b,
        winner_id: winner,
        response_time_ms: 1200,
        comparison_number: None,
    }
}

async fn sequence_numbers(pool: &PgPool, metric_id: i64) -> Vec<i64> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT sequence_number FROM comparisons WHERE metric_id = $1 ORDER BY sequence_number",
    )
    .bind(metric_id)
    .fetch_all(pool)
    .await
    .unwrap();
    rows.into_iter().map(|(n,)| n).collect()
}

async fn image(pool: &PgPool, metric_id: i64, id: i64) -> MetricImage {
    MetricImageRepo::list_for_metric(pool, metric_id, 100, 0)
        .await
        .unwrap()
        .into_iter()
        .find(|image| image.id == id)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Record and undo
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_record_then_undo_restores_ratings(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Bundleness", 2).await;
    let (a, b) = (images[0].id, images[1].id);

    let comparison = ComparisonRepo::record(&pool, metric.id, &decide(a, b, a), &config)
        .await
        .unwrap();
    assert_eq!(comparison.sequence_number, 1);
    assert_eq!(comparison.winner_id, a);

    let winner = image(&pool, metric.id, a).await;
    let loser = image(&pool, metric.id, b).await;
    assert!(winner.mu > 0.0);
    assert!(loser.mu < 0.0);
    assert!(winner.sigma < 1.0);
    assert!(loser.sigma < 1.0);
    assert_eq!(winner.comparison_count, 1);
    assert_eq!(loser.comparison_count, 1);

    let metric_after = MetricRepo::find_by_id(&pool, metric.id).await.unwrap().unwrap();
    assert_eq!(metric_after.comparison_count, 1);

    let undone = ComparisonRepo::undo_last(&pool, metric.id).await.unwrap();
    assert_eq!(undone.id, comparison.id);

    for id in [a, b] {
        let restored = image(&pool, metric.id, id).await;
        assert_eq!(restored.mu, 0.0);
        assert_eq!(restored.sigma, 1.0);
        assert_eq!(restored.comparison_count, 0);
    }
    assert!(sequence_numbers(&pool, metric.id).await.is_empty());
    let metric_after = MetricRepo::find_by_id(&pool, metric.id).await.unwrap().unwrap();
    assert_eq!(metric_after.comparison_count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_undo_reverts_only_the_latest(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Brightness", 3).await;
    let (a, b, c) = (images[0].id, images[1].id, images[2].id);

    ComparisonRepo::record(&pool, metric.id, &decide(a, b, a), &config)
        .await
        .unwrap();
    let a_after_first = image(&pool, metric.id, a).await;

    ComparisonRepo::record(&pool, metric.id, &decide(a, c, c), &config)
        .await
        .unwrap();
    ComparisonRepo::undo_last(&pool, metric.id).await.unwrap();

    let a_now = image(&pool, metric.id, a).await;
    assert_eq!(a_now.mu, a_after_first.mu);
    assert_eq!(a_now.sigma, a_after_first.sigma);
    assert_eq!(a_now.comparison_count, 1);
    assert_eq!(image(&pool, metric.id, c).await.comparison_count, 0);
    assert_eq!(sequence_numbers(&pool, metric.id).await, vec![1]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_undo_without_history(pool: PgPool) {
    let (metric, _) = seed_metric(&pool, "Empty", 2).await;
    let result = ComparisonRepo::undo_last(&pool, metric.id).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::NoHistory { .. })));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_record_on_unknown_metric(pool: PgPool) {
    let result =
        ComparisonRepo::record(&pool, 999_999, &decide(1, 2, 1), &RatingConfig::default()).await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound {
            entity: "Metric",
            ..
        }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_winner_leaves_no_trace(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Texture", 3).await;
    let (a, b, c) = (images[0].id, images[1].id, images[2].id);

    let result = ComparisonRepo::record(&pool, metric.id, &decide(a, b, c), &config).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::InvalidWinner { .. })));

    assert!(sequence_numbers(&pool, metric.id).await.is_empty());
    for id in [a, b] {
        let untouched = image(&pool, metric.id, id).await;
        assert_eq!(untouched.mu, 0.0);
        assert_eq!(untouched.sigma, 1.0);
        assert_eq!(untouched.comparison_count, 0);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_image_from_other_metric_is_not_found(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Left", 2).await;
    let (_, others) = seed_metric(&pool, "Right", 2).await;

    let result = ComparisonRepo::record(
        &pool,
        metric.id,
        &decide(images[0].id, others[0].id, images[0].id),
        &config,
    )
    .await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound {
            entity: "MetricImage",
            ..
        }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_comparison_number_is_a_conflict(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Stale", 2).await;
    let (a, b) = (images[0].id, images[1].id);

    let mut input = decide(a, b, a);
    input.comparison_number = Some(1);
    ComparisonRepo::record(&pool, metric.id, &input, &config)
        .await
        .unwrap();

    let result = ComparisonRepo::record(&pool, metric.id, &input, &config).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::Concurrency(_))));
    assert_eq!(sequence_numbers(&pool, metric.id).await, vec![1]);
}

// ---------------------------------------------------------------------------
// Sequence numbers
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_sequence_stays_gapless(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Gapless", 4).await;
    let ids: Vec<i64> = images.iter().map(|image| image.id).collect();

    ComparisonRepo::record(&pool, metric.id, &decide(ids[0], ids[1], ids[0]), &config)
        .await
        .unwrap();
    ComparisonRepo::record(&pool, metric.id, &decide(ids[2], ids[3], ids[3]), &config)
        .await
        .unwrap();
    ComparisonRepo::undo_last(&pool, metric.id).await.unwrap();

    let next = ComparisonRepo::record(&pool, metric.id, &decide(ids[1], ids[2], ids[2]), &config)
        .await
        .unwrap();
    assert_eq!(next.sequence_number, 2);

    ComparisonRepo::record(&pool, metric.id, &decide(ids[0], ids[3], ids[3]), &config)
        .await
        .unwrap();
    assert_eq!(sequence_numbers(&pool, metric.id).await, vec![1, 2, 3]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_image_renumbers_log(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Renumber", 3).await;
    let (a, b, c) = (images[0].id, images[1].id, images[2].id);

    ComparisonRepo::record(&pool, metric.id, &decide(b, c, b), &config)
        .await
        .unwrap();
    ComparisonRepo::record(&pool, metric.id, &decide(a, b, a), &config)
        .await
        .unwrap();
    ComparisonRepo::record(&pool, metric.id, &decide(b, c, c), &config)
        .await
        .unwrap();
    let c_before = image(&pool, metric.id, c).await;

    MetricImageRepo::delete(&pool, metric.id, a).await.unwrap();

    assert_eq!(sequence_numbers(&pool, metric.id).await, vec![1, 2]);
    assert_eq!(image(&pool, metric.id, b).await.comparison_count, 2);
    let c_after = image(&pool, metric.id, c).await;
    assert_eq!(c_after.mu, c_before.mu);
    assert_eq!(c_after.comparison_count, 2);

    let metric_after = MetricRepo::find_by_id(&pool, metric.id).await.unwrap().unwrap();
    assert_eq!(metric_after.image_count, 2);
    assert_eq!(metric_after.comparison_count, 2);

    let next = ComparisonRepo::record(&pool, metric.id, &decide(b, c, b), &config)
        .await
        .unwrap();
    assert_eq!(next.sequence_number, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_undo_after_delete_image(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "DeleteUndo", 3).await;
    let (a, b, c) = (images[0].id, images[1].id, images[2].id);

    ComparisonRepo::record(&pool, metric.id, &decide(b, c, b), &config)
        .await
        .unwrap();
    let b_after_first = image(&pool, metric.id, b).await;
    let second = ComparisonRepo::record(&pool, metric.id, &decide(a, b, a), &config)
        .await
        .unwrap();

    MetricImageRepo::delete(&pool, metric.id, c).await.unwrap();
    assert_eq!(sequence_numbers(&pool, metric.id).await, vec![1]);

    let undone = ComparisonRepo::undo_last(&pool, metric.id).await.unwrap();
    assert_eq!(undone.id, second.id);
    assert_eq!(undone.sequence_number, 1);

    assert!(sequence_numbers(&pool, metric.id).await.is_empty());
    let b_now = image(&pool, metric.id, b).await;
    assert_eq!(b_now.comparison_count, 0);
    assert_eq!(b_now.mu, b_after_first.mu);
    assert_eq!(b_now.sigma, b_after_first.sigma);
    let a_now = image(&pool, metric.id, a).await;
    assert_eq!(a_now.mu, 0.0);
    assert_eq!(a_now.sigma, 1.0);
    assert_eq!(a_now.comparison_count, 0);

    let metric_after = MetricRepo::find_by_id(&pool, metric.id).await.unwrap().unwrap();
    assert_eq!(metric_after.comparison_count, 0);
    assert_eq!(metric_after.image_count, 2);

    let result = ComparisonRepo::undo_last(&pool, metric.id).await;
    assert_matches!(result, Err(RepoError::Core(CoreError::NoHistory { .. })));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_unknown_image(pool: PgPool) {
    let (metric, _) = seed_metric(&pool, "Missing", 2).await;
    let result = MetricImageRepo::delete(&pool, metric.id, 999_999).await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound {
            entity: "MetricImage",
            ..
        }))
    );
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_import_is_idempotent(pool: PgPool) {
    let config = RatingConfig::default();
    let metric = MetricRepo::create(&pool, "Import", None).await.unwrap();
    let first = seed_experiment(&pool, "exp_a", 3).await;
    let second = seed_experiment(&pool, "exp_b", 2).await;

    let imported = MetricImageRepo::import(
        &pool,
        metric.id,
        &[first],
        ImportSource::Images,
        config.initial_rating(),
    )
    .await
    .unwrap();
    assert_eq!(imported, 3);

    let imported = MetricImageRepo::import(
        &pool,
        metric.id,
        &[second, first, second],
        ImportSource::Images,
        config.initial_rating(),
    )
    .await
    .unwrap();
    assert_eq!(imported, 2);

    let metric_after = MetricRepo::find_by_id(&pool, metric.id).await.unwrap().unwrap();
    assert_eq!(metric_after.image_count, 5);

    let images = MetricImageRepo::list_for_metric(&pool, metric.id, 100, 0)
        .await
        .unwrap();
    assert_eq!(images.len(), 5);
    assert!(images.iter().all(|image| image.mu == 0.0 && image.sigma == 1.0));
    assert!(images.iter().all(|image| image.image_id.is_some()));
    assert_eq!(images[0].original_filename, "exp_a_0.tif");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_import_cell_crops(pool: PgPool) {
    let config = RatingConfig::default();
    let metric = MetricRepo::create(&pool, "Crops", None).await.unwrap();
    let experiment_id = seed_experiment(&pool, "crops", 1).await;
    let source = ExperimentRepo::create_image(
        &pool,
        &CreateImage {
            experiment_id,
            filename: "plate.tif".to_string(),
            file_path: "/data/plate.tif".to_string(),
            thumbnail_path: None,
        },
    )
    .await
    .unwrap();
    for crop_index in 0..3 {
        ExperimentRepo::create_cell_crop(
            &pool,
            &CreateCellCrop {
                image_id: source.id,
                crop_index,
                file_path: format!("/data/plate_{crop_index}.tif"),
                thumbnail_path: None,
            },
        )
        .await
        .unwrap();
    }

    for expected in [3, 0] {
        let imported = MetricImageRepo::import(
            &pool,
            metric.id,
            &[experiment_id],
            ImportSource::Crops,
            config.initial_rating(),
        )
        .await
        .unwrap();
        assert_eq!(imported, expected);
    }

    let images = MetricImageRepo::list_for_metric(&pool, metric.id, 100, 0)
        .await
        .unwrap();
    assert_eq!(images.len(), 3);
    assert!(images.iter().all(|image| image.cell_crop_id.is_some()));
    assert!(images.iter().all(|image| image.original_filename == "plate.tif"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_import_unknown_experiment(pool: PgPool) {
    let metric = MetricRepo::create(&pool, "Unknown", None).await.unwrap();
    let result = MetricImageRepo::import(
        &pool,
        metric.id,
        &[999_999],
        ImportSource::Images,
        RatingConfig::default().initial_rating(),
    )
    .await;
    assert_matches!(
        result,
        Err(RepoError::Core(CoreError::NotFound {
            entity: "Experiment",
            id: 999_999
        }))
    );
}

// ---------------------------------------------------------------------------
// Snapshots and cascade
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_ranking_snapshot(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Snapshot", 2).await;
    ComparisonRepo::record(
        &pool,
        metric.id,
        &decide(images[0].id, images[1].id, images[1].id),
        &config,
    )
    .await
    .unwrap();

    let snapshot = MetricImageRepo::ranking_snapshot(&pool, metric.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.images.len(), 2);
    assert_eq!(snapshot.next_comparison_number(), 2);
    assert!(snapshot.find(images[1].id).unwrap().mu > 0.0);

    assert!(MetricImageRepo::ranking_snapshot(&pool, 999_999)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_metric_cascades(pool: PgPool) {
    let config = RatingConfig::default();
    let (metric, images) = seed_metric(&pool, "Cascade", 2).await;
    ComparisonRepo::record(
        &pool,
        metric.id,
        &decide(images[0].id, images[1].id, images[0].id),
        &config,
    )
    .await
    .unwrap();

    assert!(MetricRepo::delete(&pool, metric.id).await.unwrap());

    let (items,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM metric_images WHERE metric_id = $1")
        .bind(metric.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(items, 0);
    assert!(sequence_numbers(&pool, metric.id).await.is_empty());

    // Source images survive.
    let (sources,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(sources, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_metric_name(pool: PgPool) {
    MetricRepo::create(&pool, "Unique", None).await.unwrap();
    let err = MetricRepo::create(&pool, "Unique", None).await.unwrap_err();
    let db_err = err.as_database_error().unwrap();
    assert_eq!(db_err.code().as_deref(), Some("23505"));
    assert_eq!(db_err.constraint(), Some("uq_metrics_name"));
}
