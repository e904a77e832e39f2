//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Operations that must hold the
//! metric lock run their steps on a transaction internally.

pub mod comparison_repo;
pub mod experiment_repo;
pub mod metric_image_repo;
pub mod metric_repo;

pub use comparison_repo::ComparisonRepo;
pub use experiment_repo::ExperimentRepo;
pub use metric_image_repo::MetricImageRepo;
pub use metric_repo::MetricRepo;
