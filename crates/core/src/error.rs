use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(
        "Winner {winner_id} must be one of the compared images ({image_a_id}, {image_b_id})"
    )]
    InvalidWinner {
        winner_id: DbId,
        image_a_id: DbId,
        image_b_id: DbId,
    },

    #[error("Metric {metric_id} needs at least 2 images to rank, found {count}")]
    NotEnoughItems { metric_id: DbId, count: usize },

    #[error("Metric {metric_id} has no comparisons to undo")]
    NoHistory { metric_id: DbId },

    /// The caller acted on state that changed underneath it; re-fetch and retry.
    #[error("Concurrency conflict: {0}")]
    Concurrency(String),
}
