//! Validation of pairwise comparison outcomes.

use crate::error::CoreError;
use crate::types::DbId;

/// Longest accepted decision time (one hour).
pub const MAX_RESPONSE_TIME_MS: i64 = 3_600_000;

/// A decided comparison expressed as winner and loser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub winner_id: DbId,
    pub loser_id: DbId,
}

/// Turn `(image_a, image_b, winner)` into a winner/loser outcome.
///
/// The winner check runs first so a foreign winner is always reported as
/// [`CoreError::InvalidWinner`].
pub fn resolve_outcome(
    image_a_id: DbId,
    image_b_id: DbId,
    winner_id: DbId,
) -> Result<Outcome, CoreError> {
    if winner_id != image_a_id && winner_id != image_b_id {
        return Err(CoreError::InvalidWinner {
            winner_id,
            image_a_id,
            image_b_id,
        });
    }
    if image_a_id == image_b_id {
        return Err(CoreError::Validation(
            "An image cannot be compared with itself".to_string(),
        ));
    }

    let loser_id = if winner_id == image_a_id {
        image_b_id
    } else {
        image_a_id
    };
    Ok(Outcome {
        winner_id,
        loser_id,
    })
}

pub fn validate_response_time(response_time_ms: i64) -> Result<(), CoreError> {
    if !(0..=MAX_RESPONSE_TIME_MS).contains(&response_time_ms) {
        return Err(CoreError::Validation(format!(
            "response_time_ms must be between 0 and {MAX_RESPONSE_TIME_MS}, got {response_time_ms}"
        )));
    }
    Ok(())
}

/// Reject a record made against a stale pair.
///
/// `expected` is the comparison number the caller was shown; `next` is the
/// sequence number the metric would assign now.
pub fn check_comparison_number(expected: Option<i64>, next: i64) -> Result<(), CoreError> {
    match expected {
        Some(expected) if expected != next => Err(CoreError::Concurrency(format!(
            "Comparison {expected} is stale; the next comparison is {next}. Reload the pair and try again"
        ))),
        _ => Ok(()),
    }
}
