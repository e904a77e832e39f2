//! Rules for importing experiment images into a metric.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

/// Maximum number of experiments accepted by one import request.
pub const MAX_IMPORT_EXPERIMENTS: usize = 100;

/// What kind of image an import copies into the metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportSource {
    /// Whole raw images.
    #[default]
    Images,
    /// Cell crops cut from the experiments' images.
    Crops,
}

/// Validate and deduplicate the experiment ids of an import request.
///
/// Returns the ids sorted ascending.
pub fn normalize_experiment_ids(ids: &[DbId]) -> Result<Vec<DbId>, CoreError> {
    if ids.is_empty() {
        return Err(CoreError::Validation(
            "experiment_ids must not be empty".to_string(),
        ));
    }
    if let Some(bad) = ids.iter().find(|id| **id <= 0) {
        return Err(CoreError::Validation(format!(
            "Invalid experiment id {bad}"
        )));
    }

    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    if unique.len() > MAX_IMPORT_EXPERIMENTS {
        return Err(CoreError::Validation(format!(
            "At most {MAX_IMPORT_EXPERIMENTS} experiments can be imported at once"
        )));
    }
    Ok(unique)
}
