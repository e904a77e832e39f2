//! Last proposed pair per metric.
//!
//! Pair proposals are not persisted. Remembering the most recent one lets
//! the selector move on when a caller skips a pair without deciding it.
//! The entry is dropped whenever the metric's comparison log changes.

use std::collections::HashMap;

use mira_core::pairing::UnorderedPair;
use mira_core::types::DbId;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct PairHistory {
    last_shown: RwLock<HashMap<DbId, UnorderedPair>>,
}

impl PairHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pair most recently proposed for `metric_id`, if any.
    pub async fn last(&self, metric_id: DbId) -> Option<UnorderedPair> {
        self.last_shown.read().await.get(&metric_id).copied()
    }

    pub async fn remember(&self, metric_id: DbId, pair: UnorderedPair) {
        self.last_shown.write().await.insert(metric_id, pair);
    }

    /// Forget the proposal for `metric_id` after a record or undo.
    pub async fn forget(&self, metric_id: DbId) {
        self.last_shown.write().await.remove(&metric_id);
    }
}
