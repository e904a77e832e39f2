//! Next-pair selection for a ranking session.
//!
//! Selection is a pure function of the metric's items and the pair that was
//! shown last; it never mutates anything, so a caller may ask again (skip)
//! as often as it likes.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::rating::{win_probability, Rating, RatingConfig};
use crate::types::DbId;

/// Minimum number of items a metric needs before a pair can be proposed.
pub const MIN_ITEMS_FOR_PAIR: usize = 2;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Which selection policy currently dominates for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Most items are still uncertain; pair the most uncertain ones.
    Exploration,
    /// Most items are settled; refine the order of close neighbours.
    Exploitation,
    /// Every item is at or below the target uncertainty.
    Converged,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exploration => "exploration",
            Self::Exploitation => "exploitation",
            Self::Converged => "converged",
        }
    }
}

/// Derive the phase from the current uncertainties.
///
/// An empty metric reports `Exploration` since nothing has been learned yet.
pub fn phase_for<I>(sigmas: I, config: &RatingConfig) -> Phase
where
    I: IntoIterator<Item = f64>,
{
    let mut total = 0usize;
    let mut above = 0usize;
    for sigma in sigmas {
        total += 1;
        if sigma > config.target_sigma {
            above += 1;
        }
    }

    if total == 0 {
        return Phase::Exploration;
    }
    if above == 0 {
        return Phase::Converged;
    }
    if above as f64 / total as f64 > config.exploration_fraction {
        Phase::Exploration
    } else {
        Phase::Exploitation
    }
}

// ---------------------------------------------------------------------------
// Pair types
// ---------------------------------------------------------------------------

/// One rankable item as seen by the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: DbId,
    pub rating: Rating,
    pub comparison_count: i32,
}

/// A pair of item ids with no orientation; `(a, b)` equals `(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnorderedPair {
    low: DbId,
    high: DbId,
}

impl UnorderedPair {
    pub fn new(a: DbId, b: DbId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn ids(&self) -> (DbId, DbId) {
        (self.low, self.high)
    }
}

/// The selector's answer: two distinct items plus the policy that chose them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProposedPair {
    pub first: DbId,
    pub second: DbId,
    pub phase: Phase,
}

impl ProposedPair {
    pub fn unordered(&self) -> UnorderedPair {
        UnorderedPair::new(self.first, self.second)
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Choose the next pair to compare.
///
/// `avoid` is the pair shown most recently without a decision; it is only
/// returned again when it is the sole possible pair.
pub fn select_pair(
    metric_id: DbId,
    candidates: &[Candidate],
    avoid: Option<UnorderedPair>,
    config: &RatingConfig,
) -> Result<ProposedPair, CoreError> {
    if candidates.len() < MIN_ITEMS_FOR_PAIR {
        return Err(CoreError::NotEnoughItems {
            metric_id,
            count: candidates.len(),
        });
    }

    let phase = phase_for(candidates.iter().map(|c| c.rating.sigma), config);
    let (first, second) = match phase {
        Phase::Exploration => explore(candidates, avoid),
        Phase::Exploitation | Phase::Converged => exploit(candidates, avoid, config),
    };

    Ok(ProposedPair {
        first,
        second,
        phase,
    })
}

fn is_avoided(avoid: Option<UnorderedPair>, a: DbId, b: DbId) -> bool {
    avoid == Some(UnorderedPair::new(a, b))
}

/// Pair the most uncertain item with the next most uncertain one.
fn explore(candidates: &[Candidate], avoid: Option<UnorderedPair>) -> (DbId, DbId) {
    let by_uncertainty = |a: &&Candidate, b: &&Candidate| -> Ordering {
        b.rating
            .sigma
            .total_cmp(&a.rating.sigma)
            .then(a.comparison_count.cmp(&b.comparison_count))
            .then(a.id.cmp(&b.id))
    };

    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by(by_uncertainty);
    let anchor = ordered[0];

    let mut opponents: Vec<&Candidate> = ordered[1..].to_vec();
    opponents.sort_by(|a, b| {
        let gap_a = (a.rating.mu - anchor.rating.mu).abs();
        let gap_b = (b.rating.mu - anchor.rating.mu).abs();
        b.rating
            .sigma
            .total_cmp(&a.rating.sigma)
            .then(gap_a.total_cmp(&gap_b))
            .then(a.comparison_count.cmp(&b.comparison_count))
            .then(a.id.cmp(&b.id))
    });

    let opponent = opponents
        .iter()
        .find(|o| !is_avoided(avoid, anchor.id, o.id))
        .unwrap_or(&opponents[0]);

    (anchor.id, opponent.id)
}

/// Expected information of comparing `a` and `b`: closeness times uncertainty.
fn information_gain(a: &Rating, b: &Rating, beta: f64) -> f64 {
    let p = win_probability(a, b, beta);
    4.0 * p * (1.0 - p) * (a.sigma * a.sigma + b.sigma * b.sigma)
}

/// Pick the most informative pair among strength-sorted neighbours.
fn exploit(
    candidates: &[Candidate],
    avoid: Option<UnorderedPair>,
    config: &RatingConfig,
) -> (DbId, DbId) {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by(|a, b| a.rating.mu.total_cmp(&b.rating.mu).then(a.id.cmp(&b.id)));

    struct Scored {
        gain: f64,
        combined: i64,
        pair: UnorderedPair,
    }

    let better = |x: &Scored, y: &Scored| -> bool {
        x.gain
            .total_cmp(&y.gain)
            .then(y.combined.cmp(&x.combined))
            .then(y.pair.ids().cmp(&x.pair.ids()))
            == Ordering::Greater
    };

    let mut best: Option<Scored> = None;
    let mut fallback: Option<UnorderedPair> = None;

    for (i, a) in ordered.iter().enumerate() {
        let end = (i + config.exploitation_window).min(ordered.len() - 1);
        for b in &ordered[i + 1..=end] {
            let pair = UnorderedPair::new(a.id, b.id);
            if is_avoided(avoid, a.id, b.id) {
                fallback = Some(pair);
                continue;
            }
            let scored = Scored {
                gain: information_gain(&a.rating, &b.rating, config.beta),
                combined: i64::from(a.comparison_count) + i64::from(b.comparison_count),
                pair,
            };
            if best.as_ref().map_or(true, |current| better(&scored, current)) {
                best = Some(scored);
            }
        }
    }

    // Only the avoided pair was available (two items in total).
    let pair = best
        .map(|s| s.pair)
        .or(fallback)
        .unwrap_or_else(|| UnorderedPair::new(ordered[0].id, ordered[1].id));
    pair.ids()
}
