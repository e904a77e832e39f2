//! Convergence signal for a ranking session.
//!
//! Derived entirely from the current uncertainties, so two metrics in the
//! same state always report the same progress.

use std::collections::HashMap;

use serde::Serialize;

use crate::pairing::{phase_for, Phase, MIN_ITEMS_FOR_PAIR};
use crate::rating::{update, Rating, RatingConfig};

/// Upper bound on simulated updates when estimating remaining work per item.
pub const MAX_SIMULATED_STEPS: u32 = 10_000;

/// Snapshot of how far a metric's ranking has progressed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub total_comparisons: i64,
    pub image_count: i64,
    pub convergence_percent: f64,
    pub estimated_remaining: i64,
    pub phase: Phase,
    pub average_sigma: f64,
    pub target_sigma: f64,
    pub items_converged: i64,
    pub is_converged: bool,
}

/// Map an average uncertainty onto 0-100.
///
/// 0 at the initial sigma, 100 once the average reaches the target, linear
/// in between. Rounded to two decimals.
pub fn convergence_percent(average_sigma: f64, config: &RatingConfig) -> f64 {
    let span = config.initial_sigma - config.target_sigma;
    let ratio = ((config.initial_sigma - average_sigma) / span).clamp(0.0, 1.0);
    (ratio * 10_000.0).round() / 100.0
}

/// Number of even-odds comparisons an item with `sigma` needs to reach the
/// target, assuming its opponents are equally uncertain.
pub fn comparisons_to_target(sigma: f64, config: &RatingConfig) -> u32 {
    let mut a = Rating::new(0.0, sigma);
    let mut steps = 0;
    while a.sigma > config.target_sigma && steps < MAX_SIMULATED_STEPS {
        let (next, _) = update(&a, &a, config);
        if next.sigma >= a.sigma {
            break;
        }
        a = Rating::new(0.0, next.sigma);
        steps += 1;
    }
    steps
}

/// Sum of [`comparisons_to_target`] over all items.
///
/// Items share few distinct sigmas (every import starts at the same value),
/// so each distinct sigma is simulated once.
pub fn total_steps_to_target(sigmas: &[f64], config: &RatingConfig) -> u64 {
    let mut steps_by_sigma: HashMap<u64, u32> = HashMap::new();
    sigmas
        .iter()
        .map(|sigma| {
            let steps = *steps_by_sigma
                .entry(sigma.to_bits())
                .or_insert_with(|| comparisons_to_target(*sigma, config));
            u64::from(steps)
        })
        .sum()
}

/// Build the progress snapshot for a metric.
pub fn compute_progress(
    sigmas: &[f64],
    total_comparisons: i64,
    config: &RatingConfig,
) -> ProgressSnapshot {
    let image_count = sigmas.len() as i64;
    let phase = phase_for(sigmas.iter().copied(), config);
    let items_converged = sigmas
        .iter()
        .filter(|s| **s <= config.target_sigma)
        .count() as i64;
    let average_sigma = if sigmas.is_empty() {
        0.0
    } else {
        sigmas.iter().sum::<f64>() / sigmas.len() as f64
    };

    if sigmas.len() < MIN_ITEMS_FOR_PAIR {
        return ProgressSnapshot {
            total_comparisons,
            image_count,
            convergence_percent: 0.0,
            estimated_remaining: 0,
            phase,
            average_sigma,
            target_sigma: config.target_sigma,
            items_converged,
            is_converged: false,
        };
    }

    let item_steps = total_steps_to_target(sigmas, config);

    ProgressSnapshot {
        total_comparisons,
        image_count,
        convergence_percent: convergence_percent(average_sigma, config),
        // Every comparison advances two items.
        estimated_remaining: item_steps.div_ceil(2) as i64,
        phase,
        average_sigma,
        target_sigma: config.target_sigma,
        items_converged,
        is_converged: phase == Phase::Converged,
    }
}
