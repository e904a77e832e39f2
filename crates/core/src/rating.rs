//! Strength/uncertainty rating model for pairwise comparisons.
//!
//! Uses the Weng-Lin Bayesian approximation with Bradley-Terry full pairing
//! (the two-player form of the model behind OpenSkill). Every item carries a
//! Gaussian belief `N(mu, sigma^2)`. A decision moves the winner's `mu` up and
//! the loser's `mu` down by an amount proportional to `sigma^2` and to how
//! surprising the outcome was, and shrinks both `sigma` values.

use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Strength assigned to freshly imported items.
pub const DEFAULT_INITIAL_MU: f64 = 0.0;
/// Uncertainty assigned to freshly imported items.
pub const DEFAULT_INITIAL_SIGMA: f64 = 1.0;
/// Performance noise shared by every comparison.
pub const DEFAULT_BETA: f64 = 0.5;
/// Lower bound on the variance shrink factor of a single update.
pub const DEFAULT_KAPPA: f64 = 1e-4;
/// Uncertainty never shrinks below this value.
pub const DEFAULT_SIGMA_FLOOR: f64 = 0.05;
/// Uncertainty at which an item counts as converged.
pub const DEFAULT_TARGET_SIGMA: f64 = 0.5;
/// Number of standard deviations subtracted from `mu` for the ordinal score.
pub const DEFAULT_ORDINAL_K: f64 = 3.0;
/// Share of unconverged items above which pair selection explores.
pub const DEFAULT_EXPLORATION_FRACTION: f64 = 0.5;
/// Number of strength-sorted neighbours considered per item when exploiting.
pub const DEFAULT_EXPLOITATION_WINDOW: usize = 5;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters of the rating model and the policies built on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatingConfig {
    pub initial_mu: f64,
    pub initial_sigma: f64,
    pub beta: f64,
    pub kappa: f64,
    pub sigma_floor: f64,
    pub target_sigma: f64,
    pub ordinal_k: f64,
    pub exploration_fraction: f64,
    pub exploitation_window: usize,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            initial_mu: DEFAULT_INITIAL_MU,
            initial_sigma: DEFAULT_INITIAL_SIGMA,
            beta: DEFAULT_BETA,
            kappa: DEFAULT_KAPPA,
            sigma_floor: DEFAULT_SIGMA_FLOOR,
            target_sigma: DEFAULT_TARGET_SIGMA,
            ordinal_k: DEFAULT_ORDINAL_K,
            exploration_fraction: DEFAULT_EXPLORATION_FRACTION,
            exploitation_window: DEFAULT_EXPLOITATION_WINDOW,
        }
    }
}

impl RatingConfig {
    /// Check the parameters are mutually consistent.
    ///
    /// Requires `0 < sigma_floor < target_sigma < initial_sigma`, positive
    /// `beta`, `kappa` in `(0, 1)`, non-negative `ordinal_k`, an exploration
    /// fraction in `[0, 1]`, and a window of at least one neighbour.
    pub fn validate(&self) -> Result<(), CoreError> {
        let finite = [
            self.initial_mu,
            self.initial_sigma,
            self.beta,
            self.kappa,
            self.sigma_floor,
            self.target_sigma,
            self.ordinal_k,
            self.exploration_fraction,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            return Err(CoreError::Validation(
                "Rating parameters must be finite numbers".to_string(),
            ));
        }
        if !(self.sigma_floor > 0.0
            && self.sigma_floor < self.target_sigma
            && self.target_sigma < self.initial_sigma)
        {
            return Err(CoreError::Validation(format!(
                "Expected 0 < sigma_floor ({}) < target_sigma ({}) < initial_sigma ({})",
                self.sigma_floor, self.target_sigma, self.initial_sigma
            )));
        }
        if self.beta <= 0.0 {
            return Err(CoreError::Validation(format!(
                "beta must be positive, got {}",
                self.beta
            )));
        }
        if !(self.kappa > 0.0 && self.kappa < 1.0) {
            return Err(CoreError::Validation(format!(
                "kappa must be in (0, 1), got {}",
                self.kappa
            )));
        }
        if self.ordinal_k < 0.0 {
            return Err(CoreError::Validation(format!(
                "ordinal_k must not be negative, got {}",
                self.ordinal_k
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration_fraction) {
            return Err(CoreError::Validation(format!(
                "exploration_fraction must be in [0, 1], got {}",
                self.exploration_fraction
            )));
        }
        if self.exploitation_window == 0 {
            return Err(CoreError::Validation(
                "exploitation_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The rating every newly imported item starts with.
    pub fn initial_rating(&self) -> Rating {
        Rating {
            mu: self.initial_mu,
            sigma: self.initial_sigma,
        }
    }
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

/// Gaussian belief about an item's strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rating {
    pub mu: f64,
    pub sigma: f64,
}

impl Rating {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Conservative score used for ordering: `mu - k * sigma`.
    pub fn ordinal(&self, k: f64) -> f64 {
        self.mu - k * self.sigma
    }
}

/// Normalising scale `c` shared by both sides of a comparison.
fn pair_scale(a: &Rating, b: &Rating, beta: f64) -> f64 {
    (a.sigma * a.sigma + b.sigma * b.sigma + 2.0 * beta * beta).sqrt()
}

/// Probability that `a` beats `b` under the current beliefs.
pub fn win_probability(a: &Rating, b: &Rating, beta: f64) -> f64 {
    let c = pair_scale(a, b, beta);
    1.0 / (1.0 + ((b.mu - a.mu) / c).exp())
}

/// Apply one decided comparison and return the new `(winner, loser)` ratings.
///
/// Both sigmas are non-increasing and never fall below `sigma_floor`
/// (an item already at or below the floor keeps its sigma).
pub fn update(winner: &Rating, loser: &Rating, config: &RatingConfig) -> (Rating, Rating) {
    let c = pair_scale(winner, loser, config.beta);
    let p_win = win_probability(winner, loser, config.beta);
    let p_lose = 1.0 - p_win;

    let winner_var = winner.sigma * winner.sigma;
    let loser_var = loser.sigma * loser.sigma;

    let new_winner_mu = winner.mu + winner_var / c * (1.0 - p_win);
    let new_loser_mu = loser.mu - loser_var / c * p_lose;

    let shrink = |sigma: f64, var: f64| -> f64 {
        let gamma = sigma / c;
        let delta = gamma * var / (c * c) * p_win * p_lose;
        let shrunk = sigma * (1.0 - delta).max(config.kappa).sqrt();
        shrunk.max(config.sigma_floor).min(sigma)
    };

    (
        Rating::new(new_winner_mu, shrink(winner.sigma, winner_var)),
        Rating::new(new_loser_mu, shrink(loser.sigma, loser_var)),
    )
}
