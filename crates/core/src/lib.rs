//! Domain logic for pairwise image ranking.
//!
//! Everything in this crate is pure: no I/O, no clocks, no randomness.
//! Persistence lives in `mira-db` and transport in `mira-api`.

pub mod comparison;
pub mod convergence;
pub mod error;
pub mod import;
pub mod leaderboard;
pub mod metric;
pub mod pagination;
pub mod pairing;
pub mod rating;
pub mod types;
