pub mod metrics;
pub mod ranking;
