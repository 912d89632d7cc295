pub mod metrics;
pub mod nudges;
