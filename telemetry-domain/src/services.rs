// Pure domain services

pub mod anomaly_rules;
pub mod stats_merge;

pub use anomaly_rules::*;
pub use stats_merge::*;
