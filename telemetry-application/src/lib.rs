// Telemetry Application Layer

pub mod commands;
pub mod error;
pub mod metrics;
pub mod queries;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use error::AppError;
pub use metrics::Metrics;
pub use state::{AnomalyState, LogState, ServiceState, StatsState, StoreState};
