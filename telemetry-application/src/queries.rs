// Read-side use cases

pub mod anomaly_queries;
pub mod event_queries;
pub mod log_queries;
pub mod stats_queries;

pub use anomaly_queries::*;
pub use event_queries::*;
pub use log_queries::*;
pub use stats_queries::*;
