// Write-side use cases

pub mod anomaly_commands;
pub mod persist_commands;
pub mod publish_commands;
pub mod stats_commands;

pub use anomaly_commands::*;
pub use persist_commands::*;
pub use publish_commands::*;
pub use stats_commands::*;
