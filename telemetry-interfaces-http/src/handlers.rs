pub mod anomaly_handlers;
pub mod ingest_handlers;
pub mod ops_handlers;
pub mod query_handlers;
pub mod stats_handlers;
pub mod store_handlers;

pub use anomaly_handlers::*;
pub use ingest_handlers::*;
pub use ops_handlers::*;
pub use query_handlers::*;
pub use stats_handlers::*;
pub use store_handlers::*;
