// Domain entities

pub mod anomaly;
pub mod envelope;
pub mod event;
pub mod requests;
pub mod runtime_config;
pub mod statistics;

pub use anomaly::*;
pub use envelope::*;
pub use event::*;
pub use requests::*;
pub use runtime_config::*;
pub use statistics::*;
