pub mod config;
pub mod event_log;
pub mod repositories;
pub mod services;
pub mod utils;

pub use config::*;
pub use event_log::*;
pub use repositories::*;
pub use services::*;
pub use utils::*;
