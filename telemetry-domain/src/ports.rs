// Repository and Log Port Traits (Interfaces)
// Define what the domain needs from infrastructure

pub mod event_log;
pub mod repositories;

pub use event_log::*;
pub use repositories::*;
