// Event log adapters

pub mod memory_log;
pub mod redis_log;

pub use memory_log::*;
pub use redis_log::*;
