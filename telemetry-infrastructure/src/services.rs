pub mod durable_writer;
pub mod stats_scheduler;

pub use durable_writer::*;
pub use stats_scheduler::*;
