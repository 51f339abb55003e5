// Domain value objects
pub mod event_kind;
pub mod start_position;

pub use event_kind::*;
pub use start_position::*;
