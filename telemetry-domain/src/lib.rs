// Telemetry Domain Layer

pub mod entities;
pub mod errors;
pub mod ports;
pub mod services;
pub mod utils;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use ports::*;
pub use services::*;
pub use utils::*;
pub use value_objects::*;
