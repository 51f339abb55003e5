pub mod json_files;
pub mod sqlite_event_store;
pub mod store_client;

pub use json_files::*;
pub use sqlite_event_store::*;
pub use store_client::*;
