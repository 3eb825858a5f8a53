pub mod error;
pub mod memory;
pub mod reader;
pub mod run_store;
pub mod sqlite;

pub use error::CacheError;
pub use reader::CacheReader;
pub use run_store::{RunStore, RunSummary};
pub use sqlite::SqliteReader;
