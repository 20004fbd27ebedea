pub mod memory;
pub mod repo;
pub mod sqlite;

pub use memory::MemoryStore;
pub use repo::KeyValueStore;
pub use sqlite::SqliteStore;
