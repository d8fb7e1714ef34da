pub mod atomic_writer;
pub mod file_guard;
pub mod json_file_store;
pub mod memory_store;
#[cfg(feature = "sqlite")]
pub mod sqlite_store;
pub mod state;

pub use atomic_writer::AtomicWriter;
pub use file_guard::{FileMetadata, WriterLock};
pub use json_file_store::{JsonEnvelope, JsonFileStore};
pub use memory_store::{MemoryStore, MemoryTransaction};
#[cfg(feature = "sqlite")]
pub use sqlite_store::SqliteStore;
pub use state::StoreState;
