pub mod config;
pub mod error;
pub mod logging;
pub mod result;

pub use config::{AppConfig, BoardConfig, LogConfig, StorageBackend, StorageConfig};
pub use error::KanbanError;
pub use logging::init_logging;
pub use result::{KanbanResult, OptionExt};
