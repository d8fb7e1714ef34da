use crate::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_COLUMNS: [&str; 3] = ["To Do", "In Progress", "Done"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Memory,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = KanbanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(KanbanError::Validation(format!(
                "Unknown storage backend: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("kanban.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Columns created together with every new board, in display order.
    #[serde(default = "default_columns")]
    pub default_columns: Vec<String>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            default_columns: default_columns(),
        }
    }
}

fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub logging: LogConfig,
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/kanban/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("kanban/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("kanban\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Loads the user config, falling back to defaults when the file is
    /// missing or unreadable, then applies environment overrides.
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .filter(|path| path.exists())
            .and_then(|path| match Self::load_from(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!("Ignoring config at {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();
        config.apply_env();
        config
    }

    pub fn load_from(path: &Path) -> KanbanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> KanbanResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| KanbanError::Validation(e.to_string()))?;
        if config.board.default_columns.iter().any(|c| c.trim().is_empty()) {
            return Err(KanbanError::Validation(
                "Default column titles must not be empty".to_string(),
            ));
        }
        Ok(config)
    }

    fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("KANBAN_DATA").ok(),
            std::env::var("KANBAN_STORAGE").ok(),
            std::env::var("KANBAN_LOG").ok(),
        );
    }

    fn apply_overrides(
        &mut self,
        data: Option<String>,
        storage: Option<String>,
        log: Option<String>,
    ) {
        if let Some(path) = data.filter(|p| !p.is_empty()) {
            self.storage.path = PathBuf::from(path);
        }
        if let Some(backend) = storage {
            match backend.parse() {
                Ok(backend) => self.storage.backend = backend,
                Err(e) => tracing::warn!("{}", e),
            }
        }
        if let Some(level) = log.filter(|l| !l.is_empty()) {
            self.logging.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(
            config.board.default_columns,
            vec!["To Do", "In Progress", "Done"]
        );
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [storage]
            backend = "sqlite"
            path = "/tmp/board.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.path, PathBuf::from("/tmp/board.db"));
        assert_eq!(config.board.default_columns.len(), 3);
    }

    #[test]
    fn test_empty_default_column_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [board]
            default_columns = ["Backlog", " "]
            "#,
        );
        assert!(matches!(result, Err(KanbanError::Validation(_))));
    }

    #[test]
    fn test_invalid_toml_is_validation_error() {
        let result = AppConfig::from_toml("[storage\nbackend =");
        assert!(matches!(result, Err(KanbanError::Validation(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_overrides() {
        let mut config = AppConfig::default();
        config.apply_overrides(
            Some("board.db".to_string()),
            Some("SQLite".to_string()),
            Some("info".to_string()),
        );
        assert_eq!(config.storage.path, PathBuf::from("board.db"));
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.logging.level, "info");

        config.apply_overrides(None, Some("nonsense".to_string()), None);
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
    }
}
