use kanban_core::{AppConfig, StorageBackend};
use kanban_domain::UserId;
use kanban_persistence::open_store;
use kanban_service::{BoardService, TracingNotifier};
use std::path::PathBuf;
use std::sync::Arc;

/// Everything a command handler needs: the service and the acting user.
pub struct CliContext {
    pub service: BoardService,
    user: Option<UserId>,
}

impl CliContext {
    pub async fn open(config: &AppConfig, user: Option<UserId>) -> anyhow::Result<Self> {
        let store = open_store(&config.storage).await?;
        let service = BoardService::new(store, Arc::new(TracingNotifier))
            .with_config(config.board.clone());
        Ok(Self { service, user })
    }

    pub fn user(&self) -> anyhow::Result<UserId> {
        self.user
            .ok_or_else(|| anyhow::anyhow!("--user is required for this command (or set KANBAN_USER)"))
    }
}

/// Command-line flags win over the config file and the environment.
pub fn apply_flags(
    config: &mut AppConfig,
    data: Option<String>,
    storage: Option<String>,
) -> anyhow::Result<()> {
    if let Some(path) = data {
        config.storage.path = PathBuf::from(path);
    }
    if let Some(backend) = storage {
        config.storage.backend = backend.parse::<StorageBackend>()?;
    }
    Ok(())
}
