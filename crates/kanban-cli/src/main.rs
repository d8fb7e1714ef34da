mod cli;
mod context;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use context::CliContext;
use kanban_core::{AppConfig, KanbanError};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        let message = match e.downcast_ref::<KanbanError>() {
            Some(
                kanban @ (KanbanError::NotFound(_)
                | KanbanError::InvalidState(_)
                | KanbanError::Conflict(_)
                | KanbanError::Validation(_)),
            ) => kanban.public_message(),
            _ => e.to_string(),
        };
        tracing::debug!("Command failed: {:#}", e);
        output::output_error(&message);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "kanban", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = AppConfig::load();
    context::apply_flags(&mut config, cli.data, cli.storage)?;
    kanban_core::init_logging(&config.logging)?;

    let ctx = CliContext::open(&config, cli.user).await?;

    match cli.command {
        Commands::User(cmd) => handlers::user::handle(&ctx, cmd.action).await,
        Commands::Board(cmd) => handlers::board::handle(&ctx, cmd.action).await,
        Commands::Column(cmd) => handlers::column::handle(&ctx, cmd.action).await,
        Commands::Card(cmd) => handlers::card::handle(&ctx, cmd.action).await,
        Commands::Attachment(cmd) => handlers::attachment::handle(&ctx, cmd.action).await,
        Commands::Completions { .. } => Ok(()),
    }
}
