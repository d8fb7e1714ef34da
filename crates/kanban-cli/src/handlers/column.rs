use crate::cli::ColumnAction;
use crate::context::CliContext;
use crate::output;
use kanban_domain::KanbanOperations;

pub async fn handle(ctx: &CliContext, action: ColumnAction) -> anyhow::Result<()> {
    let user = ctx.user()?;
    match action {
        ColumnAction::Create { board_id, title } => {
            let column = ctx.service.create_column(user, board_id, title).await?;
            output::output_success(&column)
        }
        ColumnAction::Rename { id, title } => {
            let column = ctx.service.rename_column(user, id, title).await?;
            output::output_success(&column)
        }
        ColumnAction::Move { id, position } => {
            let columns = ctx.service.move_column(user, id, position).await?;
            output::output_list(columns)
        }
        ColumnAction::Delete { id } => {
            let removal = ctx.service.delete_column(user, id).await?;
            output::output_success(&removal)
        }
        ColumnAction::Reorder { board_id, ids } => {
            let columns = ctx.service.reorder_columns(user, board_id, ids).await?;
            output::output_list(columns)
        }
    }
}
