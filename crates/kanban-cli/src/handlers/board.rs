use crate::cli::{BoardAction, BoardUpdateArgs};
use crate::context::CliContext;
use crate::output;
use kanban_domain::{BoardUpdate, FieldUpdate, KanbanOperations, NewBoard};

pub async fn handle(ctx: &CliContext, action: BoardAction) -> anyhow::Result<()> {
    let user = ctx.user()?;
    match action {
        BoardAction::Create { title, icon } => {
            let board = ctx
                .service
                .create_board(user, NewBoard { title, icon })
                .await?;
            output::output_success(&board)
        }
        BoardAction::List => {
            let boards = ctx.service.list_boards(user).await?;
            output::output_list(boards)
        }
        BoardAction::Get { id } => {
            let board = ctx.service.get_board(user, id).await?;
            output::output_success(&board)
        }
        BoardAction::Update(args) => {
            let id = args.id;
            let board = ctx
                .service
                .update_board(user, id, board_update(args))
                .await?;
            output::output_success(&board)
        }
        BoardAction::Delete { id } => {
            let removal = ctx.service.delete_board(user, id).await?;
            output::output_success(&removal)
        }
        BoardAction::Archived { id } => {
            let cards = ctx.service.list_archived_cards(user, id).await?;
            output::output_list(cards)
        }
    }
}

fn board_update(args: BoardUpdateArgs) -> BoardUpdate {
    let icon = if args.clear_icon {
        FieldUpdate::Clear
    } else {
        args.icon.map(FieldUpdate::Set).unwrap_or_default()
    };
    BoardUpdate {
        title: args.title,
        icon,
        favorite: args.favorite,
    }
}
