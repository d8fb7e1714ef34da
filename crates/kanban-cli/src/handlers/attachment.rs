use crate::cli::AttachmentAction;
use crate::context::CliContext;
use crate::output;
use kanban_domain::{KanbanOperations, NewAttachment};

pub async fn handle(ctx: &CliContext, action: AttachmentAction) -> anyhow::Result<()> {
    let user = ctx.user()?;
    match action {
        AttachmentAction::Add {
            card_id,
            name,
            mime_type,
            size,
        } => {
            let attachment = ctx
                .service
                .add_attachment(
                    user,
                    card_id,
                    NewAttachment {
                        original_name: name,
                        mime_type,
                        size,
                    },
                )
                .await?;
            output::output_success(&attachment)
        }
        AttachmentAction::List { card_id } => {
            let attachments = ctx.service.list_attachments(user, card_id).await?;
            output::output_list(attachments)
        }
        AttachmentAction::Get { id } => {
            let attachment = ctx.service.get_attachment(user, id).await?;
            output::output_success(&attachment)
        }
        AttachmentAction::Delete { id } => {
            let attachment = ctx.service.delete_attachment(user, id).await?;
            output::output_success(&attachment)
        }
    }
}
