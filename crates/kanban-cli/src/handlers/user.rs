use crate::cli::UserAction;
use crate::context::CliContext;
use crate::output;
use kanban_domain::{KanbanOperations, NewUser};

pub async fn handle(ctx: &CliContext, action: UserAction) -> anyhow::Result<()> {
    match action {
        UserAction::Register {
            email,
            password_hash,
            first_name,
            last_name,
        } => {
            let user = ctx
                .service
                .register_user(NewUser {
                    email,
                    password_hash,
                    first_name,
                    last_name,
                })
                .await?;
            output::output_success(serde_json::json!({
                "id": user.id,
                "email": user.email,
                "display_name": user.display_name(),
                "created_at": user.created_at,
            }))
        }
        UserAction::Find { email } => match ctx.service.find_user_by_email(&email).await? {
            Some(user) => output::output_success(serde_json::json!({
                "id": user.id,
                "email": user.email,
                "display_name": user.display_name(),
                "created_at": user.created_at,
            })),
            None => output::output_error(&format!("No user registered as {}", email.trim())),
        },
    }
}
