use crate::cli::{CardAction, CardCreateArgs, CardUpdateArgs};
use crate::context::CliContext;
use crate::output;
use chrono::{DateTime, NaiveDate, Utc};
use kanban_domain::{CardPriority, CardUpdate, FieldUpdate, KanbanOperations, NewCard};
use std::collections::BTreeSet;

pub async fn handle(ctx: &CliContext, action: CardAction) -> anyhow::Result<()> {
    let user = ctx.user()?;
    match action {
        CardAction::Create(args) => {
            let column_id = args.column_id;
            let card = ctx
                .service
                .create_card(user, column_id, new_card(args)?)
                .await?;
            output::output_success(&card)
        }
        CardAction::Get { id } => {
            let card = ctx.service.get_card(user, id).await?;
            output::output_success(&card)
        }
        CardAction::Update(args) => {
            let id = args.id;
            let card = ctx.service.update_card(user, id, card_update(args)?).await?;
            output::output_success(&card)
        }
        CardAction::Move {
            id,
            column_id,
            position,
        } => {
            // Out-of-range targets are clamped to the end of the column.
            let position = position.unwrap_or(i32::MAX);
            let moved = ctx.service.move_card(user, id, column_id, position).await?;
            output::output_success(&moved)
        }
        CardAction::Reorder { column_id, ids } => {
            let cards = ctx.service.reorder_cards(user, column_id, ids).await?;
            output::output_list(cards)
        }
        CardAction::Archive { id } => {
            let card = ctx.service.archive_card(user, id).await?;
            output::output_success(&card)
        }
        CardAction::Restore { id } => {
            let card = ctx.service.restore_card(user, id).await?;
            output::output_success(&card)
        }
        CardAction::Delete { id, archived } => {
            let removal = if archived {
                ctx.service.delete_archived_card(user, id).await?
            } else {
                ctx.service.delete_card(user, id).await?
            };
            output::output_success(&removal)
        }
    }
}

fn new_card(args: CardCreateArgs) -> anyhow::Result<NewCard> {
    Ok(NewCard {
        title: args.title,
        description: args.description,
        priority: args
            .priority
            .as_deref()
            .map(str::parse::<CardPriority>)
            .transpose()?,
        tags: tag_set(args.tags),
        deadline: args.deadline.as_deref().map(parse_deadline).transpose()?,
    })
}

fn card_update(args: CardUpdateArgs) -> anyhow::Result<CardUpdate> {
    let description = if args.clear_description {
        FieldUpdate::Clear
    } else {
        args.description.map(FieldUpdate::Set).unwrap_or_default()
    };
    let deadline = if args.clear_deadline {
        FieldUpdate::Clear
    } else {
        match args.deadline.as_deref() {
            Some(raw) => FieldUpdate::Set(parse_deadline(raw)?),
            None => FieldUpdate::NoChange,
        }
    };
    Ok(CardUpdate {
        title: args.title,
        description,
        priority: args
            .priority
            .as_deref()
            .map(str::parse::<CardPriority>)
            .transpose()?,
        tags: args.tags.map(tag_set),
        deadline,
    })
}

fn tag_set(tags: Vec<String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Accepts RFC 3339 or a bare date, which means midnight UTC.
fn parse_deadline(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow::anyhow!("Invalid deadline '{}': use RFC 3339 or YYYY-MM-DD", raw))?;
    date.and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| anyhow::anyhow!("Invalid deadline '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use uuid::Uuid;

    fn update_args() -> CardUpdateArgs {
        CardUpdateArgs {
            id: Uuid::new_v4(),
            title: None,
            description: None,
            clear_description: false,
            priority: None,
            tags: None,
            deadline: None,
            clear_deadline: false,
        }
    }

    #[test]
    fn test_parse_bare_date() {
        let at = parse_deadline("2025-03-14").unwrap();
        assert_eq!((at.year(), at.month(), at.day()), (2025, 3, 14));
        assert_eq!(at.hour(), 0);
    }

    #[test]
    fn test_parse_rfc3339_normalises_to_utc() {
        let at = parse_deadline("2025-03-14T10:00:00+02:00").unwrap();
        assert_eq!(at.hour(), 8);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_deadline("next tuesday").is_err());
    }

    #[test]
    fn test_update_clear_flags() {
        let update = card_update(CardUpdateArgs {
            clear_description: true,
            clear_deadline: true,
            ..update_args()
        })
        .unwrap();
        assert_eq!(update.description, FieldUpdate::Clear);
        assert_eq!(update.deadline, FieldUpdate::Clear);
    }

    #[test]
    fn test_update_parses_priority_and_tags() {
        let update = card_update(CardUpdateArgs {
            priority: Some("high".to_string()),
            tags: Some(vec![" ui ".to_string(), String::new(), "api".to_string()]),
            ..update_args()
        })
        .unwrap();
        assert_eq!(update.priority, Some(CardPriority::High));
        let tags: Vec<_> = update.tags.unwrap().into_iter().collect();
        assert_eq!(tags, vec!["api", "ui"]);
        assert_eq!(update.description, FieldUpdate::NoChange);
    }

    #[test]
    fn test_unknown_priority_is_rejected() {
        let result = card_update(CardUpdateArgs {
            priority: Some("urgent".to_string()),
            ..update_args()
        });
        assert!(result.is_err());
    }
}
