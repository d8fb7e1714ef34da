use kanban_core::{KanbanError, KanbanResult};

use crate::{EntityKind, Position};

/// Trims a title and rejects it when nothing is left. Length limits are
/// enforced by the request validation layer.
pub fn clean_title(kind: EntityKind, title: &str) -> KanbanResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(KanbanError::Validation(format!(
            "{} title is required",
            kind.label()
        )));
    }
    Ok(trimmed.to_string())
}

pub fn ensure_position(position: Position) -> KanbanResult<()> {
    if position < 0 {
        return Err(KanbanError::Validation(format!(
            "Position must not be negative, got {}",
            position
        )));
    }
    Ok(())
}
