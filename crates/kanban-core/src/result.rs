use crate::error::KanbanError;

pub type KanbanResult<T> = Result<T, KanbanError>;

/// Turns a missing lookup into the shared NotFound error.
pub trait OptionExt<T> {
    fn or_not_found(self, kind: &str) -> KanbanResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, kind: &str) -> KanbanResult<T> {
        self.ok_or_else(|| KanbanError::not_found(kind))
    }
}
