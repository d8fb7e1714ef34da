use thiserror::Error;

#[derive(Error, Debug)]
pub enum KanbanError {
    /// The entity does not exist, or the acting user does not own it.
    /// Both cases deliberately share this variant.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lifecycle precondition failed, e.g. archiving an archived card.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A concurrent writer changed the scope underneath this operation.
    /// The whole request may be retried.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KanbanError {
    pub fn not_found(kind: &str) -> Self {
        Self::NotFound(format!("{} not found", kind))
    }

    /// Only write conflicts are worth replaying; every other failure
    /// would fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Message safe to hand to a client. Infrastructure errors are
    /// collapsed so that paths, SQL and ids do not leak.
    pub fn public_message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::InvalidState(msg)
            | Self::Conflict(msg)
            | Self::Validation(msg) => msg.clone(),
            Self::Database(_) | Self::Io(_) | Self::Serialization(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}
