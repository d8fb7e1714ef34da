pub mod attachment;
pub mod board;
pub mod card;
pub mod column;
pub mod events;
pub mod field_update;
pub mod operations;
pub mod ownership;
pub mod position;
pub mod user;
pub mod validation;

pub use attachment::{Attachment, AttachmentId, NewAttachment, ALLOWED_MIME_TYPES, MAX_FILE_SIZE};
pub use board::{Board, BoardId, BoardSummary, BoardUpdate, BoardView, ColumnView, NewBoard};
pub use card::{Card, CardId, CardPriority, CardUpdate, NewCard};
pub use column::{Column, ColumnId};
pub use events::{ChangeEvent, ChangeNotifier, ChangeOperation, ChangePayload, EntityKind};
pub use field_update::FieldUpdate;
pub use operations::{CardMove, KanbanOperations, Removal};
pub use ownership::{OwnedAttachment, OwnedBoard, OwnedCard, OwnedColumn};
pub use position::{Position, PositionRange, Shift};
pub use user::{NewUser, User, UserId};
