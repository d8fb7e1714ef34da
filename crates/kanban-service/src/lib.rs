//! Mutation transactions for kanban boards.
//!
//! [`BoardService`] is the [`kanban_domain::KanbanOperations`]
//! implementation: ownership guard, position ledger, storage transaction
//! and change notification wired together per operation.

pub mod guard;
pub mod locks;
pub mod notifier;
pub mod service;

pub use locks::{ScopeGuard, ScopeLocks};
pub use notifier::{BroadcastNotifier, NoopNotifier, TracingNotifier};
pub use service::BoardService;
