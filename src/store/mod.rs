//! Board store
//!
//! Single source of truth for boards and notes. The view layer reads from
//! the store and routes every change through its operations, which:
//! - Persist before returning (write-through, no batching)
//! - Treat unknown board/note ids as no-ops
//! - Never leave the state without a board or with a dangling active tab

pub mod board_store;
pub mod model;
pub mod repair;

pub use board_store::{BoardStore, LoadOutcome};
pub use model::{AppState, Board, Note, NoteColor, NotePatch, Theme};
pub use repair::RepairReport;
