//! StickyDraft - browser-local sticky-note boards
//!
//! Core modules:
//! - `store`: Board store (single source of truth, load-time repair)
//! - `persistence`: Board blob encoding
//! - `platform`: Storage, clock and id seams (LocalStorage on web)
//! - `settings`: Store tunables, persisted separately

pub mod error;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod store;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{Result, StoreError};
pub use settings::Settings;
pub use store::{AppState, Board, BoardStore, LoadOutcome, Note, NoteColor, NotePatch, Theme};

/// Store constants
pub mod consts {
    /// Key of the board blob in the persistent medium
    pub const STORAGE_KEY: &str = "stickydraft_data_v2";
    /// Key of the settings blob
    pub const SETTINGS_KEY: &str = "stickydraft_settings";

    /// Width and height of a new note, in pixels
    pub const DEFAULT_NOTE_SIZE: u32 = 260;
    /// Lowest stacking order a note can report
    pub const DEFAULT_Z_INDEX: i64 = 1;
}
