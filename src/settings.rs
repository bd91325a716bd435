//! Store settings
//!
//! Persisted separately from board data, under its own key. Every field has
//! a default, so a partial or stale settings blob still loads.

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_NOTE_SIZE, SETTINGS_KEY, STORAGE_KEY};
use crate::error::Result;
use crate::platform::KeyValueStore;
use crate::store::NoteColor;

/// Tunables for the board store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Key the board blob is stored under
    pub storage_key: String,

    // === Board titles ===
    /// First board of a fresh or repaired state
    pub default_board_title: String,
    /// Boards created from the tab bar
    pub new_board_title: String,
    /// The single board left after "reset everything"
    pub cleared_board_title: String,
    /// Appended to duplicated board titles
    pub copy_suffix: String,

    // === Note placement ===
    /// Where moved/copied notes land on the target board
    pub transfer_position: (i64, i64),
    /// Offset applied to duplicated notes
    pub duplicate_offset: i64,

    // === New notes ===
    pub note_width: u32,
    pub note_height: u32,
    pub default_color: NoteColor,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),

            default_board_title: "My Board".to_string(),
            new_board_title: "New Board".to_string(),
            cleared_board_title: "Board 1".to_string(),
            copy_suffix: " (Copy)".to_string(),

            transfer_position: (100, 100),
            duplicate_offset: 20,

            note_width: DEFAULT_NOTE_SIZE,
            note_height: DEFAULT_NOTE_SIZE,
            default_color: NoteColor::Yellow,
        }
    }
}

impl Settings {
    /// Load settings from the medium, falling back to defaults
    pub fn load(storage: &impl KeyValueStore) -> Self {
        match storage.get(SETTINGS_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from storage");
                    return settings;
                }
                Err(e) => log::warn!("Ignoring unreadable settings: {}", e),
            },
            Ok(None) => {}
            Err(e) => log::warn!("Could not read settings: {}", e),
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to the medium
    pub fn save(&self, storage: &mut impl KeyValueStore) -> Result<()> {
        let json = serde_json::to_string(self)?;
        storage.set(SETTINGS_KEY, &json)?;
        log::info!("Settings saved");
        Ok(())
    }
}
