//! Board and note types
//!
//! These are the valid, fully typed shapes. Anything read back from storage
//! goes through [`super::repair`] before it becomes one of these.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::consts::{DEFAULT_NOTE_SIZE, DEFAULT_Z_INDEX};

/// Color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Note background: one of the palette tokens or any CSS color the user picked.
///
/// Serialized as the raw CSS string, so unknown values survive untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum NoteColor {
    #[default]
    Yellow,
    Blue,
    Green,
    Pink,
    Purple,
    Orange,
    Custom(String),
}

impl NoteColor {
    /// Palette offered in the note menu, in display order
    pub const PALETTE: [NoteColor; 6] = [
        NoteColor::Yellow,
        NoteColor::Blue,
        NoteColor::Green,
        NoteColor::Pink,
        NoteColor::Purple,
        NoteColor::Orange,
    ];

    pub fn as_css(&self) -> &str {
        match self {
            NoteColor::Yellow => "var(--note-yellow)",
            NoteColor::Blue => "var(--note-blue)",
            NoteColor::Green => "var(--note-green)",
            NoteColor::Pink => "var(--note-pink)",
            NoteColor::Purple => "var(--note-purple)",
            NoteColor::Orange => "var(--note-orange)",
            NoteColor::Custom(css) => css,
        }
    }

    /// Whether the color follows the active theme
    pub fn is_themed(&self) -> bool {
        !matches!(self, NoteColor::Custom(_))
    }
}

impl From<String> for NoteColor {
    fn from(css: String) -> Self {
        NoteColor::PALETTE
            .into_iter()
            .find(|c| c.as_css() == css)
            .unwrap_or(NoteColor::Custom(css))
    }
}

impl From<NoteColor> for String {
    fn from(color: NoteColor) -> Self {
        match color {
            NoteColor::Custom(css) => css,
            themed => themed.as_css().to_string(),
        }
    }
}

/// A single sticky note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Rich text markup from the editable surface
    pub content: String,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub color: NoteColor,
    /// Stacking order, higher draws on top
    pub z_index: i64,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
    /// Fields this version doesn't know about, written back as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Note {
    /// Empty note at the origin with default size and color
    pub fn new(id: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            content: String::new(),
            x: 0,
            y: 0,
            width: DEFAULT_NOTE_SIZE,
            height: DEFAULT_NOTE_SIZE,
            color: NoteColor::default(),
            z_index: DEFAULT_Z_INDEX,
            created_at,
            updated_at: None,
            extra: Map::new(),
        }
    }

    /// Copy under a new identity, placed at `(x, y)`
    pub fn copy_as(&self, id: String, created_at: i64, x: i64, y: i64) -> Self {
        Self {
            id,
            x,
            y,
            created_at,
            ..self.clone()
        }
    }
}

/// Field subset for `update_note`. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub x: Option<i64>,
    pub y: Option<i64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color: Option<NoteColor>,
    pub z_index: Option<i64>,
}

impl NotePatch {
    pub fn position(x: i64, y: i64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn size(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the present fields into `note`
    pub fn apply(self, note: &mut Note) {
        if let Some(title) = self.title {
            note.title = title;
        }
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(x) = self.x {
            note.x = x;
        }
        if let Some(y) = self.y {
            note.y = y;
        }
        if let Some(width) = self.width {
            note.width = width;
        }
        if let Some(height) = self.height {
            note.height = height;
        }
        if let Some(color) = self.color {
            note.color = color;
        }
        if let Some(z_index) = self.z_index {
            note.z_index = z_index;
        }
    }
}

/// A named collection of notes (a "tab" in the UI)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub title: String,
    /// Creation order; display position comes from each note's x/y
    pub notes: Vec<Note>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Board {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            notes: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    pub fn note_mut(&mut self, id: &str) -> Option<&mut Note> {
        self.notes.iter_mut().find(|n| n.id == id)
    }

    /// Highest z-index on the board, never below 1
    pub fn max_z_index(&self) -> i64 {
        self.notes
            .iter()
            .map(|n| n.z_index)
            .fold(DEFAULT_Z_INDEX, i64::max)
    }
}

/// Root persisted object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub active_tab_id: Option<String>,
    pub tabs: Vec<Board>,
    pub theme: Theme,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AppState {
    pub fn tab(&self, id: &str) -> Option<&Board> {
        self.tabs.iter().find(|t| t.id == id)
    }

    pub fn tab_mut(&mut self, id: &str) -> Option<&mut Board> {
        self.tabs.iter_mut().find(|t| t.id == id)
    }

    pub fn active_tab(&self) -> Option<&Board> {
        self.active_tab_id.as_deref().and_then(|id| self.tab(id))
    }

    pub fn active_tab_mut(&mut self) -> Option<&mut Board> {
        let id = self.active_tab_id.clone()?;
        self.tab_mut(&id)
    }

    /// Whether any board holds a note with this id
    pub fn has_note_id(&self, id: &str) -> bool {
        self.tabs.iter().any(|t| t.note(id).is_some())
    }

    pub fn note_count(&self) -> usize {
        self.tabs.iter().map(|t| t.notes.len()).sum()
    }
}
