//! Load-time repair
//!
//! A stored blob is first read into the loose `Raw*` shapes, where every
//! field is optional and a malformed field reads as missing. The rules below
//! then turn that into a valid [`AppState`]. Each rule is a plain function
//! with no I/O, so it can be exercised on its own.
//!
//! Rule order: tab list, boards and their notes (ids included), at least
//! one board, theme, active tab.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::model::{AppState, Board, Note, NoteColor, Theme};
use crate::consts::DEFAULT_Z_INDEX;
use crate::platform::IdGenerator;
use crate::settings::Settings;

/// Root object as found in storage
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawState {
    #[serde(default, deserialize_with = "lenient_id")]
    pub active_tab_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tabs: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    pub theme: Option<Theme>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Board as found in storage
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBoard {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub notes: Option<Vec<Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Note as found in storage
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNote {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub x: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub y: Option<i64>,
    #[serde(default, deserialize_with = "lenient_size")]
    pub width: Option<u32>,
    #[serde(default, deserialize_with = "lenient_size")]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub color: Option<NoteColor>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub z_index: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub created_at: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub updated_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A field that fails to parse as `T` reads as missing
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Ids are strings, but a hand-edited blob may carry numbers. Non-zero
/// numbers keep their digits; anything else reads as missing.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let id = match Value::deserialize(deserializer)? {
        Value::String(id) => Some(id),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    };
    Ok(id)
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|f| f.is_finite())
}

/// Integers pass through, other finite numbers are rounded
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_i64()
        .or_else(|| number(&value).map(|f| f.round() as i64)))
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let size = match value.as_u64() {
        Some(n) => u32::try_from(n).ok(),
        None => number(&value)
            .map(f64::round)
            .filter(|f| *f >= 0.0 && *f <= u32::MAX as f64)
            .map(|f| f as u32),
    };
    Ok(size)
}

/// What the repair pass had to change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// `tabs` was missing or not a list
    pub tabs_replaced: bool,
    /// Boards or notes that were not JSON objects
    pub entries_dropped: usize,
    pub board_ids_assigned: usize,
    pub board_titles_defaulted: usize,
    /// Boards whose `notes` was missing or not a list
    pub notes_reset: usize,
    pub note_ids_assigned: usize,
    /// Notes with at least one missing or malformed field
    pub notes_defaulted: usize,
    pub default_board_created: bool,
    pub theme_defaulted: bool,
    pub active_tab_reset: bool,
}

impl RepairReport {
    /// Nothing had to change
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    /// Repairs that are written back immediately. Everything else rides
    /// along with the next mutation.
    pub fn needs_save(&self) -> bool {
        self.default_board_created || self.active_tab_reset
    }
}

/// Hands out fresh ids that collide with nothing already taken
struct IdPool<'a> {
    ids: &'a mut dyn IdGenerator,
    taken: HashSet<String>,
    seen: HashSet<String>,
}

impl<'a> IdPool<'a> {
    fn new(ids: &'a mut dyn IdGenerator, existing: impl IntoIterator<Item = String>) -> Self {
        Self {
            ids,
            taken: existing.into_iter().collect(),
            seen: HashSet::new(),
        }
    }

    /// Keep `candidate` if it is non-empty and not seen yet, else mint one.
    /// Returns the id and whether it was minted.
    fn claim(&mut self, candidate: Option<String>) -> (String, bool) {
        if let Some(id) = candidate.filter(|id| !id.is_empty()) {
            if self.seen.insert(id.clone()) {
                return (id, false);
            }
        }
        loop {
            let id = self.ids.next_id();
            if self.taken.insert(id.clone()) {
                self.seen.insert(id.clone());
                return (id, true);
            }
        }
    }
}

fn object_entries<T: DeserializeOwned>(values: Vec<Value>, report: &mut RepairReport) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| {
            let parsed = if value.is_object() {
                serde_json::from_value(value).ok()
            } else {
                None
            };
            if parsed.is_none() {
                report.entries_dropped += 1;
            }
            parsed
        })
        .collect()
}

/// `tabs` must be a list of objects
pub fn ensure_tab_list(tabs: Option<Vec<Value>>, report: &mut RepairReport) -> Vec<RawBoard> {
    match tabs {
        Some(values) => object_entries(values, report),
        None => {
            report.tabs_replaced = true;
            Vec::new()
        }
    }
}

fn note_from_raw(raw: RawNote, id: String, settings: &Settings, report: &mut RepairReport) -> Note {
    let complete = raw.title.is_some()
        && raw.content.is_some()
        && raw.x.is_some()
        && raw.y.is_some()
        && raw.width.is_some()
        && raw.height.is_some()
        && raw.color.is_some()
        && raw.z_index.is_some()
        && raw.created_at.is_some();
    if !complete {
        report.notes_defaulted += 1;
    }

    Note {
        id,
        title: raw.title.unwrap_or_default(),
        content: raw.content.unwrap_or_default(),
        x: raw.x.unwrap_or(0),
        y: raw.y.unwrap_or(0),
        width: raw.width.unwrap_or(settings.note_width),
        height: raw.height.unwrap_or(settings.note_height),
        color: raw.color.unwrap_or_else(|| settings.default_color.clone()),
        z_index: raw.z_index.unwrap_or(DEFAULT_Z_INDEX),
        created_at: raw.created_at.unwrap_or(0),
        updated_at: raw.updated_at,
        extra: raw.extra,
    }
}

/// Type every board and note. Boards and notes get fresh ids when theirs is
/// missing, empty, or already used by an earlier entry; note ids are unique
/// across all boards.
pub fn repair_boards(
    boards: Vec<RawBoard>,
    ids: &mut dyn IdGenerator,
    settings: &Settings,
    report: &mut RepairReport,
) -> Vec<Board> {
    let mut raw_notes = Vec::with_capacity(boards.len());
    let mut board_ids = Vec::with_capacity(boards.len());
    let mut rest = Vec::with_capacity(boards.len());

    for board in boards {
        let notes: Vec<RawNote> = match board.notes {
            Some(values) => object_entries(values, report),
            None => {
                report.notes_reset += 1;
                Vec::new()
            }
        };
        raw_notes.push(notes);
        board_ids.push(board.id);
        rest.push((board.title, board.extra));
    }

    let existing_boards = board_ids.iter().flatten().cloned().collect::<Vec<_>>();
    let existing_notes = raw_notes
        .iter()
        .flatten()
        .filter_map(|n| n.id.clone())
        .collect::<Vec<_>>();

    let board_ids: Vec<String> = {
        let mut pool = IdPool::new(&mut *ids, existing_boards);
        board_ids
            .into_iter()
            .map(|candidate| {
                let (id, minted) = pool.claim(candidate);
                if minted {
                    report.board_ids_assigned += 1;
                }
                id
            })
            .collect()
    };

    let mut note_pool = IdPool::new(&mut *ids, existing_notes);
    let mut repaired = Vec::with_capacity(board_ids.len());
    for ((id, (title, extra)), notes) in board_ids.into_iter().zip(rest).zip(raw_notes) {
        let notes = notes
            .into_iter()
            .map(|mut raw| {
                let (note_id, minted) = note_pool.claim(raw.id.take());
                if minted {
                    report.note_ids_assigned += 1;
                }
                note_from_raw(raw, note_id, settings, report)
            })
            .collect();

        let title = title.unwrap_or_else(|| {
            report.board_titles_defaulted += 1;
            settings.new_board_title.clone()
        });

        repaired.push(Board {
            id,
            title,
            notes,
            extra,
        });
    }
    repaired
}

/// At least one board must exist; the fallback board becomes active
pub fn ensure_board(
    state: &mut AppState,
    ids: &mut dyn IdGenerator,
    settings: &Settings,
    report: &mut RepairReport,
) {
    if !state.tabs.is_empty() {
        return;
    }
    let id = ids.next_id();
    state
        .tabs
        .push(Board::new(id.clone(), settings.default_board_title.clone()));
    state.active_tab_id = Some(id);
    report.default_board_created = true;
}

pub fn ensure_theme(theme: Option<Theme>, report: &mut RepairReport) -> Theme {
    theme.unwrap_or_else(|| {
        report.theme_defaulted = true;
        Theme::default()
    })
}

/// `activeTabId` must name an existing board, otherwise the first one
pub fn ensure_active_tab(state: &mut AppState, report: &mut RepairReport) {
    if state.active_tab().is_some() {
        return;
    }
    let first = state.tabs.first().map(|t| t.id.clone());
    if first.is_some() {
        log::warn!(
            "Active tab {:?} not found in tabs, resetting to first tab",
            state.active_tab_id
        );
        state.active_tab_id = first;
        report.active_tab_reset = true;
    }
}

/// Run every rule, in order, over a freshly decoded blob
pub fn repair(
    raw: RawState,
    ids: &mut dyn IdGenerator,
    settings: &Settings,
) -> (AppState, RepairReport) {
    let mut report = RepairReport::default();

    let boards = ensure_tab_list(raw.tabs, &mut report);
    let tabs = repair_boards(boards, ids, settings, &mut report);
    let mut state = AppState {
        active_tab_id: raw.active_tab_id,
        tabs,
        theme: Theme::default(),
        extra: raw.extra,
    };
    ensure_board(&mut state, ids, settings, &mut report);
    state.theme = ensure_theme(raw.theme, &mut report);
    ensure_active_tab(&mut state, &mut report);

    (state, report)
}
