//! Board store lifecycle, queries and mutations

use super::model::{AppState, Board, Note, NotePatch, Theme};
use super::repair::{self, RepairReport};
use crate::error::Result;
use crate::persistence::{self, Decoded};
use crate::platform::{Clock, IdGenerator, KeyValueStore, RandomIds, SystemClock};
use crate::settings::Settings;

/// How `load()` obtained the current state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was stored; default state created and saved
    Fresh,
    /// Stored blob was unreadable; default state created and saved
    Recovered,
    /// Stored blob was read, with whatever repairs it needed
    Loaded(RepairReport),
}

/// Owns the application state and its persistent medium
pub struct BoardStore<S: KeyValueStore> {
    storage: S,
    settings: Settings,
    clock: Box<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    state: AppState,
}

impl<S: KeyValueStore> BoardStore<S> {
    /// Store backed by the real clock and random ids. State is empty until
    /// [`load`](Self::load) runs.
    pub fn new(storage: S, settings: Settings) -> Self {
        Self::with_collaborators(storage, settings, SystemClock::new(), RandomIds::from_entropy())
    }

    pub fn with_collaborators(
        storage: S,
        settings: Settings,
        clock: impl Clock + 'static,
        ids: impl IdGenerator + 'static,
    ) -> Self {
        Self {
            storage,
            settings,
            clock: Box::new(clock),
            ids: Box::new(ids),
            state: AppState::default(),
        }
    }

    /// Construct and load in one step
    pub fn open(storage: S, settings: Settings) -> Self {
        let mut store = Self::new(storage, settings);
        store.load();
        store
    }

    // === Lifecycle ===

    /// Read the stored blob, repairing it or starting fresh.
    ///
    /// Only the fresh/recovered paths, a created default board, or a reset
    /// active tab write back. Valid stored data is left untouched.
    pub fn load(&mut self) -> LoadOutcome {
        let blob = match self.storage.get(&self.settings.storage_key) {
            Ok(blob) => blob,
            Err(e) => {
                log::error!("Data load error: {}", e);
                None
            }
        };

        match persistence::decode(blob.as_deref()) {
            Decoded::Absent => {
                log::info!("No saved boards, starting fresh");
                self.reset();
                LoadOutcome::Fresh
            }
            Decoded::Malformed(e) => {
                log::error!("Data load error: {}", e);
                self.reset();
                LoadOutcome::Recovered
            }
            Decoded::Parsed(raw) => {
                let (state, report) = repair::repair(raw, self.ids.as_mut(), &self.settings);
                self.state = state;
                if !report.is_clean() {
                    log::warn!("Repaired stored boards: {:?}", report);
                }
                if report.needs_save() {
                    self.persist();
                }
                log::info!(
                    "Loaded {} boards, {} notes",
                    self.state.tabs.len(),
                    self.state.note_count()
                );
                LoadOutcome::Loaded(report)
            }
        }
    }

    /// Write the full state to the medium, replacing the previous blob
    pub fn save(&mut self) -> Result<()> {
        let json = persistence::encode(&self.state)?;
        self.storage.set(&self.settings.storage_key, &json)
    }

    /// Discard everything and start over with one empty board
    pub fn reset(&mut self) {
        let id = self.ids.next_id();
        self.state = AppState {
            active_tab_id: Some(id.clone()),
            tabs: vec![Board::new(id, self.settings.default_board_title.clone())],
            theme: Theme::Light,
            extra: Default::default(),
        };
        log::info!("Board data reset");
        self.persist();
    }

    /// Wipe the medium, keep only the theme, and start from a single board
    pub fn clear_all(&mut self) {
        if let Err(e) = self.storage.clear() {
            log::error!("Failed to clear storage: {}", e);
        }
        let id = self.fresh_board_id();
        self.state = AppState {
            active_tab_id: Some(id.clone()),
            tabs: vec![Board::new(id, self.settings.cleared_board_title.clone())],
            theme: self.state.theme,
            extra: Default::default(),
        };
        log::info!("Everything reset");
        self.persist();
    }

    // === Queries ===

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn tabs(&self) -> &[Board] {
        &self.state.tabs
    }

    pub fn theme(&self) -> Theme {
        self.state.theme
    }

    pub fn active_tab_id(&self) -> Option<&str> {
        self.state.active_tab_id.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn get_tab(&self, id: &str) -> Option<&Board> {
        self.state.tab(id)
    }

    pub fn get_active_tab(&self) -> Option<&Board> {
        self.state.active_tab()
    }

    /// Boards a note can be moved or copied to
    pub fn other_tabs(&self) -> Vec<&Board> {
        self.state
            .tabs
            .iter()
            .filter(|t| Some(t.id.as_str()) != self.active_tab_id())
            .collect()
    }

    /// Top z-index on the active board (at least 1)
    pub fn max_z_index(&self) -> i64 {
        self.get_active_tab().map_or(1, Board::max_z_index)
    }

    // === Boards ===

    /// Append an empty board and make it active
    pub fn create_tab(&mut self, title: Option<&str>) -> String {
        let id = self.fresh_board_id();
        let title = title.map_or_else(|| self.settings.new_board_title.clone(), str::to_string);
        log::debug!("Creating board {} ({})", id, title);
        self.state.tabs.push(Board::new(id.clone(), title));
        self.state.active_tab_id = Some(id.clone());
        self.persist();
        id
    }

    /// Remove a board. The last remaining board can't be deleted.
    ///
    /// Deleting the active board activates its left neighbour, or the right
    /// one when it was first.
    pub fn delete_tab(&mut self, id: &str) -> bool {
        if self.state.tabs.len() <= 1 {
            log::warn!("Refusing to delete the last board");
            return false;
        }
        let Some(idx) = self.state.tabs.iter().position(|t| t.id == id) else {
            return false;
        };

        if self.active_tab_id() == Some(id) {
            let next = if idx > 0 { idx - 1 } else { idx + 1 };
            self.state.active_tab_id = Some(self.state.tabs[next].id.clone());
        }
        self.state.tabs.remove(idx);
        log::debug!("Deleted board {}", id);
        self.persist();
        true
    }

    /// Deep copy of a board with fresh board and note ids, made active
    pub fn duplicate_tab(&mut self, id: &str) -> Option<String> {
        let original = self.state.tab(id)?.clone();
        let now = self.clock.now_millis();

        let mut notes = Vec::with_capacity(original.notes.len());
        for note in &original.notes {
            let note_id = self.fresh_note_id();
            notes.push(note.copy_as(note_id, now, note.x, note.y));
        }

        let new_id = self.fresh_board_id();
        self.state.tabs.push(Board {
            id: new_id.clone(),
            title: format!("{}{}", original.title, self.settings.copy_suffix),
            notes,
            extra: original.extra,
        });
        self.state.active_tab_id = Some(new_id.clone());
        log::debug!("Duplicated board {} as {}", id, new_id);
        self.persist();
        Some(new_id)
    }

    /// Switch boards. Returns false when already active or unknown.
    pub fn set_active_tab(&mut self, id: &str) -> bool {
        if self.active_tab_id() == Some(id) {
            return false;
        }
        if self.state.tab(id).is_none() {
            log::warn!("Ignoring switch to unknown board {}", id);
            return false;
        }
        self.state.active_tab_id = Some(id.to_string());
        self.persist();
        true
    }

    pub fn update_tab_title(&mut self, id: &str, title: &str) -> bool {
        let Some(tab) = self.state.tab_mut(id) else {
            return false;
        };
        tab.title = title.to_string();
        self.persist();
        true
    }

    // === Notes ===

    /// Build an unsaved note at `(x, y)` on top of the active board's stack
    pub fn new_note(&mut self, x: i64, y: i64) -> Note {
        let mut note = Note::new(self.fresh_note_id(), self.clock.now_millis());
        note.x = x;
        note.y = y;
        note.width = self.settings.note_width;
        note.height = self.settings.note_height;
        note.color = self.settings.default_color.clone();
        note.z_index = self.max_z_index().saturating_add(1);
        note
    }

    /// Create a note centered on `(x, y)` in the active board
    pub fn create_note(&mut self, x: i64, y: i64) -> Option<String> {
        let half_w = i64::from(self.settings.note_width / 2);
        let half_h = i64::from(self.settings.note_height / 2);
        let note = self.new_note(x.saturating_sub(half_w), y.saturating_sub(half_h));
        self.add_note(note)
    }

    /// Append a note to the active board. Returns the id it was stored under.
    pub fn add_note(&mut self, note: Note) -> Option<String> {
        let tab_id = self.state.active_tab_id.clone()?;
        self.add_note_to_tab(&tab_id, note)
    }

    /// Append a note to any board. An empty or already-used id is replaced.
    pub fn add_note_to_tab(&mut self, tab_id: &str, mut note: Note) -> Option<String> {
        self.state.tab(tab_id)?;
        if note.id.is_empty() || self.state.has_note_id(&note.id) {
            let id = self.fresh_note_id();
            log::warn!("Note id {:?} unusable, stored as {}", note.id, id);
            note.id = id;
        }

        let id = note.id.clone();
        self.state.tab_mut(tab_id)?.notes.push(note);
        log::debug!("Added note {} to board {}", id, tab_id);
        self.persist();
        Some(id)
    }

    /// Merge `patch` into a note of the active board and stamp `updatedAt`
    pub fn update_note(&mut self, id: &str, patch: NotePatch) -> bool {
        let now = self.clock.now_millis();
        let Some(note) = self.state.active_tab_mut().and_then(|t| t.note_mut(id)) else {
            return false;
        };
        patch.apply(note);
        note.updated_at = Some(now);
        self.persist();
        true
    }

    /// Remove a note from the active board. An empty id never matches.
    pub fn delete_note(&mut self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        let Some(tab) = self.state.active_tab_mut() else {
            return false;
        };
        let before = tab.notes.len();
        tab.notes.retain(|n| n.id != id);
        if tab.notes.len() == before {
            return false;
        }
        log::debug!("Deleted note {}", id);
        self.persist();
        true
    }

    /// Move a note from the active board to `target_tab_id`, keeping its id
    pub fn move_note(&mut self, note_id: &str, target_tab_id: &str) -> bool {
        if self.state.tab(target_tab_id).is_none() {
            return false;
        }
        let Some(source) = self.state.active_tab_mut() else {
            return false;
        };
        let Some(idx) = source.notes.iter().position(|n| n.id == note_id) else {
            return false;
        };

        let mut note = source.notes.remove(idx);
        (note.x, note.y) = self.settings.transfer_position;
        if let Some(target) = self.state.tab_mut(target_tab_id) {
            target.notes.push(note);
        }
        log::debug!("Moved note {} to board {}", note_id, target_tab_id);
        self.persist();
        true
    }

    /// Copy a note from the active board to `target_tab_id` under a new id
    pub fn copy_note(&mut self, note_id: &str, target_tab_id: &str) -> Option<String> {
        self.state.tab(target_tab_id)?;
        let note = self.get_active_tab()?.note(note_id)?.clone();

        let (x, y) = self.settings.transfer_position;
        let copy = note.copy_as(self.fresh_note_id(), self.clock.now_millis(), x, y);
        let id = copy.id.clone();
        self.state.tab_mut(target_tab_id)?.notes.push(copy);
        log::debug!("Copied note {} to board {} as {}", note_id, target_tab_id, id);
        self.persist();
        Some(id)
    }

    /// Copy a note within the active board, nudged down and right
    pub fn duplicate_note(&mut self, note_id: &str) -> Option<String> {
        let note = self.get_active_tab()?.note(note_id)?.clone();
        let offset = self.settings.duplicate_offset;
        let copy = note.copy_as(
            self.fresh_note_id(),
            self.clock.now_millis(),
            note.x.saturating_add(offset),
            note.y.saturating_add(offset),
        );
        self.add_note(copy)
    }

    /// Raise a note above every other note on the active board
    pub fn bring_to_front(&mut self, note_id: &str) -> bool {
        let max = self.max_z_index();
        let on_top = match self.get_active_tab().and_then(|t| t.note(note_id)) {
            Some(note) => note.z_index == max,
            None => return false,
        };
        if on_top {
            return false;
        }
        self.update_note(
            note_id,
            NotePatch {
                z_index: Some(max.saturating_add(1)),
                ..Default::default()
            },
        )
    }

    // === Global ===

    pub fn toggle_theme(&mut self) -> Theme {
        self.state.theme = self.state.theme.toggled();
        self.persist();
        self.state.theme
    }

    // === Internals ===

    /// Write-through after a mutation. Failures are logged; memory stays
    /// authoritative and the next mutation retries the full write.
    fn persist(&mut self) {
        if let Err(e) = self.save() {
            log::error!("Failed to save boards: {}", e);
        }
    }

    fn fresh_board_id(&mut self) -> String {
        loop {
            let id = self.ids.next_id();
            if self.state.tab(&id).is_none() {
                return id;
            }
        }
    }

    fn fresh_note_id(&mut self) -> String {
        loop {
            let id = self.ids.next_id();
            if !self.state.has_note_id(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::STORAGE_KEY;
    use crate::platform::{ManualClock, MemoryStorage, SequentialIds};
    use crate::store::NoteColor;
    use proptest::prelude::*;
    use proptest::sample::Index;
    use serde_json::json;
    use std::collections::HashSet;

    fn store_on(storage: MemoryStorage) -> BoardStore<MemoryStorage> {
        BoardStore::with_collaborators(
            storage,
            Settings::default(),
            ManualClock::new(1_000),
            SequentialIds::new("id"),
        )
    }

    fn loaded(storage: MemoryStorage) -> BoardStore<MemoryStorage> {
        let mut store = store_on(storage);
        store.load();
        store
    }

    fn seeded(value: serde_json::Value) -> MemoryStorage {
        MemoryStorage::with_entry(STORAGE_KEY, &value.to_string())
    }

    fn note(id: &str, title: &str) -> Note {
        let mut note = Note::new(id, 500);
        note.title = title.to_string();
        note
    }

    /// Two boards, B1 active with notes n1 and n2, B2 empty
    fn two_boards() -> BoardStore<MemoryStorage> {
        let mut b1 = Board::new("B1", "One");
        b1.notes.push(note("n1", "first"));
        b1.notes.push(note("n2", "second"));
        let state = AppState {
            active_tab_id: Some("B1".to_string()),
            tabs: vec![b1, Board::new("B2", "Two")],
            theme: Theme::Light,
            extra: Default::default(),
        };
        loaded(MemoryStorage::with_entry(
            STORAGE_KEY,
            &persistence::encode(&state).unwrap(),
        ))
    }

    fn persisted(store: &BoardStore<MemoryStorage>) -> AppState {
        serde_json::from_str(&store.storage().raw(STORAGE_KEY).unwrap()).unwrap()
    }

    #[test]
    fn test_load_empty_storage() {
        let storage = MemoryStorage::new();
        let mut store = store_on(storage.clone());
        assert_eq!(store.load(), LoadOutcome::Fresh);

        assert_eq!(store.tabs().len(), 1);
        assert_eq!(store.tabs()[0].title, "My Board");
        assert_eq!(store.active_tab_id(), Some(store.tabs()[0].id.as_str()));
        assert_eq!(store.theme(), Theme::Light);
        assert_eq!(storage.writes(), 1);
        assert_eq!(&persisted(&store), store.state());
    }

    #[test]
    fn test_load_empty_tabs_keeps_theme() {
        let storage = seeded(json!({"tabs": [], "theme": "dark"}));
        let store = loaded(storage.clone());

        assert_eq!(store.tabs().len(), 1);
        assert_eq!(store.tabs()[0].title, "My Board");
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.active_tab_id(), Some(store.tabs()[0].id.as_str()));
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn test_load_malformed_recovers() {
        let storage = MemoryStorage::with_entry(STORAGE_KEY, "{\"tabs\": [oops");
        let mut store = store_on(storage.clone());
        assert_eq!(store.load(), LoadOutcome::Recovered);
        assert_eq!(store.tabs().len(), 1);
        assert_eq!(store.theme(), Theme::Light);
        assert_eq!(&persisted(&store), store.state());
    }

    #[test]
    fn test_note_without_id_then_delete() {
        let storage = seeded(json!({
            "activeTabId": "B1",
            "tabs": [{"id": "B1", "title": "One", "notes": [{"title": "A"}]}],
            "theme": "light"
        }));
        let mut store = loaded(storage.clone());
        // Only the id repair fired, which waits for the next mutation
        assert_eq!(storage.writes(), 0);

        let id = store.get_active_tab().unwrap().notes[0].id.clone();
        assert!(!id.is_empty());

        assert!(store.delete_note(&id));
        assert!(store.get_active_tab().unwrap().notes.is_empty());
        assert_eq!(storage.writes(), 1);

        assert!(!store.delete_note(&id));
        assert_eq!(storage.writes(), 1);
    }

    #[test]
    fn test_delete_note_empty_id_is_noop() {
        let mut store = two_boards();
        let writes = store.storage().writes();
        assert!(!store.delete_note(""));
        assert_eq!(store.get_active_tab().unwrap().notes.len(), 2);
        assert_eq!(store.storage().writes(), writes);
    }

    #[test]
    fn test_move_note() {
        let mut store = two_boards();
        assert!(store.move_note("n1", "B2"));

        let b1 = store.get_tab("B1").unwrap();
        assert_eq!(b1.notes.len(), 1);
        assert!(b1.note("n1").is_none());

        let b2 = store.get_tab("B2").unwrap();
        let moved = b2.notes.last().unwrap();
        assert_eq!(moved.id, "n1");
        assert_eq!((moved.x, moved.y), (100, 100));
        assert_eq!(&persisted(&store), store.state());
    }

    #[test]
    fn test_move_note_missing_targets_are_noops() {
        let mut store = two_boards();
        let before = store.state().clone();
        let writes = store.storage().writes();
        assert!(!store.move_note("n1", "nope"));
        assert!(!store.move_note("ghost", "B2"));
        assert_eq!(store.state(), &before);
        assert_eq!(store.storage().writes(), writes);
    }

    #[test]
    fn test_copy_note_leaves_source() {
        let mut store = two_boards();
        let copy_id = store.copy_note("n2", "B2").unwrap();
        assert_ne!(copy_id, "n2");

        let source = store.get_tab("B1").unwrap().note("n2").unwrap().clone();
        let copy = store.get_tab("B2").unwrap().note(&copy_id).unwrap();
        assert_eq!((copy.x, copy.y), (100, 100));
        assert_eq!(copy.title, source.title);
        assert_eq!(copy.created_at, 1_000);
        assert_eq!(source.created_at, 500);
        assert_eq!(store.get_tab("B1").unwrap().notes.len(), 2);

        assert!(store.copy_note("ghost", "B2").is_none());
        assert!(store.copy_note("n2", "nope").is_none());
    }

    #[test]
    fn test_delete_last_tab_refused() {
        let mut store = loaded(MemoryStorage::new());
        let id = store.tabs()[0].id.clone();
        let writes = store.storage().writes();

        assert!(!store.delete_tab(&id));
        assert_eq!(store.tabs().len(), 1);
        assert_eq!(store.storage().writes(), writes);
    }

    #[test]
    fn test_delete_active_tab_shifts_left_then_right() {
        let mut store = two_boards();
        let b3 = store.create_tab(Some("Three"));
        assert_eq!(store.active_tab_id(), Some(b3.as_str()));

        assert!(store.delete_tab(&b3));
        assert_eq!(store.active_tab_id(), Some("B2"));

        store.set_active_tab("B1");
        assert!(store.delete_tab("B1"));
        assert_eq!(store.active_tab_id(), Some("B2"));
        assert_eq!(store.tabs().len(), 1);
    }

    #[test]
    fn test_delete_inactive_tab_keeps_active() {
        let mut store = two_boards();
        assert!(store.delete_tab("B2"));
        assert_eq!(store.active_tab_id(), Some("B1"));
        assert!(!store.delete_tab("B2"));
    }

    #[test]
    fn test_create_tab_defaults() {
        let mut store = two_boards();
        let id = store.create_tab(None);
        let tab = store.get_tab(&id).unwrap();
        assert_eq!(tab.title, "New Board");
        assert!(tab.notes.is_empty());
        assert_eq!(store.tabs().last().unwrap().id, id);
        assert_eq!(store.active_tab_id(), Some(id.as_str()));
    }

    #[test]
    fn test_duplicate_tab_independent() {
        let mut store = two_boards();
        let dup = store.duplicate_tab("B1").unwrap();
        assert_eq!(store.active_tab_id(), Some(dup.as_str()));

        let copy = store.get_tab(&dup).unwrap().clone();
        let source = store.get_tab("B1").unwrap().clone();
        assert_eq!(copy.title, "One (Copy)");
        assert_eq!(copy.notes.len(), 2);

        let source_ids: HashSet<_> = source.notes.iter().map(|n| n.id.clone()).collect();
        assert!(copy.notes.iter().all(|n| !source_ids.contains(&n.id)));
        assert!(copy.notes.iter().all(|n| n.created_at == 1_000));
        assert_eq!(copy.notes[0].title, "first");

        // Editing the copy leaves the source alone
        let copied = copy.notes[0].id.clone();
        assert!(store.update_note(
            &copied,
            NotePatch {
                title: Some("edited".to_string()),
                ..Default::default()
            }
        ));
        assert_eq!(store.get_tab("B1").unwrap().note("n1").unwrap().title, "first");
        assert_eq!(store.get_tab(&dup).unwrap().note(&copied).unwrap().title, "edited");

        assert!(store.duplicate_tab("nope").is_none());
    }

    #[test]
    fn test_set_active_tab() {
        let mut store = two_boards();
        let writes = store.storage().writes();
        assert!(!store.set_active_tab("B1"));
        assert!(!store.set_active_tab("nope"));
        assert_eq!(store.storage().writes(), writes);

        assert!(store.set_active_tab("B2"));
        assert_eq!(store.active_tab_id(), Some("B2"));
        assert_eq!(persisted(&store).active_tab_id.as_deref(), Some("B2"));
    }

    #[test]
    fn test_update_tab_title() {
        let mut store = two_boards();
        assert!(store.update_tab_title("B2", "Ideas"));
        assert_eq!(store.get_tab("B2").unwrap().title, "Ideas");
        assert!(!store.update_tab_title("nope", "x"));
    }

    #[test]
    fn test_update_note_stamps_time() {
        let clock = ManualClock::new(1_000);
        let mut store = BoardStore::with_collaborators(
            MemoryStorage::new(),
            Settings::default(),
            clock.clone(),
            SequentialIds::new("id"),
        );
        store.load();
        let id = store.add_note(note("n1", "a")).unwrap();

        clock.advance(4_000);
        assert!(store.update_note(&id, NotePatch::position(40, 60)));
        let updated = store.get_active_tab().unwrap().note(&id).unwrap();
        assert_eq!((updated.x, updated.y), (40, 60));
        assert_eq!(updated.title, "a");
        assert_eq!(updated.updated_at, Some(5_000));
        assert_eq!(updated.created_at, 500);
    }

    #[test]
    fn test_update_note_only_in_active_tab() {
        let mut store = two_boards();
        store.set_active_tab("B2");
        let writes = store.storage().writes();
        assert!(!store.update_note("n1", NotePatch::size(10, 10)));
        assert_eq!(store.storage().writes(), writes);
    }

    #[test]
    fn test_add_note_to_tab_ignores_active() {
        let mut store = two_boards();
        let id = store.add_note_to_tab("B2", note("n9", "elsewhere")).unwrap();
        assert_eq!(id, "n9");
        assert_eq!(store.get_tab("B2").unwrap().notes.len(), 1);
        assert_eq!(store.active_tab_id(), Some("B1"));
        assert!(store.add_note_to_tab("nope", note("n10", "")).is_none());
    }

    #[test]
    fn test_add_note_replaces_unusable_ids() {
        let mut store = two_boards();
        let dup = store.add_note(note("n1", "clash")).unwrap();
        assert_ne!(dup, "n1");
        let blank = store.add_note(note("", "blank")).unwrap();
        assert!(!blank.is_empty());
        assert_eq!(store.get_active_tab().unwrap().notes.len(), 4);
    }

    #[test]
    fn test_create_note_centered_on_top() {
        let mut store = two_boards();
        store.update_note("n2", NotePatch { z_index: Some(2), ..Default::default() });
        let id = store.create_note(400, 300).unwrap();
        let created = store.get_active_tab().unwrap().note(&id).unwrap();
        assert_eq!((created.x, created.y), (270, 170));
        assert_eq!((created.width, created.height), (260, 260));
        assert_eq!(created.color, NoteColor::Yellow);
        assert_eq!(created.z_index, 3);
        assert_eq!(created.created_at, 1_000);
        assert!(created.title.is_empty());
    }

    #[test]
    fn test_duplicate_note_offsets() {
        let mut store = two_boards();
        store.update_note("n1", NotePatch::position(50, 70));
        let id = store.duplicate_note("n1").unwrap();
        let dup = store.get_active_tab().unwrap().note(&id).unwrap();
        assert_eq!((dup.x, dup.y), (70, 90));
        assert_eq!(dup.title, "first");
        assert!(store.duplicate_note("ghost").is_none());
    }

    #[test]
    fn test_bring_to_front() {
        let mut store = two_boards();
        // Both notes sit at z 1 which is already the top
        assert!(!store.bring_to_front("n1"));
        store.update_note("n2", NotePatch { z_index: Some(4), ..Default::default() });

        assert!(store.bring_to_front("n1"));
        assert_eq!(store.get_active_tab().unwrap().note("n1").unwrap().z_index, 5);
        assert_eq!(store.max_z_index(), 5);
        assert!(!store.bring_to_front("n1"));
        assert!(!store.bring_to_front("ghost"));
    }

    /// Single board B1 holding one note whose stored fields are overridden
    fn extreme_note(fields: serde_json::Value) -> BoardStore<MemoryStorage> {
        let mut stored = json!({
            "id": "n1", "title": "edge", "content": "", "x": 0, "y": 0,
            "width": 260, "height": 260, "color": "var(--note-yellow)",
            "zIndex": 1, "createdAt": 500
        });
        if let (Some(target), Some(source)) = (stored.as_object_mut(), fields.as_object()) {
            target.extend(source.clone());
        }
        loaded(seeded(json!({
            "activeTabId": "B1",
            "tabs": [{"id": "B1", "title": "One", "notes": [stored]}],
            "theme": "light"
        })))
    }

    #[test]
    fn test_create_note_above_max_z_saturates() {
        // Out-of-range numbers load clamped to i64::MAX
        let mut store = extreme_note(json!({"zIndex": 1e300}));
        assert_eq!(store.max_z_index(), i64::MAX);

        let id = store.create_note(10, 10).unwrap();
        assert_eq!(store.get_active_tab().unwrap().note(&id).unwrap().z_index, i64::MAX);
    }

    #[test]
    fn test_create_note_at_min_coordinates_saturates() {
        let mut store = two_boards();
        let id = store.create_note(i64::MIN, i64::MIN).unwrap();
        let created = store.get_active_tab().unwrap().note(&id).unwrap();
        assert_eq!((created.x, created.y), (i64::MIN, i64::MIN));
    }

    #[test]
    fn test_duplicate_note_at_max_position_saturates() {
        let mut store = extreme_note(json!({"x": i64::MAX, "y": i64::MAX}));
        let id = store.duplicate_note("n1").unwrap();
        let dup = store.get_active_tab().unwrap().note(&id).unwrap();
        assert_eq!((dup.x, dup.y), (i64::MAX, i64::MAX));
    }

    #[test]
    fn test_bring_to_front_below_max_z_saturates() {
        let mut store = extreme_note(json!({"zIndex": i64::MAX}));
        let mut low = note("n2", "low");
        low.z_index = 3;
        store.add_note(low);

        assert!(store.bring_to_front("n2"));
        assert_eq!(store.get_active_tab().unwrap().note("n2").unwrap().z_index, i64::MAX);
        assert!(!store.bring_to_front("n1"));
    }

    #[test]
    fn test_other_tabs() {
        let store = two_boards();
        let others: Vec<&str> = store.other_tabs().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(others, vec!["B2"]);
    }

    #[test]
    fn test_toggle_theme_persists() {
        let mut store = two_boards();
        assert_eq!(store.toggle_theme(), Theme::Dark);
        assert_eq!(persisted(&store).theme, Theme::Dark);
        assert_eq!(store.toggle_theme(), Theme::Light);
    }

    #[test]
    fn test_reset() {
        let mut store = two_boards();
        store.toggle_theme();
        store.reset();
        assert_eq!(store.tabs().len(), 1);
        assert_eq!(store.tabs()[0].title, "My Board");
        assert_eq!(store.theme(), Theme::Light);
        assert_eq!(&persisted(&store), store.state());
    }

    #[test]
    fn test_clear_all_keeps_theme() {
        let mut store = two_boards();
        let mut storage = store.storage().clone();
        storage.set("unrelated", "x").unwrap();
        store.toggle_theme();

        store.clear_all();
        assert_eq!(store.tabs().len(), 1);
        assert_eq!(store.tabs()[0].title, "Board 1");
        assert_eq!(store.theme(), Theme::Dark);
        assert_eq!(store.active_tab_id(), Some(store.tabs()[0].id.as_str()));
        assert_eq!(storage.raw("unrelated"), None);
        assert_eq!(&persisted(&store), store.state());
    }

    #[test]
    fn test_active_tab_repair_is_saved() {
        let storage = seeded(json!({
            "activeTabId": "gone",
            "tabs": [{"id": "B1", "title": "One", "notes": []}],
            "theme": "light"
        }));
        let mut store = store_on(storage.clone());
        match store.load() {
            LoadOutcome::Loaded(report) => assert!(report.active_tab_reset),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(storage.writes(), 1);
        assert_eq!(persisted(&store).active_tab_id.as_deref(), Some("B1"));
    }

    #[test]
    fn test_load_valid_state_is_idempotent() {
        let store = two_boards();
        let storage = store.storage().clone();
        assert_eq!(storage.writes(), 0);

        let mut again = store_on(storage.clone());
        assert_eq!(again.load(), LoadOutcome::Loaded(RepairReport::default()));
        assert_eq!(again.state(), store.state());
        assert_eq!(again.load(), LoadOutcome::Loaded(RepairReport::default()));
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn test_unknown_fields_survive_mutation() {
        let storage = seeded(json!({
            "activeTabId": "B1",
            "syncCursor": "abc",
            "tabs": [{"id": "B1", "title": "One", "shared": false, "notes": []}],
            "theme": "light"
        }));
        let mut store = loaded(storage.clone());
        store.toggle_theme();
        let raw: serde_json::Value = serde_json::from_str(&storage.raw(STORAGE_KEY).unwrap()).unwrap();
        assert_eq!(raw["syncCursor"], json!("abc"));
        assert_eq!(raw["tabs"][0]["shared"], json!(false));
    }

    #[test]
    fn test_concurrent_windows_last_write_wins() {
        // Two windows on one origin share a medium but not their in-memory
        // state; nothing coordinates them.
        let storage = MemoryStorage::new();
        let mut first = loaded(storage.clone());
        let mut second = loaded(storage.clone());

        first.create_tab(Some("From first"));
        second.toggle_theme();

        let stored = {
            let mut reader = store_on(storage.clone());
            reader.load();
            reader.state().clone()
        };
        assert_eq!(stored.theme, Theme::Dark);
        assert!(stored.tabs.iter().all(|t| t.title != "From first"));
        assert_eq!(first.tabs().len(), 2);
    }

    fn arb_color() -> impl Strategy<Value = NoteColor> {
        prop_oneof![
            Just(NoteColor::Yellow),
            Just(NoteColor::Blue),
            Just(NoteColor::Purple),
            "#[0-9a-f]{6}".prop_map(NoteColor::Custom),
        ]
    }

    fn arb_note() -> impl Strategy<Value = Note> {
        (
            ".{0,12}",
            ".{0,40}",
            (any::<i32>(), any::<i32>()),
            (1u32..2_000, 1u32..2_000),
            arb_color(),
            -5i64..500,
            0i64..2_000_000_000_000,
            proptest::option::of(0i64..2_000_000_000_000),
        )
            .prop_map(|(title, content, (x, y), (width, height), color, z_index, created_at, updated_at)| {
                Note {
                    id: String::new(),
                    title,
                    content,
                    x: x.into(),
                    y: y.into(),
                    width,
                    height,
                    color,
                    z_index,
                    created_at,
                    updated_at,
                    extra: Default::default(),
                }
            })
    }

    fn arb_state() -> impl Strategy<Value = AppState> {
        (
            proptest::collection::vec((".{0,12}", proptest::collection::vec(arb_note(), 0..5)), 1..5),
            any::<Index>(),
            any::<bool>(),
        )
            .prop_map(|(boards, active, dark)| {
                let tabs: Vec<Board> = boards
                    .into_iter()
                    .enumerate()
                    .map(|(i, (title, notes))| Board {
                        id: format!("b{}", i),
                        title,
                        notes: notes
                            .into_iter()
                            .enumerate()
                            .map(|(j, n)| Note {
                                id: format!("n{}-{}", i, j),
                                ..n
                            })
                            .collect(),
                        extra: Default::default(),
                    })
                    .collect();
                AppState {
                    active_tab_id: Some(tabs[active.index(tabs.len())].id.clone()),
                    tabs,
                    theme: if dark { Theme::Dark } else { Theme::Light },
                    extra: Default::default(),
                }
            })
    }

    #[derive(Debug, Clone)]
    enum Op {
        Create,
        Delete(Index),
        Duplicate(Index),
        Activate(Index),
        AddNote,
        MoveNote(Index, Index),
        DeleteNote(Index),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Create),
            any::<Index>().prop_map(Op::Delete),
            any::<Index>().prop_map(Op::Duplicate),
            any::<Index>().prop_map(Op::Activate),
            Just(Op::AddNote),
            (any::<Index>(), any::<Index>()).prop_map(|(n, t)| Op::MoveNote(n, t)),
            any::<Index>().prop_map(Op::DeleteNote),
        ]
    }

    fn tab_id(store: &BoardStore<MemoryStorage>, idx: &Index) -> String {
        store.tabs()[idx.index(store.tabs().len())].id.clone()
    }

    fn active_note_id(store: &BoardStore<MemoryStorage>, idx: &Index) -> Option<String> {
        let notes = &store.get_active_tab()?.notes;
        (!notes.is_empty()).then(|| notes[idx.index(notes.len())].id.clone())
    }

    proptest! {
        #[test]
        fn prop_save_load_round_trip(state in arb_state()) {
            let storage = MemoryStorage::with_entry(STORAGE_KEY, &persistence::encode(&state).unwrap());
            let mut store = store_on(storage.clone());
            prop_assert_eq!(store.load(), LoadOutcome::Loaded(RepairReport::default()));
            prop_assert_eq!(store.state(), &state);
            prop_assert_eq!(storage.writes(), 0);

            store.save().unwrap();
            let mut reloaded = store_on(storage.clone());
            reloaded.load();
            prop_assert_eq!(reloaded.state(), &state);
        }

        #[test]
        fn prop_operations_keep_invariants(ops in proptest::collection::vec(arb_op(), 1..40)) {
            let mut store = loaded(MemoryStorage::new());
            for op in ops {
                match op {
                    Op::Create => {
                        store.create_tab(None);
                    }
                    Op::Delete(idx) => {
                        let id = tab_id(&store, &idx);
                        let before = store.state().clone();
                        let deleted = store.delete_tab(&id);
                        if before.tabs.len() == 1 {
                            prop_assert!(!deleted);
                            prop_assert_eq!(store.state(), &before);
                        } else {
                            prop_assert!(deleted);
                        }
                    }
                    Op::Duplicate(idx) => {
                        let id = tab_id(&store, &idx);
                        prop_assert!(store.duplicate_tab(&id).is_some());
                    }
                    Op::Activate(idx) => {
                        let id = tab_id(&store, &idx);
                        store.set_active_tab(&id);
                    }
                    Op::AddNote => {
                        prop_assert!(store.create_note(300, 300).is_some());
                    }
                    Op::MoveNote(n, t) => {
                        let target = tab_id(&store, &t);
                        if let Some(id) = active_note_id(&store, &n) {
                            prop_assert!(store.move_note(&id, &target));
                        }
                    }
                    Op::DeleteNote(n) => {
                        if let Some(id) = active_note_id(&store, &n) {
                            prop_assert!(store.delete_note(&id));
                        }
                    }
                }

                prop_assert!(!store.tabs().is_empty());
                let active = store.active_tab_id().map(str::to_string);
                prop_assert!(active.as_deref().and_then(|id| store.get_tab(id)).is_some());

                let ids: Vec<&str> = store
                    .tabs()
                    .iter()
                    .flat_map(|t| t.notes.iter().map(|n| n.id.as_str()))
                    .collect();
                let unique: HashSet<&str> = ids.iter().copied().collect();
                prop_assert_eq!(unique.len(), ids.len());
            }
            prop_assert_eq!(&persisted(&store), store.state());
        }
    }
}
