//! JavaScript bindings (WASM only)
//!
//! The view layer holds one `StickyDraft` instance and goes through it for
//! every read and write; it never touches LocalStorage itself. Structured
//! values cross the boundary as JSON strings.

use wasm_bindgen::prelude::*;

use crate::platform::LocalStorage;
use crate::settings::Settings;
use crate::store::{BoardStore, Note, NotePatch};

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Pixel coordinates arrive as JS numbers
fn px(value: f64) -> i64 {
    value.round() as i64
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).expect("Failed to init logger");
    log::info!("StickyDraft starting...");
}

#[wasm_bindgen]
pub struct StickyDraft {
    store: BoardStore<LocalStorage>,
}

#[wasm_bindgen]
impl StickyDraft {
    /// Open LocalStorage and load (or initialize) the boards
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<StickyDraft, JsValue> {
        let storage = LocalStorage::open().map_err(js_err)?;
        let settings = Settings::load(&storage);
        Ok(Self {
            store: BoardStore::open(storage, settings),
        })
    }

    #[wasm_bindgen(js_name = stateJson)]
    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.store.state()).map_err(js_err)
    }

    #[wasm_bindgen(js_name = activeTabJson)]
    pub fn active_tab_json(&self) -> Result<Option<String>, JsValue> {
        self.store
            .get_active_tab()
            .map(|tab| serde_json::to_string(tab).map_err(js_err))
            .transpose()
    }

    #[wasm_bindgen(js_name = otherTabsJson)]
    pub fn other_tabs_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.store.other_tabs()).map_err(js_err)
    }

    #[wasm_bindgen(js_name = activeTabId)]
    pub fn active_tab_id(&self) -> Option<String> {
        self.store.active_tab_id().map(str::to_string)
    }

    pub fn theme(&self) -> String {
        self.store.theme().as_str().to_string()
    }

    #[wasm_bindgen(js_name = maxZIndex)]
    pub fn max_z_index(&self) -> f64 {
        self.store.max_z_index() as f64
    }

    // === Boards ===

    #[wasm_bindgen(js_name = createTab)]
    pub fn create_tab(&mut self, title: Option<String>) -> String {
        self.store.create_tab(title.as_deref())
    }

    #[wasm_bindgen(js_name = deleteTab)]
    pub fn delete_tab(&mut self, id: &str) -> bool {
        self.store.delete_tab(id)
    }

    #[wasm_bindgen(js_name = duplicateTab)]
    pub fn duplicate_tab(&mut self, id: &str) -> Option<String> {
        self.store.duplicate_tab(id)
    }

    #[wasm_bindgen(js_name = setActiveTab)]
    pub fn set_active_tab(&mut self, id: &str) -> bool {
        self.store.set_active_tab(id)
    }

    #[wasm_bindgen(js_name = updateTabTitle)]
    pub fn update_tab_title(&mut self, id: &str, title: &str) -> bool {
        self.store.update_tab_title(id, title)
    }

    // === Notes ===

    #[wasm_bindgen(js_name = addNote)]
    pub fn add_note(&mut self, note_json: &str) -> Result<Option<String>, JsValue> {
        let note: Note = serde_json::from_str(note_json).map_err(js_err)?;
        Ok(self.store.add_note(note))
    }

    #[wasm_bindgen(js_name = addNoteToTab)]
    pub fn add_note_to_tab(&mut self, tab_id: &str, note_json: &str) -> Result<Option<String>, JsValue> {
        let note: Note = serde_json::from_str(note_json).map_err(js_err)?;
        Ok(self.store.add_note_to_tab(tab_id, note))
    }

    #[wasm_bindgen(js_name = createNote)]
    pub fn create_note(&mut self, x: f64, y: f64) -> Option<String> {
        self.store.create_note(px(x), px(y))
    }

    /// `patch_json` holds any subset of the note's editable fields
    #[wasm_bindgen(js_name = updateNote)]
    pub fn update_note(&mut self, id: &str, patch_json: &str) -> Result<bool, JsValue> {
        let patch: NotePatch = serde_json::from_str(patch_json).map_err(js_err)?;
        Ok(self.store.update_note(id, patch))
    }

    #[wasm_bindgen(js_name = setNotePosition)]
    pub fn set_note_position(&mut self, id: &str, x: f64, y: f64) -> bool {
        self.store.update_note(id, NotePatch::position(px(x), px(y)))
    }

    #[wasm_bindgen(js_name = deleteNote)]
    pub fn delete_note(&mut self, id: &str) -> bool {
        self.store.delete_note(id)
    }

    #[wasm_bindgen(js_name = moveNote)]
    pub fn move_note(&mut self, note_id: &str, target_tab_id: &str) -> bool {
        self.store.move_note(note_id, target_tab_id)
    }

    #[wasm_bindgen(js_name = copyNote)]
    pub fn copy_note(&mut self, note_id: &str, target_tab_id: &str) -> Option<String> {
        self.store.copy_note(note_id, target_tab_id)
    }

    #[wasm_bindgen(js_name = duplicateNote)]
    pub fn duplicate_note(&mut self, note_id: &str) -> Option<String> {
        self.store.duplicate_note(note_id)
    }

    #[wasm_bindgen(js_name = bringToFront)]
    pub fn bring_to_front(&mut self, note_id: &str) -> bool {
        self.store.bring_to_front(note_id)
    }

    // === Global ===

    #[wasm_bindgen(js_name = toggleTheme)]
    pub fn toggle_theme(&mut self) -> String {
        self.store.toggle_theme().as_str().to_string()
    }

    pub fn reset(&mut self) {
        self.store.reset();
    }

    #[wasm_bindgen(js_name = clearAll)]
    pub fn clear_all(&mut self) {
        self.store.clear_all();
    }
}
