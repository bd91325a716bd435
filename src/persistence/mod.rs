//! Board blob encoding
//!
//! The whole application state is one JSON object under one key:
//! `{ activeTabId, tabs: [{ id, title, notes: [...] }], theme }`.
//! Decoding is deliberately loose; [`crate::store::repair`] does the
//! validation.

use crate::error::Result;
use crate::store::AppState;
use crate::store::repair::RawState;

/// Result of reading the stored blob
#[derive(Debug)]
pub enum Decoded {
    /// Nothing stored (or an empty string)
    Absent,
    /// Stored text is not a JSON object
    Malformed(serde_json::Error),
    Parsed(RawState),
}

/// Read a stored blob into its raw shape
pub fn decode(blob: Option<&str>) -> Decoded {
    match blob {
        None => Decoded::Absent,
        Some(text) if text.trim().is_empty() => Decoded::Absent,
        Some(text) => match serde_json::from_str::<RawState>(text) {
            Ok(raw) => Decoded::Parsed(raw),
            Err(e) => Decoded::Malformed(e),
        },
    }
}

/// Serialize state for storage
pub fn encode(state: &AppState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}
