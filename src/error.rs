//! Error types for StickyDraft.
//!
//! Only the persistence boundary can fail: the store's mutation operations
//! log write failures and keep going, so these errors surface from `save()`,
//! the storage backends, and settings I/O.

use thiserror::Error;

/// Failure talking to the persistent medium or (de)serializing state.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The blob or settings could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File-backed storage failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No storage medium could be obtained (private mode, no window, ...).
    #[error("Storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// The medium rejected a write, e.g. quota exceeded.
    #[error("Storage write failed for key {key}: {message}")]
    WriteFailed { key: String, message: String },
}

/// A specialized Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
