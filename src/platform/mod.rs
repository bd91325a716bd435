//! Platform abstraction layer
//!
//! The store never touches the browser directly. It consumes three
//! collaborators, each with a web and a native implementation:
//! - Storage (LocalStorage on web, JSON files natively, memory for tests)
//! - Time (epoch milliseconds, never decreasing)
//! - Identifiers (UUID v4 strings)

pub mod ids;
pub mod storage;
pub mod time;

pub use ids::{IdGenerator, RandomIds, SequentialIds};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use storage::{KeyValueStore, MemoryStorage};
pub use time::{Clock, ManualClock, SystemClock};
