//! Wall-clock time in epoch milliseconds

use std::cell::Cell;
use std::rc::Rc;

/// Source of `createdAt` / `updatedAt` stamps.
pub trait Clock {
    /// Current time in epoch milliseconds. Never smaller than a previous reading.
    fn now_millis(&self) -> i64;
}

/// Real clock, clamped so it never runs backwards
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Cell<i64>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(target_arch = "wasm32")]
    fn wall_millis() -> i64 {
        js_sys::Date::now() as i64
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn wall_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let now = Self::wall_millis().max(self.last.get());
        self.last.set(now);
        now
    }
}

/// Hand-driven clock for tests and replays.
///
/// Clones share the same reading, so a test can keep a handle and advance
/// the clock after moving a copy into the store.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<i64>>,
}

impl ManualClock {
    pub fn new(start: i64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move the clock forward; negative steps are ignored
    pub fn advance(&self, millis: i64) {
        self.now.set(self.now.get() + millis.max(0));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.get()
    }
}
