//! Correlation-key allocation.

use std::sync::atomic::{AtomicU64, Ordering};

/// First counter value handed out by [`KeySource`].
///
/// Event keys are short hand-chosen literals on the native side; seeding the
/// counter well above them keeps the two key spaces disjoint in practice,
/// which the dispatcher's correlation-first routing relies on.
pub const RESERVED_KEY_BASE: u64 = 10_000;

/// Monotonic source of bridge-unique correlation keys.
///
/// Keys are never reused within a session lifetime. They are not stable
/// across restarts and must not be persisted. Entries are never reclaimed
/// either: call volume is low relative to process lifetime, so unbounded
/// growth of the key space is accepted.
pub struct KeySource {
    next: AtomicU64,
}

impl KeySource {
    /// Creates a source seeded at [`RESERVED_KEY_BASE`].
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(RESERVED_KEY_BASE),
        }
    }

    /// Returns the next unissued key.
    pub fn next_key(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

impl Default for KeySource {
    fn default() -> Self {
        Self::new()
    }
}
