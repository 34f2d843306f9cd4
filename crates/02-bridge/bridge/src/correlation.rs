//! One-shot request/reply correlation.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;
use protocol::decode;

use crate::reply::{PendingReply, ReplyCell};

/// Outcome of handing one raw reply to the correlation table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallDelivery {
    /// The pending call was settled with the decoded envelope.
    Settled,
    /// A waiter existed but the payload failed to decode; the registration
    /// is consumed and the caller stays pending.
    Malformed,
    /// No waiter is registered under this key.
    Unknown,
}

/// Maps in-flight correlation keys to their pending waiters.
///
/// Each key settles at most once: the entry leaves the table before its
/// waiter is woken, so a re-entrant dispatch triggered by the waiter cannot
/// deliver twice to the same key.
pub struct CorrelationTable {
    pending: Mutex<HashMap<String, Arc<ReplyCell>>>,
}

impl CorrelationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `key` and returns the caller half of the pending call.
    ///
    /// Returns `None` if the key is already in flight. The original
    /// registration stays the only one that will ever settle; the duplicate
    /// caller gets nothing rather than an exception.
    pub fn register(&self, key: &str) -> Option<PendingReply> {
        let mut pending = self.pending.lock();
        if pending.contains_key(key) {
            warn!("duplicate registration for correlation key {key}; keeping the original");
            return None;
        }
        let cell = ReplyCell::new();
        pending.insert(key.to_owned(), Arc::clone(&cell));
        Some(PendingReply::new(key.to_owned(), cell))
    }

    /// Drops the pending entry for `key`, if any.
    ///
    /// Idempotent. The already issued [`PendingReply`] never settles
    /// afterwards.
    pub fn unregister(&self, key: &str) {
        self.pending.lock().remove(key);
    }

    /// Number of calls currently awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.pending.lock().len()
    }

    /// Routes one raw reply to the waiter registered under `key`.
    ///
    /// The entry is removed before the payload is decoded. A malformed reply
    /// therefore consumes the registration and leaves the caller pending
    /// rather than rejected; a later reply for the same key is unknown.
    pub fn deliver(&self, key: &str, raw_payload: &str) -> CallDelivery {
        let cell = match self.pending.lock().remove(key) {
            Some(cell) => cell,
            None => {
                debug!("no pending call for key {key}");
                return CallDelivery::Unknown;
            }
        };
        match decode(raw_payload) {
            Ok(envelope) => {
                cell.settle(envelope);
                CallDelivery::Settled
            }
            Err(err) => {
                warn!("dropping reply for key {key}: {err}");
                CallDelivery::Malformed
            }
        }
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}
