//! Settle-once reply cell backing pending one-shot calls.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::task::AtomicWaker;
use parking_lot::{Condvar, Mutex};
use protocol::Envelope;

enum CellState {
    Pending,
    Settled(Envelope),
    Taken,
}

/// Shared settle-at-most-once cell.
///
/// The correlation table owns the settle half; the caller polls or blocks on
/// the other through [`PendingReply`]. Dropping the settle half without
/// settling leaves every waiter pending: a late or malformed reply must
/// never reject the caller.
pub(crate) struct ReplyCell {
    state: Mutex<CellState>,
    ready: Condvar,
    waker: AtomicWaker,
}

impl ReplyCell {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CellState::Pending),
            ready: Condvar::new(),
            waker: AtomicWaker::new(),
        })
    }

    /// Stores the envelope and wakes blocking and async waiters.
    ///
    /// Only the first settle takes effect.
    pub(crate) fn settle(&self, envelope: Envelope) {
        {
            let mut state = self.state.lock();
            if !matches!(*state, CellState::Pending) {
                return;
            }
            *state = CellState::Settled(envelope);
        }
        self.ready.notify_all();
        self.waker.wake();
    }
}

fn take_settled(state: &mut CellState) -> Option<Envelope> {
    match std::mem::replace(state, CellState::Taken) {
        CellState::Settled(envelope) => Some(envelope),
        other => {
            *state = other;
            None
        }
    }
}

/// Caller half of a one-shot call: resolves once the matching reply arrives.
///
/// There is no built-in deadline; a host that never answers leaves the
/// reply pending forever. [`PendingReply::wait_timeout`] is the explicit
/// opt-in; pair it with `BridgeSession::abandon` when giving up on a key.
pub struct PendingReply {
    key: String,
    cell: Arc<ReplyCell>,
}

impl std::fmt::Debug for PendingReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingReply")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl PendingReply {
    pub(crate) fn new(key: String, cell: Arc<ReplyCell>) -> Self {
        Self { key, cell }
    }

    /// Correlation key this reply is registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Removes the reply if it already arrived, without blocking.
    pub fn try_take(&self) -> Option<Envelope> {
        take_settled(&mut self.cell.state.lock())
    }

    /// Blocks until the reply arrives.
    ///
    /// May block forever if the host never answers for this key.
    pub fn wait(self) -> Envelope {
        let mut state = self.cell.state.lock();
        loop {
            if let Some(envelope) = take_settled(&mut state) {
                return envelope;
            }
            self.cell.ready.wait(&mut state);
        }
    }

    /// Blocks until the reply arrives or `timeout` elapses.
    ///
    /// `None` means the deadline fired. The registration itself is untouched:
    /// the reply may still arrive later unless the key is abandoned.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Envelope> {
        let deadline = Instant::now() + timeout;
        let mut state = self.cell.state.lock();
        loop {
            if let Some(envelope) = take_settled(&mut state) {
                return Some(envelope);
            }
            if self
                .cell
                .ready
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                return take_settled(&mut state);
            }
        }
    }
}

impl Future for PendingReply {
    type Output = Envelope;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Envelope> {
        // Register before checking so a settle racing this poll still wakes
        // the task.
        self.cell.waker.register(cx.waker());
        match self.try_take() {
            Some(envelope) => Poll::Ready(envelope),
            None => Poll::Pending,
        }
    }
}
