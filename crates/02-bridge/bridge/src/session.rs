//! Bridge session: the dispatch entry point and the caller-facing surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::debug;
use protocol::Envelope;
use serde_json::Value;

use crate::correlation::{CallDelivery, CorrelationTable};
use crate::error::{BridgeError, BridgeResult};
use crate::events::{EventDelivery, EventRegistry, ListenerId};
use crate::keys::KeySource;
use crate::reply::PendingReply;

/// Opaque outbound half of the bridge.
///
/// Implementations push one command to the native host; the host is expected
/// to eventually answer through [`BridgeSession::on_native_message`] with the
/// same key.
pub trait HostTransport: Send + Sync {
    /// Pushes `command` with `params` across the bridge under `key`.
    fn post(&self, key: &str, command: &str, params: &Value) -> BridgeResult<()>;
}

/// Routing verdict for one native-pushed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A pending one-shot call consumed the reply.
    Resolved,
    /// A pending call matched but its payload failed to decode.
    MalformedReply,
    /// The event fan-out reached this many listeners.
    EventDelivered(usize),
    /// Listeners existed but the event payload failed to decode.
    MalformedEvent,
    /// The key matched neither table; the message was dropped.
    UnknownKey,
}

#[derive(Default)]
struct DispatchMetrics {
    resolved: AtomicU64,
    malformed: AtomicU64,
    events: AtomicU64,
    unknown: AtomicU64,
}

impl DispatchMetrics {
    fn snapshot(&self) -> DispatchMetricsSnapshot {
        DispatchMetricsSnapshot {
            resolved: self.resolved.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the dispatch counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchMetricsSnapshot {
    /// One-shot replies that settled a waiter.
    pub resolved: u64,
    /// Deliveries dropped because the payload failed to decode.
    pub malformed: u64,
    /// Event fan-outs that reached the registry's listeners.
    pub events: u64,
    /// Messages dropped because the key matched neither table.
    pub unknown: u64,
}

/// One web-side bridge endpoint.
///
/// Owns the correlation table, the event registry, and the key source, so
/// separate sessions (one per web view, or one per test) never share state.
pub struct BridgeSession {
    transport: Arc<dyn HostTransport>,
    keys: KeySource,
    calls: CorrelationTable,
    events: EventRegistry,
    metrics: DispatchMetrics,
}

impl BridgeSession {
    /// Creates a builder for assembling a session.
    pub fn builder() -> BridgeSessionBuilder {
        BridgeSessionBuilder::new()
    }

    /// Single entry point invoked by the native side with `(key, payload)`.
    ///
    /// Correlation replies are checked first: pending calls are consumed
    /// quickly, which keeps that lookup small, and it means a key collision
    /// between the two tables silently favours the one-shot side; the
    /// reserved key offset exists so that never happens in practice. Only a
    /// key unknown to the table is offered to the event registry; unknown
    /// everywhere is logged and dropped, never raised back to the host.
    pub fn on_native_message(&self, key: &str, raw_payload: &str) -> DispatchOutcome {
        match self.calls.deliver(key, raw_payload) {
            CallDelivery::Settled => {
                self.metrics.resolved.fetch_add(1, Ordering::Relaxed);
                return DispatchOutcome::Resolved;
            }
            CallDelivery::Malformed => {
                self.metrics.malformed.fetch_add(1, Ordering::Relaxed);
                return DispatchOutcome::MalformedReply;
            }
            CallDelivery::Unknown => {}
        }
        match self.events.deliver(key, raw_payload) {
            EventDelivery::Invoked(count) => {
                self.metrics.events.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::EventDelivered(count)
            }
            EventDelivery::Malformed => {
                self.metrics.malformed.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::MalformedEvent
            }
            EventDelivery::NoListeners => {
                debug!("dropping message for unknown key {key}");
                self.metrics.unknown.fetch_add(1, Ordering::Relaxed);
                DispatchOutcome::UnknownKey
            }
        }
    }

    /// Issues a one-shot command and returns the pending reply.
    ///
    /// The reply carries no deadline; see [`BridgeSession::call`] for the
    /// opt-in timeout variant and [`BridgeSession::abandon`] for caller-side
    /// cancellation.
    pub fn request(&self, command: &str, params: Value) -> BridgeResult<PendingReply> {
        let (_key, reply) = self.begin(command, &params)?;
        Ok(reply)
    }

    /// Issues a one-shot command and blocks for the reply up to `timeout`.
    ///
    /// On expiry the key is unregistered and [`BridgeError::ReplyTimeout`]
    /// is returned; a reply arriving later for that key is dropped as
    /// unknown.
    pub fn call(&self, command: &str, params: Value, timeout: Duration) -> BridgeResult<Envelope> {
        let (key, reply) = self.begin(command, &params)?;
        match reply.wait_timeout(timeout) {
            Some(envelope) => Ok(envelope),
            None => {
                self.calls.unregister(&key);
                Err(BridgeError::ReplyTimeout(key))
            }
        }
    }

    fn begin(&self, command: &str, params: &Value) -> BridgeResult<(String, PendingReply)> {
        let key = self.keys.next_key();
        let Some(reply) = self.calls.register(&key) else {
            return Err(BridgeError::DuplicateKey(key));
        };
        if let Err(err) = self.transport.post(&key, command, params) {
            self.calls.unregister(&key);
            return Err(err);
        }
        Ok((key, reply))
    }

    /// Abandons the pending call registered under `key`.
    ///
    /// Idempotent. Its reply, if one still arrives, is dropped as unknown;
    /// the already issued [`PendingReply`] simply never settles.
    pub fn abandon(&self, key: &str) {
        self.calls.unregister(key);
    }

    /// Registers a persistent listener for `event_key`.
    pub fn subscribe(
        &self,
        event_key: &str,
        listener: impl FnMut(&Envelope) + Send + 'static,
    ) -> ListenerId {
        self.events.add(event_key, listener)
    }

    /// Removes one listener from `event_key`; no-op when already gone.
    pub fn unsubscribe(&self, event_key: &str, id: ListenerId) {
        self.events.remove(event_key, id)
    }

    /// Number of one-shot calls still awaiting a reply.
    pub fn in_flight(&self) -> usize {
        self.calls.in_flight()
    }

    /// Copies the dispatch counters.
    pub fn metrics(&self) -> DispatchMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Builder for assembling a [`BridgeSession`].
pub struct BridgeSessionBuilder {
    transport: Option<Arc<dyn HostTransport>>,
}

impl BridgeSessionBuilder {
    /// Creates an empty builder with no transport attached.
    pub fn new() -> Self {
        Self { transport: None }
    }

    /// Sets the outbound host transport.
    pub fn transport(mut self, transport: Arc<dyn HostTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds a [`BridgeSession`], returning an error if the transport is
    /// missing.
    pub fn build(self) -> Result<BridgeSession> {
        Ok(BridgeSession {
            transport: self
                .transport
                .ok_or_else(|| anyhow!("missing host transport"))?,
            keys: KeySource::new(),
            calls: CorrelationTable::new(),
            events: EventRegistry::new(),
            metrics: DispatchMetrics::default(),
        })
    }
}

impl Default for BridgeSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
