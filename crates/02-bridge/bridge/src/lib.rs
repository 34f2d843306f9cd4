//! Message correlation and event dispatch for the web-view bridge.
//!
//! The native host pushes every inbound message through a single string-keyed
//! entry point; this crate decides who was waiting for it:
//! * [`BridgeSession`] – owns both routing tables and the dispatch entry point.
//! * [`CorrelationTable`] / [`PendingReply`] – one-shot request/reply matching.
//! * [`EventRegistry`] – persistent multicast subscriptions.
//! * [`KeySource`] – monotonic correlation-key allocation.

mod correlation;
mod error;
mod events;
mod keys;
mod reply;
mod session;

pub use correlation::{CallDelivery, CorrelationTable};
pub use error::{BridgeError, BridgeResult};
pub use events::{EventDelivery, EventRegistry, ListenerId};
pub use keys::{KeySource, RESERVED_KEY_BASE};
pub use reply::PendingReply;
pub use session::{
    BridgeSession, BridgeSessionBuilder, DispatchMetricsSnapshot, DispatchOutcome, HostTransport,
};
