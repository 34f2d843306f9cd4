//! Wire format spoken across the web-view bridge.
//!
//! This crate defines the foundational pieces every inbound message is built
//! from:
//! * [`Envelope`] – immutable success/error/data wrapper pushed by the host.
//! * [`ErrorCode`] – closed result taxonomy partitioned into convention bands.
//! * [`decode`] / [`encode`] – UTF-8 JSON translation used by the dispatcher.

mod codes;
mod envelope;

pub use codes::{band_of, ErrorBand, ErrorCode, COMMON_BAND, HOST_BAND, WEB_BAND};
pub use envelope::{
    decode, encode, Envelope, ProtocolError, ProtocolResult, PROTOCOL_VERSION,
};
