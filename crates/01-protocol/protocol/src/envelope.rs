//! Payload envelope exchanged in both directions across the bridge.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::codes::ErrorCode;

/// Bridge protocol version stamped on locally constructed envelopes.
pub const PROTOCOL_VERSION: &str = "1";

/// Result alias for wire translation.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while translating envelopes to or from the wire.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The raw payload is not a well-formed envelope.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The opaque `data` field does not match the requested shape.
    #[error("data does not match the requested shape: {0}")]
    Data(serde_json::Error),
}

/// Immutable description of one native reply.
///
/// Produced by the native host. `data` stays opaque to the bridge layer and
/// defaults to a raw JSON value until a caller asks for a concrete shape via
/// [`Envelope::decode_data`]. The `version`/`app_version` pair is carried for
/// caller-side compatibility checks; this layer never enforces them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T = Value> {
    /// Mirrors `error_code == ErrorCode::Success`.
    pub is_success: bool,
    /// Result classification reported by the host.
    pub error_code: ErrorCode,
    /// Human-readable failure description; empty on success.
    pub error_message: String,
    /// Bridge protocol version the host spoke.
    pub version: String,
    /// Native application build that produced the reply.
    pub app_version: String,
    /// Call-specific payload; its shape is the caller's business.
    pub data: T,
}

impl<T> Envelope<T> {
    /// Builds a success envelope; the flag/code invariant holds by
    /// construction.
    pub fn success(data: T) -> Self {
        Self {
            is_success: true,
            error_code: ErrorCode::Success,
            error_message: String::new(),
            version: PROTOCOL_VERSION.to_owned(),
            app_version: String::new(),
            data,
        }
    }

    /// Builds a failure envelope carrying `code` and a description.
    ///
    /// `code` must not be [`ErrorCode::Success`].
    pub fn failure(code: ErrorCode, message: impl Into<String>, data: T) -> Self {
        debug_assert!(!code.is_success());
        Self {
            is_success: false,
            error_code: code,
            error_message: message.into(),
            version: PROTOCOL_VERSION.to_owned(),
            app_version: String::new(),
            data,
        }
    }

    /// Sets the native build identifier.
    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = app_version.into();
        self
    }

    /// Whether the success flag agrees with the error code.
    pub fn is_consistent(&self) -> bool {
        self.is_success == self.error_code.is_success()
    }
}

impl Envelope<Value> {
    /// Reinterprets the opaque `data` field as a concrete shape.
    pub fn decode_data<T: DeserializeOwned>(&self) -> ProtocolResult<T> {
        serde_json::from_value(self.data.clone()).map_err(ProtocolError::Data)
    }
}

/// Decodes one UTF-8 JSON envelope as pushed by the host.
pub fn decode(raw: &str) -> ProtocolResult<Envelope> {
    Ok(serde_json::from_str(raw)?)
}

/// Encodes an envelope into its wire form.
pub fn encode<T: Serialize>(envelope: &Envelope<T>) -> ProtocolResult<String> {
    Ok(serde_json::to_string(envelope)?)
}
