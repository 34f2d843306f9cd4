use thiserror::Error;

/// Result alias for the caller-facing session API.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Failures surfaced by the caller-facing session API.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The outbound transport refused or lost the command.
    #[error("transport error: {0}")]
    Transport(String),

    /// A correlation key was registered twice before any reply arrived.
    #[error("correlation key {0} is already registered")]
    DuplicateKey(String),

    /// An opt-in deadline elapsed before the host replied.
    #[error("no reply for key {0} within the requested deadline")]
    ReplyTimeout(String),
}

impl BridgeError {
    /// Shorthand for a transport failure with a formatted message.
    pub fn transport(msg: impl Into<String>) -> Self {
        BridgeError::Transport(msg.into())
    }
}
