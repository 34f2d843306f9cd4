//! Closed error-code taxonomy shared by every payload envelope.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Inclusive code window reserved for common-layer failures.
pub const COMMON_BAND: (u16, u16) = (300, 499);
/// Inclusive code window reserved for host-layer failures.
pub const HOST_BAND: (u16, u16) = (500, 699);
/// Inclusive code window reserved for web-layer failures.
pub const WEB_BAND: (u16, u16) = (700, 899);

/// Result classification carried by every native reply.
///
/// The set is closed: codes this build does not know collapse to
/// [`ErrorCode::Unknown`] on decode. Band membership is a convention shared
/// with the host, not an enforced invariant; callers must not assume a band
/// is exhaustively populated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The call completed; `data` is meaningful.
    Success,
    /// The payload failed structural validation on the native side.
    MalformedPayload,
    /// The native side gave up waiting on an internal dependency.
    Timeout,
    /// The host rejected the call for missing permissions.
    PermissionDenied,
    /// Device location services are switched off.
    LocationDisabled,
    /// Catch-all for codes outside the published set.
    Unknown,
}

impl ErrorCode {
    /// Numeric wire value of this code.
    pub fn code(self) -> u16 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::MalformedPayload => 300,
            ErrorCode::Timeout => 301,
            ErrorCode::PermissionDenied => 500,
            ErrorCode::LocationDisabled => 501,
            ErrorCode::Unknown => 999,
        }
    }

    /// Maps a numeric wire value back onto the closed set.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => ErrorCode::Success,
            300 => ErrorCode::MalformedPayload,
            301 => ErrorCode::Timeout,
            500 => ErrorCode::PermissionDenied,
            501 => ErrorCode::LocationDisabled,
            _ => ErrorCode::Unknown,
        }
    }

    /// Convention band this code falls into.
    pub fn band(self) -> ErrorBand {
        band_of(self.code())
    }

    /// Whether this is the single success code.
    pub fn is_success(self) -> bool {
        matches!(self, ErrorCode::Success)
    }
}

/// Convention windows the numeric code space is partitioned into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorBand {
    /// The single success code, `0`.
    Success,
    /// Common-layer failures, `[300, 499]`.
    Common,
    /// Host-layer failures, `[500, 699]`.
    Host,
    /// Web-layer failures, `[700, 899]`.
    Web,
    /// Anything outside the published windows, including the catch-all `999`.
    Unknown,
}

/// Classifies an arbitrary numeric code into its convention band.
pub fn band_of(code: u16) -> ErrorBand {
    match code {
        0 => ErrorBand::Success,
        c if (COMMON_BAND.0..=COMMON_BAND.1).contains(&c) => ErrorBand::Common,
        c if (HOST_BAND.0..=HOST_BAND.1).contains(&c) => ErrorBand::Host,
        c if (WEB_BAND.0..=WEB_BAND.1).contains(&c) => ErrorBand::Web,
        _ => ErrorBand::Unknown,
    }
}

// The wire carries codes as numeric strings ("0", "999"), so the serde
// impls are written out rather than derived.

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.code())
    }
}

struct CodeVisitor;

impl Visitor<'_> for CodeVisitor {
    type Value = ErrorCode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an error code rendered as a numeric string")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<ErrorCode, E> {
        let code: u16 = value
            .parse()
            .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))?;
        Ok(ErrorCode::from_code(code))
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(CodeVisitor)
    }
}
