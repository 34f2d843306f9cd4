//! Golden checks pinning the JSON wire format.

use protocol::{band_of, decode, encode, Envelope, ErrorBand, ErrorCode};
use serde_json::{json, Value};

/// The canonical success reply must decode field for field.
#[test]
fn canonical_success_reply_decodes() {
    let raw = concat!(
        "{\"isSuccess\":true,\"errorCode\":\"0\",\"errorMessage\":\"\",",
        "\"version\":\"1\",\"appVersion\":\"3.2\",",
        "\"data\":{\"lat\":37.5,\"lng\":127.0}}"
    );
    let envelope = decode(raw).expect("canonical reply decodes");

    assert!(envelope.is_success);
    assert_eq!(envelope.error_code, ErrorCode::Success);
    assert_eq!(envelope.error_message, "");
    assert_eq!(envelope.version, "1");
    assert_eq!(envelope.app_version, "3.2");
    assert_eq!(envelope.data["lat"], json!(37.5));
    assert!(envelope.is_consistent());
}

/// Encoded envelopes expose exactly the camelCase field set.
#[test]
fn encoded_field_names_are_camel_case() {
    let raw = encode(&Envelope::success(Value::Null)).expect("encode");
    let value: Value = serde_json::from_str(&raw).expect("valid json");
    let object = value.as_object().expect("object");

    let mut names: Vec<&str> = object.keys().map(String::as_str).collect();
    names.sort_unstable();
    assert_eq!(
        names,
        ["appVersion", "data", "errorCode", "errorMessage", "isSuccess", "version"]
    );
}

/// `errorCode` travels as a numeric string, never a bare number.
#[test]
fn error_code_is_a_numeric_string_on_the_wire() {
    let raw = encode(&Envelope::failure(ErrorCode::Timeout, "host timed out", Value::Null))
        .expect("encode");
    let value: Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["errorCode"], json!("301"));

    let bare_number = raw.replace("\"301\"", "301");
    assert!(decode(&bare_number).is_err());
}

/// Codes the web side has never heard of still decode, as the catch-all.
#[test]
fn foreign_codes_collapse_to_unknown() {
    let raw = concat!(
        "{\"isSuccess\":false,\"errorCode\":\"442\",\"errorMessage\":\"weird\",",
        "\"version\":\"1\",\"appVersion\":\"3.2\",\"data\":null}"
    );
    let envelope = decode(raw).expect("decodes");
    assert_eq!(envelope.error_code, ErrorCode::Unknown);
    // The raw numeric band is still classifiable for diagnostics.
    assert_eq!(band_of(442), ErrorBand::Common);
}

/// Band windows match the published partition.
#[test]
fn published_band_partition() {
    assert_eq!(ErrorCode::Success.band(), ErrorBand::Success);
    assert_eq!(ErrorCode::MalformedPayload.band(), ErrorBand::Common);
    assert_eq!(ErrorCode::Timeout.band(), ErrorBand::Common);
    assert_eq!(ErrorCode::PermissionDenied.band(), ErrorBand::Host);
    assert_eq!(ErrorCode::LocationDisabled.band(), ErrorBand::Host);
    assert_eq!(ErrorCode::Unknown.band(), ErrorBand::Unknown);
    assert_eq!(band_of(750), ErrorBand::Web);
}
