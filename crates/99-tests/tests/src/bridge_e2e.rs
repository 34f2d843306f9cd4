//! End-to-end scenarios across session, protocol, and host adapters.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bridge::{BridgeSession, CorrelationTable, DispatchOutcome};
use mock_host::{MockHost, ScriptedHost};
use parking_lot::Mutex;
use protocol::{encode, Envelope, ErrorCode};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize, PartialEq)]
struct Coords {
    lat: f64,
    lng: f64,
}

const LOCATION_REPLY: &str = concat!(
    "{\"isSuccess\":true,\"errorCode\":\"0\",\"errorMessage\":\"\",",
    "\"version\":\"1\",\"appVersion\":\"3.2\",",
    "\"data\":{\"lat\":37.5,\"lng\":127.0}}"
);

/// Registers `"req-1"` directly on a table and settles it with the canonical
/// location reply.
#[test]
fn one_shot_location_round_trip_on_the_table() {
    let table = CorrelationTable::new();
    let pending = table.register("req-1").expect("register req-1");

    table.deliver("req-1", LOCATION_REPLY);

    let envelope = pending.try_take().expect("reply settled");
    let coords: Coords = envelope.decode_data().expect("typed data");
    assert_eq!(coords.lat, 37.5);
    assert_eq!(coords.lng, 127.0);
    assert_eq!(envelope.app_version, "3.2");
}

/// Full caller path: request through the session, reply injected via the
/// recording host's captured key.
#[test]
fn session_round_trip_with_manual_reply() {
    let host = Arc::new(MockHost::new());
    let session = BridgeSession::builder()
        .transport(host.clone())
        .build()
        .expect("session build");

    let reply = session
        .request("getLocation", json!({"accuracy": "high"}))
        .expect("request");
    let key = host.last_key().expect("command reached the host");
    assert_eq!(key, reply.key());

    assert_eq!(
        session.on_native_message(&key, LOCATION_REPLY),
        DispatchOutcome::Resolved
    );
    let coords: Coords = reply
        .try_take()
        .expect("reply settled")
        .decode_data()
        .expect("typed data");
    assert_eq!(coords, Coords { lat: 37.5, lng: 127.0 });
}

/// The scripted host answers from its own thread; the caller awaits the
/// pending reply while a pump loop feeds the session.
#[test]
fn scripted_host_round_trip_with_async_caller() {
    let host = Arc::new(ScriptedHost::spawn(|cmd| {
        Envelope::success(json!({ "echo": cmd.command, "params": cmd.params }))
    }));
    let session = Arc::new(
        BridgeSession::builder()
            .transport(host.clone())
            .build()
            .expect("session build"),
    );

    let reply = session
        .request("getHeading", json!({"continuous": false}))
        .expect("request");

    let pump_session = Arc::clone(&session);
    let pump_host = Arc::clone(&host);
    let pump = thread::spawn(move || {
        pump_host.pump_blocking(|key, raw| {
            pump_session.on_native_message(key, raw);
        })
    });

    let envelope = futures::executor::block_on(reply);
    assert_eq!(envelope.data["echo"], json!("getHeading"));
    assert!(pump.join().expect("pump thread"));
    assert_eq!(session.metrics().resolved, 1);
}

/// Several in-flight calls resolve independently, in whatever order the
/// host answers.
#[test]
fn out_of_order_replies_settle_the_right_callers() {
    let host = Arc::new(MockHost::new());
    let session = BridgeSession::builder()
        .transport(host.clone())
        .build()
        .expect("session build");

    let first = session.request("a", Value::Null).expect("request a");
    let second = session.request("b", Value::Null).expect("request b");

    let reply_for = |tag: &str| encode(&Envelope::success(json!({ "tag": tag }))).unwrap();
    session.on_native_message(second.key(), &reply_for("b"));
    session.on_native_message(first.key(), &reply_for("a"));

    assert_eq!(first.try_take().unwrap().data["tag"], json!("a"));
    assert_eq!(second.try_take().unwrap().data["tag"], json!("b"));
}

/// Continuous sensor stream: one event key, many deliveries, listener set
/// changing between them.
#[test]
fn heading_stream_multicasts_until_listeners_leave() {
    let session = BridgeSession::builder()
        .transport(Arc::new(MockHost::new()))
        .build()
        .expect("session build");

    let seen = Arc::new(Mutex::new(Vec::<(String, f64)>::new()));
    let push = |tag: &'static str| {
        let seen = Arc::clone(&seen);
        move |envelope: &Envelope| {
            let deg = envelope.data["deg"].as_f64().unwrap_or(f64::NAN);
            seen.lock().push((tag.to_owned(), deg));
        }
    };

    let compass = session.subscribe("heading", push("compass"));
    let map = session.subscribe("heading", push("map"));

    let tick = |deg: f64| encode(&Envelope::success(json!({ "deg": deg }))).unwrap();
    assert_eq!(
        session.on_native_message("heading", &tick(10.0)),
        DispatchOutcome::EventDelivered(2)
    );

    session.unsubscribe("heading", compass);
    assert_eq!(
        session.on_native_message("heading", &tick(20.0)),
        DispatchOutcome::EventDelivered(1)
    );

    session.unsubscribe("heading", map);
    assert_eq!(
        session.on_native_message("heading", &tick(30.0)),
        DispatchOutcome::UnknownKey
    );

    assert_eq!(
        *seen.lock(),
        vec![
            ("compass".to_owned(), 10.0),
            ("map".to_owned(), 10.0),
            ("map".to_owned(), 20.0),
        ]
    );
}

/// A host-reported failure resolves the caller, who then reads the code.
#[test]
fn host_failure_envelope_reaches_the_caller_intact() {
    let host = Arc::new(ScriptedHost::spawn(|_| {
        Envelope::failure(
            ErrorCode::LocationDisabled,
            "location services are off",
            Value::Null,
        )
    }));
    let session = BridgeSession::builder()
        .transport(host.clone())
        .build()
        .expect("session build");

    let reply = session.request("getLocation", Value::Null).expect("request");
    host.pump_blocking(|key, raw| {
        session.on_native_message(key, raw);
    });

    let envelope = reply.try_take().expect("settled with the failure");
    assert!(!envelope.is_success);
    assert_eq!(envelope.error_code, ErrorCode::LocationDisabled);
    assert_eq!(envelope.error_message, "location services are off");
}

/// Late, duplicate, and alien replies never disturb a settled session.
#[test]
fn stray_replies_degrade_to_logged_drops() {
    let host = Arc::new(MockHost::new());
    let session = BridgeSession::builder()
        .transport(host.clone())
        .build()
        .expect("session build");

    let reply = session.request("cmd", Value::Null).expect("request");
    let key = reply.key().to_owned();
    let payload = encode(&Envelope::success(Value::Null)).unwrap();

    assert_eq!(session.on_native_message(&key, &payload), DispatchOutcome::Resolved);
    assert_eq!(session.on_native_message(&key, &payload), DispatchOutcome::UnknownKey);
    assert_eq!(
        session.on_native_message("9999-never-issued", &payload),
        DispatchOutcome::UnknownKey
    );

    let metrics = session.metrics();
    assert_eq!(metrics.resolved, 1);
    assert_eq!(metrics.unknown, 2);
}

/// A pending reply with no deadline stays pending while an unrelated
/// timeout-wrapped call expires next to it.
#[test]
fn timeouts_are_opt_in_per_call() {
    let host = Arc::new(MockHost::new());
    let session = BridgeSession::builder()
        .transport(host.clone())
        .build()
        .expect("session build");

    let silent = session.request("slow", Value::Null).expect("request");
    let err = session
        .call("also-slow", Value::Null, Duration::from_millis(30))
        .unwrap_err();
    assert!(matches!(err, bridge::BridgeError::ReplyTimeout(_)));

    // The plain request is untouched by the sibling's deadline.
    assert_eq!(session.in_flight(), 1);
    assert!(silent.try_take().is_none());
}
