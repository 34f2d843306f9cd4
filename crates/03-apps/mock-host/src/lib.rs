//! Host-side stand-ins for exercising bridge sessions without a web view.
//!
//! [`MockHost`] records outbound commands and leaves replying to the test.
//! [`ScriptedHost`] runs a fake native host on its own thread and queues
//! scripted replies for the test to drain into the session.

use std::thread;

use bridge::{BridgeError, BridgeResult, HostTransport};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use protocol::{encode, Envelope};
use serde_json::Value;

/// One command captured from the web side of the bridge.
#[derive(Clone, Debug)]
pub struct SentCommand {
    /// Correlation key the caller attached.
    pub key: String,
    /// Command name.
    pub command: String,
    /// Command parameters.
    pub params: Value,
}

/// Recording transport with no behaviour of its own.
///
/// Replies are injected manually through `BridgeSession::on_native_message`,
/// which keeps delivery timing fully under test control.
#[derive(Default)]
pub struct MockHost {
    sent: Mutex<Vec<SentCommand>>,
}

impl MockHost {
    /// Creates an empty recording host.
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands posted so far, oldest first.
    pub fn sent(&self) -> Vec<SentCommand> {
        self.sent.lock().clone()
    }

    /// Key of the most recent command, if any.
    pub fn last_key(&self) -> Option<String> {
        self.sent.lock().last().map(|cmd| cmd.key.clone())
    }
}

impl HostTransport for MockHost {
    fn post(&self, key: &str, command: &str, params: &Value) -> BridgeResult<()> {
        self.sent.lock().push(SentCommand {
            key: key.to_owned(),
            command: command.to_owned(),
            params: params.clone(),
        });
        Ok(())
    }
}

/// Threaded autoresponder standing in for a live native host.
///
/// Commands cross a channel into a worker thread where the reply script
/// builds the envelope; the encoded `(key, payload)` pair then lands in an
/// inbox the test drains into the session with [`ScriptedHost::pump`]. The
/// worker exits when the host is dropped.
pub struct ScriptedHost {
    commands: Sender<SentCommand>,
    inbox: Receiver<(String, String)>,
}

impl ScriptedHost {
    /// Spawns the worker with the given reply script.
    pub fn spawn(script: impl Fn(&SentCommand) -> Envelope + Send + 'static) -> Self {
        let (commands, command_rx) = unbounded::<SentCommand>();
        let (reply_tx, inbox) = unbounded();

        thread::spawn(move || {
            for cmd in command_rx.iter() {
                let raw = encode(&script(&cmd)).expect("encode scripted reply");
                if reply_tx.send((cmd.key, raw)).is_err() {
                    break;
                }
            }
        });

        Self { commands, inbox }
    }

    /// Routes every queued reply through `dispatch`, returning the count.
    pub fn pump(&self, mut dispatch: impl FnMut(&str, &str)) -> usize {
        let mut routed = 0;
        for (key, raw) in self.inbox.try_iter() {
            dispatch(&key, &raw);
            routed += 1;
        }
        routed
    }

    /// Blocks until one reply is available, then routes it.
    ///
    /// Returns `false` once the worker is gone and the inbox is drained.
    pub fn pump_blocking(&self, mut dispatch: impl FnMut(&str, &str)) -> bool {
        match self.inbox.recv() {
            Ok((key, raw)) => {
                dispatch(&key, &raw);
                true
            }
            Err(_) => false,
        }
    }
}

impl HostTransport for ScriptedHost {
    fn post(&self, key: &str, command: &str, params: &Value) -> BridgeResult<()> {
        self.commands
            .send(SentCommand {
                key: key.to_owned(),
                command: command.to_owned(),
                params: params.clone(),
            })
            .map_err(|_| BridgeError::transport("scripted host worker stopped"))
    }
}
