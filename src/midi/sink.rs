// Output sinks - where the player sends its raw messages

use crate::midi::event::MidiMessage;
use parking_lot::Mutex;
use std::sync::Arc;

/// Destination for raw 2- or 3-byte output messages.
///
/// Implementations decide per track whether a message is actually
/// transmitted (open state, tuning flag). Sending never fails from the
/// caller's point of view.
pub trait OutputSink: Send {
    /// Send a message to one track's output
    fn send(&mut self, track: u8, message: &[u8]);

    /// Send a tuning message to every output that accepts tuning messages
    fn send_tuning(&mut self, message: &[u8]);
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn send(&mut self, track: u8, message: &[u8]) {
        (**self).send(track, message)
    }

    fn send_tuning(&mut self, message: &[u8]) {
        (**self).send_tuning(message)
    }
}

/// A message recorded by [`MessageLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Track { track: u8, bytes: Vec<u8> },
    Tuning { bytes: Vec<u8> },
}

impl SentMessage {
    pub fn bytes(&self) -> &[u8] {
        match self {
            SentMessage::Track { bytes, .. } | SentMessage::Tuning { bytes } => bytes,
        }
    }

    pub fn decode(&self) -> Option<MidiMessage> {
        MidiMessage::from_bytes(self.bytes())
    }
}

/// Records every message in memory. Clones share the same log, so a handle
/// can be kept while the sink is owned by the player.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Arc<Mutex<Vec<SentMessage>>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far
    pub fn messages(&self) -> Vec<SentMessage> {
        self.messages.lock().clone()
    }

    /// Messages addressed to one track, in send order
    pub fn track_messages(&self, track: u8) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .iter()
            .filter_map(|message| match message {
                SentMessage::Track { track: t, bytes } if *t == track => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl OutputSink for MessageLog {
    fn send(&mut self, track: u8, message: &[u8]) {
        self.messages.lock().push(SentMessage::Track {
            track,
            bytes: message.to_vec(),
        });
    }

    fn send_tuning(&mut self, message: &[u8]) {
        self.messages.lock().push(SentMessage::Tuning {
            bytes: message.to_vec(),
        });
    }
}

/// Writes every message to the log instead of a device
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn send(&mut self, track: u8, message: &[u8]) {
        match MidiMessage::from_bytes(message) {
            Some(decoded) => tracing::info!(track, ?decoded, "MIDI out"),
            None => tracing::info!(track, ?message, "MIDI out"),
        }
    }

    fn send_tuning(&mut self, message: &[u8]) {
        match MidiMessage::from_bytes(message) {
            Some(decoded) => tracing::info!(?decoded, "MIDI tuning out"),
            None => tracing::info!(?message, "MIDI tuning out"),
        }
    }
}
