// MIDI output port manager - one output connection per track

use crate::midi::sink::OutputSink;
use midir::{MidiOutput, MidiOutputConnection};

const CLIENT_NAME: &str = "hexseq";

#[derive(Debug, thiserror::Error)]
pub enum MidiPortError {
    #[error("Failed to initialize MIDI: {0}")]
    Init(String),

    #[error("MIDI output port {0} not found")]
    NoSuchPort(usize),

    #[error("Failed to connect to MIDI device: {0}")]
    Connect(String),
}

/// Output state of one track
#[derive(Default)]
struct OutputSlot {
    port_name: Option<String>,
    connection: Option<MidiOutputConnection>,
    sends_tuning: bool,
}

impl OutputSlot {
    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn transmit(&mut self, track: usize, message: &[u8]) {
        if let Some(connection) = self.connection.as_mut() {
            if let Err(e) = connection.send(message) {
                tracing::warn!(track, error = %e, "MIDI send failed");
            }
        }
    }
}

/// Per-track MIDI outputs. A track whose output is not open drops its
/// messages; tuning messages only reach open outputs flagged to receive them.
#[derive(Default)]
pub struct MidiPortManager {
    slots: Vec<OutputSlot>,
}

impl MidiPortManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, track: u8) -> &mut OutputSlot {
        let index = track as usize;
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, OutputSlot::default);
        }
        &mut self.slots[index]
    }

    /// Open output port `port_index` for `track`, replacing any previous
    /// connection. Returns the port name.
    pub fn connect_track(&mut self, track: u8, port_index: usize) -> Result<String, MidiPortError> {
        let midi_out =
            MidiOutput::new(CLIENT_NAME).map_err(|e| MidiPortError::Init(e.to_string()))?;

        let ports = midi_out.ports();
        let port = ports
            .get(port_index)
            .ok_or(MidiPortError::NoSuchPort(port_index))?;
        let port_name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let connection = midi_out
            .connect(port, &format!("hexseq-track-{track}"))
            .map_err(|e| MidiPortError::Connect(e.to_string()))?;

        let slot = self.slot_mut(track);
        slot.connection = Some(connection);
        slot.port_name = Some(port_name.clone());
        tracing::info!(track, port = %port_name, "MIDI output connected");
        Ok(port_name)
    }

    /// Close a track's output
    pub fn disconnect_track(&mut self, track: u8) {
        if let Some(slot) = self.slots.get_mut(track as usize) {
            if let Some(connection) = slot.connection.take() {
                connection.close();
                tracing::debug!(track, "MIDI output closed");
            }
            slot.port_name = None;
        }
    }

    pub fn set_sends_tuning(&mut self, track: u8, sends_tuning: bool) {
        self.slot_mut(track).sends_tuning = sends_tuning;
    }

    pub fn is_open(&self, track: u8) -> bool {
        self.slots
            .get(track as usize)
            .is_some_and(OutputSlot::is_open)
    }

    pub fn sends_tuning(&self, track: u8) -> bool {
        self.slots
            .get(track as usize)
            .is_some_and(|slot| slot.sends_tuning)
    }

    pub fn port_name(&self, track: u8) -> Option<&str> {
        self.slots
            .get(track as usize)
            .and_then(|slot| slot.port_name.as_deref())
    }

    /// Number of tracks with an open output
    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_open()).count()
    }
}

impl OutputSink for MidiPortManager {
    fn send(&mut self, track: u8, message: &[u8]) {
        if let Some(slot) = self.slots.get_mut(track as usize) {
            slot.transmit(track as usize, message);
        }
    }

    fn send_tuning(&mut self, message: &[u8]) {
        for (track, slot) in self.slots.iter_mut().enumerate() {
            if slot.sends_tuning {
                slot.transmit(track, message);
            }
        }
    }
}

impl Drop for MidiPortManager {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            if let Some(connection) = slot.connection.take() {
                connection.close();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconnected_tracks_drop_messages() {
        let mut manager = MidiPortManager::new();
        manager.set_sends_tuning(3, true);

        assert!(!manager.is_open(3));
        assert!(manager.sends_tuning(3));
        assert!(!manager.sends_tuning(7));
        assert_eq!(manager.open_count(), 0);
        assert_eq!(manager.port_name(3), None);

        // nothing is open, so these are no-ops
        manager.send(3, &[0x90, 60, 100]);
        manager.send(20, &[0x90, 60, 100]);
        manager.send_tuning(&[0xB0, 53, 0]);
        manager.disconnect_track(3);
    }
}
