// MIDI message types and status bytes

pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const PITCH_BEND: u8 = 0xE0;

/// Build a control change message. `channel` is 0-15.
pub fn control_change(channel: u8, controller: u8, value: u8) -> [u8; 3] {
    [CONTROL_CHANGE | (channel & 0x0F), controller & 0x7F, value & 0x7F]
}

/// Build a note-on message. Velocity 0 releases the note.
pub fn note_on(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [NOTE_ON | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

/// Decoded channel message, used when inspecting sent output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    PitchBend { channel: u8, value: i16 },
}

impl MidiMessage {
    /// Parse a raw MIDI message
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 3 {
            return None;
        }

        let status = bytes[0];
        let channel = status & 0x0F;

        match status & 0xF0 {
            NOTE_ON => {
                let note = bytes[1];
                let velocity = bytes[2];
                // Velocity 0 = Note Off
                if velocity == 0 {
                    Some(MidiMessage::NoteOff { channel, note })
                } else {
                    Some(MidiMessage::NoteOn {
                        channel,
                        note,
                        velocity,
                    })
                }
            }
            NOTE_OFF => Some(MidiMessage::NoteOff {
                channel,
                note: bytes[1],
            }),
            CONTROL_CHANGE => Some(MidiMessage::ControlChange {
                channel,
                controller: bytes[1],
                value: bytes[2],
            }),
            PITCH_BEND => {
                let lsb = bytes[1] as i16;
                let msb = bytes[2] as i16;
                Some(MidiMessage::PitchBend {
                    channel,
                    value: (msb << 7) | lsb,
                })
            }
            _ => None,
        }
    }
}
