// Note representation for the sequencer
// A note is a lattice lane with position, duration and velocity, placed on a track

use super::event::{MidiData, SequencerEvent};
use super::merger::insertion_sort;
use crate::midi::event::NOTE_ON;
use crate::tuning::{AddressMapper, LatticeCoord};
use serde::{Deserialize, Serialize};

/// A placed note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Output track index
    #[serde(default)]
    pub track: u8,

    /// Lattice lane index (see [`LatticeCoord::from_lane_index`])
    pub lane: u16,

    /// Start position in ticks
    pub start: u32,

    /// Length in ticks
    pub duration: u32,

    /// MIDI velocity (0-127)
    #[serde(default = "default_velocity")]
    pub velocity: u8,
}

fn default_velocity() -> u8 {
    100
}

impl Note {
    /// Creates a new note. Velocity is clamped to 127.
    pub fn new(track: u8, lane: u16, start: u32, duration: u32, velocity: u8) -> Self {
        Self {
            track,
            lane,
            start,
            duration,
            velocity: velocity.min(127),
        }
    }

    /// Tick of the note-off
    pub fn end(&self) -> u32 {
        self.start.saturating_add(self.duration)
    }

    /// Lattice coordinate of this note's lane
    pub fn coord(&self) -> LatticeCoord {
        LatticeCoord::from_lane_index(self.lane)
    }

    /// Check if this note sounds at a given tick
    pub fn contains_tick(&self, tick: u32) -> bool {
        tick >= self.start && tick < self.end()
    }
}

/// Turns placed notes into sorted on/off event pairs
pub struct NoteEventExtractor<'a, M: AddressMapper + ?Sized> {
    mapper: &'a M,
}

impl<'a, M: AddressMapper + ?Sized> NoteEventExtractor<'a, M> {
    pub fn new(mapper: &'a M) -> Self {
        Self { mapper }
    }

    /// Produce a note-on and a note-off per addressable note, sorted.
    /// Notes the mapper cannot address are skipped.
    pub fn extract<'n, I>(&self, notes: I) -> Vec<SequencerEvent>
    where
        I: IntoIterator<Item = &'n Note>,
    {
        let notes = notes.into_iter();
        let mut events = Vec::with_capacity(notes.size_hint().0 * 2);
        let mut skipped = 0usize;

        for note in notes {
            let Some(address) = self.mapper.address(note.coord()) else {
                skipped += 1;
                continue;
            };

            let status = NOTE_ON | (address.channel & 0x0F);
            events.push(SequencerEvent::note_on(
                note.start,
                MidiData::new(status, address.pitch, note.velocity.min(127), note.track),
            ));
            events.push(SequencerEvent::note_off(
                note.end(),
                MidiData::new(status, address.pitch, 0, note.track),
            ));
        }

        if skipped > 0 {
            tracing::debug!(skipped, "Notes outside the addressable lattice were dropped");
        }

        insertion_sort(&mut events);
        events
    }
}
