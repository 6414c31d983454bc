// Sequencer events - the common representation of every timed occurrence
// Notes, controller changes and tuning changes share one total ordering

use std::cmp::Ordering;

/// Event kind, declared in dispatch order.
///
/// Events on the same tick are ordered by this rank so that a note-off always
/// precedes a note-on at the same position, and tuning changes land before the
/// notes they affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    NoteOff = 0,
    ControllerChange = 1,
    Other = 2,
    TuningGenerator = 3,
    TuningPeriod = 4,
    JustIntonation = 5,
    Harmonicity = 6,
    NoteOn = 7,
}

impl EventKind {
    /// Position of this kind among events sharing a tick
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Tuning kinds are sent to every output rather than to one track
    pub fn is_tuning(self) -> bool {
        matches!(
            self,
            EventKind::TuningGenerator
                | EventKind::TuningPeriod
                | EventKind::JustIntonation
                | EventKind::Harmonicity
        )
    }
}

/// Raw output bytes addressed to a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiData {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
    pub track: u8,
}

impl MidiData {
    pub fn new(status: u8, data1: u8, data2: u8, track: u8) -> Self {
        Self {
            status,
            data1,
            data2,
            track,
        }
    }

    /// The three message bytes, without the track
    pub fn bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// Low nibble of the status byte
    pub fn channel(&self) -> u8 {
        self.status & 0x0F
    }
}

/// Event payload. The variant is the event kind, so a consumer can never read
/// a float out of a note event or bytes out of a generator change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventPayload {
    NoteOn(MidiData),
    NoteOff(MidiData),
    ControllerChange(MidiData),
    Other(MidiData),
    TuningGenerator(f32),
    TuningPeriod(f32),
    JustIntonation(MidiData),
    Harmonicity(MidiData),
}

impl EventPayload {
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::NoteOn(_) => EventKind::NoteOn,
            EventPayload::NoteOff(_) => EventKind::NoteOff,
            EventPayload::ControllerChange(_) => EventKind::ControllerChange,
            EventPayload::Other(_) => EventKind::Other,
            EventPayload::TuningGenerator(_) => EventKind::TuningGenerator,
            EventPayload::TuningPeriod(_) => EventKind::TuningPeriod,
            EventPayload::JustIntonation(_) => EventKind::JustIntonation,
            EventPayload::Harmonicity(_) => EventKind::Harmonicity,
        }
    }

    /// Byte payload, if this kind carries one
    pub fn midi_data(&self) -> Option<&MidiData> {
        match self {
            EventPayload::NoteOn(data)
            | EventPayload::NoteOff(data)
            | EventPayload::ControllerChange(data)
            | EventPayload::Other(data)
            | EventPayload::JustIntonation(data)
            | EventPayload::Harmonicity(data) => Some(data),
            EventPayload::TuningGenerator(_) | EventPayload::TuningPeriod(_) => None,
        }
    }

    /// Float payload, if this kind carries one
    pub fn value(&self) -> Option<f32> {
        match self {
            EventPayload::TuningGenerator(value) | EventPayload::TuningPeriod(value) => {
                Some(*value)
            }
            _ => None,
        }
    }
}

/// A payload stamped with an absolute tick position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerEvent {
    pub tick: u32,
    pub payload: EventPayload,
}

impl SequencerEvent {
    pub fn new(tick: u32, payload: EventPayload) -> Self {
        Self { tick, payload }
    }

    pub fn note_on(tick: u32, data: MidiData) -> Self {
        Self::new(tick, EventPayload::NoteOn(data))
    }

    pub fn note_off(tick: u32, data: MidiData) -> Self {
        Self::new(tick, EventPayload::NoteOff(data))
    }

    pub fn controller(tick: u32, data: MidiData) -> Self {
        Self::new(tick, EventPayload::ControllerChange(data))
    }

    pub fn generator(tick: u32, value: f32) -> Self {
        Self::new(tick, EventPayload::TuningGenerator(value))
    }

    pub fn period(tick: u32, value: f32) -> Self {
        Self::new(tick, EventPayload::TuningPeriod(value))
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// Track this event is addressed to. Float-payload tuning events have no
    /// track; they fan out to every output.
    pub fn track(&self) -> Option<u8> {
        self.payload.midi_data().map(|data| data.track)
    }

    /// Sort key: tick first, then kind rank
    pub fn order_key(&self) -> (u32, u8) {
        (self.tick, self.kind().rank())
    }

    /// Compare two events by the sequencer ordering. Payload contents do not
    /// take part, so equal keys compare `Equal` and stable algorithms keep
    /// their relative order.
    pub fn cmp_order(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }

    /// Strictly-before test
    pub fn precedes(&self, other: &Self) -> bool {
        self.cmp_order(other) == Ordering::Less
    }
}

/// Check that a slice is sorted under the sequencer ordering
pub fn is_sorted(events: &[SequencerEvent]) -> bool {
    events
        .windows(2)
        .all(|pair| pair[0].cmp_order(&pair[1]) != Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> MidiData {
        MidiData::new(0x90, 60, 100, 0)
    }

    #[test]
    fn test_tick_dominates_kind() {
        let early_on = SequencerEvent::note_on(10, data());
        let late_off = SequencerEvent::note_off(11, data());
        assert!(early_on.precedes(&late_off));
        assert!(!late_off.precedes(&early_on));
    }

    #[test]
    fn test_kind_rank_on_same_tick() {
        let tick = 480;
        let mut events = vec![
            SequencerEvent::note_on(tick, data()),
            SequencerEvent::new(tick, EventPayload::Harmonicity(MidiData::new(0xB0, 56, 1, 0))),
            SequencerEvent::new(tick, EventPayload::JustIntonation(MidiData::new(0xB0, 57, 1, 0))),
            SequencerEvent::period(tick, 1200.0),
            SequencerEvent::generator(tick, 700.0),
            SequencerEvent::new(tick, EventPayload::Other(MidiData::new(0xE0, 0, 64, 0))),
            SequencerEvent::controller(tick, MidiData::new(0xB0, 7, 100, 0)),
            SequencerEvent::note_off(tick, data()),
        ];
        events.sort_by(|a, b| a.cmp_order(b));

        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::NoteOff,
                EventKind::ControllerChange,
                EventKind::Other,
                EventKind::TuningGenerator,
                EventKind::TuningPeriod,
                EventKind::JustIntonation,
                EventKind::Harmonicity,
                EventKind::NoteOn,
            ]
        );
    }

    #[test]
    fn test_payload_shape_follows_kind() {
        let generator = SequencerEvent::generator(0, 702.0);
        assert_eq!(generator.kind(), EventKind::TuningGenerator);
        assert_eq!(generator.payload.value(), Some(702.0));
        assert!(generator.payload.midi_data().is_none());
        assert_eq!(generator.track(), None);

        let cc = SequencerEvent::controller(0, MidiData::new(0xB3, 7, 64, 5));
        assert_eq!(cc.payload.value(), None);
        assert_eq!(cc.track(), Some(5));
        assert_eq!(cc.payload.midi_data().map(|d| d.channel()), Some(3));
    }

    #[test]
    fn test_equal_keys_compare_equal() {
        let a = SequencerEvent::note_on(5, MidiData::new(0x90, 60, 100, 0));
        let b = SequencerEvent::note_on(5, MidiData::new(0x91, 72, 30, 3));
        assert_eq!(a.cmp_order(&b), Ordering::Equal);
        assert!(!a.precedes(&b));
        assert!(!b.precedes(&a));
    }

    #[test]
    fn test_is_sorted() {
        let sorted = [
            SequencerEvent::note_off(0, data()),
            SequencerEvent::note_on(0, data()),
            SequencerEvent::note_off(10, data()),
        ];
        assert!(is_sorted(&sorted));
        assert!(is_sorted(&[]));

        let unsorted = [
            SequencerEvent::note_on(0, data()),
            SequencerEvent::note_off(0, data()),
        ];
        assert!(!is_sorted(&unsorted));
    }

    #[test]
    fn test_tuning_kinds() {
        assert!(EventKind::TuningGenerator.is_tuning());
        assert!(EventKind::Harmonicity.is_tuning());
        assert!(!EventKind::ControllerChange.is_tuning());
        assert!(!EventKind::NoteOn.is_tuning());
    }
}
