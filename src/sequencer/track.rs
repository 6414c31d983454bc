// Tracks - notes and controller envelopes grouped per output
// Also assembles the complete event stream from every source

use super::envelope::{
    ControllerStream, ControllerTarget, Envelope, EnvelopeResampler, FloatTarget,
};
use super::event::SequencerEvent;
use super::merger::EventStreamMerger;
use super::note::{Note, NoteEventExtractor};
use crate::tuning::AddressMapper;
use crate::tuning::controller::{HARMONICITY_CONTROLLER, JUST_INTONATION_CONTROLLER};

/// Maximum number of tracks in a sequence
pub const MAX_TRACKS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackError {
    #[error("Track limit reached (at most {max} tracks)")]
    LimitReached { max: usize },

    #[error("No track at index {0}")]
    NoSuchTrack(usize),
}

/// A controller envelope bound to a channel and controller number
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControllerEnvelope {
    /// 0-15
    pub channel: u8,
    pub controller: u8,
    pub envelope: Envelope,
}

impl ControllerEnvelope {
    pub fn new(channel: u8, controller: u8, envelope: Envelope) -> Self {
        Self {
            channel: channel & 0x0F,
            controller: controller & 0x7F,
            envelope,
        }
    }
}

/// Notes and controller envelopes sent to one output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Track {
    pub name: String,
    pub notes: Vec<Note>,
    pub envelopes: Vec<ControllerEnvelope>,
    /// Output port index, if one is assigned
    pub output_port: Option<usize>,
    /// Whether tuning messages are forwarded to this track's output
    pub sends_tuning: bool,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sends_tuning: true,
            ..Self::default()
        }
    }

    pub fn add_note(&mut self, note: Note) {
        self.notes.push(note);
    }

    pub fn add_envelope(&mut self, envelope: ControllerEnvelope) {
        self.envelopes.push(envelope);
    }

    /// Tick at which the last note on this track ends
    pub fn end_tick(&self) -> u32 {
        let notes_end = self.notes.iter().map(Note::end).max().unwrap_or(0);
        let envelopes_end = self
            .envelopes
            .iter()
            .filter_map(|env| env.envelope.nodes().last().map(|node| node.tick))
            .max()
            .unwrap_or(0);
        notes_end.max(envelopes_end)
    }
}

/// The current set of tracks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackList {
    tracks: Vec<Track>,
}

impl TrackList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track and return its index
    pub fn add_track(&mut self, track: Track) -> Result<u8, TrackError> {
        if self.tracks.len() >= MAX_TRACKS {
            return Err(TrackError::LimitReached { max: MAX_TRACKS });
        }
        self.tracks.push(track);
        Ok((self.tracks.len() - 1) as u8)
    }

    pub fn remove_track(&mut self, index: usize) -> Result<Track, TrackError> {
        if index >= self.tracks.len() {
            return Err(TrackError::NoSuchTrack(index));
        }
        Ok(self.tracks.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Track, TrackError> {
        self.tracks.get_mut(index).ok_or(TrackError::NoSuchTrack(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Latest tick any track has content at
    pub fn end_tick(&self) -> u32 {
        self.tracks.iter().map(Track::end_tick).max().unwrap_or(0)
    }
}

/// Tuning envelopes shared by every track
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalEnvelopes {
    pub generator: Envelope,
    pub harmonicity: Envelope,
    pub just_intonation: Envelope,
    pub period: Envelope,
}

impl GlobalEnvelopes {
    pub fn end_tick(&self) -> u32 {
        [
            &self.generator,
            &self.harmonicity,
            &self.just_intonation,
            &self.period,
        ]
        .iter()
        .filter_map(|env| env.nodes().last().map(|node| node.tick))
        .max()
        .unwrap_or(0)
    }
}

/// Builds the single ordered event stream consumed by the player and the
/// file encoder
pub struct EventStreamBuilder<'a, M: AddressMapper + ?Sized> {
    resampler: EnvelopeResampler,
    mapper: &'a M,
}

impl<'a, M: AddressMapper + ?Sized> EventStreamBuilder<'a, M> {
    pub fn new(resampler: EnvelopeResampler, mapper: &'a M) -> Self {
        Self { resampler, mapper }
    }

    /// Notes first, then the global envelopes, then every track's controller
    /// envelopes. Sources added earlier win ties.
    pub fn build(&self, tracks: &TrackList, globals: &GlobalEnvelopes) -> Vec<SequencerEvent> {
        let mut merger = EventStreamMerger::new();

        // notes take the index of the track that holds them
        let notes: Vec<Note> = tracks
            .iter()
            .enumerate()
            .flat_map(|(index, track)| {
                track.notes.iter().map(move |note| Note {
                    track: index as u8,
                    ..*note
                })
            })
            .collect();
        merger.add_sorted(NoteEventExtractor::new(self.mapper).extract(&notes));

        merger.add_sorted(
            self.resampler
                .resample_float(&globals.generator, FloatTarget::Generator),
        );
        merger.add_sorted(self.resampler.resample_controller(
            &globals.harmonicity,
            ControllerTarget {
                stream: ControllerStream::Harmonicity,
                channel: 0,
                controller: HARMONICITY_CONTROLLER,
                track: 0,
            },
        ));
        merger.add_sorted(self.resampler.resample_controller(
            &globals.just_intonation,
            ControllerTarget {
                stream: ControllerStream::JustIntonation,
                channel: 0,
                controller: JUST_INTONATION_CONTROLLER,
                track: 0,
            },
        ));
        merger.add_sorted(
            self.resampler
                .resample_float(&globals.period, FloatTarget::Period),
        );

        for (index, track) in tracks.iter().enumerate() {
            for controller in &track.envelopes {
                let target = ControllerTarget::controller(
                    controller.channel,
                    controller.controller,
                    index as u8,
                );
                merger.add_sorted(
                    self.resampler
                        .resample_controller(&controller.envelope, target),
                );
            }
        }

        let events = merger.into_events();
        tracing::debug!(
            events = events.len(),
            tracks = tracks.len(),
            "Event stream assembled"
        );
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::event::{EventKind, is_sorted};
    use crate::tuning::LinearLatticeMapper;

    fn builder() -> EventStreamBuilder<'static, LinearLatticeMapper> {
        EventStreamBuilder::new(EnvelopeResampler::new(1.0, 24.0), &LinearLatticeMapper)
    }

    #[test]
    fn test_track_limit() {
        let mut tracks = TrackList::new();
        for i in 0..MAX_TRACKS {
            assert_eq!(tracks.add_track(Track::new(format!("Track {i}"))), Ok(i as u8));
        }
        assert_eq!(
            tracks.add_track(Track::new("one too many")),
            Err(TrackError::LimitReached { max: 32 })
        );
        assert_eq!(tracks.len(), MAX_TRACKS);
    }

    #[test]
    fn test_remove_track() {
        let mut tracks = TrackList::new();
        tracks.add_track(Track::new("a")).unwrap();
        assert!(tracks.remove_track(3).is_err());
        assert_eq!(tracks.remove_track(0).unwrap().name, "a");
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_end_tick() {
        let mut track = Track::new("lead");
        track.add_note(Note::new(0, 25, 100, 380, 90));
        track.add_envelope(ControllerEnvelope::new(
            0,
            7,
            Envelope::from_sorted([(0, 0.0), (960, 1.0)]).unwrap(),
        ));
        assert_eq!(track.end_tick(), 960);
    }

    #[test]
    fn test_empty_build() {
        let events = builder().build(&TrackList::new(), &GlobalEnvelopes::default());
        assert!(events.is_empty());
    }

    #[test]
    fn test_build_merges_every_source() {
        let mut tracks = TrackList::new();
        let mut first = Track::new("first");
        first.add_note(Note::new(9, 25, 0, 100, 90));
        tracks.add_track(first).unwrap();

        let mut second = Track::new("second");
        second.add_note(Note::new(0, 25, 50, 50, 90));
        second.add_envelope(ControllerEnvelope::new(
            3,
            74,
            Envelope::from_sorted([(0, 0.0), (48, 1.0)]).unwrap(),
        ));
        tracks.add_track(second).unwrap();

        let globals = GlobalEnvelopes {
            generator: Envelope::from_sorted([(0, 0.5)]).unwrap(),
            harmonicity: Envelope::from_sorted([(10, 0.25)]).unwrap(),
            just_intonation: Envelope::from_sorted([(20, 1.0)]).unwrap(),
            period: Envelope::new(),
        };

        let events = builder().build(&tracks, &globals);
        assert!(is_sorted(&events));
        // 4 note events, 1 generator, 1 harmonicity, 1 JI, 3 controller samples
        assert_eq!(events.len(), 10);

        // notes are stamped with the index of their track
        let note_tracks: Vec<Option<u8>> = events
            .iter()
            .filter(|e| matches!(e.kind(), EventKind::NoteOn | EventKind::NoteOff))
            .map(|e| e.track())
            .collect();
        assert_eq!(note_tracks, vec![Some(0), Some(1), Some(0), Some(1)]);

        let harmonicity = events
            .iter()
            .find(|e| e.kind() == EventKind::Harmonicity)
            .unwrap();
        let data = harmonicity.payload.midi_data().unwrap();
        assert_eq!((data.status, data.data1, data.data2, data.track), (0xB0, 56, 32, 0));

        let controllers: Vec<_> = events
            .iter()
            .filter(|e| e.kind() == EventKind::ControllerChange)
            .map(|e| *e.payload.midi_data().unwrap())
            .collect();
        assert_eq!(controllers.len(), 3);
        assert!(controllers.iter().all(|d| d.status == 0xB3 && d.track == 1));

        // at tick 0 the controller precedes the generator, which precedes the note-on
        let first_kinds: Vec<EventKind> = events
            .iter()
            .take_while(|e| e.tick == 0)
            .map(|e| e.kind())
            .collect();
        assert_eq!(
            first_kinds,
            vec![
                EventKind::ControllerChange,
                EventKind::TuningGenerator,
                EventKind::NoteOn
            ]
        );
    }
}
