// Arrangement - RON description of a complete sequence
// Loaded from disk and turned into tracks, tuning envelopes and timing

use crate::sequencer::envelope::{
    Envelope, EnvelopeError, EnvelopeResampler, MAX_RESAMPLED_EVENTS,
};
use crate::sequencer::event::SequencerEvent;
use crate::sequencer::note::Note;
use crate::sequencer::timeline::{Tempo, TimeSignature, TimingSettings};
use crate::sequencer::track::{
    ControllerEnvelope, EventStreamBuilder, GlobalEnvelopes, Track, TrackError, TrackList,
};
use crate::sequencer::transport::LoopRegion;
use crate::tuning::LinearLatticeMapper;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ArrangementError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid arrangement: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("Invalid time signature {0}/{1}")]
    InvalidTimeSignature(u8, u8),

    #[error("Tempo of {0} BPM is outside 20-999")]
    InvalidTempo(f64),

    #[error("Invalid loop region {start}..{end}")]
    InvalidLoopRegion { start: f64, end: f64 },

    #[error("Track {track}: channel {channel} / controller {controller} out of range")]
    InvalidController {
        track: usize,
        channel: u8,
        controller: u8,
    },

    #[error("Envelope resolution of {0} ms must be positive")]
    InvalidResolution(f64),

    #[error("{name} envelope resamples to {events} events, more than {max}")]
    EnvelopeTooLong {
        name: String,
        events: usize,
        max: usize,
    },

    #[error(transparent)]
    Track(#[from] TrackError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Controller automation on one track, as (tick, value) pairs with values in 0..=1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerEnvelopeSpec {
    pub channel: u8,
    pub controller: u8,
    pub nodes: Vec<(u32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSpec {
    pub name: String,
    pub notes: Vec<Note>,
    pub envelopes: Vec<ControllerEnvelopeSpec>,
    pub output_port: Option<usize>,
    pub sends_tuning: bool,
}

impl Default for TrackSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            notes: Vec::new(),
            envelopes: Vec::new(),
            output_port: None,
            sends_tuning: true,
        }
    }
}

/// A sequence as written by hand. Every field is optional in the file.
///
/// ```text
/// (
///     bpm: 96.0,
///     time_signature: (6, 8),
///     tracks: [
///         (name: "lead", notes: [(lane: 25, start: 0, duration: 480)]),
///     ],
///     generator: [(0, 0.585)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arrangement {
    pub bpm: f64,
    /// (numerator, denominator)
    pub time_signature: (u8, u8),
    pub tracks: Vec<TrackSpec>,
    /// Generator in octaves
    pub generator: Vec<(u32, f32)>,
    pub harmonicity: Vec<(u32, f32)>,
    pub just_intonation: Vec<(u32, f32)>,
    /// Period in octaves
    pub period: Vec<(u32, f32)>,
    /// Loop bounds in ticks
    pub loop_region: Option<(f64, f64)>,
    pub timing: TimingSettings,
}

impl Default for Arrangement {
    fn default() -> Self {
        Self {
            bpm: Tempo::default().bpm(),
            time_signature: (4, 4),
            tracks: Vec::new(),
            generator: Vec::new(),
            harmonicity: Vec::new(),
            just_intonation: Vec::new(),
            period: Vec::new(),
            loop_region: None,
            timing: TimingSettings::default(),
        }
    }
}

impl Arrangement {
    pub fn from_ron_str(source: &str) -> Result<Self, ArrangementError> {
        Ok(ron::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ArrangementError> {
        let source = std::fs::read_to_string(path).map_err(|source| ArrangementError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let arrangement = Self::from_ron_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            tracks = arrangement.tracks.len(),
            "Arrangement loaded"
        );
        Ok(arrangement)
    }

    /// Validate the description and build the playable sequence
    pub fn build(&self) -> Result<Sequence, ArrangementError> {
        let (numerator, denominator) = self.time_signature;
        let time_signature = TimeSignature::new(numerator, denominator)
            .ok_or(ArrangementError::InvalidTimeSignature(numerator, denominator))?;
        let tempo = Tempo::new(self.bpm).ok_or(ArrangementError::InvalidTempo(self.bpm))?;

        let resolution = self.timing.envelope_resolution_ms;
        if !(resolution > 0.0 && resolution.is_finite()) {
            return Err(ArrangementError::InvalidResolution(resolution));
        }

        let loop_region = match self.loop_region {
            Some((start, end)) => Some(
                LoopRegion::new(start, end)
                    .ok_or(ArrangementError::InvalidLoopRegion { start, end })?,
            ),
            None => None,
        };

        let mut tracks = TrackList::new();
        for (index, entry) in self.tracks.iter().enumerate() {
            let mut track = Track::new(entry.name.clone());
            track.output_port = entry.output_port;
            track.sends_tuning = entry.sends_tuning;
            for note in &entry.notes {
                track.add_note(Note::new(
                    index as u8,
                    note.lane,
                    note.start,
                    note.duration,
                    note.velocity,
                ));
            }
            for controller in &entry.envelopes {
                if controller.channel > 15 || controller.controller > 127 {
                    return Err(ArrangementError::InvalidController {
                        track: index,
                        channel: controller.channel,
                        controller: controller.controller,
                    });
                }
                let envelope = Envelope::from_sorted(controller.nodes.iter().copied())?;
                track.add_envelope(ControllerEnvelope::new(
                    controller.channel,
                    controller.controller,
                    envelope,
                ));
            }
            tracks.add_track(track)?;
        }

        let globals = GlobalEnvelopes {
            generator: Envelope::from_sorted(self.generator.iter().copied())?,
            harmonicity: Envelope::from_sorted(self.harmonicity.iter().copied())?,
            just_intonation: Envelope::from_sorted(self.just_intonation.iter().copied())?,
            period: Envelope::from_sorted(self.period.iter().copied())?,
        };

        let sequence = Sequence {
            tracks,
            globals,
            tempo,
            time_signature,
            loop_region,
            timing: self.timing,
        };
        sequence.check_envelope_sizes()?;
        Ok(sequence)
    }
}

/// A validated arrangement, ready to be played or exported
#[derive(Debug, Clone)]
pub struct Sequence {
    pub tracks: TrackList,
    pub globals: GlobalEnvelopes,
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    pub loop_region: Option<LoopRegion>,
    pub timing: TimingSettings,
}

impl Sequence {
    pub fn ms_per_tick(&self) -> f64 {
        self.tempo.ms_per_tick(&self.time_signature)
    }

    /// Last tick with content on any track or tuning envelope
    pub fn end_tick(&self) -> u32 {
        self.tracks.end_tick().max(self.globals.end_tick())
    }

    fn check_envelope_sizes(&self) -> Result<(), ArrangementError> {
        let resampler = EnvelopeResampler::with_settings(self.ms_per_tick(), &self.timing);
        let globals = [
            ("generator", &self.globals.generator),
            ("harmonicity", &self.globals.harmonicity),
            ("just_intonation", &self.globals.just_intonation),
            ("period", &self.globals.period),
        ];
        let named = globals
            .into_iter()
            .map(|(name, envelope)| (name.to_string(), envelope))
            .chain(self.tracks.iter().flat_map(|track| {
                track.envelopes.iter().map(move |controller| {
                    (
                        format!("{} controller {}", track.name, controller.controller),
                        &controller.envelope,
                    )
                })
            }));

        for (name, envelope) in named {
            let events = resampler.max_event_count(envelope);
            if events > MAX_RESAMPLED_EVENTS {
                return Err(ArrangementError::EnvelopeTooLong {
                    name,
                    events,
                    max: MAX_RESAMPLED_EVENTS,
                });
            }
        }
        Ok(())
    }

    /// The merged event stream, with lanes mapped linearly onto channels
    pub fn events(&self) -> Vec<SequencerEvent> {
        let resampler = EnvelopeResampler::with_settings(self.ms_per_tick(), &self.timing);
        EventStreamBuilder::new(resampler, &LinearLatticeMapper).build(&self.tracks, &self.globals)
    }
}
