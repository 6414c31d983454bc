// Sequencer module
// Event model, envelope resampling, stream merging and real-time playback

pub mod envelope;
pub mod event;
pub mod merger;
pub mod metronome;
pub mod note;
pub mod player;
pub mod timeline;
pub mod track;
pub mod transport;

pub use envelope::{
    ControllerStream, ControllerTarget, Envelope, EnvelopeError, EnvelopeResampler, FloatTarget,
};
pub use event::{EventKind, EventPayload, MidiData, SequencerEvent};
pub use merger::{EventStreamMerger, insertion_sort, merge_sorted};
pub use metronome::{ClickType, MetronomeScheduler};
pub use note::{Note, NoteEventExtractor};
pub use player::{MidiEventPlayer, PlayerCore};
pub use timeline::{MusicalTime, Tempo, TimeSignature, TimingSettings};
pub use track::{
    ControllerEnvelope, EventStreamBuilder, GlobalEnvelopes, MAX_TRACKS, Track, TrackError,
    TrackList,
};
pub use transport::{LoopRegion, LoopState, TransportState};
