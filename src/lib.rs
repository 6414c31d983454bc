// hexseq - Library exports for the CLI, tests and benchmarks

pub mod arrangement;
pub mod export;
pub mod messaging;
pub mod midi;
pub mod sequencer;
pub mod tuning;

// Re-export commonly used types for convenience
pub use arrangement::{Arrangement, ArrangementError, Sequence};
pub use export::{ExportError, MidiFileBuilder};
pub use messaging::{PlayerNotification, create_notification_channel};
pub use midi::{MessageLog, MidiPortManager, OutputSink};
pub use sequencer::{
    Envelope, EnvelopeResampler, EventKind, EventPayload, EventStreamBuilder, EventStreamMerger,
    MidiData, MidiEventPlayer, Note, NoteEventExtractor, PlayerCore, SequencerEvent, Tempo,
    TimeSignature, TimingSettings,
};
pub use tuning::{AddressMapper, LatticeCoord, LinearLatticeMapper};
