// Export module
// Writes event streams to Standard MIDI Files

pub mod smf;

pub use smf::{ExportError, MAX_VLQ, MidiFileBuilder, write_vlq};
