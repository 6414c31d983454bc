pub mod device;
pub mod event;
pub mod manager;
pub mod sink;

pub use device::{MidiDeviceInfo, MidiDeviceManager};
pub use event::MidiMessage;
pub use manager::{MidiPortError, MidiPortManager};
pub use sink::{MessageLog, OutputSink, SentMessage, TracingSink};
