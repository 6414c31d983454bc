// MIDI output device discovery

use midir::MidiOutput;

const CLIENT_NAME: &str = "hexseq";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiDeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
}

pub struct MidiDeviceManager;

impl MidiDeviceManager {
    pub fn new() -> Self {
        Self
    }

    /// List every output port currently available. Empty if the MIDI
    /// backend cannot be initialised.
    pub fn list_output_ports(&self) -> Vec<MidiDeviceInfo> {
        let midi_out = match MidiOutput::new(CLIENT_NAME) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to initialize MIDI output");
                return Vec::new();
            }
        };

        midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_out.port_name(port).ok().map(|name| MidiDeviceInfo {
                    index,
                    name,
                    // first port is treated as the default
                    is_default: index == 0,
                })
            })
            .collect()
    }

    /// Index of the first output port whose name contains `pattern`
    pub fn find_output_port(&self, pattern: &str) -> Option<usize> {
        self.list_output_ports()
            .into_iter()
            .find(|device| device.name.contains(pattern))
            .map(|device| device.index)
    }
}

impl Default for MidiDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}
