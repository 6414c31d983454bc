// Envelopes - sparse automation curves and their resampling into events
// Piecewise-linear interpolation at a fixed wall-clock resolution

use super::event::{EventPayload, MidiData, SequencerEvent};
use super::timeline::TimingSettings;
use serde::{Deserialize, Serialize};

/// Float-domain envelope values are stored in octaves and sent in cents
pub const CENTS_PER_UNIT: f64 = 1200.0;

/// Largest resampled stream accepted for a single envelope
pub const MAX_RESAMPLED_EVENTS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Envelope node at tick {tick} does not follow node at tick {previous}")]
    UnsortedNodes { previous: u32, tick: u32 },
}

/// One control point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeNode {
    pub tick: u32,
    pub value: f32,
}

/// Ordered mapping from tick to value. Ticks are strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(u32, f32)>", into = "Vec<(u32, f32)>")]
pub struct Envelope {
    nodes: Vec<EnvelopeNode>,
}

impl Envelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild an envelope from (tick, value) pairs in tick order
    pub fn from_sorted<I>(pairs: I) -> Result<Self, EnvelopeError>
    where
        I: IntoIterator<Item = (u32, f32)>,
    {
        let mut nodes: Vec<EnvelopeNode> = Vec::new();
        for (tick, value) in pairs {
            if let Some(previous) = nodes.last() {
                if previous.tick >= tick {
                    return Err(EnvelopeError::UnsortedNodes {
                        previous: previous.tick,
                        tick,
                    });
                }
            }
            nodes.push(EnvelopeNode { tick, value });
        }
        Ok(Self { nodes })
    }

    fn position(&self, tick: u32) -> Result<usize, usize> {
        self.nodes.binary_search_by_key(&tick, |node| node.tick)
    }

    /// Insert a node, keeping ticks sorted. Returns the replaced value if a
    /// node already existed at `tick`.
    pub fn insert(&mut self, tick: u32, value: f32) -> Option<f32> {
        match self.position(tick) {
            Ok(index) => Some(std::mem::replace(&mut self.nodes[index].value, value)),
            Err(index) => {
                self.nodes.insert(index, EnvelopeNode { tick, value });
                None
            }
        }
    }

    /// Remove the node at `tick`
    pub fn remove(&mut self, tick: u32) -> Option<f32> {
        self.position(tick)
            .ok()
            .map(|index| self.nodes.remove(index).value)
    }

    /// Change the value of an existing node. Returns false if there is none.
    pub fn replace_value(&mut self, tick: u32, value: f32) -> bool {
        match self.position(tick) {
            Ok(index) => {
                self.nodes[index].value = value;
                true
            }
            Err(_) => false,
        }
    }

    /// Move a node to a new tick with a new value
    pub fn move_node(&mut self, old_tick: u32, new_tick: u32, value: f32) -> bool {
        if self.remove(old_tick).is_none() {
            return false;
        }
        self.insert(new_tick, value);
        true
    }

    pub fn get(&self, tick: u32) -> Option<f32> {
        self.position(tick).ok().map(|index| self.nodes[index].value)
    }

    pub fn nodes(&self) -> &[EnvelopeNode] {
        &self.nodes
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        self.nodes.iter().map(|node| (node.tick, node.value))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

/// Collects in any order; a later pair at the same tick wins
impl FromIterator<(u32, f32)> for Envelope {
    fn from_iter<I: IntoIterator<Item = (u32, f32)>>(pairs: I) -> Self {
        let mut envelope = Envelope::new();
        for (tick, value) in pairs {
            envelope.insert(tick, value);
        }
        envelope
    }
}

impl TryFrom<Vec<(u32, f32)>> for Envelope {
    type Error = EnvelopeError;

    fn try_from(pairs: Vec<(u32, f32)>) -> Result<Self, Self::Error> {
        Self::from_sorted(pairs)
    }
}

impl From<Envelope> for Vec<(u32, f32)> {
    fn from(envelope: Envelope) -> Self {
        envelope.iter().collect()
    }
}

/// Float-valued tuning streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatTarget {
    Generator,
    Period,
}

impl FloatTarget {
    fn event(self, tick: u32, cents: f32) -> SequencerEvent {
        match self {
            FloatTarget::Generator => SequencerEvent::generator(tick, cents),
            FloatTarget::Period => SequencerEvent::period(tick, cents),
        }
    }
}

/// Which event kind a controller-domain envelope produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStream {
    Controller,
    Harmonicity,
    JustIntonation,
}

/// Address stamped on every event of a controller-domain envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerTarget {
    pub stream: ControllerStream,
    /// 0-15
    pub channel: u8,
    pub controller: u8,
    pub track: u8,
}

impl ControllerTarget {
    pub fn controller(channel: u8, controller: u8, track: u8) -> Self {
        Self {
            stream: ControllerStream::Controller,
            channel,
            controller,
            track,
        }
    }

    fn event(&self, tick: u32, value: u8) -> SequencerEvent {
        let data = MidiData::new(
            crate::midi::event::CONTROL_CHANGE | (self.channel & 0x0F),
            self.controller,
            value,
            self.track,
        );
        let payload = match self.stream {
            ControllerStream::Controller => EventPayload::ControllerChange(data),
            ControllerStream::Harmonicity => EventPayload::Harmonicity(data),
            ControllerStream::JustIntonation => EventPayload::JustIntonation(data),
        };
        SequencerEvent::new(tick, payload)
    }
}

/// Round a normalized value to a controller byte
fn controller_value(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 127.0 + 0.5) as u8
}

fn controller_byte(event: &SequencerEvent) -> Option<u8> {
    event.payload.midi_data().map(|data| data.data2)
}

/// Converts envelopes into dense event arrays sorted by tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeResampler {
    ms_per_tick: f64,
    resolution_ms: f64,
}

impl EnvelopeResampler {
    pub fn new(ms_per_tick: f64, resolution_ms: f64) -> Self {
        debug_assert!(ms_per_tick > 0.0 && resolution_ms > 0.0);
        Self {
            ms_per_tick,
            resolution_ms,
        }
    }

    pub fn with_settings(ms_per_tick: f64, timing: &TimingSettings) -> Self {
        Self::new(ms_per_tick, timing.envelope_resolution_ms)
    }

    pub fn ms_per_tick(&self) -> f64 {
        self.ms_per_tick
    }

    pub fn resolution_ms(&self) -> f64 {
        self.resolution_ms
    }

    fn node_positions_ms(&self, envelope: &Envelope) -> Vec<f64> {
        envelope
            .nodes()
            .iter()
            .map(|node| node.tick as f64 * self.ms_per_tick)
            .collect()
    }

    fn samples_in_span(&self, span_ms: f64) -> u64 {
        (span_ms / self.resolution_ms).floor() as u64
    }

    /// Upper bound on the number of events produced for `envelope`
    pub fn max_event_count(&self, envelope: &Envelope) -> usize {
        if envelope.is_empty() {
            return 0;
        }
        let positions = self.node_positions_ms(envelope);
        let ramps: u64 = envelope
            .nodes()
            .windows(2)
            .zip(positions.windows(2))
            .filter(|(pair, _)| pair[0].value != pair[1].value)
            .map(|(_, ms)| self.samples_in_span(ms[1] - ms[0]) + 1)
            .sum();
        ramps as usize + 1
    }

    /// Visit every interpolated sample, then the final node
    fn for_each_sample(&self, envelope: &Envelope, mut emit: impl FnMut(u32, f64)) {
        let nodes = envelope.nodes();
        let Some(last) = nodes.last() else {
            return;
        };

        let positions = self.node_positions_ms(envelope);
        let ticks_per_sample = self.resolution_ms / self.ms_per_tick;

        for (i, pair) in nodes.windows(2).enumerate() {
            let (left, right) = (pair[0], pair[1]);
            if left.value == right.value {
                continue;
            }

            let span_ms = positions[i + 1] - positions[i];
            // positions derived from the sample index so error does not accumulate
            for n in 0..=self.samples_in_span(span_ms) {
                let t = n as f64 * self.resolution_ms / span_ms;
                let value = t * right.value as f64 + (1.0 - t) * left.value as f64;
                let tick = (left.tick as f64 + n as f64 * ticks_per_sample).floor() as u32;
                emit(tick.min(right.tick), value);
            }
        }

        emit(last.tick, last.value as f64);
    }

    /// Resample a tuning envelope. Values are scaled to cents.
    pub fn resample_float(&self, envelope: &Envelope, target: FloatTarget) -> Vec<SequencerEvent> {
        if envelope.is_empty() {
            return Vec::new();
        }

        let capacity = self.max_event_count(envelope);
        let mut events: Vec<SequencerEvent> = Vec::with_capacity(capacity);
        self.for_each_sample(envelope, |tick, value| {
            // a later sample on the same tick supersedes the earlier one
            if events.last().is_some_and(|last| last.tick == tick) {
                events.pop();
            }
            events.push(target.event(tick, (value * CENTS_PER_UNIT) as f32));
        });

        debug_assert!(events.len() <= capacity);
        events
    }

    /// Resample a normalized envelope into controller messages, dropping
    /// samples that would repeat the previous controller value.
    ///
    /// The final node follows the same rule: it is omitted when its byte
    /// equals the last emitted one.
    pub fn resample_controller(
        &self,
        envelope: &Envelope,
        target: ControllerTarget,
    ) -> Vec<SequencerEvent> {
        if envelope.is_empty() {
            return Vec::new();
        }

        let capacity = self.max_event_count(envelope);
        let mut events: Vec<SequencerEvent> = Vec::with_capacity(capacity);
        self.for_each_sample(envelope, |tick, value| {
            let byte = controller_value(value);
            if events.last().is_some_and(|last| last.tick == tick) {
                events.pop();
            }
            if events.last().and_then(controller_byte) == Some(byte) {
                return;
            }
            events.push(target.event(tick, byte));
        });

        debug_assert!(events.len() <= capacity);
        events
    }
}
