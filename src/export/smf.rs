// Standard MIDI File encoder
// Header chunk, one length-prefixed chunk per track, running status within a track

use crate::midi::event::{CONTROL_CHANGE, NOTE_ON};
use crate::sequencer::event::{EventPayload, SequencerEvent};
use crate::sequencer::timeline::{TICKS_PER_QUARTER, Tempo, TimeSignature};
use crate::tuning::TuningControllers;
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;

const HEADER_CHUNK: &[u8; 4] = b"MThd";
const TRACK_CHUNK: &[u8; 4] = b"MTrk";

const META_EVENT: u8 = 0xFF;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;
const META_TIME_SIGNATURE: u8 = 0x58;

/// Largest delta time a four-byte variable-length quantity can hold
pub const MAX_VLQ: u32 = 0x0FFF_FFFF;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Sequence has no tracks to export")]
    NoTracks,

    #[error("Delta time of {0} ticks cannot be encoded")]
    DeltaTimeOverflow(u32),

    #[error("Failed to create {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write `value` as a variable-length quantity: 7 bits per byte, most
/// significant group first, continuation bit on all but the last byte.
/// Returns the number of bytes written.
pub fn write_vlq<W: Write>(out: &mut W, value: u32) -> Result<u32, ExportError> {
    if value > MAX_VLQ {
        return Err(ExportError::DeltaTimeOverflow(value));
    }

    let mut groups = [0u8; 4];
    let mut count = 0;
    let mut remaining = value;
    loop {
        groups[count] = (remaining & 0x7F) as u8;
        count += 1;
        remaining >>= 7;
        if remaining == 0 {
            break;
        }
    }

    let mut bytes = [0u8; 4];
    for (i, group) in groups[..count].iter().rev().enumerate() {
        let continuation = if i + 1 < count { 0x80 } else { 0 };
        bytes[i] = group | continuation;
    }
    out.write_all(&bytes[..count])?;
    Ok(count as u32)
}

/// Number of data bytes following a channel status byte
fn data_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        _ => 2,
    }
}

/// Byte writer for one track chunk, counting bytes and tracking running status
struct TrackWriter<'w, W: Write> {
    out: &'w mut W,
    running_status: Option<u8>,
    length: u32,
}

impl<'w, W: Write> TrackWriter<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Self {
            out,
            running_status: None,
            length: 0,
        }
    }

    fn bytes(&mut self, bytes: &[u8]) -> Result<(), ExportError> {
        self.out.write_all(bytes)?;
        self.length += bytes.len() as u32;
        Ok(())
    }

    fn delta(&mut self, delta: u32) -> Result<(), ExportError> {
        self.length += write_vlq(&mut *self.out, delta)?;
        Ok(())
    }

    fn meta(&mut self, delta: u32, kind: u8, data: &[u8]) -> Result<(), ExportError> {
        self.delta(delta)?;
        self.bytes(&[META_EVENT, kind, data.len() as u8])?;
        self.bytes(data)?;
        // a meta event cancels running status
        self.running_status = None;
        Ok(())
    }

    fn channel(&mut self, delta: u32, status: u8, data1: u8, data2: u8) -> Result<(), ExportError> {
        self.delta(delta)?;
        if self.running_status != Some(status) {
            self.bytes(&[status])?;
            self.running_status = Some(status);
        }
        let data = [data1 & 0x7F, data2 & 0x7F];
        self.bytes(&data[..data_len(status)])
    }

    fn controllers(&mut self, delta: u32, messages: [(u8, u8); 3]) -> Result<(), ExportError> {
        let mut delta = delta;
        for (controller, value) in messages {
            self.channel(delta, CONTROL_CHANGE, controller, value)?;
            delta = 0;
        }
        Ok(())
    }
}

/// Builds a multi-track sequence file from a merged event stream.
///
/// Events addressed to a track go to that track only; tuning events are
/// copied to every track.
#[derive(Debug, Clone)]
pub struct MidiFileBuilder {
    ticks_per_quarter: u16,
    tempo: Tempo,
    time_signature: TimeSignature,
    min_tracks: usize,
    tracks: Vec<Vec<SequencerEvent>>,
}

impl Default for MidiFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiFileBuilder {
    pub fn new() -> Self {
        Self {
            ticks_per_quarter: TICKS_PER_QUARTER as u16,
            tempo: Tempo::default(),
            time_signature: TimeSignature::default(),
            min_tracks: 0,
            tracks: Vec::new(),
        }
    }

    pub fn set_tempo(&mut self, tempo: &Tempo, time_signature: &TimeSignature) {
        self.tempo = *tempo;
        self.time_signature = *time_signature;
    }

    /// Header resolution; the tempo meta event is scaled to match
    pub fn set_resolution(&mut self, ticks_per_quarter: u16) {
        self.ticks_per_quarter = ticks_per_quarter;
    }

    /// Export at least `count` tracks even if some carry no events
    pub fn set_min_tracks(&mut self, count: usize) {
        self.min_tracks = count;
        if self.tracks.len() < count {
            self.tracks.resize_with(count, Vec::new);
        }
    }

    /// Split a sorted event stream into per-track streams
    pub fn set_events(&mut self, events: &[SequencerEvent]) {
        let track_count = events
            .iter()
            .filter(|event| !event.kind().is_tuning())
            .filter_map(SequencerEvent::track)
            .map(|track| track as usize + 1)
            .max()
            .unwrap_or(0)
            .max(self.min_tracks);

        let mut tracks: Vec<Vec<SequencerEvent>> = vec![Vec::new(); track_count];
        for event in events {
            if event.kind().is_tuning() {
                for track in &mut tracks {
                    track.push(*event);
                }
            } else if let Some(track) = event.track() {
                tracks[track as usize].push(*event);
            }
        }

        self.tracks = tracks;
    }

    pub fn num_tracks(&self) -> usize {
        self.tracks.len()
    }

    /// SMF format: 0 for a single track, 1 for several
    pub fn format(&self) -> u16 {
        if self.tracks.len() == 1 { 0 } else { 1 }
    }

    pub fn write_to<W: Write + Seek>(&self, out: &mut W) -> Result<(), ExportError> {
        if self.tracks.is_empty() {
            return Err(ExportError::NoTracks);
        }

        out.write_all(HEADER_CHUNK)?;
        out.write_all(&6u32.to_be_bytes())?;
        out.write_all(&self.format().to_be_bytes())?;
        out.write_all(&(self.tracks.len() as u16).to_be_bytes())?;
        out.write_all(&self.ticks_per_quarter.to_be_bytes())?;

        for events in &self.tracks {
            self.write_track(out, events)?;
        }
        Ok(())
    }

    fn write_track<W: Write + Seek>(
        &self,
        out: &mut W,
        events: &[SequencerEvent],
    ) -> Result<(), ExportError> {
        out.write_all(TRACK_CHUNK)?;
        let length_position = out.stream_position()?;
        // patched once the track is written
        out.write_all(&0u32.to_be_bytes())?;

        let mut writer = TrackWriter::new(out);
        let tempo = self
            .tempo
            .micros_per_quarter(&self.time_signature, self.ticks_per_quarter)
            .to_be_bytes();
        writer.meta(0, META_TEMPO, &tempo[1..])?;
        writer.meta(
            0,
            META_TIME_SIGNATURE,
            &[
                self.time_signature.numerator,
                self.time_signature.denominator_exponent(),
                24,
                8,
            ],
        )?;

        let controllers = TuningControllers::FILE;
        let mut previous_tick = 0;
        for event in events {
            let delta = event.tick - previous_tick;
            previous_tick = event.tick;

            match event.payload {
                EventPayload::TuningGenerator(cents) => {
                    writer.controllers(delta, controllers.generator_messages(cents as f64))?
                }
                EventPayload::TuningPeriod(cents) => {
                    writer.controllers(delta, controllers.period_messages(cents as f64))?
                }
                EventPayload::NoteOff(data) => {
                    writer.channel(delta, NOTE_ON | data.channel(), data.data1, 0)?
                }
                EventPayload::NoteOn(data)
                | EventPayload::ControllerChange(data)
                | EventPayload::Other(data)
                | EventPayload::Harmonicity(data)
                | EventPayload::JustIntonation(data) => {
                    writer.channel(delta, data.status, data.data1, data.data2)?
                }
            }
        }

        writer.meta(0, META_END_OF_TRACK, &[])?;
        let length = writer.length;

        let end_position = out.stream_position()?;
        out.seek(SeekFrom::Start(length_position))?;
        out.write_all(&length.to_be_bytes())?;
        out.seek(SeekFrom::Start(end_position))?;
        Ok(())
    }

    /// Encode the whole file in memory
    pub fn to_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    #[instrument(skip(self), fields(tracks = self.tracks.len()))]
    pub fn write_to_file(&self, path: &Path) -> Result<(), ExportError> {
        // encoding errors must not leave a partial file behind
        let bytes = self.to_bytes()?;

        let file = File::create(path).map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        out.write_all(&bytes)?;
        out.flush()?;

        tracing::info!(path = %path.display(), "Sequence file written");
        Ok(())
    }
}
