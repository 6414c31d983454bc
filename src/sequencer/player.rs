// Sequencer Player - Dispatches the event stream in real time
// A dedicated worker advances a tick clock by a fixed amount per fixed interval

use super::event::{EventPayload, MidiData, SequencerEvent};
use super::metronome::{ClickType, MetronomeScheduler};
use super::timeline::{Tempo, TimeSignature, TimingSettings};
use super::transport::{LoopRegion, LoopState, TransportState};
use crate::messaging::{
    NOTIFICATION_CAPACITY, NotificationConsumer, NotificationProducer, PlayerNotification,
    create_notification_channel, notify,
};
use crate::midi::event::control_change;
use crate::midi::sink::OutputSink;
use crate::tuning::TuningControllers;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A note-on that has not been released yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeldNote {
    status: u8,
    key: u8,
    track: u8,
}

impl HeldNote {
    fn from_data(data: &MidiData) -> Self {
        Self {
            status: data.status,
            key: data.data1,
            track: data.track,
        }
    }
}

/// Player state machine. Not thread-aware; [`MidiEventPlayer`] drives it from
/// a worker thread, tests drive it by calling [`PlayerCore::step`].
pub struct PlayerCore<S: OutputSink> {
    sink: S,
    notifications: NotificationProducer,
    timing: TimingSettings,

    events: Vec<SequencerEvent>,
    next_index: usize,

    state: TransportState,
    position: f64,
    ticks_per_interval: f64,
    loop_state: LoopState,
    end_tick: Option<f64>,
    metronome: MetronomeScheduler,

    held_notes: Vec<HeldNote>,
    interval_counter: u32,
    pending_generator: Option<f32>,
    generator_output: bool,
}

impl<S: OutputSink> PlayerCore<S> {
    pub fn new(sink: S, notifications: NotificationProducer, timing: TimingSettings) -> Self {
        let mut core = Self {
            sink,
            notifications,
            timing,
            events: Vec::new(),
            next_index: 0,
            state: TransportState::Stopped,
            position: 0.0,
            ticks_per_interval: 0.0,
            loop_state: LoopState::new(),
            end_tick: None,
            metronome: MetronomeScheduler::default(),
            held_notes: Vec::new(),
            interval_counter: 0,
            pending_generator: None,
            generator_output: true,
        };
        core.set_tempo(&Tempo::default(), &TimeSignature::default());
        core
    }

    // ---------------------------------------------------------------- control

    /// Replace the event stream. Sounding notes are released first.
    pub fn set_events(&mut self, events: Vec<SequencerEvent>) {
        debug_assert!(super::event::is_sorted(&events));
        self.all_notes_off();
        self.events = events;
        if self.state.is_playing() {
            self.recalculate_indices();
        }
    }

    /// Playback rate in ticks per millisecond
    pub fn set_ticks_per_ms(&mut self, ticks_per_ms: f64) {
        self.ticks_per_interval = self.timing.sleep_interval_ms as f64 * ticks_per_ms;
    }

    /// Set rate and metronome lengths from a tempo and meter
    pub fn set_tempo(&mut self, tempo: &Tempo, time_signature: &TimeSignature) {
        self.set_ticks_per_ms(tempo.ticks_per_ms(time_signature));
        self.metronome.set_lengths(
            time_signature.beat_length_ticks(),
            time_signature.measure_length_ticks(),
        );
        if self.state.is_playing() {
            self.metronome.reset(self.position);
        }
    }

    /// Seek. While playing, sounding notes are released and the dispatch
    /// index, metronome and loop arming follow the new position.
    pub fn set_tick_position(&mut self, position: f64) {
        self.position = position.max(0.0);
        if self.state.is_playing() {
            tracing::debug!(position = self.position, "Seek");
            self.all_notes_off();
            self.recalculate_indices();
        }
    }

    /// Set loop bounds and enable looping; `None` disables it.
    /// The dispatch index is left alone, only the loop is re-armed.
    pub fn set_loop_region(&mut self, region: Option<LoopRegion>) {
        self.loop_state.set_region(region);
        if self.state.is_playing() {
            self.loop_state.arm(self.position);
        }
    }

    pub fn set_loop_enabled(&mut self, enabled: bool) {
        self.loop_state.set_enabled(enabled);
    }

    /// Tick at which non-looping playback stops by itself
    pub fn set_end_tick(&mut self, end_tick: Option<u32>) {
        self.end_tick = end_tick.map(f64::from);
    }

    /// Stop sending generator changes until the next `start`
    pub fn suspend_generator_output(&mut self) {
        self.generator_output = false;
    }

    pub fn start(&mut self) {
        if self.state.is_playing() {
            return;
        }

        self.state = TransportState::Playing;
        self.generator_output = true;
        self.pending_generator = None;
        self.interval_counter = 0;

        self.recalculate_indices();
        tracing::debug!(
            position = self.position,
            next_index = self.next_index,
            "Playback started"
        );
        self.replay_previous_state();
    }

    /// Release every sounding note and report the final position
    pub fn stop(&mut self) {
        if !self.state.is_playing() {
            return;
        }

        self.state = TransportState::Stopped;
        self.all_notes_off();

        if let Some(value) = self.pending_generator.take() {
            notify(&mut self.notifications, PlayerNotification::GeneratorChanged(value));
        }
        notify(&mut self.notifications, PlayerNotification::TickPosition(self.position));
        notify(&mut self.notifications, PlayerNotification::Finished);
        tracing::debug!(position = self.position, "Playback stopped");
    }

    // ---------------------------------------------------------------- playback

    /// One player iteration. Returns false once playback is stopped.
    pub fn step(&mut self) -> bool {
        if !self.state.is_playing() {
            return false;
        }

        while let Some(event) = self.events.get(self.next_index).copied() {
            if event.tick as f64 > self.position {
                break;
            }
            self.dispatch(&event);
            self.next_index += 1;
        }

        if self.reached_end() {
            self.stop();
            return false;
        }

        self.interval_counter += 1;
        if self.interval_counter >= self.timing.notification_decimation {
            self.interval_counter = 0;
            if let Some(value) = self.pending_generator.take() {
                notify(&mut self.notifications, PlayerNotification::GeneratorChanged(value));
            }
            notify(&mut self.notifications, PlayerNotification::TickPosition(self.position));
        }

        match self.metronome.check(self.position) {
            Some(ClickType::Accent) => notify(&mut self.notifications, PlayerNotification::Measure),
            Some(ClickType::Regular) => notify(&mut self.notifications, PlayerNotification::Beat),
            None => {}
        }

        self.position += self.ticks_per_interval;
        tracing::trace!(position = self.position, next_index = self.next_index);

        if let Some(loop_start) = self.loop_state.wrap_target(self.position) {
            self.set_tick_position(loop_start);
        }

        true
    }

    fn reached_end(&self) -> bool {
        let looping = self.loop_state.is_enabled() && self.loop_state.is_armed();
        !looping && self.end_tick.is_some_and(|end| self.position >= end)
    }

    fn dispatch(&mut self, event: &SequencerEvent) {
        match event.payload {
            EventPayload::TuningGenerator(value) => {
                if self.generator_output {
                    self.send_generator(value);
                    // reported at the next decimated notification
                    self.pending_generator = Some(value);
                }
            }
            EventPayload::TuningPeriod(value) => self.send_period(value),
            EventPayload::Harmonicity(data) | EventPayload::JustIntonation(data) => {
                self.sink.send_tuning(&data.bytes());
            }
            EventPayload::ControllerChange(data) | EventPayload::Other(data) => {
                self.sink.send(data.track, &data.bytes());
            }
            EventPayload::NoteOn(data) => {
                self.sink.send(data.track, &data.bytes());
                self.held_notes.push(HeldNote::from_data(&data));
            }
            EventPayload::NoteOff(data) => {
                self.sink.send(data.track, &data.bytes());
                let released = HeldNote::from_data(&data);
                if let Some(index) = self.held_notes.iter().position(|note| *note == released) {
                    self.held_notes.swap_remove(index);
                }
            }
        }
    }

    fn send_generator(&mut self, cents: f32) {
        for (controller, value) in TuningControllers::LIVE.generator_messages(cents as f64) {
            self.sink.send_tuning(&control_change(0, controller, value));
        }
    }

    fn send_period(&mut self, cents: f32) {
        for (controller, value) in TuningControllers::LIVE.period_messages(cents as f64) {
            self.sink.send_tuning(&control_change(0, controller, value));
        }
    }

    fn all_notes_off(&mut self) {
        for note in self.held_notes.drain(..) {
            self.sink.send(note.track, &[note.status, note.key, 0]);
        }
    }

    fn recalculate_indices(&mut self) {
        let position = self.position;
        self.next_index = self
            .events
            .partition_point(|event| (event.tick as f64) < position);
        self.metronome.reset(position);
        self.loop_state.arm(position);
    }

    /// Resend the latest generator, period and per-controller values that
    /// precede the resume point. Notes are not re-triggered.
    fn replay_previous_state(&mut self) {
        let mut period_sent = false;
        let mut generator_sent = false;
        let mut controllers_sent = [false; 128];

        for index in (0..self.next_index).rev() {
            let event = self.events[index];
            match event.payload {
                EventPayload::TuningPeriod(value) if !period_sent => {
                    self.send_period(value);
                    period_sent = true;
                }
                EventPayload::TuningGenerator(value) if !generator_sent => {
                    self.send_generator(value);
                    notify(&mut self.notifications, PlayerNotification::GeneratorChanged(value));
                    generator_sent = true;
                }
                EventPayload::ControllerChange(data) => {
                    let seen = &mut controllers_sent[(data.data1 & 0x7F) as usize];
                    if !*seen {
                        self.sink.send(data.track, &data.bytes());
                        *seen = true;
                    }
                }
                _ => {}
            }
        }
    }

    // ---------------------------------------------------------------- queries

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Index of the next undispatched event
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn events(&self) -> &[SequencerEvent] {
        &self.events
    }

    pub fn ticks_per_interval(&self) -> f64 {
        self.ticks_per_interval
    }

    pub fn loop_state(&self) -> &LoopState {
        &self.loop_state
    }

    pub fn metronome(&self) -> &MetronomeScheduler {
        &self.metronome
    }

    pub fn held_note_count(&self) -> usize {
        self.held_notes.len()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Real-time player running [`PlayerCore`] on a dedicated thread.
///
/// Control calls take a short lock on the core, so a seek or loop change is
/// applied between two iterations and never half-way through one.
/// Notifications arrive on the consumer returned by [`MidiEventPlayer::new`].
pub struct MidiEventPlayer<S: OutputSink + 'static> {
    core: Arc<Mutex<PlayerCore<S>>>,
    interval: Duration,
    worker: Option<JoinHandle<()>>,
}

impl<S: OutputSink + 'static> MidiEventPlayer<S> {
    pub fn new(sink: S, timing: TimingSettings) -> (Self, NotificationConsumer) {
        let (producer, consumer) = create_notification_channel(NOTIFICATION_CAPACITY);
        let core = PlayerCore::new(sink, producer, timing);
        let player = Self {
            core: Arc::new(Mutex::new(core)),
            interval: Duration::from_millis(timing.sleep_interval_ms.max(1)),
            worker: None,
        };
        (player, consumer)
    }

    /// Start playback on the worker thread
    pub fn start(&mut self) {
        if self.core.lock().is_playing() {
            return;
        }
        // a worker that ended on its own
        self.join_worker();

        self.core.lock().start();

        let core = Arc::clone(&self.core);
        let interval = self.interval;
        let spawned = thread::Builder::new()
            .name("hexseq-player".to_string())
            .spawn(move || Self::run(core, interval));

        match spawned {
            Ok(handle) => self.worker = Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to spawn player thread");
                self.core.lock().stop();
            }
        }
    }

    fn run(core: Arc<Mutex<PlayerCore<S>>>, interval: Duration) {
        let mut deadline = Instant::now();
        loop {
            if !core.lock().step() {
                break;
            }

            deadline += interval;
            let now = Instant::now();
            if deadline > now {
                thread::sleep(deadline - now);
            } else {
                // fell behind, keep the interval rather than catching up
                deadline = now;
            }
        }
    }

    /// Stop playback and wait for the worker to exit
    pub fn stop(&mut self) {
        self.core.lock().stop();
        self.join_worker();
    }

    /// Block until playback ends by itself
    pub fn wait(&mut self) {
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::warn!("Player thread panicked");
            }
        }
    }

    pub fn set_events(&self, events: Vec<SequencerEvent>) {
        self.core.lock().set_events(events);
    }

    pub fn set_tempo(&self, tempo: &Tempo, time_signature: &TimeSignature) {
        self.core.lock().set_tempo(tempo, time_signature);
    }

    pub fn set_tick_position(&self, position: f64) {
        self.core.lock().set_tick_position(position);
    }

    pub fn set_loop_region(&self, region: Option<LoopRegion>) {
        self.core.lock().set_loop_region(region);
    }

    pub fn set_loop_enabled(&self, enabled: bool) {
        self.core.lock().set_loop_enabled(enabled);
    }

    pub fn set_end_tick(&self, end_tick: Option<u32>) {
        self.core.lock().set_end_tick(end_tick);
    }

    pub fn suspend_generator_output(&self) {
        self.core.lock().suspend_generator_output();
    }

    pub fn is_playing(&self) -> bool {
        self.core.lock().is_playing()
    }

    pub fn position(&self) -> f64 {
        self.core.lock().position()
    }

    /// Run a closure against the locked core
    pub fn with_core<R>(&self, f: impl FnOnce(&mut PlayerCore<S>) -> R) -> R {
        f(&mut self.core.lock())
    }
}

impl<S: OutputSink + 'static> Drop for MidiEventPlayer<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::drain_notifications;
    use crate::midi::sink::{MessageLog, SentMessage};
    use crate::sequencer::event::MidiData;

    fn timing() -> TimingSettings {
        TimingSettings::default()
    }

    /// Core advancing 6 ticks per iteration
    fn test_core() -> (PlayerCore<MessageLog>, MessageLog, NotificationConsumer) {
        let log = MessageLog::new();
        let (tx, rx) = create_notification_channel(256);
        let mut core = PlayerCore::new(log.clone(), tx, timing());
        core.set_ticks_per_ms(1.0);
        (core, log, rx)
    }

    fn on(tick: u32, key: u8) -> SequencerEvent {
        SequencerEvent::note_on(tick, MidiData::new(0x90, key, 100, 0))
    }

    fn off(tick: u32, key: u8) -> SequencerEvent {
        SequencerEvent::note_off(tick, MidiData::new(0x90, key, 0, 0))
    }

    fn cc(tick: u32, controller: u8, value: u8) -> SequencerEvent {
        SequencerEvent::controller(tick, MidiData::new(0xB0, controller, value, 0))
    }

    fn track_msg(bytes: [u8; 3]) -> SentMessage {
        SentMessage::Track {
            track: 0,
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn test_dispatches_each_event_once() {
        let (mut core, log, _rx) = test_core();
        core.set_events(vec![on(0, 60), off(50, 60)]);
        core.start();

        while core.position() <= 60.0 {
            assert!(core.step());
        }

        assert_eq!(
            log.messages(),
            vec![track_msg([0x90, 60, 100]), track_msg([0x90, 60, 0])]
        );
        assert_eq!(core.held_note_count(), 0);
        assert_eq!(core.next_index(), 2);
    }

    #[test]
    fn test_seek_silences_held_notes() {
        let (mut core, log, _rx) = test_core();
        core.set_events(vec![on(0, 60), off(50, 60)]);
        core.start();
        core.step();
        assert_eq!(core.held_note_count(), 1);

        core.set_tick_position(40.0);
        assert_eq!(core.held_note_count(), 0);
        assert_eq!(core.next_index(), 1);
        assert_eq!(
            log.messages(),
            vec![track_msg([0x90, 60, 100]), track_msg([0x90, 60, 0])]
        );
    }

    #[test]
    fn test_seek_while_stopped_only_records_position() {
        let (mut core, log, _rx) = test_core();
        core.set_events(vec![on(0, 60), off(50, 60)]);
        core.set_tick_position(25.0);
        assert_eq!(core.position(), 25.0);
        assert_eq!(core.next_index(), 0);
        assert!(log.is_empty());
        assert!(!core.step());
    }

    #[test]
    fn test_loop_wraps_to_start() {
        let events = vec![cc(0, 1, 1), cc(100, 1, 2), cc(150, 1, 3), cc(200, 1, 4)];
        let (mut core, _log, _rx) = test_core();
        core.set_events(events.clone());
        core.set_loop_region(LoopRegion::new(100.0, 200.0));
        core.set_tick_position(50.0);
        core.start();

        let mut previous = core.position();
        loop {
            core.step();
            if core.position() < previous {
                break;
            }
            previous = core.position();
            assert!(previous < 300.0, "loop never wrapped");
        }
        assert_eq!(core.position(), 100.0);

        let (mut fresh, _, _rx2) = test_core();
        fresh.set_events(events);
        fresh.start();
        fresh.set_tick_position(100.0);
        assert_eq!(core.next_index(), fresh.next_index());
        assert_eq!(core.next_index(), 1);
    }

    #[test]
    fn test_start_replays_latest_state() {
        let (mut core, log, mut rx) = test_core();
        core.set_events(vec![
            cc(0, 7, 10),
            on(10, 60),
            SequencerEvent::generator(50, 700.0),
            SequencerEvent::period(60, 1200.0),
            cc(100, 7, 20),
            cc(100, 10, 64),
            off(200, 60),
        ]);
        core.set_tick_position(150.0);
        core.start();

        let messages = log.messages();
        assert_eq!(messages.len(), 8);
        // newest first: controllers at 100, then period, then generator
        assert_eq!(messages[0], track_msg([0xB0, 10, 64]));
        assert_eq!(messages[1], track_msg([0xB0, 7, 20]));
        let tuning: Vec<u8> = messages[2..]
            .iter()
            .map(|m| match m {
                SentMessage::Tuning { bytes } => bytes[1],
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(tuning, vec![50, 51, 52, 53, 54, 55]);

        assert_eq!(
            drain_notifications(&mut rx),
            vec![PlayerNotification::GeneratorChanged(700.0)]
        );
        assert_eq!(core.held_note_count(), 0);
    }

    #[test]
    fn test_notifications_are_decimated() {
        let (mut core, log, mut rx) = test_core();
        core.set_events(
            (0..4)
                .map(|i| SequencerEvent::generator(i * 6, 100.0 * (i + 1) as f32))
                .collect(),
        );
        core.start();
        for _ in 0..16 {
            core.step();
        }

        // every generator change reaches the output
        assert_eq!(log.len(), 12);

        let notifications = drain_notifications(&mut rx);
        assert_eq!(
            notifications,
            vec![
                PlayerNotification::Measure,
                PlayerNotification::GeneratorChanged(400.0),
                PlayerNotification::TickPosition(42.0),
                PlayerNotification::TickPosition(90.0),
            ]
        );
    }

    #[test]
    fn test_suspended_generator_output() {
        let (mut core, log, _rx) = test_core();
        core.set_events(vec![
            SequencerEvent::generator(0, 100.0),
            SequencerEvent::generator(12, 200.0),
        ]);
        core.start();
        core.suspend_generator_output();
        for _ in 0..4 {
            core.step();
        }
        assert!(log.is_empty());

        // re-enabled by the next start
        core.stop();
        core.set_tick_position(0.0);
        core.start();
        core.step();
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_stop_releases_and_reports() {
        let (mut core, log, mut rx) = test_core();
        core.set_events(vec![SequencerEvent::generator(0, 300.0), on(0, 60), on(0, 64)]);
        core.start();
        core.step();
        log.clear();
        drain_notifications(&mut rx);

        core.stop();
        assert!(!core.is_playing());
        assert_eq!(log.len(), 2);
        assert!(log.messages().iter().all(|m| m.bytes()[2] == 0));
        assert_eq!(
            drain_notifications(&mut rx),
            vec![
                PlayerNotification::GeneratorChanged(300.0),
                PlayerNotification::TickPosition(6.0),
                PlayerNotification::Finished,
            ]
        );

        // stopping twice is a no-op
        core.stop();
        assert!(drain_notifications(&mut rx).is_empty());
    }

    #[test]
    fn test_natural_end() {
        let (mut core, log, mut rx) = test_core();
        core.set_events(vec![on(0, 60), off(30, 60)]);
        core.set_end_tick(Some(30));
        core.start();

        let mut steps = 0;
        while core.step() {
            steps += 1;
            assert!(steps < 100);
        }

        assert!(!core.is_playing());
        // the note-off at the end tick is still dispatched
        assert_eq!(log.track_messages(0).len(), 2);
        assert_eq!(
            drain_notifications(&mut rx).last(),
            Some(&PlayerNotification::Finished)
        );
    }

    #[test]
    fn test_set_events_while_playing() {
        let (mut core, log, _rx) = test_core();
        core.set_events(vec![on(0, 60), off(500, 60)]);
        core.start();
        core.step();
        core.step();

        core.set_events(vec![cc(0, 1, 1), cc(10, 1, 2), cc(40, 1, 3)]);
        assert_eq!(core.held_note_count(), 0);
        assert_eq!(core.next_index(), 2);
        assert_eq!(log.messages()[1], track_msg([0x90, 60, 0]));
    }

    #[test]
    fn test_metronome_notifications() {
        let (mut core, _log, mut rx) = test_core();
        // 120 ticks per iteration
        core.set_ticks_per_ms(20.0);
        core.start();
        for _ in 0..17 {
            core.step();
        }

        let clicks: Vec<PlayerNotification> = drain_notifications(&mut rx)
            .into_iter()
            .filter(PlayerNotification::is_click)
            .collect();
        assert_eq!(
            clicks,
            vec![
                PlayerNotification::Measure,
                PlayerNotification::Beat,
                PlayerNotification::Beat,
                PlayerNotification::Beat,
                PlayerNotification::Measure,
            ]
        );
    }

    #[test]
    fn test_loop_change_keeps_pending_events() {
        let (mut core, log, _rx) = test_core();
        core.set_events(vec![on(0, 60), off(3, 60)]);
        core.start();
        core.step();
        assert_eq!(core.position(), 6.0);

        core.set_loop_region(LoopRegion::new(0.0, 1000.0));
        assert_eq!(core.next_index(), 1);
        assert!(core.loop_state().is_armed());

        core.step();
        assert_eq!(core.held_note_count(), 0);
        assert_eq!(
            log.messages(),
            vec![track_msg([0x90, 60, 100]), track_msg([0x90, 60, 0])]
        );
    }

    #[test]
    fn test_loop_change_behind_position_stays_disarmed() {
        let (mut core, _log, _rx) = test_core();
        core.set_events(vec![cc(0, 1, 1), cc(20, 1, 2)]);
        core.start();
        for _ in 0..5 {
            core.step();
        }
        assert_eq!(core.position(), 30.0);

        // already past the new end, so the loop stays disarmed
        core.set_loop_region(LoopRegion::new(0.0, 24.0));
        assert!(!core.loop_state().is_armed());
        core.step();
        assert_eq!(core.position(), 36.0);
    }

    #[test]
    fn test_tempo_change_while_playing() {
        let (mut core, log, mut rx) = test_core();
        let tempo = Tempo::new(120.0).unwrap();
        let ts = TimeSignature::four_four();
        core.set_tempo(&tempo, &ts);
        core.set_events(vec![cc(0, 1, 1), cc(10, 1, 2), cc(500, 1, 3), cc(1000, 1, 4)]);
        core.start();
        for _ in 0..100 {
            core.step();
        }
        // 0.96 ticks per ms, 6 ms per step
        assert!((core.position() - 576.0).abs() < 1e-9);
        assert_eq!(core.next_index(), 3);

        let faster = Tempo::new(240.0).unwrap();
        core.set_tempo(&faster, &ts);
        assert!((core.ticks_per_interval() - 11.52).abs() < 1e-9);
        // thresholds restart from the current position
        assert_eq!(core.metronome().next_beat(), 960.0);
        assert_eq!(core.metronome().next_measure(), 1920.0);

        while core.position() <= 1010.0 {
            assert!(core.step());
        }
        assert_eq!(core.next_index(), 4);
        let values: Vec<u8> = log.track_messages(0).iter().map(|m| m[2]).collect();
        assert_eq!(values, vec![1, 2, 3, 4]);

        let clicks: Vec<PlayerNotification> = drain_notifications(&mut rx)
            .into_iter()
            .filter(PlayerNotification::is_click)
            .collect();
        assert_eq!(
            clicks,
            vec![
                PlayerNotification::Measure,
                PlayerNotification::Beat,
                PlayerNotification::Beat,
            ]
        );
    }

    #[test]
    fn test_empty_stream_only_advances() {
        let (mut core, log, _rx) = test_core();
        core.start();
        for _ in 0..10 {
            assert!(core.step());
        }
        assert_eq!(core.position(), 60.0);
        assert!(log.is_empty());
    }
}
