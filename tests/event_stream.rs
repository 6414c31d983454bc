// Integration test: event stream assembly
//
// Randomised checks of the merge, sort, note extraction and envelope
// resampling that together build the stream fed to the player.

use hexseq::sequencer::envelope::{ControllerTarget, FloatTarget};
use hexseq::sequencer::event::is_sorted;
use hexseq::sequencer::{
    Envelope, EnvelopeResampler, EventKind, EventStreamMerger, MidiData, Note,
    NoteEventExtractor, SequencerEvent, insertion_sort, merge_sorted,
};
use hexseq::tuning::LinearLatticeMapper;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_event(rng: &mut StdRng, tick: u32, source: u8) -> SequencerEvent {
    let data = MidiData::new(0x90, rng.gen_range(0..128), 64, source);
    match rng.gen_range(0..4) {
        0 => SequencerEvent::note_on(tick, data),
        1 => SequencerEvent::note_off(tick, data),
        2 => SequencerEvent::controller(tick, MidiData::new(0xB0, 7, 64, source)),
        _ => SequencerEvent::generator(tick, rng.gen_range(0.0..1200.0)),
    }
}

/// A sorted stream whose MIDI events carry `source` as their track
fn random_stream(rng: &mut StdRng, source: u8, len: usize) -> Vec<SequencerEvent> {
    let mut events: Vec<SequencerEvent> = (0..len)
        .map(|_| {
            let tick = rng.gen_range(0..200);
            random_event(rng, tick, source)
        })
        .collect();
    insertion_sort(&mut events);
    events
}

#[test]
fn test_insertion_sort_matches_stable_sort() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..50 {
        let len = rng.gen_range(0..120);
        let mut events: Vec<SequencerEvent> = (0..len)
            .map(|i| {
                let tick = rng.gen_range(0..40);
                // the note number records the original position
                SequencerEvent::note_on(tick, MidiData::new(0x90, (i % 128) as u8, 1, 0))
            })
            .collect();

        let mut expected = events.clone();
        expected.sort_by(|a, b| a.cmp_order(b));
        insertion_sort(&mut events);

        assert_eq!(events, expected);
    }
}

#[test]
fn test_merge_keeps_order_and_source_priority() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..30 {
        let sources: Vec<Vec<SequencerEvent>> = (0..5)
            .map(|source| {
                let len = rng.gen_range(0..60);
                random_stream(&mut rng, source, len)
            })
            .collect();
        let total: usize = sources.iter().map(Vec::len).sum();

        let mut merger = EventStreamMerger::new();
        for stream in sources {
            merger.add_sorted(stream);
        }
        let merged = merger.into_events();

        assert_eq!(merged.len(), total);
        assert!(is_sorted(&merged));

        // among events with the same key, earlier sources come first
        for pair in merged.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if a.order_key() == b.order_key() {
                if let (Some(first), Some(second)) = (a.track(), b.track()) {
                    assert!(first <= second, "{a:?} should not precede {b:?}");
                }
            }
        }
    }
}

#[test]
fn test_merge_with_empty_sides() {
    let mut rng = StdRng::seed_from_u64(3);
    let stream = random_stream(&mut rng, 0, 25);

    assert_eq!(merge_sorted(stream.clone(), Vec::new()), stream);
    assert_eq!(merge_sorted(Vec::new(), stream.clone()), stream);
    assert!(merge_sorted(Vec::new(), Vec::new()).is_empty());
}

#[test]
fn test_extracted_notes_pair_up() {
    let mut rng = StdRng::seed_from_u64(11);
    let notes: Vec<Note> = (0..200)
        .map(|_| {
            Note::new(
                rng.gen_range(0..4),
                rng.gen_range(0..1900),
                rng.gen_range(0..5000),
                rng.gen_range(1..960),
                rng.gen_range(1..128),
            )
        })
        .collect();

    let events = NoteEventExtractor::new(&LinearLatticeMapper).extract(&notes);
    assert!(is_sorted(&events));

    let ons = events.iter().filter(|e| e.kind() == EventKind::NoteOn).count();
    let offs = events.iter().filter(|e| e.kind() == EventKind::NoteOff).count();
    assert_eq!(ons, offs);
    // lanes past the last lattice row are not addressable
    let addressable = notes.iter().filter(|n| n.coord().is_in_lattice()).count();
    assert_eq!(ons, addressable);

    for event in events.iter().filter(|e| e.kind() == EventKind::NoteOff) {
        assert_eq!(event.payload.midi_data().map(|d| d.data2), Some(0));
    }
}

fn random_envelope(rng: &mut StdRng) -> Envelope {
    let mut tick = rng.gen_range(0..100);
    let mut pairs = Vec::new();
    for _ in 0..rng.gen_range(1..12) {
        // repeated values produce flat segments
        let value = if rng.gen_bool(0.2) {
            0.5
        } else {
            rng.gen_range(0.0..1.0)
        };
        pairs.push((tick, value));
        tick += rng.gen_range(1..600);
    }
    Envelope::from_sorted(pairs).unwrap()
}

#[test]
fn test_resampled_envelopes() {
    let mut rng = StdRng::seed_from_u64(99);
    let resampler = EnvelopeResampler::new(1.0 / 0.96, 24.0);

    for _ in 0..100 {
        let envelope = random_envelope(&mut rng);
        let bound = resampler.max_event_count(&envelope);
        let last = *envelope.nodes().last().unwrap();

        let generator = resampler.resample_float(&envelope, FloatTarget::Generator);
        assert!(generator.len() <= bound);
        assert!(generator.windows(2).all(|w| w[0].tick < w[1].tick));
        assert!(generator.iter().all(|e| e.kind() == EventKind::TuningGenerator));

        let final_event = generator.last().unwrap();
        assert_eq!(final_event.tick, last.tick);
        let cents = final_event.payload.value().unwrap();
        assert!((cents - last.value * 1200.0).abs() < 1e-2);

        let controllers =
            resampler.resample_controller(&envelope, ControllerTarget::controller(4, 74, 2));
        assert!(controllers.len() <= bound);
        assert!(controllers.windows(2).all(|w| w[0].tick < w[1].tick));
        for pair in controllers.windows(2) {
            let (a, b) = (pair[0].payload.midi_data(), pair[1].payload.midi_data());
            assert_ne!(a.map(|d| d.data2), b.map(|d| d.data2));
        }
        for event in &controllers {
            let data = event.payload.midi_data().unwrap();
            assert_eq!((data.status, data.data1, data.track), (0xB4, 74, 2));
            assert!(data.data2 <= 127);
            assert!(event.tick <= last.tick);
        }
    }
}
