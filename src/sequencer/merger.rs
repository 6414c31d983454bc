// Event stream merger - folds pre-sorted event arrays into one stream
// Linear-time stable merge; inputs are consumed

use super::event::SequencerEvent;
use std::cmp::Ordering;

/// Stable insertion sort under the sequencer ordering.
///
/// Note on/off pairs arrive locally clustered, so the input is usually close to
/// sorted and each element only travels a short distance.
pub fn insertion_sort(events: &mut [SequencerEvent]) {
    for j in 1..events.len() {
        let key = events[j];
        let mut i = j;
        while i > 0 && events[i - 1].cmp_order(&key) == Ordering::Greater {
            events[i] = events[i - 1];
            i -= 1;
        }
        events[i] = key;
    }
}

/// Merge two sorted arrays into a new one.
/// On equal keys the element from `left` comes first.
pub fn merge_sorted(left: Vec<SequencerEvent>, right: Vec<SequencerEvent>) -> Vec<SequencerEvent> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left_iter = left.into_iter().peekable();
    let mut right_iter = right.into_iter().peekable();

    loop {
        let take_right = match (left_iter.peek(), right_iter.peek()) {
            (Some(l), Some(r)) => r.precedes(l),
            _ => break,
        };
        if take_right {
            merged.extend(right_iter.next());
        } else {
            merged.extend(left_iter.next());
        }
    }

    // one side is exhausted
    merged.extend(left_iter);
    merged.extend(right_iter);
    merged
}

/// Accumulates sorted event arrays into one ordered stream
#[derive(Debug, Default)]
pub struct EventStreamMerger {
    events: Vec<SequencerEvent>,
}

impl EventStreamMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a sorted array into the current stream.
    ///
    /// The first non-empty array is adopted as-is without copying. Later arrays
    /// are merged in linear time; events already in the stream stay ahead of
    /// new events with the same key.
    pub fn add_sorted(&mut self, events: Vec<SequencerEvent>) {
        debug_assert!(super::event::is_sorted(&events), "merger input must be sorted");

        if events.is_empty() {
            return;
        }

        if self.events.is_empty() {
            self.events = events;
            return;
        }

        let current = std::mem::take(&mut self.events);
        self.events = merge_sorted(current, events);
    }

    /// Number of events accumulated so far
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Borrow the merged stream
    pub fn events(&self) -> &[SequencerEvent] {
        &self.events
    }

    /// Take ownership of the merged stream
    pub fn into_events(self) -> Vec<SequencerEvent> {
        self.events
    }
}

impl Extend<Vec<SequencerEvent>> for EventStreamMerger {
    fn extend<I: IntoIterator<Item = Vec<SequencerEvent>>>(&mut self, sources: I) {
        for source in sources {
            self.add_sorted(source);
        }
    }
}
