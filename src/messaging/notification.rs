// Player notifications - what the playback worker reports to its owner
// Delivered in order through the notification ring buffer

/// Notification emitted by the playback worker
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerNotification {
    /// Current playhead, sent at the decimated UI rate and on stop
    TickPosition(f64),
    /// Latest tuning generator value (cents)
    GeneratorChanged(f32),
    /// A beat boundary was crossed
    Beat,
    /// A measure boundary was crossed; also counts as a beat
    Measure,
    /// Playback stopped, explicitly or at the end of the sequence
    Finished,
}

impl PlayerNotification {
    /// Metronome notifications, as opposed to display updates
    pub fn is_click(&self) -> bool {
        matches!(self, PlayerNotification::Beat | PlayerNotification::Measure)
    }
}
