// Transport - Playback state and loop region
// Loop bounds are in ticks and only take effect once set

/// Transport state (play/stop)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
}

impl TransportState {
    pub fn is_playing(&self) -> bool {
        matches!(self, TransportState::Playing)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, TransportState::Stopped)
    }
}

/// Half-open tick range [start, end)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopRegion {
    start: f64,
    end: f64,
}

impl LoopRegion {
    /// Returns `None` unless `0 <= start < end`
    pub fn new(start: f64, end: f64) -> Option<Self> {
        if start.is_finite() && end.is_finite() && start >= 0.0 && end > start {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, position: f64) -> bool {
        position >= self.start && position < self.end
    }
}

/// Loop settings as seen by the player.
///
/// The loop only wraps if playback was positioned before the loop end when it
/// (re)started; starting past the end plays through.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LoopState {
    region: Option<LoopRegion>,
    enabled: bool,
    armed: bool,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the loop bounds and enable looping. Invalid bounds disable it.
    pub fn set_region(&mut self, region: Option<LoopRegion>) {
        self.region = region;
        self.enabled = region.is_some();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        // a loop without bounds stays disabled
        self.enabled = enabled && self.region.is_some();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn region(&self) -> Option<LoopRegion> {
        self.region
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Recompute whether the loop applies from `position`
    pub fn arm(&mut self, position: f64) {
        self.armed = self.region.is_some_and(|region| position < region.end);
    }

    /// Loop start to jump to, if `position` has reached an active loop end
    pub fn wrap_target(&self, position: f64) -> Option<f64> {
        match self.region {
            Some(region) if self.enabled && self.armed && position >= region.end => {
                Some(region.start)
            }
            _ => None,
        }
    }
}
