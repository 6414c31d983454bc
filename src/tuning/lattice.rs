// Lattice coordinates and their mapping to MIDI channel/pitch addresses

/// Lattice bounds. The lane layout requires `MAX_K == -MIN_K`.
pub const MIN_J: i16 = -25;
pub const MAX_J: i16 = 26;
pub const MIN_K: i16 = -17;
pub const MAX_K: i16 = 17;
pub const NUM_J: i16 = MAX_J - MIN_J + 1;
pub const NUM_K: i16 = MAX_K - MIN_K + 1;

/// A pitch position on the 2-D note lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LatticeCoord {
    pub j: i16,
    pub k: i16,
}

impl LatticeCoord {
    pub fn new(j: i16, k: i16) -> Self {
        Self { j, k }
    }

    /// Decode a sequencer lane index.
    ///
    /// Lanes are grouped in rows of `NUM_J`; rows alternate around k = 0
    /// (0, 1, -1, 2, -2, ...).
    pub fn from_lane_index(index: u16) -> Self {
        let index = index as i32;
        let row = index / NUM_J as i32;
        let k = if row % 2 == 0 { -(row / 2) } else { (row + 1) / 2 };
        let j = index - row * NUM_J as i32 + MIN_J as i32;
        Self {
            j: j as i16,
            k: k as i16,
        }
    }

    /// Lane index of this coordinate. Only meaningful inside the lattice.
    pub fn lane_index(&self) -> u16 {
        let row = if self.k > 0 {
            2 * self.k as i32 - 1
        } else {
            -2 * self.k as i32
        };
        (row * NUM_J as i32 + (self.j - MIN_J) as i32) as u16
    }

    pub fn is_in_lattice(&self) -> bool {
        (MIN_J..=MAX_J).contains(&self.j) && (MIN_K..=MAX_K).contains(&self.k)
    }
}

/// A MIDI channel (0-15) and pitch (0-127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MidiAddress {
    pub channel: u8,
    pub pitch: u8,
}

/// Maps lattice coordinates to output addresses.
///
/// Returns `None` for coordinates that have no address. Callers drop such
/// notes silently.
pub trait AddressMapper {
    fn address(&self, coord: LatticeCoord) -> Option<MidiAddress>;
}

impl<F> AddressMapper for F
where
    F: Fn(LatticeCoord) -> Option<MidiAddress>,
{
    fn address(&self, coord: LatticeCoord) -> Option<MidiAddress> {
        self(coord)
    }
}

/// Packs the lattice row by row into consecutive pitches, spilling onto the
/// next channel every 128 notes
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearLatticeMapper;

impl AddressMapper for LinearLatticeMapper {
    fn address(&self, coord: LatticeCoord) -> Option<MidiAddress> {
        if !coord.is_in_lattice() {
            return None;
        }

        let n = (coord.k - MIN_K) as u16 * NUM_J as u16 + (coord.j - MIN_J) as u16;
        let channel = n / 128;
        if channel > 15 {
            return None;
        }

        Some(MidiAddress {
            channel: channel as u8,
            pitch: (n % 128) as u8,
        })
    }
}
