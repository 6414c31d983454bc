// Tuning collaborators - lattice addressing and tuning controller encoding
// Pure functions shared by the note extractor, the player and the file encoder

pub mod controller;
pub mod lattice;

pub use controller::{
    TUNING_VALUE_MAX, TuningControllers, tuning_controller_values,
};
pub use lattice::{AddressMapper, LatticeCoord, LinearLatticeMapper, MidiAddress};
