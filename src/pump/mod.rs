//! Pump.fun program interface: constants, PDA derivation, curve math and
//! byte-exact instruction builders.

pub mod constants;
pub mod curve;
pub mod instructions;
pub mod pda;

pub use curve::CurveState;
pub use instructions::TrackVolume;
