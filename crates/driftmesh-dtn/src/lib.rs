//! Delay-tolerant routing support
//!
//! Currently hosts the PRoPHET probability tables used by the simulator's
//! probabilistic routing mode.

pub mod prophet;

pub use prophet::{EncounterEntry, ProphetConfig, ProphetTable};
