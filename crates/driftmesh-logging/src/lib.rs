//! Correlation and logging support for driftmesh
//!
//! Every event the simulator records carries the correlation fields of the
//! context active when it was emitted, so a message's journey can be stitched
//! together across relays after the fact.

pub mod correlation;

pub use correlation::CorrelationContext;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Set up a fmt subscriber with an env-filter
///
/// `verbose` switches the default level from info to debug; `RUST_LOG`
/// overrides both.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
