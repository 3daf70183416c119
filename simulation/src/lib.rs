//! # driftmesh simulation
//!
//! A discrete-event simulator for a delay-tolerant peer-to-peer mesh. Peers
//! go online and offline, messages cross the mesh directly, through relays,
//! or via store-and-forward custody, and everything the engine decides is
//! recorded to an append-only, correlation-tagged event log.
//!
//! ## Architecture
//!
//! - **Topology** (`topology`): mesh construction and graph queries
//! - **Churn** (`churn`): per-tick online/offline transitions
//! - **Routing** (`routing`): hold buffers, relays, drops, PRoPHET mode
//! - **Events** (`events`): the typed event log and its recorder
//! - **Stats** (`stats`): counters kept in lockstep with the log
//! - **Engine** (`engine`): the tick loop and the driver-facing API
//! - **Accounting** (`accounting`): record-only PQ crypto and invite events
//! - **Scenarios** (`scenarios`): pre-built runs used by the CLI and tests
//!
//! ## Example: held until the destination wakes
//!
//! ```rust
//! use driftmesh_core::PeerId;
//! use driftmesh_simulation::{Mesh, SimConfig, Simulation};
//!
//! // Triangle mesh: A - B, B - C, A - C
//! let mesh = Mesh::from_edges([('A', 'B'), ('B', 'C'), ('A', 'C')]);
//! let mut sim = Simulation::new(mesh, SimConfig::manual()).unwrap();
//!
//! // A and B come online, C stays offline
//! sim.force_online(&PeerId::new('A')).unwrap();
//! sim.force_online(&PeerId::new('B')).unwrap();
//!
//! // The message is held while C sleeps
//! sim.send_message(PeerId::new('A'), PeerId::new('C'), b"Hello C!".to_vec())
//!     .unwrap();
//! sim.run_ticks(5);
//! assert_eq!(sim.stats().messages_delivered, 0);
//!
//! // C wakes and the packet arrives
//! sim.force_online(&PeerId::new('C')).unwrap();
//! sim.run_ticks(10);
//! assert_eq!(sim.stats().messages_delivered, 1);
//! ```

pub mod accounting;
pub mod churn;
pub mod engine;
pub mod events;
pub mod routing;
pub mod scenarios;
pub mod stats;
pub mod topology;

#[cfg(test)]
mod integration_scenarios;

// Re-export the driver-facing surface
pub use engine::{PeerSummary, SimConfig, Simulation, StateSummary};
pub use events::{DropReason, EventKind, EventLog, EventRecord, HoldReason};
pub use routing::RoutingMode;
pub use stats::SimStats;
pub use topology::{Mesh, MeshBuilder};

// Re-export core and collaborator types drivers need
pub use driftmesh_core::{
    AccountingError, ConfigError, Packet, PacketId, PeerId, Priority, SimError,
};
pub use driftmesh_dtn::{ProphetConfig, ProphetTable};
pub use driftmesh_logging::CorrelationContext;
