//! The simulation engine
//!
//! [`Simulation`] owns everything for one run: the mesh, the churn state,
//! the routing core, the event recorder, and the seeded randomness. It is
//! single-threaded and cooperative: `step()` runs to completion and the
//! driver inspects state between ticks.
//!
//! Within one `step()` the order is fixed: churn transitions, then the
//! routing pass (newly sent packets first), then probability aging, then the
//! tick counter advances. Scenarios rely on "send then run_ticks(n)"
//! following exactly this ordering.

use std::collections::VecDeque;
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{info, trace};

use driftmesh_core::{ConfigError, Packet, PacketId, PeerId, Priority, SimError};
use driftmesh_dtn::ProphetTable;
use driftmesh_logging::CorrelationContext;

use crate::churn::ChurnState;
use crate::events::{EventKind, EventRecord, Recorder};
use crate::routing::{RoutingCore, RoutingMode};
use crate::stats::SimStats;
use crate::topology::Mesh;

/// Configuration for one simulation
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Probability an offline peer comes online each tick
    pub wake_probability: f64,
    /// Probability an online peer goes offline each tick
    pub sleep_probability: f64,
    /// Probability each peer starts online in `initialize()`
    pub initial_online_probability: f64,
    /// Advisory tick cap for scenario loops; the engine never halts on it
    pub max_ticks: u64,
    /// Emit extra per-forward trace detail
    pub trace_routing: bool,
    /// Next-hop selection strategy
    pub routing_mode: RoutingMode,
    /// Maximum ticks a packet may wait in one hold buffer (None = unbounded)
    pub message_ttl: Option<u64>,
    /// Ignore all probabilities; peers change state only via force calls
    pub manual: bool,
    /// Seed for every random draw the engine makes
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            wake_probability: 0.3,
            sleep_probability: 0.2,
            initial_online_probability: 0.5,
            max_ticks: 100,
            trace_routing: false,
            routing_mode: RoutingMode::Default,
            message_ttl: None,
            manual: false,
            rng_seed: 0,
        }
    }
}

impl SimConfig {
    /// Preset for scripted scenarios: no churn, everyone starts offline
    pub fn manual() -> Self {
        Self {
            wake_probability: 0.0,
            sleep_probability: 0.0,
            initial_online_probability: 0.0,
            manual: true,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("wake_probability", self.wake_probability),
            ("sleep_probability", self.sleep_probability),
            (
                "initial_online_probability",
                self.initial_online_probability,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// Per-peer snapshot returned by [`Simulation::state_summary`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSummary {
    pub peer: PeerId,
    pub online: bool,
    /// Packets currently parked in this peer's hold buffer
    pub held: usize,
}

/// Structured snapshot of the simulation between ticks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    pub tick: u64,
    pub peers: Vec<PeerSummary>,
}

impl fmt::Display for StateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let online = self.peers.iter().filter(|p| p.online).count();
        let held: usize = self.peers.iter().map(|p| p.held).sum();
        write!(
            f,
            "Tick {}: {} online, {} packets held",
            self.tick, online, held
        )
    }
}

/// The simulation engine
#[derive(Debug)]
pub struct Simulation {
    mesh: Mesh,
    config: SimConfig,
    tick: u64,
    churn: ChurnState,
    routing: RoutingCore,
    recorder: Recorder,
    rng: StdRng,
    /// Messages accepted since the last tick, awaiting the next routing pass
    pending: VecDeque<(Packet, CorrelationContext)>,
}

impl Simulation {
    /// Create an engine over the given mesh; fails fast on bad configuration
    pub fn new(mesh: Mesh, config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let churn = ChurnState::new(&mesh);
        let routing = RoutingCore::new(
            &mesh,
            config.routing_mode,
            config.message_ttl,
            config.trace_routing,
        );
        let recorder = Recorder::new(config.rng_seed);
        let rng = StdRng::seed_from_u64(config.rng_seed);
        Ok(Self {
            mesh,
            config,
            tick: 0,
            churn,
            routing,
            recorder,
            rng,
            pending: VecDeque::new(),
        })
    }

    /// Assign initial online states, one draw per peer in PeerId order
    ///
    /// A no-op in manual mode, where peers only move via force calls.
    pub fn initialize(&mut self) {
        if self.config.manual {
            info!("simulation initialized (manual mode, all peers offline)");
            return;
        }
        let woke = self
            .churn
            .initialize(self.config.initial_online_probability, &mut self.rng);
        for peer in woke {
            let ctx = self.recorder.child_of_root();
            self.recorder
                .record(self.tick, &ctx, EventKind::PeerOnline { peer });
        }
        info!(
            online = self.churn.online_count(),
            peers = self.mesh.peer_count(),
            "simulation initialized"
        );
    }

    /// Queue a message for routing starting at the next tick
    pub fn send_message(
        &mut self,
        from: PeerId,
        to: PeerId,
        payload: Vec<u8>,
    ) -> Result<PacketId, SimError> {
        self.send_message_with_priority(from, to, payload, Priority::Normal)
    }

    pub fn send_message_with_priority(
        &mut self,
        from: PeerId,
        to: PeerId,
        payload: Vec<u8>,
        priority: Priority,
    ) -> Result<PacketId, SimError> {
        if from == to {
            return Err(SimError::InvalidSend(from));
        }
        if !self.mesh.contains(&from) {
            return Err(SimError::NotAMember(from));
        }
        if !self.mesh.contains(&to) {
            return Err(SimError::NotAMember(to));
        }

        let id = self.routing.next_packet_id(&from);
        let packet = Packet::new(id.clone(), from, to, payload, self.tick).with_priority(priority);
        // Each packet journey gets its own trace
        let ctx = self.recorder.packet_root();
        self.pending.push_back((packet, ctx));
        Ok(id)
    }

    /// Advance the simulation by one tick
    pub fn step(&mut self) {
        trace!(tick = self.tick, "=== tick ===");

        // 1. Churn transitions
        if !self.config.manual {
            let transitions = self.churn.tick(
                self.config.wake_probability,
                self.config.sleep_probability,
                &mut self.rng,
            );
            for (peer, online) in transitions {
                let ctx = self.recorder.child_of_root();
                let kind = if online {
                    EventKind::PeerOnline { peer }
                } else {
                    EventKind::PeerOffline { peer }
                };
                self.recorder.record(self.tick, &ctx, kind);
            }
        }

        // 2. Messages accepted since the previous tick enter routing
        while let Some((packet, ctx)) = self.pending.pop_front() {
            self.recorder.record(
                self.tick,
                &ctx,
                EventKind::Send {
                    from: packet.source.clone(),
                    to: packet.destination.clone(),
                    packet_id: packet.id.clone(),
                    priority: packet.priority,
                },
            );
            self.routing.enqueue(packet, ctx, self.tick);
        }

        // 3. Routing pass
        self.routing
            .process_tick(&self.mesh, &self.churn, self.tick, &mut self.recorder);

        // 4. Probability aging
        self.routing.age_prophet(self.tick);

        // 5. Advance the clock
        self.tick += 1;
    }

    pub fn run_ticks(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Force a peer online, bypassing probabilities
    pub fn force_online(&mut self, peer: &PeerId) -> Result<(), SimError> {
        self.force_state(peer, true)
    }

    /// Force a peer offline, bypassing probabilities
    pub fn force_offline(&mut self, peer: &PeerId) -> Result<(), SimError> {
        self.force_state(peer, false)
    }

    fn force_state(&mut self, peer: &PeerId, online: bool) -> Result<(), SimError> {
        if !self.churn.contains(peer) {
            return Err(SimError::NotAMember(peer.clone()));
        }
        if self.churn.force(peer, online) {
            let ctx = self.recorder.child_of_root();
            let kind = if online {
                EventKind::PeerOnline { peer: peer.clone() }
            } else {
                EventKind::PeerOffline { peer: peer.clone() }
            };
            self.recorder.record(self.tick, &ctx, kind);
        }
        Ok(())
    }

    pub fn is_online(&self, peer: &PeerId) -> bool {
        self.churn.is_online(peer)
    }

    pub fn online_peers(&self) -> Vec<PeerId> {
        self.churn.online_peers()
    }

    pub fn offline_peers(&self) -> Vec<PeerId> {
        self.churn.offline_peers()
    }

    /// The current tick counter (tick 0 = before any step)
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn stats(&self) -> &SimStats {
        self.recorder.stats()
    }

    /// The full record sequence, in emission order
    pub fn event_log(&self) -> &[EventRecord] {
        self.recorder.log().records()
    }

    /// Records of one type, e.g. `"Relay"`
    pub fn events_by_type(&self, type_name: &str) -> Vec<&EventRecord> {
        self.recorder.log().of_type(type_name)
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The PRoPHET tables, when running in that mode
    pub fn prophet(&self) -> Option<&ProphetTable> {
        self.routing.prophet()
    }

    /// Structured per-peer snapshot: online flag and hold-buffer depth
    pub fn state_summary(&self) -> StateSummary {
        StateSummary {
            tick: self.tick,
            peers: self
                .mesh
                .peers()
                .iter()
                .map(|p| PeerSummary {
                    peer: p.clone(),
                    online: self.churn.is_online(p),
                    held: self.routing.held_at(p),
                })
                .collect(),
        }
    }

    pub(crate) fn recorder_mut(&mut self) -> &mut Recorder {
        &mut self.recorder
    }

    pub(crate) fn mesh_contains(&self, peer: &PeerId) -> bool {
        self.mesh.contains(peer)
    }
}
