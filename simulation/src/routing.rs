//! Store-and-forward routing core
//!
//! Each peer owns a FIFO hold buffer. Once per tick every custodian attempts
//! to move the packets it holds: deliver on arrival, hand over when the
//! destination is an awake neighbour, relay along the shortest path (or the
//! PRoPHET estimate), or keep holding. Handed-over packets are staged and
//! only reach the recipient's buffer after the whole pass, so cross-peer
//! interaction always crosses a tick boundary.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, trace, warn};

use driftmesh_core::{Packet, PacketId, PeerId};
use driftmesh_dtn::ProphetTable;
use driftmesh_logging::CorrelationContext;

use crate::churn::ChurnState;
use crate::events::{DropReason, EventKind, HoldReason, Recorder};
use crate::topology::Mesh;

/// How next hops are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoutingMode {
    /// Follow the shortest path through the mesh
    #[default]
    Default,
    /// Prefer neighbours with good encounter history, shortest path as
    /// fallback
    Prophet,
}

/// A packet parked at a custodian
#[derive(Debug, Clone)]
pub struct HoldEntry {
    pub packet: Packet,
    /// Correlation context the packet's next event derives from
    pub ctx: CorrelationContext,
    /// Tick at which the packet entered this buffer
    pub entered_tick: u64,
    /// Who handed the packet over (None at the original source)
    pub forwarded_by: Option<PeerId>,
    /// Whether a Hold event was already emitted from this buffer
    announced: bool,
}

enum Forward {
    /// Packet reached its destination and was recorded as delivered
    Delivered,
    /// Packet handed to the given peer; lands in its buffer after the pass
    Handed(PeerId),
    /// No way forward this tick; reason is None when the custodian is
    /// offline (nothing was attempted)
    Held(Option<HoldReason>),
}

/// Per-peer routing state for one simulation
#[derive(Debug)]
pub struct RoutingCore {
    mode: RoutingMode,
    message_ttl: Option<u64>,
    trace_routing: bool,
    buffers: BTreeMap<PeerId, VecDeque<HoldEntry>>,
    sequences: BTreeMap<PeerId, u64>,
    prophet: Option<ProphetTable>,
}

impl RoutingCore {
    pub fn new(mesh: &Mesh, mode: RoutingMode, message_ttl: Option<u64>, trace_routing: bool) -> Self {
        Self {
            mode,
            message_ttl,
            trace_routing,
            buffers: mesh
                .peers()
                .iter()
                .map(|p| (p.clone(), VecDeque::new()))
                .collect(),
            sequences: BTreeMap::new(),
            prophet: (mode == RoutingMode::Prophet).then(ProphetTable::with_defaults),
        }
    }

    /// Mint the next packet id for a source peer
    pub fn next_packet_id(&mut self, source: &PeerId) -> PacketId {
        let seq = self.sequences.entry(source.clone()).or_insert(0);
        let id = PacketId::new(source.clone(), *seq);
        *seq += 1;
        id
    }

    /// Place a freshly sent packet into its source's buffer
    pub fn enqueue(&mut self, packet: Packet, ctx: CorrelationContext, tick: u64) {
        let source = packet.source.clone();
        self.buffers
            .get_mut(&source)
            .expect("send_message checks mesh membership")
            .push_back(HoldEntry {
                packet,
                ctx,
                entered_tick: tick,
                forwarded_by: None,
                announced: false,
            });
    }

    /// Number of packets held at one peer
    pub fn held_at(&self, peer: &PeerId) -> usize {
        self.buffers.get(peer).map(VecDeque::len).unwrap_or(0)
    }

    /// Total packets currently in hold buffers
    pub fn held_total(&self) -> usize {
        self.buffers.values().map(VecDeque::len).sum()
    }

    pub fn prophet(&self) -> Option<&ProphetTable> {
        self.prophet.as_ref()
    }

    /// One routing pass over every custodian, in PeerId order
    pub fn process_tick(
        &mut self,
        mesh: &Mesh,
        presence: &ChurnState,
        tick: u64,
        rec: &mut Recorder,
    ) {
        let custodians: Vec<PeerId> = self.buffers.keys().cloned().collect();
        let mut staged: Vec<(PeerId, HoldEntry)> = Vec::new();

        for custodian in custodians {
            let entries = std::mem::take(
                self.buffers
                    .get_mut(&custodian)
                    .expect("buffers cover every mesh peer"),
            );
            let mut retained = VecDeque::with_capacity(entries.len());

            for mut entry in entries {
                match self.attempt_forward(&custodian, &mut entry, mesh, presence, tick, rec) {
                    Forward::Delivered => {}
                    Forward::Handed(next) => staged.push((next, entry)),
                    Forward::Held(reason) => {
                        if self.check_drop(&custodian, &entry, mesh, tick, rec) {
                            continue;
                        }
                        if let Some(reason) = reason
                            && !entry.announced
                        {
                            entry.announced = true;
                            let ctx = rec.child_of(&entry.ctx);
                            rec.record(
                                tick,
                                &ctx,
                                EventKind::Hold {
                                    at: custodian.clone(),
                                    packet_id: entry.packet.id.clone(),
                                    reason,
                                },
                            );
                        }
                        retained.push_back(entry);
                    }
                }
            }

            *self
                .buffers
                .get_mut(&custodian)
                .expect("buffers cover every mesh peer") = retained;
        }

        // Handed-over packets become visible to their new custodians next tick
        for (peer, entry) in staged {
            self.buffers
                .get_mut(&peer)
                .expect("forward targets are mesh members")
                .push_back(entry);
        }
    }

    /// Apply probability aging for the tick (PRoPHET mode only)
    pub fn age_prophet(&mut self, tick: u64) {
        if let Some(table) = &mut self.prophet {
            table.age(tick);
        }
    }

    fn attempt_forward(
        &mut self,
        custodian: &PeerId,
        entry: &mut HoldEntry,
        mesh: &Mesh,
        presence: &ChurnState,
        tick: u64,
        rec: &mut Recorder,
    ) -> Forward {
        let dest = entry.packet.destination.clone();

        // Arrival: the packet sits in the destination's own buffer, so it is
        // delivered whether or not the destination is currently awake.
        if *custodian == dest {
            let via = entry
                .forwarded_by
                .clone()
                .expect("packets originate at a different peer");
            let latency = tick.saturating_sub(entry.packet.created_tick);
            let hop_count = entry.packet.hop_count;
            let ctx = rec.child_of(&entry.ctx);
            debug!(packet = %entry.packet.id, to = %dest, via = %via, latency, "packet delivered");
            rec.record(
                tick,
                &ctx,
                EventKind::Delivered {
                    to: dest,
                    via,
                    packet_id: entry.packet.id.clone(),
                    latency_ticks: latency,
                    hop_count,
                },
            );
            return Forward::Delivered;
        }

        // Asleep custodians keep their packets but transmit nothing
        if !presence.is_online(custodian) {
            return Forward::Held(None);
        }

        // Destination is an awake neighbour: hand the packet straight over
        if presence.is_online(&dest) && mesh.are_connected(custodian, &dest) {
            entry.packet.mark_visited(&dest);
            entry.forwarded_by = Some(custodian.clone());
            entry.entered_tick = tick;
            entry.announced = false;
            if let Some(table) = &mut self.prophet {
                table.encounter(custodian, &dest, tick);
            }
            if self.trace_routing {
                trace!(packet = %entry.packet.id, from = %custodian, to = %dest, "handing packet to destination");
            }
            return Forward::Handed(dest);
        }

        let next = match self.mode {
            RoutingMode::Default => {
                self.shortest_path_hop(mesh, presence, &entry.packet, custodian, &dest)
            }
            RoutingMode::Prophet => {
                self.prophet_hop(mesh, presence, &entry.packet, custodian, &dest)
            }
        };

        match next {
            Some(hop) => {
                entry.packet.mark_visited(&hop);
                entry.packet.hop_count += 1;
                entry.forwarded_by = Some(custodian.clone());
                entry.entered_tick = tick;
                entry.announced = false;
                entry.ctx = rec.child_of(&entry.ctx);
                if let Some(table) = &mut self.prophet {
                    table.encounter(custodian, &hop, tick);
                }
                if self.trace_routing {
                    trace!(packet = %entry.packet.id, from = %custodian, via = %hop, to = %dest, "relaying packet");
                }
                rec.record(
                    tick,
                    &entry.ctx,
                    EventKind::Relay {
                        from: custodian.clone(),
                        via: hop.clone(),
                        to: dest,
                        packet_id: entry.packet.id.clone(),
                    },
                );
                Forward::Handed(hop)
            }
            None => {
                let reason = if mesh.are_connected(custodian, &dest) && !presence.is_online(&dest)
                {
                    HoldReason::DestinationOffline
                } else if mesh.shortest_path(custodian, &dest).is_empty() {
                    HoldReason::NoRoute
                } else {
                    HoldReason::AwaitingNextHop
                };
                Forward::Held(Some(reason))
            }
        }
    }

    /// Next hop on the shortest path, if it is awake and unvisited
    fn shortest_path_hop(
        &self,
        mesh: &Mesh,
        presence: &ChurnState,
        packet: &Packet,
        custodian: &PeerId,
        dest: &PeerId,
    ) -> Option<PeerId> {
        mesh.shortest_path(custodian, dest)
            .into_iter()
            .nth(1)
            .filter(|n| presence.is_online(n) && !packet.was_visited(n))
    }

    /// Awake, unvisited neighbour with the best encounter history toward the
    /// destination; shortest path when the tables are cold
    fn prophet_hop(
        &self,
        mesh: &Mesh,
        presence: &ChurnState,
        packet: &Packet,
        custodian: &PeerId,
        dest: &PeerId,
    ) -> Option<PeerId> {
        let table = self.prophet.as_ref().expect("prophet mode carries a table");
        let candidates: Vec<PeerId> = mesh
            .neighbors(custodian)
            .into_iter()
            .filter(|n| presence.is_online(n) && !packet.was_visited(n))
            .collect();

        table
            .best_candidate(dest, &candidates)
            .or_else(|| self.shortest_path_hop(mesh, presence, packet, custodian, dest))
    }

    /// Drop checks applied to a packet that stays held this tick
    fn check_drop(
        &self,
        custodian: &PeerId,
        entry: &HoldEntry,
        mesh: &Mesh,
        tick: u64,
        rec: &mut Recorder,
    ) -> bool {
        if let Some(ttl) = self.message_ttl
            && tick.saturating_sub(entry.entered_tick) > ttl
        {
            warn!(packet = %entry.packet.id, at = %custodian, ttl, "dropping packet held past its ttl");
            let ctx = rec.child_of(&entry.ctx);
            rec.record(
                tick,
                &ctx,
                EventKind::Dropped {
                    packet_id: entry.packet.id.clone(),
                    reason: DropReason::Expired,
                },
            );
            return true;
        }

        if mesh.reachable_from(custodian).is_subset(&entry.packet.visited) {
            warn!(packet = %entry.packet.id, at = %custodian, "dropping packet with no unvisited peers in reach");
            let ctx = rec.child_of(&entry.ctx);
            rec.record(
                tick,
                &ctx,
                EventKind::Dropped {
                    packet_id: entry.packet.id.clone(),
                    reason: DropReason::NoRoute,
                },
            );
            return true;
        }

        false
    }
}
