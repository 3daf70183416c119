//! Typed event records and the append-only event log
//!
//! Every significant decision the engine makes lands here as an
//! [`EventRecord`]: the event payload plus the tick and the correlation
//! fields of the context active at emission. The log is the ground truth a
//! scenario asserts against; [`super::stats::SimStats`] mirrors it counter
//! by counter.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use driftmesh_core::{PacketId, PeerId, Priority};
use driftmesh_logging::CorrelationContext;

use crate::stats::SimStats;

/// Why a packet entered a hold buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldReason {
    /// Destination is adjacent but offline
    DestinationOffline,
    /// No path to the destination exists in the mesh
    NoRoute,
    /// A path exists but the next hop is offline or already visited
    AwaitingNextHop,
}

/// Why a packet was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Held longer than the configured TTL
    Expired,
    /// The visited set covers everything reachable from the custodian
    NoRoute,
}

/// The per-type payload of a recorded event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    /// A message was accepted for routing
    Send {
        from: PeerId,
        to: PeerId,
        packet_id: PacketId,
        priority: Priority,
    },
    /// Packet forwarded through an intermediate custodian
    Relay {
        from: PeerId,
        via: PeerId,
        to: PeerId,
        packet_id: PacketId,
    },
    /// Packet arrived at its destination
    Delivered {
        to: PeerId,
        via: PeerId,
        packet_id: PacketId,
        latency_ticks: u64,
        hop_count: u32,
    },
    /// Packet abandoned
    Dropped {
        packet_id: PacketId,
        reason: DropReason,
    },
    /// Packet parked in a custodian's hold buffer
    Hold {
        at: PeerId,
        packet_id: PacketId,
        reason: HoldReason,
    },
    PeerOnline {
        peer: PeerId,
    },
    PeerOffline {
        peer: PeerId,
    },

    // Post-quantum crypto accounting (parameters recorded, nothing computed)
    PqSignature {
        signer: PeerId,
        latency_us: u64,
        message_bytes: usize,
    },
    PqVerification {
        verifier: PeerId,
        signer: PeerId,
        latency_us: u64,
        success: bool,
    },
    KemEncapsulation {
        initiator: PeerId,
        target: PeerId,
        latency_us: u64,
    },
    KemDecapsulation {
        target: PeerId,
        initiator: PeerId,
        latency_us: u64,
        success: bool,
    },
    InviteCreated {
        from: PeerId,
        to: PeerId,
        realm: String,
    },
    InviteAccepted {
        peer: PeerId,
        realm: String,
    },
    InviteFailed {
        peer: PeerId,
        realm: String,
        reason: String,
    },
}

impl EventKind {
    /// The tag this variant serialises under
    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::Send { .. } => "Send",
            EventKind::Relay { .. } => "Relay",
            EventKind::Delivered { .. } => "Delivered",
            EventKind::Dropped { .. } => "Dropped",
            EventKind::Hold { .. } => "Hold",
            EventKind::PeerOnline { .. } => "PeerOnline",
            EventKind::PeerOffline { .. } => "PeerOffline",
            EventKind::PqSignature { .. } => "PqSignature",
            EventKind::PqVerification { .. } => "PqVerification",
            EventKind::KemEncapsulation { .. } => "KemEncapsulation",
            EventKind::KemDecapsulation { .. } => "KemDecapsulation",
            EventKind::InviteCreated { .. } => "InviteCreated",
            EventKind::InviteAccepted { .. } => "InviteAccepted",
            EventKind::InviteFailed { .. } => "InviteFailed",
        }
    }
}

/// One entry in the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub tick: u64,
    pub trace_id: Uuid,
    pub span_id: Uuid,
    pub parent_span_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// Append-only sequence of event records
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, record: EventRecord) {
        self.records.push(record);
    }

    /// All records, in emission order
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose kind serialises under the given tag
    pub fn of_type(&self, type_name: &str) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.kind.type_name() == type_name)
            .collect()
    }

    /// Count of records with the given tag
    pub fn count_of(&self, type_name: &str) -> usize {
        self.records
            .iter()
            .filter(|r| r.kind.type_name() == type_name)
            .count()
    }
}

/// Shared sink for everything the engine records
///
/// Owns the log, the statistics, and the id stream that mints correlation
/// identifiers. Stats are updated inside [`Recorder::record`], in the same
/// breath as the log append, which is what keeps them consistent with the
/// log by construction.
#[derive(Debug)]
pub struct Recorder {
    log: EventLog,
    stats: SimStats,
    ids: StdRng,
    root: CorrelationContext,
}

/// Keeps the id stream distinct from the engine's main draw sequence.
const ID_STREAM_SALT: u64 = 0x9e37_79b9_7f4a_7c15;

impl Recorder {
    pub fn new(seed: u64) -> Self {
        let mut ids = StdRng::seed_from_u64(seed ^ ID_STREAM_SALT);
        let root = CorrelationContext::root_with(&mut ids);
        Self {
            log: EventLog::new(),
            stats: SimStats::default(),
            ids,
            root,
        }
    }

    /// A fresh child of the engine's root context
    pub fn child_of_root(&mut self) -> CorrelationContext {
        let root = self.root.clone();
        root.child_with(&mut self.ids)
    }

    /// A fresh root context for one packet's journey
    ///
    /// The trace id stays constant from the send through every relay to the
    /// delivery or drop.
    pub fn packet_root(&mut self) -> CorrelationContext {
        CorrelationContext::root_with(&mut self.ids)
    }

    /// A fresh child of an arbitrary context
    pub fn child_of(&mut self, ctx: &CorrelationContext) -> CorrelationContext {
        ctx.child_with(&mut self.ids)
    }

    /// Append a record under the given context and fold it into the stats
    pub fn record(&mut self, tick: u64, ctx: &CorrelationContext, kind: EventKind) {
        self.stats.apply(&kind);
        self.log.append(EventRecord {
            tick,
            trace_id: ctx.trace_id,
            span_id: ctx.span_id,
            parent_span_id: ctx.parent_span_id,
            tags: ctx.tags.clone(),
            kind,
        });
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn stats(&self) -> &SimStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(c: char) -> PeerId {
        PeerId::new(c)
    }

    #[test]
    fn test_serialisation_shape() {
        let mut rec = Recorder::new(1);
        let ctx = rec.child_of_root();
        rec.record(
            3,
            &ctx,
            EventKind::Relay {
                from: id('A'),
                via: id('B'),
                to: id('C'),
                packet_id: PacketId::new(id('A'), 0),
            },
        );

        let value = serde_json::to_value(&rec.log().records()[0]).unwrap();
        assert_eq!(value["type"], "Relay");
        assert_eq!(value["tick"], 3);
        assert_eq!(value["from"], "A");
        assert_eq!(value["via"], "B");
        assert_eq!(value["to"], "C");
        assert!(value["trace_id"].is_string());
        assert!(value["span_id"].is_string());
        assert!(value.get("tags").is_none());
    }

    #[test]
    fn test_serialisation_round_trip() {
        let mut rec = Recorder::new(1);
        let ctx = rec.child_of_root().with_tag("scenario", "unit");
        rec.record(
            0,
            &ctx,
            EventKind::PqVerification {
                verifier: id('B'),
                signer: id('A'),
                latency_us: 150,
                success: true,
            },
        );

        let json = serde_json::to_string(rec.log().records()).unwrap();
        let parsed: Vec<EventRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, rec.log().records());
    }

    #[test]
    fn test_of_type_and_count() {
        let mut rec = Recorder::new(1);
        let ctx = rec.child_of_root();
        rec.record(0, &ctx, EventKind::PeerOnline { peer: id('A') });
        rec.record(1, &ctx, EventKind::PeerOffline { peer: id('A') });
        rec.record(1, &ctx, EventKind::PeerOnline { peer: id('B') });

        assert_eq!(rec.log().count_of("PeerOnline"), 2);
        assert_eq!(rec.log().of_type("PeerOffline").len(), 1);
        assert_eq!(rec.log().count_of("Send"), 0);
        assert_eq!(rec.log().len(), 3);
    }

    #[test]
    fn test_record_carries_context_fields() {
        let mut rec = Recorder::new(9);
        let parent = rec.child_of_root();
        let ctx = rec.child_of(&parent);
        rec.record(0, &ctx, EventKind::PeerOnline { peer: id('A') });

        let record = &rec.log().records()[0];
        assert_eq!(record.trace_id, ctx.trace_id);
        assert_eq!(record.span_id, ctx.span_id);
        assert_eq!(record.parent_span_id, Some(parent.span_id));
    }

    #[test]
    fn test_recorder_ids_reproducible() {
        let mut a = Recorder::new(5);
        let mut b = Recorder::new(5);
        assert_eq!(a.child_of_root(), b.child_of_root());
        assert_ne!(a.child_of_root(), Recorder::new(6).child_of_root());
    }
}
