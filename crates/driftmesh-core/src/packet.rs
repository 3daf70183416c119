//! Packet types for store-and-forward delivery
//!
//! A [`Packet`] carries an opaque payload from a source peer to a destination
//! peer. Intermediate custodians append themselves to the visited set, which
//! both prevents routing loops and records how far the packet has travelled.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identity::PeerId;

/// Unique identifier for a packet (source peer + per-source sequence)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketId {
    pub source: PeerId,
    pub sequence: u64,
}

impl PacketId {
    pub fn new(source: PeerId, sequence: u64) -> Self {
        Self { source, sequence }
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.source, self.sequence)
    }
}

/// Priority levels for packets
///
/// Recorded on the packet and its send event; routing treats all priorities
/// alike.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority - can be delayed
    Low,
    /// Normal priority (default)
    #[default]
    Normal,
    /// High priority - deliver ASAP
    High,
    /// Critical - never drop
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        write!(f, "{name}")
    }
}

/// A packet travelling through the mesh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    /// Unique packet identifier
    pub id: PacketId,
    /// Original sender
    pub source: PeerId,
    /// Final destination (never equal to the source)
    pub destination: PeerId,
    /// The message payload
    pub payload: Vec<u8>,
    /// Priority level
    pub priority: Priority,
    /// Simulation tick at which the packet was created
    pub created_tick: u64,
    /// Number of relay hops taken so far (non-decreasing)
    pub hop_count: u32,
    /// Peers who have already handled this packet (prevents loops)
    pub visited: BTreeSet<PeerId>,
}

impl Packet {
    pub fn new(
        id: PacketId,
        source: PeerId,
        destination: PeerId,
        payload: Vec<u8>,
        tick: u64,
    ) -> Self {
        debug_assert_ne!(source, destination);
        let mut visited = BTreeSet::new();
        visited.insert(source.clone());
        Self {
            id,
            source,
            destination,
            payload,
            priority: Priority::Normal,
            created_tick: tick,
            hop_count: 0,
            visited,
        }
    }

    /// Attach a non-default priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Record that a peer has handled this packet
    pub fn mark_visited(&mut self, peer: &PeerId) {
        self.visited.insert(peer.clone());
    }

    /// Check if a peer has already handled this packet
    pub fn was_visited(&self, peer: &PeerId) -> bool {
        self.visited.contains(peer)
    }
}
