//! PRoPHET (Probabilistic Routing Protocol using History) tables
//!
//! PRoPHET estimates delivery probabilities from encounter history. Peers
//! that exchange packets often are likely to meet again, so they make good
//! custodians for each other's traffic.
//!
//! Key concepts:
//! - **Encounter updates**: when two peers exchange a packet, their mutual
//!   probabilities increase
//! - **Aging**: probabilities decay over ticks without encounters
//! - **Transitivity**: if A meets B often and B meets C often, A has an
//!   indirect path estimate for C
//!
//! Time here is the simulation tick; the table never looks at a clock.

use std::collections::BTreeMap;

use driftmesh_core::PeerId;

/// PRoPHET protocol configuration
#[derive(Debug, Clone)]
pub struct ProphetConfig {
    /// Weight applied at each encounter: P += (1 - P) * weight
    pub encounter_weight: f64,

    /// Aging constant applied per tick without encounters: P *= aging_constant
    pub aging_constant: f64,

    /// Transitivity scaling factor: P_a_c = P_a_b * P_b_c * transitivity
    pub transitivity_constant: f64,

    /// Maximum probability value (capped)
    pub max_probability: f64,

    /// Entries aged below this are dropped from the table
    pub min_probability: f64,
}

impl Default for ProphetConfig {
    fn default() -> Self {
        Self {
            encounter_weight: 0.5,
            aging_constant: 0.98,
            transitivity_constant: 0.5,
            max_probability: 0.95,
            min_probability: 0.01,
        }
    }
}

/// Per-pair encounter record
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterEntry {
    /// Delivery probability toward this peer, in [0, 1]
    pub probability: f64,
    /// Tick of the most recent encounter
    pub last_encounter_tick: u64,
    /// How many encounters have been recorded
    pub encounters: u64,
}

/// Encounter-history tables for every peer in a simulation
///
/// `direct[a][b]` is a's delivery probability estimate for b. Encounters are
/// symmetric, so both directions are bumped together; aging applies uniformly
/// once per tick.
#[derive(Debug, Clone)]
pub struct ProphetTable {
    config: ProphetConfig,
    direct: BTreeMap<PeerId, BTreeMap<PeerId, EncounterEntry>>,
    last_aged_tick: u64,
}

impl ProphetTable {
    pub fn new(config: ProphetConfig) -> Self {
        Self {
            config,
            direct: BTreeMap::new(),
            last_aged_tick: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ProphetConfig::default())
    }

    pub fn config(&self) -> &ProphetConfig {
        &self.config
    }

    /// Record a packet exchange between two peers at the given tick
    ///
    /// Bumps the probability in both directions and updates encounter
    /// metadata. Self-encounters are ignored.
    pub fn encounter(&mut self, a: &PeerId, b: &PeerId, tick: u64) {
        if a == b {
            return;
        }
        self.bump(a, b, tick);
        self.bump(b, a, tick);
    }

    fn bump(&mut self, from: &PeerId, to: &PeerId, tick: u64) {
        let entry = self
            .direct
            .entry(from.clone())
            .or_default()
            .entry(to.clone())
            .or_insert(EncounterEntry {
                probability: 0.0,
                last_encounter_tick: tick,
                encounters: 0,
            });

        let p_old = entry.probability;
        let p_new = p_old + (1.0 - p_old) * self.config.encounter_weight;
        entry.probability = p_new.min(self.config.max_probability);
        entry.last_encounter_tick = tick;
        entry.encounters += 1;
    }

    /// Direct delivery probability from one peer toward another
    ///
    /// Returns 0.0 for unknown pairs.
    pub fn direct(&self, from: &PeerId, to: &PeerId) -> f64 {
        self.direct
            .get(from)
            .and_then(|m| m.get(to))
            .map(|e| e.probability)
            .unwrap_or(0.0)
    }

    /// Full encounter record for a pair, if one exists
    pub fn entry(&self, from: &PeerId, to: &PeerId) -> Option<&EncounterEntry> {
        self.direct.get(from).and_then(|m| m.get(to))
    }

    /// Transitive delivery probability, computed on demand
    ///
    /// `max` over intermediaries I of `direct(from, I) * direct(I, to) *
    /// transitivity_constant`. Decay of the direct tables carries over
    /// automatically.
    pub fn transitive(&self, from: &PeerId, to: &PeerId) -> f64 {
        let Some(known) = self.direct.get(from) else {
            return 0.0;
        };

        let mut best = 0.0f64;
        for (via, entry) in known {
            if via == to || via == from {
                continue;
            }
            let p = entry.probability * self.direct(via, to) * self.config.transitivity_constant;
            if p > best {
                best = p;
            }
        }
        best
    }

    /// Age every probability for the ticks elapsed since the last aging pass
    ///
    /// Entries that decay below `min_probability` are removed.
    pub fn age(&mut self, tick: u64) {
        if tick <= self.last_aged_tick {
            return;
        }
        let factor = self
            .config
            .aging_constant
            .powi((tick - self.last_aged_tick) as i32);
        self.last_aged_tick = tick;

        let floor = self.config.min_probability;
        for peers in self.direct.values_mut() {
            peers.retain(|_, entry| {
                entry.probability *= factor;
                entry.probability >= floor
            });
        }
    }

    /// Pick the candidate with the best delivery estimate for a destination
    ///
    /// Direct probability wins over transitive; candidates are compared with
    /// strict greater-than, so with `candidates` in PeerId order ties resolve
    /// to the lowest id. Returns `None` when every estimate is zero.
    pub fn best_candidate(&self, destination: &PeerId, candidates: &[PeerId]) -> Option<PeerId> {
        let argmax = |score: &dyn Fn(&PeerId) -> f64| -> Option<(PeerId, f64)> {
            let mut best: Option<(PeerId, f64)> = None;
            for c in candidates {
                if c == destination {
                    continue;
                }
                let s = score(c);
                if best.as_ref().is_none_or(|(_, b)| s > *b) {
                    best = Some((c.clone(), s));
                }
            }
            best
        };

        if let Some((peer, p)) = argmax(&|c| self.direct(c, destination))
            && p > 0.0
        {
            return Some(peer);
        }
        if let Some((peer, p)) = argmax(&|c| self.transitive(c, destination))
            && p > 0.0
        {
            return Some(peer);
        }
        None
    }

    /// Number of peers with at least one table entry
    pub fn tracked_peers(&self) -> usize {
        self.direct.len()
    }
}
