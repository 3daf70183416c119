//! Online/offline churn model
//!
//! Peers flip state at tick boundaries according to configured wake and
//! sleep probabilities, or only through explicit force calls in manual
//! mode. Draws happen in PeerId order so a fixed seed reproduces the same
//! sequence of transitions.

use std::collections::BTreeMap;

use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

use driftmesh_core::PeerId;

use crate::topology::Mesh;

/// Per-peer online state
#[derive(Debug, Clone)]
pub struct ChurnState {
    online: BTreeMap<PeerId, bool>,
}

impl ChurnState {
    /// All peers start offline
    pub fn new(mesh: &Mesh) -> Self {
        Self {
            online: mesh.peers().iter().map(|p| (p.clone(), false)).collect(),
        }
    }

    pub fn is_online(&self, peer: &PeerId) -> bool {
        self.online.get(peer).copied().unwrap_or(false)
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.online.contains_key(peer)
    }

    pub fn online_peers(&self) -> Vec<PeerId> {
        self.online
            .iter()
            .filter(|(_, on)| **on)
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn offline_peers(&self) -> Vec<PeerId> {
        self.online
            .iter()
            .filter(|(_, on)| !**on)
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn online_count(&self) -> usize {
        self.online.values().filter(|on| **on).count()
    }

    /// Assign initial states, drawing one bit per peer in PeerId order
    ///
    /// Returns the peers that came online.
    pub fn initialize(&mut self, initial_online_probability: f64, rng: &mut StdRng) -> Vec<PeerId> {
        let mut woke = Vec::new();
        for (peer, online) in self.online.iter_mut() {
            *online = rng.random::<f64>() < initial_online_probability;
            if *online {
                woke.push(peer.clone());
            }
        }
        woke
    }

    /// Run one tick of churn, drawing one bit per peer in PeerId order
    ///
    /// Returns the transitions `(peer, now_online)` that occurred.
    pub fn tick(
        &mut self,
        wake_probability: f64,
        sleep_probability: f64,
        rng: &mut StdRng,
    ) -> Vec<(PeerId, bool)> {
        let mut transitions = Vec::new();
        for (peer, online) in self.online.iter_mut() {
            let prob = if *online {
                sleep_probability
            } else {
                wake_probability
            };
            if rng.random::<f64>() < prob {
                *online = !*online;
                debug!(peer = %peer, online = *online, "churn transition");
                transitions.push((peer.clone(), *online));
            }
        }
        transitions
    }

    /// Force a peer's state; returns true if it actually changed
    pub fn force(&mut self, peer: &PeerId, online: bool) -> bool {
        match self.online.get_mut(peer) {
            Some(state) if *state != online => {
                *state = online;
                true
            }
            _ => false,
        }
    }
}
