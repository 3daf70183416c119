//! Mesh topology for the simulator
//!
//! A [`Mesh`] is an undirected graph of peers whose membership and edges are
//! fixed once built. [`MeshBuilder`] produces the common shapes:
//! - Line: A - B - C - ...
//! - Ring: line with wrap-around
//! - Star: first peer connected to all others
//! - Full mesh: every pair connected
//! - Random: each pair included with a configurable probability

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use driftmesh_core::PeerId;

/// An undirected mesh of peers
///
/// Queries on peers outside the mesh return empty results; they never fail.
#[derive(Debug, Clone)]
pub struct Mesh {
    /// Peers in insertion order
    order: Vec<PeerId>,
    /// Adjacency sets, keyed and ordered by PeerId
    adjacency: BTreeMap<PeerId, BTreeSet<PeerId>>,
    edge_count: usize,
}

impl Mesh {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            adjacency: BTreeMap::new(),
            edge_count: 0,
        }
    }

    /// Build a mesh from an explicit edge list
    ///
    /// Endpoints are added as they first appear; self-loops and duplicate
    /// edges are ignored.
    pub fn from_edges<P: Into<PeerId>>(edges: impl IntoIterator<Item = (P, P)>) -> Self {
        let mut mesh = Self::new();
        for (a, b) in edges {
            mesh.connect(a.into(), b.into());
        }
        mesh
    }

    fn add_peer(&mut self, id: PeerId) {
        if let std::collections::btree_map::Entry::Vacant(e) = self.adjacency.entry(id.clone()) {
            e.insert(BTreeSet::new());
            self.order.push(id);
        }
    }

    fn connect(&mut self, a: PeerId, b: PeerId) {
        if a == b {
            return; // No self-loops
        }
        self.add_peer(a.clone());
        self.add_peer(b.clone());

        let inserted = self.adjacency.get_mut(&a).unwrap().insert(b.clone());
        self.adjacency.get_mut(&b).unwrap().insert(a);
        if inserted {
            self.edge_count += 1;
        }
    }

    /// All peers, in insertion order
    pub fn peers(&self) -> &[PeerId] {
        &self.order
    }

    /// Whether a peer belongs to this mesh
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.adjacency.contains_key(peer)
    }

    /// Neighbors of a peer, in PeerId order
    pub fn neighbors(&self, peer: &PeerId) -> BTreeSet<PeerId> {
        self.adjacency.get(peer).cloned().unwrap_or_default()
    }

    /// Check if two peers share an edge
    pub fn are_connected(&self, a: &PeerId, b: &PeerId) -> bool {
        self.adjacency
            .get(a)
            .map(|neighbors| neighbors.contains(b))
            .unwrap_or(false)
    }

    /// Peers adjacent to both a and b
    pub fn mutual_peers(&self, a: &PeerId, b: &PeerId) -> BTreeSet<PeerId> {
        match (self.adjacency.get(a), self.adjacency.get(b)) {
            (Some(an), Some(bn)) => an.intersection(bn).cloned().collect(),
            _ => BTreeSet::new(),
        }
    }

    pub fn peer_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Shortest path from a to b, endpoints included
    ///
    /// Breadth-first search expanding neighbours in PeerId order, so between
    /// equal-length paths the one through lower ids wins. Returns an empty
    /// path when b is unreachable (or either endpoint is unknown).
    pub fn shortest_path(&self, a: &PeerId, b: &PeerId) -> Vec<PeerId> {
        if !self.contains(a) || !self.contains(b) {
            return Vec::new();
        }
        if a == b {
            return vec![a.clone()];
        }

        let mut parent: BTreeMap<PeerId, PeerId> = BTreeMap::new();
        let mut queue = VecDeque::from([a.clone()]);

        while let Some(current) = queue.pop_front() {
            for next in &self.adjacency[&current] {
                if next == a || parent.contains_key(next) {
                    continue;
                }
                parent.insert(next.clone(), current.clone());
                if next == b {
                    let mut path = vec![b.clone()];
                    let mut cursor = b;
                    while let Some(prev) = parent.get(cursor) {
                        path.push(prev.clone());
                        cursor = prev;
                    }
                    path.reverse();
                    return path;
                }
                queue.push_back(next.clone());
            }
        }
        Vec::new()
    }

    /// Every peer reachable from the given one, itself included
    pub fn reachable_from(&self, peer: &PeerId) -> BTreeSet<PeerId> {
        let mut seen = BTreeSet::new();
        if !self.contains(peer) {
            return seen;
        }
        seen.insert(peer.clone());
        let mut queue = VecDeque::from([peer.clone()]);
        while let Some(current) = queue.pop_front() {
            for next in &self.adjacency[&current] {
                if seen.insert(next.clone()) {
                    queue.push_back(next.clone());
                }
            }
        }
        seen
    }

    /// Print a simple ASCII visualization of the mesh
    pub fn visualize(&self) -> String {
        let mut output = String::new();
        output.push_str("Mesh Topology:\n");
        output.push_str(&format!("  Peers: {}\n", self.peer_count()));
        output.push_str(&format!("  Edges: {}\n\n", self.edge_count()));

        for (peer, neighbors) in &self.adjacency {
            let neighbor_str: Vec<String> = neighbors.iter().map(|n| n.to_string()).collect();
            output.push_str(&format!("  {} -> [{}]\n", peer, neighbor_str.join(", ")));
        }
        output
    }
}

/// Builder for the common mesh shapes over peers A, B, C, ...
pub struct MeshBuilder {
    peer_count: usize,
    seed: u64,
}

impl MeshBuilder {
    /// Create a builder with the given number of peers (max 26)
    pub fn new(peer_count: usize) -> Self {
        assert!(
            (1..=26).contains(&peer_count),
            "peer count must be 1..=26 (A-Z)"
        );
        Self {
            peer_count,
            seed: 0,
        }
    }

    /// Seed for the random topology generator
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn letters(&self) -> Vec<PeerId> {
        PeerId::range_to((b'A' + self.peer_count as u8 - 1) as char)
    }

    fn empty(&self) -> Mesh {
        let mut mesh = Mesh::new();
        for peer in self.letters() {
            mesh.add_peer(peer);
        }
        mesh
    }

    /// Line topology: A - B - C - ...
    pub fn line(self) -> Mesh {
        let peers = self.letters();
        let mut mesh = self.empty();
        for pair in peers.windows(2) {
            mesh.connect(pair[0].clone(), pair[1].clone());
        }
        mesh
    }

    /// Ring topology: a line with the ends joined
    pub fn ring(self) -> Mesh {
        let peers = self.letters();
        let mut mesh = self.empty();
        for i in 0..peers.len() {
            let next = (i + 1) % peers.len();
            mesh.connect(peers[i].clone(), peers[next].clone());
        }
        mesh
    }

    /// Star topology: A in the center, connected to all others
    pub fn star(self) -> Mesh {
        let peers = self.letters();
        let mut mesh = self.empty();
        for peer in peers.iter().skip(1) {
            mesh.connect(peers[0].clone(), peer.clone());
        }
        mesh
    }

    /// Full mesh: every peer connected to every other
    pub fn full_mesh(self) -> Mesh {
        let peers = self.letters();
        let mut mesh = self.empty();
        for i in 0..peers.len() {
            for j in (i + 1)..peers.len() {
                mesh.connect(peers[i].clone(), peers[j].clone());
            }
        }
        mesh
    }

    /// Random mesh: each unordered pair included with the given probability
    ///
    /// Draws come from an `StdRng` seeded via [`MeshBuilder::seed`], so the
    /// same seed reproduces the same shape. Peers left isolated are patched
    /// with one edge to a random other peer.
    pub fn random(self, connection_probability: f64) -> Mesh {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let peers = self.letters();
        let mut mesh = self.empty();

        for i in 0..peers.len() {
            for j in (i + 1)..peers.len() {
                if rng.random::<f64>() < connection_probability {
                    mesh.connect(peers[i].clone(), peers[j].clone());
                }
            }
        }

        // Patch isolated peers so every node can participate
        for peer in &peers {
            if mesh.neighbors(peer).is_empty() && peers.len() > 1 {
                loop {
                    let other = &peers[rng.random_range(0..peers.len())];
                    if other != peer {
                        mesh.connect(peer.clone(), other.clone());
                        break;
                    }
                }
            }
        }

        mesh
    }
}
