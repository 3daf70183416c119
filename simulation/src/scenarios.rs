//! Pre-built simulation scenarios
//!
//! Each scenario drives the engine through a scripted sequence and prints
//! its progress; the CLI binary and the integration tests both run them.

use tracing::info;

use driftmesh_core::PeerId;

use crate::engine::{SimConfig, Simulation};
use crate::routing::RoutingMode;
use crate::topology::{Mesh, MeshBuilder};

/// The canonical A-B-C run:
///
/// ```text
/// A and B wake up, C sleeps
/// A sends to C; the packet waits with a custodian
/// C wakes up and the packet is delivered
/// ```
pub fn run_abc_scenario() -> Simulation {
    info!("=== Running A-B-C Scenario ===");

    // Triangle topology so A can reach C directly or through B
    let mesh = Mesh::from_edges([('A', 'B'), ('B', 'C'), ('A', 'C')]);
    println!("{}", mesh.visualize());

    let mut sim = Simulation::new(mesh, SimConfig::manual()).unwrap();

    println!("--- A and B wake up, C stays asleep ---");
    sim.force_online(&PeerId::new('A')).unwrap();
    sim.force_online(&PeerId::new('B')).unwrap();

    println!("--- A sends to C (C is offline) ---");
    sim.send_message(PeerId::new('A'), PeerId::new('C'), b"Hello C!".to_vec())
        .unwrap();
    sim.run_ticks(5);
    println!("  {}", sim.state_summary());
    println!(
        "  Delivered so far: {} (packet is held)",
        sim.stats().messages_delivered
    );

    println!("--- C wakes up ---");
    sim.force_online(&PeerId::new('C')).unwrap();
    sim.run_ticks(10);
    println!("  {}", sim.state_summary());

    println!("\n=== Final Statistics ===");
    println!("  Messages sent: {}", sim.stats().messages_sent);
    println!("  Messages delivered: {}", sim.stats().messages_delivered);
    println!("  Holds recorded: {}", sim.events_by_type("Hold").len());

    sim
}

/// Multi-hop relay along a line: A - B - C - D - E, everyone awake
pub fn run_line_relay_scenario() -> Simulation {
    info!("=== Running Line Relay Scenario ===");

    let mesh = MeshBuilder::new(5).line();
    println!("{}", mesh.visualize());

    let mut sim = Simulation::new(mesh, SimConfig::manual()).unwrap();
    for peer in PeerId::range_to('E') {
        sim.force_online(&peer).unwrap();
    }

    println!("--- A sends to E across three relays ---");
    sim.send_message(PeerId::new('A'), PeerId::new('E'), b"Multi-hop test".to_vec())
        .unwrap();
    sim.run_ticks(20);

    println!("\n=== Final Statistics ===");
    println!("  Messages delivered: {}", sim.stats().messages_delivered);
    println!("  Relayed deliveries: {}", sim.stats().relayed_deliveries);
    println!("  Average hops: {:.1}", sim.stats().average_hops());

    sim
}

/// Partition and heal: a line where the bridge peer goes dark mid-run
pub fn run_partition_scenario() -> Simulation {
    info!("=== Running Partition Scenario ===");

    let mesh = Mesh::from_edges([('A', 'B'), ('B', 'C'), ('C', 'D'), ('D', 'E')]);
    println!("{}", mesh.visualize());

    let mut sim = Simulation::new(mesh, SimConfig::manual()).unwrap();
    for peer in PeerId::range_to('E') {
        sim.force_online(&peer).unwrap();
    }

    println!("--- A sends to E (full connectivity) ---");
    sim.send_message(PeerId::new('A'), PeerId::new('E'), b"ok".to_vec())
        .unwrap();
    sim.run_ticks(10);
    println!("  Delivered: {}", sim.stats().messages_delivered);

    println!("--- Bridge C goes offline, A sends again ---");
    sim.force_offline(&PeerId::new('C')).unwrap();
    sim.send_message(PeerId::new('A'), PeerId::new('E'), b"held".to_vec())
        .unwrap();
    sim.run_ticks(10);
    println!(
        "  Delivered: {} (second message is waiting)",
        sim.stats().messages_delivered
    );

    println!("--- Bridge heals ---");
    sim.force_online(&PeerId::new('C')).unwrap();
    sim.run_ticks(15);

    println!("\n=== Final Statistics ===");
    println!("  Messages sent: {}", sim.stats().messages_sent);
    println!("  Messages delivered: {}", sim.stats().messages_delivered);
    println!("  Delivery rate: {:.0}%", sim.stats().delivery_rate() * 100.0);

    sim
}

/// PRoPHET warm-up: traffic along one side of a diamond teaches the tables,
/// later traffic follows the learned route
pub fn run_prophet_scenario() -> Simulation {
    info!("=== Running PRoPHET Scenario ===");

    let mesh = Mesh::from_edges([('A', 'B'), ('A', 'C'), ('B', 'D'), ('C', 'D')]);
    println!("{}", mesh.visualize());

    let config = SimConfig {
        routing_mode: RoutingMode::Prophet,
        ..SimConfig::manual()
    };
    let mut sim = Simulation::new(mesh, config).unwrap();
    for peer in PeerId::range_to('D') {
        sim.force_online(&peer).unwrap();
    }

    println!("--- Warm-up: C and D exchange traffic ---");
    sim.send_message(PeerId::new('C'), PeerId::new('D'), b"warm-up".to_vec())
        .unwrap();
    sim.run_ticks(3);

    println!("--- A sends to D; the tables steer it through C ---");
    sim.send_message(PeerId::new('A'), PeerId::new('D'), b"routed".to_vec())
        .unwrap();
    sim.run_ticks(5);

    let table = sim.prophet().unwrap();
    println!("\n=== Final Statistics ===");
    println!("  Messages delivered: {}", sim.stats().messages_delivered);
    println!(
        "  P(C -> D) = {:.2}, P(B -> D) = {:.2}",
        table.direct(&PeerId::new('C'), &PeerId::new('D')),
        table.direct(&PeerId::new('B'), &PeerId::new('D')),
    );

    sim
}

/// Random topology with probabilistic churn, fully seeded
pub fn run_chaos_scenario(ticks: u64, seed: u64) -> Simulation {
    info!(ticks, seed, "=== Running Chaos Scenario ===");

    let mesh = MeshBuilder::new(8).seed(seed).random(0.4);
    println!("{}", mesh.visualize());

    let config = SimConfig {
        wake_probability: 0.3,
        sleep_probability: 0.2,
        initial_online_probability: 0.5,
        max_ticks: ticks,
        rng_seed: seed,
        ..Default::default()
    };
    let mut sim = Simulation::new(mesh, config).unwrap();
    sim.initialize();

    sim.send_message(PeerId::new('A'), PeerId::new('H'), b"cross-network".to_vec())
        .unwrap();
    sim.send_message(PeerId::new('B'), PeerId::new('G'), b"second".to_vec())
        .unwrap();
    sim.send_message(PeerId::new('C'), PeerId::new('F'), b"third".to_vec())
        .unwrap();

    while sim.tick() < ticks {
        sim.step();

        // Inject occasional new traffic
        if sim.tick().is_multiple_of(10) {
            let from = PeerId::new((b'A' + (sim.tick() % 8) as u8) as char);
            let to = PeerId::new((b'H' - (sim.tick() % 8) as u8) as char);
            if from != to {
                sim.send_message(from, to, format!("tick {}", sim.tick()).into_bytes())
                    .unwrap();
            }
        }

        if sim.tick().is_multiple_of(20) {
            println!("{}", sim.state_summary());
        }
    }

    println!("\n=== Final Statistics ===");
    println!("  Messages sent: {}", sim.stats().messages_sent);
    println!("  Messages delivered: {}", sim.stats().messages_delivered);
    println!("  Messages dropped: {}", sim.stats().messages_dropped);
    println!("  Wake events: {}", sim.stats().wake_events);
    println!("  Sleep events: {}", sim.stats().sleep_events);
    println!("  Delivery rate: {:.1}%", sim.stats().delivery_rate() * 100.0);

    sim
}
