//! driftmesh - delay-tolerant mesh simulation
//!
//! Runs the pre-built scenarios or renders a topology from the command line.

use clap::{Parser, Subcommand};

use driftmesh_simulation::{MeshBuilder, scenarios};

#[derive(Parser)]
#[command(
    name = "driftmesh",
    about = "Mesh network simulation with store-and-forward routing",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the canonical A-B-C store-and-forward scenario
    Abc,

    /// Run a multi-hop line relay scenario
    Line,

    /// Run the partition-and-heal scenario
    Partition,

    /// Run the PRoPHET warm-up scenario
    Prophet,

    /// Run a seeded chaos simulation with probabilistic churn
    Chaos {
        /// Number of ticks to run
        #[arg(short, long, default_value = "100")]
        ticks: u64,

        /// Seed for topology, churn, and correlation ids
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },

    /// Create and visualize a topology
    Topology {
        /// Type of topology: line, ring, star, full, random
        #[arg(short = 'T', long, default_value = "ring")]
        topology: String,

        /// Number of peers (max 26)
        #[arg(short, long, default_value = "6")]
        peers: usize,

        /// Connection probability for the random topology
        #[arg(short, long, default_value = "0.4")]
        connection_prob: f64,

        /// Seed for the random topology
        #[arg(short, long, default_value = "0")]
        seed: u64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    driftmesh_logging::init(cli.verbose);

    match cli.command {
        Commands::Abc => {
            scenarios::run_abc_scenario();
        }
        Commands::Line => {
            scenarios::run_line_relay_scenario();
        }
        Commands::Partition => {
            scenarios::run_partition_scenario();
        }
        Commands::Prophet => {
            scenarios::run_prophet_scenario();
        }
        Commands::Chaos { ticks, seed } => {
            scenarios::run_chaos_scenario(ticks, seed);
        }
        Commands::Topology {
            topology,
            peers,
            connection_prob,
            seed,
        } => {
            let builder = MeshBuilder::new(peers).seed(seed);
            let mesh = match topology.as_str() {
                "line" => builder.line(),
                "ring" => builder.ring(),
                "star" => builder.star(),
                "full" => builder.full_mesh(),
                "random" => builder.random(connection_prob),
                other => {
                    anyhow::bail!("unknown topology: {other}");
                }
            };
            println!("{}", mesh.visualize());
        }
    }

    Ok(())
}
