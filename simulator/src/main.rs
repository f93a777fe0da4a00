//! Bundleswap Simulator
//!
//! Demo environment that wires the settlement engine to reference asset
//! contracts and drives scripted multi-party barter scenarios.

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod scenario;

use controller::SimulationController;
use scenario::Scenario;

/// Bundleswap Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Bundleswap settlement demo environment")]
struct Args {
    /// Scenario to run (all built-in scenarios when omitted)
    #[arg(short, long)]
    scenario: Option<String>,

    /// Number of parties for the random-ring scenario
    #[arg(short, long, default_value = "5")]
    parties: usize,

    /// Random seed for reproducibility
    #[arg(long, default_value = "42")]
    seed: u64,

    /// List built-in scenarios and exit
    #[arg(long)]
    list: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list {
        for name in Scenario::all_names() {
            let scenario = Scenario::load(name, args.parties, args.seed)?;
            println!("{name}: {}", scenario.description);
        }
        return Ok(());
    }

    let names: Vec<&str> = match &args.scenario {
        Some(name) => vec![name.as_str()],
        None => Scenario::all_names().to_vec(),
    };

    info!("Starting Bundleswap Simulator");

    for name in names {
        let scenario = Scenario::load(name, args.parties, args.seed)?;
        let mut controller = SimulationController::new(&scenario);
        controller.run(&scenario)?;

        let metrics = controller.metrics();
        info!(
            scenario = name,
            settlements_created = metrics.settlements_created,
            settlements_executed = metrics.settlements_executed,
            settlements_cancelled = metrics.settlements_cancelled,
            approvals = metrics.approvals_recorded,
            events = controller.event_count(),
            "Scenario finished"
        );
    }

    info!("All scenarios complete");
    Ok(())
}
