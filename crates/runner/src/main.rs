//! Satellite layout optimizer CLI

use clap::{Parser, Subcommand};
use sat_layout_packing::check_state;
use sat_layout_runner::{logging, pack_scenario, run_scenario, Scenario};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sat-layout")]
#[command(about = "Satellite component layout packing and optimization")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack the initial layout and run the optimization loop
    Run {
        /// Scenario file (.toml or .json)
        scenario: PathBuf,

        /// Output file for the run report (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Override the scenario's round budget
        #[arg(short, long)]
        max_iterations: Option<u32>,
    },

    /// Only pack the initial layout
    Pack {
        /// Scenario file (.toml or .json)
        scenario: PathBuf,

        /// Output file for the initial design state (JSON)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Run {
            scenario,
            output,
            max_iterations,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let (report, _) = run_scenario(&scenario, max_iterations)?;
            report.print_summary();

            if let Some(path) = output {
                report.save_json(&path)?;
                println!("Report saved to: {}", path.display());
            }
        }

        Commands::Pack { scenario, output } => {
            let scenario = Scenario::load(&scenario)?;
            let (state, packing) = pack_scenario(&scenario)?;
            let feasibility = check_state(&state, scenario.optimizer.thresholds.min_clearance);

            println!("Scenario: {}", scenario.name);
            println!(
                "Placed {} parts in {} bins ({} unplaced), {} ms",
                state.len(),
                packing.bins_used,
                packing.unplaced.len(),
                packing.computation_time_ms
            );
            for c in state.iter() {
                println!(
                    "  {:<20} at ({:>8.1}, {:>8.1}, {:>8.1})  {:.0}x{:.0}x{:.0}",
                    c.id, c.position.x, c.position.y, c.position.z, c.dims.x, c.dims.y, c.dims.z
                );
            }
            println!(
                "Collisions: {}   Min clearance: {:.2} mm",
                feasibility.collision_count, feasibility.min_clearance
            );

            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(&state)?)?;
                println!("Layout saved to: {}", path.display());
            }
        }
    }

    Ok(())
}
