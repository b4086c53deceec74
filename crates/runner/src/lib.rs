//! # Sat-Layout Runner
//!
//! Scenario-driven front end for the layout optimizer: loads a scenario,
//! packs the initial layout, runs the control loop with the
//! [`HeuristicPlanner`] and the simplified physics model, and reports the
//! outcome.
//!
//! ```rust
//! use sat_layout_runner::{run_scenario, Scenario};
//!
//! let scenario = Scenario::from_toml_str(r#"
//! name = "single"
//!
//! [envelope]
//! outer_size = [400.0, 400.0, 400.0]
//!
//! [[components]]
//! id = "obc"
//! dims = [100.0, 80.0, 40.0]
//! mass = 1.0
//! "#).unwrap();
//!
//! let (report, _) = run_scenario(&scenario, Some(5)).unwrap();
//! assert!(report.unplaced.is_empty());
//! ```

pub mod heuristic;
pub mod logging;
pub mod report;
pub mod scenario;

pub use heuristic::HeuristicPlanner;
pub use report::RunReport;
pub use scenario::{BomEntry, KeepoutEntry, Scenario, ScenarioError};

use log::info;
use sat_layout_core::DesignState;
use sat_layout_optimizer::{OptimizationOutcome, Optimizer, SimplifiedPhysics};
use sat_layout_packing::{LayoutEngine, PackingResult};

/// Layout engine configured from a scenario.
pub fn layout_engine(scenario: &Scenario) -> Result<LayoutEngine, ScenarioError> {
    Ok(
        LayoutEngine::new(scenario.envelope.clone(), scenario.packing.clone())
            .with_keepouts(scenario.keepouts()?),
    )
}

/// Packs the initial layout of a scenario.
pub fn pack_scenario(scenario: &Scenario) -> Result<(DesignState, PackingResult), ScenarioError> {
    let parts = scenario.parts()?;
    let engine = layout_engine(scenario)?;
    info!("Packing {} parts for scenario {}", parts.len(), scenario.name);
    Ok(engine.generate_layout(&parts)?)
}

/// Packs and optimizes a scenario.
///
/// `max_iterations` overrides the scenario's round budget.
pub fn run_scenario(
    scenario: &Scenario,
    max_iterations: Option<u32>,
) -> Result<(RunReport, OptimizationOutcome), ScenarioError> {
    let (initial, packing) = pack_scenario(scenario)?;
    let config = scenario.optimizer_config(max_iterations);
    let planner = HeuristicPlanner::new(config.thresholds);
    let mut optimizer = Optimizer::new(config, planner, SimplifiedPhysics::new())
        .with_engine(layout_engine(scenario)?);

    let initial_penalty = optimizer.evaluator().evaluate(&initial).penalty_score();
    let outcome = optimizer.run(initial);
    let report = RunReport::from_outcome(
        scenario.name.clone(),
        &outcome,
        initial_penalty,
        packing.unplaced_ids(),
    );
    Ok((report, outcome))
}
