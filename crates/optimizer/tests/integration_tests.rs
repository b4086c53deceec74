//! Integration tests for sat-layout-optimizer.

use sat_layout_core::{
    Axis, Component, ConstraintThresholds, DesignState, Envelope, EnvelopeOrigin, Error, Result,
    SimulationResult, Vector3,
};
use sat_layout_optimizer::{
    Action, ExecutorConfig, OperationExecutor, Optimizer, OptimizerConfig, PhysicsSolver,
    RawAction, RollbackReason, RoundDecision, RunStatus, ScriptedPlanner, SimplifiedPhysics,
};

fn envelope() -> Envelope {
    Envelope::with_size(Vector3::new(400.0, 400.0, 400.0), 0.0, EnvelopeOrigin::Corner).unwrap()
}

mod executor_tests {
    use super::*;

    /// Battery and payload flush to -Z, 60 mm apart along X.
    fn battery_and_payload() -> DesignState {
        DesignState::new("state_iter_00_init", envelope())
            .with_component(
                Component::new("battery", Vector3::new(0.0, 0.0, 0.0), Vector3::new(200.0, 150.0, 100.0))
                    .with_mass(5.0),
            )
            .with_component(
                Component::new("payload", Vector3::new(260.0, 0.0, 0.0), Vector3::new(180.0, 180.0, 120.0))
                    .with_mass(8.0),
            )
    }

    fn executor() -> OperationExecutor {
        OperationExecutor::new(ExecutorConfig::default(), 3.0)
    }

    #[test]
    fn test_move_into_free_gap_is_taken_at_full_scale() {
        let mut state = battery_and_payload();
        let scale = executor()
            .adaptive_move(&mut state, "battery", Axis::X, 50.0)
            .unwrap();
        assert_eq!(scale, Some(1.0));
        assert_eq!(state.component("battery").unwrap().position.x, 50.0);
    }

    #[test]
    fn test_move_into_neighbour_is_scaled_down() {
        let mut state = battery_and_payload();
        let scale = executor()
            .adaptive_move(&mut state, "battery", Axis::X, 200.0)
            .unwrap();
        // 200 and 100 collide; 50 leaves 10 mm.
        assert_eq!(scale, Some(0.25));
        assert_eq!(state.component("battery").unwrap().position.x, 50.0);
    }

    #[test]
    fn test_move_rejected_at_every_scale_leaves_state_unchanged() {
        let mut state = battery_and_payload();
        state.component_mut("payload").unwrap().position.x = 201.0;
        let before = state.fingerprint();
        let outcome = executor().apply(
            &state,
            &[Action::Move {
                target: "battery".into(),
                axis: Axis::X,
                delta: 40.0,
            }],
        );
        assert!(!outcome.changed);
        assert_eq!(outcome.state.fingerprint(), before);
    }

    #[test]
    fn test_zero_length_move_is_detected_as_no_op() {
        let state = battery_and_payload();
        for axis in Axis::ALL {
            let outcome = executor().apply(
                &state,
                &[Action::Move {
                    target: "battery".into(),
                    axis,
                    delta: 0.0,
                }],
            );
            assert!(!outcome.changed);
            assert_eq!(outcome.state.fingerprint(), state.fingerprint());
        }
    }
}

mod control_loop_tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how often the solver runs.
    struct CountingSolver {
        inner: SimplifiedPhysics,
        calls: AtomicUsize,
    }

    impl CountingSolver {
        fn new() -> Self {
            Self {
                inner: SimplifiedPhysics::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PhysicsSolver for CountingSolver {
        fn simulate(&self, state: &DesignState) -> Result<SimulationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.simulate(state)
        }
    }

    /// Hot 100 mm box in the middle, a small box left of it and a wall
    /// part of width `wall` at the -X side.
    fn swap_layout(wall: f64) -> DesignState {
        DesignState::new("state_iter_00_init", envelope())
            .with_component(
                Component::new("big", Vector3::new(150.0, 150.0, 150.0), Vector3::new(100.0, 100.0, 100.0))
                    .with_power(20.0),
            )
            .with_component(Component::new(
                "small",
                Vector3::new(60.0, 175.0, 175.0),
                Vector3::new(50.0, 50.0, 50.0),
            ))
            .with_component(Component::new(
                "wall",
                Vector3::new(0.0, 175.0, 175.0),
                Vector3::new(wall, 50.0, 50.0),
            ))
    }

    fn swap_big_and_small() -> ScriptedPlanner {
        ScriptedPlanner::new(vec![vec![
            RawAction::new("SWAP", "big").with_param("other", "small")
        ]])
    }

    #[test]
    fn test_colliding_candidate_is_never_solved() {
        // After the swap `big` spans x 35..135 and overlaps `wall`.
        let config = OptimizerConfig::default().with_max_iterations(1);
        let mut opt = Optimizer::new(config, swap_big_and_small(), CountingSolver::new());
        let outcome = opt.run(swap_layout(50.0));

        assert_eq!(outcome.rounds[0].decision, RoundDecision::Infeasible);
        assert_eq!(outcome.rounds[0].candidate_id, None);
        assert_eq!(opt.evaluator().solver().calls(), 1);
        assert_eq!(outcome.final_state.state_id, "state_iter_00_init");
    }

    #[test]
    fn test_clearance_short_candidate_is_never_solved() {
        // Collision-free, but `big` ends 2 mm from `wall`.
        let config = OptimizerConfig::default().with_max_iterations(1);
        let mut opt = Optimizer::new(config, swap_big_and_small(), CountingSolver::new());
        let outcome = opt.run(swap_layout(33.0));

        assert_eq!(outcome.rounds[0].decision, RoundDecision::Infeasible);
        assert_eq!(opt.evaluator().solver().calls(), 1);
        assert_eq!(outcome.evaluated_states, 1);
    }

    #[test]
    fn test_partial_repair_is_gated_by_default() {
        // `b` and `c` both overlap `a`; moving `b` clears only one pair.
        let initial = DesignState::new("state_iter_00_init", envelope())
            .with_component(Component::new("a", Vector3::new(150.0, 175.0, 175.0), Vector3::new(50.0, 50.0, 50.0)))
            .with_component(Component::new("b", Vector3::new(190.0, 175.0, 175.0), Vector3::new(50.0, 50.0, 50.0)))
            .with_component(Component::new("c", Vector3::new(110.0, 175.0, 175.0), Vector3::new(50.0, 50.0, 50.0)));
        let planner = ScriptedPlanner::new(vec![vec![RawAction::new("MOVE", "b")
            .with_param("axis", "X")
            .with_param("delta", 100)]]);
        let config = OptimizerConfig::default().with_max_iterations(1);
        let mut opt = Optimizer::new(config, planner, CountingSolver::new());
        let outcome = opt.run(initial);

        assert_eq!(outcome.rounds[0].decision, RoundDecision::Infeasible);
        assert_eq!(opt.evaluator().solver().calls(), 1);
        assert_eq!(outcome.final_evaluation.metric("num_collisions"), Some(2.0));
    }

    /// Fails whenever a component wears an "experimental" coating.
    struct PickySolver(SimplifiedPhysics);

    impl PhysicsSolver for PickySolver {
        fn simulate(&self, state: &DesignState) -> Result<SimulationResult> {
            if state.iter().any(|c| c.coating_type == "experimental") {
                return Err(Error::Solver("radiation model diverged".into()));
            }
            self.0.simulate(state)
        }
    }

    fn hot_radio() -> DesignState {
        DesignState::new("state_iter_00_init", envelope())
            .with_component(
                Component::new("radio", Vector3::new(150.0, 150.0, 150.0), Vector3::new(100.0, 100.0, 100.0))
                    .with_power(20.0)
                    .with_mass(1.0),
            )
    }

    #[test]
    fn test_solver_failure_rolls_back_to_pool_minimum() {
        let planner = ScriptedPlanner::new(vec![vec![RawAction::new("MODIFY_COATING", "radio")
            .with_param("emissivity", 0.9)
            .with_param("coating_type", "experimental")]]);
        let config = OptimizerConfig::default().with_max_iterations(3);
        let mut opt = Optimizer::new(config, planner, PickySolver(SimplifiedPhysics::new()));
        let outcome = opt.run(hot_radio());

        // The failed state drops the thermal violation, so it is accepted
        // first and abandoned on the next round.
        assert_eq!(outcome.rounds[0].decision, RoundDecision::Accepted);
        assert_eq!(outcome.rounds[1].decision, RoundDecision::RolledBack);
        assert_eq!(outcome.rollback_count, 1);

        let event = &outcome.rollback_events[0];
        assert_eq!(event.reason, RollbackReason::SolverFailure);
        assert_eq!(event.from_state, "state_iter_01_a");
        assert_eq!(event.to_state, "state_iter_00_init");
        assert_eq!(event.penalty_before, 9999.0);

        let pool_min = outcome
            .rounds
            .iter()
            .filter_map(|r| r.candidate_penalty)
            .fold(event.penalty_after, f64::min);
        assert_eq!(event.penalty_after, pool_min);
        assert_eq!(outcome.final_state.state_id, "state_iter_00_init");
        assert_eq!(outcome.final_evaluation.penalty_score(), event.penalty_after);
    }

    #[test]
    fn test_zero_move_never_calls_solver() {
        let planner = ScriptedPlanner::new(vec![vec![RawAction::new("MOVE", "radio")
            .with_param("axis", "Z")
            .with_param("delta", 0)]]);
        let config = OptimizerConfig::default().with_max_iterations(1);
        let mut opt = Optimizer::new(config, planner, SimplifiedPhysics::new());
        let outcome = opt.run(hot_radio());
        assert_eq!(outcome.rounds[0].decision, RoundDecision::NoOp);
        assert_eq!(outcome.evaluated_states, 1);
    }

    #[test]
    fn test_malformed_and_unknown_actions_do_not_stop_the_run() {
        let planner = ScriptedPlanner::new(vec![
            vec![
                RawAction::new("TELEPORT", "radio"),
                RawAction::new("MOVE", "radio").with_param("delta", "lots"),
                RawAction::new("MOVE", "ghost").with_param("delta", 5),
            ],
            vec![RawAction::new("ADD_HEATSINK", "radio")
                .with_param("face", "+Z")
                .with_param("conductivity", 400)
                .with_param("thickness", 10)],
        ]);
        let config = OptimizerConfig::default().with_max_iterations(4);
        let mut opt = Optimizer::new(config, planner, SimplifiedPhysics::new());
        let outcome = opt.run(hot_radio());
        assert_eq!(outcome.rounds[0].decision, RoundDecision::NoOp);
        assert_eq!(outcome.rounds[1].decision, RoundDecision::Accepted);
        assert!(outcome.final_state.component("radio").unwrap().heatsink.is_some());
    }

    #[test]
    fn test_accepted_states_never_gain_violations() {
        let initial = DesignState::new("state_iter_00_init", envelope())
            .with_component(
                Component::new("tank", Vector3::new(280.0, 175.0, 175.0), Vector3::new(60.0, 50.0, 50.0))
                    .with_mass(12.0),
            )
            .with_component(
                Component::new("radio", Vector3::new(100.0, 175.0, 175.0), Vector3::new(60.0, 50.0, 50.0))
                    .with_power(12.0)
                    .with_mass(1.0),
            )
            .with_component(
                Component::new("obc", Vector3::new(162.0, 175.0, 175.0), Vector3::new(40.0, 50.0, 50.0))
                    .with_mass(1.0),
            );
        let planner = ScriptedPlanner::new(vec![
            vec![RawAction::new("MOVE", "obc").with_param("axis", "Y").with_param("delta", 80)],
            vec![RawAction::new("MOVE", "tank").with_param("axis", "X").with_param("delta", -60)],
            vec![RawAction::new("ADD_BRACKET", "radio").with_param("height", 150)],
            vec![RawAction::new("COATING_CHANGE", "radio").with_param("emissivity", 0.95)],
            vec![RawAction::new("MOVE", "tank").with_param("axis", "X").with_param("delta", -80)],
            vec![RawAction::new("SWAP", "tank").with_param("other", "obc")],
        ]);
        let config = OptimizerConfig::default().with_max_iterations(8);
        let mut opt = Optimizer::new(config, planner, SimplifiedPhysics::new());
        let mut previous = opt.evaluator().evaluate(&initial).violation_count();
        let outcome = opt.run_with_progress(initial, |_| {});

        for record in &outcome.rounds {
            if record.decision == RoundDecision::Accepted {
                assert!(
                    record.violation_count <= previous,
                    "round {} accepted {} violations over {}",
                    record.iteration,
                    record.violation_count,
                    previous
                );
            }
            previous = record.violation_count;
        }
    }

    #[test]
    fn test_plateau_rescue_moves_heavy_part_toward_centre() {
        let initial = DesignState::new("state_iter_00_init", envelope())
            .with_component(
                Component::new("tank", Vector3::new(300.0, 175.0, 175.0), Vector3::new(50.0, 50.0, 50.0))
                    .with_mass(10.0),
            )
            .with_component(
                Component::new("gyro", Vector3::new(100.0, 175.0, 175.0), Vector3::new(50.0, 50.0, 50.0))
                    .with_mass(0.5),
            );
        let config = OptimizerConfig::default()
            .with_max_iterations(6)
            .with_thresholds(ConstraintThresholds::new().with_max_cg_offset(20.0));
        let mut opt = Optimizer::new(config, ScriptedPlanner::default(), SimplifiedPhysics::new());
        let start_cg = opt.evaluator().evaluate(&initial).metric("cg_offset").unwrap();
        let outcome = opt.run(initial);

        let rescued: Vec<_> = outcome
            .rounds
            .iter()
            .filter(|r| r.decision == RoundDecision::Rescued)
            .collect();
        assert_eq!(rescued.len(), 1);
        assert_eq!(rescued[0].iteration, 4);
        assert_eq!(rescued[0].state_id, "state_iter_04_rescue");
        assert_eq!(outcome.status, RunStatus::Exhausted);
        assert!(outcome.final_evaluation.metric("cg_offset").unwrap() < start_cg - 0.2);
        assert!(outcome.final_state.component("tank").unwrap().position.x < 300.0);
    }
}
