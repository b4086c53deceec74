//! Parallel what-if evaluation.
//!
//! Evaluates independent design alternatives on the rayon pool. Each worker
//! gets its own deep copy of its state; nothing is shared with the control
//! loop and no state pool is involved.

use crate::evaluator::Evaluator;
use crate::physics::PhysicsSolver;
use log::debug;
use rayon::prelude::*;
use sat_layout_core::{DesignState, EvaluationResult};
use std::sync::Arc;

/// Evaluates batches of design states in parallel.
#[derive(Debug, Clone)]
pub struct WhatIfEvaluator<S> {
    evaluator: Evaluator<S>,
}

impl<S: PhysicsSolver> WhatIfEvaluator<S> {
    /// Wraps an evaluator.
    pub fn new(evaluator: Evaluator<S>) -> Self {
        Self { evaluator }
    }

    /// Evaluates every state; results are in input order.
    pub fn evaluate_all(&self, states: &[DesignState]) -> Vec<EvaluationResult> {
        debug!("Evaluating {} what-if states", states.len());
        states
            .par_iter()
            .map(|state| self.evaluator.evaluate(&deep_copy(state)))
            .collect()
    }

    /// Evaluates every state and returns the index of the lowest penalty.
    pub fn best_of(&self, states: &[DesignState]) -> Option<(usize, EvaluationResult)> {
        self.evaluate_all(states)
            .into_iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.penalty_score().total_cmp(&b.penalty_score()))
    }
}

/// Copy of `state` that shares no component with the original.
fn deep_copy(state: &DesignState) -> DesignState {
    let mut copy = state.clone();
    copy.components = state
        .components
        .iter()
        .map(|c| Arc::new(c.as_ref().clone()))
        .collect();
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PenaltyWeights;
    use crate::physics::SimplifiedPhysics;
    use nalgebra::Vector3;
    use sat_layout_core::{Component, ConstraintThresholds, Envelope, EnvelopeOrigin};

    fn state(id: &str, gap: f64) -> DesignState {
        let env =
            Envelope::with_size(Vector3::new(400.0, 400.0, 400.0), 0.0, EnvelopeOrigin::Corner)
                .unwrap();
        DesignState::new(id, env)
            .with_component(Component::new(
                "a",
                Vector3::new(100.0, 175.0, 175.0),
                Vector3::new(50.0, 50.0, 50.0),
            ))
            .with_component(Component::new(
                "b",
                Vector3::new(150.0 + gap, 175.0, 175.0),
                Vector3::new(50.0, 50.0, 50.0),
            ))
    }

    #[test]
    fn test_results_keep_input_order() {
        let states: Vec<DesignState> = (0..8)
            .map(|i| state(&format!("s{}", i), i as f64))
            .collect();
        let what_if = WhatIfEvaluator::new(Evaluator::new(
            SimplifiedPhysics::new(),
            ConstraintThresholds::default(),
            PenaltyWeights::default(),
        ));
        let results = what_if.evaluate_all(&states);
        let ids: Vec<&str> = results.iter().map(|r| r.state_id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7"]);

        let (best, eval) = what_if.best_of(&states).unwrap();
        assert!(best >= 3);
        assert!(eval.is_feasible());
    }

    #[test]
    fn test_deep_copy_shares_nothing() {
        let s = state("s", 10.0);
        let copy = deep_copy(&s);
        assert!(!Arc::ptr_eq(&s.components[0], &copy.components[0]));
        assert_eq!(copy, s);
    }
}
