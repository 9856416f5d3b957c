//! Property-based tests for the planners.
//!
//! Checked over random seeds, budgets, horizons and start states:
//! - every expanded node's visit count equals the sum of its edge visits
//! - returned actions are legal at the planned state
//! - identical seeds give identical searches
//! - a zero horizon answers 0 without sampling
//! - re-rooting keeps the promoted subtree's visits
//! - edge values are the exact mean of their backed-up returns

use mcplan_core::{Belief, GenerativeModel};
use mcplan_mcts::{
    environments::{CornerProblem, TigerProblem},
    ActionNode, DecisionNode, Mcts, MctsConfig, NodeId, Phase, Pomcp, PomcpConfig, Tree,
};
use proptest::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hash::Hash;

/// Counter that offers `(state % 3) + 1` actions and ends at 12.
struct Ladder;

impl GenerativeModel for Ladder {
    type State = u32;

    fn num_actions(&self, state: &u32) -> usize {
        (*state % 3) as usize + 1
    }

    fn sample_transition<R: Rng + ?Sized>(&self, state: &u32, action: usize, rng: &mut R) -> (u32, f64) {
        let step = action as u32 + rng.gen_range(0..2);
        ((state + step).min(12), action as f64 - 0.5)
    }

    fn is_terminal(&self, state: &u32) -> bool {
        *state >= 12
    }

    fn discount(&self) -> f64 {
        0.95
    }
}

// =============================================================================
// Strategies for generating test inputs
// =============================================================================

fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Episodes per call (kept small for fast tests)
fn arb_iterations() -> impl Strategy<Value = u32> {
    1u32..300
}

fn arb_horizon() -> impl Strategy<Value = u32> {
    1u32..12
}

fn arb_corner_cell() -> impl Strategy<Value = usize> {
    0usize..16
}

/// Assert visit accounting on every node reachable from the root.
fn check_visit_accounting<K: Eq + Hash, D>(tree: &Tree<K, D>) -> Result<(), TestCaseError> {
    let mut stack: Vec<NodeId> = vec![tree.root_id()];
    while let Some(id) = stack.pop() {
        let node: &DecisionNode<K, D> = tree.get(id);
        prop_assert_eq!(u64::from(node.visit_count), node.action_visits());
        for edge in node.actions() {
            stack.extend(edge.children().map(|(_, child)| child));
        }
    }
    Ok(())
}

fn corner_planner(seed: u64, iterations: u32) -> Mcts<CornerProblem, ChaCha8Rng> {
    Mcts::new(
        CornerProblem::default(),
        MctsConfig::default().with_iterations(iterations).with_exploration(5.0),
        ChaCha8Rng::seed_from_u64(seed),
    )
}

// =============================================================================
// Visit accounting
// =============================================================================

proptest! {
    #[test]
    fn prop_mcts_visits_add_up(
        seed in arb_seed(),
        iterations in arb_iterations(),
        horizon in arb_horizon(),
        cell in arb_corner_cell()
    ) {
        let mut mcts = corner_planner(seed, iterations);
        mcts.plan(&cell, horizon);

        prop_assert_eq!(mcts.tree().root().visit_count, iterations);
        check_visit_accounting(mcts.tree())?;
    }

    #[test]
    fn prop_pomcp_visits_add_up(
        seed in arb_seed(),
        iterations in arb_iterations(),
        horizon in 1u32..6,
        left in 0.0f64..=1.0
    ) {
        let mut pomcp = Pomcp::new(
            TigerProblem::new(),
            PomcpConfig::default()
                .with_iterations(iterations)
                .with_belief_particles(50),
            ChaCha8Rng::seed_from_u64(seed),
        );
        let belief = Belief::new(vec![left, 1.0 - left]).unwrap();
        pomcp.plan(&belief, horizon);

        prop_assert_eq!(pomcp.tree().root().visit_count, iterations);
        check_visit_accounting(pomcp.tree())?;
    }

    /// Below the root, each node holds one particle per episode that reached it.
    #[test]
    fn prop_pomcp_particles_match_arrivals(
        seed in arb_seed(),
        iterations in arb_iterations(),
        horizon in 1u32..5
    ) {
        let mut pomcp = Pomcp::new(
            TigerProblem::new(),
            PomcpConfig::default().with_iterations(iterations).with_belief_particles(20),
            ChaCha8Rng::seed_from_u64(seed),
        );
        pomcp.plan(&Belief::uniform(2).unwrap(), horizon);

        let tree = pomcp.tree();
        let mut stack = vec![tree.root_id()];
        while let Some(id) = stack.pop() {
            for edge in tree.get(id).actions() {
                let arrived: usize = edge
                    .children()
                    .map(|(_, child)| tree.get(child).data.len())
                    .sum();
                prop_assert_eq!(arrived as u32, edge.visit_count);
                stack.extend(edge.children().map(|(_, child)| child));
            }
        }
    }
}

// =============================================================================
// Legality, determinism and the zero horizon
// =============================================================================

proptest! {
    #[test]
    fn prop_action_is_legal(
        seed in arb_seed(),
        iterations in arb_iterations(),
        horizon in arb_horizon(),
        start in 0u32..12
    ) {
        let mut mcts = Mcts::new(
            Ladder,
            MctsConfig::default().with_iterations(iterations),
            ChaCha8Rng::seed_from_u64(seed),
        );
        let action = mcts.plan(&start, horizon);

        prop_assert!(
            action < Ladder.num_actions(&start),
            "action {} illegal at state {}", action, start
        );
        prop_assert_eq!(mcts.tree().root().num_actions(), Ladder.num_actions(&start));
    }

    #[test]
    fn prop_deterministic(
        seed in arb_seed(),
        iterations in arb_iterations(),
        horizon in arb_horizon(),
        cell in arb_corner_cell()
    ) {
        let run = || {
            let mut mcts = corner_planner(seed, iterations);
            let action = mcts.plan(&cell, horizon);
            let values: Vec<f64> = mcts.tree().root().actions().iter().map(|e| e.value).collect();
            (action, values, mcts.tree().stats())
        };

        let (action1, values1, stats1) = run();
        let (action2, values2, stats2) = run();
        prop_assert_eq!(action1, action2);
        prop_assert_eq!(values1, values2);
        prop_assert_eq!(stats1, stats2);
    }

    #[test]
    fn prop_zero_horizon_answers_zero(
        seed in arb_seed(),
        iterations in arb_iterations(),
        cell in arb_corner_cell()
    ) {
        let mut mcts = corner_planner(seed, iterations);
        prop_assert_eq!(mcts.plan(&cell, 0), 0);
        prop_assert_eq!(mcts.phase(), Phase::Answered);
        prop_assert_eq!(mcts.tree().root().visit_count, 0);
    }

    #[test]
    fn prop_best_action_has_highest_value(
        seed in arb_seed(),
        iterations in arb_iterations(),
        horizon in arb_horizon(),
        cell in arb_corner_cell()
    ) {
        let mut mcts = corner_planner(seed, iterations);
        let action = mcts.plan(&cell, horizon);

        let actions = mcts.tree().root().actions();
        for (i, edge) in actions.iter().enumerate() {
            prop_assert!(edge.value <= actions[action].value);
            if edge.value == actions[action].value {
                prop_assert!(i >= action, "tie must go to the first action");
            }
        }
    }
}

// =============================================================================
// Re-rooting
// =============================================================================

proptest! {
    #[test]
    fn prop_reroot_keeps_visits(
        seed in arb_seed(),
        iterations in 50u32..300,
        more in 1u32..100,
        cell in 1usize..15
    ) {
        let mut mcts = corner_planner(seed, iterations);
        let action = mcts.plan(&cell, 6);

        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);
        let (next, _) = mcts.model().sample_transition(&cell, action, &mut rng);
        let kept = mcts
            .tree()
            .child(mcts.tree().root_id(), action, &mcplan_mcts::state_key(&next))
            .map(|id| mcts.tree().get(id).visit_count);

        mcts.set_iterations(more);
        mcts.plan_from(action, &next, 5);

        let expected = kept.unwrap_or(0) + more;
        prop_assert_eq!(mcts.tree().root().visit_count, expected);
        check_visit_accounting(mcts.tree())?;
    }

    #[test]
    fn prop_pomcp_reroot_never_panics(
        seed in arb_seed(),
        iterations in 0u32..100,
        action in 0usize..3,
        observation in 0usize..2
    ) {
        let mut pomcp = Pomcp::new(
            TigerProblem::new(),
            PomcpConfig::default().with_iterations(iterations).with_belief_particles(30),
            ChaCha8Rng::seed_from_u64(seed),
        );
        pomcp.plan(&Belief::uniform(2).unwrap(), 3);
        let next = pomcp.plan_from(action, observation, 2);

        prop_assert!(next < 3);
        prop_assert!(!pomcp.root_particles().is_empty());
        prop_assert!(pomcp.root_particles().iter().all(|s| *s < 2));
    }
}

// =============================================================================
// Running mean
// =============================================================================

proptest! {
    #[test]
    fn prop_edge_value_is_mean_of_returns(
        mut returns in prop::collection::vec(-100.0f64..100.0, 1..200)
    ) {
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;

        let mut forward: ActionNode<u64> = ActionNode::new();
        for r in &returns {
            forward.update(*r);
        }
        returns.reverse();
        let mut backward: ActionNode<u64> = ActionNode::new();
        for r in &returns {
            backward.update(*r);
        }

        prop_assert_eq!(forward.visit_count as usize, returns.len());
        prop_assert!((forward.value - mean).abs() < 1e-9);
        prop_assert!((backward.value - mean).abs() < 1e-9);
    }
}
