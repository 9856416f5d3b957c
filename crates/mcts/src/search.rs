//! UCT planner for fully observable problems.
//!
//! Each episode walks from the root choosing edges with UCB1, samples a
//! transition from the model, and either descends into the resulting state
//! or, on the first visit to it, estimates it with a rollout. Returns are
//! discounted back up the path and averaged into the edges.

use crate::{
    config::MctsConfig,
    node::{DecisionNode, NodeId},
    rollout::{rollout, RolloutPolicy, UniformRollout},
    selection::{best_by_value, select_ucb1},
    tree::Tree,
};
use mcplan_core::GenerativeModel;
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::{debug, trace};

/// Where a planner is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, never asked for an action.
    #[default]
    Empty,
    /// A root is installed and the episode loop is about to run.
    Rooted,
    /// Running episodes.
    Searching,
    /// An action has been returned; the tree is kept for re-rooting.
    Answered,
}

/// Key under which a successor state is stored below an edge.
///
/// Two states that hash equal share a node.
pub fn state_key<S: Hash + ?Sized>(state: &S) -> u64 {
    let mut hasher = DefaultHasher::new();
    state.hash(&mut hasher);
    hasher.finish()
}

/// Online UCT planner over a generative model.
///
/// Generic over:
/// - `M`: the model being planned in
/// - `R`: the random number generator
/// - `P`: the rollout policy used past the tree frontier
pub struct Mcts<M: GenerativeModel, R: Rng, P = UniformRollout> {
    model: M,
    config: MctsConfig,
    rollout: P,
    rng: R,
    tree: Tree<u64, ()>,
    horizon: u32,
    phase: Phase,
}

impl<M, R> Mcts<M, R, UniformRollout>
where
    M: GenerativeModel,
    M::State: Hash,
    R: Rng,
{
    /// Create a planner that rolls out uniformly at random.
    pub fn new(model: M, config: MctsConfig, rng: R) -> Self {
        Self::with_rollout(model, config, UniformRollout, rng)
    }
}

impl<M, R, P> Mcts<M, R, P>
where
    M: GenerativeModel,
    M::State: Hash,
    R: Rng,
    P: RolloutPolicy<M>,
{
    /// Create a planner with a custom rollout policy.
    pub fn with_rollout(model: M, config: MctsConfig, rollout: P, rng: R) -> Self {
        Self {
            model,
            config,
            rollout,
            rng,
            tree: Tree::new(DecisionNode::new(())),
            horizon: 0,
            phase: Phase::Empty,
        }
    }

    /// Plan from `state` with a fresh tree and return the best action.
    ///
    /// A horizon of zero returns action 0 without sampling.
    pub fn plan(&mut self, state: &M::State, horizon: u32) -> usize {
        self.tree.reset(DecisionNode::new(()));
        self.phase = Phase::Rooted;
        self.run(state, horizon)
    }

    /// Re-root on the subtree reached by `action` and `next_state`, then plan.
    ///
    /// Statistics gathered for that subtree during earlier calls are kept.
    /// If it was never explored the tree is rebuilt from `next_state`.
    ///
    /// # Panics
    /// Panics if `action` is out of range for the current root.
    pub fn plan_from(&mut self, action: usize, next_state: &M::State, horizon: u32) -> usize {
        let root = self.tree.root();
        if root.is_expanded() {
            assert!(
                action < root.num_actions(),
                "action {action} out of range: root has {} actions",
                root.num_actions()
            );
        }

        if !self.tree.promote(action, &state_key(next_state)) {
            debug!(action, "successor never sampled, planning from scratch");
            return self.plan(next_state, horizon);
        }

        self.phase = Phase::Rooted;
        self.run(next_state, horizon)
    }

    fn run(&mut self, state: &M::State, horizon: u32) -> usize {
        let root = self.tree.root_id();
        self.expand(root, state);

        if horizon == 0 {
            self.phase = Phase::Answered;
            return 0;
        }

        self.horizon = horizon;
        self.phase = Phase::Searching;
        for _ in 0..self.config.iterations {
            self.simulate(root, state.clone(), 0);
        }

        let action = best_by_value(self.tree.root().actions());
        self.phase = Phase::Answered;
        trace!(
            action,
            value = self.root_value(),
            iterations = self.config.iterations,
            nodes = self.tree.len(),
            "search finished"
        );
        action
    }

    fn expand(&mut self, id: NodeId, state: &M::State) {
        let node = self.tree.get_mut(id);
        if !node.is_expanded() {
            node.expand(self.model.num_actions(state));
        }
    }

    /// One episode from `id`, which holds `state` at `depth`. Returns the
    /// discounted return observed from this node.
    fn simulate(&mut self, id: NodeId, state: M::State, depth: u32) -> f64 {
        self.expand(id, &state);
        let node = self.tree.get_mut(id);
        if node.num_actions() == 0 {
            return 0.0;
        }
        node.visit_count += 1;
        let action = select_ucb1(node.actions(), node.visit_count, self.config.exploration);

        let (next, mut ret) = self.model.sample_transition(&state, action, &mut self.rng);
        let (child, created) =
            self.tree
                .child_or_insert_with(id, action, state_key(&next), || DecisionNode::new(()));

        if depth + 1 < self.horizon && !self.model.is_terminal(&next) {
            let future = if created {
                let steps = self.horizon - depth - 1;
                rollout(&self.model, &self.rollout, next, steps, &mut self.rng)
            } else {
                self.simulate(child, next, depth + 1)
            };
            ret += self.model.discount() * future;
        }

        self.tree.get_mut(id).action_mut(action).update(ret);
        ret
    }

    /// Value of the best root action, or 0 if the root has none.
    pub fn root_value(&self) -> f64 {
        let actions = self.tree.root().actions();
        actions
            .get(best_by_value(actions))
            .map_or(0.0, |edge| edge.value)
    }

    /// The search tree as left by the last call.
    pub fn tree(&self) -> &Tree<u64, ()> {
        &self.tree
    }

    /// Episodes run per planning call.
    pub fn iterations(&self) -> u32 {
        self.config.iterations
    }

    /// Change the number of episodes per planning call.
    pub fn set_iterations(&mut self, iterations: u32) {
        self.config.iterations = iterations;
    }

    /// UCB1 exploration constant.
    pub fn exploration(&self) -> f64 {
        self.config.exploration
    }

    /// Change the UCB1 exploration constant.
    pub fn set_exploration(&mut self, exploration: f64) {
        self.config.exploration = exploration;
    }

    /// The model being planned in.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Current configuration.
    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Where the planner is in its lifecycle.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}
