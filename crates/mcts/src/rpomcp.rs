//! Belief-reward POMCP.
//!
//! A variant of POMCP for problems where the goal is to learn the hidden
//! state rather than to collect model rewards. The model's rewards are
//! ignored; a belief node's immediate reward is instead a knowledge measure
//! of its particle distribution (see [`BeliefReward`]).
//!
//! Because that reward changes as particles accumulate, a node's value is
//! kept in the node itself and the difference made by each update is
//! propagated to the parent edge, so the edge's running mean stays
//! consistent with the node's latest estimate.
//!
//! A node's visit count includes episodes that reached it as a leaf, so it
//! can exceed the sum of its action visits.

use crate::{
    config::{BeliefReward, RpomcpConfig},
    node::{DecisionNode, NodeId},
    particles::ParticleCounts,
    search::Phase,
    selection::{best_by_value, select_ucb1},
    tree::Tree,
};
use mcplan_core::{Belief, FiniteStates, GenerativeModel, ObservationModel};
use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash};
use tracing::{trace, warn};

#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    count: u32,
    entropy_term: f64,
}

/// Particle tracking and value bookkeeping of one belief node.
#[derive(Clone, Debug)]
pub struct BeliefStats<S> {
    counts: HashMap<S, Tally, BuildHasherDefault<DefaultHasher>>,
    total: u32,
    most_common: Option<S>,
    knowledge: f64,
    /// Discounted action value plus knowledge.
    pub value: f64,
    /// Aggregated value of the node's actions.
    pub actions_value: f64,
    /// Action currently backing `actions_value` in max mode.
    pub best_action: usize,
    max_mode: bool,
}

impl<S> Default for BeliefStats<S> {
    fn default() -> Self {
        Self {
            counts: HashMap::default(),
            total: 0,
            most_common: None,
            knowledge: 0.0,
            value: 0.0,
            actions_value: 0.0,
            best_action: 0,
            max_mode: false,
        }
    }
}

impl<S: Clone + Eq + Hash> BeliefStats<S> {
    /// Statistics with no particles recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one particle and refresh the knowledge measure.
    pub fn record(&mut self, state: S, measure: BeliefReward) {
        self.total += 1;
        match measure {
            BeliefReward::Entropy => {
                // Only the received state's term changes; the others are
                // left as computed against an older total.
                let tally = self.counts.entry(state).or_default();
                tally.count += 1;
                let p = f64::from(tally.count) / f64::from(self.total);
                self.knowledge -= tally.entropy_term;
                tally.entropy_term = p * p.ln();
                self.knowledge += tally.entropy_term;
            }
            BeliefReward::MaxBelief => {
                let tally = self.counts.entry(state.clone()).or_default();
                tally.count += 1;
                let count = tally.count;
                let best = self
                    .most_common
                    .as_ref()
                    .and_then(|s| self.counts.get(s))
                    .map_or(0, |t| t.count);
                if count > best {
                    self.most_common = Some(state);
                }
                self.knowledge = f64::from(count.max(best)) / f64::from(self.total);
            }
        }
    }

    /// Current knowledge measure of the particle distribution.
    #[inline]
    pub fn knowledge(&self) -> f64 {
        self.knowledge
    }

    /// Number of particles recorded.
    #[inline]
    pub fn total(&self) -> u32 {
        self.total
    }

    /// How many recorded particles equal `state`.
    pub fn count(&self, state: &S) -> u32 {
        self.counts.get(state).map_or(0, |t| t.count)
    }

    /// Move the recorded particles out as a sampling distribution.
    fn take_particles(&mut self) -> ParticleCounts<S> {
        let counts = std::mem::take(&mut self.counts);
        self.total = 0;
        self.most_common = None;
        ParticleCounts::from_counts(counts.into_iter().map(|(s, t)| (s, t.count)).collect())
    }
}

/// Belief tree used by [`Rpomcp`].
pub type KnowledgeTree<M> =
    Tree<<M as ObservationModel>::Observation, BeliefStats<<M as GenerativeModel>::State>>;

/// Online planner maximizing knowledge of the hidden state.
///
/// The root belief is kept apart from the tree as aggregated particles and
/// sampled proportionally to their counts.
pub struct Rpomcp<M: ObservationModel, R: Rng> {
    model: M,
    config: RpomcpConfig,
    rng: R,
    tree: KnowledgeTree<M>,
    head: ParticleCounts<M::State>,
    horizon: u32,
    phase: Phase,
}

impl<M, R> Rpomcp<M, R>
where
    M: ObservationModel,
    M::State: Eq + Hash,
    R: Rng,
{
    /// Create a planner.
    pub fn new(model: M, config: RpomcpConfig, rng: R) -> Self {
        Self {
            model,
            config,
            rng,
            tree: Tree::new(DecisionNode::new(BeliefStats::new())),
            head: ParticleCounts::default(),
            horizon: 0,
            phase: Phase::Empty,
        }
    }

    /// Plan from explicit particles.
    pub fn plan_with_particles<I>(&mut self, particles: I, horizon: u32) -> usize
    where
        I: IntoIterator<Item = M::State>,
    {
        self.head = ParticleCounts::from_states(particles);
        self.tree.reset(DecisionNode::new(BeliefStats::new()));
        self.phase = Phase::Rooted;
        self.run(horizon)
    }

    fn run(&mut self, horizon: u32) -> usize {
        let root = self.tree.root_id();
        let first_particle = self.head.iter().next().map(|(s, _)| s.clone());
        match first_particle {
            Some(first) => self.expand(root, &first),
            None if horizon > 0 => {
                warn!("root belief holds no particles, returning action 0");
                self.phase = Phase::Answered;
                return 0;
            }
            None => {}
        }
        if horizon == 0 {
            self.phase = Phase::Answered;
            return 0;
        }

        self.horizon = horizon;
        self.phase = Phase::Searching;
        for _ in 0..self.config.iterations {
            let state = self
                .head
                .sample(&mut self.rng)
                .cloned()
                .expect("BUG: head particles emptied during search");
            self.simulate(root, state, 0);
        }

        let root_node = self.tree.root_mut();
        let action = best_by_value(root_node.actions());
        if let Some(value) = root_node.action(action).map(|edge| edge.value) {
            root_node.data.value = value;
        }
        self.phase = Phase::Answered;
        trace!(
            action,
            value = self.tree.root().data.value,
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

    /// One episode from `id`. Returns how much this node's contribution to
    /// its parent edge's mean changed, or 0 at the root.
    fn simulate(&mut self, id: NodeId, state: M::State, depth: u32) -> f64 {
        self.expand(id, &state);
        let node = self.tree.get_mut(id);
        if node.num_actions() == 0 {
            return 0.0;
        }
        node.visit_count += 1;
        let action = select_ucb1(node.actions(), node.visit_count, self.config.exploration);

        let (next, observation, _) =
            self.model
                .sample_transition_observation(&state, action, &mut self.rng);
        let (child, created) = self.tree.child_or_insert_with(id, action, observation, || {
            DecisionNode::new(BeliefStats::new())
        });
        let measure = self.config.belief_reward;
        self.tree.get_mut(child).data.record(next.clone(), measure);

        let ret = if !created && depth + 1 < self.horizon && !self.model.is_terminal(&next) {
            self.simulate(child, next, depth + 1)
        } else {
            let leaf = self.tree.get_mut(child);
            leaf.visit_count += 1;
            if depth + 1 >= self.horizon {
                leaf.data.knowledge()
            } else {
                0.0
            }
        };

        let node = self.tree.get_mut(id);
        node.action_mut(action).update(ret);
        if depth == 0 {
            return 0.0;
        }

        let edge_value = node.actions()[action].value;
        let best = best_by_value(node.actions());
        let best_value = node.actions()[best].value;
        let visits = node.visit_count;
        let stats = &mut node.data;

        if visits >= self.config.aggregation.max_from() {
            if !stats.max_mode {
                stats.max_mode = true;
                stats.actions_value = f64::INFINITY;
                stats.best_action = action;
            }
            if edge_value >= stats.actions_value {
                stats.actions_value = edge_value;
                stats.best_action = action;
            } else if action == stats.best_action {
                stats.actions_value = best_value;
                stats.best_action = best;
            }
        } else {
            stats.actions_value += (ret - stats.actions_value) / f64::from(visits);
        }

        let old = stats.value;
        stats.value = self.model.discount() * stats.actions_value + stats.knowledge();
        f64::from(visits - 1) * (stats.value - old) + stats.value
    }

    /// Most common state among the root particles.
    pub fn most_likely_state(&self) -> Option<&M::State> {
        self.head.most_common()
    }

    /// Aggregated particles the current root samples from.
    pub fn root_particles(&self) -> &ParticleCounts<M::State> {
        &self.head
    }

    /// Value of the current root after the last search.
    pub fn root_value(&self) -> f64 {
        self.tree.root().data.value
    }

    /// The search tree as left by the last call.
    pub fn tree(&self) -> &KnowledgeTree<M> {
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

    /// Particles drawn when a belief vector is converted.
    pub fn belief_particles(&self) -> usize {
        self.config.belief_particles
    }

    /// Change how many particles a belief vector is converted into.
    pub fn set_belief_particles(&mut self, belief_particles: usize) {
        self.config.belief_particles = belief_particles;
    }

    /// The model being planned in.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Current configuration.
    pub fn config(&self) -> &RpomcpConfig {
        &self.config
    }

    /// Where the planner is in its lifecycle.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl<M, R> Rpomcp<M, R>
where
    M: ObservationModel + FiniteStates,
    M::State: Eq + Hash,
    R: Rng,
{
    /// Plan from a probability vector over the model's states.
    ///
    /// # Panics
    /// Panics if `belief` does not have one entry per model state.
    pub fn plan(&mut self, belief: &Belief, horizon: u32) -> usize {
        assert_eq!(
            belief.len(),
            self.model.num_states(),
            "belief has {} entries but the model has {} states",
            belief.len(),
            self.model.num_states()
        );
        let samples = belief.sample_n(self.config.belief_particles, &mut self.rng);
        let states: Vec<M::State> = samples.into_iter().map(|i| self.model.state(i)).collect();
        self.plan_with_particles(states, horizon)
    }

    /// Re-root on the history extended by `action` and `observation`, then plan.
    ///
    /// The particles recorded at the new root become the root belief. When
    /// the history was never sampled, or holds no particles, planning
    /// restarts from a uniform belief.
    ///
    /// # Panics
    /// Panics if `action` is out of range for the current root.
    pub fn plan_from(&mut self, action: usize, observation: M::Observation, horizon: u32) -> usize {
        let root = self.tree.root();
        if root.is_expanded() {
            assert!(
                action < root.num_actions(),
                "action {action} out of range: root has {} actions",
                root.num_actions()
            );
        }

        if !self.tree.promote(action, &observation) {
            warn!(action, "observation never sampled, restarting from a uniform belief");
            return self.plan_uniform(horizon);
        }
        self.head = self.tree.root_mut().data.take_particles();
        if self.head.is_empty() {
            warn!(action, "new root holds no particles, restarting from a uniform belief");
            return self.plan_uniform(horizon);
        }

        self.phase = Phase::Rooted;
        self.run(horizon)
    }

    fn plan_uniform(&mut self, horizon: u32) -> usize {
        let belief = Belief::uniform(self.model.num_states())
            .expect("BUG: model reports no states");
        self.plan(&belief, horizon)
    }
}
