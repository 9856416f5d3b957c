//! POMCP: UCT over histories with a particle belief at every node.
//!
//! Below each action edge, children are keyed by the observation received.
//! Every state sampled through a (node, action, observation) path is kept in
//! the child's particle set, so after the agent acts and observes, the
//! matching child already holds an approximation of the posterior belief and
//! can become the next root.

use crate::{
    config::PomcpConfig,
    node::{DecisionNode, NodeId},
    particles::ParticleSet,
    rollout::{rollout, RolloutPolicy, UniformRollout},
    search::Phase,
    selection::{best_by_value, select_ucb1},
    tree::Tree,
};
use mcplan_core::{Belief, FiniteStates, GenerativeModel, ObservationModel};
use rand::Rng;
use tracing::{trace, warn};

/// Belief tree used by [`Pomcp`].
pub type BeliefTree<M> =
    Tree<<M as ObservationModel>::Observation, ParticleSet<<M as GenerativeModel>::State>>;

/// Online POMCP planner.
pub struct Pomcp<M: ObservationModel, R: Rng, P = UniformRollout> {
    model: M,
    config: PomcpConfig,
    rollout: P,
    rng: R,
    tree: BeliefTree<M>,
    horizon: u32,
    phase: Phase,
}

impl<M, R> Pomcp<M, R, UniformRollout>
where
    M: ObservationModel,
    R: Rng,
{
    /// Create a planner that rolls out uniformly at random.
    pub fn new(model: M, config: PomcpConfig, rng: R) -> Self {
        Self::with_rollout(model, config, UniformRollout, rng)
    }
}

impl<M, R, P> Pomcp<M, R, P>
where
    M: ObservationModel,
    R: Rng,
    P: RolloutPolicy<M>,
{
    /// Create a planner with a custom rollout policy.
    pub fn with_rollout(model: M, config: PomcpConfig, rollout: P, rng: R) -> Self {
        Self {
            model,
            config,
            rollout,
            rng,
            tree: Tree::new(DecisionNode::new(ParticleSet::new())),
            horizon: 0,
            phase: Phase::Empty,
        }
    }

    /// Plan from an explicit particle approximation of the belief.
    pub fn plan_with_particles(&mut self, particles: ParticleSet<M::State>, horizon: u32) -> usize {
        self.tree.reset(DecisionNode::new(particles));
        self.phase = Phase::Rooted;
        self.run(horizon)
    }

    fn run(&mut self, horizon: u32) -> usize {
        let root = self.tree.root_id();
        let first_particle = self.tree.root().data.iter().next().cloned();
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
                .tree
                .root()
                .data
                .sample(&mut self.rng)
                .cloned()
                .expect("BUG: root particles emptied during search");
            self.simulate(root, state, 0);
        }

        let action = best_by_value(self.tree.root().actions());
        self.phase = Phase::Answered;
        trace!(
            action,
            value = self.root_value(),
            iterations = self.config.iterations,
            particles = self.tree.root().data.len(),
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

    fn simulate(&mut self, id: NodeId, state: M::State, depth: u32) -> f64 {
        self.expand(id, &state);
        let node = self.tree.get_mut(id);
        if node.num_actions() == 0 {
            return 0.0;
        }
        node.visit_count += 1;
        let action = select_ucb1(node.actions(), node.visit_count, self.config.exploration);

        let (next, observation, mut ret) =
            self.model
                .sample_transition_observation(&state, action, &mut self.rng);
        let (child, created) = self.tree.child_or_insert_with(id, action, observation, || {
            DecisionNode::new(ParticleSet::new())
        });
        self.tree.get_mut(child).data.push(next.clone());

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

    /// Particles at the current root.
    pub fn root_particles(&self) -> &ParticleSet<M::State> {
        &self.tree.root().data
    }

    /// The search tree as left by the last call.
    pub fn tree(&self) -> &BeliefTree<M> {
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
    pub fn config(&self) -> &PomcpConfig {
        &self.config
    }

    /// Where the planner is in its lifecycle.
    pub fn phase(&self) -> Phase {
        self.phase
    }
}

impl<M, R, P> Pomcp<M, R, P>
where
    M: ObservationModel + FiniteStates,
    R: Rng,
    P: RolloutPolicy<M>,
{
    /// Plan from a probability vector over the model's states.
    ///
    /// The belief is converted into `belief_particles` sampled states.
    ///
    /// # Panics
    /// Panics if `belief` does not have one entry per model state.
    pub fn plan(&mut self, belief: &Belief, horizon: u32) -> usize {
        let particles = ParticleSet::from_belief(
            &self.model,
            belief,
            self.config.belief_particles,
            &mut self.rng,
        );
        self.plan_with_particles(particles, horizon)
    }

    /// Re-root on the history extended by `action` and `observation`, then plan.
    ///
    /// When that history was never sampled, or it was sampled but holds no
    /// particles, planning restarts from a uniform belief.
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
        if self.tree.root().data.is_empty() {
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
