use rand::Rng;
use std::hash::Hash;

/// A generative model of a sequential decision problem.
///
/// The planners never look at transition or reward tables. All they need is
/// a way to sample what happens next from a given state, plus a few facts
/// about the problem. Every sampling call receives the planner's own random
/// number generator, so fixing the planner seed fixes the whole run.
///
/// Actions are dense indices in `0..num_actions(state)`.
pub trait GenerativeModel {
    /// A concrete world state.
    type State: Clone;

    /// Number of legal actions in `state`.
    ///
    /// Constant for fixed action spaces; may vary with the state otherwise.
    fn num_actions(&self, state: &Self::State) -> usize;

    /// Samples a successor state and the reward collected on the way.
    fn sample_transition<R: Rng + ?Sized>(
        &self,
        state: &Self::State,
        action: usize,
        rng: &mut R,
    ) -> (Self::State, f64);

    /// Returns true if no further transitions happen from `state`.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// Per-step discount factor in (0, 1].
    fn discount(&self) -> f64;
}

/// A generative model that also emits observations (a POMDP).
pub trait ObservationModel: GenerativeModel {
    /// What the agent perceives after acting.
    type Observation: Copy + Eq + Hash;

    /// Samples a successor state, the observation it produces and the reward.
    fn sample_transition_observation<R: Rng + ?Sized>(
        &self,
        state: &Self::State,
        action: usize,
        rng: &mut R,
    ) -> (Self::State, Self::Observation, f64);
}

/// A model whose states can be enumerated by index.
///
/// Needed to turn a probability vector over states into concrete particles.
pub trait FiniteStates: GenerativeModel {
    /// Total number of states.
    fn num_states(&self) -> usize;

    /// The state with the given index, `index < num_states()`.
    fn state(&self, index: usize) -> Self::State;
}
