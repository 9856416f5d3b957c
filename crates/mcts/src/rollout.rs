//! Rollout policies.
//!
//! Once an episode leaves the tree, the value of the new frontier node is
//! estimated by simulating forward with a cheap default policy. No nodes are
//! created during a rollout.

use mcplan_core::GenerativeModel;
use rand::Rng;

/// A default policy used beyond the tree boundary.
pub trait RolloutPolicy<M: GenerativeModel> {
    /// Pick the action to follow from `state`, or `None` if none is legal.
    fn action<R: Rng + ?Sized>(&self, model: &M, state: &M::State, rng: &mut R) -> Option<usize>;
}

/// Picks a legal action uniformly at random.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformRollout;

impl<M: GenerativeModel> RolloutPolicy<M> for UniformRollout {
    fn action<R: Rng + ?Sized>(&self, model: &M, state: &M::State, rng: &mut R) -> Option<usize> {
        match model.num_actions(state) {
            0 => None,
            n => Some(rng.gen_range(0..n)),
        }
    }
}

/// Follow `policy` from `state` for at most `steps` transitions.
///
/// Returns the discounted sum of rewards. Stops early at terminal states
/// and at states with no legal action.
pub fn rollout<M, P, R>(model: &M, policy: &P, state: M::State, steps: u32, rng: &mut R) -> f64
where
    M: GenerativeModel,
    P: RolloutPolicy<M>,
    R: Rng + ?Sized,
{
    let discount = model.discount();
    let mut state = state;
    let mut total = 0.0;
    let mut gamma = 1.0;

    for _ in 0..steps {
        if model.is_terminal(&state) {
            break;
        }
        let Some(action) = policy.action(model, &state, rng) else {
            break;
        };
        let (next, reward) = model.sample_transition(&state, action, rng);
        total += gamma * reward;
        gamma *= discount;
        state = next;
    }

    total
}
