//! The tiger problem.
//!
//! A tiger hides behind one of two doors. The agent can listen, which costs
//! 1 and reports the tiger's side correctly 85% of the time, or open a door:
//! +10 if the tiger is behind the other one, -100 otherwise. Opening a door
//! resets the problem, placing the tiger uniformly at random and returning a
//! meaningless observation.

use mcplan_core::{FiniteStates, GenerativeModel, ObservationModel};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

/// The tiger is behind the left door.
pub const TIGER_LEFT: usize = 0;
/// The tiger is behind the right door.
pub const TIGER_RIGHT: usize = 1;

pub const LISTEN: usize = 0;
pub const OPEN_LEFT: usize = 1;
pub const OPEN_RIGHT: usize = 2;

/// Two-door POMDP. States and observations are door indices.
#[derive(Clone, Debug)]
pub struct TigerProblem {
    hear_correctly: Bernoulli,
    discount: f64,
}

impl Default for TigerProblem {
    fn default() -> Self {
        Self::new()
    }
}

impl TigerProblem {
    pub fn new() -> Self {
        Self {
            hear_correctly: Bernoulli::new(0.85).expect("BUG: constant probability out of range"),
            discount: 0.95,
        }
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    /// # Panics
    /// Panics if `accuracy` is not within `[0, 1]`.
    pub fn with_listen_accuracy(mut self, accuracy: f64) -> Self {
        self.hear_correctly = Bernoulli::new(accuracy)
            .unwrap_or_else(|_| panic!("listen accuracy {accuracy} outside [0, 1]"));
        self
    }
}

impl GenerativeModel for TigerProblem {
    type State = usize;

    fn num_actions(&self, _state: &usize) -> usize {
        3
    }

    fn sample_transition<R: Rng + ?Sized>(&self, state: &usize, action: usize, rng: &mut R) -> (usize, f64) {
        let (next, _, reward) = self.sample_transition_observation(state, action, rng);
        (next, reward)
    }

    fn is_terminal(&self, _state: &usize) -> bool {
        false
    }

    fn discount(&self) -> f64 {
        self.discount
    }
}

impl ObservationModel for TigerProblem {
    type Observation = usize;

    fn sample_transition_observation<R: Rng + ?Sized>(
        &self,
        state: &usize,
        action: usize,
        rng: &mut R,
    ) -> (usize, usize, f64) {
        let opened = match action {
            LISTEN => {
                let heard = if self.hear_correctly.sample(rng) {
                    *state
                } else {
                    1 - *state
                };
                return (*state, heard, -1.0);
            }
            OPEN_LEFT => TIGER_LEFT,
            OPEN_RIGHT => TIGER_RIGHT,
            _ => panic!("invalid action {action}"),
        };
        let reward = if opened == *state { -100.0 } else { 10.0 };
        (rng.gen_range(0..2), rng.gen_range(0..2), reward)
    }
}

impl FiniteStates for TigerProblem {
    fn num_states(&self) -> usize {
        2
    }

    fn state(&self, index: usize) -> usize {
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn listening_keeps_the_tiger_and_is_mostly_right() {
        let tiger = TigerProblem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut correct = 0;
        for _ in 0..1000 {
            let (next, heard, reward) = tiger.sample_transition_observation(&TIGER_RIGHT, LISTEN, &mut rng);
            assert_eq!(next, TIGER_RIGHT);
            assert_eq!(reward, -1.0);
            if heard == TIGER_RIGHT {
                correct += 1;
            }
        }
        assert!((800..900).contains(&correct), "heard correctly {correct} times");
    }

    #[test]
    fn opening_pays_by_tiger_position() {
        let tiger = TigerProblem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert_eq!(tiger.sample_transition(&TIGER_LEFT, OPEN_LEFT, &mut rng).1, -100.0);
        assert_eq!(tiger.sample_transition(&TIGER_LEFT, OPEN_RIGHT, &mut rng).1, 10.0);
        assert_eq!(tiger.sample_transition(&TIGER_RIGHT, OPEN_RIGHT, &mut rng).1, -100.0);
    }

    #[test]
    fn opening_resets_the_tiger() {
        let tiger = TigerProblem::new();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let moved = (0..200)
            .filter(|_| tiger.sample_transition(&TIGER_LEFT, OPEN_RIGHT, &mut rng).0 == TIGER_RIGHT)
            .count();
        assert!(moved > 50 && moved < 150);
    }

    #[test]
    fn perfect_hearing() {
        let tiger = TigerProblem::new().with_listen_accuracy(1.0);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..50 {
            assert_eq!(tiger.sample_transition_observation(&TIGER_LEFT, LISTEN, &mut rng).1, TIGER_LEFT);
        }
    }
}
