//! Corner grid world.
//!
//! The top-left and bottom-right cells are absorbing goals. Every move
//! from another cell costs 1 and only succeeds with some probability,
//! otherwise the agent stays put. Moving into a wall also stays put.
//!
//! Cells are numbered row-major; on the default 4x4 grid:
//! ```text
//!  0 |  1 |  2 |  3
//!  4 |  5 |  6 |  7
//!  8 |  9 | 10 | 11
//! 12 | 13 | 14 | 15
//! ```

use mcplan_core::{FiniteStates, GenerativeModel};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

/// Move one row up.
pub const UP: usize = 0;
/// Move one column right.
pub const RIGHT: usize = 1;
/// Move one row down.
pub const DOWN: usize = 2;
/// Move one column left.
pub const LEFT: usize = 3;

/// Grid with two absorbing corners.
#[derive(Clone, Debug)]
pub struct CornerProblem {
    width: usize,
    height: usize,
    step: Bernoulli,
    discount: f64,
}

impl Default for CornerProblem {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl CornerProblem {
    /// Grid of `width` x `height` cells where moves succeed 80% of the time.
    ///
    /// # Panics
    /// Panics if the grid has fewer than two cells.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width * height >= 2, "grid needs at least two cells");
        Self {
            width,
            height,
            step: Bernoulli::new(0.8).expect("BUG: constant probability out of range"),
            discount: 1.0,
        }
    }

    /// # Panics
    /// Panics if `probability` is not within `[0, 1]`.
    pub fn with_success_probability(mut self, probability: f64) -> Self {
        self.step = Bernoulli::new(probability)
            .unwrap_or_else(|_| panic!("success probability {probability} outside [0, 1]"));
        self
    }

    pub fn with_discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell reached by moving from `cell` in `direction`, ignoring slips.
    pub fn neighbor(&self, cell: usize, direction: usize) -> usize {
        let (x, y) = (cell % self.width, cell / self.width);
        let (x, y) = match direction {
            UP => (x, y.saturating_sub(1)),
            RIGHT => ((x + 1).min(self.width - 1), y),
            DOWN => (x, (y + 1).min(self.height - 1)),
            LEFT => (x.saturating_sub(1), y),
            _ => panic!("invalid direction {direction}"),
        };
        x + y * self.width
    }
}

impl GenerativeModel for CornerProblem {
    type State = usize;

    fn num_actions(&self, _state: &usize) -> usize {
        4
    }

    fn sample_transition<R: Rng + ?Sized>(&self, state: &usize, action: usize, rng: &mut R) -> (usize, f64) {
        if self.is_terminal(state) {
            return (*state, 0.0);
        }
        let target = self.neighbor(*state, action);
        if target != *state && self.step.sample(rng) {
            (target, -1.0)
        } else {
            (*state, -1.0)
        }
    }

    fn is_terminal(&self, state: &usize) -> bool {
        *state == 0 || *state == self.width * self.height - 1
    }

    fn discount(&self) -> f64 {
        self.discount
    }
}

impl FiniteStates for CornerProblem {
    fn num_states(&self) -> usize {
        self.width * self.height
    }

    fn state(&self, index: usize) -> usize {
        index
    }
}
