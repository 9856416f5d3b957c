//! Belief type with enforced invariants.
//!
//! A belief is a probability distribution over the states of a
//! [`FiniteStates`](crate::FiniteStates) model, indexed by state index.

use crate::{PlannerError, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Tolerance for belief sum validation.
const BELIEF_SUM_TOLERANCE: f64 = 1e-6;

/// A probability distribution over state indices.
///
/// Invariant: non-empty, all values finite and non-negative, sum to 1.0 (±1e-6).
///
/// # Example
/// ```
/// use mcplan_core::Belief;
///
/// let belief = Belief::new(vec![0.25, 0.75]).unwrap();
/// assert!((belief.sum() - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Belief(Vec<f64>);

impl Belief {
    /// Create a belief from a probability vector.
    ///
    /// # Errors
    /// Returns `PlannerError::EmptyBelief` for an empty vector, and
    /// `PlannerError::InvalidBelief` if any value is negative or not finite,
    /// or the values don't sum to 1.0.
    pub fn new(probs: Vec<f64>) -> Result<Self> {
        Self::validate_entries(&probs)?;

        let sum: f64 = probs.iter().sum();
        if (sum - 1.0).abs() > BELIEF_SUM_TOLERANCE {
            return Err(PlannerError::InvalidBelief(format!(
                "belief sum {} is not 1.0 (tolerance {})",
                sum, BELIEF_SUM_TOLERANCE
            )));
        }

        Ok(Self(probs))
    }

    /// Create a belief from non-negative weights, normalizing them.
    ///
    /// # Errors
    /// Returns error if any weight is negative or not finite, or all are zero.
    pub fn from_unnormalized(weights: Vec<f64>) -> Result<Self> {
        Self::validate_entries(&weights)?;

        let sum: f64 = weights.iter().sum();
        if sum == 0.0 {
            return Err(PlannerError::InvalidBelief(
                "cannot normalize: all weights are zero".to_string(),
            ));
        }

        Ok(Self(weights.into_iter().map(|w| w / sum).collect()))
    }

    /// Create the uniform belief over `num_states` states.
    ///
    /// # Errors
    /// Returns `PlannerError::EmptyBelief` if `num_states` is zero.
    pub fn uniform(num_states: usize) -> Result<Self> {
        if num_states == 0 {
            return Err(PlannerError::EmptyBelief);
        }
        Ok(Self(vec![1.0 / num_states as f64; num_states]))
    }

    fn validate_entries(values: &[f64]) -> Result<()> {
        if values.is_empty() {
            return Err(PlannerError::EmptyBelief);
        }
        if values.iter().any(|p| !p.is_finite()) {
            return Err(PlannerError::InvalidBelief(
                "belief contains non-finite values".to_string(),
            ));
        }
        if values.iter().any(|&p| p < 0.0) {
            return Err(PlannerError::InvalidBelief(
                "belief contains negative values".to_string(),
            ));
        }
        Ok(())
    }

    /// Probability of the state with the given index.
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    /// Number of states this belief ranges over.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed belief.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all probabilities (should be ~1.0).
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// Index of the most probable state (first one on ties).
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.0.iter().enumerate() {
            if p > self.0[best] {
                best = i;
            }
        }
        best
    }

    /// Draw one state index proportionally to its probability.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.sampler().sample(rng)
    }

    /// Draw `n` i.i.d. state indices.
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<usize> {
        let sampler = self.sampler();
        (0..n).map(|_| sampler.sample(rng)).collect()
    }

    fn sampler(&self) -> WeightedIndex<f64> {
        // Entries are validated non-negative and sum to ~1.
        WeightedIndex::new(&self.0).expect("BUG: belief invariant violated")
    }

    /// Get a reference to the underlying slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Iterate over the probabilities.
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    /// Get the underlying vector (consumes self).
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl std::ops::Index<usize> for Belief {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}
