//! Planner configuration parameters.
//!
//! The horizon is not part of the configuration: it is supplied with every
//! planning call.

use serde::{Deserialize, Serialize};

/// Configuration for the fully observable MCTS planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MctsConfig {
    /// Number of simulated episodes per planning call.
    pub iterations: u32,

    /// UCB1 exploration constant.
    /// Higher values favor under-tried actions. Strongly problem dependent:
    /// it should be in the same scale as the returns of the problem.
    pub exploration: f64,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            exploration: 1.0,
        }
    }
}

impl MctsConfig {
    /// Builder pattern: set number of episodes.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder pattern: set exploration constant.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }
}

/// Configuration for the particle-belief POMCP planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PomcpConfig {
    /// Number of simulated episodes per planning call.
    pub iterations: u32,

    /// UCB1 exploration constant.
    pub exploration: f64,

    /// Particles drawn when a probability-vector belief is converted
    /// into a particle set.
    pub belief_particles: usize,
}

impl Default for PomcpConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            exploration: 1.0,
            belief_particles: 1000,
        }
    }
}

impl PomcpConfig {
    /// Builder pattern: set number of episodes.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder pattern: set exploration constant.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Builder pattern: set particles per fresh belief.
    pub fn with_belief_particles(mut self, belief_particles: usize) -> Self {
        self.belief_particles = belief_particles;
        self
    }
}

/// Knowledge measure used as the immediate reward of a belief node
/// by the belief-reward planner.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeliefReward {
    /// Negative entropy of the particle distribution (`sum p ln p`, at most 0).
    Entropy,
    /// Fraction of particles on the most common state.
    MaxBelief,
}

/// How a belief node folds the values of its actions into its own value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueAggregation {
    /// Running mean of every return that went through the node.
    Mean,
    /// Value of the best action only.
    Max,
    /// Running mean until the node reaches `threshold` visits, max afterwards.
    MeanThenMax { threshold: u32 },
}

impl ValueAggregation {
    /// Visit count from which the node switches to max aggregation.
    pub fn max_from(self) -> u32 {
        match self {
            ValueAggregation::Mean => u32::MAX,
            ValueAggregation::Max => 1,
            ValueAggregation::MeanThenMax { threshold } => threshold.max(1),
        }
    }
}

impl Default for ValueAggregation {
    fn default() -> Self {
        ValueAggregation::MeanThenMax { threshold: 500 }
    }
}

/// Configuration for the belief-reward (rPOMCP) planner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RpomcpConfig {
    /// Number of simulated episodes per planning call.
    pub iterations: u32,

    /// UCB1 exploration constant.
    pub exploration: f64,

    /// Particles drawn for a fresh belief.
    pub belief_particles: usize,

    /// Immediate reward computed from each belief node.
    pub belief_reward: BeliefReward,

    /// Action value aggregation policy for belief nodes.
    pub aggregation: ValueAggregation,
}

impl Default for RpomcpConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            exploration: 1.0,
            belief_particles: 1000,
            belief_reward: BeliefReward::MaxBelief,
            aggregation: ValueAggregation::default(),
        }
    }
}

impl RpomcpConfig {
    /// Builder pattern: set number of episodes.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder pattern: set exploration constant.
    pub fn with_exploration(mut self, exploration: f64) -> Self {
        self.exploration = exploration;
        self
    }

    /// Builder pattern: set particles per fresh belief.
    pub fn with_belief_particles(mut self, belief_particles: usize) -> Self {
        self.belief_particles = belief_particles;
        self
    }

    /// Builder pattern: set the knowledge measure.
    pub fn with_belief_reward(mut self, belief_reward: BeliefReward) -> Self {
        self.belief_reward = belief_reward;
        self
    }

    /// Builder pattern: set the value aggregation policy.
    pub fn with_aggregation(mut self, aggregation: ValueAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MctsConfig::default();
        assert_eq!(config.iterations, 1000);
        assert!((config.exploration - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_builder_pattern() {
        let config = PomcpConfig::default()
            .with_iterations(50)
            .with_exploration(25.0)
            .with_belief_particles(200);

        assert_eq!(config.iterations, 50);
        assert!((config.exploration - 25.0).abs() < 1e-12);
        assert_eq!(config.belief_particles, 200);
    }

    #[test]
    fn test_rpomcp_defaults() {
        let config = RpomcpConfig::default();
        assert_eq!(config.belief_reward, BeliefReward::MaxBelief);
        assert_eq!(
            config.aggregation,
            ValueAggregation::MeanThenMax { threshold: 500 }
        );
    }

    #[test]
    fn test_aggregation_switch_point() {
        assert_eq!(ValueAggregation::Mean.max_from(), u32::MAX);
        assert_eq!(ValueAggregation::Max.max_from(), 1);
        assert_eq!(ValueAggregation::MeanThenMax { threshold: 20 }.max_from(), 20);
        assert_eq!(ValueAggregation::MeanThenMax { threshold: 0 }.max_from(), 1);
    }
}
