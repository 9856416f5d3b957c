//! Online Monte Carlo tree search planners.
//!
//! This crate provides three planners over the models defined in
//! `mcplan_core`:
//!
//! - [`Mcts`]: UCT for fully observable problems
//! - [`Pomcp`]: UCT over action-observation histories with particle beliefs
//! - [`Rpomcp`]: POMCP variant rewarding knowledge of the hidden state
//!
//! Each planner keeps its tree between calls. After acting, calling
//! `plan_from` with the action taken and what was observed re-roots the tree
//! on the matching subtree, discarding the rest, so the statistics gathered
//! there are reused.
//!
//! # Example
//!
//! ```
//! use mcplan_mcts::{environments::CornerProblem, Mcts, MctsConfig};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let config = MctsConfig::default().with_iterations(500).with_exploration(5.0);
//! let rng = ChaCha8Rng::seed_from_u64(42);
//! let mut mcts = Mcts::new(CornerProblem::default(), config, rng);
//!
//! let action = mcts.plan(&5, 10);
//! println!("Best action: {action}");
//! println!("Tree: {:?}", mcts.tree().stats());
//!
//! // After moving, reuse the subtree of the state we landed in.
//! let next = mcts.plan_from(action, &4, 9);
//! println!("Next action: {next}");
//! ```

pub mod config;
pub mod environments;
pub mod node;
pub mod particles;
pub mod pomcp;
pub mod rollout;
pub mod rpomcp;
pub mod search;
pub mod selection;
pub mod tree;

pub use config::{BeliefReward, MctsConfig, PomcpConfig, RpomcpConfig, ValueAggregation};
pub use node::{ActionNode, DecisionNode, NodeId};
pub use particles::{ParticleCounts, ParticleSet};
pub use pomcp::Pomcp;
pub use rollout::{RolloutPolicy, UniformRollout};
pub use rpomcp::{BeliefStats, Rpomcp};
pub use search::{state_key, Mcts, Phase};
pub use tree::{Tree, TreeStats};
