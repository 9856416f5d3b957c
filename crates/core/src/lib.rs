//! mcplan core - generative model abstractions and common types
//!
//! This crate provides the traits a problem must implement to be planned
//! over by the Monte Carlo planners in `mcplan-mcts`.
//!
//! # Types
//!
//! - [`GenerativeModel`] - Sampling interface for fully observable problems
//! - [`ObservationModel`] - Adds observation sampling (partially observable problems)
//! - [`FiniteStates`] - Enumerable state spaces
//! - [`Belief`] - Probability distribution over states (sums to 1.0)

mod belief;
mod error;
mod model;

pub use belief::Belief;
pub use error::{PlannerError, Result};
pub use model::{FiniteStates, GenerativeModel, ObservationModel};
