use thiserror::Error;

/// Errors that can occur when building planner inputs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlannerError {
    #[error("Invalid belief: {0}")]
    InvalidBelief(String),

    #[error("Belief has no states")]
    EmptyBelief,
}

/// Convenience Result type for planner operations
pub type Result<T> = std::result::Result<T, PlannerError>;
