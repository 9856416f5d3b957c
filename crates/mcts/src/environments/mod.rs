//! Small reference problems.
//!
//! Both have known optimal behavior, which makes them useful for checking
//! the planners end to end.

pub mod corner;
pub mod tiger;

pub use corner::CornerProblem;
pub use tiger::TigerProblem;
