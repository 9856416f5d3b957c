//! Action selection rules.
//!
//! During search, actions are picked with UCB1:
//!
//! ```text
//! score(a) = V(a) + C * sqrt( ln(N + 1) / n(a) )
//! ```
//!
//! where `N` is the decision node's visit count and `n(a)` the edge's.
//! The `+ 1` keeps the bonus non-zero on the very first visit of a node.
//! Unvisited edges score `+inf`, so every action is tried once before any
//! is repeated. Once search is over the answer is picked by raw value alone.
//!
//! Both rules break ties in favor of the lowest action index.

use crate::node::ActionNode;

/// UCB1 score of one edge.
///
/// `log_count` is `ln(N + 1)` for the parent node.
#[inline]
pub fn ucb1_score(value: f64, visits: u32, log_count: f64, exploration: f64) -> f64 {
    if visits == 0 {
        return f64::INFINITY;
    }
    value + exploration * (log_count / visits as f64).sqrt()
}

/// Index of the edge with the highest UCB1 score.
///
/// Returns 0 for an empty slice.
pub fn select_ucb1<K>(actions: &[ActionNode<K>], node_visits: u32, exploration: f64) -> usize {
    let log_count = (node_visits as f64 + 1.0).ln();

    let mut best = 0;
    let mut best_score = f64::NEG_INFINITY;
    for (i, edge) in actions.iter().enumerate() {
        let score = ucb1_score(edge.value, edge.visit_count, log_count, exploration);
        if score > best_score {
            best_score = score;
            best = i;
        }
    }
    best
}

/// Index of the edge with the highest value estimate, without exploration.
///
/// Returns 0 for an empty slice.
pub fn best_by_value<K>(actions: &[ActionNode<K>]) -> usize {
    let mut best = 0;
    for (i, edge) in actions.iter().enumerate().skip(1) {
        if edge.value > actions[best].value {
            best = i;
        }
    }
    best
}
