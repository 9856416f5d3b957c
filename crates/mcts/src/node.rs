//! Search tree node types.
//!
//! A decision node stands for a state (MCTS) or a belief (POMCP) and owns
//! one action edge per legal action. Each action edge owns the decision
//! nodes reached through it, keyed by outcome: a state key or an observation.
//! Ownership is expressed through [`NodeId`] handles into the tree arena.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{BuildHasherDefault, Hash};

/// Outcome-keyed children of an action edge.
///
/// Uses a fixed-key hasher so that a seeded run is reproducible.
pub type ChildMap<K> = HashMap<K, NodeId, BuildHasherDefault<DefaultHasher>>;

/// Handle to a decision node in the tree arena.
///
/// The generation distinguishes a live node from an earlier node that
/// occupied the same slot before being pruned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Slot index in the arena.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Statistics and children for one action taken from a decision node.
#[derive(Clone, Debug)]
pub struct ActionNode<K> {
    /// Number of times this edge was selected.
    pub visit_count: u32,

    /// Running mean of the discounted returns backed up through this edge.
    pub value: f64,

    children: ChildMap<K>,
}

impl<K: Eq + Hash> ActionNode<K> {
    /// Create an unvisited edge.
    pub fn new() -> Self {
        Self {
            visit_count: 0,
            value: 0.0,
            children: HashMap::default(),
        }
    }

    /// Fold one more return into the running mean.
    #[inline]
    pub fn update(&mut self, ret: f64) {
        self.visit_count += 1;
        self.value += (ret - self.value) / self.visit_count as f64;
    }

    /// Child reached through `key`, if it was ever sampled.
    pub fn child(&self, key: &K) -> Option<NodeId> {
        self.children.get(key).copied()
    }

    /// Iterate over (outcome, child) pairs. Order is unspecified.
    pub fn children(&self) -> impl Iterator<Item = (&K, NodeId)> + '_ {
        self.children.iter().map(|(k, id)| (k, *id))
    }

    /// Number of distinct outcomes seen through this edge.
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn insert_child(&mut self, key: K, id: NodeId) {
        self.children.insert(key, id);
    }

    pub(crate) fn remove_child(&mut self, key: &K) -> Option<NodeId> {
        self.children.remove(key)
    }

    pub(crate) fn child_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }
}

impl<K: Eq + Hash> Default for ActionNode<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A node of the search tree where the agent chooses an action.
///
/// `D` is per-planner payload: nothing for MCTS, a particle set for POMCP,
/// belief statistics for rPOMCP.
#[derive(Clone, Debug)]
pub struct DecisionNode<K, D> {
    /// Number of episodes that selected an action at this node.
    pub visit_count: u32,

    /// Planner specific data attached to the node.
    pub data: D,

    actions: Vec<ActionNode<K>>,

    /// Whether the action edges have been allocated.
    expanded: bool,
}

impl<K: Eq + Hash, D> DecisionNode<K, D> {
    /// Create a node whose action edges are not yet allocated.
    pub fn new(data: D) -> Self {
        Self {
            visit_count: 0,
            data,
            actions: Vec::new(),
            expanded: false,
        }
    }

    /// Allocate one edge per legal action. No-op once expanded.
    pub fn expand(&mut self, num_actions: usize) {
        if self.expanded {
            return;
        }
        self.actions = (0..num_actions).map(|_| ActionNode::new()).collect();
        self.expanded = true;
    }

    /// Whether the action edges have been allocated.
    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// All action edges, indexed by action.
    pub fn actions(&self) -> &[ActionNode<K>] {
        &self.actions
    }

    /// The edge for `action`, if allocated.
    pub fn action(&self, action: usize) -> Option<&ActionNode<K>> {
        self.actions.get(action)
    }

    pub(crate) fn action_mut(&mut self, action: usize) -> &mut ActionNode<K> {
        &mut self.actions[action]
    }

    pub(crate) fn try_action_mut(&mut self, action: usize) -> Option<&mut ActionNode<K>> {
        self.actions.get_mut(action)
    }

    /// Number of allocated action edges.
    pub fn num_actions(&self) -> usize {
        self.actions.len()
    }

    /// Sum of the visit counts of all action edges.
    pub fn action_visits(&self) -> u64 {
        self.actions.iter().map(|a| a.visit_count as u64).sum()
    }
}
