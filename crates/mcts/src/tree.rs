//! Arena-allocated search tree with re-rooting.
//!
//! Nodes live in a `Vec` of slots and refer to each other through
//! [`NodeId`] handles, so promoting a subtree to be the new root never has
//! to move it out from under the node that owns it: the old root and its
//! other descendants are released slot by slot while the promoted subtree
//! keeps its ids.

use crate::node::{DecisionNode, NodeId};
use std::hash::Hash;

#[derive(Debug)]
struct Slot<K, D> {
    generation: u32,
    node: Option<DecisionNode<K, D>>,
}

/// Arena-allocated search tree.
///
/// Freed slots are recycled through a free list; their generation is bumped
/// so that handles to pruned nodes are recognized as stale.
#[derive(Debug)]
pub struct Tree<K, D> {
    slots: Vec<Slot<K, D>>,
    free: Vec<u32>,
    root: NodeId,
    live: usize,
}

impl<K: Eq + Hash, D> Tree<K, D> {
    /// Create a tree holding only `root`.
    pub fn new(root: DecisionNode<K, D>) -> Self {
        let mut tree = Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NodeId {
                index: 0,
                generation: 0,
            },
            live: 0,
        };
        tree.root = tree.insert(root);
        tree
    }

    /// Discard every node and start over from `root`.
    ///
    /// Slots are kept for reuse and their generations keep counting, so ids
    /// handed out before the reset stay stale.
    pub fn reset(&mut self, root: DecisionNode<K, D>) {
        for slot in &mut self.slots {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free = (0..self.slots.len() as u32).rev().collect();
        self.live = 0;
        self.root = self.insert(root);
    }

    /// Id of the current root.
    #[inline]
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// The current root node.
    pub fn root(&self) -> &DecisionNode<K, D> {
        self.get(self.root)
    }

    /// Mutable access to the current root node.
    pub fn root_mut(&mut self) -> &mut DecisionNode<K, D> {
        self.get_mut(self.root)
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index())
            .is_some_and(|slot| slot.generation == id.generation && slot.node.is_some())
    }

    /// Get a reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the id is stale or was never issued by this tree.
    pub fn get(&self, id: NodeId) -> &DecisionNode<K, D> {
        self.try_get(id).expect("BUG: stale or foreign node id")
    }

    /// Get a mutable reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the id is stale or was never issued by this tree.
    pub fn get_mut(&mut self, id: NodeId) -> &mut DecisionNode<K, D> {
        match self.slots.get_mut(id.index()) {
            Some(slot) if slot.generation == id.generation => {
                slot.node.as_mut().expect("BUG: stale or foreign node id")
            }
            _ => panic!("BUG: stale or foreign node id"),
        }
    }

    /// Get a node by ID, or `None` for a stale id.
    pub fn try_get(&self, id: NodeId) -> Option<&DecisionNode<K, D>> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// Store a node, recycling a free slot when available.
    pub fn insert(&mut self, node: DecisionNode<K, D>) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index,
            generation: 0,
        }
    }

    /// Child of `parent` reached by `action` and `key`, if any.
    pub fn child(&self, parent: NodeId, action: usize, key: &K) -> Option<NodeId> {
        self.get(parent).action(action)?.child(key)
    }

    /// Child of `parent` reached by `action` and `key`, creating it with
    /// `make` if absent. Returns the child id and whether it was created.
    ///
    /// # Panics
    /// Panics if `parent` has no edge for `action`.
    pub fn child_or_insert_with<F>(
        &mut self,
        parent: NodeId,
        action: usize,
        key: K,
        make: F,
    ) -> (NodeId, bool)
    where
        F: FnOnce() -> DecisionNode<K, D>,
    {
        if let Some(id) = self.get(parent).actions()[action].child(&key) {
            return (id, false);
        }
        let id = self.insert(make());
        self.get_mut(parent).action_mut(action).insert_child(key, id);
        (id, true)
    }

    /// Make the child reached by (`action`, `key`) from the root the new root.
    ///
    /// The child is first detached from its edge, then the old root and
    /// everything it still owns are released. Ids inside the promoted
    /// subtree stay valid. Returns false, leaving the tree untouched, when
    /// the root has no such edge or child.
    pub fn promote(&mut self, action: usize, key: &K) -> bool {
        let old_root = self.root;
        let child = self
            .get_mut(old_root)
            .try_action_mut(action)
            .and_then(|edge| edge.remove_child(key));
        let Some(child) = child else {
            return false;
        };
        self.release(old_root);
        self.root = child;
        true
    }

    /// Free `id` and all of its descendants.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let slot = &mut self.slots[id.index()];
            if slot.generation != id.generation {
                continue;
            }
            if let Some(node) = slot.node.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(id.index);
                self.live -= 1;
                for edge in node.actions() {
                    stack.extend(edge.child_ids());
                }
            }
        }
    }

    /// Number of live nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    /// Never true: the root always exists.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        TreeStats {
            live_nodes: self.live,
            root_visits: self.root().visit_count,
            max_depth: self.max_depth(),
        }
    }

    fn max_depth(&self) -> u32 {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            for edge in self.get(id).actions() {
                stack.extend(edge.child_ids().map(|c| (c, depth + 1)));
            }
        }
        deepest
    }
}

/// Statistics about a search tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub live_nodes: usize,
    pub root_visits: u32,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestTree = Tree<u8, u32>;

    fn leaf(tag: u32) -> DecisionNode<u8, u32> {
        DecisionNode::new(tag)
    }

    fn expanded(tag: u32, actions: usize) -> DecisionNode<u8, u32> {
        let mut node = DecisionNode::new(tag);
        node.expand(actions);
        node
    }

    #[test]
    fn test_new_tree() {
        let tree: TestTree = Tree::new(leaf(0));
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
        assert_eq!(tree.root().data, 0);
    }

    #[test]
    fn test_child_or_insert() {
        let mut tree: TestTree = Tree::new(expanded(0, 2));
        let root = tree.root_id();

        let (a, created) = tree.child_or_insert_with(root, 1, 9, || leaf(1));
        assert!(created);
        let (b, created) = tree.child_or_insert_with(root, 1, 9, || leaf(2));
        assert!(!created);
        assert_eq!(a, b);
        assert_eq!(tree.get(a).data, 1);
        assert_eq!(tree.child(root, 1, &9), Some(a));
        assert_eq!(tree.child(root, 0, &9), None);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_promote_keeps_subtree_and_frees_rest() {
        let mut tree: TestTree = Tree::new(expanded(0, 2));
        let root = tree.root_id();

        let (kept, _) = tree.child_or_insert_with(root, 0, 1, || expanded(1, 1));
        let (grandchild, _) = tree.child_or_insert_with(kept, 0, 5, || leaf(2));
        let (dropped, _) = tree.child_or_insert_with(root, 1, 1, || expanded(3, 1));
        let (dropped_child, _) = tree.child_or_insert_with(dropped, 0, 5, || leaf(4));
        assert_eq!(tree.len(), 5);

        assert!(tree.promote(0, &1));

        assert_eq!(tree.root_id(), kept);
        assert_eq!(tree.root().data, 1);
        assert_eq!(tree.len(), 2);
        assert!(tree.contains(grandchild));
        assert_eq!(tree.get(grandchild).data, 2);
        assert!(!tree.contains(root));
        assert!(!tree.contains(dropped));
        assert!(!tree.contains(dropped_child));
    }

    #[test]
    fn test_promote_missing_branch() {
        let mut tree: TestTree = Tree::new(expanded(0, 2));
        let root = tree.root_id();
        tree.child_or_insert_with(root, 0, 1, || leaf(1));

        assert!(!tree.promote(0, &2));
        assert!(!tree.promote(1, &1));
        // Out of range action on the root is a miss, not a panic
        assert!(!tree.promote(7, &1));
        assert_eq!(tree.root_id(), root);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_freed_slots_are_recycled_with_new_generation() {
        let mut tree: TestTree = Tree::new(expanded(0, 1));
        let old_root = tree.root_id();
        let (child, _) = tree.child_or_insert_with(old_root, 0, 1, || expanded(1, 1));

        assert!(tree.promote(0, &1));
        let (fresh, _) = tree.child_or_insert_with(child, 0, 3, || leaf(9));

        // The old root's slot was reused but its handle is stale
        assert_eq!(fresh.index(), old_root.index());
        assert_ne!(fresh, old_root);
        assert!(!tree.contains(old_root));
        assert!(tree.try_get(old_root).is_none());
        assert_eq!(tree.get(fresh).data, 9);
    }

    #[test]
    #[should_panic(expected = "stale")]
    fn test_stale_id_panics() {
        let mut tree: TestTree = Tree::new(expanded(0, 1));
        let old_root = tree.root_id();
        tree.child_or_insert_with(old_root, 0, 1, || leaf(1));
        assert!(tree.promote(0, &1));
        tree.get(old_root);
    }

    #[test]
    fn test_reset() {
        let mut tree: TestTree = Tree::new(expanded(0, 1));
        let root = tree.root_id();
        let (child, _) = tree.child_or_insert_with(root, 0, 1, || leaf(1));

        tree.reset(leaf(7));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().data, 7);
        assert!(!tree.contains(root));
        assert!(!tree.contains(child));

        let again = tree.insert(leaf(8));
        assert!(tree.contains(again));
        assert!(!tree.contains(child));
    }

    #[test]
    fn test_tree_stats() {
        let mut tree: TestTree = Tree::new(expanded(0, 1));
        let root = tree.root_id();
        let (child, _) = tree.child_or_insert_with(root, 0, 1, || expanded(1, 1));
        tree.child_or_insert_with(child, 0, 1, || leaf(2));
        tree.root_mut().visit_count = 3;

        let stats = tree.stats();
        assert_eq!(stats.live_nodes, 3);
        assert_eq!(stats.root_visits, 3);
        assert_eq!(stats.max_depth, 2);
    }
}
