//! MCTS tree structure with arena allocation.
//!
//! Nodes live in a contiguous Vec and are referenced by NodeId indices.
//! A tree is built for one decision and dropped afterwards.

use crate::node::{MctsNode, NodeId};

/// MCTS tree with arena-based node storage.
#[derive(Debug)]
pub struct MctsTree<S, M> {
    nodes: Vec<MctsNode<S, M>>,

    /// Root node index (always 0 after initialization)
    root: NodeId,
}

impl<S, M> MctsTree<S, M> {
    /// Create a new tree with the given root state.
    pub fn new(root_state: S, terminal_value: Option<f32>) -> Self {
        Self::with_capacity(root_state, terminal_value, 1)
    }

    /// Create a tree, reserving room for `capacity` nodes.
    pub fn with_capacity(root_state: S, terminal_value: Option<f32>, capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(MctsNode::new_root(root_state, terminal_value));
        Self {
            nodes,
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &MctsNode<S, M> {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut MctsNode<S, M> {
        &mut self.nodes[id.index()]
    }

    /// Allocate a new node and return its ID.
    pub fn allocate(&mut self, node: MctsNode<S, M>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Select the child of `node_id` with the highest PUCT score.
    ///
    /// Ties keep the earliest child, i.e. the first legal move in
    /// enumeration order.
    pub fn select_child(&self, node_id: NodeId, c_puct: f32) -> Option<NodeId> {
        let node = self.get(node_id);
        let parent_visits_sqrt = (node.visit_count as f32).sqrt();

        let mut best: Option<(NodeId, f32)> = None;
        for &child_id in &node.children {
            let score = self.get(child_id).ucb_score(parent_visits_sqrt, c_puct);
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((child_id, score));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Add a child to a parent node and return its id.
    pub fn add_child(
        &mut self,
        parent_id: NodeId,
        mv: M,
        prior: f32,
        state: S,
        terminal_value: Option<f32>,
    ) -> NodeId {
        let child = MctsNode::new_child(parent_id, mv, prior, state, terminal_value);
        let child_id = self.allocate(child);
        self.get_mut(parent_id).children.push(child_id);
        child_id
    }

    /// Backpropagate a value from a leaf to the root.
    ///
    /// `value` is from the perspective of the side to move at the leaf and
    /// is negated at each level. Virtual loss is left untouched.
    pub fn backpropagate(&mut self, leaf_id: NodeId, value: f32) {
        let mut current_id = leaf_id;
        let mut current_value = value;

        while current_id.is_some() {
            let node = self.get_mut(current_id);
            node.visit_count += 1;
            node.value_sum += current_value;

            current_value = -current_value;
            current_id = node.parent;
        }
    }

    /// Add virtual loss to every node on a path.
    pub fn apply_virtual_loss(&mut self, path: &[NodeId], loss: f32) {
        for &node_id in path {
            self.get_mut(node_id).virtual_loss += loss;
        }
    }

    /// Remove one path's worth of virtual loss, never going below zero.
    pub fn remove_virtual_loss(&mut self, path: &[NodeId], loss: f32) {
        for &node_id in path {
            let node = self.get_mut(node_id);
            node.virtual_loss = (node.virtual_loss - loss).max(0.0);
        }
    }

    /// Root children in enumeration order.
    pub fn root_children(&self) -> &[NodeId] {
        &self.get(self.root).children
    }

    /// Get statistics about the tree for debugging.
    pub fn stats(&self) -> TreeStats {
        let root = self.get(self.root);
        TreeStats {
            total_nodes: self.nodes.len(),
            root_visits: root.visit_count,
            root_value: root.mean_value(),
            max_depth: self.max_depth(),
        }
    }

    fn max_depth(&self) -> u32 {
        // Children are always allocated after their parent
        let mut depth = vec![0u32; self.nodes.len()];
        let mut max = 0;
        for (i, node) in self.nodes.iter().enumerate().skip(1) {
            depth[i] = depth[node.parent.index()] + 1;
            max = max.max(depth[i]);
        }
        max
    }
}

impl<S, M: Clone> MctsTree<S, M> {
    /// Visit distribution over root children, in enumeration order.
    ///
    /// Falls back to the children's priors when the root has no visits.
    pub fn root_policy(&self) -> Vec<(M, f32)> {
        let children = self.root_children();
        let total: u32 = children.iter().map(|id| self.get(*id).visit_count).sum();

        children
            .iter()
            .filter_map(|id| {
                let node = self.get(*id);
                let weight = if total > 0 {
                    node.visit_count as f32 / total as f32
                } else {
                    node.prior
                };
                node.mv.clone().map(|mv| (mv, weight))
            })
            .collect()
    }
}

/// Statistics about an MCTS tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeStats {
    pub total_nodes: usize,
    pub root_visits: u32,
    pub root_value: f32,
    pub max_depth: u32,
}
