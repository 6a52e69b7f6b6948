//! MCTS tree node representation.
//!
//! Each node holds a game state reached by playing a move from the parent.
//! Nodes store visit statistics used for PUCT selection and policy targets.

/// Index into the node arena. Using a newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    pub fn is_some(self) -> bool {
        !self.is_none()
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A node in the MCTS tree.
#[derive(Debug, Clone)]
pub struct MctsNode<S, M> {
    /// Parent node index (NONE for root)
    pub parent: NodeId,

    /// Move that led to this node from the parent (None for root)
    pub mv: Option<M>,

    /// Game state at this node
    pub state: S,

    /// Number of times this node has been visited
    pub visit_count: u32,

    /// Sum of values backpropagated through this node, from the perspective
    /// of the side to move at this node.
    pub value_sum: f32,

    /// Prior probability of the move into this node.
    pub prior: f32,

    /// Whether the state is terminal (decided when the node is created)
    pub is_terminal: bool,

    /// Terminal value for the side to move (only valid if is_terminal)
    pub terminal_value: f32,

    /// Whether children have been created
    pub expanded: bool,

    /// Child nodes in legal-move enumeration order
    pub children: Vec<NodeId>,

    /// Pending virtual loss from in-flight batched simulations
    pub virtual_loss: f32,
}

impl<S, M> MctsNode<S, M> {
    /// Create a new root node.
    pub fn new_root(state: S, terminal_value: Option<f32>) -> Self {
        Self {
            parent: NodeId::NONE,
            mv: None,
            state,
            visit_count: 0,
            value_sum: 0.0,
            prior: 1.0, // Root has prior 1.0
            is_terminal: terminal_value.is_some(),
            terminal_value: terminal_value.unwrap_or(0.0),
            expanded: false,
            children: Vec::new(),
            virtual_loss: 0.0,
        }
    }

    /// Create a new child node.
    pub fn new_child(
        parent: NodeId,
        mv: M,
        prior: f32,
        state: S,
        terminal_value: Option<f32>,
    ) -> Self {
        Self {
            parent,
            mv: Some(mv),
            state,
            visit_count: 0,
            value_sum: 0.0,
            prior,
            is_terminal: terminal_value.is_some(),
            terminal_value: terminal_value.unwrap_or(0.0),
            expanded: false,
            children: Vec::new(),
            virtual_loss: 0.0,
        }
    }

    /// Mean value Q = value_sum / visit_count, or 0.0 if never visited.
    #[inline]
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }

    /// PUCT score of this node as seen from its parent.
    ///
    /// `-Q - virtual_loss + c_puct * P * sqrt(N_parent) / (1 + N)`
    ///
    /// Q is negated because the node stores value from the perspective of
    /// the side to move here, which is the parent's opponent.
    ///
    /// Takes a pre-computed `sqrt(N_parent)` so siblings share one sqrt.
    #[inline]
    pub fn ucb_score(&self, parent_visits_sqrt: f32, c_puct: f32) -> f32 {
        let q = -self.mean_value() - self.virtual_loss;
        let u = c_puct * self.prior * parent_visits_sqrt / (1.0 + self.visit_count as f32);
        q + u
    }

    #[inline]
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Check if this is a leaf node (not expanded or terminal).
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.is_terminal || !self.expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Node = MctsNode<u32, u8>;

    #[test]
    fn test_node_id_none() {
        assert!(NodeId::NONE.is_none());
        assert!(!NodeId::NONE.is_some());
        assert!(!NodeId(0).is_none());
        assert!(NodeId(0).is_some());
    }

    #[test]
    fn test_new_root() {
        let node = Node::new_root(7, None);

        assert!(node.parent.is_none());
        assert!(node.mv.is_none());
        assert_eq!(node.visit_count, 0);
        assert!((node.prior - 1.0).abs() < 1e-6);
        assert!(!node.is_terminal);
        assert!(node.children.is_empty());
        assert_eq!(node.state, 7);
    }

    #[test]
    fn test_terminal_child() {
        let node = Node::new_child(NodeId(0), 3, 0.2, 9, Some(-1.0));
        assert!(node.is_terminal);
        assert!((node.terminal_value + 1.0).abs() < 1e-6);
        assert_eq!(node.mv, Some(3));
        assert!(node.is_leaf());
    }

    #[test]
    fn test_mean_value() {
        let mut node = Node::new_root(0, None);
        assert!((node.mean_value()).abs() < 1e-6);

        node.visit_count = 4;
        node.value_sum = 2.0;
        assert!((node.mean_value() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ucb_score() {
        let mut node = Node::new_root(0, None);
        node.prior = 0.5;
        node.visit_count = 10;
        node.value_sum = 5.0; // Q from the node's own perspective = 0.5

        // UCB = -0.5 + 1.0 * 0.5 * 10 / 11 ≈ -0.0455
        let ucb = node.ucb_score(10.0, 1.0);
        assert!((ucb - (-0.0455)).abs() < 0.01);
    }

    #[test]
    fn test_virtual_loss_lowers_score() {
        let mut node = Node::new_root(0, None);
        node.prior = 0.5;
        let clean = node.ucb_score(2.0, 1.0);
        node.virtual_loss = 1.0;
        assert!((clean - node.ucb_score(2.0, 1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_is_leaf() {
        let mut node = Node::new_root(0, None);
        assert!(node.is_leaf());

        node.expanded = true;
        node.children.push(NodeId(1));
        assert!(!node.is_leaf());

        // Terminal nodes are always leaves
        node.is_terminal = true;
        assert!(node.is_leaf());
    }
}
