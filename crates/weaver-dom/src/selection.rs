//! DOM-level selection positions.

use serde::{Deserialize, Serialize};

use crate::node::{DomTree, NodeId};

/// A boundary point: a text node and a character offset, or an element and
/// a child index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DomPosition {
    pub node: NodeId,
    pub offset: usize,
}

impl DomPosition {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Position right before `node` in its parent.
    pub fn before(tree: &DomTree, node: NodeId) -> Option<Self> {
        let parent = tree.parent(node)?;
        Some(Self::new(parent, tree.index_in_parent(node)?))
    }

    /// Position right after `node` in its parent.
    pub fn after(tree: &DomTree, node: NodeId) -> Option<Self> {
        let parent = tree.parent(node)?;
        Some(Self::new(parent, tree.index_in_parent(node)? + 1))
    }

    /// The element the position lives in: the text node's parent, or the
    /// element itself.
    pub fn container_element(&self, tree: &DomTree) -> Option<NodeId> {
        if tree.is_element(self.node) {
            Some(self.node)
        } else {
            tree.parent(self.node)
        }
    }
}

/// A range selection on the live DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomSelection {
    pub start: DomPosition,
    pub end: DomPosition,
}

impl DomSelection {
    pub fn collapsed(position: DomPosition) -> Self {
        Self {
            start: position,
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_and_after() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let a = tree.create_text("a");
        let b = tree.create_text("b");
        tree.append_child(div, a);
        tree.append_child(div, b);

        assert_eq!(DomPosition::before(&tree, b), Some(DomPosition::new(div, 1)));
        assert_eq!(DomPosition::after(&tree, b), Some(DomPosition::new(div, 2)));
        assert_eq!(DomPosition::new(a, 1).container_element(&tree), Some(div));
        assert!(DomSelection::collapsed(DomPosition::new(a, 0)).is_collapsed());
    }
}
