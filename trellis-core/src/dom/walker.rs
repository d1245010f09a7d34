//! Preorder walker over elements and comments.

use super::{Document, NodeId, NodeType};

/// Visits the element and comment descendants of a root in document order.
///
/// Text nodes are skipped, which keeps visit indices stable against
/// whitespace differences between parsing and cloning.
pub struct TreeWalker<'d> {
    doc: &'d Document,
    root: NodeId,
    current: NodeId,
}

impl<'d> TreeWalker<'d> {
    pub fn new(doc: &'d Document, root: NodeId) -> Self {
        Self {
            doc,
            root,
            current: root,
        }
    }

    /// The node most recently returned (the root before the first call).
    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Advance to the next element or comment.
    pub fn next_node(&mut self) -> Option<NodeId> {
        loop {
            let next = self.advance()?;
            self.current = next;
            if matches!(
                self.doc.node_type(next),
                Some(NodeType::Element | NodeType::Comment)
            ) {
                return Some(next);
            }
        }
    }

    fn advance(&self) -> Option<NodeId> {
        if let Some(child) = self.doc.first_child(self.current) {
            return Some(child);
        }
        let mut node = self.current;
        while node != self.root {
            if let Some(sibling) = self.doc.next_sibling(node) {
                return Some(sibling);
            }
            node = self.doc.parent(node)?;
        }
        None
    }
}
