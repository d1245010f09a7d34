//! Owned node trees.
//!
//! A [`Fragment`] is the parsed form of template HTML. It belongs to no
//! document; templates keep one and import a fresh copy per instance with
//! [`Document::import_fragment`](super::Document::import_fragment).

use super::Namespace;

/// A detached, owned list of nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fragment {
    pub children: Vec<FragmentNode>,
}

/// A node of a [`Fragment`].
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentNode {
    Element(FragmentElement),
    Text(String),
    Comment(String),
}

/// An element of a [`Fragment`]. Attributes keep source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentElement {
    pub tag: String,
    pub namespace: Namespace,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<FragmentNode>,
}

impl FragmentElement {
    pub fn new(tag: impl Into<String>, namespace: Namespace) -> Self {
        Self {
            tag: tag.into(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove an attribute, returning its value.
    pub fn take_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(pos).1)
    }
}

impl Fragment {
    /// Count elements and comments, the nodes a [`TreeWalker`](super::TreeWalker) visits.
    pub fn walkable_count(&self) -> usize {
        fn count(nodes: &[FragmentNode]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    FragmentNode::Element(el) => 1 + count(&el.children),
                    FragmentNode::Comment(_) => 1,
                    FragmentNode::Text(_) => 0,
                })
                .sum()
        }
        count(&self.children)
    }
}
