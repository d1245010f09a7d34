//! Document Model
//!
//! The engine patches a live node tree. This module provides that tree: a
//! single-threaded, arena-backed document with exactly the surface the
//! template engine and the update scheduler need.
//!
//! # Layout
//!
//! Every node lives in one arena slot addressed by a [`NodeId`]. Nodes are
//! linked to their parent and siblings, so moving a node, finding the next
//! sibling, or removing a range of siblings are all O(1) per node.
//!
//! A removed node stays addressable so it can be re-inserted (a committed
//! DOM node value, a cached fragment, and so on). Only
//! [`release`](Document::release) frees slots: the released subtree's slots
//! go on a free list and are handed out again by later creations. Every id
//! carries the generation of its slot, so an id that outlived its node
//! resolves to nothing instead of to the slot's next occupant.
//!
//! # Observing writes
//!
//! With [`record_mutations`](Document::record_mutations) switched on, every
//! mutation is appended to a log ([`MutationRecord`]). Tests use the log to
//! assert that a re-render touched nothing, or touched exactly one node. The
//! log is off by default.
//!
//! # Sharing
//!
//! [`Document`] is a cheap handle (`Rc`) so every binding can keep one. No
//! borrow of the arena is held while user callbacks (event listeners,
//! attribute observers) run.

mod event;
mod fragment;
mod parser;
mod serialize;
mod walker;

pub use event::{Event, EventListener, ListenerOptions};
pub use fragment::{Fragment, FragmentElement, FragmentNode};
pub use parser::{is_raw_text_element, is_void_element, parse_fragment};
pub use walker::TreeWalker;

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{DomError, Result};
use crate::value::Value;

use event::RegisteredListener;

/// Address of a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    /// Build a first-generation id from its raw arena index.
    pub fn from_raw(raw: u32) -> Self {
        Self {
            index: raw,
            generation: 0,
        }
    }

    /// Get the raw arena index.
    pub fn raw(&self) -> u32 {
        self.index
    }

    /// How many times the slot was released before this node took it.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn index(self) -> usize {
        self.index as usize
    }
}

/// Namespace of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

/// The kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Document,
    Element,
    Text,
    Comment,
    Fragment,
    ShadowRoot,
}

/// A single recorded DOM write.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationRecord {
    /// Children were inserted into or removed from `target`.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// An attribute of `target` was set, removed or toggled.
    Attribute { target: NodeId, name: String },
    /// The data of a text or comment node changed.
    CharacterData { target: NodeId },
    /// An element property was assigned.
    Property { target: NodeId, name: String },
    /// An event listener was added (`added == true`) or removed.
    Listener {
        target: NodeId,
        event_type: String,
        added: bool,
    },
}

/// Callback invoked after an observed element's attribute changes.
///
/// Arguments are the attribute name, the old value and the new value.
pub type AttributeObserver = Rc<dyn Fn(&str, Option<&str>, Option<&str>)>;

#[derive(Debug)]
struct ElementData {
    tag: String,
    namespace: Namespace,
    attributes: IndexMap<String, String>,
    properties: HashMap<String, Value>,
    shadow_root: Option<NodeId>,
}

enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
    Fragment,
    ShadowRoot { host: NodeId },
}

struct NodeData {
    generation: u32,
    kind: NodeKind,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    listeners: Vec<RegisteredListener>,
    part_slot: Option<Rc<dyn Any>>,
}

impl NodeData {
    fn new(kind: NodeKind, generation: u32) -> Self {
        Self {
            generation,
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            listeners: Vec::new(),
            part_slot: None,
        }
    }
}

struct Arena {
    nodes: Vec<NodeData>,
    free: Vec<u32>,
    mutations: Vec<MutationRecord>,
    record_mutations: bool,
    observers: HashMap<NodeId, AttributeObserver>,
}

impl Arena {
    /// The live node behind `id`; stale ids resolve to nothing.
    fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes
            .get(id.index())
            .filter(|node| node.generation == id.generation)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .filter(|node| node.generation == id.generation)
    }

    fn node(&self, id: NodeId) -> std::result::Result<&NodeData, DomError> {
        self.get(id).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> std::result::Result<&mut NodeData, DomError> {
        self.get_mut(id).ok_or(DomError::UnknownNode(id))
    }

    fn push(&mut self, kind: NodeKind) -> std::result::Result<NodeId, DomError> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.nodes[index as usize];
            let generation = slot.generation;
            *slot = NodeData::new(kind, generation);
            return Ok(NodeId { index, generation });
        }
        let index = u32::try_from(self.nodes.len()).map_err(|_| DomError::ArenaFull)?;
        self.nodes.push(NodeData::new(kind, 0));
        Ok(NodeId {
            index,
            generation: 0,
        })
    }

    /// Free `id` and everything below it, shadow roots included.
    ///
    /// The caller detaches `id` first.
    fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            if let Some(shadow) = self.element(current).and_then(|el| el.shadow_root) {
                stack.push(shadow);
            }
            let slot = &mut self.nodes[current.index()];
            *slot = NodeData::new(NodeKind::Fragment, slot.generation.wrapping_add(1));
            self.observers.remove(&current);
            self.free.push(current.index);
        }
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.get(id).map(|n| &n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.get_mut(id).map(|n| &mut n.kind) {
            Some(NodeKind::Element(el)) => Some(el),
            _ => None,
        }
    }

    /// Unlink `id` from its parent, if any.
    fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent?, node.prev_sibling, node.next_sibling)
        };
        match prev {
            Some(prev) => self.nodes[prev.index()].next_sibling = next,
            None => self.nodes[parent.index()].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next.index()].prev_sibling = prev,
            None => self.nodes[parent.index()].last_child = prev,
        }
        let node = &mut self.nodes[id.index()];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
        Some(parent)
    }

    /// Link a detached node into `parent` before `reference`.
    fn link(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        let prev = match reference {
            Some(reference) => self.nodes[reference.index()].prev_sibling,
            None => self.nodes[parent.index()].last_child,
        };
        {
            let data = &mut self.nodes[node.index()];
            data.parent = Some(parent);
            data.prev_sibling = prev;
            data.next_sibling = reference;
        }
        match prev {
            Some(prev) => self.nodes[prev.index()].next_sibling = Some(node),
            None => self.nodes[parent.index()].first_child = Some(node),
        }
        match reference {
            Some(reference) => self.nodes[reference.index()].prev_sibling = Some(node),
            None => self.nodes[parent.index()].last_child = Some(node),
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node.index()].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut child = self.nodes[id.index()].first_child;
        while let Some(c) = child {
            out.push(c);
            child = self.nodes[c.index()].next_sibling;
        }
        out
    }

    fn record(&mut self, record: MutationRecord) {
        if self.record_mutations {
            self.mutations.push(record);
        }
    }
}

/// Handle to a document.
///
/// Cloning the handle shares the document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<Arena>>,
}

impl Document {
    /// Create an empty document. Its root node is [`Document::root`].
    pub fn new() -> Self {
        let arena = Arena {
            nodes: vec![NodeData::new(NodeKind::Document, 0)],
            free: Vec::new(),
            mutations: Vec::new(),
            record_mutations: false,
            observers: HashMap::new(),
        };
        Self {
            inner: Rc::new(RefCell::new(arena)),
        }
    }

    /// The document node. Nodes reachable from it are connected.
    pub fn root(&self) -> NodeId {
        NodeId::from_raw(0)
    }

    /// Whether two handles refer to the same document.
    pub fn ptr_eq(&self, other: &Document) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create a detached HTML element. The tag name is lowercased.
    ///
    /// Creation fails with [`DomError::ArenaFull`] once every addressable
    /// slot holds a live node; the same goes for the other constructors.
    pub fn create_element(&self, tag: &str) -> Result<NodeId> {
        self.create_element_ns(&tag.to_ascii_lowercase(), Namespace::Html)
    }

    /// Create a detached element in the given namespace, keeping the tag as given.
    pub fn create_element_ns(&self, tag: &str, namespace: Namespace) -> Result<NodeId> {
        let kind = NodeKind::Element(ElementData {
            tag: tag.to_string(),
            namespace,
            attributes: IndexMap::new(),
            properties: HashMap::new(),
            shadow_root: None,
        });
        self.inner.borrow_mut().push(kind).map_err(Into::into)
    }

    /// Create a detached text node.
    pub fn create_text(&self, data: &str) -> Result<NodeId> {
        self.inner
            .borrow_mut()
            .push(NodeKind::Text(data.to_string()))
            .map_err(Into::into)
    }

    /// Create a detached comment node.
    pub fn create_comment(&self, data: &str) -> Result<NodeId> {
        self.inner
            .borrow_mut()
            .push(NodeKind::Comment(data.to_string()))
            .map_err(Into::into)
    }

    /// Create an empty document fragment.
    pub fn create_fragment(&self) -> Result<NodeId> {
        self.inner.borrow_mut().push(NodeKind::Fragment).map_err(Into::into)
    }

    /// Attach a shadow root to `host`, or return the existing one.
    pub fn attach_shadow(&self, host: NodeId) -> Result<NodeId> {
        let mut arena = self.inner.borrow_mut();
        if let Some(existing) = arena.element(host).and_then(|el| el.shadow_root) {
            return Ok(existing);
        }
        if arena.element(host).is_none() {
            return Err(DomError::UnknownNode(host).into());
        }
        let root = arena.push(NodeKind::ShadowRoot { host })?;
        if let Some(el) = arena.element_mut(host) {
            el.shadow_root = Some(root);
        }
        Ok(root)
    }

    /// The shadow root attached to `host`, if any.
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.inner.borrow().element(host).and_then(|el| el.shadow_root)
    }

    /// Deep-copy an owned fragment into this document as a new fragment node.
    pub fn import_fragment(&self, fragment: &Fragment) -> Result<NodeId> {
        let mut arena = self.inner.borrow_mut();
        let root = arena.push(NodeKind::Fragment)?;
        for child in &fragment.children {
            import_node(&mut arena, root, child)?;
        }
        Ok(root)
    }

    /// Clone a node, optionally with its subtree.
    ///
    /// Attributes are copied; properties, listeners and shadow roots are not.
    pub fn clone_node(&self, id: NodeId, deep: bool) -> Result<NodeId> {
        let mut arena = self.inner.borrow_mut();
        arena.node(id)?;
        clone_into(&mut arena, id, deep).map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Tree queries
    // ------------------------------------------------------------------

    /// The kind of `id`.
    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        let arena = self.inner.borrow();
        let node = arena.get(id)?;
        Some(match node.kind {
            NodeKind::Document => NodeType::Document,
            NodeKind::Element(_) => NodeType::Element,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Comment(_) => NodeType::Comment,
            NodeKind::Fragment => NodeType::Fragment,
            NodeKind::ShadowRoot { .. } => NodeType::ShadowRoot,
        })
    }

    /// The tag name of an element, as stored (lowercase for HTML).
    pub fn tag_name(&self, id: NodeId) -> Option<String> {
        self.inner.borrow().element(id).map(|el| el.tag.clone())
    }

    /// The namespace of an element.
    pub fn namespace(&self, id: NodeId) -> Option<Namespace> {
        self.inner.borrow().element(id).map(|el| el.namespace)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.inner.borrow().get(id)?.parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.inner.borrow().get(id)?.first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.inner.borrow().get(id)?.last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.inner.borrow().get(id)?.next_sibling
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.inner.borrow().get(id)?.prev_sibling
    }

    /// The children of `id` in order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let arena = self.inner.borrow();
        if arena.get(id).is_none() {
            return Vec::new();
        }
        arena.children(id)
    }

    /// The host element of a shadow root.
    pub fn shadow_host(&self, id: NodeId) -> Option<NodeId> {
        match self.inner.borrow().get(id)?.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            _ => None,
        }
    }

    /// Whether `id` is reachable from the document root, crossing shadow
    /// boundaries through their hosts.
    pub fn is_connected(&self, id: NodeId) -> bool {
        let arena = self.inner.borrow();
        let mut current = id;
        loop {
            let Some(node) = arena.get(current) else {
                return false;
            };
            match (&node.kind, node.parent) {
                (NodeKind::Document, _) => return true,
                (NodeKind::ShadowRoot { host }, _) => current = *host,
                (_, Some(parent)) => current = parent,
                (_, None) => return false,
            }
        }
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    /// Insert `node` into `parent` before `reference` (or at the end).
    ///
    /// Inserting a fragment moves its children and leaves it empty.
    pub fn insert_before(
        &self,
        parent: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId> {
        let mut arena = self.inner.borrow_mut();
        arena.node(parent)?;
        let is_fragment = matches!(arena.node(node)?.kind, NodeKind::Fragment);
        if let Some(reference) = reference {
            if arena.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                }
                .into());
            }
        }
        if arena.is_inclusive_ancestor(node, parent)
            || matches!(arena.node(node)?.kind, NodeKind::Document | NodeKind::ShadowRoot { .. })
        {
            return Err(DomError::HierarchyRequest { parent, node }.into());
        }

        let mut reference = reference;
        if reference == Some(node) {
            reference = arena.nodes[node.index()].next_sibling;
        }

        let moved = if is_fragment {
            arena.children(node)
        } else {
            vec![node]
        };
        for &child in &moved {
            if let Some(old_parent) = arena.detach(child) {
                arena.record(MutationRecord::ChildList {
                    target: old_parent,
                    added: Vec::new(),
                    removed: vec![child],
                });
            }
            arena.link(parent, child, reference);
        }
        if !moved.is_empty() {
            arena.record(MutationRecord::ChildList {
                target: parent,
                added: moved,
                removed: Vec::new(),
            });
        }
        Ok(node)
    }

    /// Append `node` as the last child of `parent`.
    pub fn append_child(&self, parent: NodeId, node: NodeId) -> Result<NodeId> {
        self.insert_before(parent, node, None)
    }

    /// Detach `node` and free it with its whole subtree.
    ///
    /// Ids of released nodes go stale and their slots are reused by later
    /// creations. Releasing the document node or a stale id does nothing.
    pub fn release(&self, node: NodeId) {
        let mut arena = self.inner.borrow_mut();
        if node == self.root() || arena.get(node).is_none() {
            return;
        }
        if let Some(parent) = arena.detach(node) {
            arena.record(MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![node],
            });
        }
        arena.free_subtree(node);
    }

    /// Number of live nodes, the document node included.
    pub fn node_count(&self) -> usize {
        let arena = self.inner.borrow();
        arena.nodes.len() - arena.free.len()
    }

    /// Detach `node` from its parent. Detached nodes are left alone.
    pub fn remove(&self, node: NodeId) {
        let mut arena = self.inner.borrow_mut();
        if arena.get(node).is_none() {
            return;
        }
        if let Some(parent) = arena.detach(node) {
            arena.record(MutationRecord::ChildList {
                target: parent,
                added: Vec::new(),
                removed: vec![node],
            });
        }
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    /// The data of a text or comment node.
    pub fn data(&self, id: NodeId) -> Option<String> {
        match &self.inner.borrow().get(id)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => Some(data.clone()),
            _ => None,
        }
    }

    /// Replace the data of a text or comment node.
    pub fn set_data(&self, id: NodeId, value: &str) -> Result<()> {
        let mut arena = self.inner.borrow_mut();
        match &mut arena.node_mut(id)?.kind {
            NodeKind::Text(data) | NodeKind::Comment(data) => {
                value.clone_into(data);
            }
            _ => return Ok(()),
        }
        arena.record(MutationRecord::CharacterData { target: id });
        Ok(())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        let arena = self.inner.borrow();
        let mut out = String::new();
        collect_text(&arena, id, &mut out);
        out
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.inner
            .borrow()
            .element(id)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.inner
            .borrow()
            .element(id)
            .is_some_and(|el| el.attributes.contains_key(name))
    }

    /// Attribute names in source order.
    pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
        self.inner
            .borrow()
            .element(id)
            .map(|el| el.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Set an attribute, notifying an attribute observer on the element.
    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) {
        let (old, observer) = {
            let mut arena = self.inner.borrow_mut();
            let Some(el) = arena.element_mut(id) else {
                return;
            };
            let old = el.attributes.insert(name.to_string(), value.to_string());
            arena.record(MutationRecord::Attribute {
                target: id,
                name: name.to_string(),
            });
            (old, arena.observers.get(&id).cloned())
        };
        if let Some(observer) = observer {
            observer(name, old.as_deref(), Some(value));
        }
    }

    /// Remove an attribute. Removing a missing attribute records nothing.
    pub fn remove_attribute(&self, id: NodeId, name: &str) {
        let (old, observer) = {
            let mut arena = self.inner.borrow_mut();
            let Some(el) = arena.element_mut(id) else {
                return;
            };
            let Some(old) = el.attributes.shift_remove(name) else {
                return;
            };
            arena.record(MutationRecord::Attribute {
                target: id,
                name: name.to_string(),
            });
            (old, arena.observers.get(&id).cloned())
        };
        if let Some(observer) = observer {
            observer(name, Some(&old), None);
        }
    }

    /// Add or remove an empty-valued attribute. Returns presence afterwards.
    ///
    /// Only writes when presence actually changes.
    pub fn toggle_attribute(&self, id: NodeId, name: &str, force: bool) -> bool {
        let present = self.has_attribute(id, name);
        match (present, force) {
            (false, true) => self.set_attribute(id, name, ""),
            (true, false) => self.remove_attribute(id, name),
            _ => {}
        }
        force
    }

    /// Register the observer notified after attributes of `id` change.
    pub fn observe_attributes(&self, id: NodeId, observer: AttributeObserver) {
        self.inner.borrow_mut().observers.insert(id, observer);
    }

    /// Drop the attribute observer of `id`.
    pub fn unobserve_attributes(&self, id: NodeId) {
        self.inner.borrow_mut().observers.remove(&id);
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Assign an element property.
    pub fn set_property(&self, id: NodeId, name: &str, value: Value) {
        let mut arena = self.inner.borrow_mut();
        let Some(el) = arena.element_mut(id) else {
            return;
        };
        el.properties.insert(name.to_string(), value);
        arena.record(MutationRecord::Property {
            target: id,
            name: name.to_string(),
        });
    }

    /// Read an element property.
    pub fn property(&self, id: NodeId, name: &str) -> Option<Value> {
        self.inner
            .borrow()
            .element(id)
            .and_then(|el| el.properties.get(name).cloned())
    }

    /// Remove and return an element property.
    pub fn take_property(&self, id: NodeId, name: &str) -> Option<Value> {
        self.inner
            .borrow_mut()
            .element_mut(id)
            .and_then(|el| el.properties.remove(name))
    }

    // ------------------------------------------------------------------
    // Part slots
    // ------------------------------------------------------------------

    /// Opaque per-node storage used by render roots.
    pub fn part_slot(&self, id: NodeId) -> Option<Rc<dyn Any>> {
        self.inner.borrow().get(id)?.part_slot.clone()
    }

    pub fn set_part_slot(&self, id: NodeId, slot: Rc<dyn Any>) {
        if let Some(node) = self.inner.borrow_mut().get_mut(id) {
            node.part_slot = Some(slot);
        }
    }

    // ------------------------------------------------------------------
    // Mutation log
    // ------------------------------------------------------------------

    /// Start or stop appending writes to the mutation log.
    ///
    /// Stopping keeps what was already recorded.
    pub fn record_mutations(&self, enabled: bool) {
        self.inner.borrow_mut().record_mutations = enabled;
    }

    /// Drain and return all recorded mutations.
    pub fn take_mutations(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.inner.borrow_mut().mutations)
    }

    /// Number of mutations recorded since the last drain.
    pub fn mutation_count(&self) -> usize {
        self.inner.borrow().mutations.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let arena = self.inner.borrow();
        f.debug_struct("Document")
            .field("nodes", &(arena.nodes.len() - arena.free.len()))
            .field("free_slots", &arena.free.len())
            .field("pending_mutations", &arena.mutations.len())
            .finish()
    }
}

fn import_node(
    arena: &mut Arena,
    parent: NodeId,
    node: &FragmentNode,
) -> std::result::Result<(), DomError> {
    let id = match node {
        FragmentNode::Element(el) => arena.push(NodeKind::Element(ElementData {
            tag: el.tag.clone(),
            namespace: el.namespace,
            attributes: el.attributes.iter().cloned().collect(),
            properties: HashMap::new(),
            shadow_root: None,
        }))?,
        FragmentNode::Text(data) => arena.push(NodeKind::Text(data.clone()))?,
        FragmentNode::Comment(data) => arena.push(NodeKind::Comment(data.clone()))?,
    };
    arena.link(parent, id, None);
    if let FragmentNode::Element(el) = node {
        for child in &el.children {
            import_node(arena, id, child)?;
        }
    }
    Ok(())
}

fn clone_into(
    arena: &mut Arena,
    id: NodeId,
    deep: bool,
) -> std::result::Result<NodeId, DomError> {
    let kind = match &arena.nodes[id.index()].kind {
        NodeKind::Element(el) => NodeKind::Element(ElementData {
            tag: el.tag.clone(),
            namespace: el.namespace,
            attributes: el.attributes.clone(),
            properties: HashMap::new(),
            shadow_root: None,
        }),
        NodeKind::Text(data) => NodeKind::Text(data.clone()),
        NodeKind::Comment(data) => NodeKind::Comment(data.clone()),
        NodeKind::Document | NodeKind::Fragment | NodeKind::ShadowRoot { .. } => {
            NodeKind::Fragment
        }
    };
    let copy = arena.push(kind)?;
    if deep {
        for child in arena.children(id) {
            let child_copy = clone_into(arena, child, true)?;
            arena.link(copy, child_copy, None);
        }
    }
    Ok(copy)
}

fn collect_text(arena: &Arena, id: NodeId, out: &mut String) {
    let Some(node) = arena.get(id) else {
        return;
    };
    if let NodeKind::Text(data) = &node.kind {
        out.push_str(data);
    }
    for child in arena.children(id) {
        collect_text(arena, child, out);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
