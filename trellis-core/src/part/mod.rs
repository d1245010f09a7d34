//! Bindings
//!
//! A [`Part`] is the live association between one DOM location and the value
//! last committed there. Every binding position of a template instance gets
//! one, and every render root owns a child part.
//!
//! # Kinds
//!
//! The set of binding kinds is closed, so a part is one `Rc<RefCell<_>>`
//! over an enum and dispatch is a `match`:
//!
//! - **Child**: a range of nodes between a start marker and an end node.
//!   Commits text, nodes, nested template instances and lists.
//! - **Attribute**, **Property**, **Boolean**: write to one element, through
//!   `set_attribute`, element properties and `toggle_attribute`. An
//!   attribute can interpolate several expressions between static strings.
//! - **Event**: keeps one dispatcher registered on the element and swaps the
//!   listener it forwards to.
//! - **Element**: no DOM effect, only a place for directives to live.
//!
//! # Change detection
//!
//! Parts remember what they committed and compare new values with
//! [`Value::same`]. A value equal to the committed one, or `NoChange`,
//! writes nothing.
//!
//! # Connection
//!
//! All parts below a render root share one connection flag. Changing it
//! through [`Part::set_connected`] on the root tells every directive in the
//! tree; content removed by a commit disconnects its directives.

mod attribute;
mod child;
mod element;
mod event;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::render::RenderOptions;
use crate::template::AttributeKind;
use crate::value::Value;

use attribute::AttributePart;
use child::ChildPart;
use element::ElementPart;
use event::EventPart;

/// The kind of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartKind {
    Child,
    Attribute,
    Property,
    Boolean,
    Event,
    Element,
}

/// What every part below one render root shares.
#[derive(Clone)]
pub(crate) struct PartContext {
    pub(crate) document: Document,
    pub(crate) options: Rc<RenderOptions>,
    pub(crate) connected: Rc<Cell<bool>>,
}

pub(crate) enum Binding {
    Child(ChildPart),
    Attribute(AttributePart),
    Property(AttributePart),
    Boolean(AttributePart),
    Event(EventPart),
    Element(ElementPart),
}

/// Handle to a live binding. Clones share the binding.
#[derive(Clone)]
pub struct Part {
    inner: Rc<RefCell<Binding>>,
}

/// A weak handle to a part, held by async directives.
#[derive(Clone, Default)]
pub struct PartRef(Weak<RefCell<Binding>>);

impl PartRef {
    /// A reference that never upgrades.
    pub fn dangling() -> Self {
        Self(Weak::new())
    }

    pub fn upgrade(&self) -> Option<Part> {
        self.0.upgrade().map(|inner| Part { inner })
    }
}

impl Part {
    /// A render root's child part.
    pub(crate) fn root(ctx: PartContext, start: NodeId, end: Option<NodeId>) -> Self {
        Self::new(|this| Binding::Child(ChildPart::new(ctx, this, start, end, true)))
    }

    /// A child part between `start` and `end`.
    pub(crate) fn child(ctx: PartContext, start: NodeId, end: Option<NodeId>) -> Self {
        Self::new(|this| Binding::Child(ChildPart::new(ctx, this, start, end, false)))
    }

    /// An attribute-position part on `element`.
    pub(crate) fn attribute(
        ctx: PartContext,
        kind: AttributeKind,
        element: NodeId,
        name: &str,
        strings: Rc<[String]>,
    ) -> Self {
        Self::new(|this| match kind {
            AttributeKind::Attribute => Binding::Attribute(AttributePart::new(
                ctx,
                this,
                PartKind::Attribute,
                element,
                name,
                strings,
            )),
            AttributeKind::Property => Binding::Property(AttributePart::new(
                ctx,
                this,
                PartKind::Property,
                element,
                name,
                strings,
            )),
            AttributeKind::Boolean => Binding::Boolean(AttributePart::new(
                ctx,
                this,
                PartKind::Boolean,
                element,
                name,
                strings,
            )),
            AttributeKind::Event => Binding::Event(EventPart::new(ctx, this, element, name)),
        })
    }

    /// An element-position part on `element`.
    pub(crate) fn element_at(ctx: PartContext, element: NodeId) -> Self {
        Self::new(|this| Binding::Element(ElementPart::new(ctx, this, element)))
    }

    fn new(build: impl FnOnce(PartRef) -> Binding) -> Self {
        let inner = Rc::new_cyclic(|weak| RefCell::new(build(PartRef(weak.clone()))));
        Self { inner }
    }

    /// Commit a value.
    ///
    /// Multi-expression attribute parts take a [`Value::List`] with one
    /// value per expression.
    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        match &mut *self.inner.borrow_mut() {
            Binding::Child(part) => part.set_value(value, 0),
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                if part.is_multi() {
                    let values = match value {
                        Value::List(values) => values,
                        other => vec![other],
                    };
                    part.set_values(values)
                } else {
                    part.set_value(value, 0)
                }
            }
            Binding::Event(part) => part.set_value(value, 0),
            Binding::Element(part) => part.set_value(value, 0),
        }
    }

    /// Commit the values of a multi-expression attribute.
    pub(crate) fn set_values(&self, values: Vec<Value>) -> Result<()> {
        let mut binding = self.inner.borrow_mut();
        match &mut *binding {
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                part.set_values(values)
            }
            _ => {
                drop(binding);
                let value = values.into_iter().next().unwrap_or(Value::Nothing);
                self.set_value(value)
            }
        }
    }

    /// Commit a value produced by the directive at `level - 1` of the slot
    /// selected by `attribute_index`.
    pub(crate) fn push_value(
        &self,
        value: Value,
        attribute_index: Option<usize>,
        level: usize,
    ) -> Result<()> {
        let Ok(mut binding) = self.inner.try_borrow_mut() else {
            tracing::warn!(kind = ?self.kind(), "part is busy, dropping pushed value");
            return Ok(());
        };
        match &mut *binding {
            Binding::Child(part) => part.set_value(value, level),
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                part.push_value(value, attribute_index, level)
            }
            Binding::Event(part) => part.set_value(value, level),
            Binding::Element(part) => part.set_value(value, level),
        }
    }

    pub fn kind(&self) -> PartKind {
        match &*self.inner.borrow() {
            Binding::Child(_) => PartKind::Child,
            Binding::Attribute(_) => PartKind::Attribute,
            Binding::Property(_) => PartKind::Property,
            Binding::Boolean(_) => PartKind::Boolean,
            Binding::Event(_) => PartKind::Event,
            Binding::Element(_) => PartKind::Element,
        }
    }

    pub fn downgrade(&self) -> PartRef {
        PartRef(Rc::downgrade(&self.inner))
    }

    /// Whether both handles point at the same binding.
    pub fn ptr_eq(&self, other: &Part) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Change the connection state of a render root and every directive
    /// below it. Ignored on parts that are not render roots.
    pub fn set_connected(&self, connected: bool) {
        let ctx = match &*self.inner.borrow() {
            Binding::Child(part) if part.is_root() => part.context().clone(),
            _ => {
                tracing::debug!("set_connected ignored on a non-root part");
                return;
            }
        };
        if ctx.connected.replace(connected) == connected {
            return;
        }
        self.notify_connection(connected);
    }

    pub fn is_connected(&self) -> bool {
        self.with_context(|ctx| ctx.connected.get())
    }

    /// Tell the directives of this part and of its content about a
    /// connection change.
    pub(crate) fn notify_connection(&self, connected: bool) {
        let Ok(mut binding) = self.inner.try_borrow_mut() else {
            return;
        };
        match &mut *binding {
            Binding::Child(part) => part.notify_connection(connected),
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                part.notify_connection(connected)
            }
            Binding::Event(part) => part.notify_connection(connected),
            Binding::Element(part) => part.notify_connection(connected),
        }
    }

    /// The element a non-child part writes to, or the parent node of a
    /// child part's range.
    pub fn element(&self) -> Option<NodeId> {
        match &*self.inner.borrow() {
            Binding::Child(part) => part.parent_node(),
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                Some(part.element())
            }
            Binding::Event(part) => Some(part.element()),
            Binding::Element(part) => Some(part.element()),
        }
    }

    /// Attribute, property or event name.
    pub fn name(&self) -> Option<String> {
        match &*self.inner.borrow() {
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                Some(part.name().to_string())
            }
            Binding::Event(part) => Some(part.name().to_string()),
            Binding::Child(_) | Binding::Element(_) => None,
        }
    }

    /// Number of template values the part consumes.
    pub fn value_count(&self) -> usize {
        match &*self.inner.borrow() {
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                part.value_count()
            }
            _ => 1,
        }
    }

    /// Start marker of a child part.
    pub fn start_node(&self) -> Option<NodeId> {
        match &*self.inner.borrow() {
            Binding::Child(part) => Some(part.start()),
            _ => None,
        }
    }

    /// End node of a child part; `None` means the end of the parent.
    pub fn end_node(&self) -> Option<NodeId> {
        match &*self.inner.borrow() {
            Binding::Child(part) => part.end(),
            _ => None,
        }
    }

    /// The item parts of a child part that committed a list.
    pub fn committed_items(&self) -> Option<Vec<Part>> {
        match &*self.inner.borrow() {
            Binding::Child(part) => part.committed_items(),
            _ => None,
        }
    }

    /// Remove the content of a child part and forget what was committed.
    pub fn clear(&self) {
        if let Binding::Child(part) = &mut *self.inner.borrow_mut() {
            part.clear();
        }
    }

    /// Detach the caller-owned nodes committed at or below a child part.
    pub(crate) fn disown(&self) {
        let Ok(mut binding) = self.inner.try_borrow_mut() else {
            return;
        };
        if let Binding::Child(part) = &mut *binding {
            part.disown();
        }
    }

    fn with_context<R>(&self, f: impl FnOnce(&PartContext) -> R) -> R {
        match &*self.inner.borrow() {
            Binding::Child(part) => f(part.context()),
            Binding::Attribute(part) | Binding::Property(part) | Binding::Boolean(part) => {
                f(part.context())
            }
            Binding::Event(part) => f(part.context()),
            Binding::Element(part) => f(part.context()),
        }
    }
}

impl std::fmt::Debug for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_borrow() {
            Ok(_) => f
                .debug_struct("Part")
                .field("kind", &self.kind())
                .field("name", &self.name())
                .finish(),
            Err(_) => f.write_str("Part(<busy>)"),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn context(doc: &Document) -> PartContext {
        doc.record_mutations(true);
        PartContext {
            document: doc.clone(),
            options: Rc::new(RenderOptions::default()),
            connected: Rc::new(Cell::new(true)),
        }
    }

    /// A child part spanning the whole of a fresh `<div>`.
    pub(crate) fn child_part(doc: &Document) -> (Part, NodeId) {
        let container = doc.create_element("div").unwrap();
        let start = doc.create_comment("").unwrap();
        doc.append_child(container, start).unwrap();
        (Part::root(context(doc), start, None), container)
    }

    #[test]
    fn kinds_follow_attribute_sigils() {
        let doc = Document::new();
        let el = doc.create_element("input").unwrap();
        let strings: Rc<[String]> = vec![String::new(), String::new()].into();
        let kinds: Vec<_> = [
            AttributeKind::Attribute,
            AttributeKind::Property,
            AttributeKind::Boolean,
            AttributeKind::Event,
        ]
        .into_iter()
        .map(|kind| Part::attribute(context(&doc), kind, el, "x", strings.clone()).kind())
        .collect();
        assert_eq!(
            kinds,
            vec![
                PartKind::Attribute,
                PartKind::Property,
                PartKind::Boolean,
                PartKind::Event
            ]
        );
        assert_eq!(Part::element_at(context(&doc), el).kind(), PartKind::Element);
    }

    #[test]
    fn weak_refs_die_with_the_part() {
        let doc = Document::new();
        let (part, _) = child_part(&doc);
        let weak = part.downgrade();
        assert!(weak.upgrade().is_some_and(|p| p.ptr_eq(&part)));
        drop(part);
        assert!(weak.upgrade().is_none());
        assert!(PartRef::dangling().upgrade().is_none());
    }

    #[test]
    fn set_connected_only_applies_to_roots() {
        let doc = Document::new();
        let (root, _) = child_part(&doc);
        root.set_connected(false);
        assert!(!root.is_connected());

        let el = doc.create_element("p").unwrap();
        let part = Part::element_at(context(&doc), el);
        part.set_connected(false);
        assert!(part.is_connected());
    }
}
