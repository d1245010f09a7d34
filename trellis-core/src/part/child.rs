//! Child bindings: a range of nodes between two markers.

use std::rc::Rc;

use super::{Part, PartContext, PartKind, PartRef};
use crate::directive::{DirectiveChain, PartInfo};
use crate::dom::{NodeId, NodeType};
use crate::error::{DomError, Error, Result};
use crate::sanitizer::{self, LazySanitizer, SanitizeContext, SanitizeTarget};
use crate::template::{Template, TemplateInstance, TemplateResult};
use crate::value::Value;

/// What a child part currently shows.
///
/// Text nodes, template instances and item markers are created by the part
/// and released when they go; a committed node belongs to the caller and is
/// only detached.
enum Committed {
    Nothing,
    /// A primitive or a stringified object, shown as one text node.
    Text(Value),
    Node(NodeId),
    Instance(TemplateInstance),
    Items(Vec<Part>),
}

impl Committed {
    /// Disconnect the directives of content from item `from` on.
    fn disconnect(&self, from: usize) {
        match self {
            Committed::Instance(instance) => instance.set_connected(false),
            Committed::Items(items) => {
                for item in items.iter().skip(from) {
                    item.notify_connection(false);
                }
            }
            Committed::Nothing | Committed::Text(_) | Committed::Node(_) => {}
        }
    }
}

pub(crate) struct ChildPart {
    ctx: PartContext,
    this: PartRef,
    start: NodeId,
    end: Option<NodeId>,
    is_root: bool,
    committed: Committed,
    directives: DirectiveChain,
    text_sanitizer: LazySanitizer,
}

impl ChildPart {
    pub(super) fn new(
        ctx: PartContext,
        this: PartRef,
        start: NodeId,
        end: Option<NodeId>,
        is_root: bool,
    ) -> Self {
        Self {
            ctx,
            this,
            start,
            end,
            is_root,
            committed: Committed::Nothing,
            directives: DirectiveChain::default(),
            text_sanitizer: LazySanitizer::default(),
        }
    }

    pub(super) fn context(&self) -> &PartContext {
        &self.ctx
    }

    pub(super) fn is_root(&self) -> bool {
        self.is_root
    }

    pub(super) fn start(&self) -> NodeId {
        self.start
    }

    pub(super) fn end(&self) -> Option<NodeId> {
        self.end
    }

    pub(super) fn parent_node(&self) -> Option<NodeId> {
        self.ctx.document.parent(self.start)
    }

    pub(super) fn committed_items(&self) -> Option<Vec<Part>> {
        match &self.committed {
            Committed::Items(items) => Some(items.clone()),
            _ => None,
        }
    }

    pub(super) fn set_value(&mut self, value: Value, level: usize) -> Result<()> {
        let info = PartInfo {
            kind: PartKind::Child,
            name: None,
            strings: None,
            element: self.ctx.document.parent(self.start),
            document: &self.ctx.document,
            connected: self.ctx.connected.get(),
            attribute_index: None,
            level,
            part: self.this.clone(),
            context: Some(&self.ctx),
        };
        let value = self.directives.resolve(value, &info, level)?;

        match value {
            Value::NoChange => Ok(()),
            Value::Nothing | Value::Null => {
                self.clear();
                Ok(())
            }
            Value::Str(ref s) if s.is_empty() => {
                self.clear();
                Ok(())
            }
            value if value.is_primitive() => {
                let unchanged = matches!(&self.committed, Committed::Text(current) if current.same(&value));
                if unchanged {
                    return Ok(());
                }
                self.commit_text(value)
            }
            Value::Template(result) => self.commit_template(result),
            Value::Node(node) => self.commit_node(node),
            Value::List(items) => self.commit_items(items),
            other => self.commit_text(other),
        }
    }

    pub(super) fn notify_connection(&mut self, connected: bool) {
        self.directives.set_connected(connected);
        match &self.committed {
            Committed::Instance(instance) => instance.set_connected(connected),
            Committed::Items(items) => {
                for item in items {
                    item.notify_connection(connected);
                }
            }
            Committed::Nothing | Committed::Text(_) | Committed::Node(_) => {}
        }
    }

    /// Remove everything between the markers.
    pub(super) fn clear(&mut self) {
        if matches!(self.committed, Committed::Nothing) {
            return;
        }
        let previous = std::mem::replace(&mut self.committed, Committed::Nothing);
        previous.disconnect(0);
        self.discard(previous);
    }

    /// Detach every caller-owned node committed at or below this part, so
    /// releasing the surrounding content leaves them intact.
    pub(super) fn disown(&mut self) {
        match &self.committed {
            Committed::Node(_) => {}
            Committed::Instance(instance) => {
                instance.disown();
                return;
            }
            Committed::Items(items) => {
                for item in items {
                    item.disown();
                }
                return;
            }
            Committed::Nothing | Committed::Text(_) => return,
        }
        let Committed::Node(node) = std::mem::replace(&mut self.committed, Committed::Nothing)
        else {
            return;
        };
        let doc = &self.ctx.document;
        let first = doc.next_sibling(self.start);
        if doc.node_type(node) != Some(NodeType::Fragment) {
            self.remove_from(first, false);
            return;
        }
        // A fragment value gets its nodes back, in order.
        let mut current = first;
        while let Some(child) = current.filter(|&c| Some(c) != self.end) {
            current = doc.next_sibling(child);
            if doc.append_child(node, child).is_err() {
                doc.remove(child);
            }
        }
    }

    /// Take `previous` out of the document.
    fn discard(&self, previous: Committed) {
        let release = match &previous {
            Committed::Nothing => return,
            Committed::Node(_) => false,
            Committed::Text(_) => true,
            Committed::Instance(instance) => {
                instance.disown();
                true
            }
            Committed::Items(items) => {
                for item in items {
                    item.disown();
                }
                true
            }
        };
        self.remove_from(self.ctx.document.next_sibling(self.start), release);
    }

    /// Remove the nodes from `first` up to the end node, releasing them to
    /// the document when `release` is set.
    fn remove_from(&self, first: Option<NodeId>, release: bool) {
        let doc = &self.ctx.document;
        let mut node = first;
        while let Some(current) = node {
            if Some(current) == self.end {
                break;
            }
            node = doc.next_sibling(current);
            if release {
                doc.release(current);
            } else {
                doc.remove(current);
            }
        }
    }

    /// Insert `node` just before the end node.
    fn insert(&self, node: NodeId) -> Result<NodeId> {
        let parent = self
            .ctx
            .document
            .parent(self.start)
            .ok_or(DomError::Detached(self.start))?;
        self.ctx.document.insert_before(parent, node, self.end)
    }

    fn check_forbidden(&self, node: NodeId) -> Result<()> {
        let doc = &self.ctx.document;
        let Some(parent) = doc.parent(self.start).and_then(|p| doc.tag_name(p)) else {
            return Ok(());
        };
        if parent != "style" && parent != "script" {
            return Ok(());
        }
        if sanitizer::is_installed() || doc.node_type(node) != Some(NodeType::Text) {
            return Err(Error::ForbiddenNode { parent });
        }
        Ok(())
    }

    fn commit_node(&mut self, node: NodeId) -> Result<()> {
        if matches!(self.committed, Committed::Node(current) if current == node) {
            return Ok(());
        }
        self.clear();
        self.check_forbidden(node)?;
        self.insert(node)?;
        self.committed = Committed::Node(node);
        tracing::trace!(node = node.raw(), "child part committed node");
        Ok(())
    }

    fn commit_text(&mut self, value: Value) -> Result<()> {
        let doc = self.ctx.document.clone();
        let reuse = match &self.committed {
            Committed::Text(current) if current.is_primitive() => doc.next_sibling(self.start),
            _ => None,
        };
        let node = match reuse {
            Some(node) => node,
            None => {
                let node = doc.create_text("")?;
                self.commit_node(node)?;
                node
            }
        };
        let text = self
            .text_sanitizer
            .apply(
                value.clone(),
                &SanitizeContext {
                    node,
                    tag_name: None,
                    name: "data",
                    target: SanitizeTarget::Text,
                },
            )
            .to_text();
        doc.set_data(node, &text)?;
        self.committed = Committed::Text(value);
        tracing::trace!(node = node.raw(), reused = reuse.is_some(), "child part committed text");
        Ok(())
    }

    fn commit_template(&mut self, result: TemplateResult) -> Result<()> {
        let template = Template::get_or_compile(&result)?;
        if let Committed::Instance(instance) = &mut self.committed {
            if Rc::ptr_eq(instance.template(), &template) {
                return instance.update(result.values);
            }
        }

        let mut instance = TemplateInstance::new(template);
        let fragment = instance.clone_into(&self.ctx)?;
        instance.update(result.values)?;
        self.commit_node(fragment)?;
        self.committed = Committed::Instance(instance);
        // Inserting emptied the fragment.
        self.ctx.document.release(fragment);
        Ok(())
    }

    fn commit_items(&mut self, values: Vec<Value>) -> Result<()> {
        let mut items = match std::mem::replace(&mut self.committed, Committed::Nothing) {
            Committed::Items(items) => items,
            previous => {
                previous.disconnect(0);
                self.discard(previous);
                Vec::new()
            }
        };
        let result = self.fill_items(&mut items, values);
        self.committed = Committed::Items(items);
        result
    }

    fn fill_items(&self, items: &mut Vec<Part>, values: Vec<Value>) -> Result<()> {
        let doc = &self.ctx.document;
        let mut count = 0;
        for value in values {
            if count == items.len() {
                let start = self.insert(doc.create_comment("")?)?;
                let end = self.insert(doc.create_comment("")?)?;
                items.push(Part::child(self.ctx.clone(), start, Some(end)));
            }
            items[count].set_value(value)?;
            count += 1;
        }

        if count < items.len() {
            let first = match count.checked_sub(1) {
                Some(last) => items[last].end_node().and_then(|end| doc.next_sibling(end)),
                None => doc.next_sibling(self.start),
            };
            for item in &items[count..] {
                item.notify_connection(false);
                item.disown();
            }
            self.remove_from(first, true);
            items.truncate(count);
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
