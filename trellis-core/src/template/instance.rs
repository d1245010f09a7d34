//! Live template instances.
//!
//! An instance is one stamping of a [`Template`] into a document: a clone of
//! the template fragment plus one part per binding descriptor. The clone is
//! walked with the same element-and-comment walk the template used, so a
//! descriptor's index finds its node in the clone.

use std::rc::Rc;

use super::compiled::{PartDescriptor, Template};
use crate::dom::{NodeId, TreeWalker};
use crate::error::{Error, Result};
use crate::part::{Part, PartContext};
use crate::value::Value;

pub struct TemplateInstance {
    template: Rc<Template>,
    /// One entry per descriptor; comment bindings have no live part.
    parts: Vec<Option<Part>>,
}

impl TemplateInstance {
    pub(crate) fn new(template: Rc<Template>) -> Self {
        Self {
            template,
            parts: Vec::new(),
        }
    }

    /// The template this instance was stamped from.
    pub fn template(&self) -> &Rc<Template> {
        &self.template
    }

    pub fn parts(&self) -> &[Option<Part>] {
        &self.parts
    }

    /// Import the template fragment and create the parts. Returns the
    /// fragment node, ready to be inserted.
    pub(crate) fn clone_into(&mut self, ctx: &PartContext) -> Result<NodeId> {
        let doc = &ctx.document;
        let fragment = doc.import_fragment(self.template.fragment())?;
        let mut walker = TreeWalker::new(doc, fragment);
        let mut node = walker.next_node();
        let mut node_index = 0;

        let descriptors = self.template.parts();
        self.parts = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            while node_index < descriptor.index() {
                node = walker.next_node();
                node_index += 1;
            }
            let Some(current) = node else {
                return Err(Error::PartCountMismatch {
                    expected: descriptors.len(),
                    found: self.parts.len(),
                });
            };
            let part = match descriptor {
                PartDescriptor::Child { .. } => {
                    Some(Part::child(ctx.clone(), current, doc.next_sibling(current)))
                }
                PartDescriptor::Attribute {
                    kind,
                    name,
                    strings,
                    ..
                } => Some(Part::attribute(
                    ctx.clone(),
                    *kind,
                    current,
                    name,
                    strings.clone(),
                )),
                PartDescriptor::Element { .. } => Some(Part::element_at(ctx.clone(), current)),
                PartDescriptor::Comment { .. } => None,
            };
            self.parts.push(part);
        }
        Ok(fragment)
    }

    /// Commit fresh values, walking parts and values in lock-step.
    pub(crate) fn update(&mut self, values: Vec<Value>) -> Result<()> {
        let descriptors = self.template.parts();
        let expected: usize = descriptors.iter().map(PartDescriptor::value_count).sum();
        if values.len() != expected {
            return Err(Error::PartCountMismatch {
                expected,
                found: values.len(),
            });
        }

        let mut values = values.into_iter();
        for (descriptor, part) in descriptors.iter().zip(&self.parts) {
            match (descriptor, part) {
                (PartDescriptor::Attribute { .. }, Some(part)) => {
                    let count = descriptor.value_count();
                    part.set_values(values.by_ref().take(count).collect())?;
                }
                (_, Some(part)) => {
                    part.set_value(values.next().unwrap_or(Value::Nothing))?;
                }
                (_, None) => {
                    values.next();
                }
            }
        }
        Ok(())
    }

    /// Detach the caller-owned nodes committed inside the instance.
    pub(crate) fn disown(&self) {
        for part in self.parts.iter().flatten() {
            part.disown();
        }
    }

    /// Propagate a connection change to every part of the instance.
    pub(crate) fn set_connected(&self, connected: bool) {
        for part in self.parts.iter().flatten() {
            part.notify_connection(connected);
        }
    }
}

impl std::fmt::Debug for TemplateInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateInstance")
            .field("template", &self.template.strings_id())
            .field("parts", &self.parts.len())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
