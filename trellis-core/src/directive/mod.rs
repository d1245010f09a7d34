//! Directive Protocol
//!
//! A directive is a stateful value transformer that lives in one binding
//! slot. Templates bind a [`DirectiveResult`] (a class plus arguments); the
//! part keeps the directive instance alive across renders as long as the same
//! class keeps arriving at that slot.
//!
//! # Resolution
//!
//! For every value committed to a slot:
//!
//! 1. `NoChange` short-circuits everything.
//! 2. If the class differs from the one instantiated at the slot, the old
//!    directive is disconnected and dropped, and a new one is created.
//! 3. The directive's [`Directive::update`] produces the value to commit,
//!    which may itself be another directive result; resolution repeats one
//!    level deeper.
//!
//! Nested directives form a chain per slot, so a directive can own a child
//! directive just like a part owns one.
//!
//! # Connection
//!
//! Each slot tracks whether its part is connected. Removing content or
//! calling `set_connected(false)` on a render root calls
//! [`Directive::disconnected`]; reconnecting calls [`Directive::reconnected`].
//! Async directives pause there.

pub mod async_replace;
pub mod cache;
mod gate;
pub mod if_defined;
pub mod template_content;

pub use async_replace::{async_replace, async_replace_with, value_stream, ValueStream};
pub use cache::cache;
pub use gate::AsyncGate;
pub use if_defined::if_defined;
pub use template_content::template_content;

use std::fmt;
use std::rc::Rc;

use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::part::{PartContext, PartKind, PartRef};
use crate::value::Value;

/// A stateful value transformer.
pub trait Directive {
    /// Produce the value for the given arguments.
    fn render(&mut self, args: &[Value]) -> Result<Value>;

    /// Called on every commit. Defaults to [`render`](Self::render).
    fn update(&mut self, _part: &PartInfo<'_>, args: &[Value]) -> Result<Value> {
        self.render(args)
    }

    /// The part was removed from the tree or its root was disconnected.
    fn disconnected(&mut self) {}

    /// The part was connected again.
    fn reconnected(&mut self) {}
}

/// Identity and constructor of a directive. Declare one as a `static`;
/// its address tells instances of different directives apart.
pub struct DirectiveClass {
    pub name: &'static str,
    pub create: fn(&PartInfo<'_>) -> Result<Box<dyn Directive>>,
}

impl DirectiveClass {
    fn is(&self, other: &DirectiveClass) -> bool {
        std::ptr::eq(self, other)
    }
}

impl fmt::Debug for DirectiveClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveClass")
            .field("name", &self.name)
            .finish()
    }
}

/// A bound directive invocation.
#[derive(Clone)]
pub struct DirectiveResult {
    pub class: &'static DirectiveClass,
    pub values: Rc<[Value]>,
}

impl fmt::Debug for DirectiveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveResult")
            .field("class", &self.class.name)
            .field("values", &self.values)
            .finish()
    }
}

/// Bind `class` with `values` as arguments.
pub fn directive(class: &'static DirectiveClass, values: Vec<Value>) -> Value {
    Value::Directive(DirectiveResult {
        class,
        values: values.into(),
    })
}

/// What a directive can learn about the binding it lives in.
#[derive(Clone)]
pub struct PartInfo<'a> {
    pub kind: PartKind,
    /// Attribute, property or event name.
    pub name: Option<&'a str>,
    /// Static strings of a multi-expression attribute.
    pub strings: Option<&'a [String]>,
    /// The bound element, or the parent node of a child binding.
    pub element: Option<NodeId>,
    pub document: &'a Document,
    pub connected: bool,
    /// Expression index inside a multi-expression attribute.
    pub attribute_index: Option<usize>,
    /// Nesting depth of the directive being resolved.
    pub level: usize,
    pub part: PartRef,
    /// What the parts below the same render root share.
    pub(crate) context: Option<&'a PartContext>,
}

impl PartInfo<'_> {
    /// Tag name of [`element`](Self::element).
    pub fn tag_name(&self) -> Option<String> {
        self.element.and_then(|el| self.document.tag_name(el))
    }

    /// A handle that pushes values into this slot later.
    pub fn setter(&self) -> ValueSetter {
        ValueSetter {
            part: self.part.clone(),
            attribute_index: self.attribute_index,
            level: self.level,
        }
    }

    fn at_level(&self, level: usize, connected: bool) -> Self {
        Self {
            level,
            connected,
            ..self.clone()
        }
    }
}

/// Pushes values into a part on behalf of a directive, outside a render.
///
/// The value is resolved against the directive's own child slot, so the
/// directive stays in place.
#[derive(Clone)]
pub struct ValueSetter {
    part: PartRef,
    attribute_index: Option<usize>,
    level: usize,
}

impl ValueSetter {
    /// Commit `value`. Returns `Ok(false)` if the part no longer exists.
    pub fn set_value(&self, value: Value) -> Result<bool> {
        let Some(part) = self.part.upgrade() else {
            return Ok(false);
        };
        part.push_value(value, self.attribute_index, self.level + 1)?;
        Ok(true)
    }

    /// Whether the part still exists.
    pub fn is_alive(&self) -> bool {
        self.part.upgrade().is_some()
    }
}

struct DirectiveSlot {
    class: &'static DirectiveClass,
    directive: Box<dyn Directive>,
    connected: bool,
}

impl DirectiveSlot {
    fn set_connected(&mut self, connected: bool) {
        if self.connected == connected {
            return;
        }
        self.connected = connected;
        tracing::debug!(directive = self.class.name, connected, "directive connection changed");
        if connected {
            self.directive.reconnected();
        } else {
            self.directive.disconnected();
        }
    }
}

/// The directives instantiated at one binding slot, outermost first.
#[derive(Default)]
pub(crate) struct DirectiveChain {
    slots: Vec<DirectiveSlot>,
}

impl DirectiveChain {
    /// Resolve `value` starting at nesting `level`.
    pub(crate) fn resolve(
        &mut self,
        mut value: Value,
        info: &PartInfo<'_>,
        mut level: usize,
    ) -> Result<Value> {
        loop {
            if value.is_no_change() {
                return Ok(value);
            }
            let next = match &value {
                Value::Directive(result) => Some(result.class),
                _ => None,
            };
            let current = self.slots.get(level).map(|slot| slot.class);
            let same = match (current, next) {
                (Some(a), Some(b)) => a.is(b),
                (None, None) => true,
                _ => false,
            };
            if !same {
                self.truncate(level);
                if let Some(class) = next {
                    let directive = (class.create)(&info.at_level(level, info.connected))?;
                    tracing::debug!(directive = class.name, level, "directive created");
                    self.slots.push(DirectiveSlot {
                        class,
                        directive,
                        connected: info.connected,
                    });
                }
            }

            let Value::Directive(result) = value else {
                return Ok(value);
            };
            let Some(slot) = self.slots.get_mut(level) else {
                return Ok(Value::Directive(result));
            };
            let slot_info = info.at_level(level, slot.connected);
            value = slot.directive.update(&slot_info, &result.values)?;
            level += 1;
        }
    }

    /// Disconnect and drop the directives at `level` and deeper.
    fn truncate(&mut self, level: usize) {
        while self.slots.len() > level {
            if let Some(mut slot) = self.slots.pop() {
                slot.set_connected(false);
            }
        }
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        for slot in &mut self.slots {
            slot.set_connected(connected);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Drop for DirectiveChain {
    fn drop(&mut self) {
        self.truncate(0);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
