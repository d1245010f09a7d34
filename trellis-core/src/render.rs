//! Render Root
//!
//! [`render`] is the entry point from a value to live DOM. The first call for
//! a `(container, render_before)` pair inserts a start marker and creates a
//! root child part; the part is stored on the owner node (`render_before` if
//! given, the container otherwise) and reused by every later call, which
//! then only patches what changed.

use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::part::{Part, PartContext};
use crate::value::Value;

/// Options fixed when a render root is created.
#[derive(Clone)]
pub struct RenderOptions {
    /// Receiver for event listener functions. Defaults to the element.
    pub host: Option<Rc<dyn Any>>,
    /// Render before this child of the container instead of appending.
    pub render_before: Option<NodeId>,
    /// Initial connection state of the root part.
    pub is_connected: bool,
}

impl RenderOptions {
    pub fn with_host<T: Any>(mut self, host: Rc<T>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_render_before(mut self, node: NodeId) -> Self {
        self.render_before = Some(node);
        self
    }

    pub fn with_connected(mut self, connected: bool) -> Self {
        self.is_connected = connected;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            host: None,
            render_before: None,
            is_connected: true,
        }
    }
}

impl fmt::Debug for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderOptions")
            .field("host", &self.host.is_some())
            .field("render_before", &self.render_before)
            .field("is_connected", &self.is_connected)
            .finish()
    }
}

/// Render `value` into `container` and return the root part.
///
/// Options only take effect on the call that creates the root.
pub fn render(
    value: impl Into<Value>,
    document: &Document,
    container: NodeId,
    options: RenderOptions,
) -> Result<Part> {
    let owner = options.render_before.unwrap_or(container);
    let existing = document
        .part_slot(owner)
        .and_then(|slot| slot.downcast::<Part>().ok());

    let part = match existing {
        Some(part) => Part::clone(&part),
        None => {
            let start = document.create_comment("")?;
            document.insert_before(container, start, options.render_before)?;
            let end = options.render_before;
            let ctx = PartContext {
                document: document.clone(),
                connected: Rc::new(Cell::new(options.is_connected)),
                options: Rc::new(options),
            };
            let part = Part::root(ctx, start, end);
            document.set_part_slot(owner, Rc::new(part.clone()));
            tracing::debug!(container = container.raw(), "render root created");
            part
        }
    };
    part.set_value(value)?;
    Ok(part)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
