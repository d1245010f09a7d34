//! Element bindings: an attachment point for directives.

use super::{PartContext, PartKind, PartRef};
use crate::directive::{DirectiveChain, PartInfo};
use crate::dom::NodeId;
use crate::error::Result;
use crate::value::Value;

pub(crate) struct ElementPart {
    ctx: PartContext,
    this: PartRef,
    element: NodeId,
    directives: DirectiveChain,
}

impl ElementPart {
    pub(super) fn new(ctx: PartContext, this: PartRef, element: NodeId) -> Self {
        Self {
            ctx,
            this,
            element,
            directives: DirectiveChain::default(),
        }
    }

    pub(super) fn context(&self) -> &PartContext {
        &self.ctx
    }

    pub(super) fn element(&self) -> NodeId {
        self.element
    }

    pub(super) fn notify_connection(&mut self, connected: bool) {
        self.directives.set_connected(connected);
    }

    pub(super) fn set_value(&mut self, value: Value, level: usize) -> Result<()> {
        let info = PartInfo {
            kind: PartKind::Element,
            name: None,
            strings: None,
            element: Some(self.element),
            document: &self.ctx.document,
            connected: self.ctx.connected.get(),
            attribute_index: None,
            level,
            part: self.this.clone(),
            context: Some(&self.ctx),
        };
        self.directives.resolve(value, &info, level)?;
        Ok(())
    }
}
