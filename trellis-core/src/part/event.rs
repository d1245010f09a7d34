//! Event bindings.
//!
//! The part registers one dispatcher on the element and forwards events to
//! whatever listener is committed at the time. The dispatcher is only
//! re-registered when the listener options change or the binding goes
//! between empty and non-empty; swapping the listener function costs nothing.

use std::any::Any;
use std::rc::Rc;

use super::{Binding, PartContext, PartKind, PartRef};
use crate::directive::{DirectiveChain, PartInfo};
use crate::dom::{Event, EventListener, ListenerOptions, NodeId};
use crate::error::Result;
use crate::value::{EventThis, Listener, Value};

struct EventDispatcher {
    part: PartRef,
    host: Option<Rc<dyn Any>>,
    element: NodeId,
}

impl EventListener for EventDispatcher {
    fn handle_event(&self, event: &Event) {
        let Some(part) = self.part.upgrade() else {
            return;
        };
        let listener = match part.inner.try_borrow() {
            Ok(binding) => match &*binding {
                Binding::Event(event_part) => event_part.committed.clone(),
                _ => None,
            },
            Err(_) => None,
        };
        let Some(listener) = listener else {
            return;
        };
        let this = match &self.host {
            Some(host) => EventThis::Host(host.clone()),
            None => EventThis::Element(self.element),
        };
        listener.call(event, &this);
    }
}

pub(crate) struct EventPart {
    ctx: PartContext,
    this: PartRef,
    element: NodeId,
    name: String,
    committed: Option<Listener>,
    directives: DirectiveChain,
    dispatcher: Rc<dyn EventListener>,
}

fn options(listener: Option<&Listener>) -> ListenerOptions {
    listener.map(|l| l.options).unwrap_or_default()
}

impl EventPart {
    pub(super) fn new(ctx: PartContext, this: PartRef, element: NodeId, name: &str) -> Self {
        let dispatcher = Rc::new(EventDispatcher {
            part: this.clone(),
            host: ctx.options.host.clone(),
            element,
        });
        Self {
            ctx,
            this,
            element,
            name: name.to_string(),
            committed: None,
            directives: DirectiveChain::default(),
            dispatcher,
        }
    }

    pub(super) fn context(&self) -> &PartContext {
        &self.ctx
    }

    pub(super) fn element(&self) -> NodeId {
        self.element
    }

    pub(super) fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn notify_connection(&mut self, connected: bool) {
        self.directives.set_connected(connected);
    }

    pub(super) fn set_value(&mut self, value: Value, level: usize) -> Result<()> {
        let info = PartInfo {
            kind: PartKind::Event,
            name: Some(&self.name),
            strings: None,
            element: Some(self.element),
            document: &self.ctx.document,
            connected: self.ctx.connected.get(),
            attribute_index: None,
            level,
            part: self.this.clone(),
            context: Some(&self.ctx),
        };
        let next = match self.directives.resolve(value, &info, level)? {
            Value::NoChange => return Ok(()),
            Value::Nothing | Value::Null => None,
            Value::Listener(listener) => Some(listener),
            other => {
                tracing::warn!(event = %self.name, value = ?other, "event binding expects a listener");
                None
            }
        };

        let old_options = options(self.committed.as_ref());
        let new_options = options(next.as_ref());
        let remove =
            (next.is_none() && self.committed.is_some()) || old_options != new_options;
        let add = next.is_some() && (self.committed.is_none() || remove);

        let doc = &self.ctx.document;
        if remove {
            doc.remove_event_listener(self.element, &self.name, &self.dispatcher, old_options.capture);
        }
        if add {
            doc.add_event_listener(self.element, &self.name, self.dispatcher.clone(), new_options);
        }
        if remove || add {
            tracing::trace!(event = %self.name, remove, add, "event part re-registered");
        }
        self.committed = next;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
