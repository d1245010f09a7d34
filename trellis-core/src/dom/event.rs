//! Event listeners and dispatch.
//!
//! Dispatch follows the DOM model: a capture phase from the root down to the
//! target's parent, listeners on the target itself, then a bubble phase back
//! up when the event bubbles. Listener identity is the `Rc` allocation, so
//! registering the same listener twice with the same capture flag is a no-op.

use std::cell::Cell;
use std::rc::Rc;

use super::{Document, MutationRecord, NodeId};
use crate::value::Value;

/// Receives dispatched events.
pub trait EventListener {
    fn handle_event(&self, event: &Event);
}

impl<F: Fn(&Event)> EventListener for F {
    fn handle_event(&self, event: &Event) {
        self(event)
    }
}

/// Options accepted by `add_event_listener`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self {
            capture: true,
            ..Self::default()
        }
    }
}

pub(super) struct RegisteredListener {
    pub(super) event_type: String,
    pub(super) listener: Rc<dyn EventListener>,
    pub(super) options: ListenerOptions,
}

/// An event being dispatched.
pub struct Event {
    event_type: String,
    bubbles: bool,
    detail: Value,
    target: Cell<Option<NodeId>>,
    current_target: Cell<Option<NodeId>>,
    stopped: Cell<bool>,
    default_prevented: Cell<bool>,
    in_passive_listener: Cell<bool>,
}

impl Event {
    /// A non-bubbling event.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: false,
            detail: Value::Null,
            target: Cell::new(None),
            current_target: Cell::new(None),
            stopped: Cell::new(false),
            default_prevented: Cell::new(false),
            in_passive_listener: Cell::new(false),
        }
    }

    /// A bubbling event.
    pub fn bubbling(event_type: impl Into<String>) -> Self {
        Self {
            bubbles: true,
            ..Self::new(event_type)
        }
    }

    /// Attach a payload.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn detail(&self) -> &Value {
        &self.detail
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target.get()
    }

    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target.get()
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    /// Ignored inside passive listeners.
    pub fn prevent_default(&self) {
        if !self.in_passive_listener.get() {
            self.default_prevented.set(true);
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

impl std::fmt::Debug for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("type", &self.event_type)
            .field("bubbles", &self.bubbles)
            .field("target", &self.target.get())
            .finish()
    }
}

fn same_listener(a: &Rc<dyn EventListener>, b: &Rc<dyn EventListener>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Capturing,
    AtTarget,
    Bubbling,
}

impl Document {
    /// Register a listener. Duplicate `(type, listener, capture)` triples are ignored.
    pub fn add_event_listener(
        &self,
        target: NodeId,
        event_type: &str,
        listener: Rc<dyn EventListener>,
        options: ListenerOptions,
    ) {
        let mut arena = self.inner.borrow_mut();
        let Some(node) = arena.get_mut(target) else {
            return;
        };
        let duplicate = node.listeners.iter().any(|l| {
            l.event_type == event_type
                && l.options.capture == options.capture
                && same_listener(&l.listener, &listener)
        });
        if duplicate {
            return;
        }
        node.listeners.push(RegisteredListener {
            event_type: event_type.to_string(),
            listener,
            options,
        });
        arena.record(MutationRecord::Listener {
            target,
            event_type: event_type.to_string(),
            added: true,
        });
    }

    /// Unregister a listener matched by `(type, listener, capture)`.
    pub fn remove_event_listener(
        &self,
        target: NodeId,
        event_type: &str,
        listener: &Rc<dyn EventListener>,
        capture: bool,
    ) {
        let mut arena = self.inner.borrow_mut();
        let Some(node) = arena.get_mut(target) else {
            return;
        };
        let before = node.listeners.len();
        node.listeners.retain(|l| {
            !(l.event_type == event_type
                && l.options.capture == capture
                && same_listener(&l.listener, listener))
        });
        if node.listeners.len() != before {
            arena.record(MutationRecord::Listener {
                target,
                event_type: event_type.to_string(),
                added: false,
            });
        }
    }

    /// Number of listeners registered on `target` for `event_type`.
    pub fn listener_count(&self, target: NodeId, event_type: &str) -> usize {
        self.inner
            .borrow()
            .get(target)
            .map(|n| {
                n.listeners
                    .iter()
                    .filter(|l| l.event_type == event_type)
                    .count()
            })
            .unwrap_or(0)
    }

    /// Dispatch `event` at `target`. Returns `false` if a listener prevented
    /// the default action.
    pub fn dispatch_event(&self, target: NodeId, event: &Event) -> bool {
        event.target.set(Some(target));
        event.stopped.set(false);

        let mut path = vec![target];
        let mut current = target;
        while let Some(next) = self.parent(current).or_else(|| self.shadow_host(current)) {
            path.push(next);
            current = next;
        }

        for &node in path.iter().skip(1).rev() {
            if event.stopped.get() {
                break;
            }
            self.invoke(node, event, Phase::Capturing);
        }
        if !event.stopped.get() {
            self.invoke(target, event, Phase::AtTarget);
        }
        if event.bubbles {
            for &node in path.iter().skip(1) {
                if event.stopped.get() {
                    break;
                }
                self.invoke(node, event, Phase::Bubbling);
            }
        }

        event.current_target.set(None);
        !event.default_prevented.get()
    }

    fn invoke(&self, node: NodeId, event: &Event, phase: Phase) {
        let snapshot: Vec<(Rc<dyn EventListener>, ListenerOptions)> = {
            let arena = self.inner.borrow();
            let Some(data) = arena.get(node) else {
                return;
            };
            data.listeners
                .iter()
                .filter(|l| l.event_type == event.event_type)
                .filter(|l| match phase {
                    Phase::Capturing => l.options.capture,
                    Phase::AtTarget => true,
                    Phase::Bubbling => !l.options.capture,
                })
                .map(|l| (l.listener.clone(), l.options))
                .collect()
        };

        // Capture listeners run first at the target.
        let mut ordered = snapshot;
        if phase == Phase::AtTarget {
            ordered.sort_by_key(|(_, options)| !options.capture);
        }

        event.current_target.set(Some(node));
        for (listener, options) in ordered {
            if !self.is_registered(node, &event.event_type, &listener, options.capture) {
                continue;
            }
            if options.once {
                self.remove_event_listener(node, &event.event_type, &listener, options.capture);
            }
            event.in_passive_listener.set(options.passive);
            listener.handle_event(event);
            event.in_passive_listener.set(false);
        }
    }

    fn is_registered(
        &self,
        node: NodeId,
        event_type: &str,
        listener: &Rc<dyn EventListener>,
        capture: bool,
    ) -> bool {
        let arena = self.inner.borrow();
        arena.get(node).is_some_and(|n| {
            n.listeners.iter().any(|l| {
                l.event_type == event_type
                    && l.options.capture == capture
                    && same_listener(&l.listener, listener)
            })
        })
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &str) -> Rc<dyn EventListener> {
        let log = log.clone();
        let tag = tag.to_string();
        Rc::new(move |_: &Event| log.borrow_mut().push(tag.clone()))
    }

    #[test]
    fn capture_target_bubble_order() {
        let doc = Document::new();
        let outer = doc.create_element("div").unwrap();
        let inner = doc.create_element("button").unwrap();
        doc.append_child(outer, inner).unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        doc.add_event_listener(outer, "click", recorder(&log, "outer-bubble"), ListenerOptions::default());
        doc.add_event_listener(outer, "click", recorder(&log, "outer-capture"), ListenerOptions::capture());
        doc.add_event_listener(inner, "click", recorder(&log, "inner"), ListenerOptions::default());

        doc.dispatch_event(inner, &Event::bubbling("click"));
        assert_eq!(*log.borrow(), vec!["outer-capture", "inner", "outer-bubble"]);
    }

    #[test]
    fn once_listeners_fire_a_single_time() {
        let doc = Document::new();
        let el = doc.create_element("div").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let options = ListenerOptions {
            once: true,
            ..ListenerOptions::default()
        };
        doc.add_event_listener(el, "ping", recorder(&log, "hit"), options);

        doc.dispatch_event(el, &Event::new("ping"));
        doc.dispatch_event(el, &Event::new("ping"));
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(doc.listener_count(el, "ping"), 0);
    }

    #[test]
    fn passive_listeners_cannot_prevent_default() {
        let doc = Document::new();
        let el = doc.create_element("div").unwrap();
        let listener: Rc<dyn EventListener> = Rc::new(|e: &Event| e.prevent_default());
        let options = ListenerOptions {
            passive: true,
            ..ListenerOptions::default()
        };
        doc.add_event_listener(el, "wheel", listener, options);
        assert!(doc.dispatch_event(el, &Event::new("wheel")));
    }

    #[test]
    fn duplicate_registration_is_ignored() {
        let doc = Document::new();
        let el = doc.create_element("div").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        let listener = recorder(&log, "x");
        doc.add_event_listener(el, "x", listener.clone(), ListenerOptions::default());
        doc.add_event_listener(el, "x", listener.clone(), ListenerOptions::default());
        assert_eq!(doc.listener_count(el, "x"), 1);

        doc.remove_event_listener(el, "x", &listener, false);
        assert_eq!(doc.listener_count(el, "x"), 0);
    }
}
