//! Bound Values
//!
//! [`Value`] is everything a template binding can receive: primitives,
//! DOM nodes, nested template results, lists, directive results, event
//! listeners and opaque shared objects.
//!
//! # Sentinels
//!
//! Two variants are control values rather than data:
//!
//! - [`Value::NoChange`] leaves the committed DOM untouched.
//! - [`Value::Nothing`] clears a child range, removes an attribute, or
//!   removes an event listener.
//!
//! # Identity
//!
//! Change detection uses [`Value::same`], which mirrors `Object.is`:
//! primitives compare by value (`NaN` is the same as `NaN`, `+0` is not the
//! same as `-0`), strings by content, and everything else by reference.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::directive::DirectiveResult;
use crate::dom::{Event, ListenerOptions, NodeId};
use crate::template::TemplateResult;

/// A value bound into a template.
#[derive(Clone, Default)]
pub enum Value {
    /// Renders nothing. Removes attributes and listeners.
    Nothing,
    /// Keep whatever is committed.
    NoChange,
    /// A null value. Renders as empty content.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    /// Structured data, compared by reference.
    Json(Rc<serde_json::Value>),
    /// A DOM node to insert as-is.
    Node(NodeId),
    /// An iterable of child values.
    List(Vec<Value>),
    Template(TemplateResult),
    Directive(DirectiveResult),
    Listener(Listener),
    /// Any shared object, compared by reference.
    Object(Rc<dyn Any>),
}

impl Value {
    /// Build a value from a string.
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    /// Wrap a shared object.
    pub fn object<T: Any>(value: T) -> Self {
        Value::Object(Rc::new(value))
    }

    /// Build a listener value from a closure.
    pub fn listener(f: impl Fn(&Event, &EventThis) + 'static) -> Self {
        Value::Listener(Listener::new(f))
    }

    /// `Object.is`-style identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing)
            | (Value::NoChange, Value::NoChange)
            | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => Rc::ptr_eq(a, b),
            (Value::Node(a), Value::Node(b)) => a == b,
            (Value::Listener(a), Value::Listener(b)) => a.same(b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Primitives are compared by value; everything else is an object.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Nothing
                | Value::NoChange
                | Value::Null
                | Value::Bool(_)
                | Value::Number(_)
                | Value::Str(_)
        )
    }

    /// JavaScript-style truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Value::Nothing)
    }

    pub fn is_no_change(&self) -> bool {
        matches!(self, Value::NoChange)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Value::Node(n) => Some(*n),
            _ => None,
        }
    }

    /// Downcast an [`Value::Object`].
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            Value::Object(o) => o.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// String conversion used for text content and attribute values.
    pub fn to_text(&self) -> String {
        match self {
            Value::Nothing | Value::NoChange | Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::Str(s) => s.to_string(),
            Value::Json(json) => match json.as_ref() {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            },
            Value::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Node(_)
            | Value::Template(_)
            | Value::Directive(_)
            | Value::Listener(_)
            | Value::Object(_) => "[object Object]".to_string(),
        }
    }
}

/// Format a number the way JavaScript's `String(n)` does for common values.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => f.write_str("Nothing"),
            Value::NoChange => f.write_str("NoChange"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Json(j) => write!(f, "Json({j})"),
            Value::Node(n) => write!(f, "Node({})", n.raw()),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Template(t) => t.fmt(f),
            Value::Directive(d) => d.fmt(f),
            Value::Listener(l) => l.fmt(f),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

macro_rules! from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })*
    };
}

from_integer!(i32, i64, u32, u64, usize);

impl From<NodeId> for Value {
    fn from(node: NodeId) -> Self {
        Value::Node(node)
    }
}

impl From<TemplateResult> for Value {
    fn from(result: TemplateResult) -> Self {
        Value::Template(result)
    }
}

impl From<DirectiveResult> for Value {
    fn from(result: DirectiveResult) -> Self {
        Value::Directive(result)
    }
}

impl From<Listener> for Value {
    fn from(listener: Listener) -> Self {
        Value::Listener(listener)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Json(Rc::new(json))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

// ----------------------------------------------------------------------------
// Event listeners
// ----------------------------------------------------------------------------

/// The receiver an event listener function is invoked with: the render
/// host when one was configured, the bound element otherwise.
#[derive(Clone)]
pub enum EventThis {
    Host(Rc<dyn Any>),
    Element(NodeId),
}

impl EventThis {
    /// Downcast the host, if the receiver is one.
    pub fn host<T: Any>(&self) -> Option<Rc<T>> {
        match self {
            EventThis::Host(host) => host.clone().downcast::<T>().ok(),
            EventThis::Element(_) => None,
        }
    }
}

/// An object-style listener, invoked through `handle_event`.
pub trait EventHandler {
    fn handle_event(&self, event: &Event);
}

#[derive(Clone)]
pub enum Handler {
    Function(Rc<dyn Fn(&Event, &EventThis)>),
    Object(Rc<dyn EventHandler>),
}

/// A listener bound through an `@event` binding, with its options.
#[derive(Clone)]
pub struct Listener {
    pub handler: Handler,
    pub options: ListenerOptions,
}

impl Listener {
    pub fn new(f: impl Fn(&Event, &EventThis) + 'static) -> Self {
        Self {
            handler: Handler::Function(Rc::new(f)),
            options: ListenerOptions::default(),
        }
    }

    pub fn from_handler(handler: Rc<dyn EventHandler>) -> Self {
        Self {
            handler: Handler::Object(handler),
            options: ListenerOptions::default(),
        }
    }

    /// Same handler with different options.
    pub fn with_options(mut self, options: ListenerOptions) -> Self {
        self.options = options;
        self
    }

    /// Same handler reference and same options.
    pub fn same(&self, other: &Listener) -> bool {
        self.same_handler(other) && self.options == other.options
    }

    pub fn same_handler(&self, other: &Listener) -> bool {
        match (&self.handler, &other.handler) {
            (Handler::Function(a), Handler::Function(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            (Handler::Object(a), Handler::Object(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }

    /// Invoke the handler.
    pub fn call(&self, event: &Event, this: &EventThis) {
        match &self.handler {
            Handler::Function(f) => f(event, this),
            Handler::Object(obj) => obj.handle_event(event),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.handler {
            Handler::Function(_) => "function",
            Handler::Object(_) => "object",
        };
        f.debug_struct("Listener")
            .field("handler", &kind)
            .field("options", &self.options)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
