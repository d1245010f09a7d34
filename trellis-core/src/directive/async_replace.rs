//! `async_replace`: render the values of a stream as they arrive.
//!
//! The directive spawns a local task that drives the stream and pushes every
//! value into its binding. The task only holds a weak part reference and an
//! [`AsyncGate`]: it pauses while the part is disconnected, stops when the
//! part is gone, and is cancelled when the directive is replaced or dropped.
//!
//! Spawning uses [`tokio::task::spawn_local`], so rendering an
//! `async_replace` value must happen inside a [`tokio::task::LocalSet`].

use std::cell::RefCell;
use std::rc::Rc;

use futures_util::stream::{LocalBoxStream, Stream, StreamExt};

use super::{directive, AsyncGate, Directive, DirectiveClass, PartInfo};
use crate::error::Result;
use crate::value::Value;

/// A stream of values that can be bound through [`async_replace`].
///
/// The stream is consumed by the first binding that renders it.
pub struct ValueStream {
    inner: RefCell<Option<LocalBoxStream<'static, Value>>>,
}

impl ValueStream {
    fn take(&self) -> Option<LocalBoxStream<'static, Value>> {
        self.inner.borrow_mut().take()
    }
}

/// Wrap a stream as a bindable value.
pub fn value_stream(stream: impl Stream<Item = Value> + 'static) -> Value {
    Value::object(ValueStream {
        inner: RefCell::new(Some(stream.boxed_local())),
    })
}

struct Mapper(Box<dyn Fn(Value, usize) -> Value>);

struct AsyncReplace {
    stream: Option<Value>,
    gate: AsyncGate,
}

impl AsyncReplace {
    fn start(&mut self, part: &PartInfo<'_>, stream: &Value, mapper: Option<Rc<Mapper>>) {
        self.gate.cancel();
        self.gate = AsyncGate::new();
        if !part.connected {
            self.gate.pause();
        }
        self.stream = Some(stream.clone());

        let Some(mut values) = stream.downcast::<ValueStream>().and_then(|s| s.take()) else {
            tracing::warn!("async_replace needs an unconsumed value stream");
            return;
        };
        let gate = self.gate.clone();
        let setter = part.setter();
        tokio::task::spawn_local(async move {
            let mut index = 0;
            while let Some(value) = values.next().await {
                if !gate.ready().await {
                    break;
                }
                let value = match &mapper {
                    Some(mapper) => (mapper.0)(value, index),
                    None => value,
                };
                match setter.set_value(value) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => tracing::warn!(%err, "async_replace failed to commit a value"),
                }
                index += 1;
            }
        });
    }
}

impl Directive for AsyncReplace {
    fn render(&mut self, _args: &[Value]) -> Result<Value> {
        Ok(Value::NoChange)
    }

    fn update(&mut self, part: &PartInfo<'_>, args: &[Value]) -> Result<Value> {
        if !part.connected {
            self.gate.pause();
        }
        let Some(stream) = args.first() else {
            return Ok(Value::NoChange);
        };
        if self.stream.as_ref().is_some_and(|current| current.same(stream)) {
            return Ok(Value::NoChange);
        }
        let mapper = args.get(1).and_then(Value::downcast::<Mapper>);
        self.start(part, stream, mapper);
        Ok(Value::NoChange)
    }

    fn disconnected(&mut self) {
        self.gate.pause();
    }

    fn reconnected(&mut self) {
        self.gate.resume();
    }
}

impl Drop for AsyncReplace {
    fn drop(&mut self) {
        self.gate.cancel();
    }
}

fn create(_: &PartInfo<'_>) -> Result<Box<dyn Directive>> {
    Ok(Box::new(AsyncReplace {
        stream: None,
        gate: AsyncGate::new(),
    }))
}

static ASYNC_REPLACE: DirectiveClass = DirectiveClass {
    name: "async_replace",
    create,
};

/// Render each value of `stream` (built with [`value_stream`]) in turn.
pub fn async_replace(stream: Value) -> Value {
    directive(&ASYNC_REPLACE, vec![stream])
}

/// Like [`async_replace`], passing every value and its index through `mapper`.
pub fn async_replace_with(stream: Value, mapper: impl Fn(Value, usize) -> Value + 'static) -> Value {
    directive(
        &ASYNC_REPLACE,
        vec![stream, Value::object(Mapper(Box::new(mapper)))],
    )
}
