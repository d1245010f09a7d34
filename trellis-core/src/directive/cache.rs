//! `cache`: keep the DOM of templates switched away from.
//!
//! Every template the binding shows gets its own nested child part between
//! two markers. Switching to another template moves the current markers and
//! everything between them into a detached fragment; switching back moves
//! them in again and updates the same instance, so its nodes (and the state
//! they hold) survive the round trip.

use std::collections::hash_map::{self, HashMap};

use super::{directive, Directive, DirectiveClass, PartInfo};
use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::part::{Part, PartContext, PartKind};
use crate::template::ResultKind;
use crate::value::Value;

type Key = (usize, ResultKind);

struct Cached {
    /// Holds `start..=end` while the entry is not shown.
    fragment: NodeId,
    start: NodeId,
    end: NodeId,
    part: Part,
}

struct Cache {
    context: PartContext,
    entries: HashMap<Key, Cached>,
    shown: Option<Key>,
}

impl Cache {
    /// Move the shown entry back into its fragment.
    fn stash(&mut self) -> Result<()> {
        let Some(entry) = self.shown.take().and_then(|key| self.entries.get(&key)) else {
            return Ok(());
        };
        entry.part.notify_connection(false);
        let doc = &self.context.document;
        let mut node = Some(entry.start);
        while let Some(current) = node {
            node = if current == entry.end {
                None
            } else {
                doc.next_sibling(current)
            };
            doc.append_child(entry.fragment, current)?;
        }
        if doc.parent(entry.end) != Some(entry.fragment) {
            doc.append_child(entry.fragment, entry.end)?;
        }
        Ok(())
    }

    fn entry(&mut self, key: Key) -> Result<&Cached> {
        let doc = &self.context.document;
        match self.entries.entry(key) {
            hash_map::Entry::Occupied(slot) => Ok(slot.into_mut()),
            hash_map::Entry::Vacant(slot) => {
                let fragment = doc.create_fragment()?;
                let start = doc.append_child(fragment, doc.create_comment("")?)?;
                let end = doc.append_child(fragment, doc.create_comment("")?)?;
                let part = Part::child(self.context.clone(), start, Some(end));
                tracing::debug!(strings = key.0, "cache entry created");
                Ok(slot.insert(Cached {
                    fragment,
                    start,
                    end,
                    part,
                }))
            }
        }
    }
}

impl Directive for Cache {
    fn render(&mut self, args: &[Value]) -> Result<Value> {
        let value = args.first().cloned().unwrap_or(Value::Nothing);
        let key = match &value {
            Value::Template(result) => Some((result.strings.id(), result.kind)),
            _ => None,
        };
        if let (Some(key), Some(shown)) = (key, self.shown) {
            if key == shown {
                if let Some(entry) = self.entries.get(&key) {
                    entry.part.set_value(value)?;
                }
                return Ok(Value::NoChange);
            }
        }

        self.stash()?;
        let Some(key) = key else {
            return Ok(value);
        };
        let connected = self.context.connected.get();
        let entry = self.entry(key)?;
        if connected {
            entry.part.notify_connection(true);
        }
        entry.part.set_value(value)?;
        let fragment = entry.fragment;
        self.shown = Some(key);
        Ok(Value::Node(fragment))
    }

    fn disconnected(&mut self) {
        if let Some(entry) = self.shown.and_then(|key| self.entries.get(&key)) {
            entry.part.notify_connection(false);
        }
    }

    fn reconnected(&mut self) {
        if let Some(entry) = self.shown.and_then(|key| self.entries.get(&key)) {
            entry.part.notify_connection(true);
        }
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        let doc = self.context.document.clone();
        for entry in std::mem::take(&mut self.entries).into_values() {
            entry.part.clear();
            doc.release(entry.start);
            doc.release(entry.end);
            doc.release(entry.fragment);
        }
    }
}

fn create(info: &PartInfo<'_>) -> Result<Box<dyn Directive>> {
    let unsupported = Error::UnsupportedDirective {
        directive: CACHE.name,
        kind: info.kind,
    };
    if info.kind != PartKind::Child {
        return Err(unsupported);
    }
    let Some(context) = info.context else {
        return Err(unsupported);
    };
    Ok(Box::new(Cache {
        context: context.clone(),
        entries: HashMap::new(),
        shown: None,
    }))
}

static CACHE: DirectiveClass = DirectiveClass {
    name: "cache",
    create,
};

/// Render `value`, keeping the DOM of every template it showed before.
/// Child bindings only.
///
/// Switching back to a cached template reuses its nodes instead of stamping
/// the template again.
pub fn cache(value: impl Into<Value>) -> Value {
    directive(&CACHE, vec![value.into()])
}
