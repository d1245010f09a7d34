//! Attribute, property and boolean-attribute bindings.
//!
//! All three share change detection. A binding whose static strings are
//! anything but `["", ""]` interpolates several expressions: it keeps one
//! committed value and one directive chain per expression and writes the
//! concatenated string only when some expression changed. `Nothing` in any
//! expression removes the whole attribute.

use std::rc::Rc;

use smallvec::{smallvec, SmallVec};

use super::{PartContext, PartKind, PartRef};
use crate::directive::{DirectiveChain, PartInfo};
use crate::dom::NodeId;
use crate::error::Result;
use crate::sanitizer::{LazySanitizer, SanitizeContext, SanitizeTarget};
use crate::value::Value;

pub(crate) struct AttributePart {
    ctx: PartContext,
    this: PartRef,
    kind: PartKind,
    element: NodeId,
    tag_name: String,
    name: String,
    /// Static strings of a multi-expression binding.
    strings: Option<Rc<[String]>>,
    /// Committed value per expression. `None` until the first commit.
    committed: SmallVec<[Option<Value>; 2]>,
    directives: SmallVec<[DirectiveChain; 1]>,
    sanitizer: LazySanitizer,
}

impl AttributePart {
    pub(super) fn new(
        ctx: PartContext,
        this: PartRef,
        kind: PartKind,
        element: NodeId,
        name: &str,
        strings: Rc<[String]>,
    ) -> Self {
        let multi = strings.len() > 2
            || strings.first().is_some_and(|s| !s.is_empty())
            || strings.get(1).is_some_and(|s| !s.is_empty());
        let (strings, committed) = if multi {
            let count = strings.len().saturating_sub(1);
            (Some(strings), smallvec![None; count])
        } else {
            (None, smallvec![Some(Value::Nothing)])
        };
        let directives = (0..committed.len()).map(|_| DirectiveChain::default()).collect();
        let tag_name = ctx.document.tag_name(element).unwrap_or_default();
        Self {
            ctx,
            this,
            kind,
            element,
            tag_name,
            name: name.to_string(),
            strings,
            committed,
            directives,
            sanitizer: LazySanitizer::default(),
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

    pub(super) fn is_multi(&self) -> bool {
        self.strings.is_some()
    }

    pub(super) fn value_count(&self) -> usize {
        self.committed.len()
    }

    pub(super) fn notify_connection(&mut self, connected: bool) {
        for chain in &mut self.directives {
            chain.set_connected(connected);
        }
    }

    fn resolve(&mut self, index: usize, value: Value, level: usize) -> Result<Value> {
        let info = PartInfo {
            kind: self.kind,
            name: Some(&self.name),
            strings: self.strings.as_deref(),
            element: Some(self.element),
            document: &self.ctx.document,
            connected: self.ctx.connected.get(),
            attribute_index: self.strings.as_ref().map(|_| index),
            level,
            part: self.this.clone(),
            context: Some(&self.ctx),
        };
        match self.directives.get_mut(index) {
            Some(chain) => chain.resolve(value, &info, level),
            None => Ok(value),
        }
    }

    /// Single-expression commit.
    pub(super) fn set_value(&mut self, value: Value, level: usize) -> Result<()> {
        if self.is_multi() {
            return self.push_value(value, Some(0), level);
        }
        let value = self.resolve(0, value, level)?;
        let change = match &self.committed[0] {
            Some(current) => !value.is_primitive() || (!value.same(current) && !value.is_no_change()),
            None => !value.is_no_change(),
        };
        if change {
            self.committed[0] = Some(value.clone());
            self.commit(value);
        }
        Ok(())
    }

    /// Multi-expression commit with one value per expression.
    pub(super) fn set_values(&mut self, values: Vec<Value>) -> Result<()> {
        if !self.is_multi() {
            let value = values.into_iter().next().unwrap_or(Value::Nothing);
            return self.set_value(value, 0);
        }
        let mut resolved = Vec::with_capacity(self.committed.len());
        let mut values = values.into_iter();
        for index in 0..self.committed.len() {
            let value = values.next().unwrap_or(Value::Nothing);
            resolved.push(Some(self.resolve(index, value, 0)?));
        }
        self.interpolate(resolved);
        Ok(())
    }

    /// Commit a value pushed into one expression; the others keep theirs.
    pub(super) fn push_value(
        &mut self,
        value: Value,
        index: Option<usize>,
        level: usize,
    ) -> Result<()> {
        if !self.is_multi() {
            return self.set_value(value, level);
        }
        let index = index.unwrap_or(0);
        let mut resolved = vec![None; self.committed.len()];
        if index < resolved.len() {
            resolved[index] = Some(self.resolve(index, value, level)?);
        }
        self.interpolate(resolved);
        Ok(())
    }

    /// Build the attribute value from the static strings and the resolved
    /// expressions (`None` keeps the committed value), committing on change.
    fn interpolate(&mut self, resolved: Vec<Option<Value>>) {
        let Some(strings) = self.strings.clone() else {
            return;
        };
        let mut change = false;
        let mut out = Some(strings.first().cloned().unwrap_or_default());
        for (index, next) in resolved.into_iter().enumerate() {
            let previous = self.committed[index].take();
            let value = match next {
                Some(value) if !value.is_no_change() => Some(value),
                _ => previous.clone(),
            };
            change |= match (&value, &previous) {
                (Some(value), Some(previous)) => !value.is_primitive() || !value.same(previous),
                _ => true,
            };
            let tail = strings.get(index + 1).map(String::as_str).unwrap_or_default();
            match &value {
                Some(Value::Nothing) => out = None,
                Some(value) => {
                    if let Some(s) = &mut out {
                        s.push_str(&value.to_text());
                        s.push_str(tail);
                    }
                }
                None => {
                    if let Some(s) = &mut out {
                        s.push_str(tail);
                    }
                }
            }
            self.committed[index] = value;
        }
        if change {
            self.commit(out.map_or(Value::Nothing, Value::from));
        }
    }

    fn sanitize(&mut self, value: Value, target: SanitizeTarget) -> Value {
        let context = SanitizeContext {
            node: self.element,
            tag_name: Some(&self.tag_name),
            name: &self.name,
            target,
        };
        self.sanitizer.apply(value, &context)
    }

    fn commit(&mut self, value: Value) {
        let doc = self.ctx.document.clone();
        match self.kind {
            PartKind::Property => {
                let value = self.sanitize(value, SanitizeTarget::Property);
                let value = if value.is_nothing() { Value::Null } else { value };
                doc.set_property(self.element, &self.name, value);
            }
            PartKind::Boolean => {
                let present = value.is_truthy() && !value.is_nothing();
                doc.toggle_attribute(self.element, &self.name, present);
            }
            _ => {
                if value.is_nothing() {
                    doc.remove_attribute(self.element, &self.name);
                } else {
                    let value = self.sanitize(value, SanitizeTarget::Attribute);
                    doc.set_attribute(self.element, &self.name, &value.to_text());
                }
            }
        }
        tracing::trace!(kind = ?self.kind, name = %self.name, "attribute part committed");
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::dom::Document;
    use crate::part::tests::context;
    use crate::part::Part;
    use crate::template::AttributeKind;
    use crate::value::Value;

    fn strings(parts: &[&str]) -> Rc<[String]> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn part(doc: &Document, kind: AttributeKind, name: &str, s: &[&str]) -> (Part, crate::dom::NodeId) {
        let el = doc.create_element("div").unwrap();
        (Part::attribute(context(doc), kind, el, name, strings(s)), el)
    }

    #[test]
    fn single_expression_sets_and_removes() {
        let doc = Document::new();
        let (part, el) = part(&doc, AttributeKind::Attribute, "title", &["", ""]);
        part.set_value("hi").unwrap();
        assert_eq!(doc.get_attribute(el, "title").as_deref(), Some("hi"));
        part.set_value(Value::Null).unwrap();
        assert_eq!(doc.get_attribute(el, "title").as_deref(), Some(""));
        part.set_value(Value::Nothing).unwrap();
        assert!(!doc.has_attribute(el, "title"));
    }

    #[test]
    fn nothing_before_first_commit_writes_nothing() {
        let doc = Document::new();
        let (part, _) = part(&doc, AttributeKind::Attribute, "title", &["", ""]);
        doc.take_mutations();
        part.set_value(Value::Nothing).unwrap();
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn interpolation_writes_only_on_change() {
        let doc = Document::new();
        let (part, el) = part(&doc, AttributeKind::Attribute, "name", &["a", "b", ""]);
        assert_eq!(part.value_count(), 2);

        part.set_values(vec!["1".into(), "2".into()]).unwrap();
        assert_eq!(doc.get_attribute(el, "name").as_deref(), Some("a1b2"));
        part.set_values(vec!["1".into(), "3".into()]).unwrap();
        assert_eq!(doc.get_attribute(el, "name").as_deref(), Some("a1b3"));

        doc.take_mutations();
        part.set_values(vec!["1".into(), "3".into()]).unwrap();
        assert!(doc.take_mutations().is_empty());
    }

    #[test]
    fn nothing_in_any_expression_removes_the_attribute() {
        let doc = Document::new();
        let (part, el) = part(&doc, AttributeKind::Attribute, "class", &["x-", " y-", ""]);
        part.set_values(vec!["1".into(), Value::Null]).unwrap();
        assert_eq!(doc.get_attribute(el, "class").as_deref(), Some("x-1 y-"));
        part.set_values(vec!["1".into(), Value::Nothing]).unwrap();
        assert!(!doc.has_attribute(el, "class"));
    }

    #[test]
    fn no_change_keeps_the_committed_expression() {
        let doc = Document::new();
        let (part, el) = part(&doc, AttributeKind::Attribute, "d", &["", "-", ""]);
        part.set_values(vec!["a".into(), "b".into()]).unwrap();
        part.set_values(vec![Value::NoChange, "c".into()]).unwrap();
        assert_eq!(doc.get_attribute(el, "d").as_deref(), Some("a-c"));
    }

    #[test]
    fn boolean_toggles_minimally() {
        let doc = Document::new();
        let (part, el) = part(&doc, AttributeKind::Boolean, "hidden", &["", ""]);
        let mut seen = Vec::new();
        let mut writes = Vec::new();
        for value in [true, false, true, true] {
            doc.take_mutations();
            part.set_value(value).unwrap();
            seen.push(doc.has_attribute(el, "hidden"));
            writes.push(doc.take_mutations().len());
        }
        assert_eq!(seen, vec![true, false, true, true]);
        assert_eq!(writes, vec![1, 1, 1, 0]);
    }

    #[test]
    fn properties_receive_values_and_nothing_becomes_null() {
        let doc = Document::new();
        let (part, el) = part(&doc, AttributeKind::Property, "value", &["", ""]);
        part.set_value(7).unwrap();
        assert_eq!(doc.property(el, "value").and_then(|v| v.as_number()), Some(7.0));
        part.set_value(Value::Nothing).unwrap();
        assert!(matches!(doc.property(el, "value"), Some(Value::Null)));
    }

    #[test]
    fn objects_always_count_as_changed() {
        let doc = Document::new();
        let (part, _) = part(&doc, AttributeKind::Property, "data", &["", ""]);
        let data = Value::from(serde_json::json!({"a": 1}));
        part.set_value(data.clone()).unwrap();
        doc.take_mutations();
        part.set_value(data).unwrap();
        assert_eq!(doc.take_mutations().len(), 1);
    }
}
