//! `template_content`: render a copy of an element's children.

use crate::directive::{directive, Directive, DirectiveClass, PartInfo};
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::part::PartKind;
use crate::value::Value;

struct TemplateContent {
    document: Document,
    previous: Option<NodeId>,
}

impl Directive for TemplateContent {
    fn render(&mut self, args: &[Value]) -> Result<Value> {
        let Some(template) = args.first().and_then(Value::as_node) else {
            return Ok(Value::Nothing);
        };
        if self.previous == Some(template) {
            return Ok(Value::NoChange);
        }
        self.previous = Some(template);

        let fragment = self.document.create_fragment()?;
        for child in self.document.children(template) {
            let copy = self.document.clone_node(child, true)?;
            self.document.append_child(fragment, copy)?;
        }
        Ok(Value::Node(fragment))
    }
}

fn create(info: &PartInfo<'_>) -> Result<Box<dyn Directive>> {
    if info.kind != PartKind::Child {
        return Err(Error::UnsupportedDirective {
            directive: TEMPLATE_CONTENT.name,
            kind: info.kind,
        });
    }
    Ok(Box::new(TemplateContent {
        document: info.document.clone(),
        previous: None,
    }))
}

static TEMPLATE_CONTENT: DirectiveClass = DirectiveClass {
    name: "template_content",
    create,
};

/// Render a fresh copy of `template`'s children. Child bindings only.
///
/// Rendering the same node again leaves the DOM alone.
pub fn template_content(template: NodeId) -> Value {
    directive(&TEMPLATE_CONTENT, vec![Value::Node(template)])
}
