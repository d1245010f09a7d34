//! Compiled templates and the per-thread template cache.
//!
//! A [`Template`] is built once per call site: the marked HTML is parsed into
//! a [`Fragment`], then a preorder walk over elements and comments turns every
//! marker into a [`PartDescriptor`] holding the walk index of its node.
//! Instances later repeat the same walk over their clone to find the nodes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::compiler::{raw_text_element, template_html};
use super::markers::{marker, marker_match, BOUND_ATTRIBUTE_SUFFIX};
use super::result::{ResultKind, TemplateResult, TemplateStrings};
use crate::dom::{parse_fragment, Fragment, FragmentElement, FragmentNode};
use crate::error::{Error, Result};

thread_local! {
    static TEMPLATE_CACHE: RefCell<HashMap<usize, Rc<Template>>> = RefCell::new(HashMap::new());
}

/// What an attribute-position binding writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// `name=...`
    Attribute,
    /// `.name=...`
    Property,
    /// `?name=...`
    Boolean,
    /// `@name=...`
    Event,
}

/// A binding position inside a template.
///
/// `index` is the position of the bound node in a preorder walk over the
/// template's elements and comments.
#[derive(Debug, Clone, PartialEq)]
pub enum PartDescriptor {
    Child {
        index: usize,
    },
    Attribute {
        index: usize,
        kind: AttributeKind,
        name: String,
        /// Static text around the bound expressions; `len() - 1` values.
        strings: Rc<[String]>,
    },
    Element {
        index: usize,
    },
    /// A binding inside a comment. Consumes a value, renders nothing.
    Comment {
        index: usize,
    },
}

impl PartDescriptor {
    pub fn index(&self) -> usize {
        match self {
            PartDescriptor::Child { index }
            | PartDescriptor::Attribute { index, .. }
            | PartDescriptor::Element { index }
            | PartDescriptor::Comment { index } => *index,
        }
    }

    /// Number of template values this binding consumes.
    pub fn value_count(&self) -> usize {
        match self {
            PartDescriptor::Attribute { strings, .. } => strings.len().saturating_sub(1),
            _ => 1,
        }
    }
}

/// An immutable compiled template.
#[derive(Debug)]
pub struct Template {
    strings_id: usize,
    kind: ResultKind,
    fragment: Fragment,
    parts: Vec<PartDescriptor>,
}

struct Walk<'a> {
    index: usize,
    attribute_names: std::slice::Iter<'a, String>,
    parts: Vec<PartDescriptor>,
}

impl Template {
    /// The cached template for `result`'s call site, compiling it on first use.
    pub fn get_or_compile(result: &TemplateResult) -> Result<Rc<Template>> {
        let segments = result.strings.segments().len();
        if segments == 0 || segments - 1 != result.values.len() {
            return Err(Error::InvalidTemplateStrings {
                segments,
                values: result.values.len(),
            });
        }

        let id = result.strings.id();
        if let Some(template) = TEMPLATE_CACHE.with(|cache| cache.borrow().get(&id).cloned()) {
            tracing::trace!(template = id, "template cache hit");
            return Ok(template);
        }

        let template = Rc::new(Self::compile(result.strings, result.kind)?);
        TEMPLATE_CACHE.with(|cache| cache.borrow_mut().insert(id, template.clone()));
        Ok(template)
    }

    /// Compile a template without consulting the cache.
    pub fn compile(strings: &TemplateStrings, kind: ResultKind) -> Result<Template> {
        let compiled = template_html(strings.segments(), kind)?;
        let mut fragment = parse_fragment(&compiled.html);

        // Foreign templates were parsed inside a wrapper element.
        if kind != ResultKind::Html {
            if let [FragmentNode::Element(wrapper)] = fragment.children.as_mut_slice() {
                fragment.children = std::mem::take(&mut wrapper.children);
            }
        }

        let mut walk = Walk {
            index: 0,
            attribute_names: compiled.attribute_names.iter(),
            parts: Vec::new(),
        };
        walk_nodes(&mut fragment.children, &mut walk);

        let expected = strings.binding_count();
        let found: usize = walk.parts.iter().map(PartDescriptor::value_count).sum();
        if expected != found {
            return Err(Error::PartCountMismatch { expected, found });
        }

        tracing::debug!(
            template = strings.id(),
            ?kind,
            parts = walk.parts.len(),
            "compiled template"
        );

        Ok(Template {
            strings_id: strings.id(),
            kind,
            fragment,
            parts: walk.parts,
        })
    }

    /// Identity of the call site this template was compiled from.
    pub fn strings_id(&self) -> usize {
        self.strings_id
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    /// The parsed stamp, with all markers resolved.
    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    pub fn parts(&self) -> &[PartDescriptor] {
        &self.parts
    }

    /// Number of templates cached on this thread.
    pub fn cached_count() -> usize {
        TEMPLATE_CACHE.with(|cache| cache.borrow().len())
    }
}

fn walk_nodes(nodes: &mut [FragmentNode], walk: &mut Walk<'_>) {
    for node in nodes.iter_mut() {
        match node {
            FragmentNode::Element(el) => {
                handle_attributes(el, walk);
                if raw_text_element().is_match(&el.tag) {
                    split_raw_text(el);
                }
                walk.index += 1;
                walk_nodes(&mut el.children, walk);
            }
            FragmentNode::Comment(data) => {
                handle_comment(data, walk);
                walk.index += 1;
            }
            FragmentNode::Text(_) => {}
        }
    }
}

fn handle_attributes(el: &mut FragmentElement, walk: &mut Walk<'_>) {
    let names: Vec<String> = el.attributes.iter().map(|(n, _)| n.clone()).collect();
    for name in names {
        if name.ends_with(BOUND_ATTRIBUTE_SUFFIX) {
            let Some(real_name) = walk.attribute_names.next() else {
                continue;
            };
            let value = el.take_attribute(&name).unwrap_or_default();
            let strings: Rc<[String]> = value.split(marker()).map(String::from).collect();
            let (kind, name) = match real_name.chars().next() {
                Some('.') => (AttributeKind::Property, &real_name[1..]),
                Some('?') => (AttributeKind::Boolean, &real_name[1..]),
                Some('@') => (AttributeKind::Event, &real_name[1..]),
                _ => (AttributeKind::Attribute, real_name.as_str()),
            };
            walk.parts.push(PartDescriptor::Attribute {
                index: walk.index,
                kind,
                name: name.to_string(),
                strings,
            });
        } else if name.starts_with(marker()) {
            el.take_attribute(&name);
            walk.parts.push(PartDescriptor::Element { index: walk.index });
        }
    }
}

/// Comments are inert inside raw-text elements, so markers there are plain
/// text. Split the text and put real marker comments between the pieces.
fn split_raw_text(el: &mut FragmentElement) {
    let text: String = el
        .children
        .iter()
        .filter_map(|c| match c {
            FragmentNode::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect();
    let pieces: Vec<&str> = text.split(marker()).collect();
    if pieces.len() < 2 {
        return;
    }

    let mut children = Vec::with_capacity(pieces.len() * 2);
    let last = pieces.len() - 1;
    for (i, piece) in pieces.iter().enumerate() {
        if !piece.is_empty() {
            children.push(FragmentNode::Text(piece.to_string()));
        }
        let data = if i < last { marker_match() } else { "" };
        children.push(FragmentNode::Comment(data.to_string()));
    }
    el.children = children;
}

fn handle_comment(data: &str, walk: &mut Walk<'_>) {
    if data == marker_match() {
        walk.parts.push(PartDescriptor::Child { index: walk.index });
        return;
    }
    for _ in data.matches(marker()) {
        walk.parts.push(PartDescriptor::Comment { index: walk.index });
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
