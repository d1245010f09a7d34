//! HTML fragment parser.
//!
//! Parses the compiled HTML of a template into an owned [`Fragment`]. The
//! parser covers the grammar templates use:
//!
//! - text with character references (`&amp;`, `&#39;`, `&#x2F;`, ...),
//! - comments, plus bogus comments (`<?...>`, `<!...>`, `</1...>`), which is
//!   how child markers survive parsing,
//! - start tags with quoted, unquoted and bare attributes (first duplicate
//!   wins, names lowercased),
//! - void elements and raw-text elements (`script`, `style`, `textarea`,
//!   `title`),
//! - SVG and MathML subtrees, including self-closing tags and the HTML
//!   integration points (`foreignObject`, `mi`, ...).
//!
//! It does not implement the implicit tree fix-ups of a browser (auto-closing
//! `<p>`, table foster parenting). Unmatched end tags are ignored and open
//! elements are closed at the end of input.

use std::borrow::Cow;

use super::fragment::{Fragment, FragmentElement, FragmentNode};
use super::Namespace;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

const SVG_TAG_CASE: &[&str] = &[
    "animateMotion",
    "animateTransform",
    "clipPath",
    "feBlend",
    "feColorMatrix",
    "feComposite",
    "feDropShadow",
    "feFlood",
    "feGaussianBlur",
    "feImage",
    "feMerge",
    "feMergeNode",
    "feOffset",
    "feTurbulence",
    "foreignObject",
    "linearGradient",
    "radialGradient",
    "textPath",
];

const SVG_ATTRIBUTE_CASE: &[&str] = &[
    "clipPathUnits",
    "gradientTransform",
    "gradientUnits",
    "markerHeight",
    "markerWidth",
    "pathLength",
    "patternUnits",
    "preserveAspectRatio",
    "refX",
    "refY",
    "stdDeviation",
    "textLength",
    "viewBox",
];

/// Elements that never have children or an end tag.
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Elements whose content is text, never markup.
pub fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Parse an HTML fragment.
pub fn parse_fragment(html: &str) -> Fragment {
    let mut parser = Parser {
        src: html,
        pos: 0,
        stack: Vec::new(),
        roots: Vec::new(),
    };
    parser.run();
    parser.finish()
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    stack: Vec<FragmentElement>,
    roots: Vec<FragmentNode>,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn run(&mut self) {
        while self.pos < self.src.len() {
            let rest = self.rest();
            match rest.find('<') {
                Some(0) => self.markup(),
                Some(i) => {
                    self.text(&decode_entities(&rest[..i]));
                    self.pos += i;
                }
                None => {
                    self.text(&decode_entities(rest));
                    self.pos = self.src.len();
                }
            }
        }
    }

    fn finish(mut self) -> Fragment {
        while let Some(el) = self.stack.pop() {
            self.append(FragmentNode::Element(el));
        }
        Fragment {
            children: self.roots,
        }
    }

    fn append(&mut self, node: FragmentNode) {
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        // Adjacent text merges into one node.
        if let FragmentNode::Text(data) = &node {
            if let Some(FragmentNode::Text(prev)) = siblings.last_mut() {
                prev.push_str(data);
                return;
            }
        }
        siblings.push(node);
    }

    fn text(&mut self, data: &str) {
        if !data.is_empty() {
            self.append(FragmentNode::Text(data.to_string()));
        }
    }

    fn markup(&mut self) {
        let rest = self.rest();
        let bytes = rest.as_bytes();
        if rest.starts_with("<!--") {
            self.comment();
        } else if rest.starts_with("<?") {
            self.bogus_comment(1);
        } else if rest.starts_with("<!") {
            self.bogus_comment(2);
        } else if rest.starts_with("</") {
            match bytes.get(2) {
                Some(b) if b.is_ascii_alphabetic() => self.end_tag(),
                Some(b'>') => self.pos += 3,
                Some(_) => self.bogus_comment(2),
                None => {
                    self.text("</");
                    self.pos += 2;
                }
            }
        } else if bytes.get(1).is_some_and(u8::is_ascii_alphabetic) {
            self.start_tag();
        } else {
            self.text("<");
            self.pos += 1;
        }
    }

    fn comment(&mut self) {
        let body = &self.rest()[4..];
        if body.starts_with('>') {
            self.append(FragmentNode::Comment(String::new()));
            self.pos += 5;
            return;
        }
        if body.starts_with("->") {
            self.append(FragmentNode::Comment(String::new()));
            self.pos += 6;
            return;
        }
        match body.find("-->") {
            Some(end) => {
                self.append(FragmentNode::Comment(body[..end].to_string()));
                self.pos += 4 + end + 3;
            }
            None => {
                self.append(FragmentNode::Comment(body.to_string()));
                self.pos = self.src.len();
            }
        }
    }

    fn bogus_comment(&mut self, skip: usize) {
        let body = &self.rest()[skip..];
        match body.find('>') {
            Some(end) => {
                self.append(FragmentNode::Comment(body[..end].to_string()));
                self.pos += skip + end + 1;
            }
            None => {
                self.append(FragmentNode::Comment(body.to_string()));
                self.pos = self.src.len();
            }
        }
    }

    fn end_tag(&mut self) {
        let body = &self.rest()[2..];
        let name_len = body
            .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
            .unwrap_or(body.len());
        let name = body[..name_len].to_ascii_lowercase();
        self.pos += 2 + body.find('>').map_or(body.len(), |i| i + 1);
        self.close(&name);
    }

    fn close(&mut self, name: &str) {
        let Some(idx) = self
            .stack
            .iter()
            .rposition(|el| el.tag.eq_ignore_ascii_case(name))
        else {
            return;
        };
        while self.stack.len() > idx {
            if let Some(el) = self.stack.pop() {
                self.append(FragmentNode::Element(el));
            }
        }
    }

    fn start_tag(&mut self) {
        let mut cursor = Cursor {
            src: self.src,
            pos: self.pos + 1,
        };
        let name = cursor
            .take_while(|c| !(c.is_ascii_whitespace() || c == '/' || c == '>'))
            .to_ascii_lowercase();

        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;
        loop {
            cursor.skip_whitespace();
            match cursor.peek() {
                None => {
                    // End of input inside a tag drops the tag.
                    self.pos = self.src.len();
                    return;
                }
                Some('>') => {
                    cursor.pos += 1;
                    break;
                }
                Some('/') => {
                    cursor.pos += 1;
                    if cursor.peek() == Some('>') {
                        self_closing = true;
                        cursor.pos += 1;
                        break;
                    }
                }
                Some(_) => {
                    let (attr, value) = cursor.attribute();
                    if !attributes.iter().any(|(n, _)| *n == attr) {
                        attributes.push((attr, value));
                    }
                }
            }
        }
        self.pos = cursor.pos;

        let namespace = self.child_namespace(&name);
        let tag = match namespace {
            Namespace::Svg => adjust_case(SVG_TAG_CASE, name),
            _ => name,
        };
        let mut el = FragmentElement::new(tag, namespace);
        el.attributes = match namespace {
            Namespace::Svg => attributes
                .into_iter()
                .map(|(n, v)| (adjust_case(SVG_ATTRIBUTE_CASE, n), v))
                .collect(),
            _ => attributes,
        };

        match namespace {
            Namespace::Html if is_void_element(&el.tag) => {
                self.append(FragmentNode::Element(el));
            }
            Namespace::Html if is_raw_text_element(&el.tag) => {
                let text = self.raw_text(&el.tag);
                if !text.is_empty() {
                    el.children.push(FragmentNode::Text(text));
                }
                self.append(FragmentNode::Element(el));
            }
            Namespace::Svg | Namespace::MathMl if self_closing => {
                self.append(FragmentNode::Element(el));
            }
            _ => self.stack.push(el),
        }
    }

    /// Consume the content of a raw-text element and its end tag.
    fn raw_text(&mut self, tag: &str) -> String {
        let rest = self.rest();
        let lower = rest.to_ascii_lowercase();
        let needle = format!("</{tag}");
        let mut from = 0;
        let end = loop {
            match lower[from..].find(&needle) {
                None => break None,
                Some(i) => {
                    let at = from + i;
                    let after = lower.as_bytes().get(at + needle.len());
                    match after {
                        None | Some(b'>' | b'/') => break Some(at),
                        Some(b) if b.is_ascii_whitespace() => break Some(at),
                        _ => from = at + needle.len(),
                    }
                }
            }
        };
        let (content, consumed) = match end {
            Some(at) => {
                let close = rest[at..].find('>').map_or(rest.len(), |i| at + i + 1);
                (&rest[..at], close)
            }
            None => (rest, rest.len()),
        };
        let text = if tag == "textarea" || tag == "title" {
            decode_entities(content).into_owned()
        } else {
            content.to_string()
        };
        self.pos += consumed;
        text
    }

    fn child_namespace(&self, name: &str) -> Namespace {
        let html_rules = || match name {
            "svg" => Namespace::Svg,
            "math" => Namespace::MathMl,
            _ => Namespace::Html,
        };
        match self.stack.last() {
            None => html_rules(),
            Some(parent) => match parent.namespace {
                Namespace::Html => html_rules(),
                Namespace::Svg => match parent.tag.as_str() {
                    "foreignObject" | "desc" | "title" => html_rules(),
                    _ => Namespace::Svg,
                },
                Namespace::MathMl => match parent.tag.as_str() {
                    "mi" | "mo" | "mn" | "ms" | "mtext" => html_rules(),
                    "annotation-xml" if name == "svg" => Namespace::Svg,
                    _ => Namespace::MathMl,
                },
            },
        }
    }
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = &self.src[self.pos..];
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|c| c.is_ascii_whitespace());
    }

    /// Read `name`, `name=value`, `name="value"` or `name='value'`.
    fn attribute(&mut self) -> (String, String) {
        // A leading `=` is part of the name.
        let first = self.peek().map_or(0, char::len_utf8);
        let start = self.pos;
        self.pos += first;
        self.take_while(|c| !(c.is_ascii_whitespace() || c == '/' || c == '>' || c == '='));
        let name = self.src[start..self.pos].to_ascii_lowercase();

        let save = self.pos;
        self.skip_whitespace();
        if self.peek() != Some('=') {
            self.pos = save;
            return (name, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let raw = self.take_while(|c| c != quote);
                if self.peek() == Some(quote) {
                    self.pos += 1;
                }
                raw
            }
            _ => self.take_while(|c| !(c.is_ascii_whitespace() || c == '>')),
        };
        (name, decode_entities(value).into_owned())
    }
}

fn adjust_case(table: &[&str], name: String) -> String {
    table
        .iter()
        .find(|t| t.eq_ignore_ascii_case(&name))
        .map_or(name, |t| t.to_string())
}

/// Decode the character references templates commonly contain.
/// Unknown references are left as written.
pub(crate) fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let Some(semi) = rest.find(';').filter(|&i| i <= 10) else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };
        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => entity.strip_prefix('#').and_then(|num| {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            }),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
