//! HTML serialization, used by tests and debugging.

use super::{is_raw_text_element, is_void_element, Arena, Document, NodeId, NodeKind};

impl Document {
    /// Serialize the children of `id`.
    ///
    /// Comments are included, so rendered output shows the part markers.
    pub fn inner_html(&self, id: NodeId) -> String {
        let arena = self.inner.borrow();
        let mut out = String::new();
        if arena.get(id).is_some() {
            for child in arena.children(id) {
                write_node(&arena, child, &mut out);
            }
        }
        out
    }

    /// Serialize `id` and its subtree.
    pub fn outer_html(&self, id: NodeId) -> String {
        let arena = self.inner.borrow();
        let mut out = String::new();
        if arena.get(id).is_some() {
            write_node(&arena, id, &mut out);
        }
        out
    }

    /// Like [`inner_html`](Self::inner_html) with comments stripped.
    pub fn inner_html_without_comments(&self, id: NodeId) -> String {
        let arena = self.inner.borrow();
        let mut out = String::new();
        if arena.get(id).is_some() {
            for child in arena.children(id) {
                write_node_filtered(&arena, child, &mut out, false);
            }
        }
        out
    }
}

fn write_node(arena: &Arena, id: NodeId, out: &mut String) {
    write_node_filtered(arena, id, out, true);
}

fn write_node_filtered(arena: &Arena, id: NodeId, out: &mut String, comments: bool) {
    match &arena.nodes[id.index()].kind {
        NodeKind::Text(data) => {
            let raw = arena.nodes[id.index()]
                .parent
                .and_then(|p| arena.element(p))
                .is_some_and(|el| is_raw_text_element(&el.tag));
            if raw {
                out.push_str(data);
            } else {
                escape_into(data, false, out);
            }
        }
        NodeKind::Comment(data) => {
            if comments {
                out.push_str("<!--");
                out.push_str(data);
                out.push_str("-->");
            }
        }
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attributes {
                out.push(' ');
                out.push_str(name);
                if !value.is_empty() {
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
            }
            out.push('>');
            if is_void_element(&el.tag) {
                return;
            }
            for child in arena.children(id) {
                write_node_filtered(arena, child, out, comments);
            }
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
        NodeKind::Document | NodeKind::Fragment | NodeKind::ShadowRoot { .. } => {
            for child in arena.children(id) {
                write_node_filtered(arena, child, out, comments);
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{parse_fragment, Document};

    #[test]
    fn serializes_parsed_markup() {
        let doc = Document::new();
        let html = r#"<ul class="list"><li>a &amp; b</li><!--m--><br><input disabled></ul>"#;
        let frag = doc.import_fragment(&parse_fragment(html)).unwrap();
        assert_eq!(doc.inner_html(frag), html);
        assert_eq!(
            doc.inner_html_without_comments(frag),
            r#"<ul class="list"><li>a &amp; b</li><br><input disabled></ul>"#
        );
    }
}
