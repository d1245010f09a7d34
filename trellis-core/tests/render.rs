//! Integration tests for rendering and binding updates.

use std::cell::Cell;
use std::rc::Rc;

use proptest::prelude::*;

use trellis_core::dom::{Document, ListenerOptions, MutationRecord, NodeId, NodeType};
use trellis_core::{html, render, Listener, RenderOptions, TemplateResult, Value};

fn mount(doc: &Document) -> NodeId {
    doc.record_mutations(true);
    let container = doc.create_element("div").unwrap();
    doc.append_child(doc.root(), container).unwrap();
    container
}

fn draw(doc: &Document, container: NodeId, value: impl Into<Value>) {
    render(value, doc, container, RenderOptions::default()).unwrap();
}

fn nodes_of_type(doc: &Document, container: NodeId, node_type: NodeType) -> Vec<NodeId> {
    doc.children(container)
        .into_iter()
        .filter(|&n| doc.node_type(n) == Some(node_type))
        .collect()
}

fn first_element(doc: &Document, container: NodeId) -> NodeId {
    nodes_of_type(doc, container, NodeType::Element)[0]
}

fn count_nodes(doc: &Document, id: NodeId) -> usize {
    doc.children(id)
        .into_iter()
        .map(|child| 1 + count_nodes(doc, child))
        .sum()
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[test]
fn text_binding_keeps_one_node() {
    let doc = Document::new();
    let container = mount(&doc);

    draw(&doc, container, "hello");
    let before = nodes_of_type(&doc, container, NodeType::Text);
    draw(&doc, container, "world");
    let after = nodes_of_type(&doc, container, NodeType::Text);

    assert_eq!(before.len(), 1);
    assert_eq!(after, before);
    assert_eq!(doc.data(after[0]).as_deref(), Some("world"));
}

fn interpolated(x: &str, y: &str) -> TemplateResult {
    html!("<div name=\"a{}b{}\"></div>", x, y)
}

#[test]
fn interpolated_attribute_writes_only_on_change() {
    let doc = Document::new();
    let container = mount(&doc);

    draw(&doc, container, interpolated("1", "2"));
    let div = first_element(&doc, container);
    assert_eq!(doc.get_attribute(div, "name").as_deref(), Some("a1b2"));

    draw(&doc, container, interpolated("1", "3"));
    assert_eq!(doc.get_attribute(div, "name").as_deref(), Some("a1b3"));

    doc.take_mutations();
    draw(&doc, container, interpolated("1", "3"));
    assert!(doc.take_mutations().is_empty());
}

fn toggle(on: bool) -> TemplateResult {
    html!("<button ?disabled={}></button>", on)
}

#[test]
fn boolean_attribute_toggles_minimally() {
    let doc = Document::new();
    let container = mount(&doc);

    let mut presence = Vec::new();
    let mut writes = Vec::new();
    for on in [true, false, true, true] {
        doc.take_mutations();
        draw(&doc, container, toggle(on));
        let button = first_element(&doc, container);
        presence.push(doc.has_attribute(button, "disabled"));
        writes.push(
            doc.take_mutations()
                .iter()
                .filter(|m| matches!(m, MutationRecord::Attribute { .. }))
                .count(),
        );
    }

    assert_eq!(presence, [true, false, true, true]);
    assert_eq!(writes, [1, 1, 1, 0]);
}

fn clickable(listener: Listener) -> TemplateResult {
    html!("<button @click={}></button>", listener)
}

#[test]
fn listener_option_change_re_registers_once() {
    let doc = Document::new();
    let container = mount(&doc);
    let clicks = Rc::new(Cell::new(0));
    let counter = clicks.clone();
    let f = Listener::new(move |_, _| counter.set(counter.get() + 1));

    draw(&doc, container, clickable(f.clone()));
    doc.take_mutations();

    draw(
        &doc,
        container,
        clickable(f.clone().with_options(ListenerOptions::capture())),
    );
    let changes: Vec<bool> = doc
        .take_mutations()
        .into_iter()
        .filter_map(|m| match m {
            MutationRecord::Listener { added, .. } => Some(added),
            _ => None,
        })
        .collect();
    assert_eq!(changes, [false, true]);

    let button = first_element(&doc, container);
    assert_eq!(doc.listener_count(button, "click"), 1);
    doc.dispatch_event(button, &trellis_core::dom::Event::new("click"));
    assert_eq!(clicks.get(), 1);
}

// ----------------------------------------------------------------------------
// Structure
// ----------------------------------------------------------------------------

fn card(title: &str, body: i32) -> TemplateResult {
    html!(
        "<section class={}><h2>{}</h2><p>{}</p></section>",
        title,
        title,
        body
    )
}

#[test]
fn same_template_keeps_its_nodes() {
    let doc = Document::new();
    let container = mount(&doc);
    draw(&doc, container, card("a", 1));
    let section = first_element(&doc, container);
    draw(&doc, container, card("b", 2));
    assert_eq!(first_element(&doc, container), section);
    assert_eq!(
        doc.inner_html_without_comments(container),
        "<section class=\"b\"><h2>b</h2><p>2</p></section>"
    );
}

#[test]
fn different_template_replaces_content() {
    let doc = Document::new();
    let container = mount(&doc);
    draw(&doc, container, card("a", 1));
    draw(&doc, container, html!("<em>{}</em>", "x"));
    assert_eq!(doc.inner_html_without_comments(container), "<em>x</em>");
}

#[test]
fn nested_templates_and_lists() {
    let doc = Document::new();
    let container = mount(&doc);
    let items: Vec<Value> = ["x", "y"]
        .into_iter()
        .map(|s| html!("<li>{}</li>", s).into())
        .collect();
    draw(&doc, container, html!("<ul>{}</ul>", items));
    assert_eq!(
        doc.inner_html_without_comments(container),
        "<ul><li>x</li><li>y</li></ul>"
    );
}

#[test]
fn idempotent_second_pass_for_every_binding_kind() {
    fn view(listener: Listener) -> TemplateResult {
        html!(
            "<div title={} .value={} ?hidden={} @click={} {}>{}</div>",
            "t",
            7,
            true,
            listener,
            Value::Null,
            "text"
        )
    }

    let doc = Document::new();
    let container = mount(&doc);
    let listener = Listener::new(|_, _| {});
    draw(&doc, container, view(listener.clone()));
    doc.take_mutations();
    draw(&doc, container, view(listener));
    assert!(doc.take_mutations().is_empty());
}

#[test]
fn nothing_removes_an_attribute_and_null_empties_it() {
    fn view(value: Value) -> TemplateResult {
        html!("<a href={}></a>", value)
    }

    let doc = Document::new();
    let container = mount(&doc);
    draw(&doc, container, view(Value::Null));
    let a = first_element(&doc, container);
    assert_eq!(doc.get_attribute(a, "href").as_deref(), Some(""));
    draw(&doc, container, view(Value::Nothing));
    assert!(!doc.has_attribute(a, "href"));
}

// ----------------------------------------------------------------------------
// Node lifetime
// ----------------------------------------------------------------------------

fn paragraph(text: &str) -> TemplateResult {
    html!("<p>{}</p>", text)
}

fn bold(text: &str) -> TemplateResult {
    html!("<b>{}</b>", text)
}

#[test]
fn switching_templates_does_not_grow_the_document() {
    let doc = Document::new();
    let container = doc.create_element("div").unwrap();
    doc.append_child(doc.root(), container).unwrap();

    draw(&doc, container, paragraph("warm"));
    draw(&doc, container, bold("up"));
    let settled = doc.node_count();
    for i in 0..2000 {
        let text = i.to_string();
        if i % 2 == 0 {
            draw(&doc, container, paragraph(&text));
        } else {
            draw(&doc, container, bold(&text));
        }
    }
    assert!(doc.node_count() <= settled + 2, "{} live nodes", doc.node_count());
    assert_eq!(doc.inner_html_without_comments(container), "<b>1999</b>");
    // Nothing was asked to record writes.
    assert_eq!(doc.mutation_count(), 0);
}

#[test]
fn caller_nodes_survive_the_template_that_showed_them() {
    let doc = Document::new();
    let container = mount(&doc);
    let badge = doc.create_element("span").unwrap();
    doc.append_child(badge, doc.create_text("new").unwrap()).unwrap();

    draw(&doc, container, html!("<div>{}</div>", badge));
    let div = first_element(&doc, container);
    draw(&doc, container, paragraph("gone"));

    assert_eq!(doc.node_type(div), None);
    assert_eq!(doc.parent(badge), None);
    assert_eq!(doc.text_content(badge), "new");
    draw(&doc, container, badge);
    assert_eq!(doc.inner_html_without_comments(container), "<span>new</span>");
}

#[test]
fn shrinking_lists_release_their_items() {
    let doc = Document::new();
    let container = mount(&doc);
    let items = |len: usize| -> Vec<Value> {
        (0..len)
            .map(|i| paragraph(&i.to_string()).into())
            .collect()
    };

    draw(&doc, container, items(1));
    let small = doc.node_count();
    draw(&doc, container, items(50));
    draw(&doc, container, items(1));
    assert_eq!(doc.node_count(), small);
}

// ----------------------------------------------------------------------------
// Properties
// ----------------------------------------------------------------------------

proptest! {
    #[test]
    fn primitive_commits_reuse_the_text_node(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
        prop_assume!(a != b);
        let doc = Document::new();
        let container = mount(&doc);

        draw(&doc, container, a.as_str());
        let first = nodes_of_type(&doc, container, NodeType::Text);
        let count = count_nodes(&doc, container);
        draw(&doc, container, b.as_str());
        let second = nodes_of_type(&doc, container, NodeType::Text);

        prop_assert_eq!(second.len(), 1);
        prop_assert_eq!(&second, &first);
        prop_assert_eq!(doc.data(second[0]), Some(b));
        prop_assert_eq!(count_nodes(&doc, container), count);
    }

    #[test]
    fn template_node_count_is_stable(values in prop::collection::vec(("[a-z]{0,5}", 0i32..100), 1..6)) {
        let doc = Document::new();
        let container = mount(&doc);
        let mut counts = Vec::new();
        for (title, body) in &values {
            draw(&doc, container, card(title, *body));
            counts.push(count_nodes(&doc, container));
        }
        prop_assert!(counts.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn list_truncation_removes_whole_items(n in 0usize..8, m in 0usize..8) {
        let doc = Document::new();
        let container = mount(&doc);
        let list = |len: usize| -> Vec<Value> {
            (0..len).map(|i| Value::str(format!("item{i}"))).collect()
        };

        draw(&doc, container, list(n));
        let part = render(list(m), &doc, container, RenderOptions::default()).unwrap();

        let fresh = mount(&doc);
        draw(&doc, fresh, list(m));

        prop_assert_eq!(part.committed_items().map(|items| items.len()), Some(m));
        prop_assert_eq!(count_nodes(&doc, container), count_nodes(&doc, fresh));
        prop_assert_eq!(doc.text_content(container), doc.text_content(fresh));
    }
}
