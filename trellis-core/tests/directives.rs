//! Integration tests for the built-in directives.

use futures_util::stream;
use tokio::sync::mpsc;
use tokio::task::LocalSet;

use trellis_core::directive::{
    async_replace, async_replace_with, cache, if_defined, template_content, value_stream,
};
use trellis_core::dom::{Document, NodeId, NodeType};
use trellis_core::{html, render, Error, PartKind, RenderOptions, Value};

fn mount(doc: &Document) -> NodeId {
    let container = doc.create_element("div").unwrap();
    doc.append_child(doc.root(), container).unwrap();
    container
}

/// Let spawned local tasks run.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

fn channel_stream() -> (mpsc::UnboundedSender<Value>, Value) {
    let (tx, rx) = mpsc::unbounded_channel::<Value>();
    let values = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|value| (value, rx))
    });
    (tx, value_stream(values))
}

#[test]
fn if_defined_drops_null_attributes() {
    fn image(src: Value) -> trellis_core::TemplateResult {
        html!("<img src={}>", if_defined(src))
    }

    let doc = Document::new();
    let container = mount(&doc);
    render(image(Value::Null), &doc, container, RenderOptions::default()).unwrap();
    assert_eq!(doc.inner_html_without_comments(container), "<img>");

    render(image(Value::str("a.png")), &doc, container, RenderOptions::default()).unwrap();
    assert_eq!(
        doc.inner_html_without_comments(container),
        "<img src=\"a.png\">"
    );
}

#[test]
fn template_content_stamps_a_copy() {
    let doc = Document::new();
    let template = doc.create_element("template").unwrap();
    let p = doc.create_element("p").unwrap();
    doc.append_child(p, doc.create_text("copied").unwrap()).unwrap();
    doc.append_child(template, p).unwrap();

    let container = mount(&doc);
    render(
        html!("<section>{}</section>", template_content(template)),
        &doc,
        container,
        RenderOptions::default(),
    )
    .unwrap();
    assert_eq!(
        doc.inner_html_without_comments(container),
        "<section><p>copied</p></section>"
    );
    // The source is untouched.
    assert_eq!(doc.children(template), vec![p]);
}

#[test]
fn template_content_rejects_attribute_bindings() {
    let doc = Document::new();
    let template = doc.create_element("template").unwrap();
    let container = mount(&doc);
    let result = render(
        html!("<div title={}></div>", template_content(template)),
        &doc,
        container,
        RenderOptions::default(),
    );
    assert!(matches!(
        result,
        Err(Error::UnsupportedDirective {
            directive: "template_content",
            kind: PartKind::Attribute,
        })
    ));
}

fn first_child_element(doc: &Document, parent: NodeId) -> NodeId {
    doc.children(parent)
        .into_iter()
        .find(|&n| doc.tag_name(n).is_some())
        .unwrap()
}

fn tabbed(tab: &str, text: &str) -> Value {
    let view = match tab {
        "form" => html!("<form>{}</form>", text),
        _ => html!("<article>{}</article>", text),
    };
    html!("<main>{}</main>", cache(view)).into()
}

#[test]
fn cache_reuses_the_dom_of_a_returning_template() {
    let doc = Document::new();
    let container = mount(&doc);
    let show = |tab: &str, text: &str| {
        render(tabbed(tab, text), &doc, container, RenderOptions::default()).unwrap();
        first_child_element(&doc, first_child_element(&doc, container))
    };

    let form = show("form", "draft");
    doc.set_attribute(form, "data-touched", "yes");
    let article = show("article", "read");
    assert_ne!(article, form);
    assert_eq!(
        doc.inner_html_without_comments(container),
        "<main><article>read</article></main>"
    );
    // The stashed form is detached but still alive.
    assert_eq!(doc.parent(form).and_then(|p| doc.node_type(p)), Some(NodeType::Fragment));

    let again = show("form", "edited");
    assert_eq!(again, form);
    assert_eq!(doc.get_attribute(again, "data-touched").as_deref(), Some("yes"));
    assert_eq!(
        doc.inner_html_without_comments(container),
        "<main><form>edited</form></main>"
    );
    assert_eq!(show("article", "back"), article);
}

fn italic(text: &str) -> Value {
    html!("<i>{}</i>", text).into()
}

#[test]
fn cache_passes_plain_values_through() {
    let doc = Document::new();
    let container = mount(&doc);
    let draw = |value: Value| {
        render(
            html!("<main>{}</main>", cache(value)),
            &doc,
            container,
            RenderOptions::default(),
        )
        .unwrap();
    };

    draw(italic("a"));
    let first = first_child_element(&doc, first_child_element(&doc, container));
    draw(Value::str("plain"));
    assert_eq!(doc.inner_html_without_comments(container), "<main>plain</main>");
    draw(italic("b"));
    assert_eq!(first_child_element(&doc, first_child_element(&doc, container)), first);
    assert_eq!(doc.inner_html_without_comments(container), "<main><i>b</i></main>");
}

#[test]
fn dropping_a_cache_releases_what_it_kept() {
    let doc = Document::new();
    let container = mount(&doc);
    let baseline = doc.node_count();

    render(tabbed("form", "x"), &doc, container, RenderOptions::default()).unwrap();
    render(tabbed("article", "y"), &doc, container, RenderOptions::default()).unwrap();
    render(Value::Nothing, &doc, container, RenderOptions::default()).unwrap();
    // The render root's start marker stays.
    assert_eq!(doc.node_count(), baseline + 1);
}

#[test]
fn cache_rejects_attribute_bindings() {
    let doc = Document::new();
    let container = mount(&doc);
    let result = render(
        html!("<div title={}></div>", cache("x")),
        &doc,
        container,
        RenderOptions::default(),
    );
    assert!(matches!(
        result,
        Err(Error::UnsupportedDirective {
            directive: "cache",
            kind: PartKind::Attribute
        })
    ));
}

#[tokio::test]
async fn async_replace_renders_values_as_they_arrive() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let container = mount(&doc);
            let (tx, values) = channel_stream();

            render(
                html!("<p>{}</p>", async_replace(values)),
                &doc,
                container,
                RenderOptions::default(),
            )
            .unwrap();
            assert_eq!(doc.inner_html_without_comments(container), "<p></p>");

            tx.send(Value::str("one")).unwrap();
            settle().await;
            assert_eq!(doc.inner_html_without_comments(container), "<p>one</p>");

            tx.send(Value::str("two")).unwrap();
            settle().await;
            assert_eq!(doc.inner_html_without_comments(container), "<p>two</p>");
        })
        .await;
}

#[tokio::test]
async fn async_replace_pauses_while_disconnected() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let container = mount(&doc);
            let (tx, values) = channel_stream();

            let root = render(
                html!("<p>{}</p>", async_replace(values)),
                &doc,
                container,
                RenderOptions::default(),
            )
            .unwrap();
            tx.send(Value::str("one")).unwrap();
            settle().await;

            root.set_connected(false);
            tx.send(Value::str("two")).unwrap();
            settle().await;
            assert_eq!(doc.inner_html_without_comments(container), "<p>one</p>");

            root.set_connected(true);
            settle().await;
            assert_eq!(doc.inner_html_without_comments(container), "<p>two</p>");
        })
        .await;
}

#[tokio::test]
async fn async_replace_maps_values_with_their_index() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let container = mount(&doc);
            let (tx, values) = channel_stream();

            render(
                html!(
                    "<p>{}</p>",
                    async_replace_with(values, |value, index| {
                        Value::str(format!("{index}:{}", value.to_text()))
                    })
                ),
                &doc,
                container,
                RenderOptions::default(),
            )
            .unwrap();

            tx.send(Value::str("a")).unwrap();
            tx.send(Value::str("b")).unwrap();
            settle().await;
            assert_eq!(doc.inner_html_without_comments(container), "<p>1:b</p>");
        })
        .await;
}

#[tokio::test]
async fn replaced_async_content_stops_listening() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let container = mount(&doc);
            let (tx, values) = channel_stream();

            render(
                html!("<p>{}</p>", async_replace(values)),
                &doc,
                container,
                RenderOptions::default(),
            )
            .unwrap();
            render("done", &doc, container, RenderOptions::default()).unwrap();

            // The loop may already be gone, closing the channel.
            let _ = tx.send(Value::str("late"));
            settle().await;
            assert_eq!(doc.inner_html_without_comments(container), "done");
        })
        .await;
}
