//! Integration tests for the reactive update scheduler.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tokio::task::LocalSet;
use tracing_subscriber::EnvFilter;

use trellis_core::dom::{Document, MutationRecord, NodeId};
use trellis_core::reactive::{
    AttributeConverter, ChangedProperties, Component, Host, PropertyDeclaration, PropertyKind,
    ReactiveController, ReactiveControllerHost, ReactiveElement, Task, TaskConfig, TaskRenderer,
    TaskStatus, UpdateOptions,
};
use trellis_core::{html, Error, Result, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn element(doc: &Document, tag: &str) -> NodeId {
    let node = doc.create_element(tag).unwrap();
    doc.append_child(doc.root(), node).unwrap();
    node
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ----------------------------------------------------------------------------
// Batching
// ----------------------------------------------------------------------------

#[derive(Default)]
struct Observed {
    passes: Vec<ChangedProperties>,
}

impl Component for Observed {
    fn properties() -> Vec<PropertyDeclaration> {
        vec![
            PropertyDeclaration::new("a").kind(PropertyKind::Number),
            PropertyDeclaration::new("b"),
        ]
    }

    fn render(&self, host: &Host) -> Result<Value> {
        Ok(html!("<span>{}</span>", host.get("a")).into())
    }

    fn updated(&mut self, _host: &Host, changed: &ChangedProperties) -> Result<()> {
        self.passes.push(changed.clone());
        Ok(())
    }
}

#[tokio::test]
async fn writes_before_a_pass_coalesce() {
    init_tracing();
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-observed"), Observed::default());
            el.set("a", 1);
            el.connect().unwrap();
            assert!(el.update_complete().await.unwrap());
            el.component_mut().passes.clear();

            el.set("a", 1);
            assert!(!el.host().is_update_pending());

            el.set("a", 2);
            el.set("a", 3);
            el.set("b", "x");
            el.set("a", 4);
            assert!(el.host().is_update_pending());
            assert!(el.update_complete().await.unwrap());
            settle().await;

            let observed = el.component();
            assert_eq!(observed.passes.len(), 1);
            let changed = &observed.passes[0];
            assert_eq!(changed.old_value("a").and_then(Value::as_number), Some(1.0));
            assert!(matches!(changed.old_value("b"), Some(Value::Null)));
            assert_eq!(changed.len(), 2);

            let root = el.host().render_root().unwrap();
            assert_eq!(doc.inner_html_without_comments(root), "<span>4</span>");
        })
        .await;
}

#[tokio::test]
async fn first_pass_reports_initial_values_as_null() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-observed"), Observed::default());
            el.set("a", 5);
            el.connect().unwrap();
            el.update_complete().await.unwrap();

            let observed = el.component();
            assert!(matches!(observed.passes[0].old_value("a"), Some(Value::Null)));
        })
        .await;
}

#[tokio::test]
async fn writes_in_updated_schedule_another_pass() {
    struct Echo;

    impl Component for Echo {
        fn properties() -> Vec<PropertyDeclaration> {
            vec![
                PropertyDeclaration::new("input"),
                PropertyDeclaration::state("output"),
            ]
        }

        fn updated(&mut self, host: &Host, changed: &ChangedProperties) -> Result<()> {
            if changed.contains("input") {
                host.set("output", host.get("input"));
            }
            Ok(())
        }
    }

    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-echo"), Echo);
            el.connect().unwrap();
            el.update_complete().await.unwrap();

            el.set("input", "hi");
            assert!(!el.update_complete().await.unwrap());
            assert!(el.update_complete().await.unwrap());
            assert_eq!(el.get("output").as_str(), Some("hi"));
        })
        .await;
}

// ----------------------------------------------------------------------------
// Failures
// ----------------------------------------------------------------------------

#[derive(Default)]
struct Fragile {
    fail: bool,
    renders: usize,
}

impl Component for Fragile {
    fn will_update(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        if self.fail {
            return Err(Error::hook("will_update", "boom"));
        }
        Ok(())
    }

    fn render(&self, _host: &Host) -> Result<Value> {
        Ok(Value::str("ok"))
    }

    fn update(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        self.renders += 1;
        Ok(())
    }
}

#[tokio::test]
async fn hook_errors_reach_the_awaiter_and_do_not_wedge() {
    init_tracing();
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-fragile"), Fragile::default());
            el.connect().unwrap();
            el.update_complete().await.unwrap();

            el.component_mut().fail = true;
            el.request_update();
            let err = el.update_complete().await.unwrap_err();
            assert!(matches!(err, Error::Hook { hook: "will_update", .. }));
            assert!(!el.host().is_update_pending());
            assert_eq!(el.component().renders, 1);

            el.component_mut().fail = false;
            el.request_update();
            assert!(el.update_complete().await.unwrap());
            assert_eq!(el.component().renders, 2);
        })
        .await;
}

#[tokio::test]
async fn vetoed_passes_skip_rendering() {
    struct Closed;

    impl Component for Closed {
        fn should_update(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<bool> {
            Ok(false)
        }

        fn render(&self, _host: &Host) -> Result<Value> {
            Ok(Value::str("never"))
        }
    }

    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-closed"), Closed);
            el.connect().unwrap();
            assert!(el.update_complete().await.unwrap());
            assert!(!el.host().has_updated());
            assert!(el.host().root_part().is_none());
        })
        .await;
}

// ----------------------------------------------------------------------------
// Reflection
// ----------------------------------------------------------------------------

struct Shout;

impl AttributeConverter for Shout {
    fn to_attribute(&self, value: &Value, _kind: PropertyKind) -> Option<String> {
        Some(value.to_text().to_uppercase())
    }

    fn from_attribute(&self, value: Option<&str>, _kind: PropertyKind) -> Value {
        value.map_or(Value::Null, |text| Value::str(text.to_lowercase()))
    }
}

struct Toggle;

impl Component for Toggle {
    fn properties() -> Vec<PropertyDeclaration> {
        vec![
            PropertyDeclaration::new("open")
                .kind(PropertyKind::Boolean)
                .reflect(),
            PropertyDeclaration::new("label").converter(Shout).reflect(),
        ]
    }
}

#[tokio::test]
async fn reflection_does_not_echo() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            doc.record_mutations(true);
            let node = element(&doc, "x-toggle");
            let el = ReactiveElement::new(&doc, node, Toggle);
            el.connect().unwrap();
            el.update_complete().await.unwrap();

            el.set("open", true);
            el.update_complete().await.unwrap();
            assert!(doc.has_attribute(node, "open"));
            el.set("open", false);
            el.update_complete().await.unwrap();
            assert!(!doc.has_attribute(node, "open"));

            doc.take_mutations();
            doc.set_attribute(node, "label", "HeLLo");
            assert_eq!(el.get("label").as_str(), Some("hello"));
            el.update_complete().await.unwrap();

            let label_writes = doc
                .take_mutations()
                .into_iter()
                .filter(|m| matches!(m, MutationRecord::Attribute { name, .. } if name == "label"))
                .count();
            assert_eq!(label_writes, 1);
            assert_eq!(doc.get_attribute(node, "label").as_deref(), Some("HeLLo"));

            el.set("label", "quiet");
            el.update_complete().await.unwrap();
            assert_eq!(doc.get_attribute(node, "label").as_deref(), Some("QUIET"));
        })
        .await;
}

// ----------------------------------------------------------------------------
// Controllers
// ----------------------------------------------------------------------------

type Log = Rc<RefCell<Vec<&'static str>>>;

struct Recorder {
    log: Log,
}

impl ReactiveController for Recorder {
    fn host_connected(&self) {
        self.log.borrow_mut().push("host_connected");
    }

    fn host_disconnected(&self) {
        self.log.borrow_mut().push("host_disconnected");
    }

    fn host_update(&self) {
        self.log.borrow_mut().push("host_update");
    }

    fn host_updated(&self) {
        self.log.borrow_mut().push("host_updated");
    }
}

struct Traced {
    log: Log,
}

impl Component for Traced {
    fn will_update(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        self.log.borrow_mut().push("will_update");
        Ok(())
    }

    fn render(&self, _host: &Host) -> Result<Value> {
        self.log.borrow_mut().push("render");
        Ok(Value::Null)
    }

    fn first_updated(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        self.log.borrow_mut().push("first_updated");
        Ok(())
    }

    fn updated(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        self.log.borrow_mut().push("updated");
        Ok(())
    }
}

#[tokio::test]
async fn controllers_follow_the_host_lifecycle() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let log = Log::default();
            let traced = Traced { log: log.clone() };
            let el = ReactiveElement::new(&doc, element(&doc, "x-traced"), traced);
            let recorder: Rc<dyn ReactiveController> = Rc::new(Recorder { log: log.clone() });
            el.host().add_controller(recorder.clone());

            el.connect().unwrap();
            el.update_complete().await.unwrap();
            assert_eq!(
                *log.borrow(),
                [
                    "host_connected",
                    "will_update",
                    "host_update",
                    "render",
                    "host_updated",
                    "first_updated",
                    "updated",
                ]
            );

            log.borrow_mut().clear();
            el.disconnect();
            el.host().remove_controller(&recorder);
            el.connect().unwrap();
            assert_eq!(*log.borrow(), ["host_disconnected"]);

            // Added while connected: notified right away.
            el.host().add_controller(Rc::new(Recorder { log: log.clone() }));
            assert_eq!(log.borrow().last(), Some(&"host_connected"));
        })
        .await;
}

/// Keeps its own counter and reports changes to it through the host.
#[derive(Default)]
struct Ticker {
    ticks: Cell<u32>,
}

impl Ticker {
    fn tick(&self, host: &dyn ReactiveControllerHost, options: UpdateOptions) {
        let old = self.ticks.replace(self.ticks.get() + 1);
        host.request_property_update("ticks", Value::from(f64::from(old)), options);
    }
}

impl ReactiveController for Ticker {}

#[tokio::test]
async fn controllers_report_property_changes_with_old_values() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-observed"), Observed::default());
            let ticker = Rc::new(Ticker::default());
            el.host().add_controller(ticker.clone());
            el.connect().unwrap();
            el.update_complete().await.unwrap();
            el.component_mut().passes.clear();

            // The predicate override decides; a rejected change schedules nothing.
            ticker.tick(el.host(), UpdateOptions::new().has_changed(|_, _| false));
            assert!(!el.host().is_update_pending());

            ticker.tick(el.host(), UpdateOptions::new().has_changed(|_, _| true));
            assert!(el.host().is_update_pending());
            el.update_complete().await.unwrap();
            {
                let observed = el.component();
                assert_eq!(observed.passes.len(), 1);
                assert_eq!(
                    observed.passes[0].old_value("ticks").and_then(Value::as_number),
                    Some(1.0)
                );
            }

            // "b" is declared without reflection; the override reflects it once.
            el.set("b", "shown");
            el.update_complete().await.unwrap();
            assert!(!doc.has_attribute(el.element(), "b"));
            el.host().request_property_update("b", Value::Null, UpdateOptions::new().reflect(true));
            el.update_complete().await.unwrap();
            assert_eq!(doc.get_attribute(el.element(), "b").as_deref(), Some("shown"));
        })
        .await;
}

// ----------------------------------------------------------------------------
// Tasks
// ----------------------------------------------------------------------------

#[derive(Default)]
struct Loader {
    task: Option<Rc<Task>>,
}

impl Component for Loader {
    fn properties() -> Vec<PropertyDeclaration> {
        vec![PropertyDeclaration::new("id").kind(PropertyKind::Number)]
    }

    fn render(&self, _host: &Host) -> Result<Value> {
        let Some(task) = &self.task else {
            return Ok(Value::Nothing);
        };
        Ok(task.render(&TaskRenderer {
            pending: Some(&|| Value::str("loading")),
            complete: Some(&|value: &Value| value.clone()),
            ..Default::default()
        }))
    }
}

#[tokio::test]
async fn task_runs_when_its_arguments_change() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-loader"), Loader::default());
            let runs = Rc::new(Cell::new(0));
            let counter = runs.clone();
            let host = el.host().downgrade();
            let task = Task::new(
                el.host(),
                TaskConfig::new(move |args, _signal| {
                    counter.set(counter.get() + 1);
                    async move { Ok(Value::str(format!("loaded {}", args[0].to_text()))) }
                })
                .args(move || {
                    host.upgrade()
                        .map(|host| vec![host.get("id")])
                        .unwrap_or_default()
                })
                .on_complete(|_| Err(Error::hook("on_complete", "ignored"))),
            );
            el.component_mut().task = Some(task.clone());

            el.set("id", 1);
            el.connect().unwrap();
            el.update_complete().await.unwrap();
            let root = el.host().render_root().unwrap();
            assert_eq!(task.status(), TaskStatus::Pending);
            assert_eq!(doc.text_content(root), "loading");

            assert_eq!(task.task_complete().await.unwrap().as_str(), Some("loaded 1"));
            el.update_complete().await.unwrap();
            assert_eq!(task.status(), TaskStatus::Complete);
            assert_eq!(doc.text_content(root), "loaded 1");

            el.set("id", 1);
            el.request_update();
            el.update_complete().await.unwrap();
            settle().await;
            assert_eq!(runs.get(), 1);

            el.set("id", 2);
            el.update_complete().await.unwrap();
            task.task_complete().await.unwrap();
            el.update_complete().await.unwrap();
            assert_eq!(runs.get(), 2);
            assert_eq!(doc.text_content(root), "loaded 2");
        })
        .await;
}

#[tokio::test]
async fn superseded_runs_are_aborted_and_ignored() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-loader"), Loader::default());
            let task = Task::new(
                el.host(),
                TaskConfig::new(|args, signal| async move {
                    if args.first().and_then(Value::as_number) == Some(1.0) {
                        signal.aborted().await;
                        return Err(Error::hook("task", "aborted"));
                    }
                    Ok(args.first().cloned().unwrap_or_default())
                }),
            );

            let first = task.run(Some(vec![Value::from(1)]));
            let second = task.run(Some(vec![Value::from(2)]));
            first.await;
            assert_eq!(task.status(), TaskStatus::Pending);
            second.await;

            assert_eq!(task.status(), TaskStatus::Complete);
            assert_eq!(task.value().and_then(|v| v.as_number()), Some(2.0));
            assert!(task.error().is_none());
        })
        .await;
}

#[tokio::test]
async fn failed_runs_expose_their_error() {
    LocalSet::new()
        .run_until(async {
            let doc = Document::new();
            let el = ReactiveElement::new(&doc, element(&doc, "x-loader"), Loader::default());
            let seen = Rc::new(Cell::new(false));
            let flag = seen.clone();
            let task = Task::new(
                el.host(),
                TaskConfig::new(|_, _| async { Err(Error::hook("task", "offline")) }).on_error(
                    move |_| {
                        flag.set(true);
                        Ok(())
                    },
                ),
            );

            task.run(None).await;
            assert_eq!(task.status(), TaskStatus::Error);
            assert!(seen.get());
            assert!(matches!(
                task.task_complete().await,
                Err(Error::Hook { hook: "task", .. })
            ));
        })
        .await;
}
