//! Reactive Elements
//!
//! A [`ReactiveElement`] binds a [`Component`] to an element node. The
//! component supplies declarations, styles and lifecycle hooks; the element's
//! [`Host`] schedules updates and renders the component into the element's
//! shadow root.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Counter;
//!
//! impl Component for Counter {
//!     fn properties() -> Vec<PropertyDeclaration> {
//!         vec![PropertyDeclaration::new("count").kind(PropertyKind::Number).reflect()]
//!     }
//!
//!     fn render(&self, host: &Host) -> Result<Value> {
//!         Ok(html!("<span>{}</span>", host.get("count")).into())
//!     }
//! }
//!
//! let element = ReactiveElement::new(&doc, node, Counter);
//! element.connect()?;
//! element.set("count", 1);
//! element.update_complete().await?;
//! ```

use std::any::TypeId;
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::style::{finalize_styles, StyleSheet, Styles};
use crate::value::Value;

use super::controller::ReactiveControllerHost;
use super::host::{Host, Lifecycle, UpdateComplete};
use super::property::{ChangedProperties, Declarations, PropertyDeclaration};

/// Behaviour of a reactive element.
///
/// Hooks receive the [`Host`] to read and write properties. Writes made in
/// `should_update` or `will_update` are part of the current pass; writes in
/// `updated` schedule another one.
pub trait Component: 'static {
    /// The reactive properties, read once per type.
    fn properties() -> Vec<PropertyDeclaration>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Styles adopted into the render root, read once per type.
    fn styles() -> Option<Styles>
    where
        Self: Sized,
    {
        None
    }

    /// Veto a pass. Defaults to updating only while connected.
    fn should_update(&mut self, host: &Host, _changed: &ChangedProperties) -> Result<bool> {
        Ok(host.is_connected())
    }

    fn will_update(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        Ok(())
    }

    /// Runs right before `render`.
    fn update(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        Ok(())
    }

    /// The content of the render root. Property writes made here do not
    /// schedule another pass.
    fn render(&self, _host: &Host) -> Result<Value> {
        Ok(Value::NoChange)
    }

    fn first_updated(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        Ok(())
    }

    fn updated(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
        Ok(())
    }
}

/// Declarations and styles finalized for one component type.
struct ComponentClass {
    declarations: Rc<Declarations>,
    styles: Rc<[StyleSheet]>,
}

thread_local! {
    static CLASSES: RefCell<HashMap<TypeId, Rc<ComponentClass>>> = RefCell::new(HashMap::new());
}

impl ComponentClass {
    fn of<C: Component>() -> Rc<ComponentClass> {
        let id = TypeId::of::<C>();
        if let Some(class) = CLASSES.with(|classes| classes.borrow().get(&id).cloned()) {
            return class;
        }
        let class = Rc::new(ComponentClass {
            declarations: Rc::new(Declarations::new(C::properties())),
            styles: C::styles()
                .map(|styles| finalize_styles(&styles))
                .unwrap_or_default()
                .into(),
        });
        tracing::debug!(
            component = std::any::type_name::<C>(),
            properties = class.declarations.iter().count(),
            "component class finalized"
        );
        CLASSES.with(|classes| classes.borrow_mut().insert(id, class.clone()));
        class
    }
}

struct ElementInner<C> {
    host: Host,
    component: RefCell<C>,
}

impl<C: Component> ElementInner<C> {
    fn component_mut(&self, hook: &'static str) -> Result<RefMut<'_, C>> {
        self.component
            .try_borrow_mut()
            .map_err(|_| Error::hook(hook, "component is already borrowed"))
    }
}

impl<C: Component> Lifecycle for ElementInner<C> {
    fn should_update(&self, host: &Host, changed: &ChangedProperties) -> Result<bool> {
        self.component_mut("should_update")?.should_update(host, changed)
    }

    fn will_update(&self, host: &Host, changed: &ChangedProperties) -> Result<()> {
        self.component_mut("will_update")?.will_update(host, changed)
    }

    fn update(&self, host: &Host, changed: &ChangedProperties) -> Result<()> {
        self.component_mut("update")?.update(host, changed)
    }

    fn render(&self, host: &Host) -> Result<Value> {
        self.component
            .try_borrow()
            .map_err(|_| Error::hook("render", "component is already borrowed"))?
            .render(host)
    }

    fn first_updated(&self, host: &Host, changed: &ChangedProperties) -> Result<()> {
        self.component_mut("first_updated")?.first_updated(host, changed)
    }

    fn updated(&self, host: &Host, changed: &ChangedProperties) -> Result<()> {
        self.component_mut("updated")?.updated(host, changed)
    }
}

/// A component attached to an element node.
///
/// The element must stay alive for updates to run; dropping it turns
/// pending passes into no-ops.
pub struct ReactiveElement<C: Component> {
    inner: Rc<ElementInner<C>>,
}

impl<C: Component> ReactiveElement<C> {
    /// Upgrade `element` with `component`.
    ///
    /// Declared attributes already present on the element are converted to
    /// their properties, and the first update is requested; it runs once
    /// the element is connected. Must be called inside a
    /// [`tokio::task::LocalSet`].
    pub fn new(document: &Document, element: NodeId, component: C) -> Self {
        let class = ComponentClass::of::<C>();
        let host = Host::new(
            document.clone(),
            element,
            class.declarations.clone(),
            class.styles.clone(),
        );
        let inner = Rc::new(ElementInner {
            host: host.clone(),
            component: RefCell::new(component),
        });
        let weak = Rc::downgrade(&inner);
        let lifecycle: Weak<dyn Lifecycle> = weak;
        host.set_lifecycle(lifecycle);
        host.observe_attributes();
        host.request_update();
        Self { inner }
    }

    pub fn host(&self) -> &Host {
        &self.inner.host
    }

    pub fn element(&self) -> NodeId {
        self.inner.host.element()
    }

    /// Borrow the component.
    ///
    /// # Panics
    ///
    /// Panics when called from inside one of the component's own mutable
    /// hooks (`will_update`, `update`, `updated`, ...). Use
    /// [`try_component`](Self::try_component) where that can happen.
    pub fn component(&self) -> Ref<'_, C> {
        self.inner.component.borrow()
    }

    /// Mutably borrow the component.
    ///
    /// # Panics
    ///
    /// Panics while any hook is running. See
    /// [`try_component_mut`](Self::try_component_mut).
    pub fn component_mut(&self) -> RefMut<'_, C> {
        self.inner.component.borrow_mut()
    }

    /// Borrow the component, failing with [`Error::Hook`] while a hook
    /// holds it mutably.
    pub fn try_component(&self) -> Result<Ref<'_, C>> {
        self.inner
            .component
            .try_borrow()
            .map_err(|_| Error::hook("component", "component is already borrowed"))
    }

    /// Mutably borrow the component, failing with [`Error::Hook`] while any
    /// hook is running.
    pub fn try_component_mut(&self) -> Result<RefMut<'_, C>> {
        self.inner.component_mut("component_mut")
    }

    pub fn get(&self, name: &str) -> Value {
        self.inner.host.get(name)
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) {
        self.inner.host.set(name, value);
    }

    pub fn request_update(&self) {
        self.inner.host.request_update();
    }

    pub fn update_complete(&self) -> UpdateComplete {
        self.inner.host.update_complete()
    }

    /// See [`Host::connect`].
    pub fn connect(&self) -> Result<()> {
        self.inner.host.connect()
    }

    pub fn disconnect(&self) {
        self.inner.host.disconnect();
    }
}

impl<C: Component> Clone for ReactiveElement<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html;
    use crate::reactive::PropertyKind;
    use tokio::task::LocalSet;

    struct Greeting {
        renders: usize,
        first_updates: usize,
    }

    impl Component for Greeting {
        fn properties() -> Vec<PropertyDeclaration> {
            vec![
                PropertyDeclaration::new("name"),
                PropertyDeclaration::new("count")
                    .kind(PropertyKind::Number)
                    .reflect(),
            ]
        }

        fn styles() -> Option<Styles> {
            Some(StyleSheet::new("p{color:red}").into())
        }

        fn render(&self, host: &Host) -> Result<Value> {
            Ok(html!("<p>hi {}</p>", host.get("name")).into())
        }

        fn update(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
            self.renders += 1;
            Ok(())
        }

        fn first_updated(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
            self.first_updates += 1;
            Ok(())
        }
    }

    fn greeting(doc: &Document) -> ReactiveElement<Greeting> {
        let node = doc.create_element("x-greeting").unwrap();
        doc.append_child(doc.root(), node).unwrap();
        ReactiveElement::new(
            doc,
            node,
            Greeting {
                renders: 0,
                first_updates: 0,
            },
        )
    }

    #[tokio::test]
    async fn first_pass_waits_for_connect() {
        LocalSet::new()
            .run_until(async {
                let doc = Document::new();
                let el = greeting(&doc);
                el.set("name", "ada");
                tokio::task::yield_now().await;
                assert_eq!(el.component().renders, 0);
                assert!(el.host().is_update_pending());

                el.connect().unwrap();
                assert!(el.update_complete().await.unwrap());
                assert_eq!(el.component().renders, 1);
                assert_eq!(el.component().first_updates, 1);

                let root = el.host().render_root().unwrap();
                assert_eq!(
                    doc.inner_html_without_comments(root),
                    "<p>hi ada</p><style>p{color:red}</style>"
                );
            })
            .await;
    }

    #[tokio::test]
    async fn reflected_property_round_trips() {
        LocalSet::new()
            .run_until(async {
                let doc = Document::new();
                let el = greeting(&doc);
                el.connect().unwrap();
                el.update_complete().await.unwrap();
                doc.take_mutations();

                el.set("count", 3);
                el.update_complete().await.unwrap();
                assert_eq!(
                    doc.get_attribute(el.element(), "count").as_deref(),
                    Some("3")
                );
                // The reflection itself is not read back as a change.
                assert!(!el.host().is_update_pending());

                doc.set_attribute(el.element(), "count", "7");
                assert_eq!(el.get("count").as_number(), Some(7.0));
                el.update_complete().await.unwrap();
                assert_eq!(el.component().first_updates, 1);
            })
            .await;
    }

    #[tokio::test]
    async fn existing_attributes_and_properties_are_upgraded() {
        LocalSet::new()
            .run_until(async {
                let doc = Document::new();
                let node = doc.create_element("x-greeting").unwrap();
                doc.set_attribute(node, "count", "5");
                doc.set_property(node, "name", Value::str("early"));

                let el = ReactiveElement::new(
                    &doc,
                    node,
                    Greeting {
                        renders: 0,
                        first_updates: 0,
                    },
                );
                assert_eq!(el.get("count").as_number(), Some(5.0));
                assert!(matches!(el.get("name"), Value::Null));

                el.connect().unwrap();
                el.update_complete().await.unwrap();
                assert_eq!(el.get("name").as_str(), Some("early"));
                assert!(doc.property(node, "name").is_none());
            })
            .await;
    }

    struct Peeker {
        outer: Rc<RefCell<Option<ReactiveElement<Peeker>>>>,
        saw_busy: Rc<RefCell<Option<bool>>>,
    }

    impl Component for Peeker {
        fn updated(&mut self, _host: &Host, _changed: &ChangedProperties) -> Result<()> {
            if let Some(el) = self.outer.borrow().as_ref() {
                let busy = matches!(el.try_component(), Err(Error::Hook { .. }))
                    && matches!(el.try_component_mut(), Err(Error::Hook { .. }));
                *self.saw_busy.borrow_mut() = Some(busy);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn component_borrows_fail_softly_inside_hooks() {
        LocalSet::new()
            .run_until(async {
                let doc = Document::new();
                let node = doc.create_element("x-peeker").unwrap();
                doc.append_child(doc.root(), node).unwrap();
                let outer = Rc::new(RefCell::new(None));
                let saw_busy = Rc::new(RefCell::new(None));
                let el = ReactiveElement::new(
                    &doc,
                    node,
                    Peeker {
                        outer: outer.clone(),
                        saw_busy: saw_busy.clone(),
                    },
                );
                *outer.borrow_mut() = Some(el.clone());

                el.connect().unwrap();
                el.update_complete().await.unwrap();
                assert_eq!(*saw_busy.borrow(), Some(true));
                // Outside a pass both borrows succeed.
                assert!(el.try_component().is_ok());
                assert!(el.try_component_mut().is_ok());
                outer.borrow_mut().take();
            })
            .await;
    }

    #[test]
    fn classes_are_finalized_once_per_type() {
        let a = ComponentClass::of::<Greeting>();
        let b = ComponentClass::of::<Greeting>();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.styles.len(), 1);
        assert!(a.declarations.property_for_attribute("count").is_some());
    }
}
