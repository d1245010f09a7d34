//! Update Host
//!
//! [`Host`] is the scheduling core of a reactive element. It owns the
//! property values and runs the update state machine; the component's hooks
//! are reached through the `Lifecycle` seam so the host itself is not
//! generic.
//!
//! # States
//!
//! ```text
//! Idle --change--> UpdatePending --pass starts--> Updating --> Idle
//!                        ^                            |
//!                        +------ change in a hook ----+
//! ```
//!
//! A property write that changes the value records the first old value for
//! the pass and, if nothing is pending yet, enqueues a pass. Every pass is a
//! shared future chained on the previous one, so passes never overlap and
//! every caller of [`update_complete`](Host::update_complete) observes the
//! same outcome. The chained future is driven by a local task; creating an
//! element and setting properties must therefore happen inside a
//! [`tokio::task::LocalSet`].
//!
//! The first pass waits until the host is connected.
//!
//! # Pass
//!
//! `should_update` → `will_update` → controllers' `host_update` → `update` →
//! `render` → reflection → mark complete → commit → controllers'
//! `host_updated` → `first_updated` (once) → `updated`. A failing hook marks
//! the pass complete and the error reaches the awaiters of that pass; the
//! next pass runs normally.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use futures_util::future::{FutureExt, LocalBoxFuture, Shared};
use indexmap::{IndexMap, IndexSet};
use tokio::sync::oneshot;

use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::part::Part;
use crate::render::{render, RenderOptions};
use crate::style::{adopt_styles, StyleSheet};
use crate::value::Value;

use super::controller::{ReactiveController, ReactiveControllerHost, UpdateOptions};
use super::guard::{is_reflecting, ReflectionGuard};
use super::property::{ChangedProperties, Declarations};

/// The awaitable outcome of the latest update pass.
pub type UpdateComplete = Shared<LocalBoxFuture<'static, Result<bool>>>;

/// Component hooks invoked by the host during a pass.
pub(crate) trait Lifecycle {
    fn should_update(&self, host: &Host, changed: &ChangedProperties) -> Result<bool>;
    fn will_update(&self, host: &Host, changed: &ChangedProperties) -> Result<()>;
    fn update(&self, host: &Host, changed: &ChangedProperties) -> Result<()>;
    fn render(&self, host: &Host) -> Result<Value>;
    fn first_updated(&self, host: &Host, changed: &ChangedProperties) -> Result<()>;
    fn updated(&self, host: &Host, changed: &ChangedProperties) -> Result<()>;
}

struct HostState {
    values: IndexMap<String, Value>,
    changed: ChangedProperties,
    /// Properties to write to their attributes in the next `update`.
    to_reflect: IndexSet<String>,
    is_update_pending: bool,
    has_updated: bool,
    is_connected: bool,
    render_root: Option<NodeId>,
    root_part: Option<Part>,
    update_promise: UpdateComplete,
    /// Releases the first pass on connect.
    enable: Option<oneshot::Sender<()>>,
}

struct HostInner {
    document: Document,
    element: NodeId,
    declarations: Rc<Declarations>,
    styles: Rc<[StyleSheet]>,
    state: RefCell<HostState>,
    reflecting: RefCell<Option<String>>,
    controllers: RefCell<Vec<Rc<dyn ReactiveController>>>,
    lifecycle: RefCell<Option<Weak<dyn Lifecycle>>>,
}

/// Shared handle to the update state of one element.
#[derive(Clone)]
pub struct Host {
    inner: Rc<HostInner>,
}

/// Non-owning handle to a [`Host`].
#[derive(Clone, Default)]
pub struct WeakHost(Weak<HostInner>);

impl WeakHost {
    pub fn upgrade(&self) -> Option<Host> {
        self.0.upgrade().map(|inner| Host { inner })
    }
}

impl Host {
    pub(crate) fn new(
        document: Document,
        element: NodeId,
        declarations: Rc<Declarations>,
        styles: Rc<[StyleSheet]>,
    ) -> Self {
        let (enable, enabled) = oneshot::channel::<()>();
        let update_promise = async move {
            // A dropped sender means the host is gone; nothing waits on it.
            let _ = enabled.await;
            Ok(true)
        }
        .boxed_local()
        .shared();

        Self {
            inner: Rc::new(HostInner {
                document,
                element,
                declarations,
                styles,
                state: RefCell::new(HostState {
                    values: IndexMap::new(),
                    changed: ChangedProperties::default(),
                    to_reflect: IndexSet::new(),
                    is_update_pending: false,
                    has_updated: false,
                    is_connected: false,
                    render_root: None,
                    root_part: None,
                    update_promise,
                    enable: Some(enable),
                }),
                reflecting: RefCell::new(None),
                controllers: RefCell::new(Vec::new()),
                lifecycle: RefCell::new(None),
            }),
        }
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: Weak<dyn Lifecycle>) {
        *self.inner.lifecycle.borrow_mut() = Some(lifecycle);
    }

    /// Forward attribute changes on the element to the matching properties.
    pub(crate) fn observe_attributes(&self) {
        let weak = self.downgrade();
        self.inner.document.observe_attributes(
            self.inner.element,
            Rc::new(move |name: &str, _old: Option<&str>, new: Option<&str>| {
                if let Some(host) = weak.upgrade() {
                    host.attribute_changed(name, new);
                }
            }),
        );

        let present: Vec<(String, String)> = self
            .inner
            .declarations
            .iter()
            .filter_map(|decl| decl.attribute_name())
            .filter_map(|attr| {
                let value = self.inner.document.get_attribute(self.inner.element, &attr)?;
                Some((attr, value))
            })
            .collect();
        for (attr, value) in present {
            self.attribute_changed(&attr, Some(&value));
        }
    }

    pub fn downgrade(&self) -> WeakHost {
        WeakHost(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Host) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    /// The host element.
    pub fn element(&self) -> NodeId {
        self.inner.element
    }

    /// The shadow root the component renders into, once created.
    pub fn render_root(&self) -> Option<NodeId> {
        self.inner.state.borrow().render_root
    }

    /// The child part holding the rendered content, after the first commit.
    pub fn root_part(&self) -> Option<Part> {
        self.inner.state.borrow().root_part.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected
    }

    pub fn is_update_pending(&self) -> bool {
        self.inner.state.borrow().is_update_pending
    }

    pub fn has_updated(&self) -> bool {
        self.inner.state.borrow().has_updated
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    /// Current value of a property. Unset properties are `Null`.
    pub fn get(&self, name: &str) -> Value {
        self.inner
            .state
            .borrow()
            .values
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Write a property and schedule an update if it changed.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let old = self
            .inner
            .state
            .borrow_mut()
            .values
            .insert(name.to_string(), value.into())
            .unwrap_or_default();
        self.property_update(name, old, &UpdateOptions::default());
    }

    fn property_update(&self, name: &str, old: Value, options: &UpdateOptions) {
        let declaration = self.inner.declarations.get(name);
        let new = self.get(name);
        let changed = match (options.change_predicate(), declaration) {
            (Some(predicate), _) => predicate(&new, &old),
            (None, Some(decl)) => decl.changed(&new, &old),
            (None, None) => !new.same(&old),
        };
        if !changed {
            return;
        }

        let reflect = options
            .reflects()
            .unwrap_or_else(|| declaration.is_some_and(|decl| decl.reflects()))
            && !is_reflecting(&self.inner.reflecting, name);
        {
            let mut state = self.inner.state.borrow_mut();
            let old = if state.has_updated { old } else { Value::Null };
            state.changed.record(name, old);
            if reflect {
                state.to_reflect.insert(name.to_string());
            }
        }
        tracing::trace!(property = name, reflect, "property changed");
        self.enqueue_update();
    }

    /// Copy of the changes recorded for the pending pass.
    pub fn changed_properties(&self) -> ChangedProperties {
        self.inner.state.borrow().changed.clone()
    }

    fn attribute_changed(&self, attribute: &str, value: Option<&str>) {
        let Some(declaration) = self.inner.declarations.property_for_attribute(attribute) else {
            return;
        };
        let name = declaration.name();
        if is_reflecting(&self.inner.reflecting, name) {
            return;
        }
        let converted = declaration
            .attribute_converter()
            .from_attribute(value, declaration.property_kind());
        let _guard = ReflectionGuard::enter(&self.inner.reflecting, name);
        self.set(name, converted);
    }

    fn property_to_attribute(&self, name: &str) {
        let Some(declaration) = self.inner.declarations.get(name) else {
            return;
        };
        let Some(attribute) = declaration.attribute_name() else {
            return;
        };
        let value = self.get(name);
        let text = declaration
            .attribute_converter()
            .to_attribute(&value, declaration.property_kind());

        let _guard = ReflectionGuard::enter(&self.inner.reflecting, name);
        let doc = &self.inner.document;
        match text {
            Some(text) => doc.set_attribute(self.inner.element, &attribute, &text),
            None => doc.remove_attribute(self.inner.element, &attribute),
        }
    }

    // ------------------------------------------------------------------
    // Connection
    // ------------------------------------------------------------------

    /// Attach to the document: create the render root, release the first
    /// pass and notify controllers and the rendered content.
    pub fn connect(&self) -> Result<()> {
        self.ensure_render_root()?;
        let enable = {
            let mut state = self.inner.state.borrow_mut();
            state.is_connected = true;
            state.enable.take()
        };
        if let Some(enable) = enable {
            let _ = enable.send(());
        }
        for controller in self.controllers() {
            controller.host_connected();
        }
        if let Some(part) = self.root_part() {
            part.set_connected(true);
        }
        tracing::debug!(element = self.inner.element.raw(), "host connected");
        Ok(())
    }

    pub fn disconnect(&self) {
        self.inner.state.borrow_mut().is_connected = false;
        for controller in self.controllers() {
            controller.host_disconnected();
        }
        if let Some(part) = self.root_part() {
            part.set_connected(false);
        }
        tracing::debug!(element = self.inner.element.raw(), "host disconnected");
    }

    fn ensure_render_root(&self) -> Result<NodeId> {
        if let Some(root) = self.render_root() {
            return Ok(root);
        }
        let doc = &self.inner.document;
        let root = match doc.shadow_root(self.inner.element) {
            Some(root) => root,
            None => doc.attach_shadow(self.inner.element)?,
        };
        adopt_styles(doc, root, &self.inner.styles)?;
        self.inner.state.borrow_mut().render_root = Some(root);
        Ok(root)
    }

    fn controllers(&self) -> Vec<Rc<dyn ReactiveController>> {
        self.inner.controllers.borrow().clone()
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    fn enqueue_update(&self) {
        let previous = {
            let mut state = self.inner.state.borrow_mut();
            if state.is_update_pending {
                return;
            }
            state.is_update_pending = true;
            state.update_promise.clone()
        };

        let weak = self.downgrade();
        let pass = async move {
            // A failed pass already reached its own awaiters.
            let _ = previous.await;
            match weak.upgrade() {
                Some(host) => {
                    host.perform_update()?;
                    Ok(!host.is_update_pending())
                }
                None => Ok(true),
            }
        }
        .boxed_local()
        .shared();

        self.inner.state.borrow_mut().update_promise = pass.clone();
        tokio::task::spawn_local(async move {
            if let Err(err) = pass.await {
                tracing::warn!(%err, "update pass failed");
            }
        });
    }

    /// Run the pending pass now. Does nothing when no pass is pending.
    pub fn perform_update(&self) -> Result<()> {
        if !self.is_update_pending() {
            return Ok(());
        }
        let lifecycle = self.inner.lifecycle.borrow().as_ref().and_then(Weak::upgrade);
        let Some(lifecycle) = lifecycle else {
            self.mark_updated();
            return Ok(());
        };
        tracing::debug!(element = self.inner.element.raw(), "update pass");

        let proceed = (|| -> Result<bool> {
            if !self.has_updated() {
                self.ensure_render_root()?;
                self.replay_element_properties();
            }
            if !lifecycle.should_update(self, &self.changed_properties())? {
                return Ok(false);
            }
            lifecycle.will_update(self, &self.changed_properties())?;
            for controller in self.controllers() {
                controller.host_update();
            }
            Ok(true)
        })();
        match proceed {
            Ok(true) => {}
            Ok(false) => {
                self.mark_updated();
                return Ok(());
            }
            Err(err) => {
                self.mark_updated();
                return Err(err);
            }
        }

        let changed = self.update(lifecycle.as_ref())?;
        self.did_update(lifecycle.as_ref(), &changed)
    }

    /// Properties assigned on the element node before the first pass go
    /// through normal change detection, once.
    fn replay_element_properties(&self) {
        let doc = &self.inner.document;
        let replayed: Vec<(String, Value)> = self
            .inner
            .declarations
            .iter()
            .filter_map(|decl| {
                let value = doc.take_property(self.inner.element, decl.name())?;
                Some((decl.name().to_string(), value))
            })
            .collect();
        for (name, value) in replayed {
            self.set(&name, value);
        }
    }

    fn update(&self, lifecycle: &dyn Lifecycle) -> Result<ChangedProperties> {
        let rendered = lifecycle
            .update(self, &self.changed_properties())
            .and_then(|()| lifecycle.render(self));
        if rendered.is_ok() {
            let names = std::mem::take(&mut self.inner.state.borrow_mut().to_reflect);
            for name in names {
                self.property_to_attribute(&name);
            }
        }
        let changed = self.mark_updated();
        self.commit(rendered?)?;
        Ok(changed)
    }

    fn commit(&self, value: Value) -> Result<()> {
        if let Some(part) = self.root_part() {
            return part.set_value(value);
        }
        let root = self.ensure_render_root()?;
        let doc = &self.inner.document;
        let mut options = RenderOptions::default()
            .with_host(Rc::new(self.clone()))
            .with_connected(self.is_connected());
        // Content goes before the adopted styles.
        if let Some(first) = doc.first_child(root) {
            options = options.with_render_before(first);
        }
        let part = render(value, doc, root, options)?;
        self.inner.state.borrow_mut().root_part = Some(part);
        Ok(())
    }

    fn did_update(&self, lifecycle: &dyn Lifecycle, changed: &ChangedProperties) -> Result<()> {
        for controller in self.controllers() {
            controller.host_updated();
        }
        let first = {
            let mut state = self.inner.state.borrow_mut();
            !std::mem::replace(&mut state.has_updated, true)
        };
        if first {
            lifecycle.first_updated(self, changed)?;
        }
        lifecycle.updated(self, changed)
    }

    fn mark_updated(&self) -> ChangedProperties {
        let mut state = self.inner.state.borrow_mut();
        state.is_update_pending = false;
        std::mem::take(&mut state.changed)
    }
}

impl ReactiveControllerHost for Host {
    fn add_controller(&self, controller: Rc<dyn ReactiveController>) {
        self.inner.controllers.borrow_mut().push(controller.clone());
        if self.is_connected() && self.render_root().is_some() {
            controller.host_connected();
        }
    }

    fn remove_controller(&self, controller: &Rc<dyn ReactiveController>) {
        self.inner
            .controllers
            .borrow_mut()
            .retain(|c| !Rc::ptr_eq(c, controller));
    }

    fn request_update(&self) {
        self.enqueue_update();
    }

    fn request_property_update(&self, name: &str, old: Value, options: UpdateOptions) {
        self.property_update(name, old, &options);
    }

    fn update_complete(&self) -> UpdateComplete {
        self.inner.state.borrow().update_promise.clone()
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Host")
            .field("element", &self.inner.element)
            .field("is_update_pending", &state.is_update_pending)
            .field("has_updated", &state.has_updated)
            .field("is_connected", &state.is_connected)
            .finish_non_exhaustive()
    }
}
