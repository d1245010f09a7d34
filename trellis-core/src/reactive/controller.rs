//! Reactive Controllers
//!
//! A controller bundles state and behaviour for one feature and hooks into
//! the lifecycle of the host it is added to. Controllers are shared
//! (`Rc<dyn ReactiveController>`) and use interior mutability for their own
//! state, so the host can call them while the component reads them.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

use super::host::UpdateComplete;
use super::property::ChangePredicate;

/// Lifecycle callbacks a host forwards to its controllers.
///
/// All callbacks default to doing nothing.
pub trait ReactiveController {
    /// The host was connected, or the controller was added to a connected
    /// host.
    fn host_connected(&self) {}

    fn host_disconnected(&self) {}

    /// Called during an update, after `will_update` and before the host
    /// renders.
    fn host_update(&self) {}

    /// Called after the host committed its render, before `first_updated`
    /// and `updated`.
    fn host_updated(&self) {}
}

/// An object that hosts controllers and schedules updates for them.
pub trait ReactiveControllerHost {
    fn add_controller(&self, controller: Rc<dyn ReactiveController>);

    fn remove_controller(&self, controller: &Rc<dyn ReactiveController>);

    /// Schedule an update pass without changing a property.
    fn request_update(&self);

    /// Schedule an update for `name`, whose previous value was `old`, after
    /// the property was changed outside the host's setters.
    ///
    /// `options` override the property's declaration for this call only.
    /// Nothing is scheduled when the change predicate reports no change.
    fn request_property_update(&self, name: &str, old: Value, options: UpdateOptions);

    /// Resolves after the pending pass. `Ok(false)` means another update was
    /// requested while it ran.
    fn update_complete(&self) -> UpdateComplete;
}

/// Per-request overrides of a property's declaration.
#[derive(Clone, Default)]
pub struct UpdateOptions {
    has_changed: Option<ChangePredicate>,
    reflect: Option<bool>,
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the change with `predicate` instead of the declared one.
    pub fn has_changed(mut self, predicate: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.has_changed = Some(Rc::new(predicate));
        self
    }

    /// Force reflection on or off for this change.
    pub fn reflect(mut self, reflect: bool) -> Self {
        self.reflect = Some(reflect);
        self
    }

    pub(crate) fn change_predicate(&self) -> Option<&ChangePredicate> {
        self.has_changed.as_ref()
    }

    pub(crate) fn reflects(&self) -> Option<bool> {
        self.reflect
    }
}

impl fmt::Debug for UpdateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateOptions")
            .field("has_changed", &self.has_changed.is_some())
            .field("reflect", &self.reflect)
            .finish()
    }
}
