//! Reactive Update Scheduler
//!
//! This module turns property writes into batched, ordered render passes.
//!
//! # Concepts
//!
//! ## Properties
//!
//! A component declares its reactive properties with
//! [`PropertyDeclaration`]s. Writing a property compares the new value with
//! the old one; a change is recorded in the pass's [`ChangedProperties`] and
//! schedules a pass. Declared properties can be mirrored to attributes in
//! both directions through an [`AttributeConverter`].
//!
//! ## Passes
//!
//! Writes made before a pass starts coalesce into that pass. Passes are
//! serialized: a pass awaits the previous one before touching the DOM. See
//! [`Host`] for the order of the hooks inside one pass.
//!
//! ## Controllers
//!
//! A [`ReactiveController`] hooks into its host's lifecycle. [`Task`] is the
//! built-in controller for async work.
//!
//! # Runtime
//!
//! Passes and tasks run on [`tokio::task::spawn_local`]; elements must be
//! created and driven inside a [`tokio::task::LocalSet`].

mod controller;
mod converter;
mod element;
mod guard;
mod host;
mod property;
mod task;

pub use controller::{ReactiveController, ReactiveControllerHost, UpdateOptions};
pub use converter::{AttributeConverter, DefaultConverter};
pub use element::{Component, ReactiveElement};
pub use host::{Host, UpdateComplete, WeakHost};
pub use property::{Attribute, ChangePredicate, ChangedProperties, PropertyDeclaration, PropertyKind};
pub use task::{
    initial_state, shallow_equals, AbortSignal, AutoRun, Task, TaskConfig, TaskRenderer,
    TaskStatus,
};
