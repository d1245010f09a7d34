//! Error types.
//!
//! Every fallible operation in the crate returns [`Result`]. The error is
//! `Clone` because a failed update pass is handed to every caller awaiting
//! that pass through a shared future.
//!
//! # Classes
//!
//! - Template-shape errors ([`Error::InvalidTemplateStrings`],
//!   [`Error::PartCountMismatch`]) are fatal: the template can never render.
//! - Directive-contract errors ([`Error::UnsupportedDirective`]) fail when the
//!   directive is constructed for a binding kind it cannot serve.
//! - Render-pass errors ([`Error::Hook`], [`Error::Component`]) surface to the
//!   caller of `update_complete()`; the scheduler stays usable.
//! - Trusted-content violations ([`Error::ForbiddenNode`],
//!   [`Error::SanitizerAlreadySet`]) are fatal.

use std::sync::Arc;

use crate::dom::NodeId;
use crate::part::PartKind;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the template engine and the update scheduler.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The static segments of a template do not line up with its values.
    #[error("invalid template strings: {segments} segments for {values} values")]
    InvalidTemplateStrings { segments: usize, values: usize },

    /// Walking the parsed template found a different number of bindings than
    /// the template declares. The HTML around a binding was malformed.
    #[error("template declares {expected} bindings but {found} were located in the parsed HTML")]
    PartCountMismatch { expected: usize, found: usize },

    /// A directive was used in a binding kind it does not support.
    #[error("directive `{directive}` cannot be used in {kind:?} bindings")]
    UnsupportedDirective {
        directive: &'static str,
        kind: PartKind,
    },

    /// Refused to commit a node into a `<style>` or `<script>` element.
    #[error("forbidden: binding a node inside <{parent}> is not allowed")]
    ForbiddenNode { parent: String },

    /// The global sanitizer may only be installed once.
    #[error("attempted to overwrite the installed sanitizer")]
    SanitizerAlreadySet,

    /// A lifecycle hook reported a failure.
    #[error("{hook} failed: {message}")]
    Hook { hook: &'static str, message: String },

    /// An error raised by component code.
    #[error("component error: {0}")]
    Component(Arc<dyn std::error::Error + Send + Sync>),

    /// Structural misuse of the DOM.
    #[error(transparent)]
    Dom(#[from] DomError),
}

impl Error {
    /// Wrap an arbitrary component error.
    pub fn component<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Component(Arc::new(error))
    }

    /// Build a hook failure from a message.
    pub fn hook(hook: &'static str, message: impl Into<String>) -> Self {
        Self::Hook {
            hook,
            message: message.into(),
        }
    }
}

/// Errors raised by [`Document`](crate::dom::Document) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// The node id does not belong to this document, or its node was released.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// Every addressable arena slot holds a live node.
    #[error("document is full")]
    ArenaFull,

    /// The reference node passed to `insert_before` is not a child of the parent.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// The insertion would create a cycle or put a node where it cannot live.
    #[error("cannot insert {node:?} into {parent:?}")]
    HierarchyRequest { parent: NodeId, node: NodeId },

    /// A part's marker node was removed from its parent.
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
}
