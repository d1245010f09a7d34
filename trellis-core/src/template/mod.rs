//! Templates
//!
//! The path from a template expression to live DOM:
//!
//! 1. A call site mints a [`TemplateStrings`] once; every evaluation produces
//!    a fresh [`TemplateResult`] holding the values.
//! 2. The first time a call site renders, [`template_html`] inserts markers
//!    at the binding positions and the result is parsed and walked into a
//!    [`Template`], cached per thread by call-site identity.
//! 3. A child part stamps the template into a [`TemplateInstance`] and
//!    commits values into its parts. Later renders of the same call site
//!    only update the values.

mod compiled;
mod compiler;
mod instance;
mod markers;
mod result;

pub use compiled::{AttributeKind, PartDescriptor, Template};
pub use compiler::{template_html, CompiledHtml};
pub use instance::TemplateInstance;
pub use markers::{marker, marker_match, node_marker, BOUND_ATTRIBUTE_SUFFIX};
pub use result::{ResultKind, TemplateResult, TemplateStrings};
