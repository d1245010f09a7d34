//! Trellis Core
//!
//! This crate provides the core of the Trellis declarative UI engine.
//! It implements:
//!
//! - A template compiler that turns marked-up template strings into cached,
//!   cloneable DOM fragments with binding descriptors
//! - Parts that bind values to DOM locations and only write what changed
//! - A directive protocol for stateful value transformers, including async
//!   ones driven by streams
//! - A reactive update scheduler that batches property writes into ordered
//!   render passes
//!
//! Rendering targets the in-memory [`dom::Document`], a small arena DOM with
//! a mutation log.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `template`: template strings, compilation, caching and instances
//! - `part`: child, attribute, property, boolean, event and element bindings
//! - `directive`: the directive protocol and built-in directives
//! - `render`: the render root entry point
//! - `reactive`: reactive elements, controllers and tasks
//! - `dom`: the document the engine renders into
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::{html, render, dom::Document, RenderOptions};
//!
//! let doc = Document::new();
//! let body = doc.create_element("body")?;
//!
//! // First render stamps the template
//! render(html!("<p class={}>{}</p>", "greeting", "hello"), &doc, body, RenderOptions::default())?;
//!
//! // Later renders of the same call site only patch what changed
//! render(html!("<p class={}>{}</p>", "greeting", "world"), &doc, body, RenderOptions::default())?;
//! ```

pub mod directive;
pub mod dom;
pub mod error;
pub mod part;
pub mod reactive;
pub mod render;
pub mod sanitizer;
pub mod style;
pub mod template;
pub mod value;

pub use error::{DomError, Error, Result};
pub use part::{Part, PartKind, PartRef};
pub use render::{render, RenderOptions};
pub use template::{ResultKind, TemplateResult, TemplateStrings};
pub use value::{EventThis, Listener, Value};
