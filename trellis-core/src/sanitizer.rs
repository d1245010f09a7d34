//! Value Sanitizer
//!
//! An application may install one sanitizer factory for the whole process.
//! Once installed, every attribute, property and text commit asks the factory
//! for a sanitizer for that binding position and passes the value through it
//! before it reaches the DOM. Bindings create their sanitizer lazily, on the
//! first commit, and keep it.
//!
//! Installing a factory also tightens the rules for `<style>` and `<script>`
//! elements: nothing may be committed into them at all.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::value::Value;

/// What kind of write a sanitizer guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeTarget {
    Attribute,
    Property,
    /// Text node data.
    Text,
}

/// The binding position a sanitizer is created for.
#[derive(Debug, Clone, Copy)]
pub struct SanitizeContext<'a> {
    pub node: NodeId,
    /// Tag name of the element, `None` for text nodes.
    pub tag_name: Option<&'a str>,
    /// Attribute or property name (`"data"` for text).
    pub name: &'a str,
    pub target: SanitizeTarget,
}

/// A sanitizer for one binding position.
pub type ValueSanitizer = Box<dyn Fn(Value) -> Value>;

/// Creates sanitizers for binding positions.
pub type SanitizerFactory = Arc<dyn Fn(&SanitizeContext<'_>) -> ValueSanitizer + Send + Sync>;

fn factory() -> &'static Mutex<Option<SanitizerFactory>> {
    static FACTORY: OnceLock<Mutex<Option<SanitizerFactory>>> = OnceLock::new();
    FACTORY.get_or_init(|| Mutex::new(None))
}

/// Install the process-wide sanitizer factory. Fails if one is installed.
pub fn set_sanitizer(new_factory: SanitizerFactory) -> Result<()> {
    let mut slot = factory().lock();
    if slot.is_some() {
        return Err(Error::SanitizerAlreadySet);
    }
    *slot = Some(new_factory);
    tracing::debug!("sanitizer installed");
    Ok(())
}

/// Whether a sanitizer factory has been installed.
pub fn is_installed() -> bool {
    factory().lock().is_some()
}

/// A sanitizer for `context`, or `None` when no factory is installed.
pub fn create_sanitizer(context: &SanitizeContext<'_>) -> Option<ValueSanitizer> {
    let installed = factory().lock().clone()?;
    Some(installed(context))
}

/// A binding's sanitizer, created on first use.
#[derive(Default)]
pub(crate) struct LazySanitizer {
    created: bool,
    sanitizer: Option<ValueSanitizer>,
}

impl LazySanitizer {
    pub(crate) fn apply(&mut self, value: Value, context: &SanitizeContext<'_>) -> Value {
        if !self.created {
            if !is_installed() {
                return value;
            }
            self.sanitizer = create_sanitizer(context);
            self.created = true;
        }
        match &self.sanitizer {
            Some(sanitize) => sanitize(value),
            None => value,
        }
    }
}
