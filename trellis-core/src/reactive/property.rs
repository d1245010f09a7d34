//! Property Declarations
//!
//! A component declares its reactive properties once, per type. Each
//! declaration says how the property is compared, whether and under which
//! name it is mirrored to an attribute, and how that attribute converts.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::Value;

use super::converter::{AttributeConverter, DefaultConverter};

/// The type hint handed to converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PropertyKind {
    #[default]
    String,
    Number,
    Boolean,
    Object,
    Array,
}

/// Which attribute, if any, a property is associated with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Attribute {
    /// The lowercased property name.
    #[default]
    Lowercase,
    Named(String),
    /// No attribute.
    None,
}

/// Decides whether a write changed a property: `(new, old) -> changed`.
pub type ChangePredicate = Rc<dyn Fn(&Value, &Value) -> bool>;

/// Options for one reactive property.
#[derive(Clone)]
pub struct PropertyDeclaration {
    name: String,
    attribute: Attribute,
    reflect: bool,
    kind: PropertyKind,
    has_changed: Option<ChangePredicate>,
    converter: Option<Rc<dyn AttributeConverter>>,
    state: bool,
}

impl PropertyDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attribute: Attribute::Lowercase,
            reflect: false,
            kind: PropertyKind::String,
            has_changed: None,
            converter: None,
            state: false,
        }
    }

    /// Internal state: never associated with an attribute.
    pub fn state(name: impl Into<String>) -> Self {
        Self {
            state: true,
            attribute: Attribute::None,
            ..Self::new(name)
        }
    }

    pub fn kind(mut self, kind: PropertyKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn attribute(mut self, attribute: Attribute) -> Self {
        if !self.state {
            self.attribute = attribute;
        }
        self
    }

    /// Mirror the property to its attribute after every update that
    /// changed it.
    pub fn reflect(mut self) -> Self {
        self.reflect = true;
        self
    }

    pub fn has_changed(mut self, predicate: impl Fn(&Value, &Value) -> bool + 'static) -> Self {
        self.has_changed = Some(Rc::new(predicate));
        self
    }

    pub fn converter(mut self, converter: impl AttributeConverter + 'static) -> Self {
        self.converter = Some(Rc::new(converter));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_kind(&self) -> PropertyKind {
        self.kind
    }

    pub fn is_state(&self) -> bool {
        self.state
    }

    pub fn reflects(&self) -> bool {
        self.reflect
    }

    /// The attribute associated with the property, if any.
    pub fn attribute_name(&self) -> Option<String> {
        match &self.attribute {
            Attribute::Lowercase => Some(self.name.to_lowercase()),
            Attribute::Named(name) => Some(name.clone()),
            Attribute::None => None,
        }
    }

    /// Whether `new` differs from `old` for this property.
    pub fn changed(&self, new: &Value, old: &Value) -> bool {
        match &self.has_changed {
            Some(predicate) => predicate(new, old),
            None => !new.same(old),
        }
    }

    pub(crate) fn attribute_converter(&self) -> &dyn AttributeConverter {
        match &self.converter {
            Some(converter) => converter.as_ref(),
            None => &DefaultConverter,
        }
    }
}

impl fmt::Debug for PropertyDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyDeclaration")
            .field("name", &self.name)
            .field("attribute", &self.attribute)
            .field("reflect", &self.reflect)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// The declarations of one component type, plus the reverse attribute map.
#[derive(Debug, Default)]
pub(crate) struct Declarations {
    properties: IndexMap<String, PropertyDeclaration>,
    attributes: HashMap<String, String>,
}

impl Declarations {
    pub(crate) fn new(declarations: Vec<PropertyDeclaration>) -> Self {
        let mut properties = IndexMap::with_capacity(declarations.len());
        let mut attributes = HashMap::new();
        for declaration in declarations {
            if let Some(attribute) = declaration.attribute_name() {
                attributes.insert(attribute, declaration.name.clone());
            }
            properties.insert(declaration.name.clone(), declaration);
        }
        Self {
            properties,
            attributes,
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<&PropertyDeclaration> {
        self.properties.get(name)
    }

    pub(crate) fn property_for_attribute(&self, attribute: &str) -> Option<&PropertyDeclaration> {
        self.attributes
            .get(attribute)
            .and_then(|name| self.properties.get(name))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &PropertyDeclaration> {
        self.properties.values()
    }
}

/// Properties changed since the last update, with their previous values.
///
/// Only the first old value recorded for a property during a pass is kept.
#[derive(Debug, Clone, Default)]
pub struct ChangedProperties {
    old: IndexMap<String, Value>,
}

impl ChangedProperties {
    pub fn contains(&self, name: &str) -> bool {
        self.old.contains_key(name)
    }

    /// The value the property had before the pass.
    pub fn old_value(&self, name: &str) -> Option<&Value> {
        self.old.get(name)
    }

    pub fn len(&self) -> usize {
        self.old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.old.is_empty()
    }

    /// Changed property names, in the order they first changed.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.old.keys().map(String::as_str)
    }

    pub(crate) fn record(&mut self, name: &str, old: Value) {
        if !self.old.contains_key(name) {
            self.old.insert(name.to_string(), old);
        }
    }
}
