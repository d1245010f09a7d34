//! `if_defined`: drop an attribute when its value is null.

use crate::value::Value;

/// `Null` becomes `Nothing`, which removes an attribute instead of
/// rendering it empty. Other values pass through.
pub fn if_defined(value: impl Into<Value>) -> Value {
    match value.into() {
        Value::Null => Value::Nothing,
        other => other,
    }
}
