//! Marker Protocol
//!
//! The compiler injects two kinds of sentinels into template HTML so that
//! binding positions can be found again after parsing:
//!
//! - a comment marker (`<?lit$1234$>`, which parses as a comment whose data
//!   is [`marker_match`]) for bindings in text position;
//! - the [`BOUND_ATTRIBUTE_SUFFIX`] appended to the name of an attribute
//!   whose value holds bindings, with the [`marker`] string standing in for
//!   each binding inside the value.
//!
//! The marker carries random digits drawn once per process, so template
//! text cannot forge a binding position by containing a fixed string.

use std::sync::OnceLock;

/// Appended to attribute names that carry bindings.
pub const BOUND_ATTRIBUTE_SUFFIX: &str = "$lit$";

static MARKER: OnceLock<String> = OnceLock::new();
static MARKER_MATCH: OnceLock<String> = OnceLock::new();
static NODE_MARKER: OnceLock<String> = OnceLock::new();

/// The per-process marker string, `lit$<digits>$`.
pub fn marker() -> &'static str {
    MARKER.get_or_init(|| {
        let mut bytes = [0u8; 8];
        let digits = match getrandom::fill(&mut bytes) {
            Ok(()) => u64::from_le_bytes(bytes) % 10_000_000_000,
            Err(err) => {
                tracing::warn!(%err, "no entropy for template marker, using fixed digits");
                4_611_686_018
            }
        };
        format!("lit${digits}$")
    })
}

/// Comment data of a child-position marker.
pub fn marker_match() -> &'static str {
    MARKER_MATCH.get_or_init(|| format!("?{}", marker()))
}

/// Markup inserted at child positions.
pub fn node_marker() -> &'static str {
    NODE_MARKER.get_or_init(|| format!("<{}>", marker_match()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_stable_and_nested() {
        let m = marker();
        assert!(m.starts_with("lit$") && m.ends_with('$'));
        assert_eq!(marker(), m);
        assert_eq!(marker_match(), format!("?{m}"));
        assert_eq!(node_marker(), format!("<?{m}>"));
        assert_eq!(m, m.to_ascii_lowercase());
    }
}
