//! Template results and their call-site identity.

use std::fmt;
use std::sync::OnceLock;

use crate::value::Value;

/// Which parser context a template is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultKind {
    Html,
    Svg,
    MathMl,
}

enum Source {
    Format(&'static str),
    Segments(&'static [&'static str]),
}

/// The static strings of one template call site.
///
/// A `TemplateStrings` must live in a `static`: its address is the cache key
/// for the compiled template. The [`html!`](crate::html), [`svg!`](crate::svg)
/// and [`mathml!`](crate::mathml) macros declare one per call site.
///
/// A format source splits on `{}` placeholders; `{{` and `}}` produce literal
/// braces and any other brace is kept as written.
pub struct TemplateStrings {
    source: Source,
    segments: OnceLock<Vec<String>>,
}

impl TemplateStrings {
    /// Strings from a format-style source with `{}` placeholders.
    pub const fn new(source: &'static str) -> Self {
        Self {
            source: Source::Format(source),
            segments: OnceLock::new(),
        }
    }

    /// Strings given as explicit segments. `n` segments hold `n - 1` bindings.
    pub const fn from_segments(segments: &'static [&'static str]) -> Self {
        Self {
            source: Source::Segments(segments),
            segments: OnceLock::new(),
        }
    }

    /// The static segments around the bindings.
    pub fn segments(&self) -> &[String] {
        self.segments.get_or_init(|| match self.source {
            Source::Format(src) => split_format(src),
            Source::Segments(segments) => segments.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Identity of this call site.
    pub fn id(&self) -> usize {
        self as *const Self as usize
    }

    /// Number of bindings.
    pub fn binding_count(&self) -> usize {
        self.segments().len().saturating_sub(1)
    }
}

impl fmt::Debug for TemplateStrings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateStrings")
            .field("id", &self.id())
            .field("segments", &self.segments())
            .finish()
    }
}

fn split_format(src: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = src.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('{', Some('}')) => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
                current.push(c);
            }
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// The output of one template expression: a call site plus fresh values.
#[derive(Clone)]
pub struct TemplateResult {
    pub kind: ResultKind,
    pub strings: &'static TemplateStrings,
    pub values: Vec<Value>,
}

impl TemplateResult {
    pub fn new(kind: ResultKind, strings: &'static TemplateStrings, values: Vec<Value>) -> Self {
        Self {
            kind,
            strings,
            values,
        }
    }
}

impl fmt::Debug for TemplateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateResult")
            .field("kind", &self.kind)
            .field("strings", &self.strings.id())
            .field("values", &self.values)
            .finish()
    }
}

/// Build an HTML [`TemplateResult`] with a per-call-site identity.
///
/// ```
/// use trellis_core::html;
///
/// let name = "world";
/// let result = html!("<p>Hello {}!</p>", name);
/// assert_eq!(result.values.len(), 1);
/// ```
#[macro_export]
macro_rules! html {
    ($src:literal $(, $value:expr)* $(,)?) => {{
        static STRINGS: $crate::template::TemplateStrings =
            $crate::template::TemplateStrings::new($src);
        $crate::template::TemplateResult::new(
            $crate::template::ResultKind::Html,
            &STRINGS,
            vec![$($crate::Value::from($value)),*],
        )
    }};
}

/// Build an SVG [`TemplateResult`] (SVG fragment, no outer `<svg>`).
#[macro_export]
macro_rules! svg {
    ($src:literal $(, $value:expr)* $(,)?) => {{
        static STRINGS: $crate::template::TemplateStrings =
            $crate::template::TemplateStrings::new($src);
        $crate::template::TemplateResult::new(
            $crate::template::ResultKind::Svg,
            &STRINGS,
            vec![$($crate::Value::from($value)),*],
        )
    }};
}

/// Build a MathML [`TemplateResult`] (fragment, no outer `<math>`).
#[macro_export]
macro_rules! mathml {
    ($src:literal $(, $value:expr)* $(,)?) => {{
        static STRINGS: $crate::template::TemplateStrings =
            $crate::template::TemplateStrings::new($src);
        $crate::template::TemplateResult::new(
            $crate::template::ResultKind::MathMl,
            &STRINGS,
            vec![$($crate::Value::from($value)),*],
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_sources_split_on_placeholders() {
        static S: TemplateStrings = TemplateStrings::new("<p a=\"{}\">{}</p>{{x}}");
        assert_eq!(S.segments(), ["<p a=\"", "\">", "</p>{x}"]);
        assert_eq!(S.binding_count(), 2);
    }

    #[test]
    fn lone_braces_are_kept() {
        static S: TemplateStrings = TemplateStrings::new("<style>a { color: red }</style>");
        assert_eq!(S.segments(), ["<style>a { color: red }</style>"]);
    }

    #[test]
    fn call_sites_have_distinct_identity() {
        fn make(v: i32) -> TemplateResult {
            crate::html!("<b>{}</b>", v)
        }
        let a = make(1);
        let b = make(2);
        let c = crate::html!("<b>{}</b>", 1);
        assert_eq!(a.strings.id(), b.strings.id());
        assert_ne!(a.strings.id(), c.strings.id());
    }
}
