//! Template Compiler
//!
//! Turns the static segments of a template into HTML with a marker at every
//! binding position, plus the case-preserved names of bound attributes.
//!
//! # How It Works
//!
//! The compiler is a lexical state machine that walks each segment once.
//! Every state owns a regex; a match moves the cursor to the end of the match
//! and may change the state. Nothing is ever re-scanned.
//!
//! | State          | Looks for                                 |
//! |----------------|-------------------------------------------|
//! | `Text`         | the start of a tag or a comment           |
//! | `Tag`          | an attribute, or the `>` closing the tag  |
//! | `DoubleQuoted` | the `"` closing an attribute value        |
//! | `SingleQuoted` | the `'` closing an attribute value        |
//! | `Comment`      | `-->`                                     |
//! | `BogusComment` | `>`                                       |
//! | `RawText`      | the end tag of a script/style/... element |
//!
//! At the end of each segment the state decides what the binding becomes:
//!
//! 1. Text position: a comment marker (child binding).
//! 2. Directly after an attribute name and `=`: the attribute is renamed with
//!    the bound-attribute suffix and the marker stands in for the value.
//! 3. Later bindings inside the same attribute value: a bare marker.
//! 4. Bare attribute-name position: the marker plus the binding index, which
//!    yields a unique attribute name (element binding).
//!
//! Raw-text content and comments also receive a bare marker; the template
//! walker finds those by searching text.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use super::markers::{marker, node_marker, BOUND_ATTRIBUTE_SUFFIX};
use super::result::ResultKind;
use crate::error::{Error, Result};

const COMMENT_START: usize = 1;
const TAG_NAME: usize = 2;
const DYNAMIC_TAG_NAME: usize = 3;

const ATTRIBUTE_NAME: usize = 1;
const QUOTE_CHAR: usize = 3;

static TEXT_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:(!--|/[^a-zA-Z])|(/?[a-zA-Z][^>\s]*)|(/?$))").expect("valid regex")
});
static TAG_END: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r">|[ \t\n\f\r](?:",
        r#"([^\s"'>=/]+)"#,
        r#"([ \t\n\f\r]*=[ \t\n\f\r]*(?:[^ \t\n\f\r"'`<>=]|("|')|))"#,
        r"|$)"
    ))
    .expect("valid regex")
});
static COMMENT_END: LazyLock<Regex> = LazyLock::new(|| Regex::new("-->").expect("valid regex"));
static COMMENT2_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(">").expect("valid regex"));
static DOUBLE_QUOTE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\"").expect("valid regex"));
static SINGLE_QUOTE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("'").expect("valid regex"));
static RAW_TEXT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new("^(?:script|style|textarea|title)$")
        .case_insensitive(true)
        .build()
        .expect("valid regex")
});

fn text_end() -> &'static Regex {
    &TEXT_END
}

fn tag_end() -> &'static Regex {
    &TAG_END
}

fn comment_end() -> &'static Regex {
    &COMMENT_END
}

fn comment2_end() -> &'static Regex {
    &COMMENT2_END
}

fn double_quote_end() -> &'static Regex {
    &DOUBLE_QUOTE_END
}

fn single_quote_end() -> &'static Regex {
    &SINGLE_QUOTE_END
}

/// Matches the names of elements whose content is raw text.
pub fn raw_text_element() -> &'static Regex {
    &RAW_TEXT_ELEMENT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Tag,
    DoubleQuoted,
    SingleQuoted,
    Comment,
    BogusComment,
    RawText,
}

/// Where a segment ended relative to attribute syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttributePosition {
    None,
    /// After `name=`; holds the byte offset where the name ends.
    ValueOf(usize),
    /// Where an attribute name could start.
    Name,
}

/// Output of [`template_html`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledHtml {
    /// HTML with markers at every binding position.
    pub html: String,
    /// Real names of bound attributes in binding order, sigils included.
    pub attribute_names: Vec<String>,
}

/// Compile template segments into marked HTML.
pub fn template_html(strings: &[String], kind: ResultKind) -> Result<CompiledHtml> {
    let Some(last) = strings.len().checked_sub(1) else {
        return Err(Error::InvalidTemplateStrings {
            segments: 0,
            values: 0,
        });
    };

    let mut attribute_names = Vec::new();
    let mut html = String::new();
    match kind {
        ResultKind::Svg => html.push_str("<svg>"),
        ResultKind::MathMl => html.push_str("<math>"),
        ResultKind::Html => {}
    }

    let mut state = State::Text;
    let mut raw_text_end: Option<Regex> = None;

    for i in 0..last {
        let s = strings[i].as_str();
        let mut position = AttributePosition::None;
        let mut attribute_name = "";
        let mut last_index = 0;

        while last_index < s.len() {
            let regex = match state {
                State::Text => text_end(),
                State::Tag => tag_end(),
                State::DoubleQuoted => double_quote_end(),
                State::SingleQuoted => single_quote_end(),
                State::Comment => comment_end(),
                State::BogusComment => comment2_end(),
                State::RawText => raw_text_end.as_ref().unwrap_or(text_end()),
            };
            let Some(caps) = regex.captures_at(s, last_index) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };
            last_index = whole.end();

            match state {
                State::Text => {
                    if let Some(start) = caps.get(COMMENT_START) {
                        state = if start.as_str() == "!--" {
                            State::Comment
                        } else {
                            State::BogusComment
                        };
                    } else if let Some(tag) = caps.get(TAG_NAME) {
                        if raw_text_element().is_match(tag.as_str()) {
                            let pattern = format!("</{}", regex::escape(tag.as_str()));
                            raw_text_end = Regex::new(&pattern).ok();
                        }
                        state = State::Tag;
                    } else if caps.get(DYNAMIC_TAG_NAME).is_some() {
                        state = State::Tag;
                    }
                }
                State::Tag => {
                    if whole.as_str() == ">" {
                        state = if raw_text_end.is_some() {
                            State::RawText
                        } else {
                            State::Text
                        };
                        position = AttributePosition::None;
                    } else if let Some(name) = caps.get(ATTRIBUTE_NAME) {
                        position = AttributePosition::ValueOf(name.end());
                        attribute_name = name.as_str();
                        state = match caps.get(QUOTE_CHAR).map(|q| q.as_str()) {
                            None => State::Tag,
                            Some("\"") => State::DoubleQuoted,
                            Some(_) => State::SingleQuoted,
                        };
                    } else {
                        position = AttributePosition::Name;
                    }
                }
                State::DoubleQuoted | State::SingleQuoted => state = State::Tag,
                State::Comment | State::BogusComment => state = State::Text,
                State::RawText => {
                    state = State::Tag;
                    raw_text_end = None;
                }
            }
        }

        // A binding right before `/>` needs a space so the slash does not
        // become part of the marker.
        let end = if state == State::Tag && strings[i + 1].starts_with("/>") {
            " "
        } else {
            ""
        };

        if state == State::Text {
            html.push_str(s);
            html.push_str(node_marker());
        } else if let AttributePosition::ValueOf(name_end) = position {
            attribute_names.push(attribute_name.to_string());
            html.push_str(&s[..name_end]);
            html.push_str(BOUND_ATTRIBUTE_SUFFIX);
            html.push_str(&s[name_end..]);
            html.push_str(marker());
            html.push_str(end);
        } else {
            html.push_str(s);
            html.push_str(marker());
            if position == AttributePosition::Name {
                html.push_str(&i.to_string());
            } else {
                html.push_str(end);
            }
        }
    }

    let tail = strings[last].as_str();
    html.push_str(if tail.is_empty() { "<?>" } else { tail });
    match kind {
        ResultKind::Svg => html.push_str("</svg>"),
        ResultKind::MathMl => html.push_str("</math>"),
        ResultKind::Html => {}
    }

    tracing::trace!(bindings = last, bytes = html.len(), "compiled template html");

    Ok(CompiledHtml {
        html,
        attribute_names,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
