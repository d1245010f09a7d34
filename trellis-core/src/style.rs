//! Component styles.
//!
//! A component declares its styles as a tree of [`Styles`]. Before the first
//! render the tree is flattened by [`finalize_styles`] and the sheets are
//! added to the render root by [`adopt_styles`].

use std::fmt;
use std::rc::Rc;

use crate::dom::{Document, NodeId};
use crate::error::Result;

/// One stylesheet. Clones share identity; two sheets with the same text
/// created separately are distinct.
#[derive(Clone)]
pub struct StyleSheet {
    css: Rc<str>,
}

impl StyleSheet {
    pub fn new(css: impl AsRef<str>) -> Self {
        Self {
            css: Rc::from(css.as_ref()),
        }
    }

    pub fn css(&self) -> &str {
        &self.css
    }

    /// Whether both handles are the same sheet.
    pub fn ptr_eq(&self, other: &StyleSheet) -> bool {
        Rc::ptr_eq(&self.css, &other.css)
    }
}

impl fmt::Debug for StyleSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StyleSheet").field(&self.css).finish()
    }
}

/// A possibly nested list of stylesheets.
#[derive(Debug, Clone)]
pub enum Styles {
    Sheet(StyleSheet),
    List(Vec<Styles>),
}

impl From<StyleSheet> for Styles {
    fn from(sheet: StyleSheet) -> Self {
        Styles::Sheet(sheet)
    }
}

impl<T: Into<Styles>> From<Vec<T>> for Styles {
    fn from(items: Vec<T>) -> Self {
        Styles::List(items.into_iter().map(Into::into).collect())
    }
}

fn flatten(styles: &Styles, out: &mut Vec<StyleSheet>) {
    match styles {
        Styles::Sheet(sheet) => out.push(sheet.clone()),
        Styles::List(items) => {
            for item in items {
                flatten(item, out);
            }
        }
    }
}

/// Flatten `styles` and drop repeated sheets. When a sheet appears more than
/// once, its last position wins.
pub fn finalize_styles(styles: &Styles) -> Vec<StyleSheet> {
    let mut flat = Vec::new();
    flatten(styles, &mut flat);

    let mut kept: Vec<StyleSheet> = Vec::with_capacity(flat.len());
    for sheet in flat.into_iter().rev() {
        if !kept.iter().any(|k| k.ptr_eq(&sheet)) {
            kept.push(sheet);
        }
    }
    kept.reverse();
    kept
}

/// Append one `<style>` element per sheet to `root`, in order.
pub fn adopt_styles(document: &Document, root: NodeId, sheets: &[StyleSheet]) -> Result<()> {
    for sheet in sheets {
        let style = document.create_element("style")?;
        let text = document.create_text(sheet.css())?;
        document.append_child(style, text)?;
        document.append_child(root, style)?;
    }
    tracing::debug!(count = sheets.len(), "adopted styles");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_keep_their_last_position() {
        let a = StyleSheet::new("a{}");
        let b = StyleSheet::new("b{}");
        let c = StyleSheet::new("c{}");
        let styles = Styles::List(vec![
            a.clone().into(),
            vec![b.clone(), a.clone()].into(),
            c.clone().into(),
            b.clone().into(),
        ]);
        let css: Vec<_> = finalize_styles(&styles)
            .iter()
            .map(|s| s.css().to_string())
            .collect();
        assert_eq!(css, ["a{}", "c{}", "b{}"]);
    }

    #[test]
    fn equal_text_is_not_the_same_sheet() {
        let styles: Styles = vec![StyleSheet::new("x{}"), StyleSheet::new("x{}")].into();
        assert_eq!(finalize_styles(&styles).len(), 2);
    }

    #[test]
    fn adopted_styles_become_style_elements() {
        let doc = Document::new();
        let host = doc.create_element("x-el").unwrap();
        let root = doc.attach_shadow(host).unwrap();
        adopt_styles(&doc, root, &[StyleSheet::new(":host{display:block}")]).unwrap();
        assert_eq!(doc.inner_html(root), "<style>:host{display:block}</style>");
    }
}
