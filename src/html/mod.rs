//! HTML access layer
//!
//! Parsers never touch `scraper` directly; they work against the [`Node`]
//! capability trait.

pub mod table;
pub mod text;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

pub use table::{extract_key_values, extract_table, extract_transposed_table, Row};
pub use text::{
    clean_text, extract_number, extract_percentage, format_date, format_number, format_percent,
    normalize_value,
};

/// Minimal DOM capability needed by the extractors
pub trait Node: Copy {
    /// All descendants matching a CSS selector, in document order.
    /// An unparsable selector matches nothing.
    fn query(&self, selector: &str) -> Vec<Self>;

    /// Concatenated text of the node and its descendants
    fn inner_text(&self) -> String;

    fn attribute(&self, name: &str) -> Option<String>;

    /// First match of `selector`, if any
    fn first(&self, selector: &str) -> Option<Self> {
        self.query(selector).into_iter().next()
    }

    /// Text of the first match of `selector`, trimmed; empty when absent
    fn text_of(&self, selector: &str) -> String {
        self.first(selector)
            .map(|n| n.inner_text().trim().to_string())
            .unwrap_or_default()
    }
}

impl<'a> Node for ElementRef<'a> {
    fn query(&self, selector: &str) -> Vec<Self> {
        match Selector::parse(selector) {
            Ok(sel) => self.select(&sel).collect(),
            Err(e) => {
                warn!("Ignoring invalid selector '{}': {:?}", selector, e);
                Vec::new()
            }
        }
    }

    fn inner_text(&self) -> String {
        ElementRef::text(self).collect()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.value().attr(name).map(str::to_string)
    }
}

/// A parsed HTML document
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
        }
    }

    /// Root element (`<html>`) to run queries against
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div id="main">
            <a class="link" href="/a.html">  First  </a>
            <a class="link" href="/b.html">Second</a>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_query_in_document_order() {
        let doc = Document::parse(PAGE);
        let links = doc.root().query("#main a.link");
        assert_eq!(links.len(), 2);
        assert_eq!(links[1].inner_text(), "Second");
        assert_eq!(links[0].attribute("href").as_deref(), Some("/a.html"));
        assert_eq!(links[0].attribute("title"), None);
    }

    #[test]
    fn test_invalid_selector_matches_nothing() {
        let doc = Document::parse(PAGE);
        assert!(doc.root().query("a[[").is_empty());
    }

    #[test]
    fn test_text_of() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.root().text_of("#main a"), "First");
        assert_eq!(doc.root().text_of(".missing"), "");
    }
}
