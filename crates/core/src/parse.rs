//! HTML parsing into an owned, mutable document.
//!
//! A [`Document`] owns the [`DomTree`] built from raw markup plus the base URL
//! used to resolve relative references. Every pipeline stage borrows the tree
//! mutably for the duration of one request.
//!
//! # Example
//!
//! ```rust
//! use declutter_core::parse::Document;
//!
//! let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
//! let doc = Document::parse(html).unwrap();
//! assert_eq!(doc.title(), Some("Test".to_string()));
//! assert_eq!(doc.select_tag("p").len(), 1);
//! ```

use url::Url;

use crate::dom_tree::{DomTree, NodeId};
use crate::{DeclutterError, Result};

/// A parsed HTML document.
#[derive(Debug, Clone)]
pub struct Document {
    tree: DomTree,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// Malformed markup is repaired by the HTML5 parsing algorithm, so this
    /// only fails on inputs the pipeline refuses outright.
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self { tree: DomTree::from_html(html), base_url: None })
    }

    /// Parses HTML and records the base URL for resource normalization.
    pub fn parse_with_base(html: &str, base_url: Option<Url>) -> Result<Self> {
        let mut doc = Self::parse(html)?;
        doc.base_url = base_url;
        Ok(doc)
    }

    /// Parses HTML with a base URL given as a string.
    ///
    /// # Errors
    ///
    /// Returns [`DeclutterError::InvalidUrl`] if `base_url` does not parse.
    pub fn parse_with_base_str(html: &str, base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| DeclutterError::InvalidUrl(format!("{base_url}: {e}")))?;
        Self::parse_with_base(html, Some(url))
    }

    /// Gets the base URL, if one was provided.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn set_base_url(&mut self, base_url: Option<Url>) {
        self.base_url = base_url;
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DomTree {
        &mut self.tree
    }

    /// Gets the entire document serialized back to HTML.
    pub fn as_string(&self) -> String {
        self.tree.outer_html(self.tree.root())
    }

    /// All elements with the given tag name, in document order.
    pub fn select_tag(&self, tag: &str) -> Vec<NodeId> {
        self.tree.descendants_by_tag(self.tree.root(), &tag.to_ascii_lowercase())
    }

    /// Gets the title of the document.
    ///
    /// Returns the trimmed text of the first `<title>` element, if non-empty.
    pub fn title(&self) -> Option<String> {
        let title = self.select_tag("title").into_iter().next()?;
        let text = self.tree.text_content(title);
        let trimmed = text.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
    }

    /// The `<body>` element.
    pub fn body(&self) -> Option<NodeId> {
        self.select_tag("body").into_iter().next()
    }

    /// The `<html>` root element.
    pub fn root_element(&self) -> Option<NodeId> {
        self.tree.root_element()
    }

    /// Text content of the whole document.
    pub fn text_content(&self) -> String {
        self.tree.text_content(self.tree.root())
    }
}
