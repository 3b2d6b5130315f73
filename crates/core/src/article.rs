//! Article output type with content, counts, and format conversion.
//!
//! [`Article`] is the serializable projection of an [`Extraction`]: the
//! content HTML, a plain-text rendering, the page title, and what the
//! pipeline decided along the way.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::Result;
use crate::dom_tree::{DomTree, NodeData, NodeId};
use crate::extract::Selection;
use crate::readability::{ExtractionMode, Extraction};

#[allow(clippy::expect_used)]
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[\w'-]+\b").expect("WORD regex"));

/// Elements that start a new line in plain-text output
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption", "figure", "h1", "h2",
    "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Output format options for Article content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// HTML format (extracted content).
    Html,
    /// Markdown with the title as a top-level heading.
    Markdown,
    /// Plain text format (stripped HTML tags).
    PlainText,
    /// JSON format (the whole article).
    Json,
}

/// The complete result of reading an HTML document.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub title: Option<String>,

    /// Extracted readable content as clean HTML.
    pub content: String,

    /// Plain text version of content, one block per paragraph.
    pub text_content: String,

    pub word_count: usize,

    pub image_count: usize,

    /// Source URL if known.
    pub source_url: Option<String>,

    /// The extractor that produced the content
    pub mode: ExtractionMode,

    /// How the content root was chosen (heuristic mode only)
    pub selection: Option<Selection>,

    /// Image references that could not be made absolute
    pub unresolved_images: Vec<String>,

    /// Images re-inserted after structured extraction
    pub restored_images: usize,
}

impl Article {
    /// Creates an Article from a content fragment.
    pub fn new(content: String, title: Option<String>, source_url: Option<String>) -> Self {
        let tree = DomTree::from_html(&content);
        let root = tree.descendants_by_tag(tree.root(), "body").first().copied().unwrap_or(tree.root());
        let text_content = plain_text(&tree, root);

        Self {
            title,
            word_count: count_words(&text_content),
            image_count: tree.descendants_by_tag(root, "img").len(),
            text_content,
            content,
            source_url,
            mode: ExtractionMode::default(),
            selection: None,
            unresolved_images: Vec::new(),
            restored_images: 0,
        }
    }

    /// Projects a finished extraction.
    pub fn from_extraction(extraction: &Extraction, source_url: Option<String>) -> Self {
        let tree = extraction.document.tree();
        let text_content = plain_text(tree, extraction.content_root);
        let report = &extraction.report;

        Self {
            title: extraction.title.clone(),
            content: extraction.content_html(),
            word_count: count_words(&text_content),
            image_count: extraction.image_count(),
            text_content,
            source_url,
            mode: report.mode,
            selection: report.selection.clone(),
            unresolved_images: report.normalize.unresolved.clone(),
            restored_images: report.restored_images,
        }
    }

    /// Converts content to the specified format.
    pub fn to_format(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Html => Ok(self.content.clone()),
            OutputFormat::Markdown => self.to_markdown(),
            OutputFormat::PlainText => Ok(self.text_content.clone()),
            OutputFormat::Json => self.to_json(),
        }
    }

    /// Gets content as Markdown, headed by the title when known.
    #[cfg(feature = "markdown")]
    pub fn to_markdown(&self) -> Result<String> {
        let body = htmd::convert(&self.content).unwrap_or_default();
        Ok(match &self.title {
            Some(title) => format!("# {title}\n\n{}", body.trim()),
            None => body.trim().to_string(),
        })
    }

    #[cfg(not(feature = "markdown"))]
    pub fn to_markdown(&self) -> Result<String> {
        Err(crate::DeclutterError::FeatureDisabled { operation: "markdown output", feature: "markdown" })
    }

    /// Gets the whole article as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Text of a subtree with block elements separated by blank lines
fn plain_text(tree: &DomTree, root: NodeId) -> String {
    let mut raw = String::new();
    collect_text(tree, root, &mut raw);

    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_text(tree: &DomTree, id: NodeId, out: &mut String) {
    for &child in tree.children(id) {
        match tree.get_node(child).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(&text.replace('\n', " ")),
            Some(NodeData::Element(el)) => {
                let tag = el.tag_name.as_str();
                if matches!(tag, "script" | "style" | "noscript" | "template") {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    out.push('\n');
                }
                collect_text(tree, child, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_creation() {
        let content = "<p>This is a test article with some content.</p>".to_string();
        let article = Article::new(content.clone(), Some("Test Article".into()), Some("https://example.com".into()));

        assert_eq!(article.content, content);
        assert_eq!(article.text_content, "This is a test article with some content.");
        assert_eq!(article.title.as_deref(), Some("Test Article"));
        assert_eq!(article.word_count, 8);
        assert_eq!(article.image_count, 0);
    }

    #[test]
    fn test_plain_text_separates_blocks() {
        let article = Article::new("<p>Hello world</p><p>Second\n   paragraph</p>".into(), None, None);
        assert_eq!(article.text_content, "Hello world\n\nSecond paragraph");
    }

    #[test]
    fn test_plain_text_skips_scripts() {
        let article = Article::new("<div>Visible<script>hidden()</script></div>".into(), None, None);
        assert_eq!(article.text_content, "Visible");
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("hello world"), 2);
        assert_eq!(count_words("don't stop-gap"), 2);
        assert_eq!(count_words(""), 0);
    }

    #[test]
    fn test_to_format_html_and_text() {
        let article = Article::new("<p>Test content</p>".into(), None, None);
        assert_eq!(article.to_format(OutputFormat::Html).unwrap(), "<p>Test content</p>");
        assert_eq!(article.to_format(OutputFormat::PlainText).unwrap(), "Test content");
    }

    #[test]
    fn test_to_format_json() {
        let article = Article::new("<p>Test</p>".into(), Some("Title".into()), Some("https://example.com".into()));
        let json: serde_json::Value = serde_json::from_str(&article.to_format(OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(json["title"], "Title");
        assert_eq!(json["content"], "<p>Test</p>");
        assert_eq!(json["mode"], "heuristic");
        assert_eq!(json["source_url"], "https://example.com");
    }

    #[cfg(feature = "markdown")]
    #[test]
    fn test_to_markdown_with_title() {
        let article = Article::new("<p>Some <strong>bold</strong> text</p>".into(), Some("Title".into()), None);
        let markdown = article.to_format(OutputFormat::Markdown).unwrap();
        assert!(markdown.starts_with("# Title\n\n"));
        assert!(markdown.contains("**bold**"));
    }

    #[test]
    fn test_from_extraction_carries_report() {
        let html = r#"<html><head><title>T</title></head><body>
            <main><p>Short text.</p><img src="../up.png"></main>
        </body></html>"#;
        let extraction = crate::Declutter::new().extract(html, url::Url::parse("https://a.com/x/").ok()).unwrap();
        let article = Article::from_extraction(&extraction, None);

        assert_eq!(article.title.as_deref(), Some("T"));
        assert_eq!(article.unresolved_images, vec!["../up.png".to_string()]);
        assert_eq!(article.selection.as_ref().map(|s| s.source.to_string()), Some("main".to_string()));
        assert_eq!(article.image_count, 1);
    }
}
