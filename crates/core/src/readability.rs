//! Main content extraction API.
//!
//! [`Declutter`] runs the pipeline over one document: boilerplate filter,
//! content scorer, selection cleanup, and resource normalizer. In
//! [`ExtractionMode::Structured`] the filter and scorer are replaced by the
//! structured extractor, with the heuristic pipeline as a transparent
//! fallback. Convenience functions [`parse`], [`parse_with_url`], and
//! [`fetch_and_parse`] use the default configuration.
//!
//! # Example
//!
//! ```rust
//! use declutter_core::readability::parse_with_url;
//!
//! let html = r#"<html><body>
//!     <div class="ad-banner">Buy now</div>
//!     <article><p>Readable text lives here.</p><img src="/a.png"></article>
//! </body></html>"#;
//! let article = parse_with_url(html, "https://example.com/post").unwrap();
//! assert!(article.content.contains("https://example.com/a.png"));
//! assert!(!article.content.contains("Buy now"));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::article::Article;
use crate::dom_tree::NodeId;
use crate::extract::{Selection, SelectionSource, cleanup_selection, select};
use crate::fetch::{FetchConfig, fetch_url};
use crate::parse::Document;
use crate::policy::ExtractionPolicy;
use crate::postprocess::{NormalizeReport, normalize};
use crate::preprocess::{FilterReport, filter};
use crate::{DeclutterError, Result};

/// Largest raw document accepted by the pipeline
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;

/// Which extractor locates the main content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Boilerplate filter and content scorer
    #[default]
    Heuristic,
    /// Readability extraction followed by lost-image reinsertion
    Structured,
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Heuristic => write!(f, "heuristic"),
            Self::Structured => write!(f, "structured"),
        }
    }
}

impl FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heuristic" => Ok(Self::Heuristic),
            "structured" => Ok(Self::Structured),
            other => Err(format!("unknown extraction mode: {other}")),
        }
    }
}

/// Configuration for the extraction pipeline.
///
/// # Example
///
/// ```rust
/// use declutter_core::{DeclutterConfig, ExtractionMode};
///
/// let config = DeclutterConfig::builder()
///     .mode(ExtractionMode::Structured)
///     .timeout(10)
///     .build();
/// assert_eq!(config.fetch.timeout, 10);
/// ```
#[derive(Debug, Clone)]
pub struct DeclutterConfig {
    pub mode: ExtractionMode,
    /// Filter and scorer rule tables
    pub policy: ExtractionPolicy,
    /// Whether to run the resource normalizer on the selected content (default: true)
    pub normalize_images: bool,
    /// Raw input above this size is rejected with [`DeclutterError::ContentTooLarge`]
    pub max_content_bytes: usize,
    /// Profile plan used by [`Declutter::fetch_and_parse`]
    pub fetch: FetchConfig,
}

impl Default for DeclutterConfig {
    fn default() -> Self {
        Self {
            mode: ExtractionMode::default(),
            policy: ExtractionPolicy::default(),
            normalize_images: true,
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            fetch: FetchConfig::default(),
        }
    }
}

impl DeclutterConfig {
    pub fn builder() -> DeclutterConfigBuilder {
        DeclutterConfigBuilder::new()
    }
}

/// Builder for [`DeclutterConfig`].
#[derive(Debug, Clone, Default)]
pub struct DeclutterConfigBuilder {
    config: DeclutterConfig,
}

impl DeclutterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: DeclutterConfig::default() }
    }

    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn policy(mut self, policy: ExtractionPolicy) -> Self {
        self.config.policy = policy;
        self
    }

    pub fn normalize_images(mut self, value: bool) -> Self {
        self.config.normalize_images = value;
        self
    }

    pub fn max_content_bytes(mut self, value: usize) -> Self {
        self.config.max_content_bytes = value;
        self
    }

    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    /// Sets the per-request fetch timeout in seconds.
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.fetch.timeout = seconds;
        self
    }

    pub fn build(self) -> DeclutterConfig {
        self.config
    }
}

/// What each pipeline stage did
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// The extractor that produced the content
    pub mode: ExtractionMode,
    /// Structured mode was requested but failed and the heuristic pipeline ran instead
    pub structured_fallback: bool,
    pub filter: FilterReport,
    /// Absent in structured mode
    pub selection: Option<Selection>,
    /// Subtrees removed from the selection after scoring
    pub cleaned: usize,
    pub normalize: NormalizeReport,
    /// Images re-inserted after structured extraction
    pub restored_images: usize,
}

/// An extracted document: the owned tree plus the chosen content root
#[derive(Debug, Clone)]
pub struct Extraction {
    pub document: Document,
    pub content_root: NodeId,
    /// Title of the original page
    pub title: Option<String>,
    pub report: PipelineReport,
}

impl Extraction {
    /// Serialized content subtree.
    ///
    /// A `<body>` or `<html>` root contributes only its children.
    pub fn content_html(&self) -> String {
        let tree = self.document.tree();
        match tree.tag_name(self.content_root) {
            Some("body" | "html") | None => tree.inner_html(self.content_root),
            Some(_) => tree.outer_html(self.content_root),
        }
    }

    pub fn image_count(&self) -> usize {
        self.document.tree().descendants_by_tag(self.content_root, "img").len()
    }
}

/// Main entry point for content extraction.
///
/// Holds only immutable configuration, so one instance can serve concurrent requests.
///
/// # Example
///
/// ```rust
/// use declutter_core::Declutter;
///
/// let declutter = Declutter::new();
/// let html = "<html><body><main><p>Content here</p></main></body></html>";
/// let article = declutter.parse(html).unwrap();
/// assert_eq!(article.text_content, "Content here");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Declutter {
    config: DeclutterConfig,
}

impl Declutter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DeclutterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DeclutterConfig {
        &self.config
    }

    /// Parses an HTML string and extracts readable content.
    pub fn parse(&self, html: &str) -> Result<Article> {
        let extraction = self.extract(html, None)?;
        Ok(Article::from_extraction(&extraction, None))
    }

    /// Parses HTML with a known base URL for image resolution.
    ///
    /// # Errors
    ///
    /// Returns [`DeclutterError::InvalidUrl`] if the URL is invalid.
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Article> {
        let base = Url::parse(url).map_err(|e| DeclutterError::InvalidUrl(format!("{url}: {e}")))?;
        let extraction = self.extract(html, Some(base))?;
        Ok(Article::from_extraction(&extraction, Some(url.to_string())))
    }

    /// Fetch HTML from URL with the configured profile plan and extract its content.
    pub async fn fetch_and_parse(&self, url: &str) -> Result<Article> {
        let html = fetch_url(url, &self.config.fetch).await?;
        self.parse_with_url(&html, url)
    }

    /// Run the configured pipeline over raw markup.
    pub fn extract(&self, html: &str, base: Option<Url>) -> Result<Extraction> {
        if html.len() > self.config.max_content_bytes {
            return Err(DeclutterError::ContentTooLarge { length: html.len(), limit: self.config.max_content_bytes });
        }

        let structured_fallback = match self.config.mode {
            ExtractionMode::Heuristic => false,
            ExtractionMode::Structured => match self.extract_structured(html, base.as_ref()) {
                Ok(extraction) => return Ok(extraction),
                Err(error) => {
                    warn!(%error, "structured extraction failed, falling back to heuristic pipeline");
                    true
                }
            },
        };

        let document = Document::parse_with_base(html, base)?;
        let mut extraction = self.extract_document(document)?;
        extraction.report.structured_fallback = structured_fallback;
        Ok(extraction)
    }

    /// Run the heuristic pipeline over an already parsed document.
    ///
    /// # Errors
    ///
    /// Returns [`DeclutterError::NoReadableContent`] when selection degrades
    /// to the body (or root) and it holds no images and no more than
    /// `min_candidate_words` words.
    pub fn extract_document(&self, mut document: Document) -> Result<Extraction> {
        let policy = &self.config.policy;
        let title = document.title();

        let filter_report = filter(document.tree_mut(), &policy.filter);
        let selection = select(&document, &policy.score);
        let content_root = selection.node;
        let cleaned = cleanup_selection(document.tree_mut(), content_root, &policy.filter);

        if matches!(selection.source, SelectionSource::Body | SelectionSource::Root) {
            let tree = document.tree();
            let words = tree.text_content(content_root).split_whitespace().count();
            if words <= policy.score.weights.min_candidate_words && !tree.has_descendant_tag(content_root, "img") {
                debug!(source = %selection.source, words, "fallback selection too short and holds no images");
                return Err(DeclutterError::NoReadableContent);
            }
        }

        let normalize_report = if self.config.normalize_images {
            let base = document.base_url().cloned();
            normalize(document.tree_mut(), content_root, base.as_ref())
        } else {
            NormalizeReport::default()
        };

        info!(
            source = %selection.source,
            removed = filter_report.total_removed(),
            demoted = filter_report.demoted,
            images = normalize_report.images,
            "heuristic extraction finished"
        );

        Ok(Extraction {
            document,
            content_root,
            title,
            report: PipelineReport {
                mode: ExtractionMode::Heuristic,
                structured_fallback: false,
                filter: filter_report,
                selection: Some(selection),
                cleaned,
                normalize: normalize_report,
                restored_images: 0,
            },
        })
    }

    #[cfg(feature = "structured")]
    fn extract_structured(&self, html: &str, base: Option<&Url>) -> Result<Extraction> {
        let original_title = Document::parse(html)?.title();
        let outcome = crate::structured::extract(html, base)?;
        Ok(Extraction {
            title: original_title.or(outcome.title),
            content_root: outcome.content_root,
            document: outcome.document,
            report: PipelineReport {
                mode: ExtractionMode::Structured,
                normalize: outcome.normalize,
                restored_images: outcome.restored,
                ..Default::default()
            },
        })
    }

    #[cfg(not(feature = "structured"))]
    fn extract_structured(&self, _html: &str, _base: Option<&Url>) -> Result<Extraction> {
        Err(DeclutterError::FeatureDisabled { operation: "structured extraction", feature: "structured" })
    }
}

/// Parse HTML and extract readable content with the default configuration.
pub fn parse(html: &str) -> Result<Article> {
    Declutter::new().parse(html)
}

/// Parse HTML with a base URL and extract readable content.
pub fn parse_with_url(html: &str, url: &str) -> Result<Article> {
    Declutter::new().parse_with_url(html, url)
}

/// Fetch a URL with the default profile plan and extract readable content.
///
/// # Example
///
/// ```rust,no_run
/// use declutter_core::fetch_and_parse;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let article = fetch_and_parse("https://example.com/article").await?;
///     println!("{}", article.text_content);
///     Ok(())
/// }
/// ```
pub async fn fetch_and_parse(url: &str) -> Result<Article> {
    Declutter::new().fetch_and_parse(url).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_article() -> String {
        let sentence = "The river rose steadily through the night, and by morning the lower streets were under water. ";
        format!(
            r#"<html><head><title>Flood Report</title></head><body>
                <nav><a href="/">Home</a></nav>
                <div class="advertisement">Buy now</div>
                <div class="post-content">
                    <h2>Morning update</h2>
                    <p>{0}{0}{0}</p>
                    <p>{0}{0}</p>
                    <p>{0}</p>
                    <img data-src="/photos/river.jpg" width="800" height="600">
                </div>
                <footer>Copyright 2025</footer>
            </body></html>"#,
            sentence
        )
    }

    #[test]
    fn test_config_default() {
        let config = DeclutterConfig::default();
        assert_eq!(config.mode, ExtractionMode::Heuristic);
        assert!(config.normalize_images);
        assert_eq!(config.max_content_bytes, DEFAULT_MAX_CONTENT_BYTES);
        assert_eq!(config.fetch.timeout, 30);
    }

    #[test]
    fn test_config_builder() {
        let config = DeclutterConfig::builder()
            .mode(ExtractionMode::Structured)
            .normalize_images(false)
            .max_content_bytes(1024)
            .timeout(5)
            .build();
        assert_eq!(config.mode, ExtractionMode::Structured);
        assert!(!config.normalize_images);
        assert_eq!(config.max_content_bytes, 1024);
        assert_eq!(config.fetch.timeout, 5);
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("Structured".parse::<ExtractionMode>(), Ok(ExtractionMode::Structured));
        assert_eq!("heuristic".parse::<ExtractionMode>(), Ok(ExtractionMode::Heuristic));
        assert!("readability".parse::<ExtractionMode>().is_err());
    }

    #[test]
    fn test_heuristic_pipeline() {
        let declutter = Declutter::new();
        let extraction = declutter.extract(&long_article(), Url::parse("https://news.example.com/a/b").ok()).unwrap();

        assert_eq!(extraction.title.as_deref(), Some("Flood Report"));
        let selection = extraction.report.selection.as_ref().unwrap();
        assert_eq!(selection.source, SelectionSource::Scored);

        let html = extraction.content_html();
        assert!(html.starts_with(r#"<div class="post-content">"#));
        assert!(html.contains(r#"src="https://news.example.com/photos/river.jpg""#));
        assert!(!html.contains("Buy now"));
        assert!(!html.contains("Copyright"));
        assert!(!html.contains("width="));
        assert_eq!(extraction.report.normalize.lazy_resolved, 1);
        assert!(extraction.report.filter.total_removed() >= 3);
    }

    #[test]
    fn test_normalize_can_be_disabled() {
        let config = DeclutterConfig::builder().normalize_images(false).build();
        let extraction = Declutter::with_config(config).extract(&long_article(), None).unwrap();
        assert!(extraction.content_html().contains(r#"data-src="/photos/river.jpg""#));
        assert_eq!(extraction.report.normalize, NormalizeReport::default());
    }

    #[test]
    fn test_content_too_large() {
        let config = DeclutterConfig::builder().max_content_bytes(16).build();
        let result = Declutter::with_config(config).parse("<html><body><p>more than sixteen bytes</p></body></html>");
        assert!(matches!(result, Err(DeclutterError::ContentTooLarge { limit: 16, .. })));
    }

    #[test]
    fn test_empty_body_is_not_readable() {
        let result = parse("<html><body><nav>Menu</nav><script>x()</script></body></html>");
        assert!(matches!(result, Err(DeclutterError::NoReadableContent)));
    }

    #[test]
    fn test_script_shell_body_is_not_readable() {
        let result = parse(r#"<html><body><div id="app">Loading</div></body></html>"#);
        assert!(matches!(result, Err(DeclutterError::NoReadableContent)));
    }

    #[test]
    fn test_short_body_above_threshold_is_readable() {
        let text = vec!["word"; 21].join(" ");
        let article = parse(&format!("<html><body><span>{text}</span></body></html>")).unwrap();
        assert_eq!(article.word_count, 21);
    }

    #[test]
    fn test_body_with_image_is_readable() {
        let article = parse(r#"<html><body><img src="https://a.com/x.png"></body></html>"#).unwrap();
        assert_eq!(article.image_count, 1);
    }

    #[test]
    fn test_parse_with_invalid_url() {
        let result = parse_with_url("<p>x</p>", "not a url");
        assert!(matches!(result, Err(DeclutterError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_with_url_sets_source() {
        let article = parse_with_url(&long_article(), "https://news.example.com/a/b").unwrap();
        assert_eq!(article.source_url.as_deref(), Some("https://news.example.com/a/b"));
        assert_eq!(article.title.as_deref(), Some("Flood Report"));
    }

    #[cfg(feature = "structured")]
    #[test]
    fn test_structured_mode() {
        let config = DeclutterConfig::builder().mode(ExtractionMode::Structured).build();
        let extraction = Declutter::with_config(config).extract(&long_article(), None).unwrap();
        assert!(extraction.content_html().contains("The river rose steadily"));
        assert!(extraction.report.selection.is_none() || extraction.report.structured_fallback);
    }

    #[test]
    fn test_fetch_and_parse_invalid_url() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let result = rt.block_on(fetch_and_parse("ftp://example.com/file"));
        assert!(matches!(result, Err(DeclutterError::InvalidUrl(_)) | Err(DeclutterError::FeatureDisabled { .. })));
    }
}
