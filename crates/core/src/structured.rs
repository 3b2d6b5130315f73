//! Structured extraction with image diff-reinsertion.
//!
//! Scoring and cleanup are delegated to `dom_smoothie`, a Readability
//! implementation. It tends to discard images that sit outside the paragraphs
//! it keeps, so every image of the original page is recorded first and the
//! ones missing from the result are spliced back in after every other
//! paragraph.

use std::collections::HashSet;

use dom_smoothie::{Config, Readability};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::dom_tree::{DomTree, NodeId};
use crate::parse::Document;
use crate::postprocess::{NormalizeReport, normalize, resolve_reference};
use crate::{DeclutterError, Result};

/// Attributes consulted, in order, for an original image's reference
const ORIGINAL_SOURCE_ATTRIBUTES: &[&str] = &["src", "data-src", "data-original", "data-lazy-src"];

/// References containing these are decorative or placeholders
const IGNORED_REFERENCE_MARKERS: &[&str] = &["data:image", "placeholder", "blank.gif", "spacer.gif", "loading.gif"];

/// References this short are treated as tracking pixels or junk
const MIN_REFERENCE_LEN: usize = 10;

const RESTORED_CLASS: &str = "restored-image";

/// An image recorded from the page before extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OriginalImage {
    /// Reference as written in the page
    pub reference: String,
    /// Reference resolved against the base URL's origin, used when the image is restored
    pub resolved: String,
    /// Reference joined against the full base URL, the form the extractor
    /// writes into surviving images; used only to decide whether an image was lost
    #[serde(skip)]
    pub key: String,
    pub alt: Option<String>,
    pub title: Option<String>,
    pub srcset: Option<String>,
}

/// Result of a structured extraction
#[derive(Debug, Clone)]
pub struct StructuredOutcome {
    /// Extracted content parsed into its own document
    pub document: Document,
    pub content_root: NodeId,
    pub title: Option<String>,
    pub normalize: NormalizeReport,
    /// Number of lost images spliced back in
    pub restored: usize,
}

/// Record every image reference of a tree in document order
pub fn collect_images(tree: &DomTree, base: Option<&Url>) -> Vec<OriginalImage> {
    tree.descendants_by_tag(tree.root(), "img")
        .into_iter()
        .filter_map(|id| {
            let reference = ORIGINAL_SOURCE_ATTRIBUTES
                .iter()
                .filter_map(|name| tree.attr(id, name))
                .map(str::trim)
                .find(|v| !v.is_empty())?
                .to_string();
            let non_empty = |name: &str| tree.attr(id, name).filter(|v| !v.trim().is_empty()).map(str::to_string);
            Some(OriginalImage {
                resolved: resolve_reference(&reference, base).0,
                key: comparison_key(&reference, base),
                reference,
                alt: non_empty("alt"),
                title: non_empty("title"),
                srcset: non_empty("srcset").or_else(|| non_empty("data-srcset")),
            })
        })
        .collect()
}

/// `reference` joined against the full base URL, or unchanged when there is no base or the join fails
pub fn comparison_key(reference: &str, base: Option<&Url>) -> String {
    base.and_then(|b| b.join(reference).ok()).map_or_else(|| reference.to_string(), String::from)
}

/// Original images whose key is missing from `surviving`, deduplicated, in original order
pub fn find_lost_images(originals: &[OriginalImage], surviving: &HashSet<String>) -> Vec<OriginalImage> {
    let mut seen: HashSet<&str> = HashSet::new();
    originals
        .iter()
        .filter(|img| {
            img.reference.len() > MIN_REFERENCE_LEN
                && !IGNORED_REFERENCE_MARKERS.iter().any(|m| img.reference.contains(m))
                && !surviving.contains(&img.key)
                && seen.insert(img.key.as_str())
        })
        .cloned()
        .collect()
}

/// Splice lost images after paragraphs 0, 2, 4, … below `root`.
///
/// Images beyond the available paragraphs are dropped. Returns the number inserted.
pub fn reinsert_lost_images(tree: &mut DomTree, root: NodeId, lost: &[OriginalImage]) -> usize {
    let paragraphs = tree.descendants_by_tag(root, "p");
    let mut inserted = 0;

    for (index, image) in lost.iter().enumerate() {
        let Some(&anchor) = paragraphs.get(index * 2) else {
            break;
        };

        let alt = image.alt.clone().unwrap_or_else(|| format!("Image {}", index + 1));
        let img = tree.create_element("img", &[("src", image.resolved.as_str()), ("alt", alt.as_str())]);
        if let Some(title) = &image.title {
            tree.set_attr(img, "title", title);
        }
        if let Some(srcset) = &image.srcset {
            tree.set_attr(img, "srcset", srcset);
        }

        let wrapper = tree.create_element("div", &[("class", RESTORED_CLASS)]);
        tree.append_child(wrapper, img);
        tree.insert_after(anchor, wrapper);
        inserted += 1;
    }

    if inserted < lost.len() {
        debug!(dropped = lost.len() - inserted, "not enough paragraphs to restore every image");
    }
    inserted
}

/// Run the structured extractor over `html` and restore the images it dropped.
pub fn extract(html: &str, base: Option<&Url>) -> Result<StructuredOutcome> {
    let original = DomTree::from_html(html);
    let originals = collect_images(&original, base);

    let config = Config { max_elements_to_parse: 9000, ..Default::default() };
    let mut readability = Readability::new(html, base.map(Url::as_str), Some(config))
        .map_err(|e| DeclutterError::StructuredExtraction(e.to_string()))?;
    let article = readability.parse().map_err(|e| DeclutterError::StructuredExtraction(e.to_string()))?;

    let mut document = Document::parse_with_base(&article.content, base.cloned())?;
    let content_root = document
        .body()
        .ok_or_else(|| DeclutterError::StructuredExtraction("extracted content has no body".to_string()))?;

    let report = normalize(document.tree_mut(), content_root, base);

    let tree = document.tree();
    let surviving: HashSet<String> = tree
        .descendants_by_tag(content_root, "img")
        .into_iter()
        .filter_map(|id| tree.attr(id, "src"))
        .map(|src| comparison_key(src, base))
        .collect();

    let lost = find_lost_images(&originals, &surviving);
    let restored = reinsert_lost_images(document.tree_mut(), content_root, &lost);
    info!(original = originals.len(), lost = lost.len(), restored, "structured extraction finished");

    let title = Some(article.title.trim().to_string()).filter(|t| !t.is_empty());
    Ok(StructuredOutcome { document, content_root, title, normalize: report, restored })
}
