//! Resource normalizer for the selected content.
//!
//! Repairs lazy-loaded images (copying the first usable `data-*` source into
//! `src`), absolutizes relative references against the page origin, and
//! strips attributes that constrain size or visibility.

use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::dom_tree::{DomTree, NodeId};

/// Lazy-load attributes in priority order
pub const LAZY_SOURCE_ATTRIBUTES: &[&str] = &["data-src", "data-original", "data-lazy-src", "data-actual"];

/// Attributes removed from every image
const CONSTRAINING_ATTRIBUTES: &[&str] = &["width", "height", "style"];

/// Class tokens left behind by lazy-loading scripts
const LAZY_CLASS_TOKENS: &[&str] = &["lazy", "lazyload", "lazyloaded", "loading", "placeholder"];

/// Image references gathered from one `<img>` element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDescriptor {
    /// Current `src`, if any
    pub src: Option<String>,
    /// Non-empty lazy-load attributes in priority order (name, value)
    pub lazy_sources: Vec<(String, String)>,
    pub srcset: Option<String>,
    /// `data-srcset`
    pub lazy_srcset: Option<String>,
    /// Size/visibility attributes present on the element
    pub constraints: Vec<String>,
}

impl ImageDescriptor {
    pub fn from_element(tree: &DomTree, id: NodeId) -> Self {
        let owned = |name: &str| tree.attr(id, name).map(str::to_string);
        Self {
            src: owned("src"),
            lazy_sources: LAZY_SOURCE_ATTRIBUTES
                .iter()
                .filter_map(|name| {
                    let value = tree.attr(id, name)?.trim();
                    (!value.is_empty()).then(|| (name.to_string(), value.to_string()))
                })
                .collect(),
            srcset: owned("srcset"),
            lazy_srcset: owned("data-srcset"),
            constraints: CONSTRAINING_ATTRIBUTES
                .iter()
                .filter(|name| tree.attr(id, name).is_some())
                .map(|name| name.to_string())
                .collect(),
        }
    }

    /// `src` when it points at real content
    pub fn usable_src(&self) -> Option<&str> {
        self.src.as_deref().filter(|s| is_usable_src(s))
    }

    /// The reference the image should display: a usable `src`, else the first lazy source.
    pub fn effective_reference(&self) -> Option<&str> {
        self.usable_src().or_else(|| self.lazy_sources.first().map(|(_, v)| v.as_str()))
    }
}

/// False for empty, inline-data, placeholder, and blank-marker sources
pub fn is_usable_src(src: &str) -> bool {
    let src = src.trim();
    !src.is_empty() && !src.contains("data:") && !src.contains("placeholder") && !src.contains("blank")
}

/// Outcome of resolving one image reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Already absolute
    Absolute,
    /// Rewritten against the base origin
    Resolved,
    /// Relative and left as-is (`../` paths, or no usable base)
    Unresolved,
    /// No reference at all
    Missing,
    /// `data:` URI
    Embedded,
}

/// What the normalizer did to one content subtree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub images: usize,
    /// Images whose `src` came from a lazy-load attribute
    pub lazy_resolved: usize,
    /// References rewritten to absolute form
    pub absolutized: usize,
    /// References that stayed relative
    pub unresolved: Vec<String>,
}

/// Resolve an image reference against a base URL.
///
/// Only http(s) bases are used. Protocol-relative references take the base
/// scheme; root-relative, `./` and plain relative references are joined to
/// the base origin. `../` references are returned unchanged.
pub fn resolve_reference(reference: &str, base: Option<&Url>) -> (String, Resolution) {
    if reference.starts_with("data:") {
        return (reference.to_string(), Resolution::Embedded);
    }
    if reference.starts_with("http") {
        return (reference.to_string(), Resolution::Absolute);
    }

    let Some(base) = base.filter(|b| matches!(b.scheme(), "http" | "https")) else {
        return (reference.to_string(), Resolution::Unresolved);
    };
    let origin = base.origin().ascii_serialization();

    let resolved = if reference.starts_with("//") {
        format!("{}:{}", base.scheme(), reference)
    } else if reference.starts_with('/') {
        format!("{origin}{reference}")
    } else if let Some(rest) = reference.strip_prefix("./") {
        format!("{origin}/{rest}")
    } else if reference.starts_with("../") {
        return (reference.to_string(), Resolution::Unresolved);
    } else {
        format!("{origin}/{reference}")
    };
    (resolved, Resolution::Resolved)
}

/// Normalize one `<img>` element in place
pub fn normalize_image(tree: &mut DomTree, id: NodeId, base: Option<&Url>) -> (Resolution, bool) {
    let descriptor = ImageDescriptor::from_element(tree, id);

    let mut lazy = false;
    if descriptor.usable_src().is_none()
        && let Some((attr, value)) = descriptor.lazy_sources.first()
    {
        trace!(attr = attr.as_str(), "resolved lazy image source");
        tree.set_attr(id, "src", value);
        lazy = true;
    }

    if descriptor.srcset.is_none()
        && let Some(lazy_srcset) = &descriptor.lazy_srcset
    {
        tree.set_attr(id, "srcset", lazy_srcset);
    }

    let resolution = match tree.attr(id, "src").map(str::to_string) {
        Some(src) if !src.trim().is_empty() => {
            let (resolved, resolution) = resolve_reference(src.trim(), base);
            if resolution == Resolution::Resolved {
                tree.set_attr(id, "src", &resolved);
            }
            resolution
        }
        _ => Resolution::Missing,
    };

    for name in &descriptor.constraints {
        tree.remove_attr(id, name);
    }
    strip_lazy_classes(tree, id);

    if tree.attr(id, "alt").is_none_or(|alt| alt.trim().is_empty()) {
        tree.set_attr(id, "alt", "Image");
    }

    (resolution, lazy)
}

fn strip_lazy_classes(tree: &mut DomTree, id: NodeId) {
    let Some(class) = tree.attr(id, "class") else {
        return;
    };
    let kept = class.split_whitespace().filter(|t| !LAZY_CLASS_TOKENS.contains(t)).collect::<Vec<_>>().join(" ");
    if kept.is_empty() {
        tree.remove_attr(id, "class");
    } else {
        tree.set_attr(id, "class", &kept);
    }
}

/// Normalize every image below `root` (and `root` itself if it is an image)
pub fn normalize(tree: &mut DomTree, root: NodeId, base: Option<&Url>) -> NormalizeReport {
    let mut images = tree.descendants_by_tag(root, "img");
    if tree.has_tag(root, "img") {
        images.insert(0, root);
    }

    let mut report = NormalizeReport { images: images.len(), ..Default::default() };
    for id in images {
        let (resolution, lazy) = normalize_image(tree, id, base);
        if lazy {
            report.lazy_resolved += 1;
        }
        match resolution {
            Resolution::Resolved => report.absolutized += 1,
            Resolution::Unresolved => {
                if let Some(src) = tree.attr(id, "src") {
                    report.unresolved.push(src.to_string());
                }
            }
            _ => {}
        }
    }

    debug!(
        images = report.images,
        lazy = report.lazy_resolved,
        absolutized = report.absolutized,
        unresolved = report.unresolved.len(),
        "normalized images"
    );
    report
}
