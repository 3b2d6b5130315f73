//! Rule tables shared by the boilerplate filter and the content scorer.
//!
//! Every keyword list, tag set, and weight lives in an [`ExtractionPolicy`]
//! value so the filter and scorer run the same code against different tables.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom_tree::{DomTree, NodeId};
use crate::scoring::WeightTable;

/// Case-insensitive keyword list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    /// Build a set from any string-like keywords, lowercased.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { keywords: keywords.into_iter().map(|k| k.as_ref().to_ascii_lowercase()).collect() }
    }

    /// Keywords in the order they were given, lowercased.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// First keyword occurring anywhere in `value`.
    pub fn find_substring(&self, value: &str) -> Option<&str> {
        if value.is_empty() {
            return None;
        }
        let lower = value.to_lowercase();
        self.iter().find(|k| lower.contains(k))
    }

    pub fn matches_substring(&self, value: &str) -> bool {
        self.find_substring(value).is_some()
    }

    /// First keyword equal to an identifier segment of `value`.
    ///
    /// `value` is split on every non-alphanumeric character, so `ad` matches
    /// `ad-slot` and `top_ad` but not `header` or `shadow`.
    pub fn find_segment(&self, value: &str) -> Option<&str> {
        if value.is_empty() {
            return None;
        }
        let lower = value.to_lowercase();
        let segments: Vec<&str> = lower.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).collect();
        self.iter().find(|k| segments.contains(k))
    }

    pub fn matches_segment(&self, value: &str) -> bool {
        self.find_segment(value).is_some()
    }
}

/// Rules for the boilerplate filter.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    /// Subtrees rooted at these tags are removed outright
    pub removed_tags: Vec<String>,
    /// Hosts that mark an iframe/object as an embedded video
    pub video_hosts: KeywordSet,
    /// Class/id substrings that mark an element as boilerplate
    pub boilerplate_identifiers: KeywordSet,
    /// Short class/id keywords that only count as a whole segment (`ad` must not hit `header`)
    pub segment_identifiers: KeywordSet,
    /// Substrings checked against own text, class and id
    pub lexical_keywords: KeywordSet,
    /// Ad-network markers in `src`/`href`
    pub ad_url_pattern: Regex,
    /// An aside survives only when it contains one of these
    pub aside_content_tags: Vec<String>,
    /// Never removed
    pub protected_tags: Vec<String>,
}

/// Delimited `ads` URL segment plus known ad networks.
#[allow(clippy::expect_used)]
static AD_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[/._\-?=&])ads(?:$|[/._\-?=&])|doubleclick|googlesyndication|sponsor")
        .expect("AD_URL regex")
});

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            removed_tags: to_strings(&["script", "style", "noscript", "video", "nav", "header", "footer"]),
            video_hosts: KeywordSet::new(["youtube", "vimeo", "dailymotion", "twitch", "tiktok"]),
            boilerplate_identifiers: KeywordSet::new([
                "advert",
                "advertisement",
                "advertising",
                "banner",
                "promo",
                "promotion",
                "sponsor",
                "sponsored",
                "popup",
                "modal",
                "newsletter",
                "social-share",
            ]),
            segment_identifiers: KeywordSet::new(["ad", "ads"]),
            lexical_keywords: KeywordSet::new([
                "advertisement",
                "sponsored",
                "promo",
                "banner",
                "popup",
                "subscribe",
                "newsletter",
            ]),
            ad_url_pattern: AD_URL.clone(),
            aside_content_tags: to_strings(&["article", "p", "img"]),
            protected_tags: to_strings(&["html", "head", "body"]),
        }
    }
}

impl FilterPolicy {
    /// `html`, `head` and `body` survive every rule.
    pub fn is_protected(&self, tag: &str) -> bool {
        self.protected_tags.iter().any(|t| t == tag)
    }

    /// Tags whose whole subtree is dropped (script, nav, footer and so on).
    pub fn is_removed_tag(&self, tag: &str) -> bool {
        self.removed_tags.iter().any(|t| t == tag)
    }

    /// iframe/object pointing at a video host, or embed/object declaring a video type.
    pub fn is_video_embed(&self, tree: &DomTree, id: NodeId) -> bool {
        match tree.tag_name(id) {
            Some("iframe") => tree.attr(id, "src").is_some_and(|src| self.video_hosts.matches_substring(src)),
            Some("object") => {
                let data = tree.attr(id, "data").is_some_and(|d| self.video_hosts.matches_substring(d));
                data || declares_video(tree, id)
            }
            Some("embed") => declares_video(tree, id),
            _ => false,
        }
    }

    /// The boilerplate keyword carried by the element's class or id, if any.
    ///
    /// Most keywords match anywhere in the value (`sponsorship`, `topbanner`);
    /// the short ones in `segment_identifiers` must stand as a whole segment.
    pub fn boilerplate_identifier<'a>(&'a self, tree: &DomTree, id: NodeId) -> Option<&'a str> {
        ["class", "id"].into_iter().filter_map(|attr| tree.attr(id, attr)).find_map(|value| {
            self.boilerplate_identifiers.find_substring(value).or_else(|| self.segment_identifiers.find_segment(value))
        })
    }

    /// An `aside` holding no article, paragraph or image.
    pub fn is_empty_aside(&self, tree: &DomTree, id: NodeId) -> bool {
        tree.has_tag(id, "aside") && !self.aside_content_tags.iter().any(|t| tree.has_descendant_tag(id, t))
    }
}

fn declares_video(tree: &DomTree, id: NodeId) -> bool {
    tree.attr(id, "type").is_some_and(|t| t.to_ascii_lowercase().contains("video"))
}

/// Identifier lists and weights for the content scorer.
#[derive(Debug, Clone)]
pub struct ScorePolicy {
    pub weights: WeightTable,
    /// Strong content identifiers
    pub positive: KeywordSet,
    /// Weaker content identifiers
    pub secondary: KeywordSet,
    /// Boilerplate identifiers
    pub negative: KeywordSet,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            positive: KeywordSet::new(["content", "article", "post", "story", "main", "entry", "blog"]),
            secondary: KeywordSet::new(["body", "text", "copy"]),
            negative: KeywordSet::new([
                "comment", "sidebar", "widget", "footer", "header", "nav", "menu", "ad", "banner", "promo", "sponsor",
            ]),
        }
    }
}

/// Filter and scorer rules for one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct ExtractionPolicy {
    pub filter: FilterPolicy,
    pub score: ScorePolicy,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom_tree::build_dom_tree;
    use rstest::rstest;

    #[rstest]
    #[case("ad", true)]
    #[case("ad-slot", true)]
    #[case("top_ad", true)]
    #[case("AD", true)]
    #[case("header", false)]
    #[case("shadow", false)]
    #[case("downloads", false)]
    fn test_short_identifiers_match_whole_segments(#[case] value: &str, #[case] expected: bool) {
        let policy = FilterPolicy::default();
        assert_eq!(policy.segment_identifiers.matches_segment(value), expected, "{value}");
    }

    #[rstest]
    #[case(r#"<div class="sponsorship">x</div>"#, Some("sponsor"))]
    #[case(r#"<div class="promobox">x</div>"#, Some("promo"))]
    #[case(r#"<div class="topbanner">x</div>"#, Some("banner"))]
    #[case(r#"<div id="newsletter-box">x</div>"#, Some("newsletter"))]
    #[case(r#"<div class="post social-share">x</div>"#, Some("social-share"))]
    #[case(r#"<div class="ModalWindow">x</div>"#, Some("modal"))]
    #[case(r#"<div class="ad-slot">x</div>"#, Some("ad"))]
    #[case(r#"<div class="page-header">x</div>"#, None)]
    #[case(r#"<div class="story-body">x</div>"#, None)]
    fn test_boilerplate_identifier(#[case] html: &str, #[case] expected: Option<&str>) {
        let tree = build_dom_tree(html);
        let div = tree.descendants_by_tag(tree.root(), "div")[0];
        assert_eq!(FilterPolicy::default().boilerplate_identifier(&tree, div), expected, "{html}");
    }

    #[test]
    fn test_substring_matching_is_case_insensitive() {
        let set = KeywordSet::new(["Promo"]);
        assert!(set.matches_substring("BIG-PROMOTION"));
        assert!(!set.matches_substring(""));
    }

    #[rstest]
    #[case("https://example.com/ads/banner.js", true)]
    #[case("https://ads.example.com/x.png", true)]
    #[case("https://stats.g.doubleclick.net/r", true)]
    #[case("https://pagead2.googlesyndication.com/a.js", true)]
    #[case("https://example.com/uploads/photo.jpg", false)]
    #[case("https://example.com/roads.html", false)]
    fn test_ad_url_pattern(#[case] url: &str, #[case] expected: bool) {
        let policy = FilterPolicy::default();
        assert_eq!(policy.ad_url_pattern.is_match(url), expected, "{url}");
    }

    #[test]
    fn test_video_embed_detection() {
        let tree = build_dom_tree(
            r#"<iframe src="https://www.youtube.com/embed/x"></iframe>
               <iframe src="https://maps.example.com"></iframe>
               <embed type="video/mp4" src="a.mp4">"#,
        );
        let policy = FilterPolicy::default();
        let iframes = tree.descendants_by_tag(tree.root(), "iframe");
        assert!(policy.is_video_embed(&tree, iframes[0]));
        assert!(!policy.is_video_embed(&tree, iframes[1]));
        let embed = tree.descendants_by_tag(tree.root(), "embed")[0];
        assert!(policy.is_video_embed(&tree, embed));
    }

    #[test]
    fn test_empty_aside() {
        let tree = build_dom_tree("<aside>links only</aside><aside><p>real</p></aside>");
        let policy = FilterPolicy::default();
        let asides = tree.descendants_by_tag(tree.root(), "aside");
        assert!(policy.is_empty_aside(&tree, asides[0]));
        assert!(!policy.is_empty_aside(&tree, asides[1]));
    }
}
