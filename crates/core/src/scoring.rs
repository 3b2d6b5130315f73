//! Content-likelihood scoring for candidate containers.
//!
//! A candidate's score is the sum of capped content signals (words, commas,
//! periods), structural bonuses (paragraphs, headings, images, quotes, lists),
//! and class/id adjustments, minus link-heavy and short-content penalties.
//! All constants live in [`WeightTable`].

use serde::Serialize;

use crate::dom_tree::{DomTree, NodeId};
use crate::policy::ScorePolicy;

/// Fixed weights and thresholds for content scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeightTable {
    /// Words per point of word score
    pub words_per_point: usize,
    pub max_word_points: i32,
    /// Points per comma
    pub comma_weight: i32,
    pub max_comma_points: i32,
    /// Points per period
    pub period_weight: i32,
    pub max_period_points: i32,
    /// Points per descendant paragraph
    pub per_paragraph: i32,
    /// Bonus when at least one paragraph is present
    pub has_paragraph: i32,
    /// Bonus when the paragraph count exceeds `many_paragraphs_threshold`
    pub many_paragraphs: i32,
    pub many_paragraphs_threshold: usize,
    /// Bonus for an h1–h3 descendant
    pub heading: i32,
    /// Bonus when at least one image is present
    pub has_image: i32,
    /// Points per image, applied only when there is more than one
    pub per_image: i32,
    pub blockquote: i32,
    pub list: i32,
    /// Applied once for the class and once for the id
    pub positive_identifier: i32,
    pub secondary_identifier: i32,
    pub negative_identifier: i32,
    /// Applied when links exceed `link_ratio` times the paragraph count
    pub link_heavy_penalty: i32,
    pub link_ratio: usize,
    /// Applied when the word count is below `short_content_words`
    pub short_content_penalty: i32,
    pub short_content_words: usize,
    /// A winning candidate needs strictly more words than this
    pub min_candidate_words: usize,
    /// Below this score the fallback chain takes over
    pub min_winning_score: i32,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            words_per_point: 50,
            max_word_points: 10,
            comma_weight: 2,
            max_comma_points: 10,
            period_weight: 2,
            max_period_points: 10,
            per_paragraph: 5,
            has_paragraph: 10,
            many_paragraphs: 15,
            many_paragraphs_threshold: 2,
            heading: 5,
            has_image: 10,
            per_image: 5,
            blockquote: 5,
            list: 3,
            positive_identifier: 25,
            secondary_identifier: 15,
            negative_identifier: -20,
            link_heavy_penalty: -10,
            link_ratio: 2,
            short_content_penalty: -10,
            short_content_words: 50,
            min_candidate_words: 20,
            min_winning_score: 10,
        }
    }
}

/// Raw measurements taken from a candidate subtree
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentMetrics {
    /// Whitespace-separated tokens in the text content
    pub word_count: usize,
    pub paragraph_count: usize,
    pub image_count: usize,
    pub comma_count: usize,
    pub period_count: usize,
    pub link_count: usize,
    /// Link text characters over text characters (0.0 to 1.0)
    pub link_density: f64,
    pub has_heading: bool,
    pub has_blockquote: bool,
    pub has_list: bool,
}

/// Result of scoring an element
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// The element's tag name
    pub tag_name: String,
    /// The element's class attribute (if present)
    pub class: Option<String>,
    /// The element's id attribute (if present)
    pub id: Option<String>,
    pub metrics: ContentMetrics,
    /// Points from content signals and structure
    pub content_score: i32,
    /// Net class/id adjustment
    pub identifier_weight: i32,
    /// Link-heavy and short-content penalties (zero or negative)
    pub penalties: i32,
    /// Final calculated score
    pub final_score: i32,
}

/// Measure the content signals of an element
pub fn measure(tree: &DomTree, id: NodeId) -> ContentMetrics {
    let text = tree.text_content(id);
    let descendants = tree.element_descendants(id);
    let count_tag = |tag: &str| descendants.iter().filter(|&&d| tree.has_tag(d, tag)).count();
    let has_any = |tags: &[&str]| descendants.iter().any(|&d| tags.iter().any(|t| tree.has_tag(d, t)));

    ContentMetrics {
        word_count: text.split_whitespace().count(),
        paragraph_count: count_tag("p"),
        image_count: count_tag("img"),
        comma_count: text.matches(',').count(),
        period_count: text.matches('.').count(),
        link_count: count_tag("a"),
        link_density: link_density(tree, id),
        has_heading: has_any(&["h1", "h2", "h3"]),
        has_blockquote: has_any(&["blockquote"]),
        has_list: has_any(&["ul", "ol"]),
    }
}

/// Calculate the link density of an element
///
/// Link density is the ratio of link text characters to total text characters.
/// Returns a value from 0.0 (no links) to 1.0 (all text is in links).
pub fn link_density(tree: &DomTree, id: NodeId) -> f64 {
    let text_length = tree.text_content(id).chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = tree
        .descendants_by_tag(id, "a")
        .into_iter()
        .filter(|&a| !tree.parent(a).is_some_and(|p| inside_link(tree, p, id)))
        .map(|a| tree.text_content(a).chars().count())
        .sum::<usize>();

    (link_text_length as f64 / text_length as f64).min(1.0)
}

fn inside_link(tree: &DomTree, mut node: NodeId, stop: NodeId) -> bool {
    loop {
        if tree.has_tag(node, "a") {
            return true;
        }
        if node == stop {
            return false;
        }
        match tree.parent(node) {
            Some(parent) => node = parent,
            None => return false,
        }
    }
}

/// Points earned from content signals and structure
pub fn content_score(metrics: &ContentMetrics, weights: &WeightTable) -> i32 {
    let capped = |count: usize, weight: i32, cap: i32| (count as i32).saturating_mul(weight).min(cap);

    let mut score = ((metrics.word_count / weights.words_per_point.max(1)) as i32).min(weights.max_word_points);
    score += capped(metrics.comma_count, weights.comma_weight, weights.max_comma_points);
    score += capped(metrics.period_count, weights.period_weight, weights.max_period_points);
    score += (metrics.paragraph_count as i32).saturating_mul(weights.per_paragraph);

    if metrics.paragraph_count > 0 {
        score += weights.has_paragraph;
    }
    if metrics.paragraph_count > weights.many_paragraphs_threshold {
        score += weights.many_paragraphs;
    }
    if metrics.has_heading {
        score += weights.heading;
    }
    if metrics.image_count > 0 {
        score += weights.has_image;
    }
    if metrics.image_count > 1 {
        score += (metrics.image_count as i32).saturating_mul(weights.per_image);
    }
    if metrics.has_blockquote {
        score += weights.blockquote;
    }
    if metrics.has_list {
        score += weights.list;
    }
    score
}

/// Net class/id adjustment
///
/// Class and id are evaluated independently: each earns the positive bonus,
/// the secondary bonus, and the negative penalty for every list it matches
/// (case-insensitive substring).
pub fn identifier_weight(tree: &DomTree, id: NodeId, policy: &ScorePolicy) -> i32 {
    let weights = &policy.weights;
    ["class", "id"]
        .into_iter()
        .filter_map(|attr| tree.attr(id, attr))
        .map(|value| {
            let mut weight = 0;
            if policy.positive.matches_substring(value) {
                weight += weights.positive_identifier;
            }
            if policy.secondary.matches_substring(value) {
                weight += weights.secondary_identifier;
            }
            if policy.negative.matches_substring(value) {
                weight += weights.negative_identifier;
            }
            weight
        })
        .sum()
}

fn penalties(metrics: &ContentMetrics, weights: &WeightTable) -> i32 {
    let mut penalty = 0;
    if metrics.link_count > metrics.paragraph_count.saturating_mul(weights.link_ratio) {
        penalty += weights.link_heavy_penalty;
    }
    if metrics.word_count < weights.short_content_words {
        penalty += weights.short_content_penalty;
    }
    penalty
}

/// Calculate the final score for an element
pub fn calculate_score(tree: &DomTree, id: NodeId, policy: &ScorePolicy) -> ScoreResult {
    let metrics = measure(tree, id);
    let content = content_score(&metrics, &policy.weights);
    let identifiers = identifier_weight(tree, id, policy);
    let penalty = penalties(&metrics, &policy.weights);

    ScoreResult {
        tag_name: tree.tag_name(id).unwrap_or_default().to_string(),
        class: tree.attr(id, "class").map(str::to_string),
        id: tree.attr(id, "id").map(str::to_string),
        metrics,
        content_score: content,
        identifier_weight: identifiers,
        penalties: penalty,
        final_score: content + identifiers + penalty,
    }
}
