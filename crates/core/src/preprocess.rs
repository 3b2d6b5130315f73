//! Boilerplate filter.
//!
//! Removes non-content subtrees in a single post-order traversal. For each
//! element, structural rules (tag names, video embeds, empty asides, boilerplate
//! identifiers) run before lexical rules (own text, class, id, ad-network URLs).
//! A parent's child list is rebuilt only after every child has been decided,
//! so each element is judged on its already-filtered subtree and a second run
//! finds nothing left to remove.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::dom_tree::{DomTree, NodeId};
use crate::policy::FilterPolicy;

/// What the filter did to one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    /// Subtrees removed by tag, video, aside, or identifier rules
    pub removed_structural: usize,
    /// Subtrees removed by text, class/id keyword, or ad URL rules
    pub removed_lexical: usize,
    /// Identifier-matched elements reduced to their images
    pub demoted: usize,
}

impl FilterReport {
    pub fn total_removed(&self) -> usize {
        self.removed_structural + self.removed_lexical
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Keep,
    RemoveStructural(&'static str),
    RemoveLexical(&'static str),
    Demote,
}

/// Filter boilerplate from the whole tree in place
pub fn filter(tree: &mut DomTree, policy: &FilterPolicy) -> FilterReport {
    let root = tree.root();
    filter_subtree(tree, root, policy)
}

/// Filter boilerplate below `root` in place. `root` itself is never removed.
pub fn filter_subtree(tree: &mut DomTree, root: NodeId, policy: &FilterPolicy) -> FilterReport {
    let mut report = FilterReport::default();
    let mut doomed: HashSet<NodeId> = HashSet::new();

    for id in tree.post_order(root) {
        if !tree.children(id).is_empty() {
            tree.retain_children(id, |_, child| !doomed.contains(&child));
        }

        if id == root || !tree.is_element(id) {
            continue;
        }

        match judge(tree, id, policy) {
            Verdict::Keep => {}
            Verdict::RemoveStructural(rule) => {
                trace!(tag = tree.tag_name(id).unwrap_or_default(), rule, "removed subtree");
                doomed.insert(id);
                report.removed_structural += 1;
            }
            Verdict::RemoveLexical(rule) => {
                trace!(tag = tree.tag_name(id).unwrap_or_default(), rule, "removed subtree");
                doomed.insert(id);
                report.removed_lexical += 1;
            }
            Verdict::Demote => {
                trace!(tag = tree.tag_name(id).unwrap_or_default(), "demoted image-bearing boilerplate");
                demote(tree, id);
                report.demoted += 1;
            }
        }
    }

    debug!(
        structural = report.removed_structural,
        lexical = report.removed_lexical,
        demoted = report.demoted,
        "boilerplate filter finished"
    );
    report
}

fn judge(tree: &DomTree, id: NodeId, policy: &FilterPolicy) -> Verdict {
    let Some(tag) = tree.tag_name(id) else {
        return Verdict::Keep;
    };
    if policy.is_protected(tag) {
        return Verdict::Keep;
    }

    if policy.is_removed_tag(tag) {
        return Verdict::RemoveStructural("tag");
    }
    if policy.is_video_embed(tree, id) {
        return Verdict::RemoveStructural("video");
    }
    if policy.is_empty_aside(tree, id) {
        return Verdict::RemoveStructural("aside");
    }

    let has_image = tree.has_descendant_tag(id, "img");
    if policy.boilerplate_identifier(tree, id).is_some() {
        return if has_image { Verdict::Demote } else { Verdict::RemoveStructural("identifier") };
    }

    if has_image {
        return Verdict::Keep;
    }
    lexical_verdict(tree, id, policy)
}

fn lexical_verdict(tree: &DomTree, id: NodeId, policy: &FilterPolicy) -> Verdict {
    if policy.lexical_keywords.matches_substring(&tree.own_text(id)) {
        return Verdict::RemoveLexical("text");
    }
    for attr in ["class", "id"] {
        if tree.attr(id, attr).is_some_and(|v| policy.lexical_keywords.matches_substring(v)) {
            return Verdict::RemoveLexical("identifier");
        }
    }
    for attr in ["src", "href"] {
        if tree.attr(id, attr).is_some_and(|v| policy.ad_url_pattern.is_match(v)) {
            return Verdict::RemoveLexical("ad-url");
        }
    }
    Verdict::Keep
}

/// Strip everything except images and the wrappers that lead to them.
fn demote(tree: &mut DomTree, id: NodeId) {
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        tree.retain_children(current, |t, child| t.has_tag(child, "img") || t.has_descendant_tag(child, "img"));
        stack.extend(tree.children(current).iter().copied().filter(|&c| !tree.has_tag(c, "img")));
    }
}

/// Parse, filter, and serialize in one step
pub fn preprocess_html(html: &str, policy: &FilterPolicy) -> String {
    let mut tree = DomTree::from_html(html);
    filter(&mut tree, policy);
    tree.outer_html(tree.root())
}
