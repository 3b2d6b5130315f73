//! Content scorer: candidate enumeration, selection, and fallback.
//!
//! [`select`] never fails. When no candidate is convincing it walks a fixed
//! fallback chain (`main`, `article`, `[role=main]`, `content`/`post`/`entry`
//! identifiers, the body, the root element) and reports which step won.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, trace};

use crate::dom_tree::{DomTree, NodeId};
use crate::parse::Document;
use crate::policy::{FilterPolicy, ScorePolicy};
use crate::scoring::{ScoreResult, WeightTable, calculate_score};

/// Tags that are considered potential content containers
const CANDIDATE_TAGS: &[&str] = &["div", "article", "section", "main"];

/// Identifier names tried by the fallback chain, in order
const FALLBACK_IDENTIFIERS: &[&str] = &["content", "post", "entry"];

/// A candidate element with its score
#[derive(Debug, Clone)]
pub struct Candidate {
    pub node: NodeId,
    /// The calculated score result
    pub score_result: ScoreResult,
}

impl Candidate {
    /// Get the final score of this candidate
    pub fn score(&self) -> i32 {
        self.score_result.final_score
    }

    /// Whitespace-separated words in the candidate's text
    pub fn word_count(&self) -> usize {
        self.score_result.metrics.word_count
    }
}

/// How the content root was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSource {
    /// Highest-scoring candidate
    Scored,
    /// First `<main>` element
    SemanticMain,
    /// First `<article>` element
    Article,
    /// First element with `role="main"`
    MainRole,
    /// First element whose class token or id equals the given name
    Identifier(String),
    Body,
    /// The `<html>` element (or the document node if even that is missing)
    Root,
}

impl SelectionSource {
    /// True when scoring did not decide and the fallback chain picked the root.
    pub fn is_fallback(&self) -> bool {
        !matches!(self, Self::Scored)
    }
}

impl fmt::Display for SelectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scored => write!(f, "scored"),
            Self::SemanticMain => write!(f, "main"),
            Self::Article => write!(f, "article"),
            Self::MainRole => write!(f, "role=main"),
            Self::Identifier(name) => write!(f, "identifier:{name}"),
            Self::Body => write!(f, "body"),
            Self::Root => write!(f, "root"),
        }
    }
}

impl Serialize for SelectionSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The chosen content root
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    #[serde(skip)]
    pub node: NodeId,
    pub source: SelectionSource,
    /// Score of the winning candidate, when scoring decided
    pub score: Option<i32>,
    pub candidates_considered: usize,
}

/// Score every candidate container below `root`, in document order
pub fn identify_candidates(tree: &DomTree, root: NodeId, policy: &ScorePolicy) -> Vec<Candidate> {
    tree.element_descendants(root)
        .into_iter()
        .filter(|&id| is_candidate(tree, id))
        .map(|id| {
            let score_result = calculate_score(tree, id, policy);
            trace!(
                tag = score_result.tag_name.as_str(),
                score = score_result.final_score,
                words = score_result.metrics.word_count,
                "candidate scored"
            );
            Candidate { node: id, score_result }
        })
        .collect()
}

fn is_candidate(tree: &DomTree, id: NodeId) -> bool {
    tree.tag_name(id).is_some_and(|t| CANDIDATE_TAGS.contains(&t)) || has_main_role(tree, id)
}

fn has_main_role(tree: &DomTree, id: NodeId) -> bool {
    tree.attr(id, "role").is_some_and(|r| r.eq_ignore_ascii_case("main"))
}

/// Select the top candidate from the list
///
/// Only candidates with more than `min_candidate_words` words are eligible.
/// Ties go to the first candidate in document order.
pub fn select_top_candidate<'a>(candidates: &'a [Candidate], weights: &WeightTable) -> Option<&'a Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates.iter().filter(|c| c.word_count() > weights.min_candidate_words) {
        if best.is_none_or(|b| candidate.score() > b.score()) {
            best = Some(candidate);
        }
    }
    best
}

/// Choose the main content container of a document
pub fn select(doc: &Document, policy: &ScorePolicy) -> Selection {
    select_in_tree(doc.tree(), policy)
}

/// Choose the main content container of a bare tree.
///
/// The top-scoring candidate wins when it reaches `min_winning_score`.
/// Otherwise the first `main`, `article`, `[role=main]`, and then an element
/// whose class token or id is `content`, `post` or `entry` is taken, falling
/// back to the body and finally the root element. Never fails.
pub fn select_in_tree(tree: &DomTree, policy: &ScorePolicy) -> Selection {
    let candidates = identify_candidates(tree, tree.root(), policy);
    let considered = candidates.len();

    if let Some(top) = select_top_candidate(&candidates, &policy.weights)
        && top.score() >= policy.weights.min_winning_score
    {
        debug!(score = top.score(), tag = top.score_result.tag_name.as_str(), considered, "selected top candidate");
        return Selection {
            node: top.node,
            source: SelectionSource::Scored,
            score: Some(top.score()),
            candidates_considered: considered,
        };
    }

    let (node, source) = fallback(tree);
    debug!(source = %source, considered, "no convincing candidate, using fallback");
    Selection { node, source, score: None, candidates_considered: considered }
}

fn fallback(tree: &DomTree) -> (NodeId, SelectionSource) {
    let root = tree.root();
    let first_tag = |tag: &str| tree.find_descendant(root, |t, id| t.has_tag(id, tag));

    if let Some(id) = first_tag("main") {
        return (id, SelectionSource::SemanticMain);
    }
    if let Some(id) = first_tag("article") {
        return (id, SelectionSource::Article);
    }
    if let Some(id) = tree.find_descendant(root, has_main_role) {
        return (id, SelectionSource::MainRole);
    }
    for name in FALLBACK_IDENTIFIERS {
        if let Some(id) = tree.find_descendant(root, |t, id| has_identifier(t, id, name)) {
            return (id, SelectionSource::Identifier((*name).to_string()));
        }
    }
    if let Some(id) = first_tag("body") {
        return (id, SelectionSource::Body);
    }
    (tree.root_element().unwrap_or(root), SelectionSource::Root)
}

fn has_identifier(tree: &DomTree, id: NodeId, name: &str) -> bool {
    tree.attr(id, "id") == Some(name) || tree.attr(id, "class").is_some_and(|c| c.split_whitespace().any(|t| t == name))
}

/// Remove leftover scripts, video embeds, and image-free boilerplate below the selection.
///
/// Returns the number of subtrees removed.
pub fn cleanup_selection(tree: &mut DomTree, root: NodeId, policy: &FilterPolicy) -> usize {
    let mut doomed: HashSet<NodeId> = HashSet::new();

    for id in tree.post_order(root) {
        if !tree.children(id).is_empty() {
            tree.retain_children(id, |_, child| !doomed.contains(&child));
        }
        if id == root || !tree.is_element(id) {
            continue;
        }

        let scripted = matches!(tree.tag_name(id), Some("script" | "style" | "noscript"));
        let boilerplate =
            policy.boilerplate_identifier(tree, id).is_some() && !tree.has_descendant_tag(id, "img");
        if scripted || boilerplate || policy.is_video_embed(tree, id) {
            doomed.insert(id);
        }
    }

    if !doomed.is_empty() {
        debug!(removed = doomed.len(), "cleaned selected content");
    }
    doomed.len()
}
