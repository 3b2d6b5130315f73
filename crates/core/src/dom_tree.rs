//! Arena-backed mutable document tree.
//!
//! Parsing is delegated to `scraper` (html5ever). The parsed tree is copied
//! into a [`DomTree`], an arena of [`DomNode`]s addressed by [`NodeId`]. Parent
//! links are plain indices, so removing a subtree only rewrites the parent's
//! child list; detached nodes stay in the arena but are unreachable from the
//! root.

use scraper::{ElementRef, Html, Node};

/// Index of a node inside a [`DomTree`].
pub type NodeId = usize;

/// Elements that never carry children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "xmp", "iframe", "noembed", "noframes"];

/// Tag name and ordered attributes of an element node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag_name: String,
    /// Attributes in source order
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self { tag_name: tag_name.to_ascii_lowercase(), attrs: Vec::new() }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(pos).1)
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    /// The synthetic document root
    Document,
    Element(ElementData),
    Text(String),
}

/// A node in the DOM tree
#[derive(Debug, Clone)]
pub struct DomNode {
    pub data: NodeData,
    /// Parent node ID (if any)
    pub parent_id: Option<NodeId>,
    /// Child node IDs in document order
    pub child_ids: Vec<NodeId>,
}

impl DomNode {
    pub fn element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// A DOM tree structure that tracks parent-child relationships
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<DomNode>,
}

impl DomTree {
    /// Create a tree holding only the document root
    pub fn new() -> Self {
        Self { nodes: vec![DomNode { data: NodeData::Document, parent_id: None, child_ids: Vec::new() }] }
    }

    /// Parse markup with html5ever and copy the result into a new arena.
    ///
    /// Comments, doctypes and processing instructions are dropped.
    pub fn from_html(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut tree = Self::new();
        let root = tree.root();

        let html_root = parsed.root_element();
        let html_id = tree.append_element(root, element_data(&html_root));
        let mut stack: Vec<(ElementRef<'_>, NodeId)> = vec![(html_root, html_id)];

        while let Some((element, parent)) = stack.pop() {
            for child in element.children() {
                match child.value() {
                    Node::Element(_) => {
                        if let Some(child_el) = ElementRef::wrap(child) {
                            let id = tree.append_element(parent, element_data(&child_el));
                            stack.push((child_el, id));
                        }
                    }
                    Node::Text(text) => {
                        tree.append_text(parent, &text.text);
                    }
                    _ => {}
                }
            }
        }

        tree
    }

    /// The document root (always `0`)
    pub fn root(&self) -> NodeId {
        0
    }

    /// The `<html>` element, if any
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root()).iter().copied().find(|&id| self.is_element(id))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(DomNode { data, parent_id: None, child_ids: Vec::new() });
        id
    }

    /// Create an unattached element
    pub fn create_element(&mut self, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut data = ElementData::new(tag_name);
        for (name, value) in attrs {
            data.set_attr(name, value);
        }
        self.push(NodeData::Element(data))
    }

    /// Append a new element as the last child of `parent`
    pub fn append_element(&mut self, parent: NodeId, data: ElementData) -> NodeId {
        let id = self.push(NodeData::Element(data));
        self.append_child(parent, id);
        id
    }

    /// Append a new text node as the last child of `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.push(NodeData::Text(text.to_string()));
        self.append_child(parent, id);
        id
    }

    /// Attach a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent_id = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.child_ids.push(child);
        }
    }

    /// Insert `new_node` directly after `reference` in its parent's child list.
    ///
    /// Does nothing when `reference` has no parent.
    pub fn insert_after(&mut self, reference: NodeId, new_node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(new_node);
        let Some(pos) = self.children(parent).iter().position(|&c| c == reference) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.child_ids.insert(pos + 1, new_node);
        }
        if let Some(node) = self.nodes.get_mut(new_node) {
            node.parent_id = Some(parent);
        }
    }

    /// Unlink a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(parent) {
            node.child_ids.retain(|&c| c != id);
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = None;
        }
    }

    /// Rebuild the child list of `id`, keeping only children for which `keep` is true.
    ///
    /// Dropped children are detached in one step, so callers never mutate a
    /// list they are iterating.
    pub fn retain_children<F>(&mut self, id: NodeId, mut keep: F)
    where
        F: FnMut(&DomTree, NodeId) -> bool,
    {
        let children = self.children(id).to_vec();
        let (kept, dropped): (Vec<NodeId>, Vec<NodeId>) = children.into_iter().partition(|&c| keep(self, c));
        for child in dropped {
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent_id = None;
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.child_ids = kept;
        }
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&DomNode> {
        self.nodes.get(id)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id).and_then(DomNode::element)
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id).map(|n| &mut n.data) {
            Some(NodeData::Element(el)) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id).map(|n| &n.data), Some(NodeData::Text(_)))
    }

    /// Lowercase tag name of an element node
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag_name.as_str())
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent_id)
    }

    /// Children of a node in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.child_ids.as_slice()).unwrap_or(&[])
    }

    /// True when the node is still reachable from the document root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All descendants of `id` in document (pre-)order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Element descendants of `id` in document order
    pub fn element_descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id).into_iter().filter(|&d| self.is_element(d)).collect()
    }

    /// Element descendants of `id` with the given tag, in document order
    pub fn descendants_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id).into_iter().filter(|&d| self.has_tag(d, tag)).collect()
    }

    /// First element descendant (document order) matching `pred`
    pub fn find_descendant<F>(&self, id: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&DomTree, NodeId) -> bool,
    {
        self.descendants(id).into_iter().find(|&d| self.is_element(d) && pred(self, d))
    }

    pub fn has_descendant_tag(&self, id: NodeId, tag: &str) -> bool {
        self.find_descendant(id, |t, d| t.has_tag(d, tag)).is_some()
    }

    /// `id` followed by its descendants in post-order (children before parents)
    pub fn post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, visited)) = stack.pop() {
            if visited {
                out.push(current);
                continue;
            }
            stack.push((current, true));
            for &child in self.children(current).iter().rev() {
                stack.push((child, false));
            }
        }
        out
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        if let Some(NodeData::Text(t)) = self.nodes.get(id).map(|n| &n.data) {
            text.push_str(t);
        }
        for d in self.descendants(id) {
            if let Some(NodeData::Text(t)) = self.nodes.get(d).map(|n| &n.data) {
                text.push_str(t);
            }
        }
        text
    }

    /// Text of the node's direct text children only
    pub fn own_text(&self, id: NodeId) -> String {
        self.children(id)
            .iter()
            .filter_map(|&c| match self.nodes.get(c).map(|n| &n.data) {
                Some(NodeData::Text(t)) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Serialize the children of `id`
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag_name(id).is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
        for &child in self.children(id) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    /// Serialize `id` including its own tags
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Document => {
                out.push_str("<!DOCTYPE html>");
                for &child in &node.child_ids {
                    self.write_node(child, false, out);
                }
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_into(text, false, out);
                }
            }
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag_name);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.tag_name.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&el.tag_name.as_str());
                for &child in &node.child_ids {
                    self.write_node(child, raw, out);
                }
                out.push_str("</");
                out.push_str(&el.tag_name);
                out.push('>');
            }
        }
    }

    /// Total number of nodes ever allocated, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

fn element_data(element: &ElementRef<'_>) -> ElementData {
    let value = element.value();
    let mut data = ElementData::new(value.name());
    for (name, attr_value) in value.attrs() {
        data.attrs.push((name.to_string(), attr_value.to_string()));
    }
    data
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Build a DOM tree from raw markup
pub fn build_dom_tree(html: &str) -> DomTree {
    DomTree::from_html(html)
}
