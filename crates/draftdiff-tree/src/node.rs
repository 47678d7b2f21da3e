/*
 * node.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Arena-backed diff tree.
 *
 * Each input document becomes one DiffTree owning all of its nodes in a
 * flat arena. Parent links, child lists, and the cross-tree match links
 * set during reconciliation are all NodeId indices, never references:
 * the match graph between the two trees is not itself a tree, and
 * indices keep ownership obvious and cloning safe.
 */

use hashlink::LinkedHashMap;
use serde::Serialize;
use std::fmt;

/// Index of a node within its owning [`DiffTree`].
///
/// A NodeId is only meaningful together with the tree it came from.
/// Match links stored on a node index into the *other* document's tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    /// The arena slot of this node. Creation order, so also a stable
    /// debugging identity and tie-breaker.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Element payload: tag plus attributes in document order.
///
/// Attribute order is preserved for rendering; comparison is key-wise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: LinkedHashMap<String, String>,
}

impl ElementData {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: LinkedHashMap::new(),
        }
    }

    /// Key-wise attribute equality, ignoring insertion order.
    pub fn same_attributes(&self, other: &ElementData) -> bool {
        self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .all(|(k, v)| other.attributes.get(k) == Some(v))
    }
}

/// The typed content of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Synthetic root; one per input tree. Holds flanking PIs plus the
    /// root element.
    Document,

    /// An XML element.
    Element(ElementData),

    /// An opaque text fragment.
    Text(String),

    /// A comment body.
    Comment(String),

    /// A processing instruction.
    ProcessingInstruction { target: String, body: String },

    /// Synthetic wrapper around a run of inline content, so prose is
    /// compared a whole paragraph at a time. Opaque to the solver.
    Paragraph,
}

impl NodeKind {
    /// Short kind name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element(_) => "element",
            NodeKind::Text(_) => "text",
            NodeKind::Comment(_) => "comment",
            NodeKind::ProcessingInstruction { .. } => "pi",
            NodeKind::Paragraph => "paragraph",
        }
    }

    /// Whether two kinds are the same variant.
    pub fn same_variant(&self, other: &NodeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Synthetic nodes are introduced by the tool, not the document.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Paragraph)
    }
}

/// One node of a [`DiffTree`].
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,

    /// Non-owning back reference; `None` only for the document root.
    pub parent: Option<NodeId>,

    /// Owned children, in document order.
    pub children: Vec<NodeId>,

    /// 1-based source line this node came from (0 for synthetic nodes).
    pub line: usize,

    /// Inherited whitespace-preservation flag.
    pub preserve_space: bool,

    /// Counterpart in the other tree, set by reconciliation.
    pub matched: Option<NodeId>,

    /// Present only on the left side after reconciliation.
    pub deleted: bool,

    /// Present only on the right side; set on clones spliced into the
    /// left tree during reconciliation.
    pub inserted: bool,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>, line: usize, preserve_space: bool) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            line,
            preserve_space,
            matched: None,
            deleted: false,
            inserted: false,
        }
    }

    /// Nodes the solver must not descend into: their content is compared
    /// as a single unit.
    pub fn is_opaque(&self) -> bool {
        matches!(self.kind, NodeKind::Paragraph)
    }

    /// The element tag, if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(data) => Some(data.tag.as_str()),
            _ => None,
        }
    }
}

/// An arena-owned ordered tree for one input document.
#[derive(Debug, Clone)]
pub struct DiffTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DiffTree {
    /// Create a tree containing only a Document root.
    pub fn new() -> Self {
        let root = Node::new(NodeKind::Document, None, 0, false);
        Self {
            nodes: vec![root],
            root: NodeId::new(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Allocate a node and append it to `parent`'s child list.
    pub fn push_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        line: usize,
        preserve_space: bool,
    ) -> NodeId {
        let id = self.push_detached(kind, line, preserve_space);
        self.nodes[id.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Allocate a node without linking it to a parent yet.
    pub fn push_detached(&mut self, kind: NodeKind, line: usize, preserve_space: bool) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::new(kind, None, line, preserve_space));
        id
    }

    /// Splice `child` into `parent`'s child list at `index`.
    pub fn insert_child_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Append `child` at the end of `parent`'s child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Position of `child` within `parent`'s child list.
    pub fn child_position(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.node(parent).children.iter().position(|&c| c == child)
    }

    /// Unlink `child` from its parent's child list. The node stays in
    /// the arena; re-attach it with [`DiffTree::append_child`] or
    /// [`DiffTree::insert_child_at`].
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.index()].parent {
            self.nodes[parent.index()].children.retain(|&c| c != child);
            self.nodes[child.index()].parent = None;
        }
    }

    /// All node ids under `id` (inclusive) in document order.
    ///
    /// Uses an explicit work stack; document trees can be deep enough
    /// that recursion is not safe here.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            for &child in self.node(current).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// True if `ancestor` is `node` or an ancestor of it.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.node(id).parent;
        }
        false
    }

    /// Concatenated text of all Text descendants, in document order.
    ///
    /// This is the flattened form paragraph comparison operates on.
    pub fn flatten_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            if let NodeKind::Text(content) = &node.kind {
                out.push_str(content);
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

impl Default for DiffTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> NodeKind {
        NodeKind::Text(s.to_string())
    }

    #[test]
    fn test_push_child_links_both_ways() {
        let mut tree = DiffTree::new();
        let e = tree.push_child(tree.root(), NodeKind::Element(ElementData::new("t")), 1, false);
        let t = tree.push_child(e, text("hello"), 1, false);

        assert_eq!(tree.node(e).parent, Some(tree.root()));
        assert_eq!(tree.node(e).children, vec![t]);
        assert_eq!(tree.node(t).parent, Some(e));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let mut tree = DiffTree::new();
        let a = tree.push_child(tree.root(), NodeKind::Element(ElementData::new("a")), 1, false);
        let b = tree.push_child(a, NodeKind::Element(ElementData::new("b")), 1, false);
        let c = tree.push_child(b, text("x"), 1, false);
        let d = tree.push_child(a, NodeKind::Element(ElementData::new("d")), 2, false);

        assert_eq!(tree.descendants(tree.root()), vec![tree.root(), a, b, c, d]);
    }

    #[test]
    fn test_flatten_text_skips_structure() {
        let mut tree = DiffTree::new();
        let t = tree.push_child(tree.root(), NodeKind::Element(ElementData::new("t")), 1, false);
        tree.push_child(t, text("one "), 1, false);
        let em = tree.push_child(t, NodeKind::Element(ElementData::new("em")), 1, false);
        tree.push_child(em, text("two"), 1, false);
        tree.push_child(t, text(" three"), 1, false);

        assert_eq!(tree.flatten_text(t), "one two three");
    }

    #[test]
    fn test_is_ancestor() {
        let mut tree = DiffTree::new();
        let a = tree.push_child(tree.root(), NodeKind::Element(ElementData::new("a")), 1, false);
        let b = tree.push_child(a, NodeKind::Element(ElementData::new("b")), 1, false);

        assert!(tree.is_ancestor(tree.root(), b));
        assert!(tree.is_ancestor(a, b));
        assert!(tree.is_ancestor(b, b));
        assert!(!tree.is_ancestor(b, a));
    }

    #[test]
    fn test_insert_child_at() {
        let mut tree = DiffTree::new();
        let p = tree.push_child(tree.root(), NodeKind::Element(ElementData::new("p")), 1, false);
        let a = tree.push_child(p, text("a"), 1, false);
        let c = tree.push_child(p, text("c"), 1, false);
        let b = tree.push_detached(text("b"), 1, false);
        tree.insert_child_at(p, 1, b);

        assert_eq!(tree.node(p).children, vec![a, b, c]);
        assert_eq!(tree.node(b).parent, Some(p));
    }

    #[test]
    fn test_same_attributes_ignores_order() {
        let mut left = ElementData::new("e");
        left.attributes.insert("a".to_string(), "1".to_string());
        left.attributes.insert("b".to_string(), "2".to_string());

        let mut right = ElementData::new("e");
        right.attributes.insert("b".to_string(), "2".to_string());
        right.attributes.insert("a".to_string(), "1".to_string());

        assert!(left.same_attributes(&right));

        right.attributes.insert("c".to_string(), "3".to_string());
        assert!(!left.same_attributes(&right));
    }
}
