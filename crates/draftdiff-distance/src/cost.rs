/*
 * cost.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Per-variant edit costs.
 *
 * Inserts are cheap and deletes of structural nodes expensive on
 * purpose: the imbalance steers the solver toward renaming text inside
 * an element rather than replacing the element wholesale, which is what
 * an editor actually did.
 */

use crate::similarity::paragraph_cost;
use draftdiff_tree::{DiffConfig, DiffTree, NodeId, NodeKind};

/// Update cost between nodes of different variants. Large enough that
/// the solver never takes it over any delete+insert path.
pub const FORBIDDEN_COST: u64 = 100_000;

/// Cost model bound to one tree pair.
///
/// Flattened paragraph text is precomputed per tree so repeated
/// paragraph-pair lookups during the distance computation stay cheap.
pub struct CostModel<'a> {
    config: &'a DiffConfig,
    left: &'a DiffTree,
    right: &'a DiffTree,
    left_flat: Vec<Option<String>>,
    right_flat: Vec<Option<String>>,
    exchanged: bool,
}

impl<'a> CostModel<'a> {
    pub fn new(left: &'a DiffTree, right: &'a DiffTree, config: &'a DiffConfig) -> Self {
        Self {
            config,
            left,
            right,
            left_flat: flatten_paragraphs(left),
            right_flat: flatten_paragraphs(right),
            exchanged: false,
        }
    }

    /// Swap the insert and delete cost functions.
    ///
    /// Distances are not symmetric under the default costs; exchanging
    /// the gap costs restores the mirror relation between the two
    /// directions, which the symmetry checks rely on.
    pub fn exchanged(mut self) -> Self {
        self.exchanged = true;
        self
    }

    /// Cost to insert a right-tree node.
    pub fn insert(&self, node: NodeId) -> u64 {
        if self.exchanged {
            removal_cost(&self.right.node(node).kind)
        } else {
            1
        }
    }

    /// Cost to delete a left-tree node.
    pub fn delete(&self, node: NodeId) -> u64 {
        if self.exchanged {
            1
        } else {
            removal_cost(&self.left.node(node).kind)
        }
    }

    /// Cost to turn the left node into the right node.
    ///
    /// Zero means the nodes compare equal (a match); nonzero means a
    /// rename. Nodes of different variants never convert.
    pub fn update(&self, left: NodeId, right: NodeId) -> u64 {
        let l = self.left.node(left);
        let r = self.right.node(right);

        match (&l.kind, &r.kind) {
            (NodeKind::Document, NodeKind::Document) => 0,
            (NodeKind::Element(a), NodeKind::Element(b)) => {
                if self.config.tags_equivalent(&a.tag, &b.tag) {
                    0
                } else {
                    100
                }
            }
            (NodeKind::Text(a), NodeKind::Text(b)) => {
                if a == b {
                    0
                } else {
                    3
                }
            }
            (NodeKind::Comment(a), NodeKind::Comment(b)) => {
                if a == b {
                    0
                } else {
                    3
                }
            }
            (
                NodeKind::ProcessingInstruction { target: ta, body: ba },
                NodeKind::ProcessingInstruction { target: tb, body: bb },
            ) => {
                if ta != tb {
                    100
                } else if ba != bb {
                    50
                } else {
                    0
                }
            }
            (NodeKind::Paragraph, NodeKind::Paragraph) => {
                let lf = self.left_flat[left.index()].as_deref().unwrap_or("");
                let rf = self.right_flat[right.index()].as_deref().unwrap_or("");
                paragraph_cost(lf, rf)
            }
            _ => FORBIDDEN_COST,
        }
    }
}

/// Removal cost by node kind.
///
/// Structural nodes are expensive to delete; text costs just enough
/// that a rename (cost 3) ties delete+insert and wins the tie, so an
/// edited fragment stays linked to its counterpart instead of being
/// replaced.
fn removal_cost(kind: &NodeKind) -> u64 {
    match kind {
        NodeKind::Element(_) | NodeKind::Comment(_) | NodeKind::ProcessingInstruction { .. } => 10,
        NodeKind::Text(_) => 2,
        NodeKind::Document | NodeKind::Paragraph => 1,
    }
}

/// Flattened text for every Paragraph node, indexed by arena slot.
fn flatten_paragraphs(tree: &DiffTree) -> Vec<Option<String>> {
    let mut flat = vec![None; tree.len()];
    for id in tree.descendants(tree.root()) {
        if matches!(tree.node(id).kind, NodeKind::Paragraph) {
            flat[id.index()] = Some(tree.flatten_text(id));
        }
    }
    flat
}
