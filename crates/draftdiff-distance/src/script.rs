/*
 * script.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Edit script types.
 *
 * The solver reports how to turn the left tree into the right tree as a
 * flat operation list. Node identities are NodeIds into the respective
 * trees; the script itself owns nothing.
 */

use draftdiff_tree::NodeId;
use serde::Serialize;

/// One operation of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum EditOp {
    /// Left and right nodes compare equal (update cost 0).
    Match { left: NodeId, right: NodeId },

    /// Left node becomes the right node at a nonzero update cost.
    Rename { left: NodeId, right: NodeId },

    /// Left node has no counterpart.
    Delete { left: NodeId },

    /// Right node has no counterpart.
    Insert { right: NodeId },
}

impl EditOp {
    /// The left-tree node this operation touches, if any.
    pub fn left(&self) -> Option<NodeId> {
        match self {
            EditOp::Match { left, .. } | EditOp::Rename { left, .. } | EditOp::Delete { left } => {
                Some(*left)
            }
            EditOp::Insert { .. } => None,
        }
    }

    /// The right-tree node this operation touches, if any.
    pub fn right(&self) -> Option<NodeId> {
        match self {
            EditOp::Match { right, .. }
            | EditOp::Rename { right, .. }
            | EditOp::Insert { right } => Some(*right),
            EditOp::Delete { .. } => None,
        }
    }
}

/// The minimum-cost edit script between two trees.
#[derive(Debug, Clone, Serialize)]
pub struct EditScript {
    /// Total cost of the script.
    pub cost: u64,

    /// Operations in recovery order.
    pub ops: Vec<EditOp>,
}

impl EditScript {
    /// True when the script changes nothing: every operation is a match.
    pub fn is_identity(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, EditOp::Match { .. }))
    }

    /// Number of operations other than matches.
    pub fn change_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !matches!(op, EditOp::Match { .. }))
            .count()
    }
}
