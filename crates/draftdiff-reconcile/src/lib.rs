//! Edit-script reconciliation and merged rendering for draftdiff.
//!
//! The solver hands back a flat operation list; this crate turns it
//! into something a reader can use:
//!
//! - [`apply`]: marks deletions and match links on the two trees, then
//!   splices clones of inserted right-tree subtrees into the left tree
//!   at the correct positions, iterating to a fixed point.
//! - [`render`]: walks the reconciled left tree into a serialisable
//!   structure where every node carries its change state and changed
//!   text carries word-level diff spans.

pub mod apply;
pub mod render;

pub use apply::{ReconcileStats, apply_edits};
pub use render::{
    ChangeState, RenderedAttribute, RenderedContent, RenderedNode, TextSpan, render,
};
