//! Semantic diff for Internet-Draft and RFC XML sources.
//!
//! Two XML documents go in; one annotated tree comes out. The pipeline:
//!
//! 1. Parse both sources ([`draftdiff_xml`]), keeping comments, CDATA,
//!    and processing instructions.
//! 2. Build diff trees ([`draftdiff_tree`]) and, unless `raw` is set,
//!    fold inline runs into paragraphs so prose compares a paragraph
//!    at a time.
//! 3. Compute the minimum-cost edit script between the trees
//!    ([`draftdiff_distance`]).
//! 4. Reconcile the script into the left tree and render the merged
//!    result ([`draftdiff_reconcile`]): every node is unchanged,
//!    left-only, right-only, or renamed, and changed text carries
//!    word-level diff spans.
//!
//! # Example
//!
//! ```rust
//! use draftdiff::{DiffConfig, diff_documents};
//!
//! let result = diff_documents(
//!     "<rfc><front><title>Old Title</title></front></rfc>",
//!     "<rfc><front><title>New Title</title></front></rfc>",
//!     &DiffConfig::default(),
//! )
//! .unwrap();
//!
//! assert!(!result.identical);
//! assert!(result.cost > 0);
//! ```

use thiserror::Error;
use tracing::info;

pub use draftdiff_distance::{EditOp, EditScript};
pub use draftdiff_reconcile::{
    ChangeState, ReconcileStats, RenderedAttribute, RenderedContent, RenderedNode, TextSpan,
};
pub use draftdiff_tree::{DiffConfig, DiffTree, FoldClass, NodeId, NodeKind, ParagraphPolicy};

/// Errors from the end-to-end pipeline.
///
/// Only the parsing boundary can fail; everything downstream degrades
/// instead of erroring.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse left document: {0}")]
    LeftParse(#[source] draftdiff_xml::Error),

    #[error("failed to parse right document: {0}")]
    RightParse(#[source] draftdiff_xml::Error),
}

/// The outcome of diffing two documents.
#[derive(Debug)]
pub struct DiffResult {
    /// The merged tree, rendered for display.
    pub rendered: RenderedNode,

    /// The reconciled left tree: original left nodes plus clones of
    /// inserted right subtrees, with state flags and match links set.
    pub left: DiffTree,

    /// The right tree with its half of the match links.
    pub right: DiffTree,

    /// Total edit-script cost.
    pub cost: u64,

    /// True when the script contains only matches.
    pub identical: bool,

    /// Reconciliation counters, including unplaced inserts.
    pub stats: ReconcileStats,
}

/// Diff two XML documents.
///
/// # Errors
///
/// Returns an error only if one of the inputs fails to parse.
pub fn diff_documents(
    left_source: &str,
    right_source: &str,
    config: &DiffConfig,
) -> Result<DiffResult, Error> {
    let left_doc = draftdiff_xml::parse(left_source).map_err(Error::LeftParse)?;
    let right_doc = draftdiff_xml::parse(right_source).map_err(Error::RightParse)?;

    let mut left = draftdiff_tree::build_diff_tree(&left_doc, config);
    let mut right = draftdiff_tree::build_diff_tree(&right_doc, config);

    if !config.raw {
        draftdiff_tree::add_paragraphs(&mut left, config);
        draftdiff_tree::add_paragraphs(&mut right, config);
    }

    let script = draftdiff_distance::compute_edit_script(&left, &right, config);
    let identical = script.is_identity();
    if identical {
        info!("documents are identical");
    }

    let cost = script.cost;
    let stats = draftdiff_reconcile::apply_edits(&mut left, &mut right, &script, config);
    let rendered = draftdiff_reconcile::render(&left, &right, config);

    Ok(DiffResult {
        rendered,
        left,
        right,
        cost,
        identical,
        stats,
    })
}
