//! Tree edit distance and text alignment for draftdiff.
//!
//! Two layers of alignment live here:
//!
//! - [`zhang_shasha`]: the ordered tree edit distance solver. Given the
//!   two diff trees and the per-variant cost model in [`cost`], it
//!   produces the minimum-cost [`EditScript`] of match / rename /
//!   delete / insert operations.
//! - [`align`]: word-level alignment of two text fragments, used by the
//!   renderer to show intra-paragraph edits, with the token similarity
//!   ratio in [`similarity`] feeding paragraph update costs back into
//!   the solver.

pub mod align;
pub mod cost;
pub mod script;
pub mod similarity;
pub mod zhang_shasha;

pub use align::{EditSpan, SpanKind, compute_edits, tokenize};
pub use script::{EditOp, EditScript};
pub use similarity::{paragraph_cost, similarity_ratio};
pub use zhang_shasha::compute_edit_script;
