//! Diff tree model for draftdiff.
//!
//! This crate defines the labelled ordered tree the diff engine operates
//! on, and the two passes that produce it from parsed XML:
//!
//! - [`node`]: the arena-backed [`DiffTree`] with typed [`NodeKind`]
//!   variants, parent/child links, and per-node diff state (match link,
//!   deleted/inserted flags).
//! - [`builder`]: conversion from [`draftdiff_xml::XmlDocument`] into a
//!   [`DiffTree`], promoting text content to explicit nodes and applying
//!   the whitespace policy.
//! - [`fold`]: the optional paragraph-folding pass that wraps runs of
//!   inline content in synthetic [`NodeKind::Paragraph`] nodes so prose
//!   is compared a paragraph at a time.
//! - [`config`]: the [`DiffConfig`] context passed explicitly through
//!   every pass — there are no process-wide flags.

pub mod builder;
pub mod config;
pub mod fold;
pub mod node;

pub use builder::build_diff_tree;
pub use config::{DiffConfig, FoldClass, ParagraphPolicy};
pub use fold::add_paragraphs;
pub use node::{DiffTree, ElementData, Node, NodeId, NodeKind};
