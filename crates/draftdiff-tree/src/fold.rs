/*
 * fold.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Paragraph folding.
 *
 * Raw tree distance treats every inline element and text fragment as an
 * independent node, so an edited sentence explodes into a pile of
 * unrelated edits. This pass wraps runs of inline content in synthetic
 * Paragraph nodes; the solver then compares whole paragraphs by their
 * flattened text, and the renderer re-expands the word-level diff.
 */

use crate::config::{DiffConfig, FoldClass};
use crate::node::{DiffTree, NodeId, NodeKind};

/// Fold inline runs into Paragraph nodes, per the policy table.
///
/// Folding is idempotent: already-folded containers are left alone.
/// Callers skip this pass entirely in raw mode.
pub fn add_paragraphs(tree: &mut DiffTree, config: &DiffConfig) {
    let mut stack = vec![tree.root()];

    while let Some(id) = stack.pop() {
        let class = match &tree.node(id).kind {
            NodeKind::Element(data) => config.paragraph_policy.classify(&data.tag),
            NodeKind::Document => FoldClass::Never,
            // Paragraph content is already folded; leaves have no children
            _ => continue,
        };

        match class {
            FoldClass::Always => {
                fold_all(tree, id);
                // Everything under the new paragraph is opaque now
            }
            FoldClass::Mixed => {
                fold_mixed(tree, id, config);
                for &child in &tree.node(id).children {
                    if !matches!(tree.node(child).kind, NodeKind::Paragraph) {
                        stack.push(child);
                    }
                }
            }
            FoldClass::Never => {
                for &child in &tree.node(id).children {
                    stack.push(child);
                }
            }
        }
    }
}

/// Wrap all of `id`'s children in a single Paragraph.
fn fold_all(tree: &mut DiffTree, id: NodeId) {
    let children = tree.node(id).children.clone();
    if children.is_empty() {
        return;
    }
    if children.len() == 1 && matches!(tree.node(children[0]).kind, NodeKind::Paragraph) {
        return;
    }

    let paragraph = new_paragraph(tree, id, &children);
    tree.node_mut(id).children = vec![paragraph];
}

/// Wrap each maximal run of inline content in a Paragraph, leaving
/// block-level children in place.
fn fold_mixed(tree: &mut DiffTree, id: NodeId, config: &DiffConfig) {
    let children = tree.node(id).children.clone();
    if children.is_empty() {
        return;
    }

    let mut rebuilt: Vec<NodeId> = Vec::with_capacity(children.len());
    let mut run: Vec<NodeId> = Vec::new();

    for child in children {
        if is_inline_content(tree, child, config) {
            run.push(child);
        } else {
            flush_run(tree, id, &mut run, &mut rebuilt);
            rebuilt.push(child);
        }
    }
    flush_run(tree, id, &mut run, &mut rebuilt);

    tree.node_mut(id).children = rebuilt;
}

fn flush_run(tree: &mut DiffTree, parent: NodeId, run: &mut Vec<NodeId>, rebuilt: &mut Vec<NodeId>) {
    if run.is_empty() {
        return;
    }
    let paragraph = new_paragraph(tree, parent, run);
    rebuilt.push(paragraph);
    run.clear();
}

/// Allocate a Paragraph over `children` and re-parent them under it.
fn new_paragraph(tree: &mut DiffTree, parent: NodeId, children: &[NodeId]) -> NodeId {
    let line = tree.node(children[0]).line;
    let preserve = tree.node(parent).preserve_space;
    let paragraph = tree.push_detached(NodeKind::Paragraph, line, preserve);

    tree.node_mut(paragraph).parent = Some(parent);
    tree.node_mut(paragraph).children = children.to_vec();
    for &child in children {
        tree.node_mut(child).parent = Some(paragraph);
    }

    paragraph
}

fn is_inline_content(tree: &DiffTree, id: NodeId, config: &DiffConfig) -> bool {
    match &tree.node(id).kind {
        NodeKind::Text(_) | NodeKind::Comment(_) => true,
        NodeKind::Element(data) => config.paragraph_policy.is_inline(&data.tag),
        _ => false,
    }
}
