/*
 * apply.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Edit-script application.
 *
 * Three phases over the tree pair:
 * 1. Walk the script once, setting deleted flags and match links.
 *    Matches are then verified: ancestry must be monotonic and matched
 *    siblings must not cross; violators are demoted to delete+insert.
 * 2. Classify right-tree subtrees that are inserted wholesale and
 *    left-tree subtrees that are deleted wholesale.
 * 3. Place each pending insert into the left tree, anchored on a
 *    matched parent and sibling where one exists, synthesising a
 *    parent over already-matched children where there is none.
 *    Repeats until the pending list stops shrinking; whatever is left
 *    attaches at the nearest matched ancestor.
 */

use draftdiff_distance::{EditOp, EditScript};
use draftdiff_tree::{DiffConfig, DiffTree, NodeId};
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, warn};

/// Counts from one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Matched pairs (zero-cost updates).
    pub matched: usize,
    /// Renamed pairs (nonzero-cost updates).
    pub renamed: usize,
    /// Left nodes marked deleted.
    pub deleted: usize,
    /// Insert operations whose subtree was placed in the left tree.
    pub inserted: usize,
    /// Match links demoted to delete+insert by invariant checks.
    pub demoted: usize,
    /// Inserts that never found a proper position and were attached at
    /// the nearest matched ancestor.
    pub unplaced: usize,
}

/// Apply an edit script to the tree pair, merging inserted right
/// subtrees into the left tree.
///
/// Never fails: pathological scripts degrade to unplaced inserts,
/// which are logged and counted, not raised.
pub fn apply_edits(
    left: &mut DiffTree,
    right: &mut DiffTree,
    script: &EditScript,
    config: &DiffConfig,
) -> ReconcileStats {
    let mut stats = ReconcileStats::default();
    let mut pending: Vec<NodeId> = Vec::new();

    // =========================================================================
    // Phase 1: flags and match links
    // =========================================================================
    for op in &script.ops {
        match *op {
            EditOp::Match { left: l, right: r } => {
                left.node_mut(l).matched = Some(r);
                right.node_mut(r).matched = Some(l);
                stats.matched += 1;
            }
            EditOp::Rename { left: l, right: r } => {
                left.node_mut(l).matched = Some(r);
                right.node_mut(r).matched = Some(l);
                stats.renamed += 1;
            }
            EditOp::Delete { left: l } => {
                left.node_mut(l).deleted = true;
                stats.deleted += 1;
            }
            EditOp::Insert { right: r } => {
                pending.push(r);
            }
        }
    }

    verify_matches(left, right, &mut pending, &mut stats);

    // =========================================================================
    // Phase 2: subtree classification
    // =========================================================================
    let insert_tree = classify_insert_trees(right);
    let delete_tree = classify_delete_trees(left);

    // =========================================================================
    // Phase 3: fixed-point placement
    // =========================================================================
    loop {
        let before = pending.len();
        let mut deferred = Vec::new();

        for b in pending {
            // Placed while cloning an ancestor in an earlier step
            if right.node(b).matched.is_some() {
                stats.inserted += 1;
                continue;
            }

            let placed = if insert_tree[b.index()] {
                place_insert_tree(left, right, b, &delete_tree)
            } else {
                synthesize_parent(left, right, b, &insert_tree)
            };

            if placed {
                stats.inserted += 1;
            } else {
                deferred.push(b);
            }
        }

        if deferred.is_empty() || deferred.len() == before {
            pending = deferred;
            break;
        }
        pending = deferred;
    }

    if !pending.is_empty() {
        stats.unplaced = pending.len();
        warn!(
            count = pending.len(),
            "residual inserts attached at nearest matched ancestor"
        );
        for b in pending {
            attach_at_matched_ancestor(left, right, b);
        }
    }

    if config.debug {
        debug!(?stats, "reconciliation finished");
    }

    stats
}

/// Check ancestry monotonicity and sibling ordering over all matched
/// pairs; demote violators to delete+insert.
///
/// The solver's mappings respect both invariants by construction, so
/// demotions indicate a defect upstream. They are logged loudly and
/// the diff degrades instead of panicking.
fn verify_matches(
    left: &mut DiffTree,
    right: &mut DiffTree,
    pending: &mut Vec<NodeId>,
    stats: &mut ReconcileStats,
) {
    let mut demote: Vec<(NodeId, NodeId)> = Vec::new();

    // Ancestry monotonicity: the nearest matched ancestor of a matched
    // left node must map to an ancestor of its counterpart.
    for l in left.descendants(left.root()) {
        let Some(r) = left.node(l).matched else {
            continue;
        };
        let mut ancestor = left.node(l).parent;
        while let Some(a) = ancestor {
            if let Some(a_match) = left.node(a).matched {
                if !right.is_ancestor(a_match, r) {
                    demote.push((l, r));
                }
                break;
            }
            ancestor = left.node(a).parent;
        }
    }

    // Sibling order: matched children of a matched pair must appear in
    // the same relative order on both sides. Keep the longest
    // increasing run, demote the rest.
    for l in left.descendants(left.root()) {
        let Some(r) = left.node(l).matched else {
            continue;
        };

        let mut pairs: Vec<(NodeId, usize)> = Vec::new();
        for &child in &left.node(l).children {
            if let Some(child_match) = left.node(child).matched
                && let Some(pos) = right.child_position(r, child_match)
            {
                pairs.push((child, pos));
            }
        }
        if pairs.len() < 2 {
            continue;
        }

        let keep = longest_increasing_run(&pairs);
        for (i, &(child, _)) in pairs.iter().enumerate() {
            if !keep.contains(&i) {
                let child_match = left.node(child).matched.expect("pair was matched");
                demote.push((child, child_match));
            }
        }
    }

    for (l, r) in demote {
        // Either check may flag the same pair
        if left.node(l).matched != Some(r) {
            continue;
        }
        warn!(
            left = l.index(),
            right = r.index(),
            "match violates ordering invariants; demoting to delete+insert"
        );
        left.node_mut(l).matched = None;
        left.node_mut(l).deleted = true;
        right.node_mut(r).matched = None;
        pending.push(r);
        stats.demoted += 1;
        stats.deleted += 1;
    }
}

/// Indices (into `pairs`) of a longest strictly increasing subsequence
/// of the right-side positions.
fn longest_increasing_run(pairs: &[(NodeId, usize)]) -> FxHashSet<usize> {
    let n = pairs.len();
    let mut best_len = vec![1usize; n];
    let mut prev = vec![usize::MAX; n];

    for i in 1..n {
        for j in 0..i {
            if pairs[j].1 < pairs[i].1 && best_len[j] + 1 > best_len[i] {
                best_len[i] = best_len[j] + 1;
                prev[i] = j;
            }
        }
    }

    let mut keep = FxHashSet::default();
    if n > 0 {
        let mut i = (0..n).max_by_key(|&i| best_len[i]).expect("nonempty");
        loop {
            keep.insert(i);
            if prev[i] == usize::MAX {
                break;
            }
            i = prev[i];
        }
    }
    keep
}

/// `insert_tree[i]`: node i and every descendant are unmatched, so the
/// whole subtree is new content.
fn classify_insert_trees(right: &DiffTree) -> Vec<bool> {
    let mut flags = vec![false; right.len()];
    for id in post_order(right) {
        let node = right.node(id);
        flags[id.index()] =
            node.matched.is_none() && node.children.iter().all(|c| flags[c.index()]);
    }
    flags
}

/// `delete_tree[i]`: node i and every descendant are deleted.
fn classify_delete_trees(left: &DiffTree) -> Vec<bool> {
    let mut flags = vec![false; left.len()];
    for id in post_order(left) {
        let node = left.node(id);
        flags[id.index()] = node.deleted && node.children.iter().all(|c| flags[c.index()]);
    }
    flags
}

fn post_order(tree: &DiffTree) -> Vec<NodeId> {
    let mut out = Vec::with_capacity(tree.len());
    let mut stack = vec![(tree.root(), false)];
    while let Some((id, expanded)) = stack.pop() {
        if expanded {
            out.push(id);
            continue;
        }
        stack.push((id, true));
        for &child in tree.node(id).children.iter().rev() {
            stack.push((child, false));
        }
    }
    out
}

/// Try to place a wholly-new right subtree into the left tree.
fn place_insert_tree(
    left: &mut DiffTree,
    right: &mut DiffTree,
    b: NodeId,
    delete_tree: &[bool],
) -> bool {
    let Some(parent_b) = right.node(b).parent else {
        return false;
    };
    let Some(p) = right.node(parent_b).matched else {
        return false;
    };

    // An empty matched parent takes the subtree as its only child
    if left.node(p).children.is_empty() {
        let clone = clone_subtree(left, right, b);
        left.append_child(p, clone);
        return true;
    }

    let pos = right
        .child_position(parent_b, b)
        .expect("b is a child of its parent");

    // Anchor after a matched predecessor sibling
    if pos > 0 {
        let pred = right.node(parent_b).children[pos - 1];
        if let Some(pred_match) = right.node(pred).matched
            && let Some(anchor) = find_child_through_deleted(left, p, pred_match)
        {
            let clone = clone_subtree(left, right, b);
            let at = left
                .child_position(p, anchor)
                .expect("anchor is a child of p");
            left.insert_child_at(p, at + 1, clone);
            return true;
        }
    }

    // Or before a matched successor sibling
    let siblings = right.node(parent_b).children.clone();
    if pos + 1 < siblings.len() {
        let succ = siblings[pos + 1];
        if let Some(succ_match) = right.node(succ).matched
            && let Some(anchor) = find_child_through_deleted(left, p, succ_match)
        {
            let clone = clone_subtree(left, right, b);
            let at = left
                .child_position(p, anchor)
                .expect("anchor is a child of p");
            left.insert_child_at(p, at, clone);
            return true;
        }
    }

    // Everything old under the parent is going away: append the new
    let all_deleted = left
        .node(p)
        .children
        .iter()
        .all(|&c| delete_tree.get(c.index()).copied().unwrap_or(false));
    if all_deleted {
        let clone = clone_subtree(left, right, b);
        left.append_child(p, clone);
        return true;
    }

    false
}

/// Place an inserted node whose children already exist in the left
/// tree: synthesise it above their lowest common ancestor's slot and
/// re-parent them under it.
fn synthesize_parent(
    left: &mut DiffTree,
    right: &mut DiffTree,
    b: NodeId,
    insert_tree: &[bool],
) -> bool {
    let children = right.node(b).children.clone();

    let mut matched_children: Vec<(NodeId, NodeId)> = Vec::new();
    for &child in &children {
        let node = right.node(child);
        if node.inserted || insert_tree[child.index()] {
            continue;
        }
        match node.matched {
            Some(m) => matched_children.push((child, m)),
            // A child that should match but does not yet: wait
            None => return false,
        }
    }
    if matched_children.is_empty() {
        return false;
    }

    let left_children: Vec<NodeId> = matched_children.iter().map(|&(_, m)| m).collect();
    let Some(mut lca) = lowest_common_ancestor(left, &left_children) else {
        return false;
    };
    // The new node must sit strictly above the children it adopts
    if left_children.contains(&lca) {
        match left.node(lca).parent {
            Some(parent) => lca = parent,
            None => return false,
        }
    }

    // Slot the new node where the first matched child's ancestry meets
    // the LCA
    let first = left_children[0];
    let slot = left
        .node(lca)
        .children
        .iter()
        .position(|&c| left.is_ancestor(c, first))
        .unwrap_or(left.node(lca).children.len());

    let template = right.node(b);
    let new_node = left.push_detached(template.kind.clone(), template.line, template.preserve_space);
    left.node_mut(new_node).inserted = true;
    left.node_mut(new_node).matched = Some(b);
    right.node_mut(b).matched = Some(new_node);
    left.insert_child_at(lca, slot, new_node);

    // Re-parent the matched left children in right-child order
    for &(_, m) in &matched_children {
        left.detach(m);
        left.append_child(new_node, m);
    }

    true
}

/// Fallback for inserts the fixed point could not place.
fn attach_at_matched_ancestor(left: &mut DiffTree, right: &mut DiffTree, b: NodeId) {
    let mut ancestor = right.node(b).parent;
    while let Some(a) = ancestor {
        if let Some(a_match) = right.node(a).matched {
            let clone = clone_subtree(left, right, b);
            left.append_child(a_match, clone);
            return;
        }
        ancestor = right.node(a).parent;
    }
    warn!(right = b.index(), "insert has no matched ancestor; dropped");
}

/// Deep-copy a right subtree into the left arena, marking every clone
/// inserted and cross-linking each clone with its original.
///
/// Originals that already carry a match (possible only on the fallback
/// path) keep their existing link.
fn clone_subtree(left: &mut DiffTree, right: &mut DiffTree, b: NodeId) -> NodeId {
    let template = right.node(b);
    let root_clone =
        left.push_detached(template.kind.clone(), template.line, template.preserve_space);
    left.node_mut(root_clone).inserted = true;
    if right.node(b).matched.is_none() {
        left.node_mut(root_clone).matched = Some(b);
        right.node_mut(b).matched = Some(root_clone);
    }

    let mut stack: Vec<(NodeId, NodeId)> = right
        .node(b)
        .children
        .iter()
        .rev()
        .map(|&c| (c, root_clone))
        .collect();

    while let Some((orig, parent_clone)) = stack.pop() {
        let template = right.node(orig);
        let clone =
            left.push_detached(template.kind.clone(), template.line, template.preserve_space);
        left.node_mut(clone).inserted = true;
        left.append_child(parent_clone, clone);
        if right.node(orig).matched.is_none() {
            left.node_mut(clone).matched = Some(orig);
            right.node_mut(orig).matched = Some(clone);
        }

        for &c in right.node(orig).children.iter().rev() {
            stack.push((c, clone));
        }
    }

    root_clone
}

/// Find the child of `parent` that is `target`, looking through
/// single-child deleted wrappers on either side.
fn find_child_through_deleted(tree: &DiffTree, parent: NodeId, target: NodeId) -> Option<NodeId> {
    tree.node(parent)
        .children
        .iter()
        .copied()
        .find(|&child| is_same_through_deleted(tree, child, target))
}

fn is_same_through_deleted(tree: &DiffTree, candidate: NodeId, target: NodeId) -> bool {
    if candidate == target {
        return true;
    }
    let c = tree.node(candidate);
    if c.deleted && c.children.len() == 1 && is_same_through_deleted(tree, c.children[0], target) {
        return true;
    }
    let t = tree.node(target);
    if t.deleted && t.children.len() == 1 {
        return is_same_through_deleted(tree, candidate, t.children[0]);
    }
    false
}

/// Deepest node that is an ancestor of every id in `nodes`.
fn lowest_common_ancestor(tree: &DiffTree, nodes: &[NodeId]) -> Option<NodeId> {
    let first = *nodes.first()?;

    let mut chain = Vec::new();
    let mut current = Some(first);
    while let Some(id) = current {
        chain.push(id);
        current = tree.node(id).parent;
    }

    // chain runs node -> root; find the shallowest entry that covers
    // all the others
    for &candidate in &chain {
        if nodes
            .iter()
            .all(|&n| tree.is_ancestor(candidate, n))
        {
            return Some(candidate);
        }
    }
    None
}
