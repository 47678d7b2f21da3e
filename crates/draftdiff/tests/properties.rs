//! Property-based checks over the solver and reconciler.
//!
//! Trees are generated directly against the node model with a
//! depth-limited strategy: every shape is reachable with positive
//! probability, and depth bounds keep cases small enough to shrink.
//! Each property runs in both raw and folding mode, so the invariants
//! also hold on trees containing Paragraph nodes.

use draftdiff_distance::compute_edit_script;
use draftdiff_reconcile::{apply_edits, render};
use draftdiff_tree::{DiffConfig, DiffTree, ElementData, NodeId, NodeKind, add_paragraphs};
use proptest::prelude::*;

// "t" folds always, "td" folds mixed runs, the rest never fold
const TAGS: &[&str] = &["a", "b", "sec", "t", "td"];
const TEXTS: &[&str] = &["alpha", "beta words here", "gamma delta", "x"];

#[derive(Debug, Clone)]
enum GenNode {
    Element(&'static str, Vec<GenNode>),
    Text(&'static str),
}

fn gen_node() -> impl Strategy<Value = GenNode> {
    let leaf = prop_oneof![
        prop::sample::select(TEXTS).prop_map(GenNode::Text),
        prop::sample::select(TAGS).prop_map(|tag| GenNode::Element(tag, vec![])),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        (
            prop::sample::select(TAGS),
            prop::collection::vec(inner, 0..3),
        )
            .prop_map(|(tag, children)| GenNode::Element(tag, children))
    })
}

fn to_tree(node: &GenNode) -> DiffTree {
    let mut tree = DiffTree::new();
    let root = tree.root();
    match node {
        // A document's child must be an element; wrap stray text
        GenNode::Text(_) => {
            let wrapper = tree.push_child(
                root,
                NodeKind::Element(ElementData::new("t")),
                1,
                false,
            );
            add_node(&mut tree, wrapper, node);
        }
        GenNode::Element(..) => add_node(&mut tree, root, node),
    }
    tree
}

fn add_node(tree: &mut DiffTree, parent: NodeId, node: &GenNode) {
    match node {
        GenNode::Text(text) => {
            tree.push_child(parent, NodeKind::Text((*text).to_string()), 1, false);
        }
        GenNode::Element(tag, children) => {
            let id = tree.push_child(parent, NodeKind::Element(ElementData::new(*tag)), 1, false);
            for child in children {
                add_node(tree, id, child);
            }
        }
    }
}

fn config_for(raw: bool) -> DiffConfig {
    DiffConfig {
        raw,
        ..DiffConfig::default()
    }
}

/// Build a tree for one side, folding paragraphs unless in raw mode.
fn tree_for(node: &GenNode, config: &DiffConfig) -> DiffTree {
    let mut tree = to_tree(node);
    if !config.raw {
        add_paragraphs(&mut tree, config);
    }
    tree
}

/// Ids the solver can see: the whole tree minus the insides of
/// paragraphs, which are compared as single leaves.
fn visible_ids(tree: &DiffTree) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack = vec![tree.root()];
    while let Some(id) = stack.pop() {
        out.push(id);
        if !tree.node(id).is_opaque() {
            for &child in tree.node(id).children.iter().rev() {
                stack.push(child);
            }
        }
    }
    out
}

proptest! {
    /// Distance from a tree to itself is zero: one match per visible
    /// node, nothing else.
    #[test]
    fn distance_to_self_is_zero(node in gen_node(), raw in any::<bool>()) {
        let config = config_for(raw);
        let left = tree_for(&node, &config);
        let right = tree_for(&node, &config);

        let script = compute_edit_script(&left, &right, &config);
        prop_assert_eq!(script.cost, 0);
        prop_assert!(script.is_identity());
        prop_assert_eq!(script.ops.len(), visible_ids(&left).len());
    }

    /// Exchanging the insert/delete cost functions mirrors the
    /// problem: both directions find the same minimum cost.
    #[test]
    fn exchanged_costs_mirror_distance(
        a in gen_node(),
        b in gen_node(),
        raw in any::<bool>(),
    ) {
        use draftdiff_distance::cost::CostModel;
        use draftdiff_distance::zhang_shasha::compute_edit_script_with;

        let config = config_for(raw);
        let left = tree_for(&a, &config);
        let right = tree_for(&b, &config);

        let forward = compute_edit_script(&left, &right, &config);
        let model = CostModel::new(&right, &left, &config).exchanged();
        let backward = compute_edit_script_with(&right, &left, &config, model);

        prop_assert_eq!(forward.cost, backward.cost);
    }

    /// Every solver-visible node of either tree appears in exactly one
    /// operation; nodes hidden inside paragraphs appear in none.
    #[test]
    fn script_covers_every_visible_node_once(
        a in gen_node(),
        b in gen_node(),
        raw in any::<bool>(),
    ) {
        let config = config_for(raw);
        let left = tree_for(&a, &config);
        let right = tree_for(&b, &config);
        let script = compute_edit_script(&left, &right, &config);

        let mut left_seen = vec![0usize; left.len()];
        let mut right_seen = vec![0usize; right.len()];
        for op in &script.ops {
            if let Some(l) = op.left() {
                left_seen[l.index()] += 1;
            }
            if let Some(r) = op.right() {
                right_seen[r.index()] += 1;
            }
        }

        let mut left_visible = vec![false; left.len()];
        for id in visible_ids(&left) {
            left_visible[id.index()] = true;
        }
        let mut right_visible = vec![false; right.len()];
        for id in visible_ids(&right) {
            right_visible[id.index()] = true;
        }

        for (i, &seen) in left_seen.iter().enumerate() {
            prop_assert_eq!(seen, usize::from(left_visible[i]), "left node {}", i);
        }
        for (i, &seen) in right_seen.iter().enumerate() {
            prop_assert_eq!(seen, usize::from(right_visible[i]), "right node {}", i);
        }
    }

    /// Reconciliation preserves every pre-existing left node: all of
    /// them stay reachable from the root.
    #[test]
    fn reconciliation_preserves_left_nodes(
        a in gen_node(),
        b in gen_node(),
        raw in any::<bool>(),
    ) {
        let config = config_for(raw);
        let mut left = tree_for(&a, &config);
        let mut right = tree_for(&b, &config);
        let original_len = left.len();

        let script = compute_edit_script(&left, &right, &config);
        apply_edits(&mut left, &mut right, &script, &config);

        let mut reachable = vec![false; left.len()];
        for id in left.descendants(left.root()) {
            reachable[id.index()] = true;
        }
        for (i, seen) in reachable.iter().enumerate().take(original_len) {
            prop_assert!(*seen, "original left node {} unreachable", i);
        }
    }

    /// After reconciliation, match links form a partial bijection and
    /// every solver-visible node is classified.
    #[test]
    fn matches_form_partial_bijection(
        a in gen_node(),
        b in gen_node(),
        raw in any::<bool>(),
    ) {
        let config = config_for(raw);
        let mut left = tree_for(&a, &config);
        let mut right = tree_for(&b, &config);

        let script = compute_edit_script(&left, &right, &config);
        apply_edits(&mut left, &mut right, &script, &config);

        let visible: Vec<NodeId> = visible_ids(&left);
        for id in left.descendants(left.root()) {
            if let Some(m) = left.node(id).matched {
                prop_assert_eq!(right.node(m).matched, Some(id));
            }
        }
        for id in visible {
            let node = left.node(id);
            if node.matched.is_none() {
                prop_assert!(
                    node.deleted || node.inserted || node.kind.is_synthetic(),
                    "unclassified left node {:?}",
                    id
                );
            }
        }
    }

    /// Ancestry monotonicity: the nearest matched ancestor of a
    /// matched node maps to an ancestor of its counterpart.
    #[test]
    fn matches_respect_ancestry(
        a in gen_node(),
        b in gen_node(),
        raw in any::<bool>(),
    ) {
        let config = config_for(raw);
        let mut left = tree_for(&a, &config);
        let mut right = tree_for(&b, &config);

        let script = compute_edit_script(&left, &right, &config);
        apply_edits(&mut left, &mut right, &script, &config);

        for l in left.descendants(left.root()) {
            let Some(r) = left.node(l).matched else { continue };
            let mut ancestor = left.node(l).parent;
            while let Some(anc) = ancestor {
                if let Some(anc_match) = left.node(anc).matched {
                    prop_assert!(
                        right.is_ancestor(anc_match, r),
                        "ancestry violated at {:?}",
                        l
                    );
                    break;
                }
                ancestor = left.node(anc).parent;
            }
        }
    }

    /// Matched children under a matched parent keep the same relative
    /// order on both sides.
    #[test]
    fn matched_children_never_cross(
        a in gen_node(),
        b in gen_node(),
        raw in any::<bool>(),
    ) {
        let config = config_for(raw);
        let mut left = tree_for(&a, &config);
        let mut right = tree_for(&b, &config);

        let script = compute_edit_script(&left, &right, &config);
        apply_edits(&mut left, &mut right, &script, &config);

        for l in left.descendants(left.root()) {
            let Some(r) = left.node(l).matched else { continue };
            let positions: Vec<usize> = left
                .node(l)
                .children
                .iter()
                .filter_map(|&c| left.node(c).matched)
                .filter_map(|m| right.child_position(r, m))
                .collect();
            let mut sorted = positions.clone();
            sorted.sort_unstable();
            prop_assert_eq!(positions, sorted);
        }
    }

    /// Rendering is a pure function of the reconciled trees.
    #[test]
    fn rendering_is_idempotent(
        a in gen_node(),
        b in gen_node(),
        raw in any::<bool>(),
    ) {
        let config = config_for(raw);
        let mut left = tree_for(&a, &config);
        let mut right = tree_for(&b, &config);

        let script = compute_edit_script(&left, &right, &config);
        apply_edits(&mut left, &mut right, &script, &config);

        let first = render(&left, &right, &config);
        let second = render(&left, &right, &config);
        prop_assert_eq!(first, second);
    }
}
