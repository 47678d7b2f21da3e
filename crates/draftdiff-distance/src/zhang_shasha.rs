/*
 * zhang_shasha.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Ordered tree edit distance (Zhang & Shasha).
 *
 * The classical algorithm: enumerate both trees in post-order, compute
 * leftmost descendants and keyroots, then fill a forest-distance table
 * for every keyroot pair. Costs and provenance travel together — each
 * cell stores its accumulated cost plus a link to the predecessor cell
 * and the local operation, so the full edit script falls out of the
 * final cell without a separate traceback structure.
 *
 * One forest table is reused across all keyroot pairs, re-dimensioned
 * to the current pair; every cell in the active window is written
 * before it is read, so no clearing is needed.
 */

use crate::cost::CostModel;
use crate::script::{EditOp, EditScript};
use draftdiff_tree::{DiffConfig, DiffTree, NodeId};
use tracing::debug;

/// Compute the minimum-cost edit script turning `left` into `right`.
///
/// The script contains exactly one operation per node across both
/// trees: matched/renamed pairs appear once, deleted left nodes and
/// inserted right nodes once each.
pub fn compute_edit_script(left: &DiffTree, right: &DiffTree, config: &DiffConfig) -> EditScript {
    let model = CostModel::new(left, right, config);
    compute_edit_script_with(left, right, config, model)
}

/// Like [`compute_edit_script`], with an explicit cost model.
///
/// Exists so the exchange-symmetry property can run the solver with
/// swapped gap costs; normal callers use [`compute_edit_script`].
pub fn compute_edit_script_with(
    left: &DiffTree,
    right: &DiffTree,
    config: &DiffConfig,
    model: CostModel<'_>,
) -> EditScript {
    let a = TreeIndex::new(left);
    let b = TreeIndex::new(right);

    let mut solver = Solver {
        a: &a,
        b: &b,
        model,
        steps: StepArena::new(),
        fd: ForestTable::new(),
        treedist: vec![
            Cell {
                cost: u64::MAX,
                step: StepArena::EMPTY,
            };
            a.len() * b.len()
        ],
        n2: b.len(),
    };

    for &i in &a.keyroots {
        for &j in &b.keyroots {
            solver.tree_dist(i, j);
        }
    }

    let final_cell = solver.td(a.len() - 1, b.len() - 1);
    let script = EditScript {
        cost: final_cell.cost,
        ops: solver.steps.flatten(final_cell.step),
    };

    if config.debug {
        debug!(
            cost = script.cost,
            ops = script.ops.len(),
            "computed edit script"
        );
        for op in &script.ops {
            debug!(?op, "edit");
        }
    }

    script
}

/// Post-order enumeration of one tree, with the leftmost-descendant
/// table and keyroot set the solver needs.
struct TreeIndex {
    /// Nodes in post-order. Paragraphs are leaves here: the solver
    /// compares their flattened text, never their structure.
    ids: Vec<NodeId>,

    /// `lmd[i]` is the post-order index of the leftmost descendant of
    /// `ids[i]`; equals `i` for leaves.
    lmd: Vec<usize>,

    /// Ascending indices k such that no k' > k has `lmd(k') == lmd(k)`.
    /// The root is always last.
    keyroots: Vec<usize>,
}

impl TreeIndex {
    fn new(tree: &DiffTree) -> Self {
        // Iterative post-order; document trees can be deep.
        let mut ids = Vec::with_capacity(tree.len());
        let mut stack = vec![(tree.root(), false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                ids.push(id);
                continue;
            }
            stack.push((id, true));
            let node = tree.node(id);
            if !node.is_opaque() {
                for &child in node.children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }

        let mut pos = vec![usize::MAX; tree.len()];
        for (i, &id) in ids.iter().enumerate() {
            pos[id.index()] = i;
        }

        let mut lmd = vec![0usize; ids.len()];
        for (i, &id) in ids.iter().enumerate() {
            let node = tree.node(id);
            let first_child = if node.is_opaque() {
                None
            } else {
                node.children.first()
            };
            lmd[i] = match first_child {
                // Children precede parents in post-order, so this is set
                Some(&child) => lmd[pos[child.index()]],
                None => i,
            };
        }

        let mut last_with_lmd = vec![usize::MAX; ids.len()];
        for (i, &l) in lmd.iter().enumerate() {
            last_with_lmd[l] = i;
        }
        let mut keyroots: Vec<usize> = last_with_lmd
            .into_iter()
            .filter(|&i| i != usize::MAX)
            .collect();
        keyroots.sort_unstable();

        Self { ids, lmd, keyroots }
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

/// One DP cell: accumulated cost plus provenance.
#[derive(Clone, Copy)]
struct Cell {
    cost: u64,
    step: u32,
}

/// Provenance arena. Cells reference steps; a step is either a single
/// operation or the join of a predecessor chain with one operation, so
/// shared prefixes between cells cost nothing.
enum Step {
    Empty,
    Leaf(EditOp),
    Combine(u32, u32),
}

struct StepArena {
    steps: Vec<Step>,
}

impl StepArena {
    const EMPTY: u32 = 0;

    fn new() -> Self {
        Self {
            steps: vec![Step::Empty],
        }
    }

    fn leaf(&mut self, op: EditOp) -> u32 {
        self.steps.push(Step::Leaf(op));
        (self.steps.len() - 1) as u32
    }

    fn combine(&mut self, prev: u32, next: u32) -> u32 {
        self.steps.push(Step::Combine(prev, next));
        (self.steps.len() - 1) as u32
    }

    /// Collect leaf operations under `root` in chronological order.
    fn flatten(&self, root: u32) -> Vec<EditOp> {
        let mut ops = Vec::new();
        let mut stack = vec![root];
        while let Some(step) = stack.pop() {
            match &self.steps[step as usize] {
                Step::Empty => {}
                Step::Leaf(op) => ops.push(*op),
                Step::Combine(prev, next) => {
                    stack.push(*next);
                    stack.push(*prev);
                }
            }
        }
        ops
    }
}

/// Reusable forest-distance scratch table.
struct ForestTable {
    cells: Vec<Cell>,
    cols: usize,
}

impl ForestTable {
    fn new() -> Self {
        Self {
            cells: Vec::new(),
            cols: 0,
        }
    }

    fn reset(&mut self, rows: usize, cols: usize) {
        self.cols = cols;
        let needed = rows * cols;
        if self.cells.len() < needed {
            self.cells.resize(
                needed,
                Cell {
                    cost: 0,
                    step: StepArena::EMPTY,
                },
            );
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        self.cells[x * self.cols + y]
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        self.cells[x * self.cols + y] = cell;
    }
}

struct Solver<'a> {
    a: &'a TreeIndex,
    b: &'a TreeIndex,
    model: CostModel<'a>,
    steps: StepArena,
    fd: ForestTable,
    treedist: Vec<Cell>,
    n2: usize,
}

impl Solver<'_> {
    fn td(&self, xi: usize, yj: usize) -> Cell {
        let cell = self.treedist[xi * self.n2 + yj];
        debug_assert!(cell.cost != u64::MAX, "tree pair ({xi}, {yj}) not yet computed");
        cell
    }

    fn set_td(&mut self, xi: usize, yj: usize, cell: Cell) {
        self.treedist[xi * self.n2 + yj] = cell;
    }

    /// Fill the forest table for keyroot pair (i, j), recording tree
    /// distances for every subtree pair rooted inside it.
    fn tree_dist(&mut self, i: usize, j: usize) {
        let al_i = self.a.lmd[i];
        let bl_j = self.b.lmd[j];
        let rows = i - al_i + 2;
        let cols = j - bl_j + 2;
        self.fd.reset(rows, cols);

        self.fd.set(
            0,
            0,
            Cell {
                cost: 0,
                step: StepArena::EMPTY,
            },
        );

        for x in 1..rows {
            let xi = al_i + x - 1;
            let prev = self.fd.get(x - 1, 0);
            let cost = prev.cost + self.model.delete(self.a.ids[xi]);
            let leaf = self.steps.leaf(EditOp::Delete {
                left: self.a.ids[xi],
            });
            let step = self.steps.combine(prev.step, leaf);
            self.fd.set(x, 0, Cell { cost, step });
        }

        for y in 1..cols {
            let yj = bl_j + y - 1;
            let prev = self.fd.get(0, y - 1);
            let cost = prev.cost + self.model.insert(self.b.ids[yj]);
            let leaf = self.steps.leaf(EditOp::Insert {
                right: self.b.ids[yj],
            });
            let step = self.steps.combine(prev.step, leaf);
            self.fd.set(0, y, Cell { cost, step });
        }

        for x in 1..rows {
            for y in 1..cols {
                let xi = al_i + x - 1;
                let yj = bl_j + y - 1;

                let del_prev = self.fd.get(x - 1, y);
                let del_cost = del_prev.cost + self.model.delete(self.a.ids[xi]);
                let ins_prev = self.fd.get(x, y - 1);
                let ins_cost = ins_prev.cost + self.model.insert(self.b.ids[yj]);

                if self.a.lmd[xi] == al_i && self.b.lmd[yj] == bl_j {
                    // Both prefixes are whole trees rooted at xi / yj:
                    // the third option is updating one into the other.
                    let upd = self.model.update(self.a.ids[xi], self.b.ids[yj]);
                    let upd_prev = self.fd.get(x - 1, y - 1);
                    let upd_cost = upd_prev.cost + upd;

                    // Ties break upward along delete < insert < update,
                    // so an equal-cost rename keeps the pair linked
                    let cell = if del_cost < ins_cost && del_cost < upd_cost {
                        self.delete_cell(del_prev, xi, del_cost)
                    } else if ins_cost < upd_cost {
                        self.insert_cell(ins_prev, yj, ins_cost)
                    } else {
                        let op = if upd == 0 {
                            EditOp::Match {
                                left: self.a.ids[xi],
                                right: self.b.ids[yj],
                            }
                        } else {
                            EditOp::Rename {
                                left: self.a.ids[xi],
                                right: self.b.ids[yj],
                            }
                        };
                        let leaf = self.steps.leaf(op);
                        Cell {
                            cost: upd_cost,
                            step: self.steps.combine(upd_prev.step, leaf),
                        }
                    };

                    self.set_td(xi, yj, cell);
                    self.fd.set(x, y, cell);
                } else {
                    // Forest case: splice in the already-computed
                    // distance of the subtree pair (xi, yj).
                    let p = self.a.lmd[xi] - al_i;
                    let q = self.b.lmd[yj] - bl_j;
                    let sub_prev = self.fd.get(p, q);
                    let sub = self.td(xi, yj);
                    let sub_cost = sub_prev.cost + sub.cost;

                    let cell = if del_cost < ins_cost && del_cost < sub_cost {
                        self.delete_cell(del_prev, xi, del_cost)
                    } else if ins_cost < sub_cost {
                        self.insert_cell(ins_prev, yj, ins_cost)
                    } else {
                        Cell {
                            cost: sub_cost,
                            step: self.steps.combine(sub_prev.step, sub.step),
                        }
                    };

                    self.fd.set(x, y, cell);
                }
            }
        }
    }

    fn delete_cell(&mut self, prev: Cell, xi: usize, cost: u64) -> Cell {
        let leaf = self.steps.leaf(EditOp::Delete {
            left: self.a.ids[xi],
        });
        Cell {
            cost,
            step: self.steps.combine(prev.step, leaf),
        }
    }

    fn insert_cell(&mut self, prev: Cell, yj: usize, cost: u64) -> Cell {
        let leaf = self.steps.leaf(EditOp::Insert {
            right: self.b.ids[yj],
        });
        Cell {
            cost,
            step: self.steps.combine(prev.step, leaf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftdiff_tree::{NodeKind, add_paragraphs, build_diff_tree};
    use draftdiff_xml::parse;

    fn raw_config() -> DiffConfig {
        DiffConfig {
            raw: true,
            ..DiffConfig::default()
        }
    }

    fn tree_of(xml: &str, config: &DiffConfig) -> DiffTree {
        let mut tree = build_diff_tree(&parse(xml).unwrap(), config);
        if !config.raw {
            add_paragraphs(&mut tree, config);
        }
        tree
    }

    fn script_for(left: &str, right: &str, config: &DiffConfig) -> EditScript {
        let l = tree_of(left, config);
        let r = tree_of(right, config);
        compute_edit_script(&l, &r, config)
    }

    #[test]
    fn test_identical_trees_cost_zero() {
        let config = raw_config();
        let script = script_for("<a><b/></a>", "<a><b/></a>", &config);

        assert_eq!(script.cost, 0);
        assert!(script.is_identity());
        // Document, a, b
        assert_eq!(script.ops.len(), 3);
    }

    #[test]
    fn test_single_insert_costs_one() {
        let config = raw_config();
        let script = script_for("<r><a/></r>", "<r><a/><b/></r>", &config);

        assert_eq!(script.cost, 1);
        assert_eq!(script.change_count(), 1);
        assert!(
            script
                .ops
                .iter()
                .any(|op| matches!(op, EditOp::Insert { .. }))
        );
    }

    #[test]
    fn test_single_delete_costs_ten() {
        let config = raw_config();
        let script = script_for("<r><a/><b/></r>", "<r><a/></r>", &config);

        assert_eq!(script.cost, 10);
        assert_eq!(script.change_count(), 1);
        assert!(
            script
                .ops
                .iter()
                .any(|op| matches!(op, EditOp::Delete { .. }))
        );
    }

    #[test]
    fn test_text_rename_costs_three() {
        let config = raw_config();
        let l = tree_of("<t>foo</t>", &config);
        let r = tree_of("<t>bar</t>", &config);
        let script = compute_edit_script(&l, &r, &config);

        assert_eq!(script.cost, 3);
        let renames: Vec<_> = script
            .ops
            .iter()
            .filter(|op| matches!(op, EditOp::Rename { .. }))
            .collect();
        assert_eq!(renames.len(), 1);

        // The renamed pair is the two text nodes
        if let EditOp::Rename { left, right } = renames[0] {
            assert!(matches!(&l.node(*left).kind, NodeKind::Text(s) if s == "foo"));
            assert!(matches!(&r.node(*right).kind, NodeKind::Text(s) if s == "bar"));
        }
    }

    #[test]
    fn test_tag_equivalence_makes_lists_match() {
        let config = DiffConfig::default();
        let script = script_for("<list><t>x</t></list>", "<ul><li>x</li></ul>", &config);

        assert_eq!(script.cost, 0);
        assert!(script.is_identity());
    }

    #[test]
    fn test_exchange_preserves_change_count() {
        use crate::cost::CostModel;

        let config = raw_config();
        let l = tree_of("<r><a/><b><c/></b></r>", &config);
        let r = tree_of("<r><b><c/><d/></b></r>", &config);

        let forward = compute_edit_script(&l, &r, &config);
        let model = CostModel::new(&r, &l, &config).exchanged();
        let backward = compute_edit_script_with(&r, &l, &config, model);

        assert_eq!(forward.cost, backward.cost);
        assert_eq!(forward.change_count(), backward.change_count());
    }

    #[test]
    fn test_one_operation_per_node() {
        let config = raw_config();
        let l = tree_of("<r><a/><b><c/></b></r>", &config);
        let r = tree_of("<r><b><d/></b></r>", &config);
        let script = compute_edit_script(&l, &r, &config);

        let left_touched = script.ops.iter().filter_map(|op| op.left()).count();
        let right_touched = script.ops.iter().filter_map(|op| op.right()).count();
        assert_eq!(left_touched, l.len());
        assert_eq!(right_touched, r.len());
    }

    #[test]
    fn test_element_rename_beats_delete_insert() {
        // Rename costs 100 but delete+insert costs 11; the solver must
        // take delete+insert for unrelated tags, and match for equal.
        let config = raw_config();
        let script = script_for("<r><x/></r>", "<r><y/></r>", &config);
        assert_eq!(script.cost, 11);
    }

    #[test]
    fn test_text_rename_preferred_over_element_replace() {
        // The delete/insert asymmetry: rewriting the text inside an
        // element is cheaper than replacing the element.
        let config = raw_config();
        let script = script_for("<t>old words</t>", "<t>new words</t>", &config);
        // Document match + t match + text rename
        assert_eq!(script.cost, 3);
        assert_eq!(script.ops.len(), 3);
    }

    #[test]
    fn test_nested_structure_keyroots() {
        let config = raw_config();
        let script = script_for(
            "<a><b><c/><d/></b><e/></a>",
            "<a><b><c/><d/></b><e/></a>",
            &config,
        );
        assert_eq!(script.cost, 0);
        assert_eq!(script.ops.len(), 6);
    }

    #[test]
    fn test_paragraph_rewrite_is_single_rename() {
        let config = DiffConfig::default();
        let script = script_for(
            "<t>the quick brown fox jumps over the lazy dog tonight</t>",
            "<t>the quick brown fox leaps over the lazy dog tonight</t>",
            &config,
        );

        // One paragraph rename, everything else matches
        assert_eq!(script.cost, 1);
        assert_eq!(script.change_count(), 1);
        assert!(
            script
                .ops
                .iter()
                .any(|op| matches!(op, EditOp::Rename { .. }))
        );
    }

    #[test]
    fn test_changed_pi_is_replaced() {
        // A PI rename would cost 50; deleting and reinserting costs 11,
        // so a changed PI shows up as remove+insert.
        let config = raw_config();
        let script = script_for("<?rfc toc=\"yes\"?><r/>", "<?rfc toc=\"no\"?><r/>", &config);
        assert_eq!(script.cost, 11);
        assert_eq!(script.change_count(), 2);
    }
}
