//! Wagner-Fischer tree-edit distance over XPath step sequences, plus
//! backtracking into an ordered list of insertion actions (spec.md §4.7,
//! §4.8). Used both by the reducer (picking min/max mean-cost candidates)
//! and the aligner (equalising path lengths).

use crate::node::XPathNode;
use crate::path::XPath;

pub const INSERT_COST: u32 = 4;

fn replace_cost(a: &XPathNode, b: &XPathNode) -> u32 {
    let axis_mismatch = (a.axis != b.axis) as u32;
    let predicates_mismatch = (!a.predicates_eq(b)) as u32;
    let nodetest_mismatch = (!a.nodetest_eq(b)) as u32;
    axis_mismatch * 1 + predicates_mismatch * 1 + nodetest_mismatch * 2
}

/// Which side of the backtracked pair an insertion happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    /// Steps at this position were aligned (possibly a substitution).
    Replace,
    /// A placeholder must be inserted into the *first* path at this
    /// position to keep it level with the second.
    Insert0,
    /// A placeholder must be inserted into the *second* path at this
    /// position.
    Insert1,
}

/// One backtracked edit step: `(row, col, action)`, rows/cols index into
/// `xpath0`/`xpath1` respectively (0 = "before the first step").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOp {
    pub row: usize,
    pub col: usize,
    pub action: EditAction,
}

/// Full Wagner-Fischer DP matrix, `(len(xpath0)+1) x (len(xpath1)+1)`.
fn distance_matrix(xpath0: &XPath, xpath1: &XPath) -> Vec<Vec<u32>> {
    let n = xpath0.len();
    let m = xpath1.len();
    let mut d = vec![vec![0u32; m + 1]; n + 1];

    for i in 1..=n {
        d[i][0] = d[i - 1][0] + INSERT_COST;
    }
    for j in 1..=m {
        d[0][j] = d[0][j - 1] + INSERT_COST;
    }

    for i in 1..=n {
        for j in 1..=m {
            let sub = d[i - 1][j - 1] + replace_cost(&xpath0.0[i - 1], &xpath1.0[j - 1]);
            let del = d[i - 1][j] + INSERT_COST;
            let ins = d[i][j - 1] + INSERT_COST;
            d[i][j] = sub.min(del).min(ins);
        }
    }

    d
}

/// Edit distance between two XPaths (step sequences).
pub fn edit_distance(xpath0: &XPath, xpath1: &XPath) -> u32 {
    let d = distance_matrix(xpath0, xpath1);
    d[xpath0.len()][xpath1.len()]
}

/// Reconstructs the ordered list of edit operations taken by the optimal
/// alignment, walking back from `(n, m)` to `(0, 0)`. Ties are broken in
/// the fixed order substitution > deletion (insert into xpath1) > insertion
/// (insert into xpath0), which makes backtracking deterministic.
pub fn backtrack(xpath0: &XPath, xpath1: &XPath) -> Vec<EditOp> {
    let d = distance_matrix(xpath0, xpath1);
    let mut i = xpath0.len();
    let mut j = xpath1.len();
    let mut ops = Vec::new();

    while i > 0 && j > 0 {
        let sub = d[i - 1][j - 1] + replace_cost(&xpath0.0[i - 1], &xpath1.0[j - 1]);
        if d[i][j] == sub {
            ops.push(EditOp {
                row: i - 1,
                col: j - 1,
                action: EditAction::Replace,
            });
            i -= 1;
            j -= 1;
            continue;
        }
        let del = d[i - 1][j] + INSERT_COST;
        if d[i][j] == del {
            // A step exists in xpath0 with no counterpart in xpath1: xpath1
            // needs a placeholder inserted at this position.
            ops.push(EditOp {
                row: i - 1,
                col: j,
                action: EditAction::Insert1,
            });
            i -= 1;
            continue;
        }
        // Otherwise an insertion: xpath0 needs a placeholder.
        ops.push(EditOp {
            row: i,
            col: j - 1,
            action: EditAction::Insert0,
        });
        j -= 1;
    }
    while i > 0 {
        ops.push(EditOp {
            row: i - 1,
            col: j,
            action: EditAction::Insert1,
        });
        i -= 1;
    }
    while j > 0 {
        ops.push(EditOp {
            row: i,
            col: j - 1,
            action: EditAction::Insert0,
        });
        j -= 1;
    }

    ops.reverse();
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Axis;

    fn chain(tags: &[&str]) -> XPath {
        XPath::new(tags.iter().map(|t| XPathNode::new(Axis::Child, *t)).collect())
    }

    #[test]
    fn identical_paths_have_zero_distance() {
        let p = chain(&["a", "b", "c"]);
        assert_eq!(edit_distance(&p, &p), 0);
    }

    #[test]
    fn one_extra_step_costs_one_insertion() {
        let p0 = chain(&["a", "b"]);
        let p1 = chain(&["a", "b", "c"]);
        assert_eq!(edit_distance(&p0, &p1), INSERT_COST);
    }

    #[test]
    fn backtrack_covers_every_row_and_column() {
        let p0 = chain(&["a", "x"]);
        let p1 = chain(&["a", "b", "x"]);
        let ops = backtrack(&p0, &p1);
        // Every op's row is within bounds and ops are produced in
        // left-to-right (non-decreasing) order for deterministic insertion.
        let mut last_row = 0usize;
        let mut last_col = 0usize;
        for op in &ops {
            assert!(op.row <= p0.len());
            assert!(op.col <= p1.len());
            assert!(op.row >= last_row || op.col >= last_col);
            last_row = op.row;
            last_col = op.col;
        }
    }
}
