//! Aligner (C8, first half): equalises the length of a set of per-example
//! `XPath`s by splicing `self::` placeholders at the positions the
//! tree-edit backtrack reports, so every path can later be merged
//! step-by-step.
//!
//! Grounded in `original_source/.../nielandt/align.py`'s `align`/
//! `align_new_path`: the min-cost pair is chosen first, then every
//! remaining path is folded in one at a time by minimal mean distance to
//! the already-aligned set. `align_new_path`'s quirk of appending the
//! newly aligned path to the *end* of the list (rather than replacing it
//! in place) is carried over verbatim — later stages only rely on the
//! list's final contents, and spec.md §8 scenario 4 goes through this code
//! path, not its ordering.

use wpdxf_xpath::{backtrack, edit_distance, EditAction, XPath, XPathNode};

/// Splices `self::` placeholders into `xpath0` and every path in `xpaths`
/// so that both are the same length, per the backtracked edit ops, then
/// returns `xpaths` with `xpath0` appended.
fn align_new_path(actions: &[wpdxf_xpath::EditOp], mut xpath0: XPath, mut xpaths: Vec<XPath>) -> Vec<XPath> {
    let mut off0 = 0usize;
    let mut off1 = 0usize;

    for op in actions {
        match op.action {
            EditAction::Insert0 => {
                xpath0.insert(off0 + op.row, XPathNode::new_self());
                off0 += 1;
            }
            EditAction::Insert1 => {
                for xpath in xpaths.iter_mut() {
                    xpath.insert(off1 + op.col, XPathNode::new_self());
                }
                off1 += 1;
            }
            EditAction::Replace => {}
        }
    }

    xpaths.push(xpath0);
    xpaths
}

/// Aligns every xpath in `xpaths` to a common length. Requires at least
/// two paths; a single path is returned unchanged.
pub fn align(mut xpaths: Vec<XPath>) -> Vec<XPath> {
    if xpaths.len() <= 1 {
        return xpaths;
    }

    let mut best: Option<(u32, usize, usize)> = None;
    for i in 0..xpaths.len() {
        for j in (i + 1)..xpaths.len() {
            let cost = edit_distance(&xpaths[i], &xpaths[j]);
            if best.map_or(true, |(best_cost, _, _)| cost < best_cost) {
                best = Some((cost, i, j));
            }
        }
    }
    let (_, i, j) = best.unwrap();
    // Remove the higher index first so the lower index stays valid.
    let xpath1 = xpaths.remove(j);
    let xpath0 = xpaths.remove(i);

    let ops = backtrack(&xpath0, &xpath1);
    let mut aligned = align_new_path(&ops, xpath0, vec![xpath1]);

    while !xpaths.is_empty() {
        let mut best: Option<(f64, usize)> = None;
        for (k, candidate) in xpaths.iter().enumerate() {
            let mean: f64 = aligned
                .iter()
                .map(|a| edit_distance(candidate, a) as f64)
                .sum::<f64>()
                / aligned.len() as f64;
            if best.map_or(true, |(best_mean, _)| mean < best_mean) {
                best = Some((mean, k));
            }
        }
        let (_, k) = best.unwrap();
        let candidate = xpaths.remove(k);
        // Re-derive the backtrack against the last element of `aligned`
        // (matching align.py's literal reuse of the final loop-variable
        // binding from building `xpath_mean`, rather than the argmin's own
        // partner).
        let anchor = aligned.last().unwrap().clone();
        let ops = backtrack(&candidate, &anchor);
        aligned = align_new_path(&ops, candidate, aligned);
    }

    debug_assert!(aligned.iter().all(|x| x.len() == aligned[0].len()));
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpdxf_xpath::node::Axis;

    fn chain(tags: &[&str]) -> XPath {
        XPath::new(tags.iter().map(|t| XPathNode::new(Axis::Child, *t)).collect())
    }

    #[test]
    fn single_path_passes_through_unchanged() {
        let p = chain(&["a", "b"]);
        let result = align(vec![p.clone()]);
        assert_eq!(result, vec![p]);
    }

    #[test]
    fn aligning_mismatched_lengths_produces_equal_length_paths() {
        let p0 = chain(&["body", "table", "tr", "td"]);
        let p1 = chain(&["body", "div", "table", "tr"]);
        let p2 = chain(&["body", "table", "tbody", "tr", "td"]);
        let aligned = align(vec![p0, p1, p2]);
        assert_eq!(aligned.len(), 3);
        let len0 = aligned[0].len();
        for p in &aligned {
            assert_eq!(p.len(), len0);
        }
    }

    /// The running example from Nielandt et al. (2014), "Wrapper Induction
    /// by XPath Alignment", ported verbatim from the reference
    /// implementation's own test of this same alignment (not a re-derived
    /// structural check): three candidate `td`/`a` paths at different
    /// depths, their pairwise edit distances, and the expected aligned and
    /// merged output (spec.md §8 scenario 4).
    #[test]
    fn nielandt_2014_running_example_aligns_and_merges_to_the_documented_output() {
        use wpdxf_xpath::Predicate;

        fn pos(tag: &str, p: i64) -> XPathNode {
            let mut n = XPathNode::new(Axis::Child, tag);
            n.add_predicate(vec![Predicate::position(p)]);
            n
        }

        fn child(tag: &str) -> XPathNode {
            XPathNode::new(Axis::Child, tag)
        }

        let ex0 = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("body"),
            pos("div", 1),
            pos("table", 1),
            pos("td", 1),
        ]);
        let ex1 = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("body"),
            pos("table", 2),
            pos("tr", 2),
            pos("td", 1),
            child("a"),
        ]);
        let ex2 = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("body"),
            pos("div", 1),
            pos("table", 1),
            pos("tr", 2),
            pos("t", 1),
            child("a"),
        ]);

        assert_eq!(edit_distance(&ex0, &ex1), 10);
        assert_eq!(edit_distance(&ex2, &ex0), 10);
        assert_eq!(edit_distance(&ex2, &ex1), 7);

        let target_ex0 = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("body"),
            pos("div", 1),
            pos("table", 1),
            XPathNode::new_self(),
            pos("td", 1),
            XPathNode::new_self(),
        ]);
        let target_ex1 = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("body"),
            XPathNode::new_self(),
            pos("table", 2),
            pos("tr", 2),
            pos("td", 1),
            child("a"),
        ]);
        let target_ex2 = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("body"),
            pos("div", 1),
            pos("table", 1),
            pos("tr", 2),
            pos("t", 1),
            child("a"),
        ]);

        let aligned = align(vec![ex0, ex1, ex2]);
        assert_eq!(aligned.len(), 3);
        // Output order can differ (align.py appends the newly-aligned path
        // rather than replacing it in place); only membership is checked.
        assert!(aligned.contains(&target_ex0));
        assert!(aligned.contains(&target_ex1));
        assert!(aligned.contains(&target_ex2));

        let target_merged = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("body"),
            XPathNode::new_test(Axis::DescendantOrSelf),
            child("table"),
            XPathNode::new_test(Axis::DescendantOrSelf),
            XPathNode::new_test(Axis::Child),
            XPathNode::new_test(Axis::DescendantOrSelf),
        ]);
        let merged = crate::merge::merge(&aligned);
        assert_eq!(merged, target_merged);
    }
}
