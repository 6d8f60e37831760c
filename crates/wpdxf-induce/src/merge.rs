//! Merger (C8, second half): folds a set of aligned, equal-length `XPath`s
//! into a single generalised `XPath`, step by step.
//!
//! Grounded in `original_source/.../nielandt/merge.py`'s `merge`: at each
//! position, any axis disagreement widens to `descendant-or-self::node()`,
//! any node-test disagreement widens the node test to the universal
//! `node()` *and* drops predicates at that step (predicates over a
//! wildcard test are meaningless), and any predicate disagreement alone
//! drops just the predicates. A `self::` step surviving past position 0 is
//! dropped — it is only a legitimate alignment placeholder at the very
//! start of the path (anchoring the subtree root itself).

use wpdxf_xpath::node::Axis;
use wpdxf_xpath::{XPath, XPathNode};

/// Merges `xpaths` (all the same length, per [`crate::align::align`])
/// into a single generalised path. Panics if `xpaths` is empty or the
/// lengths disagree — both are invariants the caller (the inducer) must
/// uphold by aligning first.
pub fn merge(xpaths: &[XPath]) -> XPath {
    assert!(!xpaths.is_empty(), "merge requires at least one xpath");
    let len = xpaths[0].len();
    for xp in xpaths {
        assert_eq!(xp.len(), len, "merge requires pre-aligned, equal-length xpaths");
    }

    let mut result = XPath::empty();

    for i in 0..len {
        let mut axis = xpaths[0][i].axis;
        let mut node_test = xpaths[0][i].node_test.clone();
        let mut predicates = Some(xpaths[0][i].predicates.clone());

        for xp in &xpaths[1..] {
            let step = &xp[i];

            if axis != step.axis {
                axis = Axis::DescendantOrSelf;
            }

            if node_test != step.node_test {
                node_test = wpdxf_xpath::UNIVERSAL_NODE_TEST.to_string();
                predicates = None;
            }

            if predicates.as_ref() != Some(&step.predicates) {
                predicates = None;
            }
        }

        if i > 0 && axis == Axis::SelfAxis {
            continue;
        }

        let mut node = XPathNode::new(axis, node_test);
        if let Some(preds) = predicates {
            node.predicates = preds;
        }
        result.push(node);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpdxf_xpath::Predicate;

    fn step(axis: Axis, tag: &str) -> XPathNode {
        XPathNode::new(axis, tag)
    }

    #[test]
    fn identical_steps_are_preserved() {
        let p0 = XPath::new(vec![step(Axis::Child, "body"), step(Axis::Child, "table")]);
        let p1 = p0.clone();
        let merged = merge(&[p0, p1]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].node_test, "body");
        assert_eq!(merged[1].node_test, "table");
    }

    #[test]
    fn axis_disagreement_widens_to_descendant_or_self() {
        let p0 = XPath::new(vec![step(Axis::Child, "table")]);
        let p1 = XPath::new(vec![step(Axis::FollowingSibling, "table")]);
        let merged = merge(&[p0, p1]);
        assert_eq!(merged[0].axis, Axis::DescendantOrSelf);
        assert_eq!(merged[0].node_test, "table");
    }

    #[test]
    fn nodetest_disagreement_widens_to_universal_and_drops_predicates() {
        let mut n0 = step(Axis::Child, "td");
        n0.add_predicate(vec![Predicate::Position(1)]);
        let p0 = XPath::new(vec![n0]);
        let p1 = XPath::new(vec![step(Axis::Child, "th")]);
        let merged = merge(&[p0, p1]);
        assert!(merged[0].is_universal());
        assert!(merged[0].predicates.is_empty());
    }

    #[test]
    fn predicate_disagreement_alone_drops_predicates_but_keeps_nodetest() {
        let mut n0 = step(Axis::Child, "td");
        n0.add_predicate(vec![Predicate::Position(1)]);
        let mut n1 = step(Axis::Child, "td");
        n1.add_predicate(vec![Predicate::Position(2)]);
        let merged = merge(&[XPath::new(vec![n0]), XPath::new(vec![n1])]);
        assert_eq!(merged[0].node_test, "td");
        assert!(merged[0].predicates.is_empty());
    }

    #[test]
    fn leading_self_placeholder_is_kept_but_later_ones_are_dropped() {
        let p0 = XPath::new(vec![
            XPathNode::new_self(),
            step(Axis::Child, "body"),
            XPathNode::new_self(),
            step(Axis::Child, "table"),
        ]);
        let p1 = p0.clone();
        let merged = merge(&[p0, p1]);
        // The leading self:: survives, the interior one is dropped.
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].axis, Axis::SelfAxis);
        assert_eq!(merged[1].node_test, "body");
        assert_eq!(merged[2].node_test, "table");
    }
}
