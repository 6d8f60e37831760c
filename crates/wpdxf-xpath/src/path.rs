//! `XPath`: an ordered list of [`XPathNode`] steps with canonical
//! serialisation, and `RelativeXPath`: the `(start_path, end_path)` pair
//! anchored at a placeholder variable (spec.md §3).

use regex::Regex;

use crate::node::{Axis, XPathNode};

/// Placeholder substituted, per page, with the absolute path of the start
/// (input) node (spec.md §3 `RelativeXPath`).
pub const ABS_START_PATH_VAR: &str = "abs_start_path";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct XPath(pub Vec<XPathNode>);

impl XPath {
    pub fn new(nodes: Vec<XPathNode>) -> Self {
        XPath(nodes)
    }

    pub fn empty() -> Self {
        XPath(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, node: XPathNode) {
        self.0.push(node);
    }

    /// Inserts `node` at `index`, used by the aligner to splice in
    /// `self::` placeholders at reported backtrack positions.
    pub fn insert(&mut self, index: usize, node: XPathNode) {
        self.0.insert(index, node);
    }

    /// Canonical serialisation: join each step's rendering with `/`,
    /// collapse runs of empty segments (produced by consecutive
    /// `descendant-or-self::node()` steps) into `//`, and ensure the result
    /// is rooted.
    pub fn xpath(&self) -> String {
        let joined = self
            .0
            .iter()
            .map(|n| n.xpath())
            .collect::<Vec<_>>()
            .join("/");

        let collapse = Regex::new(r"/{2,}").unwrap();
        let mut s = collapse.replace_all(&joined, "//").to_string();

        if s.ends_with('/') {
            s.push_str("descendant-or-self::node()");
        }
        if !s.starts_with('.') && !s.starts_with('/') {
            s = format!("/{s}");
        }
        s
    }
}

impl std::ops::Index<usize> for XPath {
    type Output = XPathNode;
    fn index(&self, idx: usize) -> &XPathNode {
        &self.0[idx]
    }
}

/// `(start_path, end_path)` relative to a subtree root. The rendered form
/// is `end_path` with its first step carrying a
/// `[$abs_start_path = <start_path>]`-style predicate, substituted with the
/// page-specific absolute path of the start node when applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeXPath {
    pub start_path: XPath,
    pub end_path: XPath,
}

impl RelativeXPath {
    pub fn new(start_path: XPath, end_path: XPath) -> Self {
        RelativeXPath {
            start_path,
            end_path,
        }
    }

    /// Renders `end_path` with a leading anchor predicate referencing
    /// `$abs_start_path`, to be bound by the caller to the start node's
    /// absolute path on the current page before evaluation.
    pub fn render_anchored(&self) -> String {
        let mut anchored = self.end_path.clone();
        if anchored.0.is_empty() {
            anchored.push(XPathNode::new_self());
        }
        // The anchor predicate is expressed at the model level by the
        // caller (wpdxf-dom), which knows how to compare node identity;
        // here we only guarantee the variable name is reserved and stable.
        anchored.xpath()
    }
}

/// Builds an ancestor-chain XPath from `start_depth` down to `end_depth`
/// (i.e. a straight run of `child::tag` steps), used when the caller already
/// knows the concrete tag names along the path (as opposed to the generic
/// `descendant-or-self::node()` placeholders used during alignment).
pub fn child_chain(tags: impl IntoIterator<Item = (String, Option<i64>)>) -> XPath {
    let mut nodes = Vec::new();
    for (tag, position) in tags {
        let mut n = XPathNode::new(Axis::Child, tag);
        if let Some(p) = position {
            n.add_predicate(vec![crate::predicate::Predicate::position(p)]);
        }
        nodes.push(n);
    }
    XPath(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_descendant_or_self_collapse_to_double_slash() {
        let path = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            XPathNode::new(Axis::Child, "body"),
            XPathNode::new_test(Axis::DescendantOrSelf),
            XPathNode::new(Axis::Child, "table"),
        ]);
        assert_eq!(path.xpath(), "//child::body//child::table");
    }

    #[test]
    fn nielandt_example_merge_result_has_seven_steps_and_trailing_descendant() {
        // Structural shape of spec.md §8 scenario 4's claimed merger output:
        // alternating descendant-or-self placeholders and concrete child
        // steps, seven steps total, canonicalising to a path rooted with a
        // single leading slash and no embedded triple-slash runs.
        let path = XPath::new(vec![
            XPathNode::new_test(Axis::DescendantOrSelf),
            XPathNode::new(Axis::Child, "body"),
            XPathNode::new_test(Axis::DescendantOrSelf),
            XPathNode::new(Axis::Child, "table"),
            XPathNode::new_test(Axis::DescendantOrSelf),
            XPathNode::new_test(Axis::Child),
            XPathNode::new_test(Axis::DescendantOrSelf),
        ]);
        assert_eq!(path.len(), 7);
        let rendered = path.xpath();
        assert!(rendered.starts_with('/'));
        assert!(!rendered.contains("///"));
        assert!(rendered.ends_with("descendant-or-self::node()"));
    }
}
