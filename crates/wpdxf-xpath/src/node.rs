//! A single XPath step: `axis::node-test[predicates]`.

use std::fmt;

use crate::predicate::Predicate;

/// The ten axes the pipeline ever constructs or compares (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    SelfAxis,
    Child,
    Parent,
    Descendant,
    DescendantOrSelf,
    FollowingSibling,
    PrecedingSibling,
    Ancestor,
    AncestorOrSelf,
    Attribute,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::SelfAxis => "self",
            Axis::Child => "child",
            Axis::Parent => "parent",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::FollowingSibling => "following-sibling",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Attribute => "attribute",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub const UNIVERSAL_NODE_TEST: &str = "node()";

/// One XPath step. Predicates are in conjunctive-normal form: the outer
/// `Vec` is AND-ed together as separate `[...]` brackets, the inner `Vec` is
/// OR-ed together inside a single bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct XPathNode {
    pub axis: Axis,
    pub node_test: String,
    pub predicates: Vec<Vec<Predicate>>,
}

impl XPathNode {
    pub fn new(axis: Axis, node_test: impl Into<String>) -> Self {
        XPathNode {
            axis,
            node_test: node_test.into(),
            predicates: Vec::new(),
        }
    }

    pub fn new_test(axis: Axis) -> Self {
        Self::new(axis, UNIVERSAL_NODE_TEST)
    }

    /// A bare `self::node()` step, used as an alignment placeholder.
    pub fn new_self() -> Self {
        Self::new_test(Axis::SelfAxis)
    }

    pub fn add_predicate(&mut self, disjunction: Vec<Predicate>) {
        self.predicates.push(disjunction);
    }

    pub fn is_universal(&self) -> bool {
        self.node_test == UNIVERSAL_NODE_TEST
    }

    /// Node-test-only equality used by the edit distance and enricher:
    /// ignores predicates.
    pub fn nodetest_eq(&self, other: &XPathNode) -> bool {
        self.node_test == other.node_test
    }

    pub fn predicates_eq(&self, other: &XPathNode) -> bool {
        self.predicates == other.predicates
    }

    /// Serialises this single step. Special-cased the same way the Python
    /// original renders `descendant-or-self::node()` as an empty string
    /// (collapsed into `//` at the path level), `self::node()` as `.`, and
    /// `parent::node()` as `..`, all only when the step carries no
    /// predicates.
    pub fn xpath(&self) -> String {
        if self.predicates.is_empty() {
            match (self.axis, self.node_test.as_str()) {
                (Axis::DescendantOrSelf, UNIVERSAL_NODE_TEST) => return String::new(),
                (Axis::SelfAxis, UNIVERSAL_NODE_TEST) => return ".".to_string(),
                (Axis::Parent, UNIVERSAL_NODE_TEST) => return "..".to_string(),
                _ => {}
            }
        }

        let core = if self.axis == Axis::Child && self.node_test == UNIVERSAL_NODE_TEST {
            "*".to_string()
        } else {
            format!("{}::{}", self.axis, self.node_test)
        };

        let mut out = core;
        for disjunction in &self.predicates {
            let inner = disjunction
                .iter()
                .map(|p| p.xpath())
                .collect::<Vec<_>>()
                .join(" or ");
            out.push('[');
            out.push_str(&inner);
            out.push(']');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descendant_or_self_node_collapses_to_empty() {
        let n = XPathNode::new_test(Axis::DescendantOrSelf);
        assert_eq!(n.xpath(), "");
    }

    #[test]
    fn self_node_collapses_to_dot() {
        assert_eq!(XPathNode::new_self().xpath(), ".");
    }

    #[test]
    fn child_node_test_renders_star() {
        let n = XPathNode::new_test(Axis::Child);
        assert_eq!(n.xpath(), "*");
    }

    #[test]
    fn named_step_renders_axis_and_tag() {
        let n = XPathNode::new(Axis::Child, "table");
        assert_eq!(n.xpath(), "child::table");
    }
}
