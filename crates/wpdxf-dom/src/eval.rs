//! Applies a typed [`wpdxf_xpath::XPath`] / [`wpdxf_xpath::RelativeXPath`]
//! directly against the DOM arena (C6 "evaluation of induced program").
//!
//! Because the induced program is already a typed step sequence rather than
//! a string, evaluation walks axes and matches predicates structurally
//! instead of going through a generic textual XPath engine — there is no
//! intermediate string to parse or inject into, which is also how the
//! `$abs_start_path` anchor is discharged: instead of string-comparing a
//! rendered absolute path, the common ancestor is located by testing each
//! ancestor of the input node as a candidate root and checking whether
//! `start_path`, evaluated forward from that candidate, actually selects the
//! input node. `start_path`'s length is *not* a reliable ancestor distance:
//! alignment (C8) widens mismatched steps to `descendant-or-self::node()`
//! whenever pages disagree on structural depth to the input node (spec.md
//! §8 scenario 4), so the number of steps no longer equals the number of
//! `parent()` hops on any given page.

use std::collections::HashMap;

use markup5ever_rcdom::Handle;
use wpdxf_xpath::node::Axis;
use wpdxf_xpath::{Predicate, RelativeXPath, XPath};

use crate::html::{
    ancestors, descendants, element_children, following_siblings, parent, position_among_siblings,
    preceding_siblings, same_node, tag_name, text_content,
};

fn expand_axis(contexts: &[Handle], axis: Axis) -> Vec<Handle> {
    match axis {
        Axis::SelfAxis => contexts.to_vec(),
        Axis::Child => contexts.iter().flat_map(element_children).collect(),
        Axis::Parent => contexts.iter().filter_map(parent).collect(),
        Axis::Descendant => contexts
            .iter()
            .flat_map(|c| descendants(c, false))
            .collect(),
        Axis::DescendantOrSelf => contexts.iter().flat_map(|c| descendants(c, true)).collect(),
        Axis::FollowingSibling => contexts.iter().flat_map(following_siblings).collect(),
        Axis::PrecedingSibling => contexts.iter().flat_map(preceding_siblings).collect(),
        Axis::Ancestor => contexts.iter().flat_map(|c| ancestors(c, false)).collect(),
        Axis::AncestorOrSelf => contexts.iter().flat_map(|c| ancestors(c, true)).collect(),
        // Attribute steps never appear as a node-set producing step in the
        // programs this pipeline induces; attributes only ever show up
        // inside predicates.
        Axis::Attribute => Vec::new(),
    }
}

fn matches_node_test(h: &Handle, node_test: &str) -> bool {
    node_test == wpdxf_xpath::UNIVERSAL_NODE_TEST || tag_name(h).as_deref() == Some(node_test)
}

fn predicate_holds(h: &Handle, predicate: &Predicate, vars: &HashMap<String, String>) -> bool {
    match predicate {
        Predicate::Position(n) => position_among_siblings(h) == *n,
        Predicate::Compare { .. } | Predicate::Bare(_) => false,
        Predicate::SelfTag(tag) => tag_name(h).as_deref() == Some(tag.as_str()),
        Predicate::PrecedingSiblingTag(tag) => preceding_siblings(h)
            .iter()
            .any(|s| tag_name(s).as_deref() == Some(tag.as_str())),
        Predicate::AttributeExists(name) => crate::html::attr(h, name).is_some(),
        Predicate::AttributeEquals { name, var } => {
            crate::html::attr(h, name).as_deref() == vars.get(var).map(|s| s.as_str())
        }
        Predicate::StartsWithText { var } => vars
            .get(var)
            .map(|v| text_content(h).trim_start().starts_with(v.as_str()))
            .unwrap_or(false),
        Predicate::NumericText => {
            let t = text_content(h);
            let t = t.trim();
            !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
        }
    }
}

/// Evaluates `path` with `context` as the initial context node.
pub fn eval_path(context: &Handle, path: &XPath, vars: &HashMap<String, String>) -> Vec<Handle> {
    let mut contexts = vec![context.clone()];
    for node in &path.0 {
        let expanded = expand_axis(&contexts, node.axis);
        let mut filtered: Vec<Handle> = expanded
            .into_iter()
            .filter(|h| matches_node_test(h, &node.node_test))
            .collect();
        if !node.predicates.is_empty() {
            filtered.retain(|h| {
                node.predicates
                    .iter()
                    .all(|disjunction| disjunction.iter().any(|p| predicate_holds(h, p, vars)))
            });
        }
        filtered.dedup_by(|a, b| same_node(a, b));
        contexts = filtered;
    }
    contexts
}

/// Applies a resource's induced `RelativeXPath` starting from a located
/// input node: recovers the common root the program was induced relative to
/// by testing each ancestor of `input_node`, nearest first, as a candidate
/// root — a candidate is viable once `start_path` evaluated from it selects
/// `input_node` itself, discharging the `$abs_start_path` anchor without
/// assuming a fixed ancestor distance. Because a widened (`descendant-or-
/// self::node()`) start step keeps matching at every ancestor once it first
/// matches at one, the nearest viable candidate is not always the one the
/// program was induced against (the same widening can let `end_path` match
/// too shallowly, e.g. against the input node itself); so candidates are
/// tried nearest to farthest and the first one that also yields a non-empty
/// `end_path` result wins. If none do, the nearest viable candidate's
/// (possibly empty) result is returned rather than giving up outright.
pub fn eval_relative_xpath(
    input_node: &Handle,
    rel: &RelativeXPath,
    vars: &HashMap<String, String>,
) -> Vec<Handle> {
    let mut fallback: Option<Vec<Handle>> = None;
    for candidate in ancestors(input_node, true) {
        let selected = eval_path(&candidate, &rel.start_path, vars);
        if !selected.iter().any(|h| same_node(h, input_node)) {
            continue;
        }
        let results = eval_path(&candidate, &rel.end_path, vars);
        if !results.is_empty() {
            return results;
        }
        if fallback.is_none() {
            fallback = Some(results);
        }
    }
    fallback.unwrap_or_default()
}

/// Finds the nearest common ancestor of two nodes (`subtree_root` in the
/// original), or `None` if they belong to disjoint trees.
pub fn subtree_root(a: &Handle, b: &Handle) -> Option<Handle> {
    let ancestors_a = ancestors(a, true);
    let ancestors_b: Vec<Handle> = ancestors(b, true);
    for anc_a in &ancestors_a {
        if ancestors_b.iter().any(|anc_b| same_node(anc_a, anc_b)) {
            return Some(anc_a.clone());
        }
    }
    None
}

/// Builds the absolute `child::tag[position]` chain from `root` down to
/// (but not including) `root` itself, ending at `node` (spec.md §4.5 "step
/// constructor from a DOM element").
pub fn path_from(root: &Handle, node: &Handle) -> XPath {
    let mut chain = ancestors(node, true);
    // `ancestors` returns nearest-first; we want root-to-node order, and we
    // stop once we reach `root`.
    let mut trimmed = Vec::new();
    for h in chain.drain(..) {
        trimmed.push(h.clone());
        if same_node(&h, root) {
            break;
        }
    }
    trimmed.reverse();
    // `trimmed[0]` is `root` itself; steps start from its children.
    let steps = trimmed
        .into_iter()
        .skip(1)
        .map(|h| {
            let tag = tag_name(&h).unwrap_or_else(|| "node()".to_string());
            let mut n = wpdxf_xpath::XPathNode::new(Axis::Child, tag);
            n.add_predicate(vec![Predicate::position(position_among_siblings(&h))]);
            n
        })
        .collect();
    XPath::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::{descendants, tag_name, Html};

    fn find_tag<'a>(root: &Handle, tag: &str) -> Vec<Handle> {
        descendants(root, false)
            .into_iter()
            .filter(|h| tag_name(h).as_deref() == Some(tag))
            .collect()
    }

    #[test]
    fn eval_path_walks_child_axis() {
        let html = Html::parse("<html><body><div><p>x</p></div></body></html>");
        let root = html.root_element();
        let body = find_tag(&root, "body");
        let path = XPath::new(vec![
            wpdxf_xpath::XPathNode::new(Axis::Child, "div"),
            wpdxf_xpath::XPathNode::new(Axis::Child, "p"),
        ]);
        let result = eval_path(&body[0], &path, &HashMap::new());
        assert_eq!(result.len(), 1);
        assert_eq!(tag_name(&result[0]).as_deref(), Some("p"));
    }

    #[test]
    fn subtree_root_finds_nearest_common_ancestor() {
        let html = Html::parse(
            "<html><body><div><p id=\"a\">x</p><p id=\"b\">y</p></div></body></html>",
        );
        let root = html.root_element();
        let ps = find_tag(&root, "p");
        let div = find_tag(&root, "div");
        let common = subtree_root(&ps[0], &ps[1]).unwrap();
        assert!(same_node(&common, &div[0]));
    }

    /// A widened start-step (`descendant-or-self::node()`), as produced by
    /// the aligner/merger when pages disagree on structural depth to the
    /// input node, must still locate the true common root — a fixed
    /// `start_path.len()` parent hop-count does not, since the widened step
    /// absorbs a variable number of actual DOM levels.
    #[test]
    fn eval_relative_xpath_handles_widened_start_path_across_differing_depths() {
        use crate::html::attr;

        // No wrapper around the key; value is the second `span` under root.
        let shallow = Html::parse(
            "<html><body><div>\
               <span class=\"k\">Spain</span><span class=\"v\">Spanish</span>\
             </div></body></html>",
        );
        // Key wrapped one level deeper inside a `<b>`; an extra decorative
        // `span` keeps the value's position (2nd `span` under root) aligned
        // with the shallow page.
        let wrapped = Html::parse(
            "<html><body><div>\
               <b><span class=\"k\">Germany</span></b>\
               <span class=\"extra\">x</span><span class=\"v\">German</span>\
             </div></body></html>",
        );

        // Merged program an aligner/merger would produce across these two
        // shapes: the key step widens to `descendant-or-self::node()`
        // (depths 1 vs 2 disagree) while the value step survives intact
        // (both pages put it at position 2 among `span` siblings of root).
        let start_path = XPath::new(vec![
            wpdxf_xpath::XPathNode::new_test(Axis::DescendantOrSelf),
            {
                let mut n = wpdxf_xpath::XPathNode::new(Axis::Child, "span");
                n.add_predicate(vec![Predicate::position(1)]);
                n
            },
        ]);
        let end_path = {
            let mut n = wpdxf_xpath::XPathNode::new(Axis::Child, "span");
            n.add_predicate(vec![Predicate::position(2)]);
            XPath::new(vec![n])
        };
        let program = RelativeXPath::new(start_path, end_path);
        let vars = HashMap::new();

        for (html, expected) in [(&shallow, "Spanish"), (&wrapped, "German")] {
            let root = html.root_element();
            let key = find_tag(&root, "span")
                .into_iter()
                .find(|h| attr(h, "class").as_deref() == Some("k"))
                .expect("key span present");
            let results = eval_relative_xpath(&key, &program, &vars);
            assert_eq!(results.len(), 1, "expected exactly one output for {expected}");
            assert_eq!(text_content(&results[0]), expected);
        }
    }
}
