//! Predicate enricher (C9): classifies, per induced step, which DOM nodes
//! a truncated prefix of the generalised path would select beyond the
//! true target (`overflow`) versus at it (`indicated`), then narrows the
//! step with predicates until indicated/overflow stop overlapping.
//!
//! Grounded in `original_source/.../nielandt/enrichment.py`'s
//! `preprocess`/`enrich`/`enrich_step` and its four enrichment functions
//! (`_preceding_sibling`, `_similar_attributes`, `_node_names`,
//! `_common_prefixes`; `_close_neighbours` and `_neighbourhood_search` are
//! left unfinished in both retrieved variants and are not ported, per
//! spec.md §4.9's Open Question (a)).
//!
//! `preprocess` here classifies nodes structurally (ancestor-chain identity
//! against the known true target) instead of the original's
//! string-rendered-XPath-with-`$abs_start_path`-anchor probe: this
//! evaluator already holds a typed `Handle` for every node, so there is no
//! string to re-parse or inject a variable into. spec.md §4.9 itself
//! describes the step as "classifying its result against the ancestor
//! chain of the true target", which is exactly what this does.
//! `_node_names`'s numeric-discriminator branch fixes a same-variable-
//! checked-twice slip in the Python (`indicated_int_nodes` tested against
//! itself where `overflow_int_nodes` was meant): spec.md §4.9 states the
//! intended rule plainly ("if every indicated text is numeric and no
//! overflow text is"), so that is what is implemented.

use std::collections::{BTreeSet, HashMap};

use wpdxf_dom::html::{attr, attr_names, preceding_siblings, same_node, tag_name, text_content};
use wpdxf_dom::{eval_path, Handle};
use wpdxf_xpath::{AttributePredicate, Predicate, XPath};

/// Per-step classification: the nodes a truncated path prefix selects that
/// coincide with the true target (`indicated`) and those that don't
/// (`overflow`).
pub struct StepClassification {
    pub indicated: Vec<Handle>,
    pub overflow: Vec<Handle>,
}

fn contains(nodes: &[Handle], target: &Handle) -> bool {
    nodes.iter().any(|h| same_node(h, target))
}

/// Root-to-node chain of ancestors, inclusive of both ends, in root-first
/// order (mirrors `wpdxf_dom::eval::path_from`'s own trimming loop, which
/// this mirrors rather than reuses since it needs `Handle`s, not
/// `XPathNode`s).
fn root_to_node_chain(root: &Handle, node: &Handle) -> Vec<Handle> {
    let mut chain = wpdxf_dom::html::ancestors(node, true);
    let mut trimmed = Vec::new();
    for h in chain.drain(..) {
        trimmed.push(h.clone());
        if same_node(&h, root) {
            break;
        }
    }
    trimmed.reverse();
    trimmed
}

/// For every step in `xpath_g`, evaluates the prefix ending at that step
/// from each example's common root and classifies the results against the
/// known true path down to that example's end node.
pub fn preprocess(
    xpath_g: &XPath,
    examples: &[(Handle, Handle)],
    vars: &HashMap<String, String>,
) -> Vec<StepClassification> {
    let mut result = Vec::with_capacity(xpath_g.len());

    for i in 0..xpath_g.len() {
        let prefix = XPath::new(xpath_g.0[..=i].to_vec());
        let mut indicated: Vec<Handle> = Vec::new();
        let mut overflow: Vec<Handle> = Vec::new();

        for (common_root, end_node) in examples {
            let chain = root_to_node_chain(common_root, end_node);
            if i + 1 >= chain.len() {
                continue;
            }
            let truth = &chain[i + 1];
            let eval_out = eval_path(common_root, &prefix, vars);

            for cand in eval_out {
                if same_node(&cand, truth) {
                    if !contains(&indicated, &cand) {
                        indicated.push(cand);
                    }
                } else if !contains(&overflow, &cand) {
                    overflow.push(cand);
                }
            }
            overflow.retain(|h| !contains(&indicated, h));
        }

        result.push(StepClassification { indicated, overflow });
    }

    result
}

/// Enriches every step of `xpath` whose classification is non-trivial
/// (spec.md §4.9: "skipped entirely when overflow is empty or when fewer
/// than one indicated node exists").
pub fn enrich(xpath: &mut XPath, classifications: &[StepClassification], variables: &mut HashMap<String, String>) {
    for (step, classification) in xpath.0.iter_mut().zip(classifications) {
        if classification.overflow.is_empty() || classification.indicated.is_empty() {
            continue;
        }
        enrich_step(step, &classification.indicated, &classification.overflow, variables);
    }
}

fn enrich_step(
    step: &mut wpdxf_xpath::XPathNode,
    indicated: &[Handle],
    overflow: &[Handle],
    variables: &mut HashMap<String, String>,
) {
    preceding_sibling(step, indicated, overflow);
    similar_attributes(step, indicated, overflow, variables);
    node_names(step, indicated, overflow);
    common_prefixes(step, indicated, variables);
}

fn tag_set(nodes: &[Handle], f: impl Fn(&Handle) -> Vec<Handle>) -> BTreeSet<String> {
    nodes
        .iter()
        .flat_map(|n| f(n).into_iter().filter_map(|s| tag_name(&s)))
        .collect()
}

fn preceding_sibling(step: &mut wpdxf_xpath::XPathNode, indicated: &[Handle], overflow: &[Handle]) {
    if indicated.is_empty() {
        return;
    }

    let mut indicated_tags: Option<BTreeSet<String>> = None;
    for node in indicated {
        let tags: BTreeSet<String> = preceding_siblings(node).iter().filter_map(tag_name).collect();
        indicated_tags = Some(match indicated_tags {
            None => tags,
            Some(acc) => acc.intersection(&tags).cloned().collect(),
        });
    }
    let indicated_tags = indicated_tags.unwrap_or_default();

    let overflow_tags: BTreeSet<String> = if overflow.is_empty() {
        BTreeSet::new()
    } else {
        tag_set(overflow, preceding_siblings)
    };

    for tag in indicated_tags.difference(&overflow_tags) {
        step.add_predicate(vec![Predicate::PrecedingSiblingTag(tag.clone())]);
    }
}

fn similar_attributes(
    step: &mut wpdxf_xpath::XPathNode,
    indicated: &[Handle],
    _overflow: &[Handle],
    variables: &mut HashMap<String, String>,
) {
    if indicated.is_empty() {
        return;
    }

    let mut common_keys: Option<BTreeSet<String>> = None;
    for node in indicated {
        let keys: BTreeSet<String> = attr_names(node).into_iter().collect();
        common_keys = Some(match common_keys {
            None => keys,
            Some(acc) => acc.intersection(&keys).cloned().collect(),
        });
    }
    let common_keys = common_keys.unwrap_or_default();

    for key in common_keys {
        let first_value = attr(&indicated[0], &key);
        let all_equal = indicated.iter().all(|n| attr(n, &key) == first_value);
        if all_equal {
            if let Some(value) = first_value {
                let pred = AttributePredicate::equals(&key, &value, variables);
                step.add_predicate(vec![pred]);
            }
        } else {
            step.add_predicate(vec![AttributePredicate::exists(&key)]);
        }
    }
}

fn is_numeric_text(node: &Handle) -> bool {
    let t = text_content(node);
    let t = t.trim();
    !t.is_empty() && t.chars().all(|c| c.is_ascii_digit())
}

fn node_names(step: &mut wpdxf_xpath::XPathNode, indicated: &[Handle], overflow: &[Handle]) {
    if overflow.is_empty() {
        return;
    }

    let indicated_names: BTreeSet<String> = indicated.iter().filter_map(tag_name).collect();
    let overflow_names: BTreeSet<String> = overflow.iter().filter_map(tag_name).collect();

    if indicated_names.intersection(&overflow_names).next().is_none() {
        let disjunction = indicated_names.into_iter().map(Predicate::SelfTag).collect();
        step.add_predicate(disjunction);
        return;
    }

    let indicated_numeric = indicated.iter().filter(|n| is_numeric_text(n)).count();
    let overflow_numeric = overflow.iter().filter(|n| is_numeric_text(n)).count();
    if indicated_numeric == indicated.len() && overflow_numeric == 0 {
        step.add_predicate(vec![Predicate::NumericText]);
    }
}

fn common_prefixes(step: &mut wpdxf_xpath::XPathNode, indicated: &[Handle], variables: &mut HashMap<String, String>) {
    if indicated.is_empty() {
        return;
    }
    let strings: Vec<String> = indicated.iter().map(text_content).collect();
    let min_len = strings.iter().map(|s| s.chars().count()).min().unwrap_or(0);
    let first_chars: Vec<char> = strings[0].chars().collect();

    let mut lcp = String::new();
    'outer: for i in 0..min_len {
        let c = first_chars[i];
        for s in &strings {
            if s.chars().nth(i) != Some(c) {
                break 'outer;
            }
        }
        lcp.push(c);
    }

    if !lcp.is_empty() {
        step.add_predicate(vec![wpdxf_xpath::starts_with_text(&lcp, variables)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpdxf_dom::html::{descendants, tag_name, Html};

    fn find_tag(root: &Handle, tag: &str) -> Vec<Handle> {
        descendants(root, false)
            .into_iter()
            .filter(|h| tag_name(h).as_deref() == Some(tag))
            .collect()
    }

    #[test]
    fn node_names_adds_self_tag_disjunction_when_tags_disjoint() {
        let html = Html::parse("<html><body><p>a</p><div>b</div></body></html>");
        let root = html.root_element();
        let ps = find_tag(&root, "p");
        let divs = find_tag(&root, "div");
        let mut step = wpdxf_xpath::XPathNode::new_test(wpdxf_xpath::Axis::Child);
        node_names(&mut step, &ps, &divs);
        assert_eq!(step.predicates.len(), 1);
        assert!(matches!(step.predicates[0][0], Predicate::SelfTag(ref t) if t == "p"));
    }

    #[test]
    fn similar_attributes_detects_equal_and_differing_values() {
        let html = Html::parse(
            "<html><body><div class=\"x\" id=\"a\">1</div><div class=\"x\" id=\"b\">2</div></body></html>",
        );
        let root = html.root_element();
        let divs = find_tag(&root, "div");
        let mut step = wpdxf_xpath::XPathNode::new_test(wpdxf_xpath::Axis::Child);
        let mut vars = HashMap::new();
        similar_attributes(&mut step, &divs, &[], &mut vars);
        // class is equal across both -> AttributeEquals; id differs -> AttributeExists.
        assert_eq!(step.predicates.len(), 2);
    }

    /// spec.md §8 scenario 5's worked example: a `body` step indicated
    /// across two pages that both have a preceding `<head>`, and no
    /// overflow at all, should pick up the preceding-sibling discriminator.
    #[test]
    fn preceding_sibling_adds_predicate_when_only_indicated_has_the_sibling() {
        let html0 = Html::parse(
            "<html><head></head><body><div><div key=\"target\"></div></div></body></html>",
        );
        let html1 = Html::parse(
            "<html><head></head><body><div><div key=\"error\"></div><div key=\"target\"></div></div></body></html>",
        );
        let mut indicated = find_tag(&html0.root_element(), "body");
        indicated.extend(find_tag(&html1.root_element(), "body"));

        let mut step = wpdxf_xpath::XPathNode::new(wpdxf_xpath::Axis::Child, "body");
        step.add_predicate(vec![Predicate::position(1)]);
        preceding_sibling(&mut step, &indicated, &[]);

        assert_eq!(step.predicates.len(), 2);
        assert!(matches!(
            step.predicates[1][0],
            Predicate::PrecedingSiblingTag(ref t) if t == "head"
        ));
    }

    /// Same tag under both step slots: when the overflow node also sits
    /// right after a `<head>`, the discriminator no longer distinguishes
    /// indicated from overflow and must not be added.
    #[test]
    fn preceding_sibling_skips_predicate_when_overflow_shares_the_sibling() {
        let html0 = Html::parse(
            "<html><head></head><body><div><div key=\"target\"></div></div></body></html>",
        );
        let html1 = Html::parse(
            "<html><head></head><body><div><div key=\"error\"></div><div key=\"target\"></div></div></body></html>",
        );
        let indicated = find_tag(&html0.root_element(), "body");
        let overflow = find_tag(&html1.root_element(), "body");

        let mut step = wpdxf_xpath::XPathNode::new(wpdxf_xpath::Axis::Child, "body");
        step.add_predicate(vec![Predicate::position(1)]);
        preceding_sibling(&mut step, &indicated, &overflow);

        assert_eq!(step.predicates.len(), 1);
    }

    #[test]
    fn common_prefixes_finds_longest_shared_lead() {
        let html = Html::parse("<html><body><p>USD100</p><p>USD250</p></body></html>");
        let root = html.root_element();
        let ps = find_tag(&root, "p");
        let mut step = wpdxf_xpath::XPathNode::new_test(wpdxf_xpath::Axis::Child);
        let mut vars = HashMap::new();
        common_prefixes(&mut step, &ps, &mut vars);
        assert_eq!(step.predicates.len(), 1);
        assert_eq!(vars.values().next().map(|s| s.as_str()), Some("USD"));
    }
}
