//! The two DOM-evaluator entry points used by the wrap loop (C11): locating
//! a pair's nodes before any program exists ("initial evaluation"), and
//! applying an already-induced program to extract outputs ("evaluation of
//! induced program").

use std::collections::HashMap;

use log::warn;
use markup5ever_rcdom::Handle;
use wpdxf_pairs::Pair;
use wpdxf_xpath::RelativeXPath;

use crate::eval::{eval_relative_xpath, subtree_root};
use crate::html::{descendants, text_content};
use crate::page::WebPage;
use crate::tokenmatch::{token_contains, token_equals};

/// Which of the two custom XPath functions (spec.md §9) governs term
/// matching: `Equals` only accepts an exact token-sequence match, while
/// `Contains` falls back to a contiguous-subsequence match when no exact
/// match exists. Exposed to the CLI as `-tm eq|cn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermMatch {
    Equals,
    Contains,
}

/// Elements whose token-normalised text equals `term`, or (under
/// [`TermMatch::Contains`], if none do) token-contains it, in document
/// order. This is the `token_equals`/`token_contains` matching rule from
/// spec.md §9, applied directly over the arena instead of through a
/// registered XPath function.
fn locate_term(root: &Handle, term: &str, mode: TermMatch) -> Vec<Handle> {
    let mut equal_matches = Vec::new();
    let mut contains_matches = Vec::new();
    for h in descendants(root, false) {
        let text = text_content(&h);
        if token_equals(&text, term) {
            equal_matches.push(h.clone());
        } else if mode == TermMatch::Contains && token_contains(&text, term) {
            contains_matches.push(h);
        }
    }
    if !equal_matches.is_empty() {
        equal_matches
    } else {
        contains_matches
    }
}

/// Locates every candidate `(input, output)` node pair for each example,
/// and every candidate input node for each query, before any extraction
/// program exists. All candidates satisfying `subtree_root(inp, out) != ⊥`
/// are kept — ambiguity between them is the reducer's job (C7), not this
/// function's.
///
/// Parse or evaluation failures remove the page from consideration entirely
/// (spec.md §7 "bad HTML"/"XPath evaluation error"): callers should drop a
/// page for which this function panics... it does not panic; HTML parsing
/// never fails (html5ever always recovers), so the only failure mode left
/// is an empty result, which is not an error.
pub fn evaluate_initial(
    page: &mut WebPage,
    examples: &[(usize, &Pair)],
    queries: &[(usize, &Pair)],
) {
    evaluate_initial_mode(page, examples, queries, TermMatch::Contains)
}

/// Like [`evaluate_initial`], with explicit control over the term-matching
/// rule (spec.md §9; the CLI's `-tm` flag).
pub fn evaluate_initial_mode(
    page: &mut WebPage,
    examples: &[(usize, &Pair)],
    queries: &[(usize, &Pair)],
    mode: TermMatch,
) {
    let root = page.html.root_element();

    for (idx, pair) in examples {
        let (input, output) = match pair {
            Pair::Example { input, output } => (input, output),
            Pair::Query { .. } => continue,
        };
        let inp_matches = locate_term(&root, input, mode);
        let out_matches = locate_term(&root, output, mode);
        if inp_matches.is_empty() || out_matches.is_empty() {
            continue;
        }
        for inp in &inp_matches {
            for out in &out_matches {
                if subtree_root(inp, out).is_some() {
                    page.add_example(*idx, inp.clone(), out.clone());
                }
            }
        }
    }

    for (idx, pair) in queries {
        for inp in locate_term(&root, pair.input(), mode) {
            page.add_query(*idx, inp, None);
        }
    }
}

/// Applies the resource's induced program to every example/query input
/// already located on `page`, replacing stale candidates with the program's
/// actual output. Returns the set of output strings produced per pair
/// index, ready for the wrap loop to fold into a resource-wide table.
///
/// For examples, output candidates are additionally filtered to those whose
/// text token-equals/contains the example's recorded output string; for
/// queries, every result is kept.
pub fn apply_program(
    page: &mut WebPage,
    program: &RelativeXPath,
    vars: &HashMap<String, String>,
    examples: &[(usize, &Pair)],
    queries: &[(usize, &Pair)],
) -> HashMap<usize, Vec<String>> {
    let mut out: HashMap<usize, Vec<String>> = HashMap::new();

    for (idx, pair) in examples {
        let expected = match pair {
            Pair::Example { output, .. } => output,
            Pair::Query { .. } => continue,
        };
        let inputs = page.input_elements(*idx);
        let mut kept = Vec::new();
        for inp in &inputs {
            let results = eval_relative_xpath(inp, program, vars);
            for r in results {
                let text = text_content(&r);
                if token_equals(&text, expected) || token_contains(&text, expected) {
                    kept.push((inp.clone(), r));
                }
            }
        }
        if kept.is_empty() {
            warn!("apply_program: example {idx} produced no matching output on {}", page.url);
            continue;
        }
        page.examples.insert(*idx, kept.clone());
        out.insert(*idx, kept.into_iter().map(|(_, r)| text_content(&r)).collect());
    }

    for (idx, pair) in queries {
        let inputs: Vec<Handle> = page
            .queries
            .get(idx)
            .map(|v| v.iter().map(|(i, _)| i.clone()).collect())
            .unwrap_or_default();
        let mut texts = Vec::new();
        let mut refreshed = Vec::new();
        for inp in inputs {
            let results = eval_relative_xpath(&inp, program, vars);
            for r in &results {
                texts.push(text_content(r));
            }
            refreshed.push((inp, results.into_iter().next()));
        }
        if !refreshed.is_empty() {
            page.queries.insert(*idx, refreshed);
        }
        if !texts.is_empty() {
            out.insert(*idx, texts);
        }
        let _ = pair;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::Html;

    #[test]
    fn evaluate_initial_finds_matching_example_candidates() {
        let html = Html::parse(
            "<html><body><div><span>Input1</span><span>Output1</span></div></body></html>",
        );
        let mut page = WebPage::new("http://example.com", html);
        let pair = Pair::make_example("Input1", "Output1");
        evaluate_initial(&mut page, &[(0, &pair)], &[]);
        assert_eq!(page.input_elements(0).len(), 1);
        assert_eq!(page.output_elements(0).len(), 1);
    }
}
