//! Wrap loop (C11): per-resource refine-until-table loop.
//!
//! Grounded in `original_source/.../wrapping/wrap.py`'s `Wrapper.wrap`: run
//! initial evaluation, reduce ambiguity, then alternate induce/evaluate/
//! reduce-table until either enough inputs are answered (emit) or the
//! resource is narrowed below tau (give up). spec.md §4.11 steps (a)-(e)
//! are implemented as the loop body of [`wrap`], one step per iteration.

use std::collections::HashMap;

use wpdxf_collector::{HtmlCache, ResourceGroup};
use wpdxf_dom::html::Html;
use wpdxf_dom::{apply_program, evaluate_initial_mode, Resource, TermMatch, WebPage};
use wpdxf_induce::{induce, reduce, reduce_ambiguity};
use wpdxf_pairs::Pair;

/// A resource's final answer table: `pair input string -> extracted
/// output string`, for whichever examples/queries the program resolved
/// (spec.md §3 "Table").
pub type Table = HashMap<String, String>;

/// The outcome of successfully wrapping one resource.
pub struct ResourceOutcome {
    pub resource: Resource,
    pub table: Table,
}

/// Fetches every page in `group` through `html_cache` (a miss triggers an
/// on-demand fetch; a fetch failure drops that single URL, per spec.md §7
/// "unreachable corpus node") and parses it into a [`WebPage`], without yet
/// locating any pair on it.
pub fn fetch_pages(group: &ResourceGroup, html_cache: &HtmlCache) -> Vec<WebPage> {
    let mut pages = Vec::with_capacity(group.urls.len());
    for url in &group.urls {
        match html_cache.get_or_fetch(url) {
            Some(html) => pages.push(WebPage::new(url.clone(), Html::parse(&html))),
            None => log::warn!("dropping unreachable page {url} from resource {}", group.label),
        }
    }
    pages
}

/// Runs the full wrap loop (spec.md §4.11) over `resource`'s pages against
/// `examples`/`queries`, mutating `resource` in place (program, variables,
/// and surviving examples all change across iterations) and returning the
/// emitted table, or `None` if the resource never reaches `tau` answered
/// inputs.
pub fn wrap(
    resource: &mut Resource,
    examples: &[Pair],
    queries: &[Pair],
    tau: usize,
    enrich_predicates: bool,
    term_match: TermMatch,
) -> Option<Table> {
    let ex_slice: Vec<(usize, &Pair)> = examples.iter().enumerate().collect();
    let q_slice: Vec<(usize, &Pair)> = queries.iter().enumerate().collect();

    for page in resource.webpages.iter_mut() {
        evaluate_initial_mode(page, &ex_slice, &q_slice, term_match);
    }

    if resource.example_count() < tau {
        log::info!(
            "resource {} covers only {} examples before reduction, skipping (tau={tau})",
            resource.identifier,
            resource.example_count()
        );
        return None;
    }

    reduce_ambiguity(resource);
    if resource.example_count() < tau {
        log::info!(
            "resource {} fell to {} examples after reduce_ambiguity, skipping (tau={tau})",
            resource.identifier,
            resource.example_count()
        );
        return None;
    }

    loop {
        let program = induce(resource, enrich_predicates);

        let mut raw_ex: HashMap<usize, Vec<String>> = HashMap::new();
        let mut raw_q: HashMap<usize, Vec<String>> = HashMap::new();
        for page in resource.webpages.iter_mut() {
            let out_ex = apply_program(page, &program, &resource.variables, &ex_slice, &[]);
            for (k, v) in out_ex {
                raw_ex.entry(k).or_default().extend(v);
            }
            let out_q = apply_program(page, &program, &resource.variables, &[], &q_slice);
            for (k, v) in out_q {
                raw_q.entry(k).or_default().extend(v);
            }
        }

        let mut table: Table = HashMap::new();
        let mut resolved = 0usize;
        for (idx, outputs) in &raw_ex {
            if let Some(value) = reduce_table_entry(outputs) {
                table.insert(examples[*idx].input().to_string(), value);
                resolved += 1;
            }
        }
        for (idx, outputs) in &raw_q {
            if let Some(value) = reduce_table_entry(outputs) {
                table.insert(queries[*idx].input().to_string(), value);
                resolved += 1;
            }
        }

        if resolved >= tau {
            log::debug!(
                "resource {} emitted a table with {resolved} resolved inputs",
                resource.identifier
            );
            return Some(table);
        }

        log::debug!(
            "resource {} only resolved {resolved}/{tau}, narrowing via reduce()",
            resource.identifier
        );
        reduce(resource);
        if resource.example_count() < tau {
            log::info!(
                "resource {} narrowed below tau, giving up",
                resource.identifier
            );
            return None;
        }
    }
}

/// Reduces a single input's raw candidate outputs to at most one value
/// (spec.md §4.11 step (c)): a singleton is kept outright; multiple
/// distinct values are kept only if one of them is a prefix of every other
/// — the shortest such candidate is chosen for determinism; otherwise the
/// input is left unbound.
fn reduce_table_entry(outputs: &[String]) -> Option<String> {
    let mut distinct: Vec<&String> = Vec::new();
    for o in outputs {
        if !distinct.iter().any(|d| *d == o) {
            distinct.push(o);
        }
    }
    if distinct.len() == 1 {
        return Some(distinct[0].clone());
    }
    if distinct.is_empty() {
        return None;
    }

    let mut sorted = distinct.clone();
    sorted.sort_by_key(|s| s.len());
    for candidate in &sorted {
        if sorted
            .iter()
            .all(|other| *other == *candidate || other.starts_with(candidate.as_str()))
        {
            return Some((*candidate).clone());
        }
    }
    None
}

/// Convenience: fetches `group`'s pages and runs [`wrap`] over them in one
/// call, bundling the built resource alongside its table.
pub fn wrap_group(
    group: &ResourceGroup,
    html_cache: &HtmlCache,
    examples: &[Pair],
    queries: &[Pair],
    tau: usize,
    enrich_predicates: bool,
    term_match: TermMatch,
) -> Option<ResourceOutcome> {
    let pages = fetch_pages(group, html_cache);
    if pages.is_empty() {
        log::warn!("resource {} has no reachable pages, skipping", group.label);
        return None;
    }
    let mut resource = Resource::new(group.label.clone(), pages);
    let table = wrap(&mut resource, examples, queries, tau, enrich_predicates, term_match)?;
    Some(ResourceOutcome { resource, table })
}
