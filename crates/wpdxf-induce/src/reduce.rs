//! Reducer (C7): resolves per-example ambiguity via pairwise tree-edit
//! distance, and the degenerate over-fit narrowing variant.
//!
//! Grounded in `original_source/.../nielandt/reduce.py`'s
//! `NielandtReducer.reduce_ambiguity`/`reduce`: the worklist discipline
//! (pop the most-ambiguous example, keep the argmin candidate, push it back
//! resolved) is carried over verbatim (spec.md §14 "reduce_ambiguity
//! worklist discipline"), using [`wpdxf_dom::Resource::examples`]'s
//! `BTreeMap` ordering for the deterministic insertion-order tie-break
//! spec.md §8 requires.

use wpdxf_dom::eval::{path_from, subtree_root};
use wpdxf_dom::{Handle, Resource};
use wpdxf_xpath::edit_distance;

type Candidate = (usize, Handle, Handle);

fn mean_cost_to(page_pages: &[wpdxf_dom::WebPage], cand: &Candidate, others: &[Candidate]) -> f64 {
    let (page_idx, inp, out) = cand;
    let root = match subtree_root(inp, out) {
        Some(r) => r,
        None => return f64::INFINITY,
    };
    let inp_xp = path_from(&root, inp);
    let out_xp = path_from(&root, out);
    let _ = page_idx;

    if others.is_empty() {
        return 0.0;
    }
    let mut total = 0u64;
    for (o_page_idx, o_inp, o_out) in others {
        let o_root = match subtree_root(o_inp, o_out) {
            Some(r) => r,
            None => continue,
        };
        let _ = page_pages;
        let _ = o_page_idx;
        let cost =
            edit_distance(&inp_xp, &path_from(&o_root, o_inp)) + edit_distance(&out_xp, &path_from(&o_root, o_out));
        total += cost as u64;
    }
    total as f64 / others.len() as f64
}

/// Repeatedly pops the example with the most remaining candidates, keeps
/// the one with the lowest mean edit-distance cost to every other
/// example's remaining candidates, and re-inserts it (now unambiguous) at
/// the tail of the worklist. Stops as soon as the most-ambiguous example
/// left has a single candidate — since the worklist stays sorted by
/// descending ambiguity, that means every example does. Idempotent: a
/// second call with every example already singleton returns immediately.
pub fn reduce_ambiguity(resource: &mut Resource) {
    loop {
        let examples = resource.examples();
        if examples.is_empty() {
            return;
        }
        let mut entries: Vec<(usize, Vec<Candidate>)> = examples.into_iter().collect();
        entries.sort_by(|a, b| b.1.len().cmp(&a.1.len()));

        let (key, vals) = entries.remove(0);
        if vals.len() <= 1 {
            return;
        }

        let others: Vec<Candidate> = entries.into_iter().flat_map(|(_, v)| v).collect();

        let mut best: Option<(f64, Candidate)> = None;
        for cand in &vals {
            let mean = mean_cost_to(&resource.webpages, cand, &others);
            let better = match &best {
                None => true,
                Some((best_mean, _)) => mean < *best_mean,
            };
            if better {
                best = Some((mean, cand.clone()));
            }
        }

        if let Some((_, (page_idx, inp, out))) = best {
            for page in resource.webpages.iter_mut() {
                page.remove_example(key);
            }
            resource.webpages[page_idx].add_example(key, inp, out);
        }
    }
}

/// Degenerate-case reduction: drops the single example whose (already
/// singleton) candidate has the *highest* mean edit-distance cost to every
/// other example's candidate. Used by the wrap loop (C11) to narrow an
/// over-fitted resource when the induced program still fails to cover tau
/// inputs.
pub fn reduce(resource: &mut Resource) {
    let examples = resource.examples();
    if examples.is_empty() {
        return;
    }
    let entries: Vec<(usize, Candidate)> = examples
        .into_iter()
        .filter_map(|(k, mut v)| v.drain(..).next().map(|c| (k, c)))
        .collect();

    let mut worst: Option<(f64, usize)> = None;
    for (i, (key, cand)) in entries.iter().enumerate() {
        let others: Vec<Candidate> = entries
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, (_, c))| c.clone())
            .collect();
        let mean = mean_cost_to(&resource.webpages, cand, &others);
        let worse = match &worst {
            None => true,
            Some((worst_mean, _)) => mean > *worst_mean,
        };
        if worse {
            worst = Some((mean, *key));
        }
    }

    if let Some((_, key)) = worst {
        for page in resource.webpages.iter_mut() {
            page.remove_example(key);
        }
    }
}
