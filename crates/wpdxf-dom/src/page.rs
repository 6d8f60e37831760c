//! `WebPage` and `Resource` (spec.md §3): a fetched, parsed page's example
//! and query matches, and the group of pages plus induced program that
//! together form a resource.

use std::collections::{BTreeMap, HashMap};

use markup5ever_rcdom::Handle;

use wpdxf_xpath::RelativeXPath;

use crate::html::Html;

/// One fetched page plus every example/query node pair located on it.
/// Pairs are referenced by their index into the caller's example/query
/// list, matching the `usize`-keyed match sets used throughout
/// `wpdxf-tree` and `wpdxf-collector`.
pub struct WebPage {
    pub url: String,
    pub html: Html,
    /// `example_index -> [(input_node, output_node)]`.
    pub examples: HashMap<usize, Vec<(Handle, Handle)>>,
    /// `query_index -> [(input_node, output_node?)]`.
    pub queries: HashMap<usize, Vec<(Handle, Option<Handle>)>>,
}

impl WebPage {
    pub fn new(url: impl Into<String>, html: Html) -> Self {
        WebPage {
            url: url.into(),
            html,
            examples: HashMap::new(),
            queries: HashMap::new(),
        }
    }

    pub fn add_example(&mut self, idx: usize, inp: Handle, out: Handle) {
        self.examples.entry(idx).or_default().push((inp, out));
    }

    pub fn add_query(&mut self, idx: usize, inp: Handle, out: Option<Handle>) {
        self.queries.entry(idx).or_default().push((inp, out));
    }

    /// Drops every example entry for `idx` (used by the reducer once a
    /// single winning candidate has been chosen and must replace, not
    /// augment, whatever was recorded before).
    pub fn remove_example(&mut self, idx: usize) {
        self.examples.remove(&idx);
    }

    pub fn input_elements(&self, idx: usize) -> Vec<Handle> {
        self.examples
            .get(&idx)
            .map(|v| v.iter().map(|(i, _)| i.clone()).collect())
            .unwrap_or_default()
    }

    pub fn output_elements(&self, idx: usize) -> Vec<Handle> {
        self.examples
            .get(&idx)
            .map(|v| v.iter().map(|(_, o)| o.clone()).collect())
            .unwrap_or_default()
    }
}

/// A group of pages sharing a URI-tree prefix, plus the extraction program
/// induced from their examples.
pub struct Resource {
    pub identifier: String,
    pub webpages: Vec<WebPage>,
    pub program: Option<RelativeXPath>,
    pub variables: HashMap<String, String>,
}

impl Resource {
    pub fn new(identifier: impl Into<String>, webpages: Vec<WebPage>) -> Self {
        Resource {
            identifier: identifier.into(),
            webpages,
            program: None,
            variables: HashMap::new(),
        }
    }

    /// Every example index with at least one candidate on at least one
    /// page, mapped to the union of its candidates across all pages.
    ///
    /// Returns a `BTreeMap` (not a `HashMap`) so that callers iterating
    /// over it — the reducer's worklist discipline in particular — see a
    /// deterministic order keyed by example index, matching spec.md §8's
    /// "tie-breaks are resolved by insertion order" (example indices are
    /// assigned in insertion order by the caller).
    pub fn examples(&self) -> BTreeMap<usize, Vec<(usize, Handle, Handle)>> {
        let mut out: BTreeMap<usize, Vec<(usize, Handle, Handle)>> = BTreeMap::new();
        for (page_idx, page) in self.webpages.iter().enumerate() {
            for (ex_idx, pairs) in &page.examples {
                for (inp, out_node) in pairs {
                    out.entry(*ex_idx)
                        .or_default()
                        .push((page_idx, inp.clone(), out_node.clone()));
                }
            }
        }
        out
    }

    pub fn queries(&self) -> BTreeMap<usize, Vec<(usize, Handle, Option<Handle>)>> {
        let mut out: BTreeMap<usize, Vec<(usize, Handle, Option<Handle>)>> = BTreeMap::new();
        for (page_idx, page) in self.webpages.iter().enumerate() {
            for (q_idx, pairs) in &page.queries {
                for (inp, out_node) in pairs {
                    out.entry(*q_idx)
                        .or_default()
                        .push((page_idx, inp.clone(), out_node.clone()));
                }
            }
        }
        out
    }

    pub fn example_count(&self) -> usize {
        self.examples().len()
    }
}
