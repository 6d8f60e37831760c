//! Bridges the resource collector (C4) and wrap loop (C11) into the
//! [`wpdxf_em::TableSource`] seam the EM scorer (C12) queries each
//! iteration.
//!
//! Grounded in `original_source/.../app/main.py`'s top-level `wrap(examples,
//! queries)` call: each EM round folds the current best-guess answers in as
//! additional examples and re-runs collection from scratch, since a new
//! best answer can surface resources the index wouldn't have matched
//! before.

use std::collections::HashMap;

use wpdxf_collector::{HtmlCache, ResourceCollector, ResourceGroup};
use wpdxf_dom::TermMatch;
use wpdxf_em::{Table, TableSource};
use wpdxf_index::IndexEngine;
use wpdxf_pairs::Pair;
use wpdxf_wrap::{wrap_group, ResourceOutcome};

pub struct PipelineSource {
    index: IndexEngine,
    collector: ResourceCollector,
    html_cache: HtmlCache,
    base_examples: Vec<Pair>,
    tau: usize,
    enrich_predicates: bool,
    term_match: TermMatch,
    max_rel_tf: f64,
    max_corpus_freq: f64,
    /// The resource groups the last `query` call collected, kept around for
    /// the `uris.csv`/`groups.txt` report files.
    pub last_groups: Vec<ResourceGroup>,
    /// Every resource that ever emitted a table, across every EM round, for
    /// `tables.txt`.
    pub outcomes: Vec<ResourceOutcome>,
}

impl PipelineSource {
    pub fn new(
        index: IndexEngine,
        collector: ResourceCollector,
        html_cache: HtmlCache,
        base_examples: Vec<Pair>,
        tau: usize,
        enrich_predicates: bool,
        term_match: TermMatch,
        max_rel_tf: f64,
        max_corpus_freq: f64,
    ) -> Self {
        PipelineSource {
            index,
            collector,
            html_cache,
            base_examples,
            tau,
            enrich_predicates,
            term_match,
            max_rel_tf,
            max_corpus_freq,
            last_groups: Vec::new(),
            outcomes: Vec::new(),
        }
    }
}

impl TableSource for PipelineSource {
    fn query(&mut self, best_answers: &HashMap<String, String>, queries: &[String]) -> Vec<Table> {
        let mut examples = self.base_examples.clone();
        for (x, y) in best_answers {
            examples.push(Pair::make_example(x.clone(), y.clone()));
        }
        let query_pairs: Vec<Pair> = queries.iter().map(|q| Pair::make_query(q.clone())).collect();

        let groups = match self.collector.collect(
            &mut self.index,
            &examples,
            &query_pairs,
            self.max_rel_tf,
            self.max_corpus_freq,
        ) {
            Ok(groups) => groups,
            Err(err) => {
                log::error!("resource collection failed: {err:#}");
                return Vec::new();
            }
        };

        let mut tables = Vec::with_capacity(groups.len());
        for group in &groups {
            if let Some(outcome) = wrap_group(
                group,
                &self.html_cache,
                &examples,
                &query_pairs,
                self.tau,
                self.enrich_predicates,
                self.term_match,
            ) {
                tables.push(outcome.table.clone());
                self.outcomes.push(outcome);
            }
        }

        self.last_groups = groups;
        tables
    }
}
