//! Resource collector (C4): drives the index engine (C2) then the URI-tree
//! (C3), caching each pair's URL list on disk between runs.
//!
//! Grounded in `original_source/.../wrapping/objects/resourceCollector.py`'s
//! `ResourceCollector.collect`: the example pass runs first and prunes the
//! tree to hosts meeting tau, then the query pass only adds query matches
//! to nodes that already exist (never growing new host roots), and finally
//! `group_uritree` decomposes every root and orders the groups by
//! descending `|q_matches|`.

pub mod cache;

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use anyhow::Result;

use wpdxf_index::IndexEngine;
use wpdxf_pairs::Pair;
use wpdxf_tree::UriForest;

pub use cache::{pair_cache_key, HtmlCache, UrlCache};

/// One decomposed resource group, ready for the wrap loop to fetch pages
/// for: its dotted label and the full list of URLs under it.
#[derive(Debug, Clone)]
pub struct ResourceGroup {
    pub label: String,
    pub urls: Vec<String>,
}

pub struct ResourceCollector {
    tau: usize,
    limit: usize,
    url_cache: UrlCache,
}

impl ResourceCollector {
    pub fn new(url_cache_dir: impl AsRef<Path>, tau: usize, limit: usize) -> Self {
        ResourceCollector {
            tau,
            limit,
            url_cache: UrlCache::new(url_cache_dir.as_ref().to_path_buf()),
        }
    }

    /// Resolves `pairs` to their matching URLs, consulting the on-disk
    /// cache first and falling back to `index.query_pairs` for whatever
    /// isn't cached, storing fresh results back to the cache as it goes.
    /// Returned indices are positions into `pairs`.
    fn resolve_urls(
        &self,
        index: &mut IndexEngine,
        pairs: &[Pair],
        max_rel_tf: f64,
        max_corpus_freq: f64,
    ) -> Result<HashMap<String, BTreeSet<usize>>> {
        let mut url_dict: HashMap<String, BTreeSet<usize>> = HashMap::new();
        let mut uncached_idx = Vec::new();
        let mut uncached_pairs = Vec::new();

        for (i, pair) in pairs.iter().enumerate() {
            match self.url_cache.get(pair) {
                Some(urls) => {
                    for url in urls {
                        url_dict.entry(url).or_default().insert(i);
                    }
                }
                None => {
                    uncached_idx.push(i);
                    uncached_pairs.push(pair.clone());
                }
            }
        }

        if !uncached_pairs.is_empty() {
            let result = index.query_pairs(&uncached_pairs, max_rel_tf, max_corpus_freq)?;

            let mut per_pair_urls: Vec<Vec<String>> = vec![Vec::new(); uncached_pairs.len()];
            for (url, local_matches) in &result {
                for &local in local_matches {
                    per_pair_urls[local].push(url.clone());
                }
            }
            for (local, urls) in per_pair_urls.iter().enumerate() {
                self.url_cache.put(&uncached_pairs[local], urls)?;
            }

            for (url, local_matches) in result {
                for local in local_matches {
                    let orig = uncached_idx[local];
                    url_dict.entry(url.clone()).or_default().insert(orig);
                }
            }
        }

        Ok(url_dict)
    }

    /// Full two-pass collection: examples first (builds and prunes the
    /// tree to tau), then queries (only widens existing nodes), then
    /// decomposes every surviving root and returns the groups ordered by
    /// descending `|q_matches|`, truncated to `limit` (0 = unlimited).
    pub fn collect(
        &self,
        index: &mut IndexEngine,
        examples: &[Pair],
        queries: &[Pair],
        max_rel_tf: f64,
        max_corpus_freq: f64,
    ) -> Result<Vec<ResourceGroup>> {
        let mut forest = UriForest::new();

        let ex_urls = self.resolve_urls(index, examples, max_rel_tf, max_corpus_freq)?;
        for (url, ex_matches) in ex_urls {
            forest.add_uri(&url, ex_matches, BTreeSet::new());
        }
        forest.prune_roots_below_tau(self.tau);

        let q_urls = self.resolve_urls(index, queries, max_rel_tf, max_corpus_freq)?;
        for (url, q_matches) in q_urls {
            forest.add_uri_existing_only(&url, BTreeSet::new(), q_matches);
        }

        let mut groups: Vec<(String, Vec<String>, usize)> = Vec::new();
        for (host, root) in forest.roots().map(|(h, id)| (h.to_string(), id)).collect::<Vec<_>>() {
            let _ = host;
            for node in forest.decompose(root, self.tau) {
                let qlen = forest.q_matches(node).len();
                let urls: Vec<String> = forest
                    .leaves(node)
                    .into_iter()
                    .filter_map(|leaf| forest.uri(leaf).map(|s| s.to_string()))
                    .collect();
                groups.push((forest.path(node), urls, qlen));
            }
        }

        // Stable sort keeps insertion order as the tie-break (spec.md §4.4).
        groups.sort_by(|a, b| b.2.cmp(&a.2));
        if self.limit > 0 && groups.len() > self.limit {
            groups.truncate(self.limit);
        }

        Ok(groups
            .into_iter()
            .map(|(label, urls, _)| ResourceGroup { label, urls })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpdxf_tree::UriForest;

    #[test]
    fn decomposed_groups_are_ordered_by_descending_query_matches() {
        let mut forest = UriForest::new();
        forest.add_uri(
            "http://example.com/a",
            [0usize].into_iter().collect(),
            [0usize].into_iter().collect(),
        );
        forest.add_uri(
            "http://example.com/b",
            [1usize].into_iter().collect(),
            [0usize, 1, 2].into_iter().collect(),
        );
        let root = forest.root_for("example.com").unwrap();
        let mut groups: Vec<(String, usize)> = forest
            .decompose(root, 1)
            .into_iter()
            .map(|n| (forest.path(n), forest.q_matches(n).len()))
            .collect();
        groups.sort_by(|a, b| b.1.cmp(&a.1));
        assert!(groups[0].1 >= groups.last().unwrap().1);
    }
}
