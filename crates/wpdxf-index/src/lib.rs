//! Index query engine (C2): `query_pairs(pairs) -> mapping<url, set<pair>>`.
//!
//! Grounded in `queryGenerator.py`'s `QueryExecutor` (the canonical, latest
//! version found under `original_source/`): resolve tokens, build a mask
//! per pair-half, scan `postings` ordered by `(uri_id, position)`, and
//! slide a window over each uri's partition. The pipeline itself is
//! single-threaded (spec.md §5), so this engine holds a single blocking
//! `postgres::Client` rather than the async pool the rest of the corpus
//! ingestion machinery (out of scope) would use.

pub mod partition;

use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{Context, Result};
use log::warn;
use postgres::Client;

use wpdxf_pairs::Pair;

use partition::{partition_by_uri, partition_matches, Mask, Posting};

pub struct IndexEngine {
    client: Client,
}

impl IndexEngine {
    pub fn connect(conn_str: &str) -> Result<Self> {
        let client = Client::connect(conn_str, postgres::NoTls)
            .with_context(|| format!("connecting to index store at {conn_str}"))?;
        Ok(IndexEngine { client })
    }

    pub fn from_client(client: Client) -> Self {
        IndexEngine { client }
    }

    /// Resolves every distinct token in `tokens` against the `tokens`
    /// relation. Tokens not found are simply absent from the returned map
    /// — callers drop any pair containing an unresolved token (spec.md §7).
    fn resolve_token_ids(&mut self, tokens: &BTreeSet<String>) -> Result<HashMap<String, i64>> {
        if tokens.is_empty() {
            return Ok(HashMap::new());
        }
        let tokens_vec: Vec<&str> = tokens.iter().map(|s| s.as_str()).collect();
        let rows = self
            .client
            .query(
                "SELECT token, token_id FROM tokens WHERE token = ANY($1)",
                &[&tokens_vec],
            )
            .context("resolving token ids")?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let token: String = row.get(0);
                let id: i64 = row.get(1);
                (token, id)
            })
            .collect())
    }

    /// The corpus-wide occurrence count for a token id, used to enforce
    /// `max_rel_tf`.
    fn token_frequency(&mut self, token_id: i64) -> Result<i64> {
        let row = self
            .client
            .query_one(
                "SELECT count(*) FROM postings WHERE token_id = $1",
                &[&token_id],
            )
            .context("computing token corpus frequency")?;
        Ok(row.get(0))
    }

    fn resolve_uris(&mut self, uri_ids: &[i64]) -> Result<HashMap<i64, String>> {
        if uri_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = self
            .client
            .query(
                "SELECT uri_id, uri FROM uris WHERE uri_id = ANY($1)",
                &[&uri_ids],
            )
            .context("resolving uris")?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let id: i64 = row.get(0);
                let uri: String = row.get(1);
                (id, uri)
            })
            .collect())
    }

    /// Fetches, in `(uri_id, position)` order, every posting row whose
    /// `token_id` is one of `token_ids`. Conceptually a streaming cursor
    /// scan (spec.md §9 "Coroutine-like iteration"); the per-uri
    /// partitioning and windowing logic in [`partition`] is written against
    /// a plain iterator so swapping this for a real portal-backed cursor
    /// does not change any downstream code.
    fn scan_postings(&mut self, token_ids: &[i64]) -> Result<Vec<Posting>> {
        if token_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self
            .client
            .query(
                "SELECT uri_id, position, token_id FROM postings \
                 WHERE token_id = ANY($1) ORDER BY uri_id, position",
                &[&token_ids],
            )
            .context("scanning postings")?;
        Ok(rows
            .into_iter()
            .map(|row| Posting {
                uri_id: row.get(0),
                position: row.get(1),
                token_id: row.get(2),
            })
            .collect())
    }

    /// Builds the `(token_id, relative_offset)` mask for one pair half,
    /// dropping (with a single logged warning) any pair containing a token
    /// that failed to resolve or whose corpus frequency exceeds
    /// `max_rel_tf * max_corpus_freq`.
    fn build_mask(
        &mut self,
        toks: &[wpdxf_pairs::Token],
        token_ids: &HashMap<String, i64>,
        max_rel_tf: f64,
        max_corpus_freq: f64,
        total_postings: i64,
    ) -> Result<Option<Mask>> {
        if toks.is_empty() {
            return Ok(None);
        }
        let first_pos = toks[0].position as i64;
        let mut mask = Vec::with_capacity(toks.len());
        for t in toks {
            let id = match token_ids.get(&t.text) {
                Some(id) => *id,
                None => {
                    warn!("unresolved token '{}', dropping containing pair", t.text);
                    return Ok(None);
                }
            };
            if total_postings > 0 {
                let freq = self.token_frequency(id)?;
                let rel = freq as f64 / total_postings as f64;
                if rel > max_rel_tf * max_corpus_freq {
                    warn!("token '{}' exceeds max_rel_tf, dropping containing pair", t.text);
                    return Ok(None);
                }
            }
            mask.push((id, t.position as i64 - first_pos));
        }
        Ok(Some(Mask(mask)))
    }

    /// `query_pairs(pairs) -> mapping<url, set<pair-index>>` (spec.md §4.2).
    pub fn query_pairs(
        &mut self,
        pairs: &[Pair],
        max_rel_tf: f64,
        max_corpus_freq: f64,
    ) -> Result<HashMap<String, HashSet<usize>>> {
        let mut all_tokens: BTreeSet<String> = BTreeSet::new();
        for pair in pairs {
            all_tokens.extend(pair.tokens());
        }
        let token_ids = self.resolve_token_ids(&all_tokens)?;

        let total_postings: i64 = self
            .client
            .query_one("SELECT count(*) FROM postings", &[])
            .map(|row| row.get(0))
            .unwrap_or(0);

        let mut result: HashMap<String, HashSet<usize>> = HashMap::new();

        for (idx, pair) in pairs.iter().enumerate() {
            let inp_mask = self.build_mask(
                &pair.tok_inp(),
                &token_ids,
                max_rel_tf,
                max_corpus_freq,
                total_postings,
            )?;
            let inp_mask = match inp_mask {
                Some(m) => m,
                None => continue,
            };

            let out_mask = match pair.tok_out() {
                Some(toks) => self.build_mask(
                    &toks,
                    &token_ids,
                    max_rel_tf,
                    max_corpus_freq,
                    total_postings,
                )?,
                None => None,
            };
            if pair.is_example() && out_mask.is_none() {
                continue;
            }

            let mut token_ids_of_interest: Vec<i64> =
                inp_mask.0.iter().map(|(id, _)| *id).collect();
            if let Some(ref m) = out_mask {
                token_ids_of_interest.extend(m.0.iter().map(|(id, _)| *id));
            }
            token_ids_of_interest.sort_unstable();
            token_ids_of_interest.dedup();

            let postings = self.scan_postings(&token_ids_of_interest)?;

            let mut matching_uri_ids = Vec::new();
            for (uri_id, partition) in partition_by_uri(postings) {
                let inp_ok = partition_matches(&partition, &inp_mask);
                let out_ok = match &out_mask {
                    Some(m) => partition_matches(&partition, m),
                    None => true,
                };
                if inp_ok && out_ok {
                    matching_uri_ids.push(uri_id);
                }
            }

            let uris = self.resolve_uris(&matching_uri_ids)?;
            for uri in uris.values() {
                result.entry(uri.clone()).or_default().insert(idx);
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::partition::{Mask, Posting};

    #[test]
    fn mask_construction_normalises_first_offset_to_zero() {
        let toks = vec![
            wpdxf_pairs::Token {
                text: "a".into(),
                position: 5,
            },
            wpdxf_pairs::Token {
                text: "b".into(),
                position: 6,
            },
        ];
        let first = toks[0].position as i64;
        let mask: Vec<(i64, i64)> = toks
            .iter()
            .map(|t| (0i64, t.position as i64 - first))
            .collect();
        assert_eq!(mask, vec![(0, 0), (0, 1)]);
        let _ = Mask(mask);
        let _ = Posting {
            uri_id: 0,
            position: 0,
            token_id: 0,
        };
    }
}
