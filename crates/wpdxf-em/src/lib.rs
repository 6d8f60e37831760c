//! EM scorer (C12): fuses tables produced by many resources (C11) into a
//! single consensus answer per query via expectation-maximisation over
//! table scores and answer distributions.
//!
//! Grounded in `original_source/.../em.py`'s `EM` class: `T` scores a table
//! by how much its answers agree with the current best guess versus how
//! much they disagree or are silent on it (the `good`/`bad`/`unseen`
//! split), and `A` re-derives each query's answer distribution from every
//! table that has an opinion on it, weighted by that table's score. The
//! loop runs until both re-querying the source stops introducing new
//! query answers and the distributions stop moving by more than `eps`.
//!
//! Answer distributions use [`std::collections::BTreeMap`] rather than
//! `HashMap` so that argmax ties break on the lexicographically smaller
//! key, matching the deterministic tie-break discipline used throughout
//! the rest of this workspace (spec.md §8).

use std::collections::{BTreeMap, HashMap, HashSet};

/// One resource's table: `input -> output`.
pub type Table = HashMap<String, String>;

/// The collaborator that produces new tables given the current best
/// answers (folded into the query as additional examples) and the list of
/// queries still unanswered. This is the seam to C11 (the wrap loop) plus
/// whatever resource discovery (C2-C4) feeds it; the EM scorer itself is
/// agnostic to how tables are produced.
pub trait TableSource {
    fn query(&mut self, best_answers: &HashMap<String, String>, queries: &[String]) -> Vec<Table>;
}

/// Tuning constants (spec.md §4.12), overridable for experimentation.
#[derive(Debug, Clone, Copy)]
pub struct EmConfig {
    pub alpha: f64,
    pub prior: f64,
    pub eps: f64,
    pub max_iter: usize,
}

impl Default for EmConfig {
    fn default() -> Self {
        EmConfig {
            alpha: 0.99,
            prior: 0.5,
            eps: 1e-3,
            max_iter: 100,
        }
    }
}

/// Final result of a run: the decided answer per query (`None` is `⊥`,
/// "no confident answer"), plus the full distribution per query —
/// preserved rather than collapsed, per spec.md §9 Open Question (c).
pub struct EmResult {
    pub answers: HashMap<String, Option<String>>,
    pub distributions: HashMap<String, BTreeMap<String, f64>>,
    pub iterations: usize,
    /// Delta (sum of absolute distribution movement) at each iteration,
    /// in order; useful for a `em.txt`-style convergence trace.
    pub deltas: Vec<f64>,
}

pub struct EmScorer {
    pub config: EmConfig,
}

impl Default for EmScorer {
    fn default() -> Self {
        EmScorer {
            config: EmConfig::default(),
        }
    }
}

fn argmax(dist: &BTreeMap<String, f64>) -> Option<(String, f64)> {
    let mut best: Option<(String, f64)> = None;
    for (k, v) in dist {
        match &best {
            None => best = Some((k.clone(), *v)),
            Some((_, bv)) if *v > *bv => best = Some((k.clone(), *v)),
            _ => {}
        }
    }
    best
}

fn max_value(dist: &BTreeMap<String, f64>) -> f64 {
    dist.values().cloned().fold(0.0, f64::max)
}

impl EmScorer {
    pub fn new(config: EmConfig) -> Self {
        EmScorer { config }
    }

    /// Runs the full iteration (spec.md §4.12) to convergence or
    /// `max_iter`, using `source` to discover new tables each round.
    /// `examples` seed fixed, confident answer distributions (`{y: 1.0}`
    /// each); `queries` start with an empty distribution.
    pub fn run(
        &self,
        examples: &[(String, String)],
        queries: &[String],
        source: &mut dyn TableSource,
    ) -> EmResult {
        let mut a: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
        for (x, y) in examples {
            let mut dist = BTreeMap::new();
            dist.insert(y.clone(), 1.0);
            a.insert(x.clone(), dist);
        }
        for q in queries {
            a.entry(q.clone()).or_insert_with(BTreeMap::new);
        }

        let query_set: HashSet<&String> = queries.iter().collect();
        let mut tables: Vec<Table> = Vec::new();
        let mut seen_query_entries: HashSet<(String, String)> = HashSet::new();

        let mut deltas = Vec::new();
        let mut iterations = 0usize;

        for iter in 0..self.config.max_iter {
            iterations = iter + 1;

            let best_answers: HashMap<String, String> = a
                .iter()
                .filter_map(|(x, dist)| argmax(dist).map(|(y, _)| (x.clone(), y)))
                .collect();
            let unanswered: Vec<String> = queries
                .iter()
                .filter(|q| !best_answers.contains_key(*q))
                .cloned()
                .collect();

            let new_tables = source.query(&best_answers, &unanswered);
            let mut finished_querying = true;
            for t in &new_tables {
                for (x, y) in t {
                    if query_set.contains(x) && seen_query_entries.insert((x.clone(), y.clone())) {
                        finished_querying = false;
                    }
                }
            }
            tables.extend(new_tables);

            let t_scores = self.score_tables(&tables, &a);

            let (new_a, delta) = self.update_answers(queries, &tables, &t_scores, &a);
            a = new_a;
            deltas.push(delta);

            log::debug!("EM iteration {}: delta={delta:.6}, finished_querying={finished_querying}", iter + 1);

            if finished_querying && delta < self.config.eps {
                break;
            }
        }

        let mut answers = HashMap::new();
        let mut distributions = HashMap::new();
        for q in queries {
            let dist = a.get(q).cloned().unwrap_or_default();
            let sum: f64 = dist.values().sum();
            let answer = argmax(&dist).and_then(|(y, score)| {
                if score > 1.0 - sum {
                    Some(y)
                } else {
                    None
                }
            });
            answers.insert(q.clone(), answer);
            distributions.insert(q.clone(), dist);
        }

        EmResult {
            answers,
            distributions,
            iterations,
            deltas,
        }
    }

    fn score_tables(
        &self,
        tables: &[Table],
        a: &HashMap<String, BTreeMap<String, f64>>,
    ) -> Vec<f64> {
        tables
            .iter()
            .map(|t| {
                let mut good = 0.0;
                let mut bad = 0.0;
                for (x, y) in t {
                    match a.get(x).and_then(argmax) {
                        Some((best_y, _)) if &best_y == y => {
                            good += a[x].get(y).copied().unwrap_or(0.0);
                        }
                        _ => bad += 1.0,
                    }
                }
                let mut unseen = 0.0;
                for (x, dist) in a {
                    if !t.contains_key(x) {
                        unseen += max_value(dist);
                    }
                }
                let denom = self.config.prior * good + (1.0 - self.config.prior) * (bad + unseen);
                if denom <= 0.0 {
                    0.0
                } else {
                    self.config.alpha * self.config.prior * good / denom
                }
            })
            .collect()
    }

    fn update_answers(
        &self,
        queries: &[String],
        tables: &[Table],
        t_scores: &[f64],
        old: &HashMap<String, BTreeMap<String, f64>>,
    ) -> (HashMap<String, BTreeMap<String, f64>>, f64) {
        let mut new_a = old.clone();
        let mut delta = 0.0;

        for x in queries {
            let relevant: Vec<usize> = tables
                .iter()
                .enumerate()
                .filter(|(_, t)| t.contains_key(x))
                .map(|(i, _)| i)
                .collect();
            if relevant.is_empty() {
                continue;
            }

            let mut candidates: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
            for &i in &relevant {
                candidates.insert(tables[i][x].as_str());
            }

            let mut scores: BTreeMap<String, f64> = BTreeMap::new();
            for y in &candidates {
                let mut s = 1.0;
                for &i in &relevant {
                    let matches = tables[i].get(x).map(|v| v.as_str()) == Some(*y);
                    s *= if matches { t_scores[i] } else { 1.0 - t_scores[i] };
                }
                scores.insert((*y).to_string(), s);
            }
            let mut s_bottom = 1.0;
            for &i in &relevant {
                s_bottom *= 1.0 - t_scores[i];
            }

            let total: f64 = scores.values().sum::<f64>() + s_bottom;
            if total > 0.0 {
                for v in scores.values_mut() {
                    *v /= total;
                }
            }

            let old_dist = old.get(x).cloned().unwrap_or_default();
            let mut keys: std::collections::BTreeSet<&String> = old_dist.keys().collect();
            keys.extend(scores.keys());
            for k in keys {
                let ov = old_dist.get(k).copied().unwrap_or(0.0);
                let nv = scores.get(k).copied().unwrap_or(0.0);
                delta += (nv - ov).abs();
            }

            new_a.insert(x.clone(), scores);
        }

        (new_a, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        tables: Vec<Table>,
        served: bool,
    }

    impl TableSource for FixedSource {
        fn query(&mut self, _best: &HashMap<String, String>, _queries: &[String]) -> Vec<Table> {
            if self.served {
                Vec::new()
            } else {
                self.served = true;
                self.tables.clone()
            }
        }
    }

    fn table(pairs: &[(&str, &str)]) -> Table {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    /// spec.md §8 scenario 6.
    #[test]
    fn consensus_prefers_the_agreeing_table() {
        let examples = vec![
            ("Spain".to_string(), "Spanish".to_string()),
            ("Germany".to_string(), "German".to_string()),
            ("England".to_string(), "English".to_string()),
        ];
        let queries = vec!["Denmark".to_string(), "France".to_string()];

        let table_english = table(&[
            ("Spain", "Spanish"),
            ("Germany", "German"),
            ("England", "English"),
            ("Denmark", "Danish"),
            ("France", "French"),
        ]);
        let table_other = table(&[
            ("Spain", "Spanish"),
            ("Germany", "German"),
            ("England", "English"),
            ("France", "Français"),
        ]);

        let mut source = FixedSource {
            tables: vec![table_english, table_other],
            served: false,
        };

        let em = EmScorer::default();
        let result = em.run(&examples, &queries, &mut source);

        assert_eq!(result.answers.get("Denmark").cloned().flatten(), Some("Danish".to_string()));
        assert_eq!(result.answers.get("France").cloned().flatten(), Some("French".to_string()));
        assert!(result.deltas.iter().all(|d| d.is_finite()));
    }

    #[test]
    fn query_with_no_table_coverage_stays_unbound() {
        let examples = vec![("Spain".to_string(), "Spanish".to_string())];
        let queries = vec!["Atlantis".to_string()];
        let mut source = FixedSource {
            tables: vec![table(&[("Spain", "Spanish")])],
            served: false,
        };
        let em = EmScorer::default();
        let result = em.run(&examples, &queries, &mut source);
        assert_eq!(result.answers.get("Atlantis").cloned().flatten(), None);
    }

    #[test]
    fn distributions_are_preserved_not_collapsed() {
        let examples = vec![("Spain".to_string(), "Spanish".to_string())];
        let queries = vec!["Denmark".to_string()];
        let mut source = FixedSource {
            tables: vec![
                table(&[("Spain", "Spanish"), ("Denmark", "Danish")]),
                table(&[("Spain", "Spanish"), ("Denmark", "Dansk")]),
            ],
            served: false,
        };
        let em = EmScorer::default();
        let result = em.run(&examples, &queries, &mut source);
        let dist = result.distributions.get("Denmark").unwrap();
        assert!(dist.len() >= 1);
        let sum: f64 = dist.values().sum();
        assert!(sum <= 1.0 + 1e-9);
    }
}
