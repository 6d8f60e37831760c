//! Writes the `run` command's report directory (spec.md §6): a fixed set
//! of files summarising one benchmark run, grounded in the same
//! run-parameters-plus-trace layout the original's `app/main.py` prints to
//! stdout and a handful of flat files under `statistics_path`.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use wpdxf_collector::ResourceGroup;
use wpdxf_em::EmResult;
use wpdxf_wrap::ResourceOutcome;

use crate::args::{Mode, RunArgs, TermMatchArg};

pub struct RunReport {
    pub mode: Mode,
    pub benchmark: std::path::PathBuf,
    pub input_col: String,
    pub output_col: String,
    pub seed: u64,
    pub num_examples: usize,
    pub tau: usize,
    pub enrich_predicates: bool,
    pub term_match: TermMatchArg,
    pub max_rel_tf: f64,
    pub total_rows: usize,
    pub query_count: usize,
    pub ground_truth: HashMap<String, String>,
    pub groups: Vec<ResourceGroup>,
    pub outcomes: Vec<ResourceOutcome>,
    pub em: EmResult,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn from_args(args: &RunArgs, total_rows: usize, query_count: usize) -> ReportBuilder {
        ReportBuilder {
            mode: args.mode,
            benchmark: args.benchmark.clone(),
            input_col: args.input_col.clone(),
            output_col: args.output_col.clone(),
            seed: args.seed,
            num_examples: args.num_examples,
            tau: args.tau,
            enrich_predicates: args.enrich_predicates,
            term_match: args.term_match,
            max_rel_tf: args.max_rel_tf.unwrap_or(wpdxf_config::get().max_rel_tf),
            total_rows,
            query_count,
        }
    }
}

/// Everything about a report known before the pipeline has actually run.
pub struct ReportBuilder {
    mode: Mode,
    benchmark: std::path::PathBuf,
    input_col: String,
    output_col: String,
    seed: u64,
    num_examples: usize,
    tau: usize,
    enrich_predicates: bool,
    term_match: TermMatchArg,
    max_rel_tf: f64,
    total_rows: usize,
    query_count: usize,
}

impl ReportBuilder {
    pub fn finish(
        self,
        ground_truth: HashMap<String, String>,
        groups: Vec<ResourceGroup>,
        outcomes: Vec<ResourceOutcome>,
        em: EmResult,
        elapsed: Duration,
    ) -> RunReport {
        RunReport {
            mode: self.mode,
            benchmark: self.benchmark,
            input_col: self.input_col,
            output_col: self.output_col,
            seed: self.seed,
            num_examples: self.num_examples,
            tau: self.tau,
            enrich_predicates: self.enrich_predicates,
            term_match: self.term_match,
            max_rel_tf: self.max_rel_tf,
            total_rows: self.total_rows,
            query_count: self.query_count,
            ground_truth,
            groups,
            outcomes,
            em,
            elapsed,
        }
    }
}

pub fn write_report(dir: &Path, report: &RunReport) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating report directory {}", dir.display()))?;

    write_metafile(dir, report)?;
    write_timing(dir, report)?;
    write_uris(dir, report)?;
    write_groups(dir, report)?;
    write_tables(dir, report)?;
    write_answer_list(dir, report)?;
    write_answer(dir, report)?;
    write_em_trace(dir, report)?;
    write_summary(dir, report)?;
    Ok(())
}

fn write_metafile(dir: &Path, r: &RunReport) -> Result<()> {
    let mut f = File::create(dir.join("metafile.txt"))?;
    writeln!(f, "mode: {}", r.mode)?;
    writeln!(f, "benchmark: {}", r.benchmark.display())?;
    writeln!(f, "input_column: {}", r.input_col)?;
    writeln!(f, "output_column: {}", r.output_col)?;
    writeln!(f, "seed: {}", r.seed)?;
    writeln!(f, "num_examples: {}", r.num_examples)?;
    writeln!(f, "num_queries: {}", r.query_count)?;
    writeln!(f, "tau: {}", r.tau)?;
    writeln!(f, "enrich_predicates: {}", r.enrich_predicates)?;
    writeln!(f, "term_match: {}", r.term_match)?;
    writeln!(f, "max_rel_tf: {}", r.max_rel_tf)?;
    writeln!(f, "total_benchmark_rows: {}", r.total_rows)?;
    Ok(())
}

fn write_timing(dir: &Path, r: &RunReport) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("timing.csv"))?;
    w.write_record(["stage", "duration_ms"])?;
    w.write_record(["wrap_and_em", r.elapsed.as_millis().to_string().as_str()])?;
    w.flush()?;
    Ok(())
}

fn write_uris(dir: &Path, r: &RunReport) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("uris.csv"))?;
    w.write_record(["label", "url"])?;
    for group in &r.groups {
        for url in &group.urls {
            w.write_record([&group.label, url])?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_groups(dir: &Path, r: &RunReport) -> Result<()> {
    let mut f = File::create(dir.join("groups.txt"))?;
    for group in &r.groups {
        writeln!(f, "{} ({} urls)", group.label, group.urls.len())?;
    }
    Ok(())
}

fn write_tables(dir: &Path, r: &RunReport) -> Result<()> {
    let mut f = File::create(dir.join("tables.txt"))?;
    for outcome in &r.outcomes {
        writeln!(f, "== {} ==", outcome.resource.identifier)?;
        let mut entries: Vec<(&String, &String)> = outcome.table.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (input, output) in entries {
            writeln!(f, "{input} -> {output}")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

fn write_answer_list(dir: &Path, r: &RunReport) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("answerList.csv"))?;
    w.write_record(["query", "candidate", "score"])?;
    let mut queries: Vec<&String> = r.em.distributions.keys().collect();
    queries.sort();
    for q in queries {
        let dist = &r.em.distributions[q];
        for (candidate, score) in dist {
            w.write_record([q.as_str(), candidate.as_str(), score.to_string().as_str()])?;
        }
    }
    w.flush()?;
    Ok(())
}

fn write_answer(dir: &Path, r: &RunReport) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("answer.csv"))?;
    w.write_record(["query", "answer"])?;
    let mut queries: Vec<&String> = r.em.answers.keys().collect();
    queries.sort();
    for q in queries {
        let answer = r.em.answers[q].clone().unwrap_or_default();
        w.write_record([q.as_str(), answer.as_str()])?;
    }
    w.flush()?;
    Ok(())
}

fn write_em_trace(dir: &Path, r: &RunReport) -> Result<()> {
    let mut w = csv::Writer::from_path(dir.join("em.txt"))?;
    w.write_record(["iteration", "delta"])?;
    for (i, delta) in r.em.deltas.iter().enumerate() {
        w.write_record([(i + 1).to_string(), delta.to_string()])?;
    }
    w.flush()?;
    Ok(())
}

fn write_summary(dir: &Path, r: &RunReport) -> Result<()> {
    let mut f = File::create(dir.join("report.txt"))?;
    let answered = r.em.answers.values().filter(|a| a.is_some()).count();
    writeln!(f, "resources collected: {}", r.groups.len())?;
    writeln!(f, "resources wrapped: {}", r.outcomes.len())?;
    writeln!(f, "queries answered: {answered}/{}", r.query_count)?;
    writeln!(f, "EM iterations: {}", r.em.iterations)?;

    let mut checked = 0usize;
    let mut correct = 0usize;
    for (q, truth) in &r.ground_truth {
        if let Some(Some(answer)) = r.em.answers.get(q) {
            checked += 1;
            if answer == truth {
                correct += 1;
            }
        }
    }
    if checked > 0 {
        writeln!(
            f,
            "accuracy against held-out ground truth: {correct}/{checked} ({:.1}%)",
            100.0 * correct as f64 / checked as f64
        )?;
    }
    Ok(())
}
