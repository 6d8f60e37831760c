//! CLI entry point. The only in-scope subcommand is `run` (spec.md §6); the
//! `retrieve` corpus-ingestion command is never CLI-surfaced here — standing
//! up the WARC/WET crawl and the Postgres-backed index it populates is a
//! deployment concern outside this crate, which only ever reads that index.

mod args;
mod report;
mod source;

use std::collections::HashMap;
use std::fs::File;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use args::{Args, Command, Mode, RunArgs};
use wpdxf_collector::{HtmlCache, ResourceCollector};
use wpdxf_em::EmScorer;
use wpdxf_index::IndexEngine;
use wpdxf_pairs::Pair;
use source::PipelineSource;

fn main() -> Result<()> {
    let args = Args::parse();
    match args.cmd {
        Command::Run(run_args) => run(run_args),
    }
}

/// Reads `benchmark`'s `input_col`/`output_col` columns into a flat list of
/// `(input, output)` string pairs, in file order.
fn load_benchmark(path: &std::path::Path, input_col: &str, output_col: &str) -> Result<Vec<(String, String)>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening benchmark csv {}", path.display()))?;
    let headers = reader.headers()?.clone();
    let input_idx = headers
        .iter()
        .position(|h| h == input_col)
        .with_context(|| format!("benchmark csv has no column named '{input_col}'"))?;
    let output_idx = headers
        .iter()
        .position(|h| h == output_col)
        .with_context(|| format!("benchmark csv has no column named '{output_col}'"))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let input = record.get(input_idx).unwrap_or("").to_string();
        let output = record.get(output_idx).unwrap_or("").to_string();
        if input.is_empty() || output.is_empty() {
            log::warn!("dropping benchmark row with an empty input or output");
            continue;
        }
        rows.push((input, output));
    }
    Ok(rows)
}

/// Reproducible examples/queries split (models `load_and_prepare_examples`
/// in `original_source/.../app/main.py`: a seeded shuffle, then a prefix of
/// fixed size becomes the worked examples and the remainder becomes held-out
/// queries whose true output the caller keeps only for accuracy reporting).
fn split_examples_and_queries(
    mut rows: Vec<(String, String)>,
    seed: u64,
    num_examples: usize,
) -> (Vec<(String, String)>, Vec<(String, String)>) {
    let mut rng = StdRng::seed_from_u64(seed);
    rows.shuffle(&mut rng);
    let split = num_examples.min(rows.len());
    let queries = rows.split_off(split);
    (rows, queries)
}

fn run(args: RunArgs) -> Result<()> {
    std::fs::create_dir_all(&args.report_dir)
        .with_context(|| format!("creating report directory {}", args.report_dir.display()))?;
    let log_file = File::create(args.report_dir.join("logfile.log"))
        .with_context(|| "creating logfile.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    wpdxf_config::init(args.config.as_deref())?;
    let cfg = wpdxf_config::get();

    if args.mode != Mode::Wp {
        anyhow::bail!(
            "mode {} is not implemented by this crate; only WP (web-page element extraction) is",
            args.mode
        );
    }

    let max_rel_tf = args.max_rel_tf.unwrap_or(cfg.max_rel_tf);
    let max_corpus_freq = cfg.max_corpus_freq;

    let rows = load_benchmark(&args.benchmark, &args.input_col, &args.output_col)?;
    let total_rows = rows.len();
    let (examples, queries) = split_examples_and_queries(rows, args.seed, args.num_examples);
    log::info!(
        "loaded {total_rows} benchmark rows, split into {} examples and {} queries",
        examples.len(),
        queries.len()
    );

    let ground_truth: HashMap<String, String> = queries.iter().cloned().collect();
    let query_strings: Vec<String> = queries.iter().map(|(x, _)| x.clone()).collect();
    let example_pairs: Vec<Pair> = examples
        .iter()
        .map(|(x, y)| Pair::make_example(x.clone(), y.clone()))
        .collect();
    let em_examples: Vec<(String, String)> = examples;

    let index = IndexEngine::connect(&cfg.postgres_config)?;
    let collector = ResourceCollector::new(&cfg.url_cache, args.tau, args.limit);
    let html_cache = HtmlCache::new(format!("{}/html", cfg.base_path));

    let mut source = PipelineSource::new(
        index,
        collector,
        html_cache,
        example_pairs,
        args.tau,
        args.enrich_predicates,
        args.term_match.into(),
        max_rel_tf,
        max_corpus_freq,
    );

    let report_builder = report::RunReport::from_args(&args, total_rows, query_strings.len());

    let started = Instant::now();
    let scorer = EmScorer::default();
    let em_result = scorer.run(&em_examples, &query_strings, &mut source);
    let elapsed = started.elapsed();

    log::info!(
        "EM converged after {} iterations ({} of {} queries answered)",
        em_result.iterations,
        em_result.answers.values().filter(|a| a.is_some()).count(),
        query_strings.len()
    );

    let report = report_builder.finish(
        ground_truth,
        source.last_groups,
        source.outcomes,
        em_result,
        elapsed,
    );
    report::write_report(&args.report_dir, &report)?;

    Ok(())
}
