//! Command-line surface (spec.md §6). Only `run` is implemented: the
//! out-of-scope `retrieve` ingestion command (WARC/WET scanning into the
//! index store) is never CLI-surfaced by this crate.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use wpdxf_dom::TermMatch;

/// WPDXF wrapper induction and question answering
#[derive(Debug, Parser)]
#[command(name = "wpdxf", version)]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the wrap loop plus EM scorer over a benchmark and write a report
    Run(RunArgs),
}

/// Which extraction head a benchmark targets. Only `Wp` (web-page element
/// extraction, C1-C12 as specified) is implemented; `Wt`/`Fe` name the
/// other two modes the original exposes but are out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    #[value(name = "WP")]
    Wp,
    #[value(name = "WT")]
    Wt,
    #[value(name = "FE")]
    Fe,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Mode::Wp => "WP",
            Mode::Wt => "WT",
            Mode::Fe => "FE",
        };
        f.write_str(s)
    }
}

/// Which custom XPath term-matching function (spec.md §9) governs initial
/// evaluation: exact token match only, or falling back to a contiguous
/// token-subsequence match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TermMatchArg {
    Eq,
    Cn,
}

impl From<TermMatchArg> for TermMatch {
    fn from(value: TermMatchArg) -> Self {
        match value {
            TermMatchArg::Eq => TermMatch::Equals,
            TermMatchArg::Cn => TermMatch::Contains,
        }
    }
}

impl std::fmt::Display for TermMatchArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TermMatchArg::Eq => "eq",
            TermMatchArg::Cn => "cn",
        };
        f.write_str(s)
    }
}

#[derive(Debug, clap::Args)]
pub struct RunArgs {
    /// Extraction head: WP (web page), WT (web table) or FE (free entity)
    #[arg(short = 'm', long, value_enum)]
    pub mode: Mode,

    /// CSV file with one row per known (input, output) pair
    #[arg(short = 'b', long)]
    pub benchmark: PathBuf,

    /// Benchmark column holding the input string
    #[arg(long = "input")]
    pub input_col: String,

    /// Benchmark column holding the output string
    #[arg(long = "output")]
    pub output_col: String,

    /// Seed for the reproducible examples/queries split
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of benchmark rows to keep as worked examples; the rest become
    /// queries
    #[arg(long)]
    pub num_examples: usize,

    /// Minimum distinct examples a resource must cover to be wrapped
    #[arg(long, default_value_t = 2)]
    pub tau: usize,

    /// Enrich induced predicates against the true targets (spec.md §4.9)
    #[arg(long)]
    pub enrich_predicates: bool,

    /// Term-matching rule used for initial evaluation
    #[arg(long = "tm", value_enum, default_value_t = TermMatchArg::Cn)]
    pub term_match: TermMatchArg,

    /// Overrides `max_rel_tf` from the configuration file
    #[arg(long = "tf")]
    pub max_rel_tf: Option<f64>,

    /// Directory the run report is written to
    #[arg(long, default_value = "./report")]
    pub report_dir: PathBuf,

    /// Maximum number of resource groups to wrap per EM round
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Path to a JSON configuration file overriding defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
}
