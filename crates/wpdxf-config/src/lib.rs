//! Process-wide settings resolved once at startup from a JSON file.
//!
//! Modeled after [`sws_crawler::config::CrawlerConfig`]: every field has a
//! `#[serde(default = "default_xxx")]` so a partial (or absent) config file
//! is legal, and the whole thing lives behind a lazily-initialised,
//! effectively-read-only singleton.

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Recognised configuration keys (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_path: String,
    pub wet_paths: String,
    pub wet_files: String,
    pub warc_files: String,
    pub statistics_path: String,
    pub term_store: String,
    pub map_store: String,
    pub url_cache: String,
    pub error_path: String,
    pub log_path: String,
    pub stop_words: String,

    pub postgres_config: String,

    pub cc_domain: String,

    pub num_producer: usize,
    pub num_consumer: usize,

    pub update_stats_each: usize,
    pub max_token_len: usize,
    pub max_corpus_freq: f64,

    /// Wrapper-loop specific: minimum distinct examples a resource must cover.
    pub tau: usize,
    /// Relative-frequency token-drop threshold, interacts with `tau` but is
    /// deliberately independent (spec.md §9 Open Question (b)).
    pub max_rel_tf: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_path: "./data".into(),
            wet_paths: "./data/wet_paths.txt".into(),
            wet_files: "./data/wet".into(),
            warc_files: "./data/warc".into(),
            statistics_path: "./data/stats".into(),
            term_store: "./data/terms".into(),
            map_store: "./data/maps".into(),
            url_cache: "./data/cache/urls".into(),
            error_path: "./data/errors".into(),
            log_path: "./data/wpdxf.log".into(),
            stop_words: "./data/stopwords.txt".into(),
            postgres_config: "postgresql://localhost/wpdxf".into(),
            cc_domain: "https://commoncrawl.s3.amazonaws.com".into(),
            num_producer: 4,
            num_consumer: 4,
            update_stats_each: 1000,
            max_token_len: 32,
            max_corpus_freq: 0.5,
            tau: 2,
            max_rel_tf: 0.5,
        }
    }
}

impl Config {
    /// Loads configuration from `path` (JSON), falling back to defaults for
    /// any missing key. Passing `None` uses pure defaults.
    fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Config::default()),
            Some(path) => {
                let data = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let cfg: Config = serde_json::from_str(&data)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                Ok(cfg)
            }
        }
    }
}

/// One-shot initialisation. Must be called at most once; a second call is a
/// programmer error and returns an error rather than silently overwriting the
/// already-published configuration (malformed config is the one fatal case
/// in the error-handling table).
pub fn init(path: Option<&Path>) -> Result<()> {
    let cfg = Config::load(path)?;
    CONFIG
        .set(cfg)
        .map_err(|_| anyhow::anyhow!("config already initialised"))
}

/// Returns the process-wide configuration.
///
/// # Panics
/// Panics if called before [`init`]. Every entry point must call `init`
/// first, typically as the very first statement in `main`.
pub fn get() -> &'static Config {
    CONFIG
        .get()
        .expect("wpdxf_config::init was not called before wpdxf_config::get")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_self_consistent() {
        let cfg = Config::default();
        assert_eq!(cfg.tau, 2);
        assert!(cfg.max_rel_tf > 0.0 && cfg.max_rel_tf <= 1.0);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let json = r#"{"tau": 5}"#;
        let cfg: Config = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.tau, 5);
        assert_eq!(cfg.num_producer, Config::default().num_producer);
    }
}
