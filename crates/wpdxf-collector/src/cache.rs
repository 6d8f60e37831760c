//! Content-addressed disk caches (spec.md §6): the per-pair URL-list cache
//! and the per-URL HTML cache. Both are gzip files under a directory,
//! keyed by a SHA-1-derived filename; a missing file is treated as a cache
//! miss, never an error (spec.md §7 "missing cache file").

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use sha1::{Digest, Sha1};

use wpdxf_pairs::Pair;

fn sha1_hex(s: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `sha1(input) + "_" + sha1(output)`; `output` is the empty string for a
/// `Query` (matching `pair_to_cache_key` in the original).
pub fn pair_cache_key(pair: &Pair) -> String {
    let inp = sha1_hex(pair.input());
    let out = sha1_hex(pair.output().unwrap_or(""));
    format!("{inp}_{out}")
}

/// Directory-backed cache of `pair -> Vec<url>`, one gzip file per pair,
/// one URL per line.
pub struct UrlCache {
    dir: PathBuf,
}

impl UrlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        UrlCache { dir: dir.into() }
    }

    fn path_for(&self, pair: &Pair) -> PathBuf {
        self.dir.join(format!("{}.gz", pair_cache_key(pair)))
    }

    pub fn get(&self, pair: &Pair) -> Option<Vec<String>> {
        let path = self.path_for(pair);
        let file = fs::File::open(&path).ok()?;
        let mut decoder = GzDecoder::new(file);
        let mut contents = String::new();
        if decoder.read_to_string(&mut contents).is_err() {
            return None;
        }
        Some(contents.lines().map(|l| l.to_string()).collect())
    }

    pub fn put(&self, pair: &Pair, urls: &[String]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating url cache dir {}", self.dir.display()))?;
        let path = self.path_for(pair);
        let file = fs::File::create(&path)
            .with_context(|| format!("creating cache file {}", path.display()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        for url in urls {
            writeln!(encoder, "{url}")?;
        }
        encoder.finish()?;
        Ok(())
    }
}

/// Directory-backed cache of `url -> cleaned HTML`, keyed by `sha1(url)`.
/// A miss triggers an on-demand fetch (stubbed here as a direct blocking
/// GET, since the CDX/WARC byte-range lookup pipeline is out of scope);
/// a fetch failure returns `None` and the page is skipped by the caller.
pub struct HtmlCache {
    dir: PathBuf,
}

impl HtmlCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        HtmlCache { dir: dir.into() }
    }

    fn path_for(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.gz", sha1_hex(url)))
    }

    pub fn get(&self, url: &str) -> Option<String> {
        let path = self.path_for(url);
        let file = fs::File::open(&path).ok()?;
        let mut decoder = GzDecoder::new(file);
        let mut contents = String::new();
        decoder.read_to_string(&mut contents).ok()?;
        Some(contents)
    }

    pub fn put(&self, url: &str, html: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating html cache dir {}", self.dir.display()))?;
        let path = self.path_for(url);
        let file = fs::File::create(&path)
            .with_context(|| format!("creating cache file {}", path.display()))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(html.as_bytes())?;
        encoder.finish()?;
        Ok(())
    }

    /// Returns the page's HTML, consulting the cache first and falling back
    /// to an on-demand fetch. Any failure (network error, non-2xx status)
    /// is logged and yields `None`; callers must treat that as "page
    /// skipped", never propagate it as a hard error.
    pub fn get_or_fetch(&self, url: &str) -> Option<String> {
        if let Some(html) = self.get(url) {
            return Some(html);
        }
        match fetch(url) {
            Ok(html) => {
                if let Err(e) = self.put(url, &html) {
                    log::warn!("failed to write html cache entry for {url}: {e}");
                }
                Some(html)
            }
            Err(e) => {
                log::warn!("on-demand fetch failed for {url}: {e}");
                None
            }
        }
    }
}

fn fetch(url: &str) -> Result<String> {
    let resp = reqwest::blocking::get(url).with_context(|| format!("fetching {url}"))?;
    let text = resp.text().with_context(|| format!("reading body of {url}"))?;
    Ok(text)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("creating directory {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_cache_key_uses_empty_output_for_queries() {
        let ex = Pair::make_example("in", "out");
        let q = Pair::make_query("in");
        let ex_key = pair_cache_key(&ex);
        let q_key = pair_cache_key(&q);
        assert_ne!(ex_key, q_key);
        assert!(q_key.ends_with(&sha1_hex("")));
    }

    #[test]
    fn url_cache_roundtrips_through_gzip() {
        let dir = std::env::temp_dir().join(format!("wpdxf-test-{}", sha1_hex("roundtrip")));
        let cache = UrlCache::new(&dir);
        let pair = Pair::make_example("in", "out");
        cache.put(&pair, &["http://a".to_string(), "http://b".to_string()]).unwrap();
        let urls = cache.get(&pair).unwrap();
        assert_eq!(urls, vec!["http://a", "http://b"]);
        let _ = fs::remove_dir_all(&dir);
    }
}
