//! Tokenizer and the `Pair`/`Example`/`Query` value types (C1).
//!
//! Grounded in the teacher's text-handling conventions (plain, deterministic
//! free functions with no hidden state beyond an optional stopword set) and
//! in `original_source/.../wrapping/objects/pairs.py`'s `Pair`/`Example`/
//! `Query` split.

use std::collections::BTreeSet;

/// Tokens longer than this are split into consecutive sub-tokens of this
/// length (spec.md §3). Overridable via `wpdxf_config`; this is the
/// library-level fallback used by callers that don't thread a `Config`
/// through.
pub const DEFAULT_MAX_TOKEN_LEN: usize = 32;

/// A single normalised token together with its 0-based position within the
/// text it was extracted from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token {
    pub text: String,
    pub position: usize,
}

/// Unicode-aware, NIST-style tokenisation: split on runs of non-alphanumeric
/// characters (treating each contiguous alphanumeric run as one candidate
/// token), lowercase, drop candidates with no alphanumeric content, then
/// split any overlong candidate into consecutive fixed-length chunks so that
/// every emitted token is within `max_token_len`. Deterministic and
/// identity-restartable: calling it twice on the same input, or on a prefix
/// of the input re-tokenised from scratch, never changes already-assigned
/// positions for the overlapping content.
pub fn tokenize(text: &str, ignore_stopwords: Option<&BTreeSet<String>>) -> Vec<Token> {
    tokenize_with_max_len(text, ignore_stopwords, DEFAULT_MAX_TOKEN_LEN)
}

pub fn tokenize_with_max_len(
    text: &str,
    ignore_stopwords: Option<&BTreeSet<String>>,
    max_token_len: usize,
) -> Vec<Token> {
    let mut out = Vec::new();
    let mut position = 0usize;

    for raw in text.split(|c: char| !c.is_alphanumeric()) {
        if raw.is_empty() {
            continue;
        }
        let lower = raw.to_lowercase();
        if !lower.chars().any(|c| c.is_alphanumeric()) {
            continue;
        }
        if let Some(stop) = ignore_stopwords {
            if stop.contains(&lower) {
                continue;
            }
        }

        let chars: Vec<char> = lower.chars().collect();
        if chars.len() <= max_token_len {
            out.push(Token {
                text: lower,
                position,
            });
            position += 1;
        } else {
            for chunk in chars.chunks(max_token_len) {
                out.push(Token {
                    text: chunk.iter().collect(),
                    position,
                });
                position += 1;
            }
        }
    }

    out
}

/// A pair of strings the pipeline is trying to find in the corpus: either a
/// worked example (`input -> output`) or a bare query (`input` only, output
/// to be discovered).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pair {
    Example { input: String, output: String },
    Query { input: String },
}

impl Pair {
    /// Builds an `Example`. Panics if `output` is empty — constructing an
    /// example without an output is a programmer error, matching the
    /// Python original's `ValueError` in `Example.__init__`.
    pub fn make_example(input: impl Into<String>, output: impl Into<String>) -> Pair {
        let output = output.into();
        assert!(
            !output.is_empty(),
            "Example requires a non-empty output string"
        );
        Pair::Example {
            input: input.into(),
            output,
        }
    }

    pub fn make_query(input: impl Into<String>) -> Pair {
        Pair::Query {
            input: input.into(),
        }
    }

    pub fn input(&self) -> &str {
        match self {
            Pair::Example { input, .. } => input,
            Pair::Query { input } => input,
        }
    }

    pub fn output(&self) -> Option<&str> {
        match self {
            Pair::Example { output, .. } => Some(output),
            Pair::Query { .. } => None,
        }
    }

    pub fn is_example(&self) -> bool {
        matches!(self, Pair::Example { .. })
    }

    /// Ordered token sequence for the input half.
    pub fn tok_inp(&self) -> Vec<Token> {
        tokenize(self.input(), None)
    }

    /// Ordered token sequence for the output half, if any.
    pub fn tok_out(&self) -> Option<Vec<Token>> {
        self.output().map(|o| tokenize(o, None))
    }

    /// Unordered set of distinct tokens across input (and output, if any).
    pub fn tokens(&self) -> BTreeSet<String> {
        let mut set: BTreeSet<String> = self.tok_inp().into_iter().map(|t| t.text).collect();
        if let Some(tok_out) = self.tok_out() {
            set.extend(tok_out.into_iter().map(|t| t.text));
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_ordered_lowercase_alphanumeric() {
        let toks = tokenize("Hello, World! 123", None);
        let texts: Vec<_> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["hello", "world", "123"]);
        for (i, t) in toks.iter().enumerate() {
            assert_eq!(t.position, i);
        }
    }

    #[test]
    fn punctuation_only_runs_are_dropped() {
        let toks = tokenize("--- ??? ...", None);
        assert!(toks.is_empty());
    }

    #[test]
    fn overlong_tokens_are_split_into_chunks() {
        let long = "a".repeat(70);
        let toks = tokenize_with_max_len(&long, None, 32);
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[0].text.len(), 32);
        assert_eq!(toks[1].text.len(), 32);
        assert_eq!(toks[2].text.len(), 6);
        assert_eq!(toks[2].position, 2);
    }

    #[test]
    fn stopwords_are_removed_when_requested() {
        let mut stop = BTreeSet::new();
        stop.insert("the".to_string());
        let toks = tokenize("the quick fox", Some(&stop));
        let texts: Vec<_> = toks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["quick", "fox"]);
    }

    #[test]
    #[should_panic]
    fn example_requires_non_empty_output() {
        Pair::make_example("input", "");
    }

    #[test]
    fn query_has_no_output() {
        let q = Pair::make_query("input");
        assert_eq!(q.output(), None);
        assert!(!q.is_example());
    }
}
