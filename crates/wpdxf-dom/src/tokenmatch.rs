//! The `token_equals`/`token_contains` matching rule (spec.md §9 "Custom
//! XPath functions"): equality/containment defined on the ordered token
//! sequences of element text and the query term, using the canonical
//! tokenizer (`wpdxf_pairs::tokenize`) so this matches the index engine's
//! notion of a token exactly.

use wpdxf_pairs::tokenize;

fn tokens(s: &str) -> Vec<String> {
    tokenize(s, None).into_iter().map(|t| t.text).collect()
}

/// True iff `text` and `term` tokenise to the identical sequence.
pub fn token_equals(text: &str, term: &str) -> bool {
    tokens(text) == tokens(term)
}

/// True iff `term`'s token sequence occurs contiguously, in order, inside
/// `text`'s token sequence.
pub fn token_contains(text: &str, term: &str) -> bool {
    let haystack = tokens(text);
    let needle = tokens(term);
    if needle.is_empty() {
        return false;
    }
    if needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equals_ignores_case_and_punctuation() {
        assert!(token_equals("Hello, World!", "hello world"));
    }

    #[test]
    fn contains_requires_contiguous_order() {
        assert!(token_contains("the quick brown fox", "quick brown"));
        assert!(!token_contains("the quick brown fox", "brown quick"));
    }
}
