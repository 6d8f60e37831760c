//! Per-URI partitioning and sliding-window mask matching (spec.md §4.2,
//! §9 "Coroutine-like iteration").
//!
//! A posting row is `(uri_id, position, token_id)`. The engine fetches rows
//! ordered by `(uri_id, position)` for exactly the token ids a query's
//! pair-halves care about, then groups consecutive same-`uri_id` rows into
//! a partition and slides a fixed-size window over it. Grouping + windowing
//! are expressed as plain iterator adapters so a caller backed by a real
//! streaming cursor (e.g. `Client::query_raw` over a portal) can plug in
//! without changing this module.

/// One posting row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub uri_id: i64,
    pub position: i64,
    pub token_id: i64,
}

/// A query pair-half's matching mask: the ordered `(token_id,
/// relative_offset)` tuples with the first token's offset normalised to 0.
#[derive(Debug, Clone)]
pub struct Mask(pub Vec<(i64, i64)>);

impl Mask {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True iff `window` (already sorted by position, same length as the
    /// mask) matches this mask element-wise after renormalising the first
    /// element's position to 0.
    pub fn matches(&self, window: &[Posting]) -> bool {
        if window.len() != self.0.len() {
            return false;
        }
        let base = window[0].position;
        window
            .iter()
            .zip(self.0.iter())
            .all(|(row, (tok, off))| row.token_id == *tok && (row.position - base) == *off)
    }
}

/// Groups postings (assumed sorted by `(uri_id, position)`) into
/// per-uri partitions, yielded lazily.
pub fn partition_by_uri(
    postings: impl IntoIterator<Item = Posting>,
) -> impl Iterator<Item = (i64, Vec<Posting>)> {
    let mut iter = postings.into_iter().peekable();
    std::iter::from_fn(move || {
        let first = iter.next()?;
        let mut group = vec![first];
        while let Some(next) = iter.peek() {
            if next.uri_id == first.uri_id {
                group.push(iter.next().unwrap());
            } else {
                break;
            }
        }
        Some((first.uri_id, group))
    })
}

/// True iff `mask` matches somewhere in `partition` — slides a window of
/// `mask.len()` rows across the (position-sorted) partition.
pub fn partition_matches(partition: &[Posting], mask: &Mask) -> bool {
    if mask.is_empty() || partition.len() < mask.len() {
        return false;
    }
    partition.windows(mask.len()).any(|w| mask.matches(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(uri_id: i64, position: i64, token_id: i64) -> Posting {
        Posting {
            uri_id,
            position,
            token_id,
        }
    }

    #[test]
    fn partitions_group_consecutive_same_uri_rows() {
        let rows = vec![p(1, 0, 10), p(1, 1, 11), p(2, 0, 10)];
        let parts: Vec<_> = partition_by_uri(rows).collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, 1);
        assert_eq!(parts[0].1.len(), 2);
        assert_eq!(parts[1].0, 2);
    }

    #[test]
    fn mask_matches_window_with_same_relative_offsets() {
        let mask = Mask(vec![(10, 0), (11, 1)]);
        let window = vec![p(1, 5, 10), p(1, 6, 11)];
        assert!(mask.matches(&window));
        let mismatched = vec![p(1, 5, 10), p(1, 8, 11)];
        assert!(!mask.matches(&mismatched));
    }

    #[test]
    fn partition_matches_scans_every_window() {
        let partition = vec![p(1, 0, 99), p(1, 1, 10), p(1, 2, 11)];
        let mask = Mask(vec![(10, 0), (11, 1)]);
        assert!(partition_matches(&partition, &mask));
    }
}
