//! URI-tree (C3): a forest, one root per host, grouping matching URLs by
//! host/path/query/fragment prefix and decomposing into resource groups.
//!
//! Arena-allocated via [`slotmap`], following the same discipline as the
//! teacher's own generic ID-tree: nodes live in a single `SlotMap`, the
//! "parent" relationship is a `NodeId` index rather than an owning
//! `Rc`/`Box` link, so the forest never forms a Rust-level reference cycle
//! (spec.md §9 "Cyclic references").

use std::collections::{BTreeMap, BTreeSet, HashMap};

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    pub struct NodeId;
}

/// The match sets carried by every node: the union, over the node's
/// descendant leaves, of the examples/queries whose matched URL passes
/// through this node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSets {
    pub ex_matches: BTreeSet<usize>,
    pub q_matches: BTreeSet<usize>,
}

#[derive(Debug)]
struct Node {
    label: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    matches: MatchSets,
    /// Set only on leaves: the original URL that terminated here.
    uri: Option<String>,
}

/// A forest of URI-trees: one tree per host, each insertable via
/// [`UriForest::add_uri`].
#[derive(Debug, Default)]
pub struct UriForest {
    sm: SlotMap<NodeId, Node>,
    roots: HashMap<String, NodeId>,
}

/// A decomposed group: the sub-tree root plus a human-readable label for
/// reporting (`host/path/segments`).
pub struct Group {
    pub node: NodeId,
    pub label: String,
}

impl UriForest {
    pub fn new() -> Self {
        UriForest {
            sm: SlotMap::with_key(),
            roots: HashMap::new(),
        }
    }

    /// Splits a URL into `(host, [path_segments..., query?, fragment?])`,
    /// mirroring Python's `urlsplit` usage in the original `URITree`.
    fn split_uri(uri: &str) -> (String, Vec<String>) {
        // Strip scheme.
        let without_scheme = match uri.find("://") {
            Some(idx) => &uri[idx + 3..],
            None => uri,
        };
        let (authority, rest) = match without_scheme.find('/') {
            Some(idx) => (&without_scheme[..idx], &without_scheme[idx..]),
            None => match without_scheme.find(['?', '#']) {
                Some(idx) => (&without_scheme[..idx], &without_scheme[idx..]),
                None => (without_scheme, ""),
            },
        };

        let (path_and_query, fragment) = match rest.find('#') {
            Some(idx) => (&rest[..idx], Some(rest[idx + 1..].to_string())),
            None => (rest, None),
        };
        let (path, query) = match path_and_query.find('?') {
            Some(idx) => (
                &path_and_query[..idx],
                Some(path_and_query[idx + 1..].to_string()),
            ),
            None => (path_and_query, None),
        };

        let mut segments: Vec<String> = path
            .split('/')
            .skip(1) // path always starts with '/'
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        if path.is_empty() {
            segments.clear();
        }
        if let Some(q) = query {
            segments.push(q);
        }
        if let Some(f) = fragment {
            segments.push(f);
        }

        (authority.to_string(), segments)
    }

    /// Inserts `uri` into the forest, creating the host root and every
    /// intermediate path-segment node it doesn't already have, unioning
    /// `ex_matches`/`q_matches` into every node on the path (this is what
    /// keeps the monotonicity invariant true by construction).
    pub fn add_uri(&mut self, uri: &str, ex_matches: BTreeSet<usize>, q_matches: BTreeSet<usize>) {
        let (host, segments) = Self::split_uri(uri);

        let root = *self.roots.entry(host.clone()).or_insert_with(|| {
            self.sm.insert(Node {
                label: host.clone(),
                parent: None,
                children: BTreeMap::new(),
                matches: MatchSets::default(),
                uri: None,
            })
        });

        let mut node = root;
        {
            let n = &mut self.sm[node];
            n.matches.ex_matches.extend(ex_matches.iter().copied());
            n.matches.q_matches.extend(q_matches.iter().copied());
        }

        for seg in &segments {
            let existing = self.sm[node].children.get(seg).copied();
            let child = match existing {
                Some(c) => c,
                None => {
                    let c = self.sm.insert(Node {
                        label: seg.clone(),
                        parent: Some(node),
                        children: BTreeMap::new(),
                        matches: MatchSets::default(),
                        uri: None,
                    });
                    self.sm[node].children.insert(seg.clone(), c);
                    c
                }
            };
            let n = &mut self.sm[child];
            n.matches.ex_matches.extend(ex_matches.iter().copied());
            n.matches.q_matches.extend(q_matches.iter().copied());
            node = child;
        }

        self.sm[node].uri = Some(uri.to_string());
    }

    /// Like [`UriForest::add_uri`], but never creates a host root or path
    /// segment that doesn't already exist: match sets are unioned into
    /// whatever prefix of the path is already present, and traversal stops
    /// at the first missing segment. Used for the query pass in the
    /// resource collector, which must not grow the tree beyond what the
    /// example pass already established (`allow_new=False` in the
    /// original).
    pub fn add_uri_existing_only(
        &mut self,
        uri: &str,
        ex_matches: BTreeSet<usize>,
        q_matches: BTreeSet<usize>,
    ) {
        let (host, segments) = Self::split_uri(uri);
        let mut node = match self.roots.get(&host) {
            Some(id) => *id,
            None => return,
        };
        {
            let n = &mut self.sm[node];
            n.matches.ex_matches.extend(ex_matches.iter().copied());
            n.matches.q_matches.extend(q_matches.iter().copied());
        }
        for seg in &segments {
            let next = match self.sm[node].children.get(seg) {
                Some(c) => *c,
                None => return,
            };
            let n = &mut self.sm[next];
            n.matches.ex_matches.extend(ex_matches.iter().copied());
            n.matches.q_matches.extend(q_matches.iter().copied());
            node = next;
        }
    }

    pub fn roots(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.roots.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn root_for(&self, host: &str) -> Option<NodeId> {
        self.roots.get(host).copied()
    }

    /// Drops any host root whose `|ex_matches| < tau` (spec.md §4.3
    /// "Reduction"). Returns the remaining root ids.
    pub fn prune_roots_below_tau(&mut self, tau: usize) {
        let drop: Vec<String> = self
            .roots
            .iter()
            .filter(|(_, id)| self.sm[**id].matches.ex_matches.len() < tau)
            .map(|(h, _)| h.clone())
            .collect();
        for host in drop {
            if let Some(root) = self.roots.remove(&host) {
                self.remove_subtree(root);
            }
        }
    }

    fn remove_subtree(&mut self, node: NodeId) {
        let children: Vec<NodeId> = self.sm[node].children.values().copied().collect();
        for c in children {
            self.remove_subtree(c);
        }
        self.sm.remove(node);
    }

    pub fn ex_matches(&self, node: NodeId) -> &BTreeSet<usize> {
        &self.sm[node].matches.ex_matches
    }

    pub fn q_matches(&self, node: NodeId) -> &BTreeSet<usize> {
        &self.sm[node].matches.q_matches
    }

    pub fn uri(&self, node: NodeId) -> Option<&str> {
        self.sm[node].uri.as_deref()
    }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.sm[node].children.values().copied()
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.sm[node].children.is_empty()
    }

    /// Dotted path from the forest root down to `node`, e.g.
    /// `"www.example.com/A/A1"`.
    pub fn path(&self, node: NodeId) -> String {
        let mut labels = Vec::new();
        let mut cur = Some(node);
        while let Some(id) = cur {
            labels.push(self.sm[id].label.clone());
            cur = self.sm[id].parent;
        }
        labels.reverse();
        labels.join("/")
    }

    /// All leaf descendants of `node`, found via a plain BFS filter on
    /// "has no children" (ported from `URITree.bfs_filter`).
    pub fn leaves(&self, node: NodeId) -> Vec<NodeId> {
        self.bfs_filter(node, |n| self.sm[n].children.is_empty())
    }

    fn bfs_filter(&self, node: NodeId, pred: impl Fn(NodeId) -> bool) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut queue = vec![node];
        while let Some(n) = queue.pop() {
            if pred(n) {
                result.push(n);
            } else {
                queue.extend(self.sm[n].children.values().copied());
            }
        }
        result
    }

    /// The key algorithm (spec.md §4.3): recursively decide whether to keep
    /// `node` whole or split it into its children's decompositions.
    ///
    /// - `C` = children whose `|ex_matches| >= tau`.
    /// - If `C` is empty, or the union of `C`'s `q_matches` is a *strict*
    ///   subset of `node`'s `q_matches` (i.e. some query match at `node`
    ///   would be lost by descending), return `[node]`.
    /// - Otherwise recurse into `D = union of decompose(c, tau) for c in C`.
    /// - If `D` has more than one element and the `ex_matches` of its
    ///   elements are pairwise disjoint, collapse back to `[node]` (splitting
    ///   would fracture co-occurring examples); otherwise return `D`.
    pub fn decompose(&self, node: NodeId, tau: usize) -> Vec<NodeId> {
        let candidates: Vec<NodeId> = self
            .children(node)
            .filter(|c| self.sm[*c].matches.ex_matches.len() >= tau)
            .collect();

        if candidates.is_empty() {
            return vec![node];
        }

        let mut union_q: BTreeSet<usize> = BTreeSet::new();
        for c in &candidates {
            union_q.extend(self.sm[*c].matches.q_matches.iter().copied());
        }
        let node_q = &self.sm[node].matches.q_matches;
        if union_q.is_subset(node_q) && union_q != *node_q {
            return vec![node];
        }

        let mut d = Vec::new();
        for c in &candidates {
            d.extend(self.decompose(*c, tau));
        }

        if d.len() > 1 && Self::pairwise_disjoint(&d, |id| &self.sm[*id].matches.ex_matches) {
            return vec![node];
        }

        d
    }

    fn pairwise_disjoint<'a, F>(ids: &'a [NodeId], get: F) -> bool
    where
        F: Fn(&'a NodeId) -> &'a BTreeSet<usize>,
    {
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if !get(&ids[i]).is_disjoint(get(&ids[j])) {
                    return false;
                }
            }
        }
        true
    }

    /// Convenience: decompose every root, labelling each group with its
    /// dotted path.
    pub fn decompose_all(&self, tau: usize) -> Vec<Group> {
        let mut groups = Vec::new();
        let roots: Vec<NodeId> = self.roots.values().copied().collect();
        for root in roots {
            for node in self.decompose(root, tau) {
                groups.push(Group {
                    node,
                    label: self.path(node),
                });
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    #[test]
    fn add_uri_builds_labelled_path_and_leaf() {
        let mut f = UriForest::new();
        f.add_uri(
            "https://www.exA.com/stepA/stepC",
            set(&[0]),
            set(&[1]),
        );
        let root = f.root_for("www.exA.com").unwrap();
        assert_eq!(f.ex_matches(root), &set(&[0]));
        assert_eq!(f.q_matches(root), &set(&[1]));
        assert_eq!(f.children(root).count(), 1);

        let step_a = f.children(root).next().unwrap();
        let step_c = f.children(step_a).next().unwrap();
        assert!(f.is_leaf(step_c));
        assert_eq!(f.uri(step_c), Some("https://www.exA.com/stepA/stepC"));
    }

    #[test]
    fn monotonicity_holds_across_multiple_uris() {
        let mut f = UriForest::new();
        f.add_uri("http://www.exA.com/stepA/stepC", set(&[1]), set(&[0]));
        f.add_uri("http://www.exA.com/stepA/stepD", set(&[1]), set(&[0]));
        f.add_uri("http://www.exA.com/stepB", set(&[0]), set(&[0]));
        f.add_uri("http://www.exB.com/stepA", set(&[0]), set(&[1]));

        let mut hosts: Vec<&str> = f.roots().map(|(h, _)| h).collect();
        hosts.sort();
        assert_eq!(hosts, vec!["www.exA.com", "www.exB.com"]);

        let root_a = f.root_for("www.exA.com").unwrap();
        assert_eq!(f.leaves(root_a).len(), 3);
        assert_eq!(f.children(root_a).count(), 2);

        let root_b = f.root_for("www.exB.com").unwrap();
        assert_eq!(f.leaves(root_b).len(), 1);
    }

    /// spec.md §8 scenario 1.
    #[test]
    fn decompose_split_preserves_queries() {
        let mut f = UriForest::new();
        f.add_uri(
            "http://example.com/A/A1/C",
            set(&[0, 1]),
            set(&[0, 4]),
        );
        f.add_uri(
            "http://example.com/A/A1/D",
            set(&[2, 3]),
            set(&[1, 2]),
        );
        f.add_uri(
            "http://example.com/B/B1/F",
            set(&[0, 1]),
            set(&[0, 1]),
        );
        f.add_uri(
            "http://example.com/B/B1/G",
            set(&[2, 3]),
            set(&[2, 3]),
        );
        f.add_uri(
            "http://example.com/B/B1/O",
            set(&[0, 1]),
            set(&[2, 3]),
        );
        f.add_uri("http://example.com/B/B2/H", set(&[]), set(&[5]));
        f.add_uri("http://example.com/C/C1/C", set(&[]), set(&[5]));
        f.add_uri("http://example.com/D/D1/D", set(&[0, 1]), set(&[]));

        let root = f.root_for("example.com").unwrap();
        let groups = f.decompose(root, 2);
        let labels: BTreeSet<String> = groups
            .iter()
            .map(|id| {
                let p = f.path(*id);
                p.rsplit('/').next().unwrap().to_string()
            })
            .collect();
        let expected: BTreeSet<String> = ["A1", "B", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(labels, expected);
    }

    #[test]
    fn decompose_every_group_meets_tau_and_covers_root() {
        let mut f = UriForest::new();
        f.add_uri("http://www.exA.com/stepA/stepC", set(&[0]), set(&[1]));
        f.add_uri("http://www.exA.com/stepA/stepD", set(&[1]), set(&[0]));
        f.add_uri("http://www.exA.com/stepB", set(&[0, 1]), set(&[0]));
        f.add_uri("http://www.exB.com/stepA", set(&[0, 1]), set(&[0]));

        for (host, root) in f.roots().map(|(h, id)| (h.to_string(), id)).collect::<Vec<_>>() {
            let _ = host;
            let root_ex: BTreeSet<usize> = f.ex_matches(root).clone();
            let groups = f.decompose(root, 2);
            let mut union = BTreeSet::new();
            for g in &groups {
                union.extend(f.ex_matches(*g).iter().copied());
                assert!(f.ex_matches(*g).len() >= 2 || f.ex_matches(*g) == &root_ex);
            }
        }
    }
}
