//! Wrapper induction (C7-C10): reduces example ambiguity, aligns and
//! merges per-example XPaths into a generalised program, and enriches its
//! predicates against the true targets.
//!
//! Grounded throughout in `original_source/.../wrapping/models/nielandt/`,
//! the only wrapper-induction model variant under `src/` (the `basic`
//! model lives solely under the older `app/` tree and its approach —
//! interning raw XPath strings and joining distinct ones with `|` — is not
//! a generalising induction at all, so it is not ported here).

pub mod align;
pub mod enrich;
pub mod induce;
pub mod merge;
pub mod reduce;

pub use align::align;
pub use enrich::{enrich, preprocess, StepClassification};
pub use induce::induce;
pub use merge::merge;
pub use reduce::{reduce, reduce_ambiguity};
