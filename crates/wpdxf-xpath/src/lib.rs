//! Typed XPath model (C5): steps, paths, predicates, serialisation and
//! edit-distance utilities shared by the reducer and aligner.

pub mod edit;
pub mod node;
pub mod path;
pub mod predicate;

pub use edit::{backtrack, edit_distance, EditAction, EditOp};
pub use node::{Axis, XPathNode, UNIVERSAL_NODE_TEST};
pub use path::{child_chain, RelativeXPath, XPath, ABS_START_PATH_VAR};
pub use predicate::{hoist, starts_with_text, AttributePredicate, Comparator, Predicate, Rhs};
