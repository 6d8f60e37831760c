//! DOM evaluator (C6): HTML parsing, axis/predicate evaluation of typed
//! XPath programs, the `token_equals`/`token_contains` matching rule, and
//! the `WebPage`/`Resource` value types (spec.md §3).

pub mod apply;
pub mod eval;
pub mod html;
pub mod page;
pub mod tokenmatch;

pub use apply::{apply_program, evaluate_initial, evaluate_initial_mode, TermMatch};
pub use eval::{eval_path, eval_relative_xpath, path_from, subtree_root};
pub use html::Html;
pub use page::{Resource, WebPage};
pub use tokenmatch::{token_contains, token_equals};

pub use markup5ever_rcdom::Handle;
