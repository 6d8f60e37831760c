//! Atomic predicates.
//!
//! Predicates are kept *structured* rather than stringly-typed: each
//! variant both serialises to its canonical XPath text and is directly
//! pattern-matchable by the DOM evaluator, which interprets the typed
//! model instead of re-parsing rendered XPath strings. String constants
//! that appear in a predicate are hoisted into a variable binding map under
//! a deterministic name, so equal constants share a binding and the
//! serialised XPath never embeds a raw string literal (spec.md §9
//! "Variable hoisting in XPath").

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Gt => ">",
            Comparator::Le => "<=",
            Comparator::Ge => ">=",
        }
    }
}

/// The right-hand side of a generic comparison predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Rhs {
    Int(i64),
    Var(String),
    Raw(String),
}

impl Rhs {
    fn render(&self) -> String {
        match self {
            Rhs::Int(i) => i.to_string(),
            Rhs::Var(v) => format!("${v}"),
            Rhs::Raw(s) => s.clone(),
        }
    }
}

/// A single atomic predicate. Each variant is produced by a specific part
/// of the pipeline: `Position` by the step constructor (C5), the rest by
/// the enricher (C9).
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `[n]`, the positional predicate added by `XPathNode`'s step
    /// constructor (rendered bare, no `position() = ` prefix, matching the
    /// original's special case).
    Position(i64),
    /// A generic `left comp right` comparison, for cases not covered by a
    /// more specific variant.
    Compare {
        left: String,
        comp: Comparator,
        right: Rhs,
    },
    /// An opaque boolean test rendered verbatim, e.g. a function call.
    Bare(String),
    /// `[self::tag]`, used to build node-name discriminator disjunctions.
    SelfTag(String),
    /// `[preceding-sibling::tag]`.
    PrecedingSiblingTag(String),
    /// `[@name]`.
    AttributeExists(String),
    /// `[@name = $var]`, `var` names a hoisted string constant.
    AttributeEquals { name: String, var: String },
    /// `[starts-with(text(), $var)]`, `var` names a hoisted string constant.
    StartsWithText { var: String },
    /// `[re:test(text(), '^\d+$')]`, the numeric-regex discriminator.
    NumericText,
}

impl Predicate {
    pub fn position(n: i64) -> Self {
        Predicate::Position(n)
    }

    pub fn compare(left: impl Into<String>, comp: Comparator, right: Rhs) -> Self {
        Predicate::Compare {
            left: left.into(),
            comp,
            right,
        }
    }

    pub fn bare(left: impl Into<String>) -> Self {
        Predicate::Bare(left.into())
    }

    pub fn xpath(&self) -> String {
        match self {
            Predicate::Position(n) => n.to_string(),
            Predicate::Compare { left, comp, right } => {
                format!("{left} {} {}", comp.as_str(), right.render())
            }
            Predicate::Bare(s) => s.clone(),
            Predicate::SelfTag(tag) => format!("self::{tag}"),
            Predicate::PrecedingSiblingTag(tag) => format!("preceding-sibling::{tag}"),
            Predicate::AttributeExists(name) => format!("@{name}"),
            Predicate::AttributeEquals { name, var } => format!("@{name} = ${var}"),
            Predicate::StartsWithText { var } => format!("starts-with(text(), ${var})"),
            Predicate::NumericText => "re:test(text(), '^\\d+$')".to_string(),
        }
    }
}

/// Helpers that build a [`Predicate`] while hoisting any string constant it
/// carries into `variables`.
pub struct AttributePredicate;

impl AttributePredicate {
    pub fn exists(name: &str) -> Predicate {
        Predicate::AttributeExists(name.to_string())
    }

    pub fn equals(name: &str, value: &str, variables: &mut HashMap<String, String>) -> Predicate {
        let var = hoist(value, variables);
        Predicate::AttributeEquals {
            name: name.to_string(),
            var,
        }
    }
}

pub fn starts_with_text(lcp: &str, variables: &mut HashMap<String, String>) -> Predicate {
    let var = hoist(lcp, variables);
    Predicate::StartsWithText { var }
}

/// Deterministic hoisting: the variable name is derived from a stable hash
/// of the constant, so identical constants reuse the same binding.
pub fn hoist(value: &str, variables: &mut HashMap<String, String>) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let name = format!("r{:x}", hasher.finish());
    variables
        .entry(name.clone())
        .or_insert_with(|| value.to_string());
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_predicate_renders_bare_integer() {
        assert_eq!(Predicate::position(3).xpath(), "3");
    }

    #[test]
    fn equal_constants_share_a_hoisted_variable() {
        let mut vars = HashMap::new();
        let a = AttributePredicate::equals("class", "highlight", &mut vars);
        let b = AttributePredicate::equals("class", "highlight", &mut vars);
        assert_eq!(a, b);
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn attribute_existence_has_no_comparison() {
        assert_eq!(AttributePredicate::exists("id").xpath(), "@id");
    }

    #[test]
    fn self_tag_disjunction_renders_with_or() {
        let disjunction = vec![Predicate::SelfTag("a".into()), Predicate::SelfTag("b".into())];
        let rendered = disjunction
            .iter()
            .map(|p| p.xpath())
            .collect::<Vec<_>>()
            .join(" or ");
        assert_eq!(rendered, "self::a or self::b");
    }
}
