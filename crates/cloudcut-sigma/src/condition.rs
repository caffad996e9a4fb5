//! Condition expressions: `selection and not filter`, `1 of selection_*`,
//! `all of them`.
//!
//! The PEG grammar carries the precedence (OR loosest, then AND, then NOT),
//! so lowering the parse tree is a direct walk: each grammar layer collapses
//! to its single child or folds its children into one node.

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::error::{Result, SigmaError};

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    /// Reference to a named selection.
    Ref(String),
    /// Quantified group over selection names; `them` is the pattern `*`.
    OfGroup { min: Take, pattern: String },
}

/// How many of an [`Expr::OfGroup`]'s selections must hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Take {
    All,
    AtLeast(u64),
}

#[derive(Parser)]
#[grammar = "src/condition.pest"]
struct ConditionGrammar;

/// Parse a condition expression string.
pub fn parse_condition(input: &str) -> Result<Expr> {
    let mut parsed = ConditionGrammar::parse(Rule::condition, input)
        .map_err(|e| SigmaError::Condition(e.to_string()))?;

    parsed
        .next()
        .and_then(|c| c.into_inner().find(|p| p.as_rule() == Rule::or_expr))
        .map(or_node)
        .ok_or_else(|| SigmaError::Condition(format!("nothing to parse in '{input}'")))
}

fn or_node(pair: Pair<'_, Rule>) -> Expr {
    let mut branches: Vec<Expr> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::and_expr)
        .map(and_node)
        .collect();
    if branches.len() == 1 {
        branches.remove(0)
    } else {
        Expr::Or(branches)
    }
}

fn and_node(pair: Pair<'_, Rule>) -> Expr {
    let mut parts: Vec<Expr> = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::unary)
        .map(unary_node)
        .collect();
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        Expr::And(parts)
    }
}

fn unary_node(pair: Pair<'_, Rule>) -> Expr {
    let mut negated = false;
    let mut atom = None;

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::not_kw => negated = !negated,
            Rule::or_expr => atom = Some(or_node(p)),
            Rule::of_group => atom = Some(group_node(p)),
            Rule::name => atom = Some(Expr::Ref(p.as_str().to_string())),
            _ => {}
        }
    }

    // The grammar guarantees an atom; the empty OR (never matches) is the
    // harmless fallback should that ever change.
    let expr = atom.unwrap_or(Expr::Or(Vec::new()));
    if negated { Expr::Not(Box::new(expr)) } else { expr }
}

fn group_node(pair: Pair<'_, Rule>) -> Expr {
    let mut min = Take::AtLeast(1);
    let mut pattern = String::from("*");

    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::all_kw => min = Take::All,
            // Counts beyond u64 collapse to a threshold that can never be met.
            Rule::count => min = Take::AtLeast(p.as_str().parse().unwrap_or(u64::MAX)),
            Rule::group_pat if !p.as_str().eq_ignore_ascii_case("them") => {
                pattern = p.as_str().to_string();
            }
            _ => {}
        }
    }

    Expr::OfGroup { min, pattern }
}
