//! One-shot query pipeline: lex → preprocess → shunt → evaluate.

use cloudcut_model::Record;
use tracing::debug;

use crate::eval::evaluate;
use crate::lexer::{lex, preprocess};
use crate::shunt::shunt;

/// Filter records with a query expression, preserving input order.
///
/// The program is built once and evaluated per record. An empty expression
/// is the identity — callers are expected to guard against it, but a blank
/// query silently matching nothing would be worse.
pub fn query(records: Vec<Record>, expression: &str) -> Vec<Record> {
    if expression.trim().is_empty() {
        return records;
    }

    let tokens = preprocess(lex(expression));
    debug!(tokens = tokens.len(), "lexed query");

    let program = shunt(tokens);
    debug!(?program, "postfix program");

    records
        .into_iter()
        .filter(|record| evaluate(&program, record))
        .collect()
}
