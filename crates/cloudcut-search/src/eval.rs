//! Postfix evaluation and the polymorphic comparator.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use cloudcut_model::Record;
use regex::RegexBuilder;
use tracing::debug;

use crate::lexer::{Op, Token};
use crate::resolve::resolve;
use crate::value::Value;

/// Evaluate a postfix program against a record.
///
/// Terms push their resolved value; operators pop two operands (the upper
/// one is the right). A stray parenthesis in the program consumes operands
/// like an operator but always yields false. If the stack does not end with
/// exactly one boolean, the whole query is false for this record — the
/// uniform policy for malformed expressions.
pub fn evaluate(program: &[Token], record: &Record) -> bool {
    let mut stack: Vec<Value> = Vec::new();

    for token in program {
        match token {
            Token::Term(term) => stack.push(resolve(term, record)),
            _ => {
                if stack.len() < 2 {
                    return false;
                }
                let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                    return false;
                };
                let result = match token {
                    Token::Op(op) => compute(&left, *op, &right),
                    _ => false,
                };
                debug!(%left, op = ?token, %right, result, "compute");
                stack.push(Value::Bool(result));
            }
        }
    }

    matches!(stack.as_slice(), [Value::Bool(true)])
}

/// Apply one binary operator to two resolved values.
///
/// A list on the left fans out existentially. `AND`/`OR` coerce to boolean.
/// Comparisons stringify both sides and try timestamp, then numeric, then
/// string interpretation; `LIKE` goes straight to the string branch.
pub fn compute(left: &Value, op: Op, right: &Value) -> bool {
    if let Value::List(items) = left {
        return items.iter().any(|item| compute(item, op, right));
    }

    match op {
        Op::And => return left.truthy() && right.truthy(),
        Op::Or => return left.truthy() || right.truthy(),
        _ => {}
    }

    let l = left.comparand();
    let r = right.comparand();

    if op != Op::Like {
        if let (Some(lt), Some(rt)) = (parse_stamp(&l), parse_stamp(&r)) {
            return match op {
                Op::Eq => lt == rt,
                Op::Ne => lt != rt,
                Op::Gt => lt > rt,
                Op::Ge => lt >= rt,
                Op::Lt => lt < rt,
                Op::Le => lt <= rt,
                Op::And | Op::Or | Op::Like => false,
            };
        }

        if let (Ok(lf), Ok(rf)) = (l.parse::<f64>(), r.parse::<f64>()) {
            return match op {
                Op::Eq => (lf - rf).abs() < f64::EPSILON,
                Op::Ne => (lf - rf).abs() >= f64::EPSILON,
                Op::Gt => lf > rf,
                Op::Ge => lf >= rf,
                Op::Lt => lf < rf,
                Op::Le => lf <= rf,
                Op::And | Op::Or | Op::Like => false,
            };
        }
    }

    // Equality is case-insensitive; ordering is byte-lexicographic.
    // The asymmetry is a preserved contract, not an oversight.
    match op {
        Op::Eq => l.eq_ignore_ascii_case(&r),
        Op::Ne => !l.eq_ignore_ascii_case(&r),
        Op::Gt => l > r,
        Op::Ge => l >= r,
        Op::Lt => l < r,
        Op::Le => l <= r,
        Op::Like => like_match(&l, &r),
        Op::And | Op::Or => false,
    }
}

/// Try the accepted timestamp shapes, normalised onto a naive instant:
/// date-only anchors at midnight, time-only on year 0's Jan 1, and
/// offset-carrying values convert to UTC.
fn parse_stamp(s: &str) -> Option<NaiveDateTime> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    if let Ok(time) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
        return NaiveDate::from_ymd_opt(0, 1, 1).map(|d| d.and_time(time));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok()
}

/// `LIKE`: wildcard pattern when `*` or `%` is present, otherwise a
/// case-insensitive substring test. Both wildcards match any run of
/// characters; everything else is taken literally. The match is anchored
/// over the full left string.
fn like_match(left: &str, pattern: &str) -> bool {
    if !pattern.contains(['*', '%']) {
        return left.to_lowercase().contains(&pattern.to_lowercase());
    }

    let escaped = regex::escape(pattern).replace(r"\*", ".*").replace('%', ".*");
    let anchored = format!("^{escaped}$");
    match RegexBuilder::new(&anchored).case_insensitive(true).build() {
        Ok(re) => re.is_match(left),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{lex, preprocess};
    use crate::shunt::shunt;

    fn program(q: &str) -> Vec<Token> {
        shunt(preprocess(lex(q)))
    }

    #[test]
    fn test_string_equality_case_insensitive() {
        let l = Value::Str("MailItemsAccessed".into());
        let r = Value::Str("mailitemsaccessed".into());
        assert!(compute(&l, Op::Eq, &r));
        assert!(!compute(&l, Op::Ne, &r));
    }

    #[test]
    fn test_string_ordering_is_byte_lexicographic() {
        // 'B' < 'a' in byte order even though equality folds case.
        let upper = Value::Str("B".into());
        let lower = Value::Str("a".into());
        assert!(compute(&upper, Op::Lt, &lower));
        assert!(!compute(&upper, Op::Gt, &lower));
    }

    #[test]
    fn test_numeric_comparison() {
        assert!(compute(&Value::Str("9".into()), Op::Lt, &Value::Str("10".into())));
        assert!(compute(&Value::Num(1200.0), Op::Gt, &Value::Str("999".into())));
        assert!(compute(&Value::Str("1.5".into()), Op::Eq, &Value::Str("1.50".into())));
    }

    #[test]
    fn test_string_fallback_when_one_side_not_numeric() {
        // "9" < "10" numerically but "9" > "10x" as strings.
        assert!(compute(&Value::Str("9".into()), Op::Gt, &Value::Str("10x".into())));
    }

    #[test]
    fn test_timestamp_comparison() {
        let ts = Value::Str("2024-06-15T12:00:00Z".into());
        assert!(compute(&ts, Op::Ge, &Value::Str("2024-01-01".into())));
        assert!(compute(&ts, Op::Lt, &Value::Str("2025-01-01".into())));
        assert!(compute(
            &Value::Str("2024-06-15".into()),
            Op::Eq,
            &Value::Str("2024-06-15".into()),
        ));
    }

    #[test]
    fn test_timestamp_offset_normalised() {
        assert!(compute(
            &Value::Str("2024-06-15T14:00:00+02:00".into()),
            Op::Eq,
            &Value::Str("2024-06-15T12:00:00Z".into()),
        ));
    }

    #[test]
    fn test_time_only_comparison() {
        assert!(compute(
            &Value::Str("09:30:00".into()),
            Op::Lt,
            &Value::Str("17:00:00".into()),
        ));
    }

    #[test]
    fn test_like_substring() {
        let subject = Value::Str("Urgent payroll update".into());
        assert!(compute(&subject, Op::Like, &Value::Str("payroll".into())));
        assert!(compute(&subject, Op::Like, &Value::Str("PAYROLL".into())));
        assert!(!compute(&subject, Op::Like, &Value::Str("invoice".into())));
    }

    #[test]
    fn test_like_wildcards_anchored() {
        let subject = Value::Str("Urgent payroll update".into());
        assert!(compute(&subject, Op::Like, &Value::Str("Urg*update".into())));
        assert!(compute(&subject, Op::Like, &Value::Str("urg%update".into())));
        // Anchored: the pattern must span the whole string.
        assert!(!compute(&subject, Op::Like, &Value::Str("Urg*pay".into())));
        // Other regex metacharacters are literal.
        assert!(!compute(&subject, Op::Like, &Value::Str("Urg.nt*".into())));
        assert!(compute(
            &Value::Str("a.b".into()),
            Op::Like,
            &Value::Str("a.b*".into()),
        ));
    }

    #[test]
    fn test_list_fan_out_existential() {
        let list = Value::List(vec![
            Value::Str("one".into()),
            Value::Str("two".into()),
        ]);
        assert!(compute(&list, Op::Eq, &Value::Str("two".into())));
        assert!(!compute(&list, Op::Eq, &Value::Str("three".into())));
    }

    #[test]
    fn test_logical_coercion() {
        assert!(compute(&Value::Bool(true), Op::And, &Value::Bool(true)));
        assert!(!compute(&Value::Bool(true), Op::And, &Value::Str("true".into())));
        assert!(compute(&Value::Bool(false), Op::Or, &Value::Bool(true)));
        assert!(!compute(&Value::Absent, Op::Or, &Value::Absent));
    }

    #[test]
    fn test_absent_compares_as_empty_string() {
        assert!(compute(&Value::Absent, Op::Eq, &Value::Str("".into())));
        assert!(!compute(&Value::Absent, Op::Eq, &Value::Str("anything".into())));
    }

    #[test]
    fn test_evaluate_single_term_is_false() {
        // No comparator: the end-of-stack check fails.
        let record = Record::default();
        assert!(!evaluate(&program("Operation"), &record));
    }

    #[test]
    fn test_evaluate_missing_operand_is_false() {
        let mut record = Record::default();
        record.operation = "Send".to_string();
        assert!(!evaluate(&program("== Send"), &record));
        assert!(!evaluate(&program("Operation =="), &record));
    }

    #[test]
    fn test_evaluate_unbalanced_paren_is_false() {
        let mut record = Record::default();
        record.operation = "Send".to_string();
        assert!(!evaluate(&program("(Operation == 'Send'"), &record));
    }
}
