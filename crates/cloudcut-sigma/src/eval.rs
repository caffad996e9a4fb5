//! Rule evaluation over a record's flat map.
//!
//! Arrays fan out once at the top of [`test_value`]; everything below sees
//! scalars, and string coercion happens in a single place.

use std::borrow::Cow;
use std::net::IpAddr;

use serde_json::{Map, Value};

use crate::condition::{Expr, Take};
use crate::rule::{ItemCheck, Rule, Selection, Test, TextMode};

/// Does a rule match the event.
///
/// Field names are lowercased for lookup, meeting the flat map's key
/// contract. A condition referring to a selection the rule does not define
/// simply never matches, in line with the pipeline's degrade-to-no-match
/// policy.
pub fn rule_matches(rule: &Rule, event: &Map<String, Value>) -> bool {
    rule.conditions.iter().any(|c| eval_expr(c, rule, event))
}

fn eval_expr(expr: &Expr, rule: &Rule, event: &Map<String, Value>) -> bool {
    match expr {
        Expr::Or(branches) => branches.iter().any(|e| eval_expr(e, rule, event)),
        Expr::And(parts) => parts.iter().all(|e| eval_expr(e, rule, event)),
        Expr::Not(inner) => !eval_expr(inner, rule, event),

        Expr::Ref(name) => rule
            .selections
            .get(name)
            .is_some_and(|s| eval_selection(s, event)),

        Expr::OfGroup { min, pattern } => {
            let mut named = 0u64;
            let mut hits = 0u64;
            for (name, selection) in &rule.selections {
                if !glob(pattern, name) {
                    continue;
                }
                named += 1;
                if eval_selection(selection, event) {
                    hits += 1;
                }
            }
            match min {
                Take::All => hits == named,
                Take::AtLeast(n) => hits >= *n,
            }
        }
    }
}

fn eval_selection(selection: &Selection, event: &Map<String, Value>) -> bool {
    match selection {
        Selection::Items(items) => items.iter().all(|i| eval_item(i, event)),
        Selection::Branches(branches) => branches.iter().any(|s| eval_selection(s, event)),
        Selection::Keywords(tests) => tests
            .iter()
            .any(|t| event.values().any(|v| keyword_hit(t, v))),
    }
}

fn eval_item(item: &ItemCheck, event: &Map<String, Value>) -> bool {
    match &item.field {
        Some(field) => match event.get(&field.to_lowercase()) {
            Some(value) => combine(item, |t| test_value(t, value)),
            // Only a null rule value matches a missing field.
            None => item.tests.iter().any(|t| matches!(t, Test::Missing)),
        },
        None => combine(item, |t| event.values().any(|v| keyword_hit(t, v))),
    }
}

/// `|all` links an item's tests with AND, the default is OR.
fn combine(item: &ItemCheck, hit: impl Fn(&Test) -> bool) -> bool {
    if item.all {
        item.tests.iter().all(hit)
    } else {
        item.tests.iter().any(hit)
    }
}

/// Array-valued event fields match if any element matches.
fn test_value(test: &Test, value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|v| test_value(test, v)),
        _ => test_scalar(test, value),
    }
}

fn test_scalar(test: &Test, value: &Value) -> bool {
    match test {
        Test::Missing => value.is_null(),

        Test::Truth(expected) => match value {
            Value::Bool(b) => b == expected,
            Value::String(s) => {
                s.eq_ignore_ascii_case(if *expected { "true" } else { "false" })
            }
            _ => false,
        },

        Test::Number(n) => match value {
            Value::Number(v) => v.as_f64().is_some_and(|f| f == *n),
            Value::String(s) => s.trim().parse::<f64>().is_ok_and(|f| f == *n),
            _ => false,
        },

        Test::Net(net) => value
            .as_str()
            .is_some_and(|s| s.parse::<IpAddr>().is_ok_and(|ip| net.contains(&ip))),

        Test::Pattern(re) => scalar_text(value).is_some_and(|s| re.is_match(&s)),

        Test::Text {
            needle,
            mode,
            cased,
        } => scalar_text(value).is_some_and(|s| {
            let hay = if *cased {
                s.into_owned()
            } else {
                s.to_lowercase()
            };
            match mode {
                TextMode::Whole => hay == *needle,
                TextMode::Part => hay.contains(needle.as_str()),
                TextMode::Head => hay.starts_with(needle.as_str()),
                TextMode::Tail => hay.ends_with(needle.as_str()),
            }
        }),
    }
}

/// The text a scalar contributes to string tests.
fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
    match value {
        Value::String(s) => Some(Cow::Borrowed(s.as_str())),
        Value::Number(n) => Some(Cow::Owned(n.to_string())),
        Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
        _ => None,
    }
}

/// Keyword tests run against every string anywhere in the event.
fn keyword_hit(test: &Test, value: &Value) -> bool {
    match value {
        Value::String(_) => test_scalar(test, value),
        Value::Array(items) => items.iter().any(|v| keyword_hit(test, v)),
        Value::Object(fields) => fields.values().any(|v| keyword_hit(test, v)),
        _ => false,
    }
}

/// Glob match over selection names (`*` only, any position).
fn glob(pattern: &str, name: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == name;
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut rest = name;

    if let Some(first) = parts.first() {
        let Some(stripped) = rest.strip_prefix(first) else {
            return false;
        };
        rest = stripped;
    }

    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }

    parts.last().is_none_or(|last| rest.ends_with(last))
}
