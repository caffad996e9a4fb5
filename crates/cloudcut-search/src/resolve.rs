//! Dotted-path resolution over the three record tiers.
//!
//! Analysts write queries against whichever representation they have in
//! hand: a schema field (`ClientIP`), a raw column (`subject`), or a deeply
//! nested audit key (`AppAccessContext.UniqueTokenId`). Resolution tries the
//! typed-field tier, the lowercased flat map, and the original-case nested
//! map, first non-absent wins.

use cloudcut_model::{Record, TypedField};
use serde_json::Value as Json;
use tracing::debug;

use crate::value::Value;

/// Resolve a term lexeme against a record.
///
/// Quoted lexemes are literals. Everything else is stripped of surrounding
/// quote characters and split on `.` into path segments; a single-segment
/// path that resolves nowhere falls back to the stripped lexeme itself, so
/// unquoted bareword right-hand operands behave like quoted literals.
pub fn resolve(token: &str, record: &Record) -> Value {
    let clean = strip_quotes(token);

    if token.starts_with('\'') || token.starts_with('"') {
        return Value::Str(clean.to_string());
    }

    let segments: Vec<&str> = clean.split('.').collect();

    if let Some(found) = resolve_typed(&segments, record) {
        debug!(path = token, value = %found, "resolved via typed fields");
        return found;
    }

    if let Some(json) = record.flat.get(&segments[0].to_lowercase()) {
        let found = resolve_json(&segments[1..], json);
        if !found.is_absent() {
            debug!(path = token, value = %found, "resolved via flat map");
            return found;
        }
    }

    for (key, json) in &record.nested {
        if key.eq_ignore_ascii_case(segments[0]) {
            let found = resolve_json(&segments[1..], json);
            if !found.is_absent() {
                return found;
            }
        }
    }

    // Bareword fallback: single segments that name nothing are literals.
    if segments.len() == 1 {
        return Value::Str(clean.to_string());
    }

    Value::Absent
}

/// Strip surrounding quote characters (either kind, repeated).
pub fn strip_quotes(token: &str) -> &str {
    token.trim_matches(|c| c == '\'' || c == '"')
}

/// Typed-field tier: a single segment naming a typed field resolves to it,
/// even when the field is empty. Extra segments never descend into a string.
fn resolve_typed(segments: &[&str], record: &Record) -> Option<Value> {
    if segments.len() != 1 {
        return None;
    }
    match record.typed_field(segments[0])? {
        TypedField::Str(s) => Some(Value::Str(s.to_string())),
        TypedField::Tags(tags) => Some(Value::List(
            tags.iter().map(|t| Value::Str(t.clone())).collect(),
        )),
    }
}

/// Walk remaining path segments into a JSON value.
///
/// Objects match keys case-insensitively (first match wins). Lists fan out:
/// the remaining segments apply to every element and non-absent results are
/// concatenated with one level of flattening; an empty fan-out is absent.
fn resolve_json(segments: &[&str], json: &Json) -> Value {
    if segments.is_empty() {
        return Value::from_json(json);
    }

    match json {
        Json::Array(items) => {
            let mut out = Vec::new();
            for item in items {
                match resolve_json(segments, item) {
                    Value::Absent => {}
                    Value::List(nested) => out.extend(nested),
                    found => out.push(found),
                }
            }
            if out.is_empty() {
                Value::Absent
            } else {
                Value::List(out)
            }
        }
        Json::Object(map) => {
            for (key, value) in map {
                if key.eq_ignore_ascii_case(segments[0]) {
                    return resolve_json(&segments[1..], value);
                }
            }
            Value::Absent
        }
        _ => Value::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> Record {
        let mut r = Record::default();
        r.operation = "MailItemsAccessed".to_string();
        r.client_ip = "10.0.0.1".to_string();
        r.flat
            .insert("subject".to_string(), json!("Urgent payroll update"));
        r.flat.insert("operation".to_string(), json!("shadowed"));
        r.nested.insert(
            "AppAccessContext".to_string(),
            json!({"UniqueTokenId": "abc123"}),
        );
        r.nested.insert(
            "Folders".to_string(),
            json!([
                {"Path": "\\Inbox", "Items": [{"Id": "m1"}, {"Id": "m2"}]},
                {"Path": "\\Sent", "Items": [{"Id": "m3"}]}
            ]),
        );
        r
    }

    #[test]
    fn test_quoted_literal() {
        let r = record();
        assert_eq!(resolve("'Operation'", &r), Value::Str("Operation".into()));
        assert_eq!(resolve("\"a b\"", &r), Value::Str("a b".into()));
    }

    #[test]
    fn test_typed_field_any_case() {
        let r = record();
        assert_eq!(resolve("ClientIP", &r), Value::Str("10.0.0.1".into()));
        assert_eq!(resolve("CLIENTIP", &r), Value::Str("10.0.0.1".into()));
        assert_eq!(resolve("clientip", &r), Value::Str("10.0.0.1".into()));
    }

    #[test]
    fn test_typed_tier_shadows_flat_map() {
        let r = record();
        assert_eq!(resolve("Operation", &r), Value::Str("MailItemsAccessed".into()));
    }

    #[test]
    fn test_flat_map_lookup() {
        let r = record();
        assert_eq!(
            resolve("Subject", &r),
            Value::Str("Urgent payroll update".into())
        );
    }

    #[test]
    fn test_nested_map_traversal() {
        let r = record();
        assert_eq!(
            resolve("AppAccessContext.UniqueTokenId", &r),
            Value::Str("abc123".into())
        );
        assert_eq!(
            resolve("appaccesscontext.uniquetokenid", &r),
            Value::Str("abc123".into())
        );
    }

    #[test]
    fn test_fan_out_flattens_one_level() {
        let r = record();
        assert_eq!(
            resolve("Folders.Path", &r),
            Value::List(vec![
                Value::Str("\\Inbox".into()),
                Value::Str("\\Sent".into()),
            ])
        );
        // Two list layers deep: still a flat list of ids.
        assert_eq!(
            resolve("Folders.Items.Id", &r),
            Value::List(vec![
                Value::Str("m1".into()),
                Value::Str("m2".into()),
                Value::Str("m3".into()),
            ])
        );
    }

    #[test]
    fn test_fan_out_empty_is_absent() {
        let r = record();
        assert_eq!(resolve("Folders.Missing", &r), Value::Absent);
    }

    #[test]
    fn test_bareword_fallback() {
        let r = record();
        assert_eq!(resolve("FileModified", &r), Value::Str("FileModified".into()));
    }

    #[test]
    fn test_multi_segment_miss_is_absent() {
        let r = record();
        assert_eq!(resolve("No.Such.Path", &r), Value::Absent);
    }

    #[test]
    fn test_object_resolves_to_json_not_fallback() {
        let r = record();
        // A path landing on an object is found, so the bareword fallback
        // must not fire for it.
        assert_eq!(
            resolve("AppAccessContext", &r),
            Value::Str(r#"{"UniqueTokenId":"abc123"}"#.into())
        );
    }
}
