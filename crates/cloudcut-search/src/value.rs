//! The resolved-value sum type.

use std::fmt;

use serde_json::Value as Json;

/// A value produced by path resolution, or pushed by the evaluator.
///
/// Absent is distinct from the empty string: an empty typed field resolves
/// to `Str("")`, a path that reaches nothing resolves to `Absent`.
/// Timestamps are not a variant — resolution can only ever see JSON, so the
/// comparator classifies timestamp-shaped strings at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Num(f64),
    Bool(bool),
    List(Vec<Value>),
    Absent,
}

impl Value {
    /// Convert a JSON value into a resolved value.
    ///
    /// JSON null maps to absent. An object maps to its compact JSON
    /// serialisation: the value domain has no map variant, but a resolved
    /// object must still count as "found" so the bareword-literal fallback
    /// does not fire for it.
    pub fn from_json(json: &Json) -> Value {
        match json {
            Json::Null => Value::Absent,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => n.as_f64().map(Value::Num).unwrap_or(Value::Absent),
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(_) => Value::Str(json.to_string()),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Boolean coercion for `AND` / `OR`: only a boolean is ever true.
    pub fn truthy(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    /// The trimmed string form used by the comparison fallback chain.
    pub fn comparand(&self) -> String {
        match self {
            Value::Str(s) => s.trim().to_string(),
            _ => self.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Absent => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&json!(null)), Value::Absent);
        assert_eq!(Value::from_json(&json!(true)), Value::Bool(true));
        assert_eq!(Value::from_json(&json!(3)), Value::Num(3.0));
        assert_eq!(Value::from_json(&json!("x")), Value::Str("x".into()));
        assert_eq!(
            Value::from_json(&json!(["a", 1])),
            Value::List(vec![Value::Str("a".into()), Value::Num(1.0)])
        );
    }

    #[test]
    fn test_object_serialises() {
        let v = Value::from_json(&json!({"k": "v"}));
        assert_eq!(v, Value::Str(r#"{"k":"v"}"#.into()));
    }

    #[test]
    fn test_comparand_trims_and_formats() {
        assert_eq!(Value::Str("  x  ".into()).comparand(), "x");
        assert_eq!(Value::Num(1200.0).comparand(), "1200");
        assert_eq!(Value::Num(1.5).comparand(), "1.5");
        assert_eq!(Value::Bool(true).comparand(), "true");
        assert_eq!(Value::Absent.comparand(), "");
    }

    #[test]
    fn test_truthy() {
        assert!(Value::Bool(true).truthy());
        assert!(!Value::Bool(false).truthy());
        assert!(!Value::Str("true".into()).truthy());
        assert!(!Value::Absent.truthy());
    }
}
