//! The normalised audit event.

use serde::Serialize;
use serde_json::{Map, Value};

/// One normalised audit event.
///
/// Produced by the ingestor, consumed by the search and rule-matching layers.
/// Immutable once emitted, except for the `rule_*` annotation slots which the
/// rule matcher overwrites on fresh copies before emission.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    pub record_id: String,
    /// Event date in `YYYY-MM-DD`, derived from `timestamp`.
    pub date: String,
    /// Event time in `HH:MM:SS`, derived from `timestamp`.
    pub time: String,
    /// Normalised ISO-8601 instant in UTC.
    pub timestamp: String,
    pub user_id: String,
    pub organisation: String,
    pub m365_service: String,
    pub operation: String,
    pub operation_properties: String,
    pub client_ip: String,
    pub client_app_name: String,
    pub user_agent: String,
    /// Path of the input file this record was read from.
    pub source_file: String,

    // Annotation slots, populated by the rule matcher.
    pub rule_title: String,
    pub rule_description: String,
    pub rule_severity: String,
    pub rule_tags: Vec<String>,

    /// Lowercased-key map of every raw column value plus every top-level key
    /// of the embedded JSON document. On collision the embedded-JSON value
    /// wins.
    pub flat: Map<String, Value>,

    /// The embedded JSON document as parsed, original-case keys.
    pub nested: Map<String, Value>,
}

/// A borrowed view of one typed field, for path resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypedField<'a> {
    Str(&'a str),
    Tags(&'a [String]),
}

impl Record {
    /// Look up a typed field by name, case-insensitively.
    ///
    /// Underscores are ignored so that both the portal's spelling
    /// (`ClientIP`) and the field's own name (`client_ip`) resolve. Empty
    /// fields still resolve: an empty typed field shadows same-named flat-map
    /// keys during search resolution.
    pub fn typed_field(&self, name: &str) -> Option<TypedField<'_>> {
        let key: String = name
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        let s = match key.as_str() {
            "recordid" => &self.record_id,
            "date" => &self.date,
            "time" => &self.time,
            "timestamp" => &self.timestamp,
            "userid" => &self.user_id,
            "organisation" => &self.organisation,
            "m365service" => &self.m365_service,
            "operation" => &self.operation,
            "operationproperties" => &self.operation_properties,
            "clientip" => &self.client_ip,
            "clientappname" => &self.client_app_name,
            "useragent" => &self.user_agent,
            "sourcefile" => &self.source_file,
            "ruletitle" => &self.rule_title,
            "ruledescription" => &self.rule_description,
            "ruleseverity" => &self.rule_severity,
            "ruletags" => return Some(TypedField::Tags(&self.rule_tags)),
            _ => return None,
        };
        Some(TypedField::Str(s))
    }
}
