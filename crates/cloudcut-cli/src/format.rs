//! Per-event rendering.

use cloudcut_model::Record;
use serde_json::Value;

/// Render one event in the requested format. Unknown formats fall back to
/// the log format.
pub fn render(record: &Record, format: &str) -> String {
    match format {
        "json" => serde_json::to_string_pretty(record).unwrap_or_default(),
        _ => render_log(record),
    }
}

/// The log format: one `Label : value` line per non-empty field, terminated
/// by a separator. The source file, raw timestamp, and the two map tiers are
/// administrative and never rendered.
fn render_log(record: &Record) -> String {
    let mut out = String::new();

    push_field(&mut out, "RecordID", &record.record_id);
    push_field(&mut out, "Date", &record.date);
    push_field(&mut out, "Time", &record.time);
    push_field(&mut out, "RuleTitle", &record.rule_title);
    push_field(&mut out, "RuleDescription", &record.rule_description);
    push_field(&mut out, "RuleSeverity", &record.rule_severity);
    if !record.rule_tags.is_empty() {
        push_field(&mut out, "RuleTags", &record.rule_tags.join(", "));
    }
    push_field(&mut out, "UserID", &record.user_id);
    push_field(&mut out, "Organisation", &record.organisation);
    push_field(&mut out, "M365Service", &record.m365_service);
    push_field(&mut out, "Operation", &record.operation);
    push_field(
        &mut out,
        "OperationProperties",
        &pretty_json(&record.operation_properties),
    );
    push_field(&mut out, "ClientIP", &record.client_ip);
    push_field(&mut out, "ClientAppName", &record.client_app_name);
    push_field(&mut out, "UserAgent", &record.user_agent);

    out.push_str("-----------------------");
    out
}

fn push_field(out: &mut String, label: &str, value: &str) {
    if value.is_empty() || value == "{}" || value == "[]" {
        return;
    }
    out.push_str(&format!("{label:<20}: {value}\n"));
}

/// Pretty-print a JSON-holding field; anything that does not parse is
/// rendered verbatim.
fn pretty_json(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| raw.to_string()),
        Err(_) => raw.to_string(),
    }
}
