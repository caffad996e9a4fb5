//! CSV export of matched events.

use std::path::Path;

use cloudcut_model::Record;
use tracing::info;

/// Exportable columns. Rule columns are appended for matcher output.
pub fn columns(include_rules: bool) -> Vec<&'static str> {
    let mut cols = vec!["Date", "Time", "Operation", "UserID", "ClientIP"];
    if include_rules {
        cols.extend(["RuleTitle", "RuleSeverity", "RuleTags"]);
    }
    cols
}

/// Write events to a CSV file at `path`.
pub fn export_csv(records: &[Record], path: &Path, include_rules: bool) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    let cols = columns(include_rules);

    writer.write_record(&cols)?;
    for record in records {
        let row: Vec<String> = cols.iter().map(|c| column_value(record, c)).collect();
        writer.write_record(&row)?;
    }
    writer.flush()?;

    info!(count = records.len(), file = %path.display(), "exported events");
    Ok(())
}

fn column_value(record: &Record, column: &str) -> String {
    match column {
        "Date" => record.date.clone(),
        "Time" => record.time.clone(),
        "Operation" => record.operation.clone(),
        "UserID" => record.user_id.clone(),
        "ClientIP" => record.client_ip.clone(),
        "RuleTitle" => record.rule_title.clone(),
        "RuleSeverity" => record.rule_severity.clone(),
        "RuleTags" => record.rule_tags.join(", "),
        _ => String::new(),
    }
}
