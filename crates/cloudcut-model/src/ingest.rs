//! CSV → [`Record`] ingestor.
//!
//! Reads an audit-log export row by row and produces the three-tier record:
//! every column lands in the flat map under its lowercased header, the
//! `auditdata` column is parsed into the nested map and its top-level keys
//! are folded back into the flat map (overwriting same-named columns), and a
//! fixed set of promotion rules fills the typed fields.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::record::Record;

/// Read an audit-log CSV export into records.
///
/// Rows may have fewer columns than the header; missing cells are skipped.
/// Row-local failures (bad timestamp, malformed embedded JSON) are logged
/// and tolerated.
pub fn parse_audit_csv(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(build_record(path, &headers, &row));
    }

    debug!(count = records.len(), file = %path.display(), "ingested records");
    Ok(records)
}

fn build_record(path: &Path, headers: &[String], row: &csv::StringRecord) -> Record {
    let mut record = Record {
        source_file: path.display().to_string(),
        ..Record::default()
    };

    for (index, name) in headers.iter().enumerate() {
        let Some(value) = row.get(index) else {
            continue;
        };
        record
            .flat
            .insert(name.clone(), Value::String(value.to_string()));
        promote_column(&mut record, name, value);
    }

    if let Some(audit_raw) = audit_column(headers, row)
        && audit_raw != "{}"
        && !audit_raw.is_empty()
    {
        match serde_json::from_str::<Value>(audit_raw) {
            Ok(Value::Object(map)) => {
                for (key, value) in &map {
                    let key_lower = key.to_lowercase();
                    record.flat.insert(key_lower.clone(), value.clone());
                    promote_audit_key(&mut record, &key_lower, value);
                }
                record.nested = map;
            }
            Ok(_) => warn!("embedded audit document is not a JSON object"),
            Err(e) => warn!("failed to parse embedded audit JSON: {e}"),
        }
    }

    record
}

fn audit_column<'a>(headers: &[String], row: &'a csv::StringRecord) -> Option<&'a str> {
    let index = headers.iter().position(|h| h == "auditdata")?;
    row.get(index)
}

/// Fill typed fields from raw column values.
fn promote_column(record: &mut Record, name: &str, value: &str) {
    match name {
        "recordid" => record.record_id = value.to_string(),
        "creationdate" => promote_timestamp(record, value),
        "operation" => record.operation = value.to_string(),
        "operationproperties" => record.operation_properties = value.to_string(),
        "userid" => record.user_id = value.to_string(),
        "organizationname" => record.organisation = value.to_string(),
        "workload" => record.m365_service = value.to_string(),
        "clientip" => record.client_ip = value.to_string(),
        "clientappname" => record.client_app_name = value.to_string(),
        "useragent" => record.user_agent = value.to_string(),
        _ => {}
    }
}

/// First-non-empty promotion from embedded-JSON top-level keys.
///
/// Only string values promote; a column value that already filled the field
/// wins over the embedded document.
fn promote_audit_key(record: &mut Record, key_lower: &str, value: &Value) {
    let Value::String(s) = value else {
        return;
    };

    let slot = match key_lower {
        "clientip" | "clientipaddress" => &mut record.client_ip,
        "userid" | "userkey" => &mut record.user_id,
        "organizationname" => &mut record.organisation,
        "operationproperties" => &mut record.operation_properties,
        "clientappname" => &mut record.client_app_name,
        "workload" => &mut record.m365_service,
        "useragent" => &mut record.user_agent,
        _ => return,
    };

    if slot.is_empty() {
        *slot = s.clone();
    }
}

/// Normalise the portal's `CreationDate` into timestamp / date / time.
///
/// RFC 3339 is tried first (the export's usual `.0000000Z` form parses
/// there); the fallback accepts `YYYY-MM-DD HH:MM:SS` with the space
/// normalised to `T`, interpreted as UTC.
fn promote_timestamp(record: &mut Record, value: &str) {
    let clean = value.trim();

    let parsed: Option<DateTime<Utc>> = DateTime::parse_from_rfc3339(clean)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            let normalised = clean.replacen(' ', "T", 1);
            NaiveDateTime::parse_from_str(&normalised, "%Y-%m-%dT%H:%M:%S")
                .map(|ndt| ndt.and_utc())
                .ok()
        });

    match parsed {
        Some(ts) => {
            record.timestamp = ts.to_rfc3339_opts(SecondsFormat::Secs, true);
            record.date = ts.format("%Y-%m-%d").to_string();
            record.time = ts.format("%H:%M:%S").to_string();
        }
        None => warn!("failed to parse creation date '{clean}'"),
    }
}
