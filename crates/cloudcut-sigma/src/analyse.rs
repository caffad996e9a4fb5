//! The rule-matching pipeline: walk, load, evaluate, annotate.

use std::path::{Path, PathBuf};

use cloudcut_model::Record;
use tracing::{debug, warn};

use crate::eval::rule_matches;
use crate::rule::{Rule, parse_rule_file};

/// Match every rule under `rules_path` against every record.
///
/// For each (rule, record) match, a fresh copy of the record is emitted with
/// the annotation slots overwritten from the rule metadata — a record
/// matching several rules is emitted once per rule. Emission order is rule
/// discovery order, then input order. Unreadable or unparseable rule files
/// are logged and skipped; the pipeline never aborts.
pub fn analyse_records(records: &[Record], rules_path: &Path) -> Vec<Record> {
    let rules = load_rules(rules_path);
    debug!(count = rules.len(), path = %rules_path.display(), "loaded rules");

    let mut matched = Vec::new();
    for rule in &rules {
        for record in records {
            if rule_matches(rule, &record.flat) {
                debug!(record = %record.record_id, rule = %rule.title, "rule matched");
                matched.push(annotate(record, rule));
            }
        }
    }
    matched
}

/// A copy of the record with the annotation slots overwritten.
fn annotate(record: &Record, rule: &Rule) -> Record {
    let mut copy = record.clone();
    copy.rule_title = rule.title.clone();
    copy.rule_description = rule.description.clone().unwrap_or_default();
    copy.rule_severity = rule.level.clone().unwrap_or_default();
    copy.rule_tags = rule.tags.clone();
    copy
}

/// Load every rule file under a path, skipping failures.
fn load_rules(path: &Path) -> Vec<Rule> {
    let mut rules = Vec::new();
    for file in collect_rule_files(path) {
        match parse_rule_file(&file) {
            Ok(parsed) => rules.extend(parsed),
            Err(e) => warn!(file = %file.display(), "skipping rule file: {e}"),
        }
    }
    rules
}

/// Every `.yaml`/`.yml` file under a path (extension case-insensitive),
/// sorted for deterministic discovery order. A single rule file is accepted
/// directly.
pub fn collect_rule_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if root.is_dir() {
        walk(root, &mut files);
    } else if is_rule_file(root) {
        files.push(root.to_path_buf());
    }
    files.sort();
    files
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk(&path, out);
        } else if is_rule_file(&path) {
            out.push(path);
        }
    }
}

fn is_rule_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}
