//! Rule loading: YAML documents straight into evaluation-ready form.
//!
//! Metadata deserialises with serde; the detection section compiles in one
//! pass, each rule value becoming the [`Test`] it will run as. There is no
//! intermediate AST. A file is rejected whole on the first problem — the
//! matcher pipeline decides whether that skips it or surfaces the error.

use std::collections::HashMap;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;

use crate::condition::{Expr, parse_condition};
use crate::error::{Result, SigmaError};

/// A detection rule, ready to evaluate.
#[derive(Debug, Clone)]
pub struct Rule {
    pub title: String,
    pub id: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub tags: Vec<String>,
    /// Named selections the conditions refer to.
    pub selections: HashMap<String, Selection>,
    /// A rule matches when any of its conditions holds.
    pub conditions: Vec<Expr>,
}

/// A named selection from the detection section.
#[derive(Debug, Clone)]
pub enum Selection {
    /// A mapping: every item must hold.
    Items(Vec<ItemCheck>),
    /// A list of mappings: any branch may hold.
    Branches(Vec<Selection>),
    /// A list of plain values matched against every string in the event.
    Keywords(Vec<Test>),
}

/// One field with its compiled value tests.
#[derive(Debug, Clone)]
pub struct ItemCheck {
    /// `None` for keyword items without a field.
    pub field: Option<String>,
    pub tests: Vec<Test>,
    /// `|all`: every test must pass instead of any.
    pub all: bool,
}

/// One compiled comparison against an event value.
#[derive(Debug, Clone)]
pub enum Test {
    /// Plain text; the needle is pre-lowercased unless `cased`.
    Text {
        needle: String,
        mode: TextMode,
        cased: bool,
    },
    /// A wildcard value or `|re` pattern.
    Pattern(Regex),
    /// Numeric equality.
    Number(f64),
    /// Boolean field.
    Truth(bool),
    /// Null: the field must be missing or null.
    Missing,
    /// `|cidr`: the field holds an IP inside this network.
    Net(ipnet::IpNet),
}

/// Where a [`Test::Text`] needle sits in the field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    Whole,
    Part,
    Head,
    Tail,
}

/// Modifier flags folded from a `field|modifier|modifier` detection key.
#[derive(Debug, Clone, Copy, Default)]
struct Mods {
    contains: bool,
    startswith: bool,
    endswith: bool,
    all: bool,
    re: bool,
    cased: bool,
    cidr: bool,
}

impl Mods {
    fn text_mode(&self) -> TextMode {
        if self.contains {
            TextMode::Part
        } else if self.startswith {
            TextMode::Head
        } else if self.endswith {
            TextMode::Tail
        } else {
            TextMode::Whole
        }
    }
}

/// Rule metadata as serde sees it. Unlisted document keys (logsource,
/// status, references, …) are carried by the format but not consumed here.
#[derive(Deserialize)]
struct RuleDoc {
    title: String,
    id: Option<String>,
    description: Option<String>,
    level: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    detection: serde_yaml::Mapping,
}

/// Parse every document in a YAML string as a rule.
pub fn parse_rules_yaml(yaml: &str) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    for doc in serde_yaml::Deserializer::from_str(yaml) {
        rules.push(build_rule(RuleDoc::deserialize(doc)?)?);
    }
    if rules.is_empty() {
        return Err(SigmaError::Rule("file holds no documents".to_string()));
    }
    Ok(rules)
}

/// Read and parse a rule file.
pub fn parse_rule_file(path: &Path) -> Result<Vec<Rule>> {
    let content = std::fs::read_to_string(path)?;
    parse_rules_yaml(&content)
}

fn build_rule(doc: RuleDoc) -> Result<Rule> {
    let mut sources: Vec<String> = Vec::new();
    let mut selections = HashMap::new();

    for (key, value) in &doc.detection {
        match key.as_str() {
            Some("condition") => sources = condition_sources(value)?,
            Some("timeframe") | None => {}
            Some(name) => {
                selections.insert(name.to_string(), build_selection(value)?);
            }
        }
    }

    if sources.is_empty() {
        return Err(SigmaError::Rule(format!(
            "rule '{}' has no condition",
            doc.title
        )));
    }
    let conditions = sources
        .iter()
        .map(|s| parse_condition(s))
        .collect::<Result<Vec<_>>>()?;

    Ok(Rule {
        title: doc.title,
        id: doc.id,
        description: doc.description,
        level: doc.level,
        tags: doc.tags,
        selections,
        conditions,
    })
}

fn condition_sources(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| {
                v.as_str().map(str::to_string).ok_or_else(|| {
                    SigmaError::Rule("condition list items must be strings".to_string())
                })
            })
            .collect(),
        _ => Err(SigmaError::Rule(
            "condition must be a string or list of strings".to_string(),
        )),
    }
}

fn build_selection(value: &Value) -> Result<Selection> {
    match value {
        Value::Mapping(m) if m.is_empty() => {
            Err(SigmaError::Rule("empty selection mapping".to_string()))
        }
        Value::Mapping(m) => {
            let items = m
                .iter()
                .map(|(k, v)| build_item(k.as_str().unwrap_or(""), v))
                .collect::<Result<Vec<_>>>()?;
            Ok(Selection::Items(items))
        }
        Value::Sequence(seq) if seq.is_empty() => {
            Err(SigmaError::Rule("empty selection list".to_string()))
        }
        Value::Sequence(seq) if seq.iter().all(|v| !v.is_mapping() && !v.is_sequence()) => {
            let tests = seq
                .iter()
                .map(compile_keyword)
                .collect::<Result<Vec<_>>>()?;
            Ok(Selection::Keywords(tests))
        }
        Value::Sequence(seq) => {
            let branches = seq
                .iter()
                .map(build_selection)
                .collect::<Result<Vec<_>>>()?;
            Ok(Selection::Branches(branches))
        }
        scalar => Ok(Selection::Keywords(vec![compile_keyword(scalar)?])),
    }
}

fn build_item(key: &str, value: &Value) -> Result<ItemCheck> {
    let (field, mods) = split_field_key(key)?;

    let values: Vec<&Value> = match value {
        Value::Sequence(seq) => seq.iter().collect(),
        one => vec![one],
    };
    if mods.all && values.len() <= 1 {
        return Err(SigmaError::Rule(
            "|all needs more than one value".to_string(),
        ));
    }

    let tests = values
        .iter()
        .map(|v| compile_test(v, &mods))
        .collect::<Result<Vec<_>>>()?;

    Ok(ItemCheck {
        field,
        tests,
        all: mods.all,
    })
}

fn split_field_key(key: &str) -> Result<(Option<String>, Mods)> {
    let mut parts = key.split('|');
    let field = parts.next().filter(|f| !f.is_empty()).map(str::to_string);

    let mut mods = Mods::default();
    for part in parts {
        match part {
            "contains" => mods.contains = true,
            "startswith" => mods.startswith = true,
            "endswith" => mods.endswith = true,
            "all" => mods.all = true,
            "re" => mods.re = true,
            "cased" => mods.cased = true,
            "cidr" => mods.cidr = true,
            other => return Err(SigmaError::UnknownModifier(other.to_string())),
        }
    }

    Ok((field, mods))
}

/// Compile one rule value under the modifier flags.
fn compile_test(value: &Value, mods: &Mods) -> Result<Test> {
    // |re patterns are taken verbatim: the regex has its own escapes and is
    // case-sensitive by default in the rule format.
    if mods.re {
        return Ok(Test::Pattern(Regex::new(scalar_str(value)?)?));
    }
    if mods.cidr {
        return Ok(Test::Net(scalar_str(value)?.parse()?));
    }

    match value {
        Value::Number(n) => {
            let n = n.as_f64().unwrap_or(f64::NAN);
            if mods.contains || mods.startswith || mods.endswith {
                Ok(text_test(&n.to_string(), mods))
            } else {
                Ok(Test::Number(n))
            }
        }
        Value::Bool(b) => Ok(Test::Truth(*b)),
        Value::Null => Ok(Test::Missing),
        Value::String(s) if has_wildcards(s) => {
            let head = !mods.contains && !mods.startswith;
            let tail = !mods.contains && !mods.endswith;
            Ok(Test::Pattern(Regex::new(&glob_regex(
                s,
                !mods.cased,
                head,
                tail,
            ))?))
        }
        Value::String(s) => Ok(text_test(&unescape(s), mods)),
        _ => Err(SigmaError::Rule(
            "selection values must be scalars".to_string(),
        )),
    }
}

fn text_test(plain: &str, mods: &Mods) -> Test {
    Test::Text {
        needle: if mods.cased {
            plain.to_string()
        } else {
            plain.to_lowercase()
        },
        mode: mods.text_mode(),
        cased: mods.cased,
    }
}

/// Keywords match case-insensitively anywhere in the event's strings.
fn compile_keyword(value: &Value) -> Result<Test> {
    match value {
        Value::String(s) if has_wildcards(s) => {
            Ok(Test::Pattern(Regex::new(&glob_regex(s, true, true, true))?))
        }
        Value::String(s) => Ok(Test::Text {
            needle: unescape(s).to_lowercase(),
            mode: TextMode::Part,
            cased: false,
        }),
        other => compile_test(other, &Mods::default()),
    }
}

fn scalar_str(value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| {
        SigmaError::Rule("modifier expects a string value".to_string())
    })
}

// ---------------------------------------------------------------------------
// Wildcard strings
// ---------------------------------------------------------------------------
// Rule string values use `*` (any run) and `?` (any single character) as
// wildcards; backslash escapes the next character. The escape only consumes
// itself before a special character (`*`, `?`, `\`) — before anything else
// both characters are kept, so Windows-style paths like `\Inbox` survive.

/// Does the string contain an unescaped `*` or `?`.
fn has_wildcards(s: &str) -> bool {
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '*' || c == '?' {
            return true;
        }
    }
    false
}

/// Resolve escape sequences to plain text (`\*` → `*`, `\\` → `\`,
/// `\X` → `\X`). Unescaped wildcards are kept as literal characters; callers
/// that care check [`has_wildcards`] first.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            if c != '*' && c != '?' && c != '\\' {
                out.push('\\');
            }
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    if escaped {
        out.push('\\');
    }
    out
}

/// Translate a wildcard string into a regex pattern.
///
/// Unescaped `*` becomes `.*`, `?` becomes `.`; every other character is
/// regex-escaped. Anchors are optional so `contains`/`startswith`/`endswith`
/// modifiers can open one or both ends.
fn glob_regex(s: &str, fold_case: bool, anchor_head: bool, anchor_tail: bool) -> String {
    let mut pattern = String::new();
    if fold_case {
        pattern.push_str("(?i)");
    }
    if anchor_head {
        pattern.push('^');
    }

    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            if c != '*' && c != '?' && c != '\\' {
                pattern.push_str(&regex::escape(&format!("\\{c}")));
            } else {
                pattern.push_str(&regex::escape(&c.to_string()));
            }
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '*' {
            pattern.push_str(".*");
        } else if c == '?' {
            pattern.push('.');
        } else {
            pattern.push_str(&regex::escape(&c.to_string()));
        }
    }
    if escaped {
        pattern.push_str(&regex::escape("\\"));
    }

    if anchor_tail {
        pattern.push('$');
    }
    pattern
}
