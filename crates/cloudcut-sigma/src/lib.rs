//! # cloudcut-sigma
//!
//! A compact loader and evaluator for detection rules in the standard
//! YAML-based format, scoped to what flat audit records need: named
//! selections of field/value predicates (with `|modifier` chains) tied
//! together by a condition expression, evaluated against the lowercased
//! flat map of a [`cloudcut_model::Record`].
//!
//! Rules load straight into evaluation-ready form — there is no separate
//! AST or compile step.
//!
//! ## Quick Start
//!
//! ```rust
//! use cloudcut_sigma::{parse_rules_yaml, rule_matches};
//! use serde_json::json;
//!
//! let yaml = r#"
//! title: Python client reading mail
//! detection:
//!     selection:
//!         operation: MailItemsAccessed
//!         clientappname|contains: 'python'
//!     condition: selection
//! level: medium
//! "#;
//!
//! let rules = parse_rules_yaml(yaml).unwrap();
//!
//! let mut flat = serde_json::Map::new();
//! flat.insert("operation".into(), json!("MailItemsAccessed"));
//! flat.insert("clientappname".into(), json!("Python/3.12"));
//!
//! assert!(rule_matches(&rules[0], &flat));
//! ```
//!
//! The full pipeline — directory walk, per-file skip on failure, record
//! annotation — is [`analyse_records`].

pub mod analyse;
pub mod condition;
pub mod error;
pub mod eval;
pub mod rule;

pub use analyse::{analyse_records, collect_rule_files};
pub use condition::{Expr, Take, parse_condition};
pub use error::{Result, SigmaError};
pub use eval::rule_matches;
pub use rule::{ItemCheck, Rule, Selection, Test, TextMode, parse_rule_file, parse_rules_yaml};
