//! # cloudcut-model
//!
//! The normalised audit-event record shared by every cloudcut component,
//! plus the CSV ingestor that produces it.
//!
//! A [`Record`] carries three tiers of the same event:
//!
//! - **Typed fields**: the fixed, promoted columns (`operation`, `client_ip`,
//!   `user_id`, …) plus the rule-annotation slots.
//! - **Flat map**: every raw CSV column value and every top-level key of the
//!   embedded JSON document, keyed in lowercase. Detection rules match
//!   against this tier.
//! - **Nested map**: the embedded JSON document as a tree, original-case keys.
//!
//! ## Quick Start
//!
//! ```rust
//! use cloudcut_model::Record;
//!
//! let mut record = Record::default();
//! record.operation = "MailItemsAccessed".to_string();
//! assert!(record.typed_field("Operation").is_some());
//! ```

pub mod error;
pub mod ingest;
pub mod record;

pub use error::{IngestError, Result};
pub use ingest::parse_audit_csv;
pub use record::{Record, TypedField};
