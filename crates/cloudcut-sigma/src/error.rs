//! Error types for rule loading.
//!
//! Note the boundary: a bad rule file is an error *here*, but the matcher
//! pipeline logs and skips it rather than aborting the run.

use thiserror::Error;

/// Errors from loading a detection rule.
#[derive(Debug, Error)]
pub enum SigmaError {
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("condition parse error: {0}")]
    Condition(String),

    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),

    #[error("invalid rule: {0}")]
    Rule(String),

    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid CIDR: {0}")]
    Cidr(#[from] ipnet::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, SigmaError>;
