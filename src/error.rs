//! Error types for FIQL parsing and condition rendering.

use thiserror::Error;

use crate::condition::ConditionType;
use crate::value::FieldType;

/// A malformed or unresolvable search expression.
///
/// Parsing stops at the first error; no partial tree is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected closing bracket at position {position}")]
    UnexpectedClosingBracket { position: usize },

    #[error("Unmatched opening and closing brackets in expression: {expression}")]
    UnmatchedBrackets { expression: String },

    #[error("Dangling operator at the end of expression: ...{fragment}")]
    DanglingOperator { fragment: String },

    #[error("Not a comparison expression: {expression:?}")]
    NotAComparison { expression: String },

    #[error("Property {name:?} not found (value {value:?})")]
    PropertyNotFound { name: String, value: String },

    #[error("Cannot convert String value {value:?} to a value of type {target}")]
    InvalidValue { value: String, target: FieldType },

    #[error("Can parse {value:?} neither as date nor duration")]
    InvalidDate { value: String },

    #[error("Wildcard-only value for property {name:?} matches everything")]
    WildcardOnly { name: String },

    #[error("Expression nesting exceeds the maximum depth of {max}")]
    NestingTooDeep { max: usize },

    #[error("Expression contains no resolvable comparisons")]
    NoConditions,
}

/// A condition type reached a visitor that has no mapping for it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Unsupported condition type: {condition}")]
pub struct UnsupportedConditionError {
    pub condition: ConditionType,
}

/// Configuration could not be loaded or is invalid.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse configuration file {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid value {value:?} for option {key}")]
    InvalidOption { key: String, value: String },

    #[error("Unsupported date pattern {pattern:?}: {reason}")]
    DatePattern { pattern: String, reason: String },
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;
