//! Typed literal values and the field types they are coerced to.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Declared type of a searchable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Boolean,
    Integer,
    Decimal,
    DateTime,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::Decimal => "decimal",
            FieldType::DateTime => "date-time",
        };
        f.write_str(name)
    }
}

/// The coerced right-hand side of a comparison, or a field read from a
/// candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    DateTime(DateTime<Utc>),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::String(_) => FieldType::String,
            Value::Boolean(_) => FieldType::Boolean,
            Value::Integer(_) => FieldType::Integer,
            Value::Decimal(_) => FieldType::Decimal,
            Value::DateTime(_) => FieldType::DateTime,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Decimal(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(d) => Some(*d),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// True for string values carrying at least one `*` wildcard.
    pub fn has_wildcard(&self) -> bool {
        matches!(self, Value::String(s) if s.contains('*'))
    }

    /// Equality as used by EQUALS/NOT_EQUALS. `self` is the candidate's value,
    /// `pattern` the literal from the expression; a string literal containing
    /// `*` is matched as a glob.
    pub fn matches(&self, pattern: &Value) -> bool {
        match (self, pattern) {
            (Value::String(actual), Value::String(expected)) if expected.contains('*') => {
                wildcard_match(actual, expected)
            }
            _ => self.partial_cmp(pattern) == Some(Ordering::Equal),
        }
    }
}

impl PartialOrd for Value {
    /// Values of different kinds are unordered, except integers and decimals
    /// which compare numerically.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Decimal(_) | Value::Integer(_), Value::Decimal(_) | Value::Integer(_)) => {
                self.as_f64()?.partial_cmp(&other.as_f64()?)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Decimal(n) => write!(f, "{n}"),
            Value::DateTime(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Decimal(n)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::DateTime(d)
    }
}

/// A built-in scalar that can be searched directly, without a field table.
pub trait Scalar: Clone + Send + Sync + 'static {
    const FIELD_TYPE: FieldType;

    fn to_value(&self) -> Value;
}

macro_rules! impl_scalar {
    ($ty:ty, $field_type:expr) => {
        impl Scalar for $ty {
            const FIELD_TYPE: FieldType = $field_type;

            fn to_value(&self) -> Value {
                Value::from(self.clone())
            }
        }
    };
}

impl_scalar!(String, FieldType::String);
impl_scalar!(bool, FieldType::Boolean);
impl_scalar!(i64, FieldType::Integer);
impl_scalar!(i32, FieldType::Integer);
impl_scalar!(f64, FieldType::Decimal);
impl_scalar!(DateTime<Utc>, FieldType::DateTime);

/// Glob match where `*` stands for any (possibly empty) run of characters.
fn wildcard_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Position of the last `*` seen and the text index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}
