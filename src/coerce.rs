//! Type coercion: turns the raw text of a comparison into a typed [`Value`]
//! once the field's declared type is known.

use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::config::ParserConfig;
use crate::duration::IsoDuration;
use crate::error::{ConfigError, ParseError};
use crate::value::{FieldType, Value};

/// chrono form of [`crate::config::DEFAULT_DATE_FORMAT`].
const DEFAULT_CHRONO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.%3f%z";

/// Converts literals to typed values using the configured date handling.
#[derive(Debug, Clone)]
pub struct Coercer {
    /// chrono (strftime) form of the configured date pattern.
    date_format: String,
    time_zone_support: bool,
}

impl Default for Coercer {
    fn default() -> Self {
        Self { date_format: DEFAULT_CHRONO_FORMAT.to_string(), time_zone_support: true }
    }
}

impl Coercer {
    pub fn new(config: &ParserConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            date_format: java_date_pattern(&config.date_format)?,
            time_zone_support: config.time_zone_support,
        })
    }

    pub fn coerce(&self, field: &str, raw: &str, target: FieldType) -> Result<Value, ParseError> {
        tracing::trace!(field, raw, %target, "coercing literal");
        let invalid = || ParseError::InvalidValue { value: raw.to_string(), target };

        match target {
            FieldType::String => Ok(Value::String(raw.to_string())),
            FieldType::Boolean => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(Value::Boolean(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(Value::Boolean(false))
                } else {
                    Err(invalid())
                }
            }
            FieldType::Integer => raw.parse().map(Value::Integer).map_err(|_| invalid()),
            FieldType::Decimal => raw.parse().map(Value::Decimal).map_err(|_| invalid()),
            FieldType::DateTime => self.parse_date(raw).map(Value::DateTime),
        }
    }

    /// Configured pattern first, then ISO forms, then a duration relative to
    /// now (`-P1D` is one day ago).
    pub fn parse_date(&self, raw: &str) -> Result<DateTime<Utc>, ParseError> {
        let value = if self.time_zone_support {
            strip_offset_colon(raw)
        } else {
            Cow::Borrowed(raw)
        };

        parse_with_format(&value, &self.date_format)
            .or_else(|| parse_iso(raw))
            .or_else(|| IsoDuration::parse(raw)?.add_to(Utc::now()))
            .ok_or_else(|| ParseError::InvalidDate { value: raw.to_string() })
    }
}

fn parse_with_format(value: &str, format: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_str(value, format) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(value, format) {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(value, format)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(value) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(d.and_utc());
    }
    parse_with_format(value, "%Y-%m-%d")
}

/// `2010-03-11T18:00:00.000+01:00` -> `2010-03-11T18:00:00.000+0100`. Only a
/// trailing `±HH:MM` offset is touched.
fn strip_offset_colon(value: &str) -> Cow<'_, str> {
    let bytes = value.as_bytes();
    let n = bytes.len();
    if n >= 6
        && matches!(bytes[n - 6], b'+' | b'-')
        && bytes[n - 3] == b':'
        && [n - 5, n - 4, n - 2, n - 1].iter().all(|&i| bytes[i].is_ascii_digit())
    {
        Cow::Owned(format!("{}{}", &value[..n - 3], &value[n - 2..]))
    } else {
        Cow::Borrowed(value)
    }
}

/// Translates a `SimpleDateFormat`-style pattern into a chrono format string.
pub fn java_date_pattern(pattern: &str) -> Result<String, ConfigError> {
    let unsupported = |reason: String| ConfigError::DatePattern { pattern: pattern.to_string(), reason };

    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            // '' is a literal quote, otherwise text up to the closing quote
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            let close = chars[i + 1..]
                .iter()
                .position(|&q| q == '\'')
                .ok_or_else(|| unsupported("unterminated quote".to_string()))?;
            for &q in &chars[i + 1..i + 1 + close] {
                push_literal(&mut out, q);
            }
            i += close + 2;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1 | 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', _) => "%d",
            ('H', _) => "%H",
            ('h', _) => "%I",
            ('m', _) => "%M",
            ('s', _) => "%S",
            ('S', 1..=3) => "%3f",
            ('S', 4..=6) => "%6f",
            ('S', 7..=9) => "%9f",
            ('Z', _) => "%z",
            ('X', 1 | 2) => "%z",
            ('X', _) => "%:z",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            _ => return Err(unsupported(format!("pattern letter '{c}' is not supported"))),
        };
        out.push_str(spec);
        i += run;
    }
    Ok(out)
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use std::collections::HashMap;

    fn coercer() -> Coercer {
        Coercer::new(&ParserConfig::default()).unwrap()
    }

    fn coercer_with(format: &str, time_zone_support: bool) -> Coercer {
        let props = HashMap::from([
            ("dateFormat".to_string(), format.to_string()),
            ("timeZoneSupport".to_string(), time_zone_support.to_string()),
        ]);
        Coercer::new(&ParserConfig::from_properties(&props).unwrap()).unwrap()
    }

    #[test]
    fn test_default_pattern_translation() {
        assert_eq!(
            java_date_pattern(crate::config::DEFAULT_DATE_FORMAT).unwrap(),
            DEFAULT_CHRONO_FORMAT
        );
        assert_eq!(Coercer::default().date_format, DEFAULT_CHRONO_FORMAT);
        assert_eq!(java_date_pattern("dd/MM/yy 'at' HH:mm").unwrap(), "%d/%m/%y at %H:%M");
        assert_eq!(java_date_pattern("yyyy''MM").unwrap(), "%Y'%m");
        assert!(java_date_pattern("yyyy-QQ").is_err());
        assert!(java_date_pattern("yyyy'T").is_err());
    }

    #[test]
    fn test_date_with_default_format() {
        let value = coercer().coerce("time", "2023-05-01T00:00:00.000+0000", FieldType::DateTime).unwrap();
        assert_eq!(value, Value::DateTime(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_date_offset_colon_is_stripped() {
        let value = coercer().parse_date("2010-03-11T18:00:00.000+01:00").unwrap();
        assert_eq!(value, Utc.with_ymd_and_hms(2010, 3, 11, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_date_with_custom_format() {
        let c = coercer_with("yyyy-MM-dd'T'HH:mm:ss", false);
        let value = c.parse_date("2010-03-11T18:00:00").unwrap();
        assert_eq!(value, Utc.with_ymd_and_hms(2010, 3, 11, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_date_only_falls_back_to_iso() {
        let value = coercer().parse_date("2010-03-11").unwrap();
        assert_eq!(value, Utc.with_ymd_and_hms(2010, 3, 11, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_duration_is_relative_to_now() {
        let before = Utc::now();
        let value = coercer().parse_date("-P1D").unwrap();
        let after = Utc::now();
        assert!(value <= after - TimeDelta::days(1));
        assert!(value >= before - TimeDelta::days(1));
    }

    #[test]
    fn test_invalid_date() {
        let err = coercer().coerce("time", "yesterday", FieldType::DateTime).unwrap_err();
        assert_eq!(err, ParseError::InvalidDate { value: "yesterday".to_string() });
    }

    #[test]
    fn test_primitive_conversions() {
        let c = coercer();
        assert_eq!(c.coerce("age", "18", FieldType::Integer).unwrap(), Value::Integer(18));
        assert_eq!(c.coerce("ratio", "0.5", FieldType::Decimal).unwrap(), Value::Decimal(0.5));
        assert_eq!(c.coerce("ok", "TRUE", FieldType::Boolean).unwrap(), Value::Boolean(true));
        assert_eq!(c.coerce("name", "10", FieldType::String).unwrap(), Value::from("10"));
    }

    #[test]
    fn test_invalid_primitive_names_literal_and_type() {
        let err = coercer().coerce("age", "eighteen", FieldType::Integer).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue { value: "eighteen".to_string(), target: FieldType::Integer }
        );
        assert!(err.to_string().contains("eighteen"));
        assert!(err.to_string().contains("integer"));
        assert!(coercer().coerce("ok", "yes", FieldType::Boolean).is_err());
    }

    #[test]
    fn test_strip_offset_colon_only_touches_offsets() {
        assert_eq!(strip_offset_colon("2010-03-11T18:00:00+01:00"), "2010-03-11T18:00:00+0100");
        assert_eq!(strip_offset_colon("2010-03-11T18:00:00"), "2010-03-11T18:00:00");
        assert_eq!(strip_offset_colon("18:00"), "18:00");
    }
}
