//! 配置模块: parser options, loadable from a JSON file or a string
//! properties map.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd'T'HH:mm:ss.SSSZ";
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 32;

pub const DATE_FORMAT_PROPERTY: &str = "dateFormat";
pub const TIMEZONE_SUPPORT_PROPERTY: &str = "timeZoneSupport";
pub const SINGLE_EQUALS_PROPERTY: &str = "singleEqualsOperator";
pub const LAX_PROPERTY_MATCH_PROPERTY: &str = "laxPropertyMatch";
pub const MAX_NESTING_DEPTH_PROPERTY: &str = "maxNestingDepth";

/// Options controlling how expressions are parsed and literals coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParserConfig {
    /// Java-style date pattern tried first for date-time fields.
    pub date_format: String,
    /// Strip the colon of a trailing `+HH:MM` offset before parsing dates.
    pub time_zone_support: bool,
    /// Accept a bare `=` as EQUALS.
    pub single_equals_operator: bool,
    /// Drop comparisons on unknown properties instead of failing.
    pub lax_property_match: bool,
    /// Query name to resolver field name.
    pub property_aliases: HashMap<String, String>,
    pub max_nesting_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            time_zone_support: true,
            single_equals_operator: false,
            lax_property_match: false,
            property_aliases: HashMap::new(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl ParserConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.display().to_string(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path_ref.display().to_string(),
            source,
        })
    }

    /// Builds a config from flat string options, the way callers pass
    /// context properties. Unrecognized keys are ignored.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (key, value) in properties {
            match key.as_str() {
                DATE_FORMAT_PROPERTY => config.date_format = value.clone(),
                TIMEZONE_SUPPORT_PROPERTY => config.time_zone_support = parse_flag(key, value)?,
                SINGLE_EQUALS_PROPERTY => config.single_equals_operator = parse_flag(key, value)?,
                LAX_PROPERTY_MATCH_PROPERTY => config.lax_property_match = parse_flag(key, value)?,
                MAX_NESTING_DEPTH_PROPERTY => {
                    config.max_nesting_depth = value.parse().map_err(|_| invalid(key, value))?;
                }
                _ => tracing::debug!(key = %key, "ignoring unrecognized parser option"),
            }
        }
        Ok(config)
    }

    pub fn with_alias(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.property_aliases.insert(name.into(), field.into());
        self
    }

    /// 获取属性对应的字段名，如果不存在则返回原名
    pub fn resolve_property<'a>(&'a self, name: &'a str) -> &'a str {
        self.property_aliases.get(name).map(String::as_str).unwrap_or(name)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(key, value))
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidOption { key: key.to_string(), value: value.to_string() }
}
