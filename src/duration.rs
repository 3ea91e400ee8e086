//! ISO-8601 durations (`-P1D`, `PT10M`, `P1Y2M3DT4H5M6.5S`) used for relative
//! date filters.

use chrono::{DateTime, Months, TimeDelta, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)Y)?(?:(\d+)M)?(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("duration pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IsoDuration {
    pub negative: bool,
    pub years: u32,
    pub months: u32,
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: f64,
}

impl IsoDuration {
    /// Parses the lexical form of an `xs:duration`. At least one component
    /// must be present and a `T` must be followed by a time component.
    pub fn parse(input: &str) -> Option<Self> {
        let caps = DURATION_PATTERN.captures(input)?;
        if (2..=7).all(|i| caps.get(i).is_none()) || input.ends_with('T') {
            return None;
        }

        fn number<N: std::str::FromStr>(caps: &regex::Captures<'_>, i: usize) -> Option<N> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => "0".parse().ok(),
            }
        }

        Some(Self {
            negative: caps.get(1).is_some(),
            years: number(&caps, 2)?,
            months: number(&caps, 3)?,
            days: number(&caps, 4)?,
            hours: number(&caps, 5)?,
            minutes: number(&caps, 6)?,
            seconds: number(&caps, 7)?,
        })
    }

    /// Adds the duration to `instant`, calendar fields first. Returns `None`
    /// when the result is out of range.
    pub fn add_to(&self, instant: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = Months::new(self.years.checked_mul(12)?.checked_add(self.months)?);
        let shifted = if self.negative {
            instant.checked_sub_months(months)?
        } else {
            instant.checked_add_months(months)?
        };

        let millis = (self.seconds * 1000.0).round() as i64;
        let delta = TimeDelta::try_days(self.days)?
            .checked_add(&TimeDelta::try_hours(self.hours)?)?
            .checked_add(&TimeDelta::try_minutes(self.minutes)?)?
            .checked_add(&TimeDelta::try_milliseconds(millis)?)?;

        if self.negative {
            shifted.checked_sub_signed(delta)
        } else {
            shifted.checked_add_signed(delta)
        }
    }
}
