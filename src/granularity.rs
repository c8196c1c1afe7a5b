//! Time-range / data-granularity rules.
//!
//! Fine granularities are only allowed over short ranges. This module decides
//! which (range, granularity) pairs are permitted, recommends a default for a
//! range, and produces advisory warnings for valid but heavy choices.

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::data::model::Timestamp;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

// ---------------------------------------------------------------------------
// Granularity and its constraint table
// ---------------------------------------------------------------------------

/// Time-bucketing resolution of a KPI series, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Granularity {
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    #[serde(rename = "1mo")]
    Monthly,
}

impl Granularity {
    pub const FINEST: Granularity = Granularity::FifteenMinutes;

    /// Identifier accepted by [`validate`] and `FromStr`.
    pub fn id(self) -> &'static str {
        match self {
            Granularity::FifteenMinutes => "15m",
            Granularity::Hourly => "1h",
            Granularity::Daily => "1d",
            Granularity::Weekly => "1w",
            Granularity::Monthly => "1mo",
        }
    }

    pub fn constraint(self) -> &'static GranularityConstraint {
        &GRANULARITY_CONSTRAINTS[self as usize]
    }

    pub fn label(self) -> &'static str {
        self.constraint().label
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown granularity '{0}' (expected one of 15m, 1h, 1d, 1w, 1mo)")]
pub struct ParseGranularityError(pub String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GRANULARITY_CONSTRAINTS
            .iter()
            .map(|c| c.granularity)
            .find(|g| g.id() == s)
            .ok_or_else(|| ParseGranularityError(s.to_string()))
    }
}

/// Longest range a granularity may be requested over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GranularityConstraint {
    pub granularity: Granularity,
    /// `None` means unbounded.
    pub max_range_days: Option<i64>,
    pub label: &'static str,
}

impl GranularityConstraint {
    pub fn allows(&self, days: i64) -> bool {
        self.max_range_days.map_or(true, |max| days <= max)
    }
}

/// Ordered finest to coarsest; indexed by `Granularity as usize`.
pub static GRANULARITY_CONSTRAINTS: [GranularityConstraint; 5] = [
    GranularityConstraint {
        granularity: Granularity::FifteenMinutes,
        max_range_days: Some(1),
        label: "15 Minutes",
    },
    GranularityConstraint {
        granularity: Granularity::Hourly,
        max_range_days: Some(90),
        label: "Hourly",
    },
    GranularityConstraint {
        granularity: Granularity::Daily,
        max_range_days: None,
        label: "Daily",
    },
    GranularityConstraint {
        granularity: Granularity::Weekly,
        max_range_days: None,
        label: "Weekly",
    },
    GranularityConstraint {
        granularity: Granularity::Monthly,
        max_range_days: None,
        label: "Monthly",
    },
];

// ---------------------------------------------------------------------------
// Time range
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl TimeRange {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    pub fn parse(from: &str, to: &str) -> Self {
        Self::new(Timestamp::parse(from), Timestamp::parse(to))
    }

    /// Span in whole days, see [`days_between`].
    pub fn days(&self) -> Option<i64> {
        days_between(self.from, self.to)
    }
}

/// Absolute distance in days, rounded up: a 30-hour span counts as 2 days.
///
/// `None` when either timestamp is invalid.
pub fn days_between(from: Timestamp, to: Timestamp) -> Option<i64> {
    let (from, to) = (from.as_datetime()?, to.as_datetime()?);
    let ms = (to - from).num_milliseconds().abs();
    Some((ms + DAY_MS - 1) / DAY_MS)
}

fn days_label(days: &i64) -> String {
    if *days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Every granularity whose limit covers the range, finest first.
pub fn valid_granularities(range: &TimeRange) -> Vec<Granularity> {
    let Some(days) = range.days() else {
        return Vec::new();
    };
    GRANULARITY_CONSTRAINTS
        .iter()
        .filter(|c| c.allows(days))
        .map(|c| c.granularity)
        .collect()
}

pub fn is_valid_granularity(range: &TimeRange, granularity: Granularity) -> bool {
    valid_granularities(range).contains(&granularity)
}

/// Default choice for a range: up to 1 day → 15 minutes, up to 30 → hourly, else daily.
pub fn recommended_granularity(range: &TimeRange) -> Granularity {
    match range.days() {
        Some(days) if days <= 1 => Granularity::FifteenMinutes,
        Some(days) if days <= 30 => Granularity::Hourly,
        _ => Granularity::Daily,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GranularityError {
    #[error("Time range contains an invalid date")]
    InvalidDate,

    #[error("Start date {from} is after end date {to}")]
    InvertedRange { from: Timestamp, to: Timestamp },

    #[error("Unknown granularity '{0}'")]
    UnknownGranularity(String),

    #[error(
        "{granularity} data is limited to a maximum range of {}; the selected range spans {}",
        days_label(.max_days),
        days_label(.range_days)
    )]
    RangeTooLarge {
        granularity: Granularity,
        max_days: i64,
        range_days: i64,
    },
}

impl GranularityError {
    /// Stable code for UI-side handling.
    pub fn code(&self) -> &'static str {
        match self {
            GranularityError::InvalidDate => "INVALID_DATE",
            GranularityError::InvertedRange { .. } => "INVERTED_RANGE",
            GranularityError::UnknownGranularity(_) => "UNKNOWN_GRANULARITY",
            GranularityError::RangeTooLarge { .. } => "RANGE_TOO_LARGE",
        }
    }
}

impl Serialize for GranularityError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GranularityError", 2)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Outcome of [`validate`]. `warning` is only ever set when `valid` is true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GranularityError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ValidationResult {
    fn rejected(error: GranularityError) -> Self {
        Self {
            valid: false,
            error: Some(error),
            warning: None,
        }
    }
}

fn checked_days(range: &TimeRange) -> Result<i64, GranularityError> {
    let days = range.days().ok_or(GranularityError::InvalidDate)?;
    if range.from > range.to {
        return Err(GranularityError::InvertedRange {
            from: range.from,
            to: range.to,
        });
    }
    Ok(days)
}

/// Check a requested granularity id against a range.
///
/// Checks run in order: broken range, unknown id, range over the limit.
/// Exceeding the limit is always an error here; [`granularity_warning`]
/// reports the same condition as advice when called on its own.
pub fn validate(range: &TimeRange, granularity: &str) -> ValidationResult {
    let days = match checked_days(range) {
        Ok(days) => days,
        Err(err) => return ValidationResult::rejected(err),
    };

    let granularity = match granularity.parse::<Granularity>() {
        Ok(g) => g,
        Err(ParseGranularityError(id)) => {
            return ValidationResult::rejected(GranularityError::UnknownGranularity(id))
        }
    };

    let constraint = granularity.constraint();
    if let Some(max_days) = constraint.max_range_days {
        if days > max_days {
            return ValidationResult::rejected(GranularityError::RangeTooLarge {
                granularity,
                max_days,
                range_days: days,
            });
        }
    }

    ValidationResult {
        valid: true,
        error: None,
        warning: granularity_warning(range, granularity),
    }
}

/// Advisory text for a heavy or over-limit choice; never affects validity.
pub fn granularity_warning(range: &TimeRange, granularity: Granularity) -> Option<String> {
    let days = range.days()?;
    let constraint = granularity.constraint();

    // 15-minute data is capped at 1 day, so its "more than 7 days" case lands here too.
    if !constraint.allows(days) {
        let suggestion = valid_granularities(range)
            .first()
            .copied()
            .unwrap_or(Granularity::Daily);
        return Some(format!(
            "{} data covers at most {}; switch to {} or coarser for this {} range",
            constraint.label,
            days_label(&constraint.max_range_days.unwrap_or(days)),
            suggestion,
            days_label(&days),
        ));
    }

    if days > 30 && granularity == Granularity::Hourly {
        return Some("Hourly data over more than 30 days is dense; consider Daily".to_string());
    }

    None
}
