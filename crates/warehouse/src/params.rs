//! Query parameters resolved from the dashboard filter controls

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Date format accepted by the filter controls
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Granularity used when the request does not choose one
pub const DEFAULT_GRANULARITY: Granularity = Granularity::Month;
/// First day of the default reporting window
pub const DEFAULT_START_DATE: &str = "2023-01-01";
/// Last day of the default reporting window
pub const DEFAULT_END_DATE: &str = "2025-08-31";

/// Rejections produced while resolving filter values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamsError {
    /// Granularity outside of `day`, `week`, `month`
    #[error("invalid granularity '{0}': expected one of day, week, month")]
    InvalidGranularity(String),
    /// A date that is not `YYYY-MM-DD`
    #[error("invalid {field} '{value}': expected YYYY-MM-DD")]
    InvalidDate {
        /// Name of the offending control
        field: &'static str,
        /// Raw value received
        value: String,
    },
    /// Start date after end date
    #[error("invalid range: start_date {start} is after end_date {end}")]
    InvalidRange {
        /// Requested first day
        start: NaiveDate,
        /// Requested last day
        end: NaiveDate,
    },
}

impl ParamsError {
    /// Name of the filter control the error belongs to.
    pub const fn control(&self) -> &'static str {
        match self {
            Self::InvalidGranularity(_) => "granularity",
            Self::InvalidDate { field, .. } => *field,
            Self::InvalidRange { .. } => "start_date",
        }
    }
}

/// Time bucket width for time-series and cohort views
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Calendar day
    Day,
    /// ISO week starting on Monday
    Week,
    /// Calendar month
    Month,
}

impl Granularity {
    /// Lowercase name as used in query strings.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// `ClickHouse` function truncating a timestamp or date to its bucket start.
    pub const fn truncate_fn(&self) -> &'static str {
        match self {
            Self::Day => "toDate",
            Self::Week => "toMonday",
            Self::Month => "toStartOfMonth",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(ParamsError::InvalidGranularity(s.to_owned())),
        }
    }
}

/// Canonical filter selection: granularity plus an inclusive day window.
///
/// Fields are private so a value always satisfies `start_date <= end_date`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct QueryParams {
    granularity: Granularity,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl QueryParams {
    /// Build params from already typed values.
    pub fn new(
        granularity: Granularity,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self, ParamsError> {
        if start_date > end_date {
            return Err(ParamsError::InvalidRange { start: start_date, end: end_date });
        }
        Ok(Self { granularity, start_date, end_date })
    }

    /// Resolve raw control values, falling back to the defaults for missing ones.
    pub fn resolve(
        granularity: Option<&str>,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Self, ParamsError> {
        let defaults = Self::default();
        let granularity = match granularity {
            Some(raw) => raw.parse()?,
            None => defaults.granularity,
        };
        let start_date = match start_date {
            Some(raw) => parse_date("start_date", raw)?,
            None => defaults.start_date,
        };
        let end_date = match end_date {
            Some(raw) => parse_date("end_date", raw)?,
            None => defaults.end_date,
        };
        Self::new(granularity, start_date, end_date)
    }

    /// Bucket width.
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// First day of the window (inclusive).
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day of the window (inclusive).
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Same window with a different granularity.
    pub const fn with_granularity(self, granularity: Granularity) -> Self {
        Self { granularity, ..self }
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            granularity: DEFAULT_GRANULARITY,
            start_date: NaiveDate::parse_from_str(DEFAULT_START_DATE, DATE_FORMAT)
                .unwrap_or_default(),
            end_date: NaiveDate::parse_from_str(DEFAULT_END_DATE, DATE_FORMAT).unwrap_or_default(),
        }
    }
}

fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ParamsError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| ParamsError::InvalidDate { field, value: raw.to_owned() })
}
