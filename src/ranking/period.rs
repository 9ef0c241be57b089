//! Calendar months and leaderboard periods

use chrono::{DateTime, Datelike, TimeZone, Utc};
use std::fmt;
use thiserror::Error;

use crate::models::TimeWindow;

/// No scores were recorded before this month
pub const EARLIEST_MONTH: Month = Month {
    year: 2025,
    month: 11,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("invalid month format, expected YYYY-MM")]
    InvalidMonth,

    #[error("period must be 'all' or 'month'")]
    InvalidPeriod,

    #[error("period and month cannot be combined")]
    Conflicting,
}

/// A UTC calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Parse a strict `YYYY-MM` string
    pub fn parse(value: &str) -> Result<Self, PeriodError> {
        let bytes = value.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(PeriodError::InvalidMonth);
        }
        let (year, month) = (&value[..4], &value[5..]);
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(PeriodError::InvalidMonth);
        }

        let year: i32 = year.parse().map_err(|_| PeriodError::InvalidMonth)?;
        let month: u32 = month.parse().map_err(|_| PeriodError::InvalidMonth)?;
        Self::new(year, month).ok_or(PeriodError::InvalidMonth)
    }

    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Midnight UTC on the first day
    pub fn start(&self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start(), self.next().start())
    }

    /// Months outside `[EARLIEST_MONTH, current]` hold no data worth querying
    pub fn has_data(&self, now: DateTime<Utc>) -> bool {
        *self >= EARLIEST_MONTH && *self <= Self::containing(now)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Time range a leaderboard covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    AllTime,
    Month(Month),
}

impl Period {
    /// Resolve the `period` and `month` query parameters. Empty values count as absent.
    pub fn from_query(
        period: Option<&str>,
        month: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, PeriodError> {
        let period = period.filter(|p| !p.is_empty());
        let month = month.filter(|m| !m.is_empty());

        match (period, month) {
            (Some(_), Some(_)) => Err(PeriodError::Conflicting),
            (None, Some(m)) => Month::parse(m).map(Period::Month),
            (Some("all"), None) | (None, None) => Ok(Period::AllTime),
            (Some("month"), None) => Ok(Period::Month(Month::containing(now))),
            (Some(_), None) => Err(PeriodError::InvalidPeriod),
        }
    }

    pub fn month(&self) -> Option<Month> {
        match self {
            Period::AllTime => None,
            Period::Month(m) => Some(*m),
        }
    }

    pub fn window(&self) -> Option<TimeWindow> {
        self.month().map(|m| m.window())
    }
}
