//! The historical time window that observations are looked up in.

use crate::error::MeteoMapError;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::fmt;

/// An inclusive range of hourly timestamps (naive, UTC) to query observations for.
///
/// The server uses one fixed window for every request; it is configured at startup
/// rather than supplied per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateWindow {
    /// Creates a window from `start` to `end`, both inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`MeteoMapError::UnalignedWindow`] when a bound is not a whole hour
    /// (observations are hourly rows) and [`MeteoMapError::InvalidWindow`] when `start`
    /// is after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, MeteoMapError> {
        for bound in [start, end] {
            if bound.minute() != 0 || bound.second() != 0 || bound.nanosecond() != 0 {
                return Err(MeteoMapError::UnalignedWindow(bound));
            }
        }
        if start > end {
            return Err(MeteoMapError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub(crate) fn start_hour(&self) -> u32 {
        self.start.hour()
    }

    pub(crate) fn end_hour(&self) -> u32 {
        self.end.hour()
    }
}

impl Default for DateWindow {
    /// 2024-08-19 00:00 through 2024-08-20 00:00.
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 8, 19).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2024, 8, 20).unwrap_or_default();
        Self {
            start: start.and_time(Default::default()),
            end: end.and_time(Default::default()),
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}
