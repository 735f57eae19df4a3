//! Calendar quarter: the unit both survey rounds and revision periods are keyed by.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuarterError {
    #[error("quarter must be in 1..=4, got {0}")]
    OutOfRange(i64),

    #[error("{0} is not the first day of a quarter")]
    NotQuarterStart(NaiveDate),
}

/// A calendar quarter `(year, quarter)`.
///
/// Ordering is chronological: year first, then quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quarter {
    year: i32,
    quarter: u8,
}

impl Quarter {
    pub fn new(year: i32, quarter: u8) -> Result<Self, QuarterError> {
        if !(1..=4).contains(&quarter) {
            return Err(QuarterError::OutOfRange(quarter as i64));
        }
        Ok(Self { year, quarter })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn quarter(&self) -> u8 {
        self.quarter
    }

    /// The quarter immediately before this one. Q1 rolls back to Q4 of the prior year.
    pub fn prev(&self) -> Self {
        if self.quarter == 1 {
            Self {
                year: self.year - 1,
                quarter: 4,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter - 1,
            }
        }
    }

    /// The quarter immediately after this one. Q4 rolls forward to Q1 of the next year.
    pub fn next(&self) -> Self {
        if self.quarter == 4 {
            Self {
                year: self.year + 1,
                quarter: 1,
            }
        } else {
            Self {
                year: self.year,
                quarter: self.quarter + 1,
            }
        }
    }

    /// All four quarters of a calendar year, Q1 first.
    pub fn quarters_of_year(year: i32) -> [Quarter; 4] {
        [1, 2, 3, 4].map(|quarter| Quarter { year, quarter })
    }

    /// First day of the quarter. This is the observation date FRED uses for quarterly series.
    pub fn first_day(&self) -> NaiveDate {
        let month = (self.quarter as u32 - 1) * 3 + 1;
        NaiveDate::from_ymd_opt(self.year, month, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    /// Parse a quarterly observation date. Only the first day of a quarter's
    /// first month is accepted.
    pub fn from_period_date(date: NaiveDate) -> Result<Self, QuarterError> {
        let month = date.month();
        if date.day() != 1 || (month - 1) % 3 != 0 {
            return Err(QuarterError::NotQuarterStart(date));
        }
        Ok(Self {
            year: date.year(),
            quarter: ((month - 1) / 3 + 1) as u8,
        })
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}
