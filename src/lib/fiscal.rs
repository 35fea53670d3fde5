//! April-to-March fiscal years
//!
//! A fiscal year is named after the calendar year it starts in:
//! `FY 2025-26` runs from 2025-04-01 to 2026-03-31 inclusive.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::lib::{
    date::{is_digits, Date, Month},
    error::PlanError,
    month::{months_between, MonthBucket, Months},
    range::{overlaps, DateRange},
};

/// First month of every fiscal year
pub const FISCAL_START: Month = Month::Apr;

/// A fixed 12-month window from April 1 to March 31
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FiscalYear {
    start_year: u16,
}

/// Calendar year in which the fiscal year containing `date` begins
pub fn fiscal_year_start_year(date: Date) -> u16 {
    if date.month() >= FISCAL_START {
        date.year()
    } else {
        date.year() - 1
    }
}

/// All fiscal years that share at least one day with `[range_start, range_end]`,
/// in ascending order
pub fn fiscal_years_between(range_start: Date, range_end: Date) -> Vec<FiscalYear> {
    (fiscal_year_start_year(range_start)..=fiscal_year_start_year(range_end))
        .map(FiscalYear::for_start_year)
        .filter(|fy| overlaps(fy.start(), fy.end(), range_start, range_end))
        .collect()
}

impl FiscalYear {
    pub fn for_start_year(start_year: u16) -> Self {
        Self { start_year }
    }

    pub fn for_date(date: Date) -> Self {
        Self::for_start_year(fiscal_year_start_year(date))
    }

    pub fn start_year(self) -> u16 {
        self.start_year
    }

    /// April 1st
    pub fn start(self) -> Date {
        Date::first_of(self.start_year, FISCAL_START)
    }

    /// March 31st of the following calendar year
    pub fn end(self) -> Date {
        Date::last_of(self.start_year + 1, FISCAL_START.prev())
    }

    pub fn range(self) -> DateRange {
        DateRange::ordered(self.start(), self.end())
    }

    pub fn contains(self, date: Date) -> bool {
        self.range().contains(date)
    }

    /// `FY 2025-26`
    pub fn label(self) -> String {
        format!("FY {}-{:02}", self.start_year, (self.start_year + 1) % 100)
    }

    pub fn next(self) -> Self {
        Self::for_start_year(self.start_year + 1)
    }

    /// The calendar month of this fiscal year that falls on `month`
    ///
    /// January, February and March belong to the second calendar year
    /// of the window, every other month to the first.
    pub fn bucket_for(self, month: Month) -> MonthBucket {
        if month >= FISCAL_START {
            MonthBucket::new(self.start_year, month)
        } else {
            MonthBucket::new(self.start_year + 1, month)
        }
    }

    /// The twelve months in fiscal order, April first
    pub fn months(self) -> Months {
        months_between(self.start(), self.end())
    }
}

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Accepts `FY 2025-26`, `FY2025-26`, `2025-26` and `2025-2026`
impl FromStr for FiscalYear {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, PlanError> {
        let invalid = || PlanError::InvalidFiscalYear(s.to_string());
        let body = s.trim();
        let body = body.strip_prefix("FY").map(str::trim_start).unwrap_or(body);
        let (start, end) = body.split_once('-').ok_or_else(invalid)?;
        if start.len() != 4 || !is_digits(start) || !is_digits(end) {
            return Err(invalid());
        }
        let start_year = start.parse::<u16>().map_err(|_| invalid())?;
        if !(1000..=9998).contains(&start_year) {
            return Err(invalid());
        }
        let consistent = match end.len() {
            2 => end.parse::<u16>().ok() == Some((start_year + 1) % 100),
            4 => end.parse::<u16>().ok() == Some(start_year + 1),
            _ => false,
        };
        if consistent {
            Ok(Self::for_start_year(start_year))
        } else {
            Err(invalid())
        }
    }
}

impl Serialize for FiscalYear {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}
