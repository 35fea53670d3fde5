//! Day-precise time management
//!
//! Dates are `YYYY-MM-DD`, not number of seconds. Fiscal windows, month buckets
//! and activity ranges are all closed intervals of these, so a range that "ends
//! on March 31" includes every instant of March 31.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A date with day-precision
///
/// Supports years in the range 1000..=9999 when built from user input.
///
/// All methods execute in constant time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: u16,
    month: Month,
    day: u8,
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month.number(), self.day)
    }
}

/// Twelve months in the year, identified by their 3-letter abbreviations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, PartialOrd, Ord)]
pub enum Month {
    Jan = 0,
    Feb,
    Mar,
    Apr,
    May,
    Jun,
    Jul,
    Aug,
    Sep,
    Oct,
    Nov,
    Dec,
}

impl Month {
    /// Month from its calendar number (`1` is January)
    pub fn from_number(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(Self::from_usize)
    }

    /// Calendar number, `1..=12`
    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    /// Month directly succeeding the current one with wrapping
    pub fn next(self) -> Self {
        Self::from_isize((self as isize + 1) % 12).unwrap()
    }

    /// Month directly preceding the current one with wrapping
    pub fn prev(self) -> Self {
        Self::from_isize((self as isize + 11) % 12).unwrap()
    }

    /// Number of days in this month of the given year
    pub fn count(self, year: u16) -> u8 {
        use Month::*;
        match self {
            Jan | Mar | May | Jul | Aug | Oct | Dec => 31,
            Apr | Jun | Sep | Nov => 30,
            Feb => {
                if is_leap(year) {
                    29
                } else {
                    28
                }
            }
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Ways in which a date taken from user input can be wrong
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DateError {
    /// year is outside of 1000..=9999
    #[error("{0} is outside of the supported range for years")]
    UnsupportedYear(usize),
    /// month outside of 1..=12
    #[error("{0} is not a valid month number")]
    InvalidMonth(usize),
    /// Feb 29 of a non-leap year
    #[error("{0} is not bissextile, Feb 29 does not exist")]
    NotBissextile(usize),
    /// Feb 30 or Feb 31 or 31st day of a 30-day month
    #[error("{0} is a short month, it does not have a {1}th day")]
    MonthTooShort(Month, usize),
    /// day outside of 1..=31
    #[error("{0} is not a valid day")]
    InvalidDay(usize),
    /// not shaped like `YYYY-MM-DD` (or `YYYY-MM` for months)
    #[error("'{0}' is not a well-formed date")]
    Malformed(String),
}

impl DateError {
    /// What message to show to help fix the date error
    pub fn fix_hint(&self) -> String {
        use DateError::*;
        match self {
            UnsupportedYear(_) => "year should be between 1000 and 9999 inclusive".to_string(),
            InvalidMonth(_) => "months are numbered 01 to 12".to_string(),
            NotBissextile(y) => format!("did you mean {y}-02-28 or {y}-03-01 ?", y = y),
            MonthTooShort(m, _) => format!(
                "{} is only {} days long",
                m,
                if *m == Month::Feb { "28 or 29" } else { "30" }
            ),
            InvalidDay(d) => format!("{} is not in the range 1 ..= 31", d),
            Malformed(_) => "write dates as YYYY-MM-DD and months as YYYY-MM".to_string(),
        }
    }
}

impl Date {
    /// Validate year-month-day into date
    pub fn from(year: usize, month: Month, day: usize) -> Result<Self, DateError> {
        if !(1000..=9999).contains(&year) {
            Err(DateError::UnsupportedYear(year))
        } else if day == 0 || day > 31 {
            Err(DateError::InvalidDay(day))
        } else if day <= month.count(year as u16) as usize {
            Ok(Self {
                year: year as u16,
                month,
                day: day as u8,
            })
        } else if day >= 30 {
            Err(DateError::MonthTooShort(month, day))
        } else {
            Err(DateError::NotBissextile(year))
        }
    }

    /// Same as `from` with a numeric month
    pub fn from_ymd(year: usize, month: usize, day: usize) -> Result<Self, DateError> {
        let m = Month::from_number(month).ok_or(DateError::InvalidMonth(month))?;
        Self::from(year, m, day)
    }

    /// Day 1 of a month, no validation of the year
    pub(crate) fn first_of(year: u16, month: Month) -> Self {
        Self { year, month, day: 1 }
    }

    /// Last day of a month, no validation of the year
    pub(crate) fn last_of(year: u16, month: Month) -> Self {
        Self {
            year,
            month,
            day: month.count(year),
        }
    }

    /// Current local date
    pub fn today() -> Self {
        use chrono::Datelike;
        let now = chrono::Local::now().date_naive();
        let month = Month::from_u32(now.month0()).unwrap_or(Month::Jan);
        Self {
            year: now.year().clamp(1000, 9999) as u16,
            month,
            day: now.day() as u8,
        }
    }

    /// `self.day` accessor
    pub fn day(&self) -> u8 {
        self.day
    }

    /// `self.month` accessor
    pub fn month(&self) -> Month {
        self.month
    }

    /// `self.year` accessor
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Get date of the first day of the current month
    pub fn start_of_month(self) -> Self {
        Self { day: 1, ..self }
    }

    /// Get date of the last day of the current month
    pub fn end_of_month(self) -> Self {
        Self {
            day: self.month.count(self.year),
            ..self
        }
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, DateError> {
        let malformed = || DateError::Malformed(s.to_string());
        let mut parts = s.trim().split('-');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(y), Some(m), Some(d), None)
                if y.len() == 4 && m.len() == 2 && d.len() == 2
                    && is_digits(y) && is_digits(m) && is_digits(d) =>
            {
                let num = |x: &str| x.parse::<usize>().map_err(|_| malformed());
                Self::from_ymd(num(y)?, num(m)?, num(d)?)
            }
            _ => Err(malformed()),
        }
    }
}

pub(crate) fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_leap(year: u16) -> bool {
    if year % 400 == 0 {
        true
    } else if year % 100 == 0 {
        false
    } else {
        year % 4 == 0
    }
}

#[cfg(test)]
mod test {
    use super::{Month::*, *};

    #[test]
    fn bissextile_check() {
        macro_rules! yes {
            ( $y:expr ) => { assert!(is_leap($y)); }
        }
        macro_rules! no {
            ( $y:expr ) => { assert!(!is_leap($y)); }
        }
        yes!(2004);
        no!(2100);
        yes!(2000);
        no!(2001);
        yes!(2028);
    }

    macro_rules! ok {
        ( $y:tt - $m:tt - $d:tt ) => {
            assert_eq!(Date::from($y, $m, $d), Ok(Date { year: $y, month: $m, day: $d }));
        }
    }
    macro_rules! short {
        ( $y:tt - $m:tt - $d:tt ) => {
            assert_eq!(Date::from($y, $m, $d), Err(DateError::MonthTooShort($m, $d)));
        }
    }
    macro_rules! nbiss {
        ( $y:tt - $m:tt - $d:tt ) => {
            assert_eq!(Date::from($y, $m, $d), Err(DateError::NotBissextile($y)));
        }
    }

    #[test]
    fn month_lengths() {
        ok!(2025-Mar-31);
        short!(2025-Apr-31);
        short!(2025-Sep-31);
        ok!(2024-Feb-29);
        nbiss!(2025-Feb-29);
        short!(2024-Feb-30);
        assert_eq!(Date::from(2025, Jan, 0), Err(DateError::InvalidDay(0)));
        assert_eq!(Date::from(999, Jan, 1), Err(DateError::UnsupportedYear(999)));
    }

    #[test]
    fn month_numbers() {
        assert_eq!(Month::from_number(1), Some(Jan));
        assert_eq!(Month::from_number(12), Some(Dec));
        assert_eq!(Month::from_number(0), None);
        assert_eq!(Month::from_number(13), None);
        assert_eq!(Apr.number(), 4);
        assert_eq!(Dec.next(), Jan);
        assert_eq!(Jan.prev(), Dec);
    }

    #[test]
    fn parse_and_print() {
        let d = "2025-06-01".parse::<Date>().unwrap();
        assert_eq!(d, Date::from(2025, Jun, 1).unwrap());
        assert_eq!(&format!("{}", d), "2025-06-01");
        assert_eq!("2026-02-28".parse::<Date>().map(|d| d.end_of_month()), Date::from(2026, Feb, 28));
        assert_eq!("2025-13-01".parse::<Date>(), Err(DateError::InvalidMonth(13)));
        assert!(matches!("2025-6-1".parse::<Date>(), Err(DateError::Malformed(_))));
        assert!(matches!("2025-06-01-02".parse::<Date>(), Err(DateError::Malformed(_))));
        assert!(matches!("+025-06-01".parse::<Date>(), Err(DateError::Malformed(_))));
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Date::from(2025, Dec, 31).unwrap();
        let b = Date::from(2026, Jan, 1).unwrap();
        assert!(a < b);
        assert_eq!(b.start_of_month(), b);
        assert_eq!(Date::from(2024, Feb, 3).unwrap().end_of_month(), Date::from(2024, Feb, 29).unwrap());
    }
}
