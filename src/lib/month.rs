//! Calendar months as ordered buckets (`YYYY-MM`)

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::lib::date::{is_digits, Date, DateError, Month};

/// One calendar month, the unit monthly targets are planned in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthBucket {
    year: u16,
    month: Month,
}

impl MonthBucket {
    pub fn new(year: u16, month: Month) -> Self {
        Self { year, month }
    }

    /// Month containing `date`
    pub fn of(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> u16 {
        self.year
    }

    pub fn month(self) -> Month {
        self.month
    }

    pub fn first_day(self) -> Date {
        Date::first_of(self.year, self.month)
    }

    pub fn last_day(self) -> Date {
        Date::last_of(self.year, self.month)
    }

    /// Following month, rolling over to January of the next year
    pub fn next(self) -> Self {
        match self.month {
            Month::Dec => Self {
                year: self.year + 1,
                month: Month::Jan,
            },
            m => Self {
                month: m.next(),
                ..self
            },
        }
    }

    /// Biject the months with integers
    ///
    /// For any bucket `b`, `b.index() + 1 == b.next().index()`
    pub fn index(self) -> usize {
        self.year as usize * 12 + self.month as usize
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month.number())
    }
}

impl FromStr for MonthBucket {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, DateError> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .filter(|(y, m)| y.len() == 4 && m.len() == 2 && is_digits(y) && is_digits(m))
            .ok_or_else(|| DateError::Malformed(s.to_string()))?;
        // digits only, both parse
        let year = y.parse::<usize>().unwrap_or_default();
        let month = m.parse::<usize>().unwrap_or_default();
        if !(1000..=9999).contains(&year) {
            return Err(DateError::UnsupportedYear(year));
        }
        let month = Month::from_number(month).ok_or(DateError::InvalidMonth(month))?;
        Ok(Self::new(year as u16, month))
    }
}

impl Serialize for MonthBucket {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Ascending sequence of months, see `months_between`
///
/// Cloning restarts the sequence from the current position.
#[derive(Debug, Clone)]
pub struct Months {
    next: Option<MonthBucket>,
    last: MonthBucket,
}

/// One entry per calendar month, from the month of `start` to the month of `end` inclusive
///
/// Empty if the month of `start` comes after the month of `end`.
pub fn months_between(start: Date, end: Date) -> Months {
    let first = MonthBucket::of(start);
    let last = MonthBucket::of(end);
    Months {
        next: if first <= last { Some(first) } else { None },
        last,
    }
}

impl Iterator for Months {
    type Item = MonthBucket;

    fn next(&mut self) -> Option<MonthBucket> {
        let current = self.next?;
        self.next = if current < self.last {
            Some(current.next())
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self
            .next
            .map(|m| self.last.index() - m.index() + 1)
            .unwrap_or(0);
        (len, Some(len))
    }
}

impl ExactSizeIterator for Months {}

#[cfg(test)]
#[rustfmt::skip]
mod test {
    use super::*;
    use crate::lib::date::Month::*;

    macro_rules! dt {
        ( $s:expr ) => { $s.parse::<Date>().unwrap() }
    }
    macro_rules! keys {
        ( $it:expr ) => { $it.map(|m| m.to_string()).collect::<Vec<_>>() }
    }

    #[test]
    fn activity_inside_fiscal_year() {
        let months = months_between(dt!("2025-06-01"), dt!("2026-02-28"));
        assert_eq!(months.len(), 9);
        assert_eq!(keys!(months), vec![
            "2025-06", "2025-07", "2025-08", "2025-09", "2025-10",
            "2025-11", "2025-12", "2026-01", "2026-02",
        ]);
    }

    #[test]
    fn same_month_is_single_bucket() {
        assert_eq!(keys!(months_between(dt!("2025-06-03"), dt!("2025-06-27"))), vec!["2025-06"]);
        assert_eq!(months_between(dt!("2025-06-27"), dt!("2025-06-03")).count(), 1);
        assert_eq!(months_between(dt!("2025-07-01"), dt!("2025-06-30")).count(), 0);
    }

    #[test]
    fn length_matches_month_arithmetic() {
        let dates = ["2019-11-30", "2020-02-29", "2024-04-01", "2025-03-31", "2027-12-31"];
        for a in dates {
            for b in dates {
                let (a, b) = (dt!(a), dt!(b));
                if a > b {
                    continue;
                }
                let expected = (b.year() as usize * 12 + b.month() as usize)
                    - (a.year() as usize * 12 + a.month() as usize) + 1;
                let months = months_between(a, b);
                assert_eq!(months.len(), expected);
                assert_eq!(months.count(), expected, "{}..{}", a, b);
            }
        }
    }

    #[test]
    fn restartable() {
        let months = months_between(dt!("2025-11-15"), dt!("2026-02-01"));
        let mut partial = months.clone();
        partial.next();
        assert_eq!(keys!(months.clone()), keys!(months));
        assert_eq!(keys!(partial), vec!["2025-12", "2026-01", "2026-02"]);
    }

    #[test]
    fn parse_keys() {
        assert_eq!("2026-02".parse::<MonthBucket>(), Ok(MonthBucket::new(2026, Feb)));
        assert_eq!("2026-00".parse::<MonthBucket>(), Err(DateError::InvalidMonth(0)));
        assert_eq!("0999-01".parse::<MonthBucket>(), Err(DateError::UnsupportedYear(999)));
        assert!("2026-2".parse::<MonthBucket>().is_err());
        assert!("2026/02".parse::<MonthBucket>().is_err());
        assert_eq!(MonthBucket::new(2025, Dec).next(), MonthBucket::new(2026, Jan));
        assert_eq!(MonthBucket::new(2024, Feb).last_day(), dt!("2024-02-29"));
    }

    #[test]
    fn serializes_as_key() {
        let json = serde_json::to_string(&MonthBucket::new(2025, Sep)).unwrap();
        assert_eq!(json, "\"2025-09\"");
    }
}
