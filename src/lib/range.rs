//! An inclusive range of dates

use std::fmt;

use crate::lib::{
    date::Date,
    error::PlanError,
    month::{months_between, Months},
};

/// `DateRange { start, end }` is the range of dates from `start` to `end` inclusive
///
/// Never empty: `start <= end` is checked on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: Date,
    end: Date,
}

/// Whether two closed intervals share at least one point
pub fn overlaps<T>(a_start: T, a_end: T, b_start: T, b_end: T) -> bool
where
    T: Ord,
{
    a_start <= b_end && b_start <= a_end
}

/// Common part of two closed ranges of dates, `None` if they are disjoint
pub fn clamp_to_intersection(
    a_start: Date,
    a_end: Date,
    b_start: Date,
    b_end: Date,
) -> Option<DateRange> {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if start <= end {
        Some(DateRange { start, end })
    } else {
        None
    }
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, PlanError> {
        if start > end {
            Err(PlanError::InvertedRange { start, end })
        } else {
            Ok(Self { start, end })
        }
    }

    /// Build from bounds already known to be ordered
    pub(crate) fn ordered(start: Date, end: Date) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    pub fn intersect(&self, other: &Self) -> Option<Self> {
        clamp_to_intersection(self.start, self.end, other.start, other.end)
    }

    /// Every calendar month touched by this range
    pub fn months(&self) -> Months {
        months_between(self.start, self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
