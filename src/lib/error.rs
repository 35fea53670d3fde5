//! Recoverable failures of the planning computations
//!
//! None of these is fatal: they are meant to be turned into a diagnostic
//! and leave the plan in a state the user can correct.

use thiserror::Error;

use crate::lib::{date::Date, fiscal::FiscalYear, month::MonthBucket, range::DateRange};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// the activity cannot be added to a plan for this fiscal year
    #[error("activity does not overlap with selected plan year")]
    NoOverlap {
        activity: DateRange,
        fiscal_year: FiscalYear,
    },
    #[error("range ends on {end}, before it starts on {start}")]
    InvertedRange { start: Date, end: Date },
    #[error("'{0}' is not a fiscal year label such as FY 2025-26")]
    InvalidFiscalYear(String),
    /// month outside of the editable window of an allocation
    #[error("month {0} is locked for this allocation")]
    LockedMonth(MonthBucket),
}
