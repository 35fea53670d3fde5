//! Monthly targets of an activity inside one fiscal year
//!
//! The editable months of an allocation are the months of the intersection
//! between the activity's own range and the fiscal year. Every other month
//! of the fiscal year is locked. The sum of the allocation is only advisory:
//! exceeding the lifetime target blocks submission but is never an error here.

use std::collections::BTreeMap;
use tracing::debug;

use crate::lib::{
    date::Month,
    error::PlanError,
    fiscal::FiscalYear,
    month::MonthBucket,
    range::{clamp_to_intersection, DateRange},
};

/// Non-negative target for each month, in chronological order
pub type MonthlyTargetMap = BTreeMap<MonthBucket, u64>;

/// Outcome of `validate_allocation`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationCheck {
    pub valid: bool,
    pub sum: u64,
}

/// All editable months of `activity` within `fiscal_year`, each set to 0
pub fn build_monthly_target_skeleton(
    activity: DateRange,
    fiscal_year: FiscalYear,
) -> Result<MonthlyTargetMap, PlanError> {
    let intersection = clamp_to_intersection(
        activity.start(),
        activity.end(),
        fiscal_year.start(),
        fiscal_year.end(),
    )
    .ok_or(PlanError::NoOverlap {
        activity,
        fiscal_year,
    })?;
    debug!(%activity, %fiscal_year, %intersection, "monthly skeleton");
    Ok(intersection.months().map(|m| (m, 0)).collect())
}

/// Whether the column for `month` of `fiscal_year` must reject input
///
/// Comparison is made month by month: an activity starting on June 15 still
/// owns the June column.
pub fn is_month_locked(month: Month, activity: DateRange, fiscal_year: FiscalYear) -> bool {
    let bucket = fiscal_year.bucket_for(month);
    let in_activity =
        MonthBucket::of(activity.start()) <= bucket && bucket <= MonthBucket::of(activity.end());
    let in_fiscal_year = fiscal_year.contains(bucket.first_day());
    !(in_activity && in_fiscal_year)
}

/// Same as `is_month_locked` for a fully qualified month
///
/// A bucket that is not one of the twelve months of `fiscal_year` is locked.
pub fn is_bucket_locked(bucket: MonthBucket, activity: DateRange, fiscal_year: FiscalYear) -> bool {
    fiscal_year.bucket_for(bucket.month()) != bucket
        || is_month_locked(bucket.month(), activity, fiscal_year)
}

/// Compare the total of an allocation against a lifetime target
pub fn validate_allocation(targets: &MonthlyTargetMap, lifetime_target: u64) -> AllocationCheck {
    let sum = targets.values().fold(0u64, |acc, v| acc.saturating_add(*v));
    AllocationCheck {
        valid: sum <= lifetime_target,
        sum,
    }
}

/// Read a monthly target typed by a user
///
/// The leading digits are the value, so `"3.5"` is 3 and `"12 kits"` is 12.
/// Blank input, negative numbers and text without leading digits are 0.
/// Values too large for a `u64` saturate.
pub fn coerce_target(raw: &str) -> u64 {
    let raw = raw.trim();
    let digits = raw
        .find(|c: char| !c.is_ascii_digit())
        .map(|end| &raw[..end])
        .unwrap_or(raw);
    if digits.len() != raw.len() {
        debug!(raw, "non-integer target truncated to its leading digits");
    }
    if digits.is_empty() {
        return 0;
    }
    // only digits left: overflow is the one failure
    digits.parse::<u64>().unwrap_or(u64::MAX)
}
