//! Plan-vs-progress aggregation and RAG (red/amber/green/gray) rating

use std::fmt;
use std::ops;
use std::str::FromStr;

use crate::lib::{
    allocation::MonthlyTargetMap,
    fiscal::FiscalYear,
    month::{MonthBucket, Months},
    plan::{Activity, PlanAllocation},
};

/// Traffic-light rating of progress against target
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RagStatus {
    Red,
    Amber,
    Green,
    /// no target or nothing reported
    Gray,
}

impl RagStatus {
    pub const ALL: [RagStatus; 4] = [RagStatus::Red, RagStatus::Amber, RagStatus::Green, RagStatus::Gray];
}

impl fmt::Display for RagStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RagStatus::Red => "red",
            RagStatus::Amber => "amber",
            RagStatus::Green => "green",
            RagStatus::Gray => "gray",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for RagStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(RagStatus::Red),
            "amber" => Ok(RagStatus::Amber),
            "green" => Ok(RagStatus::Green),
            "gray" | "grey" => Ok(RagStatus::Gray),
            _ => Err(()),
        }
    }
}

/// Rate `progress` against `target`
///
/// Red below a quarter of the target, amber from a quarter up to
/// three quarters (excluded), green from three quarters on.
pub fn rag_status(progress: u64, target: u64) -> RagStatus {
    if target == 0 || progress == 0 {
        return RagStatus::Gray;
    }
    // ratio compared exactly: progress / target >= n / 4
    let quarters = progress as u128 * 4;
    let target = target as u128;
    if quarters >= 3 * target {
        RagStatus::Green
    } else if quarters >= target {
        RagStatus::Amber
    } else {
        RagStatus::Red
    }
}

/// Summary of one activity: plans registered so far against reported units
#[derive(Debug, Clone)]
pub struct ActivityProgress {
    activity_id: String,
    activity_name: String,
    unit_of_measure: String,
    /// first month of the fiscal year containing `as_of`
    year_start: MonthBucket,
    as_of: MonthBucket,
    annual_target: u64,
    planned: u64,
    ytd_plan: u64,
    ytd_progress: u64,
}

impl ActivityProgress {
    /// Nothing planned or reported yet
    pub fn new(activity: &Activity, as_of: MonthBucket) -> Self {
        Self {
            activity_id: activity.id.clone(),
            activity_name: activity.name.clone(),
            unit_of_measure: activity.unit_of_measure.clone(),
            year_start: MonthBucket::of(FiscalYear::for_date(as_of.first_day()).start()),
            as_of,
            annual_target: activity.lifetime_target,
            planned: 0,
            ytd_plan: 0,
            ytd_progress: 0,
        }
    }

    /// Summary of `activity` from all its plans and reports
    pub fn compute<'p, I>(activity: &Activity, plans: I, reports: &MonthlyTargetMap, as_of: MonthBucket) -> Self
    where
        I: IntoIterator<Item = &'p PlanAllocation>,
    {
        let mut summary = Self::new(activity, as_of);
        for plan in plans {
            summary += plan;
        }
        summary.record(reports);
        summary
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    pub fn activity_name(&self) -> &str {
        &self.activity_name
    }

    pub fn unit_of_measure(&self) -> &str {
        &self.unit_of_measure
    }

    /// Sum of all monthly targets of all plans, or the activity target if nothing is planned
    pub fn life_of_project_target(&self) -> u64 {
        if self.planned == 0 {
            self.annual_target
        } else {
            self.planned
        }
    }

    pub fn annual_target(&self) -> u64 {
        self.annual_target
    }

    /// From the start of the fiscal year up to and including `as_of`
    fn in_year_to_date(&self, month: MonthBucket) -> bool {
        self.year_start <= month && month <= self.as_of
    }

    /// Planned in the current fiscal year, up to and including the `as_of` month
    pub fn ytd_plan(&self) -> u64 {
        self.ytd_plan
    }

    pub fn ytd_progress(&self) -> u64 {
        self.ytd_progress
    }

    /// Progress as a fraction of the life-of-project target
    pub fn completion(&self) -> Option<f64> {
        match self.life_of_project_target() {
            0 => None,
            target => Some(self.ytd_progress as f64 / target as f64),
        }
    }

    pub fn rag(&self) -> RagStatus {
        rag_status(self.ytd_progress, self.life_of_project_target())
    }

    /// Add reported units of the current fiscal year up to `as_of`
    pub fn record(&mut self, reports: &MonthlyTargetMap) {
        for (month, units) in reports {
            if self.in_year_to_date(*month) {
                self.ytd_progress = self.ytd_progress.saturating_add(*units);
            }
        }
    }
}

impl ops::AddAssign<&PlanAllocation> for ActivityProgress {
    fn add_assign(&mut self, plan: &PlanAllocation) {
        if plan.activity_id() != self.activity_id {
            return;
        }
        for (month, target) in plan.monthly_targets() {
            self.planned = self.planned.saturating_add(*target);
            if self.in_year_to_date(*month) {
                self.ytd_plan = self.ytd_plan.saturating_add(*target);
            }
        }
    }
}

/// Planned and reported units of one month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthTotals {
    pub month: MonthBucket,
    pub planned: u64,
    pub reported: u64,
}

/// Month-by-month totals over `months`, all activities together
pub fn monthly_totals<'p, I>(months: Months, plans: I, reports: &[&MonthlyTargetMap]) -> Vec<MonthTotals>
where
    I: IntoIterator<Item = &'p PlanAllocation> + Clone,
{
    months
        .map(|month| MonthTotals {
            month,
            planned: plans
                .clone()
                .into_iter()
                .filter_map(|p| p.target(month))
                .fold(0u64, |a, b| a.saturating_add(b)),
            reported: reports
                .iter()
                .filter_map(|r| r.get(&month))
                .fold(0u64, |a, b| a.saturating_add(*b)),
        })
        .collect()
}

#[cfg(test)]
#[rustfmt::skip]
mod test {
    use super::*;
    use crate::lib::{date::Date, fiscal::FiscalYear, month::months_between, plan::test::activity};
    use RagStatus::*;

    macro_rules! mk {
        ( $s:expr ) => { $s.parse::<MonthBucket>().unwrap() }
    }

    #[test]
    fn rag_thresholds() {
        assert_eq!(rag_status(0, 100), Gray);
        assert_eq!(rag_status(10, 0), Gray);
        assert_eq!(rag_status(24, 100), Red);
        assert_eq!(rag_status(25, 100), Amber);
        assert_eq!(rag_status(74, 100), Amber);
        assert_eq!(rag_status(75, 100), Green);
        assert_eq!(rag_status(150, 100), Green);
        assert_eq!(rag_status(1, 3), Amber);
        assert_eq!(rag_status(u64::MAX, u64::MAX), Green);
    }

    #[test]
    fn rag_names() {
        for status in RagStatus::ALL {
            assert_eq!(status.to_string().parse::<RagStatus>(), Ok(status));
        }
        assert_eq!("GREY".parse::<RagStatus>(), Ok(Gray));
        assert!("blue".parse::<RagStatus>().is_err());
    }

    #[test]
    fn summary_of_plans_and_reports() {
        let a = activity("a", "2025-06-01", "2027-02-28", 200);
        let mut p1 = PlanAllocation::new(&a, FiscalYear::for_start_year(2025), "v").unwrap();
        p1.set_target(mk!("2025-06"), 20).unwrap();
        p1.set_target(mk!("2026-01"), 30).unwrap();
        let mut p2 = PlanAllocation::new(&a, FiscalYear::for_start_year(2026), "v").unwrap();
        p2.set_target(mk!("2026-05"), 50).unwrap();
        let other = activity("b", "2025-06-01", "2026-02-28", 5);
        let mut foreign = PlanAllocation::new(&other, FiscalYear::for_start_year(2025), "v").unwrap();
        foreign.set_target(mk!("2025-06"), 5).unwrap();

        let mut summary = ActivityProgress::new(&a, mk!("2026-01"));
        summary += &p1;
        summary += &p2;
        summary += &foreign;
        let mut reports = MonthlyTargetMap::new();
        reports.insert(mk!("2025-06"), 18);
        reports.insert(mk!("2025-12"), 7);
        summary.record(&reports);

        assert_eq!(summary.life_of_project_target(), 100);
        assert_eq!(summary.annual_target(), 200);
        assert_eq!(summary.ytd_plan(), 50);
        assert_eq!(summary.ytd_progress(), 25);
        assert_eq!(summary.completion(), Some(0.25));
        assert_eq!(summary.rag(), Amber);
    }

    #[test]
    fn unplanned_activity_falls_back_to_its_target() {
        let a = activity("a", "2025-06-01", "2026-02-28", 40);
        let mut summary = ActivityProgress::new(&a, mk!("2025-09"));
        let mut reports = MonthlyTargetMap::new();
        reports.insert(mk!("2025-07"), 30);
        summary.record(&reports);
        assert_eq!(summary.life_of_project_target(), 40);
        assert_eq!(summary.rag(), Green);
        assert_eq!(ActivityProgress::new(&activity("z", "2025-06-01", "2025-06-01", 0), mk!("2025-06")).completion(), None);
    }

    #[test]
    fn year_to_date_window() {
        let a = activity("a", "2024-04-01", "2027-03-31", 100);
        let mut reports = MonthlyTargetMap::new();
        reports.insert(mk!("2025-03"), 40);
        reports.insert(mk!("2025-05"), 10);
        reports.insert(mk!("2026-11"), 70);
        let mut earlier = PlanAllocation::new(&a, FiscalYear::for_start_year(2024), "v").unwrap();
        earlier.set_target(mk!("2024-12"), 30).unwrap();
        let mut current = PlanAllocation::new(&a, FiscalYear::for_start_year(2025), "v").unwrap();
        current.set_target(mk!("2025-04"), 5).unwrap();
        current.set_target(mk!("2025-09"), 15).unwrap();

        let summary = ActivityProgress::compute(&a, [&earlier, &current], &reports, mk!("2025-06"));
        assert_eq!(summary.ytd_progress(), 10);
        assert_eq!(summary.ytd_plan(), 5);
        assert_eq!(summary.life_of_project_target(), 50);
        assert_eq!(summary.rag(), Red);

        // April opens a new fiscal year
        let summary = ActivityProgress::compute(&a, [&earlier, &current], &reports, mk!("2025-04"));
        assert_eq!(summary.ytd_progress(), 0);
        assert_eq!(summary.rag(), Gray);
    }

    #[test]
    fn totals_per_month() {
        let a = activity("a", "2025-06-01", "2025-08-31", 100);
        let mut plan = PlanAllocation::new(&a, FiscalYear::for_start_year(2025), "v").unwrap();
        plan.set_target(mk!("2025-07"), 9).unwrap();
        let mut reports = MonthlyTargetMap::new();
        reports.insert(mk!("2025-07"), 4);
        let plans = vec![plan];
        let totals = monthly_totals(
            months_between("2025-06-01".parse::<Date>().unwrap(), "2025-08-01".parse::<Date>().unwrap()),
            &plans,
            &[&reports],
        );
        assert_eq!(totals.len(), 3);
        assert_eq!(totals[1], MonthTotals { month: mk!("2025-07"), planned: 9, reported: 4 });
        assert_eq!(totals[2].planned, 0);
    }
}
