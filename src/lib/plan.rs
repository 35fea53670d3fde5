//! Projects, activities and their per-fiscal-year allocations

use serde::Serialize;
use std::collections::BTreeMap;

use crate::lib::{
    allocation::{
        build_monthly_target_skeleton, coerce_target, validate_allocation, AllocationCheck,
        MonthlyTargetMap,
    },
    error::PlanError,
    fiscal::{fiscal_years_between, FiscalYear},
    month::MonthBucket,
    progress::ActivityProgress,
    range::DateRange,
};

#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub range: DateRange,
}

impl Project {
    /// Fiscal years a plan can be drawn up for
    pub fn fiscal_years(&self) -> Vec<FiscalYear> {
        fiscal_years_between(self.range.start(), self.range.end())
    }
}

/// Geographic unit (village, block, district, ...) that activities are carried out in
#[derive(Debug, Clone)]
pub struct InterventionArea {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub range: DateRange,
    /// life-of-project target, in `unit_of_measure`
    pub lifetime_target: u64,
    pub unit_of_measure: String,
}

impl Activity {
    /// Whether this activity can appear in a plan for `fiscal_year`
    pub fn applies_to(&self, fiscal_year: FiscalYear) -> bool {
        self.range.overlaps(&fiscal_year.range())
    }
}

/// Monthly targets of one activity, in one fiscal year, for one intervention area
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanAllocation {
    activity_id: String,
    fiscal_year: FiscalYear,
    start_month: MonthBucket,
    end_month: MonthBucket,
    intervention_area_id: String,
    monthly_targets: MonthlyTargetMap,
}

impl PlanAllocation {
    /// Empty allocation, every editable month set to 0
    pub fn new(
        activity: &Activity,
        fiscal_year: FiscalYear,
        intervention_area_id: &str,
    ) -> Result<Self, PlanError> {
        let monthly_targets = build_monthly_target_skeleton(activity.range, fiscal_year)?;
        let bounds = (
            monthly_targets.keys().next().copied(),
            monthly_targets.keys().next_back().copied(),
        );
        let (start_month, end_month) = match bounds {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(PlanError::NoOverlap {
                    activity: activity.range,
                    fiscal_year,
                })
            }
        };
        Ok(Self {
            activity_id: activity.id.clone(),
            fiscal_year,
            start_month,
            end_month,
            intervention_area_id: intervention_area_id.to_string(),
            monthly_targets,
        })
    }

    pub fn activity_id(&self) -> &str {
        &self.activity_id
    }

    pub fn fiscal_year(&self) -> FiscalYear {
        self.fiscal_year
    }

    pub fn intervention_area_id(&self) -> &str {
        &self.intervention_area_id
    }

    /// First and last editable month
    pub fn window(&self) -> (MonthBucket, MonthBucket) {
        (self.start_month, self.end_month)
    }

    pub fn monthly_targets(&self) -> &MonthlyTargetMap {
        &self.monthly_targets
    }

    pub fn target(&self, month: MonthBucket) -> Option<u64> {
        self.monthly_targets.get(&month).copied()
    }

    /// Fails without modification when `month` is locked
    pub fn set_target(&mut self, month: MonthBucket, value: u64) -> Result<(), PlanError> {
        match self.monthly_targets.get_mut(&month) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(PlanError::LockedMonth(month)),
        }
    }

    /// `set_target` for raw user input, see `coerce_target`
    pub fn set_raw(&mut self, month: MonthBucket, raw: &str) -> Result<(), PlanError> {
        self.set_target(month, coerce_target(raw))
    }

    pub fn check(&self, lifetime_target: u64) -> AllocationCheck {
        validate_allocation(&self.monthly_targets, lifetime_target)
    }
}

/// Everything known about one project: the result of loading a plan file
#[derive(Debug, Clone)]
pub struct Book {
    pub project: Project,
    pub areas: Vec<InterventionArea>,
    pub activities: Vec<Activity>,
    pub plans: Vec<PlanAllocation>,
    /// units reported so far, per activity id
    pub reports: BTreeMap<String, MonthlyTargetMap>,
}

impl Book {
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }

    pub fn area(&self, id: &str) -> Option<&InterventionArea> {
        self.areas.iter().find(|a| a.id == id)
    }

    pub fn plans_for<'b>(&'b self, activity_id: &'b str) -> impl Iterator<Item = &'b PlanAllocation> {
        self.plans.iter().filter(move |p| p.activity_id == activity_id)
    }

    /// Fiscal years that have at least one plan, ascending
    pub fn plan_years(&self) -> Vec<FiscalYear> {
        let mut years = self.plans.iter().map(|p| p.fiscal_year).collect::<Vec<_>>();
        years.sort();
        years.dedup();
        years
    }

    /// Each allocation checked against the lifetime target of its activity
    pub fn checks(&self) -> Vec<(&PlanAllocation, AllocationCheck)> {
        self.plans
            .iter()
            .filter_map(|p| {
                let activity = self.activity(&p.activity_id)?;
                Some((p, p.check(activity.lifetime_target)))
            })
            .collect()
    }

    /// No allocation exceeds its lifetime target
    pub fn is_submittable(&self) -> bool {
        self.checks().iter().all(|(_, check)| check.valid)
    }

    /// Plan-vs-progress summary of every activity as of `as_of`
    pub fn progress(&self, as_of: MonthBucket) -> Vec<ActivityProgress> {
        self.activities
            .iter()
            .map(|activity| self.summarize(activity, self.plans_for(&activity.id), as_of))
            .collect()
    }

    /// Same as `progress` with only the plans of one intervention area
    ///
    /// Activities that have no plan in `area_id` are left out.
    /// Reports are not split by area and count in full.
    pub fn progress_in_area(&self, as_of: MonthBucket, area_id: &str) -> Vec<ActivityProgress> {
        self.activities
            .iter()
            .filter_map(|activity| {
                let mut plans = self
                    .plans_for(&activity.id)
                    .filter(|p| p.intervention_area_id == area_id)
                    .peekable();
                plans.peek()?;
                Some(self.summarize(activity, plans, as_of))
            })
            .collect()
    }

    fn summarize<'b, I>(&'b self, activity: &Activity, plans: I, as_of: MonthBucket) -> ActivityProgress
    where
        I: Iterator<Item = &'b PlanAllocation>,
    {
        let empty = MonthlyTargetMap::new();
        let reports = self.reports.get(&activity.id).unwrap_or(&empty);
        ActivityProgress::compute(activity, plans, reports, as_of)
    }
}
