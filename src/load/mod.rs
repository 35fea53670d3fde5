//! Read a plan file and assemble its declarations into a `Book`
//!
//! Parsing is done in `parse`, this module resolves references between
//! declarations: plans and progress reports name their activity and area
//! by identifier, in any order.

pub mod error;
pub mod parse;
pub mod seed;

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::lib::{
    allocation::MonthlyTargetMap,
    fiscal::FiscalYear,
    month::MonthBucket,
    plan::{Activity, Book, InterventionArea, PlanAllocation, Project},
};
use parse::{Ast, AstItem, PlanDecl, ProgressDecl};

/// Read and check `filename`
///
/// All problems are recorded in `errs`, `None` is returned if any of them is fatal.
pub fn read_plan(filename: &str, errs: &mut error::Record) -> Option<Book> {
    let contents = match std::fs::read_to_string(filename) {
        Ok(contents) => contents,
        Err(e) => {
            errs.make("File not found")
                .text(format!("Plan file loaded is '{}'", filename))
                .text(e)
                .hint("check the path of the plan file");
            return None;
        }
    };
    let book = load(filename, errs, &contents);
    if errs.is_fatal() {
        return None;
    }
    if let Some(book) = &book {
        info!(
            file = filename,
            activities = book.activities.len(),
            plans = book.plans.len(),
            "plan file loaded"
        );
    }
    book
}

/// Build a book from the contents of a plan file
///
/// As with `parse::extract`, success is determined by querying `errs`.
pub fn load(path: &str, errs: &mut error::Record, contents: &str) -> Option<Book> {
    let ast = parse::extract(path, errs, contents);
    assemble(errs, ast)
}

type Declared<'i, T> = Vec<(T, error::Loc<'i>)>;

fn assemble(errs: &mut error::Record, ast: Ast) -> Option<Book> {
    let mut project: Option<(Project, error::Loc)> = None;
    let mut areas: Declared<InterventionArea> = Vec::new();
    let mut activities: Declared<Activity> = Vec::new();
    let mut plans = Vec::new();
    let mut progress = Vec::new();
    for item in ast {
        match item {
            AstItem::Project(p, loc) => {
                if let Some((_, first)) = &project {
                    errs.make("Duplicate project")
                        .span(&loc, "second declaration")
                        .span(first, "first declared here")
                        .hint("keep a single project per file");
                    continue;
                }
                project = Some((p, loc));
            }
            AstItem::Area(area, loc) => {
                if let Some((_, first)) = areas.iter().find(|(a, _)| a.id == area.id) {
                    errs.make("Duplicate intervention area")
                        .span(&loc, format!("'{}' declared again", area.id))
                        .span(first, "first declared here")
                        .hint("rename one of the areas");
                    continue;
                }
                areas.push((area, loc));
            }
            AstItem::Activity(activity, loc) => {
                if let Some((_, first)) = activities.iter().find(|(a, _)| a.id == activity.id) {
                    errs.make("Duplicate activity")
                        .span(&loc, format!("'{}' declared again", activity.id))
                        .span(first, "first declared here")
                        .hint("rename one of the activities");
                    continue;
                }
                activities.push((activity, loc));
            }
            AstItem::Plan(decl) => plans.push(decl),
            AstItem::Progress(decl) => progress.push(decl),
        }
    }
    let (project, _) = match project {
        Some(project) => project,
        None => {
            errs.make("Missing project")
                .text("A plan file must declare the project it belongs to")
                .hint("add 'project \"Name\" 2025-04-01..2028-03-31;'");
            return None;
        }
    };
    for (activity, loc) in &activities {
        let range = project.range;
        if !(range.contains(activity.range.start()) && range.contains(activity.range.end())) {
            errs.make("Activity outside of project")
                .nonfatal()
                .span(loc, format!("runs over {}", activity.range))
                .text(format!("Project '{}' runs over {}", project.name, range))
                .hint("check the span of the activity");
        }
    }
    let plans = resolve_plans(errs, &project, &areas, &activities, plans);
    let reports = resolve_progress(errs, &activities, progress);
    Some(Book {
        project,
        areas: areas.into_iter().map(|(a, _)| a).collect(),
        activities: activities.into_iter().map(|(a, _)| a).collect(),
        plans,
        reports,
    })
}

/// Turn each plan declaration into an allocation
///
/// Plans that refer to something unknown, that duplicate an earlier plan or
/// whose activity does not overlap the fiscal year are reported and dropped.
/// Values for locked months are reported and ignored.
fn resolve_plans<'i>(
    errs: &mut error::Record,
    project: &Project,
    areas: &Declared<'i, InterventionArea>,
    activities: &Declared<'i, Activity>,
    decls: Vec<PlanDecl<'i>>,
) -> Vec<PlanAllocation> {
    let project_years = project.fiscal_years();
    let mut allocations = Vec::new();
    let mut seen: Vec<(&str, FiscalYear, &str, error::Loc)> = Vec::new();
    for decl in &decls {
        let (activity, activity_loc) = match activities.iter().find(|(a, _)| a.id == decl.activity) {
            Some(found) => found,
            None => {
                errs.make("Unknown activity")
                    .span(&decl.loc, format!("plan refers to '{}'", decl.activity))
                    .text("No activity is declared with this identifier")
                    .hint("declare the activity or check the spelling");
                continue;
            }
        };
        if !areas.iter().any(|(a, _)| a.id == decl.area) {
            errs.make("Unknown intervention area")
                .span(&decl.loc, format!("plan refers to '{}'", decl.area))
                .text("No area is declared with this identifier")
                .hint(format!("add 'area {} \"Label\";'", decl.area));
            continue;
        }
        let duplicate = seen.iter().find(|(activity, fy, area, _)| {
            *activity == decl.activity && *fy == decl.fiscal_year && *area == decl.area
        });
        if let Some((_, _, _, first)) = duplicate {
            errs.make("Duplicate plan")
                .span(&decl.loc, "second plan")
                .span(first, "first plan here")
                .text(format!(
                    "'{}' already has a plan for {} in '{}'",
                    decl.activity, decl.fiscal_year, decl.area
                ))
                .hint("merge the two plans");
            continue;
        }
        if !project_years.contains(&decl.fiscal_year) {
            errs.make("Fiscal year outside of project")
                .nonfatal()
                .span(&decl.loc, format!("plan for {}", decl.fiscal_year))
                .text(format!("Project '{}' runs over {}", project.name, project.range));
        }
        let mut allocation = match PlanAllocation::new(activity, decl.fiscal_year, decl.area) {
            Ok(allocation) => allocation,
            Err(e) => {
                errs.make("Activity outside of fiscal year")
                    .span(&decl.loc, "plan dropped")
                    .text(e)
                    .span(activity_loc, format!("activity runs over {}", activity.range))
                    .hint(format!("{} runs over {}", decl.fiscal_year, decl.fiscal_year.range()));
                continue;
            }
        };
        seen.push((decl.activity, decl.fiscal_year, decl.area, decl.loc.clone()));
        let mut filled: Vec<(MonthBucket, &error::Loc)> = Vec::new();
        for entry in &decl.entries {
            if let Some((_, first)) = filled.iter().find(|(m, _)| *m == entry.month) {
                errs.make("Duplicate month")
                    .span(&entry.loc, format!("{} set again", entry.month))
                    .span(first, "first set here")
                    .hint("keep a single value per month");
                continue;
            }
            match allocation.set_target(entry.month, entry.value) {
                Ok(()) => filled.push((entry.month, &entry.loc)),
                Err(e) => {
                    let (start, end) = allocation.window();
                    errs.make("Month outside of activity")
                        .nonfatal()
                        .span(&entry.loc, "value ignored")
                        .text(e)
                        .text(format!("Plan for '{}' only covers {} to {}", activity.id, start, end))
                        .hint("remove the entry or extend the activity span");
                }
            }
        }
        debug!(activity = decl.activity, fiscal_year = %decl.fiscal_year, area = decl.area, "plan resolved");
        allocations.push(allocation);
    }
    allocations
}

/// Gather reported units per activity
fn resolve_progress<'i>(
    errs: &mut error::Record,
    activities: &Declared<'i, Activity>,
    decls: Vec<ProgressDecl<'i>>,
) -> BTreeMap<String, MonthlyTargetMap> {
    let mut reports = BTreeMap::<String, MonthlyTargetMap>::new();
    let mut seen: Vec<(&str, MonthBucket, &error::Loc)> = Vec::new();
    for decl in &decls {
        if !activities.iter().any(|(a, _)| a.id == decl.activity) {
            errs.make("Unknown activity")
                .span(&decl.loc, format!("progress refers to '{}'", decl.activity))
                .text("No activity is declared with this identifier")
                .hint("declare the activity or check the spelling");
            continue;
        }
        let report = reports.entry(decl.activity.to_string()).or_default();
        for entry in &decl.entries {
            let duplicate = seen
                .iter()
                .find(|(activity, month, _)| *activity == decl.activity && *month == entry.month);
            if let Some((_, _, first)) = duplicate {
                errs.make("Duplicate month")
                    .span(&entry.loc, format!("{} reported again", entry.month))
                    .span(first, "first reported here")
                    .hint("keep a single value per month");
                continue;
            }
            seen.push((decl.activity, entry.month, &entry.loc));
            report.insert(entry.month, entry.value);
        }
    }
    reports
}

#[cfg(test)]
#[rustfmt::skip]
mod test {
    use super::*;

    const HEADER: &str = r#"
        project "Clean Water" 2024-06-01..2027-03-31;
        area village-12 "Village 12";
        area block-a "Block A";
        activity hygiene "Hygiene sessions" {
            span 2025-06-01..2026-02-28;
            target 100 "sessions";
        }
    "#;

    fn book(body: &str) -> (Option<Book>, error::Record) {
        let contents = format!("{}{}", HEADER, body);
        let mut errs = error::Record::new();
        let book = load("test.mel", &mut errs, &contents);
        (book, errs)
    }

    macro_rules! mk {
        ( $s:expr ) => { $s.parse::<MonthBucket>().unwrap() }
    }

    #[test]
    fn complete_file() {
        let (book, errs) = book(r#"
            plan hygiene FY 2025-26 @ village-12 {
                2025-06: 60;
                2025-07: 30;
            }
            plan hygiene FY 2025-26 @ block-a { 2025-08: 5; }
            progress hygiene { 2025-06: 50; }
        "#);
        assert_eq!(errs.count_errors(), 0);
        assert_eq!(errs.count_warnings(), 0);
        let book = book.unwrap();
        assert_eq!(book.plans.len(), 2);
        assert_eq!(book.plans[0].target(mk!("2025-07")), Some(30));
        assert_eq!(book.plans[0].monthly_targets().len(), 9);
        assert_eq!(book.reports["hygiene"][&mk!("2025-06")], 50);
        assert!(book.is_submittable());
    }

    #[test]
    fn locked_months_are_ignored() {
        let (book, errs) = book("plan hygiene FY 2025-26 @ village-12 { 2025-05: 12; 2026-03: 1; 2025-06: 4; }");
        assert!(!errs.is_fatal());
        assert_eq!(errs.count_warnings(), 2);
        let book = book.unwrap();
        assert_eq!(book.plans[0].monthly_targets().values().sum::<u64>(), 4);
        assert_eq!(book.plans[0].target(mk!("2025-05")), None);
    }

    #[test]
    fn plan_without_overlap_is_dropped() {
        let (book, errs) = book("plan hygiene FY 2026-27 @ village-12 { 2026-04: 1; }");
        assert_eq!(errs.count_errors(), 1);
        assert!(book.unwrap().plans.is_empty());
    }

    #[test]
    fn unresolved_references() {
        let (_, errs) = book("plan hygeine FY 2025-26 @ village-12 {}");
        assert_eq!(errs.count_errors(), 1);
        let (_, errs) = book("plan hygiene FY 2025-26 @ village-13 {}");
        assert_eq!(errs.count_errors(), 1);
        let (_, errs) = book("progress sanitation { 2025-06: 1; }");
        assert_eq!(errs.count_errors(), 1);
    }

    #[test]
    fn duplicates() {
        let (book, errs) = book(r#"
            plan hygiene FY 2025-26 @ village-12 { 2025-06: 1; 2025-06: 2; }
            plan hygiene 2025-2026 @ village-12 {}
            progress hygiene { 2025-06: 1; }
            progress hygiene { 2025-06: 1; }
            area village-12 "again";
        "#);
        assert_eq!(errs.count_errors(), 4);
        let book = book.unwrap();
        assert_eq!(book.plans.len(), 1);
        assert_eq!(book.plans[0].target(mk!("2025-06")), Some(1));
    }

    #[test]
    fn fiscal_year_outside_project() {
        let contents = r#"
            project "Short" 2025-04-01..2026-03-31;
            area v "V";
            activity a "A" { span 2025-01-01..2026-06-30; target 10 "kits"; }
            plan a FY 2026-27 @ v { 2026-04: 3; }
        "#;
        let mut errs = error::Record::new();
        let book = load("test.mel", &mut errs, contents).unwrap();
        assert!(!errs.is_fatal());
        // activity overflows the project, plan year is outside of it
        assert_eq!(errs.count_warnings(), 2);
        assert_eq!(book.plans.len(), 1);
    }

    #[test]
    fn demo_file() {
        let mut errs = error::Record::new();
        let book = load("clean-water.mel", &mut errs, include_str!("../../demos/clean-water.mel")).unwrap();
        assert_eq!(errs.count_errors(), 0);
        assert_eq!(errs.count_warnings(), 0);
        assert_eq!(book.plans.len(), 5);
        assert_eq!(book.plan_years().len(), 3);
        assert!(book.is_submittable());
        let progress = book.progress(mk!("2025-08"));
        assert_eq!(progress[0].ytd_plan(), 40);
        assert_eq!(progress[0].ytd_progress(), 31);
    }

    #[test]
    fn missing_project() {
        let mut errs = error::Record::new();
        assert!(load("test.mel", &mut errs, "area v \"V\";").is_none());
        assert!(errs.is_fatal());
    }

    #[test]
    fn missing_file() {
        let mut errs = error::Record::new();
        assert!(read_plan("/nonexistent/plan.mel", &mut errs).is_none());
        assert_eq!(errs.count_errors(), 1);
    }
}
