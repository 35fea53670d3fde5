//! Convert the contents of a plan file into a stream of AST items
//! (project, areas, activities, plans and progress reports)

#![allow(clippy::upper_case_acronyms)]

use pest::Parser;
use pest_derive::*;

/// Wrapper around Pest's `Pair`
type Pair<'i> = pest::iterators::Pair<'i, Rule>;
/// Wrapper around Pest's `Pairs`
type Pairs<'i> = pest::iterators::Pairs<'i, Rule>;

use crate::lib::{
    allocation::coerce_target,
    date::Date,
    fiscal::FiscalYear,
    month::MonthBucket,
    plan::{Activity, InterventionArea, Project},
    range::DateRange,
};
use crate::load::error;

/// Pest-generated parser
#[derive(Parser)]
#[grammar = "load/mel.pest"]
pub struct MelParser;

/// All declarations of a file, in order of appearance
pub type Ast<'i> = Vec<AstItem<'i>>;

/// Each declaration of the file
#[derive(Debug)]
pub enum AstItem<'i> {
    Project(Project, error::Loc<'i>),
    Area(InterventionArea, error::Loc<'i>),
    Activity(Activity, error::Loc<'i>),
    Plan(PlanDecl<'i>),
    Progress(ProgressDecl<'i>),
}

/// `YYYY-MM: value;`, value already coerced
#[derive(Debug)]
pub struct MonthEntry<'i> {
    pub month: MonthBucket,
    pub value: u64,
    pub loc: error::Loc<'i>,
}

/// Monthly targets as written, not yet checked against the activity
#[derive(Debug)]
pub struct PlanDecl<'i> {
    pub activity: &'i str,
    pub fiscal_year: FiscalYear,
    pub area: &'i str,
    pub entries: Vec<MonthEntry<'i>>,
    pub loc: error::Loc<'i>,
}

/// Units reported for an activity
#[derive(Debug)]
pub struct ProgressDecl<'i> {
    pub activity: &'i str,
    pub entries: Vec<MonthEntry<'i>>,
    pub loc: error::Loc<'i>,
}

struct Once<'i, T> {
    name: &'i str,
    hint: &'i str,
    loc: &'i error::Loc<'i>,
    valid: bool,
    data: Option<T>,
}

impl<'i, T> Once<'i, T> {
    fn new(name: &'i str, hint: &'i str, loc: &'i error::Loc) -> Self {
        Self {
            name,
            hint,
            loc,
            valid: true,
            data: None,
        }
    }

    fn try_set(&mut self, val: T, errs: &mut error::Record) {
        if self.data.is_some() {
            errs.make("Duplicate field definition")
                .span(self.loc, format!("attempt to override {}", self.name))
                .text("Each field may only be defined once")
                .hint("remove one of the field definitions");
            self.valid = false;
        }
        self.data = Some(val);
    }

    /// A field that failed validation has already been reported
    fn invalidate(&mut self) {
        self.valid = false;
    }

    fn try_get(self, errs: &mut error::Record) -> Option<T> {
        if self.valid {
            if self.data.is_none() {
                errs.make("Missing field definition")
                    .span(self.loc, format!("'{}' may not be omitted", self.name))
                    .text("Each field must be defined once")
                    .hint(format!(
                        "add definition for the missing field: '{} {}'",
                        self.name, self.hint
                    ));
                None
            } else {
                self.data
            }
        } else {
            None
        }
    }
}

/// Get the declarations of file `path`
///
/// The return value may be non-empty even if some errors (including fatal ones) occured:
/// it contains all items that were validated.
///
/// Caller should determine the success of this function not through its return value
/// but by querying `errs` (e.g. by checking `errs.is_fatal()` or `errs.count_errors()`)
pub fn extract<'i>(path: &'i str, errs: &mut error::Record, contents: &'i str) -> Ast<'i> {
    match MelParser::parse(Rule::program, contents) {
        Ok(contents) => validate(path, errs, contents),
        Err(e) => {
            errs.make("Parsing failure").syntax(e.with_path(path));
            Vec::new()
        }
    }
}

// extract contents of wrapper rule
macro_rules! subrule {
    ( $node:expr ) => {{
        let mut items = $node.into_inner().into_iter();
        let fst = items.next().unwrap_or_else(|| panic!("No subrule"));
        if items.next().is_some() {
            panic!("Several subrules");
        }
        fst
    }};
}

// get first and rest of inner
macro_rules! decapitate {
    ( $node:expr ) => {{
        let mut items = $node.into_inner().into_iter();
        let fst = items.next().unwrap_or_else(|| panic!("No head"));
        (fst, items)
    }};
}

// extract two-element inner
macro_rules! pair {
    ( $node:expr ) => {{
        let mut items = $node.into_inner().into_iter();
        let fst = items.next().unwrap_or_else(|| panic!("No 1st"));
        let snd = items.next().unwrap_or_else(|| panic!("No 2nd"));
        assert!(items.next().is_none());
        (fst, snd)
    }};
}

/// Check all items
///
/// Sequentially validates each declaration, records errors, accumulates the
/// correct ones into the return value.
pub fn validate<'i>(path: &'i str, errs: &mut error::Record, pairs: Pairs<'i>) -> Ast<'i> {
    let mut ast = Vec::new();
    for pair in pairs {
        let item = match pair.as_rule() {
            Rule::project_decl => validate_project(path, errs, pair),
            Rule::area_decl => Some(read_area(path, pair)),
            Rule::activity_decl => validate_activity(path, errs, pair),
            Rule::plan_decl => validate_plan(path, errs, pair),
            Rule::progress_decl => Some(validate_progress(path, errs, pair)),
            Rule::EOI => break,
            _ => unreachable!(),
        };
        if let Some(item) = item {
            ast.push(item);
        }
    }
    ast
}

/// Contents of a quoted string
///
/// Grammar ensures this cannot fail
fn read_text(pair: Pair) -> String {
    assert_eq!(pair.as_rule(), Rule::text);
    subrule!(pair).as_str().to_string()
}

/// Parse a `YYYY-MM-DD` date
///
/// Grammar only checks the shape, day and month numbers are checked here
fn validate_date(path: &str, errs: &mut error::Record, pair: Pair) -> Option<Date> {
    let loc = (path, pair.as_span());
    match pair.as_str().parse::<Date>() {
        Ok(date) => Some(date),
        Err(e) => {
            errs.make("Invalid date")
                .span(&loc, "provided here")
                .text(format!("{}", e))
                .hint("choose a date that exists")
                .hint(e.fix_hint());
            None
        }
    }
}

/// Parse a `YYYY-MM` month
fn validate_month(path: &str, errs: &mut error::Record, pair: Pair) -> Option<MonthBucket> {
    let loc = (path, pair.as_span());
    match pair.as_str().parse::<MonthBucket>() {
        Ok(month) => Some(month),
        Err(e) => {
            errs.make("Invalid month")
                .span(&loc, "provided here")
                .text(format!("{}", e))
                .hint(e.fix_hint());
            None
        }
    }
}

/// Parse `start..end`, both ends included
fn validate_range(path: &str, errs: &mut error::Record, pair: Pair) -> Option<DateRange> {
    assert_eq!(pair.as_rule(), Rule::date_range);
    let loc = (path, pair.as_span());
    let (start, end) = pair!(pair);
    let start = validate_date(path, errs, start);
    let end = validate_date(path, errs, end);
    let (start, end) = (start?, end?);
    match DateRange::new(start, end) {
        Ok(range) => Some(range),
        Err(e) => {
            errs.make("Inverted range")
                .span(&loc, "provided here")
                .text(format!("{}", e))
                .hint("swap the two dates");
            None
        }
    }
}

/// Parse `project "Name" start..end;`
fn validate_project<'i>(path: &'i str, errs: &mut error::Record, pair: Pair<'i>) -> Option<AstItem<'i>> {
    let loc = (path, pair.as_span());
    let (name, range) = pair!(pair);
    let name = read_text(name);
    let range = validate_range(path, errs, range)?;
    Some(AstItem::Project(Project { name, range }, loc))
}

/// Parse `area id "Label";`
///
/// Grammar ensures this cannot fail
fn read_area<'i>(path: &'i str, pair: Pair<'i>) -> AstItem<'i> {
    let loc = (path, pair.as_span());
    let (id, label) = pair!(pair);
    AstItem::Area(
        InterventionArea {
            id: id.as_str().to_string(),
            label: read_text(label),
        },
        loc,
    )
}

/// Parse an activity and its fields
///
/// This can fail since the grammar can't ensure that there is no duplicate field
/// definition or that there is no missing field
fn validate_activity<'i>(path: &'i str, errs: &mut error::Record, pair: Pair<'i>) -> Option<AstItem<'i>> {
    let loc = (path, pair.as_span());
    let (id, mut fields) = decapitate!(pair);
    let name = fields.next().map(read_text).unwrap_or_else(|| panic!("No name"));
    let mut span = Once::new("span", "2025-04-01..2026-03-31;", &loc);
    let mut target = Once::new("target", "120 \"sessions\";", &loc);
    for field in fields {
        match field.as_rule() {
            Rule::activity_span => match validate_range(path, errs, subrule!(field)) {
                Some(range) => span.try_set(range, errs),
                None => span.invalidate(),
            },
            Rule::activity_target => {
                let field_loc = (path, field.as_span());
                let (number, unit) = pair!(field);
                match number.as_str().parse::<u64>() {
                    Ok(value) => target.try_set((value, read_text(unit)), errs),
                    Err(_) => {
                        errs.make("Target out of range")
                            .span(&field_loc, "provided here")
                            .text(format!("'{}' does not fit in 64 bits", number.as_str()))
                            .hint("use a smaller unit of measure");
                        target.invalidate();
                    }
                }
            }
            _ => unreachable!(),
        }
    }
    let span = span.try_get(errs);
    let target = target.try_get(errs);
    let (range, (lifetime_target, unit_of_measure)) = (span?, target?);
    Some(AstItem::Activity(
        Activity {
            id: id.as_str().to_string(),
            name,
            range,
            lifetime_target,
            unit_of_measure,
        },
        loc,
    ))
}

/// Parse `plan activity FY 2025-26 @ area { ... }`
fn validate_plan<'i>(path: &'i str, errs: &mut error::Record, pair: Pair<'i>) -> Option<AstItem<'i>> {
    let loc = (path, pair.as_span());
    let mut items = pair.into_inner();
    let activity = items.next().unwrap_or_else(|| panic!("No activity"));
    let label = items.next().unwrap_or_else(|| panic!("No fiscal year"));
    let area = items.next().unwrap_or_else(|| panic!("No area"));
    let label_loc = (path, label.as_span());
    let entries = validate_entries(path, errs, items);
    let fiscal_year = match label.as_str().parse::<FiscalYear>() {
        Ok(fy) => fy,
        Err(e) => {
            errs.make("Invalid fiscal year")
                .span(&label_loc, "provided here")
                .text(format!("{}", e))
                .hint("the second year must follow the first, as in FY 2025-26 or 2025-2026");
            return None;
        }
    };
    Some(AstItem::Plan(PlanDecl {
        activity: activity.as_str(),
        fiscal_year,
        area: area.as_str(),
        entries,
        loc,
    }))
}

/// Parse `progress activity { ... }`
fn validate_progress<'i>(path: &'i str, errs: &mut error::Record, pair: Pair<'i>) -> AstItem<'i> {
    let loc = (path, pair.as_span());
    let (activity, items) = decapitate!(pair);
    AstItem::Progress(ProgressDecl {
        activity: activity.as_str(),
        entries: validate_entries(path, errs, items),
        loc,
    })
}

/// Parse a sequence of `YYYY-MM: value;`
///
/// Values that are not non-negative integers count as 0 and emit a warning.
/// Entries with an invalid month are dropped.
fn validate_entries<'i>(path: &'i str, errs: &mut error::Record, pairs: Pairs<'i>) -> Vec<MonthEntry<'i>> {
    let mut entries = Vec::new();
    for pair in pairs {
        assert_eq!(pair.as_rule(), Rule::month_entry);
        let loc = (path, pair.as_span());
        let (month, raw) = pair!(pair);
        let month = match validate_month(path, errs, month) {
            Some(month) => month,
            None => continue,
        };
        let text = raw.as_str().trim();
        let value = coerce_target(text);
        if !text.is_empty() && text.parse::<u64>().is_err() {
            let raw_loc = (path, raw.as_span());
            errs.make("Non-numeric target")
                .nonfatal()
                .span(&raw_loc, "provided here")
                .text(format!("'{}' is not a non-negative integer, counted as {}", text, value))
                .hint("write a whole number of units, or leave the month blank");
        }
        entries.push(MonthEntry {
            month,
            value,
            loc,
        });
    }
    entries
}

#[cfg(test)]
#[rustfmt::skip]
mod test {
    use super::*;

    fn parse(contents: &str) -> (Vec<AstItem<'_>>, error::Record) {
        let mut errs = error::Record::new();
        let ast = extract("test.mel", &mut errs, contents);
        (ast, errs)
    }

    #[test]
    fn declarations() {
        let (ast, errs) = parse(r#"
            // header
            project "Clean Water" 2024-06-01..2027-03-31;
            area village-12 "Village 12";
            activity hygiene "Hygiene sessions" {
                target 120 "sessions";
                span 2025-06-01 .. 2026-02-28;
            }
            plan hygiene FY 2025-26 @ village-12 {
                2025-06: 10;
                2025-07: ;
            }
            progress hygiene { 2025-06: 8; }
        "#);
        assert_eq!(errs.count_errors(), 0);
        assert_eq!(errs.count_warnings(), 0);
        assert_eq!(ast.len(), 5);
        match &ast[2] {
            AstItem::Activity(a, _) => {
                assert_eq!(a.id, "hygiene");
                assert_eq!(a.lifetime_target, 120);
                assert_eq!(&a.unit_of_measure, "sessions");
                assert_eq!(a.range.to_string(), "2025-06-01..2026-02-28");
            }
            other => panic!("{:?}", other),
        }
        match &ast[3] {
            AstItem::Plan(plan) => {
                assert_eq!(plan.fiscal_year, FiscalYear::for_start_year(2025));
                assert_eq!(plan.area, "village-12");
                assert_eq!(plan.entries.iter().map(|e| e.value).collect::<Vec<_>>(), vec![10, 0]);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn fiscal_year_spellings() {
        let (ast, errs) = parse("plan a 2025-2026 @ v {} plan a 2025-26 @ v {} plan a FY 2025-27 @ v {}");
        assert_eq!(ast.len(), 2);
        assert_eq!(errs.count_errors(), 1);
    }

    #[test]
    fn non_numeric_values_warn() {
        let (ast, errs) = parse("progress a { 2025-06: 3.5; 2025-07: abc; 2025-08: 4; 2025-09: 12 kits; 2025-10: ; }");
        assert!(!errs.is_fatal());
        assert_eq!(errs.count_warnings(), 3);
        match &ast[0] {
            AstItem::Progress(p) => {
                assert_eq!(p.entries.iter().map(|e| e.value).collect::<Vec<_>>(), vec![3, 0, 4, 12, 0]);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn invalid_dates_and_fields() {
        let (_, errs) = parse(r#"activity a "A" { span 2025-02-30..2025-06-01; target 3 "x"; }"#);
        assert_eq!(errs.count_errors(), 1);
        let (_, errs) = parse(r#"activity a "A" { span 2025-06-01..2025-02-01; target 3 "x"; }"#);
        assert_eq!(errs.count_errors(), 1);
        let (_, errs) = parse(r#"activity a "A" { span 2025-01-01..2025-02-01; }"#);
        assert_eq!(errs.count_errors(), 1);
        let (_, errs) = parse(r#"activity a "A" { target 1 "x"; target 2 "x"; span 2025-01-01..2025-02-01; }"#);
        assert_eq!(errs.count_errors(), 1);
        let (ast, errs) = parse("progress a { 2025-13: 4; }");
        assert_eq!(errs.count_errors(), 1);
        assert!(matches!(&ast[0], AstItem::Progress(p) if p.entries.is_empty()));
    }

    #[test]
    fn syntax_error() {
        let (ast, errs) = parse("project Clean Water;");
        assert!(ast.is_empty());
        assert!(errs.is_fatal());
    }
}
