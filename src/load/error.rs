//! Diagnostics reported while loading a plan file
//!
//! Spans are rendered by `pest::error::Error`, this module groups them into
//! diagnostics with notes and hints and colors the output.
//!
//! ```rust
//! errs.make("Month outside of activity")
//!     .nonfatal()
//!     .span(&entry_loc, "value ignored")
//!     .text("Plan for 'hygiene' only covers 2025-06 to 2026-02")
//!     .hint("remove the entry or extend the activity span");
//! ```

use std::fmt;

use crate::load::parse::Rule;

/// File name and span inside that file
pub type Loc<'i> = (&'i str, pest::Span<'i>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Warning,
    Error,
}

/// One problem found in a plan file
///
/// Every message (label, span message, text, hint) fits on a single line.
#[must_use]
#[derive(Debug)]
pub struct Diagnostic {
    severity: Severity,
    label: String,
    /// displayed in insertion order
    items: Vec<Item>,
}

#[derive(Debug)]
enum Item {
    Block(pest::error::Error<Rule>),
    Text(String),
    Hint(String),
}

/// All diagnostics of one file, in emission order
#[must_use]
#[derive(Debug, Default)]
pub struct Record {
    contents: Vec<Diagnostic>,
}

impl Diagnostic {
    /// Downgrade to a warning
    pub fn nonfatal(&mut self) -> &mut Self {
        self.severity = Severity::Warning;
        self
    }

    /// Attach the error returned by the parser
    pub fn syntax(&mut self, err: pest::error::Error<Rule>) -> &mut Self {
        self.items.push(Item::Block(err.renamed_rules(rule_rename)));
        self
    }

    /// Show `loc` with `msg` under it
    pub fn span<S>(&mut self, loc: &Loc, msg: S) -> &mut Self
    where
        S: ToString,
    {
        let (path, span) = loc;
        let block = pest::error::Error::new_from_span(
            pest::error::ErrorVariant::CustomError {
                message: msg.to_string(),
            },
            span.clone(),
        )
        .with_path(path);
        self.items.push(Item::Block(block));
        self
    }

    pub fn text<S>(&mut self, msg: S) -> &mut Self
    where
        S: ToString,
    {
        self.items.push(Item::Text(msg.to_string()));
        self
    }

    pub fn hint<S>(&mut self, msg: S) -> &mut Self
    where
        S: ToString,
    {
        self.items.push(Item::Hint(msg.to_string()));
        self
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    fn count(&self, severity: Severity) -> usize {
        self.contents
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// At least one diagnostic is an error
    pub fn is_fatal(&self) -> bool {
        self.count_errors() > 0
    }

    pub fn count_errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn count_warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Start a new diagnostic, fatal unless marked `nonfatal`
    pub fn make<S>(&mut self, label: S) -> &mut Diagnostic
    where
        S: ToString,
    {
        self.contents.push(Diagnostic {
            severity: Severity::Error,
            label: label.to_string(),
            items: Vec::new(),
        });
        let last = self.contents.len() - 1;
        &mut self.contents[last]
    }
}

const RED: &str = "\x1b[0;91;1m";
const YELLOW: &str = "\x1b[0;93;1m";
const BLUE: &str = "\x1b[0;96;1m";
const WHITE: &str = "\x1b[0;1m";
const NONE: &str = "\x1b[0m";

/// Diagnostics printed before the rest is summarized
const SHOWN: usize = 10;

impl Severity {
    fn color(self) -> &'static str {
        match self {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = self.severity.color();
        writeln!(f, "{}--> {}:{} {}{}", color, self.severity, WHITE, self.label, NONE)?;
        let caret = format!("{}^{}", color, BLUE);
        for item in &self.items {
            match item {
                Item::Block(err) => {
                    for line in err.to_string().lines() {
                        // pest marks line ends with '␊'
                        let line = line.replace('␊', "").replace('^', &caret);
                        writeln!(f, " {}|  {}{}{}", color, BLUE, line, NONE)?;
                    }
                }
                Item::Text(txt) => writeln!(f, " {}|  {}{}{}", color, WHITE, txt, NONE)?,
                Item::Hint(txt) => writeln!(f, " {}|      {}? hint:{} {}", color, BLUE, NONE, txt)?,
            }
        }
        Ok(())
    }
}

/// Only the diagnostics of the highest severity are shown
impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = if self.is_fatal() {
            Severity::Error
        } else {
            Severity::Warning
        };
        let count = self.count(severity);
        if count == 0 {
            return Ok(());
        }
        let color = severity.color();
        for diagnostic in self
            .contents
            .iter()
            .filter(|d| d.severity == severity)
            .take(SHOWN)
        {
            writeln!(f, "{}", diagnostic)?;
        }
        if count > SHOWN {
            writeln!(f, "{} And {} more.", color, count - SHOWN)?;
        }
        let (kind, noun) = match severity {
            Severity::Error => ("Fatal", "error"),
            Severity::Warning => ("Nonfatal", "warning"),
        };
        let plural = if count > 1 { "s" } else { "" };
        writeln!(
            f,
            "{}{}: {}{} {}{} emitted{}",
            color, kind, WHITE, count, noun, plural, NONE
        )
    }
}

fn rule_rename(r: &Rule) -> String {
    String::from(match r {
        Rule::EOI => "EOF",
        Rule::WHITESPACE => "a whitespace",
        Rule::COMMENT => "a comment",
        Rule::digit => "a digit (0..9)",
        Rule::date => "a date YYYY-MM-DD",
        Rule::month_key => "a month YYYY-MM",
        Rule::date_range => "a range of dates YYYY-MM-DD..YYYY-MM-DD",
        Rule::number => "a non-negative integer",
        Rule::identifier => "an identifier composed of a..zA..Z0..9-_",
        Rule::string => "a string of non-'\"' characters",
        Rule::text => "a quoted string ('\"foo\"')",
        Rule::raw_value => "a monthly value",
        Rule::fy_label => "a fiscal year ('FY 2025-26', '2025-26' or '2025-2026')",
        Rule::project_decl => "a project declaration",
        Rule::area_decl => "an intervention area declaration",
        Rule::activity_span => "a 'span' field descriptor",
        Rule::activity_target => "a 'target' field descriptor",
        Rule::activity_decl => "an activity declaration",
        Rule::month_entry => "a monthly entry ('YYYY-MM: value;')",
        Rule::plan_decl => "a plan declaration",
        Rule::progress_decl => "a progress report",
        Rule::item => "a declaration of project, area, activity, plan or progress",
        Rule::program => "a sequence of declarations",
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counts_by_fatality() {
        let mut errs = Record::new();
        assert!(!errs.is_fatal());
        assert_eq!(format!("{}", errs), "");
        errs.make("first warning").nonfatal().text("something odd");
        errs.make("an error").hint("fix it");
        errs.make("second warning").nonfatal();
        assert!(errs.is_fatal());
        assert_eq!(errs.count_errors(), 1);
        assert_eq!(errs.count_warnings(), 2);
        let shown = format!("{}", errs);
        assert!(shown.contains("an error"));
        assert!(!shown.contains("first warning"));
        assert!(shown.contains("1 error emitted"));
    }

    #[test]
    fn warnings_only() {
        let mut errs = Record::new();
        errs.make("odd value").nonfatal();
        assert!(!errs.is_fatal());
        assert!(format!("{}", errs).contains("1 warning emitted"));
    }

    #[test]
    fn span_shows_file_position() {
        let contents = "plan a FY 2025-26 @ v {\n    2025-05: 12;\n}";
        let span = pest::Span::new(contents, 28, 40).unwrap();
        let mut errs = Record::new();
        errs.make("Month outside of activity")
            .nonfatal()
            .span(&("plan.mel", span), "value ignored")
            .hint("remove the entry");
        let shown = format!("{}", errs);
        assert!(shown.contains("Warning:"));
        assert!(shown.contains("plan.mel:2:5"));
        assert!(shown.contains("2025-05: 12;"));
        assert!(shown.contains("value ignored"));
        assert!(shown.contains("? hint:"));
    }

    #[test]
    fn long_reports_are_cut() {
        let mut errs = Record::new();
        for i in 0..12 {
            errs.make(format!("problem {}", i));
        }
        let shown = format!("{}", errs);
        assert!(shown.contains("problem 9"));
        assert!(!shown.contains("problem 10"));
        assert!(shown.contains("And 2 more."));
        assert!(shown.contains("12 errors emitted"));
    }
}
