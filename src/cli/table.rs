//! Box-drawing tables for allocations and progress summaries

use num_traits::FromPrimitive;
use std::fmt;

use crate::lib::{
    allocation::is_bucket_locked,
    date::Month,
    fiscal::{FiscalYear, FISCAL_START},
    plan::Book,
    progress::ActivityProgress,
};

/// Monthly targets of every allocation of one fiscal year
pub struct PlanTable<'d> {
    book: &'d Book,
    fiscal_year: FiscalYear,
}

/// One line per activity: plan against reported progress
pub struct ProgressTable<'d> {
    data: &'d [ActivityProgress],
}

struct BoxFmt {
    width: usize,
    text: String,
}

struct ColFmt {
    width: usize,
    label: BoxFmt,
    boxes: Vec<BoxFmt>,
}

struct GridFmt {
    title: Option<String>,
    labels: ColFmt,
    columns: Vec<ColFmt>,
}

/// Marker for months that cannot hold a target
const LOCKED: &str = "·";

impl<'d> PlanTable<'d> {
    pub fn from(book: &'d Book, fiscal_year: FiscalYear) -> Self {
        Self { book, fiscal_year }
    }

    /// Months in fiscal order, April first
    fn months() -> Vec<Month> {
        (0..12)
            .map(|i| Month::from_usize((FISCAL_START as usize + i) % 12).unwrap())
            .collect()
    }

    fn to_formatter(&self) -> GridFmt {
        let cols = std::iter::once(BoxFmt::from("Area"))
            .chain(Self::months().into_iter().map(|m| BoxFmt::from(m.to_string())))
            .chain(["Sum", "Target", "Status"].iter().map(|s| BoxFmt::from(*s)))
            .map(ColFmt::with_label)
            .collect::<Vec<_>>();
        let mut grid = GridFmt::with_columns(cols).with_title(self.fiscal_year.label());
        for plan in self
            .book
            .plans
            .iter()
            .filter(|p| p.fiscal_year() == self.fiscal_year)
        {
            let activity = match self.book.activity(plan.activity_id()) {
                Some(activity) => activity,
                None => continue,
            };
            let check = plan.check(activity.lifetime_target);
            let cells = Self::months().into_iter().map(|m| {
                let bucket = self.fiscal_year.bucket_for(m);
                match plan.target(bucket) {
                    Some(target) if !is_bucket_locked(bucket, activity.range, self.fiscal_year) => {
                        BoxFmt::count(target)
                    }
                    _ => BoxFmt::from(LOCKED),
                }
            });
            let area = self
                .book
                .area(plan.intervention_area_id())
                .map(|a| a.label.as_str())
                .unwrap_or_else(|| plan.intervention_area_id());
            let boxes = std::iter::once(BoxFmt::from(area))
                .chain(cells)
                .chain(std::iter::once(BoxFmt::from(check.sum.to_string())))
                .chain(std::iter::once(BoxFmt::from(activity.lifetime_target.to_string())))
                .chain(std::iter::once(BoxFmt::from(if check.valid { "ok" } else { "over" })))
                .collect::<Vec<_>>();
            grid.push_line(BoxFmt::from(activity.name.as_str()), boxes);
        }
        grid
    }
}

impl<'d> ProgressTable<'d> {
    pub fn from(data: &'d [ActivityProgress]) -> Self {
        Self { data }
    }

    fn to_formatter(&self) -> GridFmt {
        let cols = ["Unit", "LOP", "Annual", "YTD plan", "YTD done", "%", "RAG"]
            .iter()
            .map(|s| ColFmt::with_label(BoxFmt::from(*s)))
            .collect::<Vec<_>>();
        let mut grid = GridFmt::with_columns(cols);
        for row in self.data {
            let percent = row
                .completion()
                .map(|c| format!("{:.0}", c * 100.0))
                .unwrap_or_default();
            grid.push_line(
                BoxFmt::from(row.activity_name()),
                vec![
                    BoxFmt::from(row.unit_of_measure()),
                    BoxFmt::from(row.life_of_project_target().to_string()),
                    BoxFmt::from(row.annual_target().to_string()),
                    BoxFmt::from(row.ytd_plan().to_string()),
                    BoxFmt::from(row.ytd_progress().to_string()),
                    BoxFmt::from(percent),
                    BoxFmt::from(row.rag().to_string()),
                ],
            );
        }
        grid
    }
}

impl BoxFmt {
    fn from<S: ToString>(text: S) -> Self {
        let text = text.to_string();
        let width = text.chars().count();
        Self { text, width }
    }

    /// Empty box for 0
    fn count(n: u64) -> Self {
        if n == 0 {
            Self::from("")
        } else {
            Self::from(n.to_string())
        }
    }
}

impl ColFmt {
    fn with_label(label: BoxFmt) -> Self {
        Self {
            width: label.width,
            label,
            boxes: Vec::new(),
        }
    }

    fn push(&mut self, b: BoxFmt) {
        self.width = self.width.max(b.width);
        self.boxes.push(b);
    }
}

impl GridFmt {
    fn with_columns(columns: Vec<ColFmt>) -> Self {
        Self {
            title: None,
            labels: ColFmt::with_label(BoxFmt::from("Activity")),
            columns,
        }
    }

    fn with_title(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }

    fn push_line(&mut self, label: BoxFmt, boxes: Vec<BoxFmt>) {
        self.labels.push(label);
        for (i, b) in boxes.into_iter().enumerate() {
            self.columns[i].push(b);
        }
    }
}

impl fmt::Display for PlanTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_formatter())
    }
}

impl fmt::Display for ProgressTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_formatter())
    }
}

impl fmt::Display for GridFmt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(title) = &self.title {
            writeln!(f, " {}", title)?;
        }
        // upper border
        write!(f, "{}", ULCORNER)?;
        self.labels.hline(f)?;
        for c in &self.columns {
            write!(f, "{}", LOJOIN)?;
            c.hline(f)?;
        }
        writeln!(f, "{}", URCORNER)?;
        // title line
        write!(f, "{}", VLINE)?;
        self.labels.write_label(f)?;
        for c in &self.columns {
            write!(f, "{}", VLINE)?;
            c.write_label(f)?;
        }
        writeln!(f, "{}", VLINE)?;
        // separator
        write!(f, "{}", RTJOIN)?;
        self.labels.hline(f)?;
        for c in &self.columns {
            write!(f, "{}", CROSS)?;
            c.hline(f)?;
        }
        writeln!(f, "{}", LTJOIN)?;

        // main block
        for idx in 0..self.labels.len() {
            write!(f, "{}", VLINE)?;
            self.labels.write_item(f, idx, false)?;
            for c in &self.columns {
                write!(f, "{}", VLINE)?;
                c.write_item(f, idx, true)?;
            }
            writeln!(f, "{}", VLINE)?;
        }
        // lower border
        write!(f, "{}", DLCORNER)?;
        self.labels.hline(f)?;
        for c in &self.columns {
            write!(f, "{}", HIJOIN)?;
            c.hline(f)?;
        }
        writeln!(f, "{}", DRCORNER)?;
        Ok(())
    }
}

impl ColFmt {
    fn write_label(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.label.write(f, self.width, true)
    }

    fn write_item(&self, f: &mut fmt::Formatter, idx: usize, right: bool) -> fmt::Result {
        self.boxes[idx].write(f, self.width, right)
    }

    fn len(&self) -> usize {
        self.boxes.len()
    }

    fn hline(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", HLINE.repeat(self.width + 2))
    }
}

const HLINE: &str = "─";
const VLINE: &str = "│";
const ULCORNER: &str = "┌";
const URCORNER: &str = "┐";
const DLCORNER: &str = "└";
const DRCORNER: &str = "┘";
const LTJOIN: &str = "┤";
const RTJOIN: &str = "├";
const HIJOIN: &str = "┴";
const LOJOIN: &str = "┬";
const CROSS: &str = "┼";

impl BoxFmt {
    fn write(&self, f: &mut fmt::Formatter, width: usize, right: bool) -> fmt::Result {
        let padding = " ".repeat(width.saturating_sub(self.width));
        if right {
            write!(f, " {}{} ", padding, self.text)
        } else {
            write!(f, " {}{} ", self.text, padding)
        }
    }
}
