//! Cumulative planned and reported units as an SVG chart

use svg::{
    node::{
        element::{path::Data, Line, Path, Text},
        Text as TextNode,
    },
    Document,
};

use crate::lib::{month::MonthBucket, progress::MonthTotals};

pub struct Plotter<'d> {
    data: &'d [MonthTotals],
}

impl<'d> Plotter<'d> {
    pub fn from(data: &'d [MonthTotals]) -> Self {
        Self { data }
    }

    /// Write the chart to `file`
    pub fn save_cumulative_plot(&self, file: &str) -> std::io::Result<()> {
        svg::save(file, &self.cumulative_plot().to_drawer().render())
    }

    fn cumulative_plot(&self) -> Plot<MonthBucket, u64> {
        let mut plot = Plot::new();
        let planned = CumulativeEntry::cumul(self.data.iter().map(|t| t.planned).collect());
        let reported = CumulativeEntry::cumul(self.data.iter().map(|t| t.reported).collect());
        for (i, totals) in self.data.iter().enumerate() {
            plot.push(totals.month, vec![planned.points[i], reported.points[i]]);
        }
        plot
    }
}

#[derive(Debug)]
pub struct Plot<X, Y> {
    data: Vec<(X, Vec<Y>)>,
}

impl<X, Y> Plot<X, Y> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn push(&mut self, x: X, y: Vec<Y>) {
        self.data.push((x, y));
    }
}

/// Running total of a series
#[derive(Debug)]
struct CumulativeEntry {
    points: Vec<u64>,
}

impl CumulativeEntry {
    fn cumul(mut points: Vec<u64>) -> Self {
        for i in 1..points.len() {
            points[i] = points[i].saturating_add(points[i - 1]);
        }
        Self { points }
    }
}

impl Plot<MonthBucket, u64> {
    fn to_drawer(&self) -> SeriesDrawer {
        SeriesDrawer {
            labels: self.data.iter().map(|(x, _)| x.to_string()).collect(),
            series: (0..SERIES.len())
                .map(|i| self.data.iter().map(|(_, ys)| ys[i]).collect())
                .collect(),
        }
    }
}

#[derive(Debug)]
struct SeriesDrawer {
    labels: Vec<String>,
    /// one line per entry of `SERIES`
    series: Vec<Vec<u64>>,
}

impl SeriesDrawer {
    fn render(&self) -> Document {
        let fheight = 700.0;
        let fwidth = 1000.0;
        let stroke_width = 2.0;
        let margin = 40.0;
        let ymax = self
            .series
            .iter()
            .flat_map(|s| s.iter().copied())
            .max()
            .unwrap_or(0)
            .max(1) as f64;
        let steps = self.labels.len().saturating_sub(1).max(1) as f64;
        let resize_x = |i: usize| i as f64 / steps * fwidth;
        let resize_y = |y: u64| (1.0 - y as f64 / ymax) * fheight;
        let mut document = Document::new().set(
            "viewBox",
            (-margin, -margin, fwidth + 2.0 * margin, fheight + 3.0 * margin),
        );
        for (points, (name, color)) in self.series.iter().zip(SERIES) {
            if points.is_empty() {
                continue;
            }
            let data = points
                .iter()
                .enumerate()
                .skip(1)
                .fold(Data::new().move_to((resize_x(0), resize_y(points[0]))), |d, (i, y)| {
                    d.line_to((resize_x(i), resize_y(*y)))
                });
            document = document.add(
                Path::new()
                    .set("fill", "none")
                    .set("stroke", *color)
                    .set("stroke-width", stroke_width)
                    .set("class", *name)
                    .set("d", data),
            );
        }
        let yaxis = Line::new()
            .set("x1", 0.0)
            .set("x2", 0.0)
            .set("y1", 0.0)
            .set("y2", fheight)
            .set("stroke", "black")
            .set("stroke-width", stroke_width);
        let xaxis = Line::new()
            .set("x1", 0.0)
            .set("x2", fwidth)
            .set("y1", fheight)
            .set("y2", fheight)
            .set("stroke", "black")
            .set("stroke-width", stroke_width);
        document = document.add(yaxis).add(xaxis);
        for (i, label) in self.labels.iter().enumerate() {
            document = document.add(
                Text::new()
                    .set("x", resize_x(i))
                    .set("y", fheight + margin)
                    .set("font-size", 12)
                    .set("text-anchor", "middle")
                    .add(TextNode::new(label.as_str())),
            );
        }
        document.add(
            Text::new()
                .set("x", -margin / 2.0)
                .set("y", 0.0)
                .set("font-size", 12)
                .set("text-anchor", "end")
                .add(TextNode::new(format!("{}", ymax as u64))),
        )
    }
}

/// Name and color of each line
const SERIES: &[(&str, &str)] = &[("planned", "blue"), ("reported", "green")];
