//! Plain text table: one row per bucket plus a total

use super::{format_fixed, Render};
use crate::services::AggregationReport;
use crate::types::Result;

/// Width used when there are no rows at all: `len("Total: 0.00")`
const MIN_WIDTH: usize = 11;

pub struct TableView<'a> {
    report: &'a AggregationReport,
}

impl<'a> TableView<'a> {
    pub fn new(report: &'a AggregationReport) -> Self {
        Self { report }
    }
}

impl Render for TableView<'_> {
    fn render(&self) -> Result<String> {
        let heading = self.report.heading();
        let rows: Vec<String> = self
            .report
            .rows
            .iter()
            .map(|row| format_row(&row.key, row.value))
            .collect();
        let total = format!("Total: {}", format_fixed(self.report.total));

        let longest = rows
            .iter()
            .chain([&heading, &total])
            .map(|r| r.chars().count())
            .max()
            .unwrap_or(0)
            .max(MIN_WIDTH);
        let sep = "-".repeat(longest);

        let mut out = String::new();
        out.push_str(&sep);
        out.push('\n');
        for line in std::iter::once(&heading).chain(&rows).chain([&total]) {
            out.push_str(line);
            out.push('\n');
            out.push_str(&sep);
            out.push('\n');
        }
        Ok(out)
    }
}

fn format_row(key: &str, value: f64) -> String {
    format!("{}  |  {}", key, format_fixed(value))
}
