//! ASCII coordinate graph
//!
//! Values run down the left axis, labels along the bottom. Every distinct
//! value owns one row; rows are scaled so the full value range fits in
//! `max_height` rows, with collisions pushed downwards.

use std::collections::{HashMap, HashSet};

use super::{format_value, Render};
use crate::services::AggregationReport;
use crate::types::{Result, TrackerError};

/// Default number of rows the value range is scaled to
pub const DEFAULT_MAX_HEIGHT: usize = 20;

/// Blank rows above the largest value
const TOP_MARGIN: usize = 2;
/// Rows below the smallest value (blank, rule, labels)
const BOTTOM_MARGIN: usize = 4;
/// Columns between two labels
const LABEL_MARGIN: usize = 8;

/// Autoscaled layout of (label, value) points
#[derive(Debug, Clone)]
pub struct GraphLayout {
    points: Vec<(String, f64)>,
    /// (start column, label) in point order
    labels: Vec<(usize, String)>,
    /// (row, value) for each distinct value, top to bottom
    rows: Vec<(usize, f64)>,
    /// Width of the value gutter; the axis sits in this column
    gutter: usize,
    width: usize,
    height: usize,
}

impl GraphLayout {
    pub fn new(points: Vec<(String, f64)>) -> Self {
        Self::with_max_height(points, DEFAULT_MAX_HEIGHT)
    }

    pub fn with_max_height(points: Vec<(String, f64)>, max_height: usize) -> Self {
        let mut layout = Self {
            points,
            labels: Vec::new(),
            rows: Vec::new(),
            gutter: 0,
            width: 0,
            height: 0,
        };
        if layout.points.is_empty() {
            return layout;
        }

        let mut values: Vec<f64> = layout.points.iter().map(|(_, v)| *v).collect();
        values.sort_by(|a, b| b.total_cmp(a));
        values.dedup();

        layout.layout_rows(&values, max_height.max(1));
        layout.layout_columns(&values);
        layout
    }

    /// One point per report row, in bucket order
    pub fn from_report(report: &AggregationReport) -> Self {
        Self::new(
            report
                .rows
                .iter()
                .map(|row| (row.key.clone(), row.value))
                .collect(),
        )
    }

    /// `values` must be distinct and sorted descending
    fn layout_rows(&mut self, values: &[f64], max_height: usize) {
        let max = values[0];
        let min = values[values.len() - 1];

        // Round the range up to a multiple of max_height
        let steps = max_height as f64;
        let range = ((max - min) / steps).ceil() * steps;
        let scale = range / steps;

        let mut occupied: HashSet<usize> = HashSet::new();
        for &value in values {
            let mut row = if value == max {
                TOP_MARGIN
            } else {
                ((max - value) / scale).floor() as usize + TOP_MARGIN
            };
            while occupied.contains(&row) {
                row += 1;
            }
            occupied.insert(row);
            self.rows.push((row, value));
        }

        let last_row = self.rows.iter().map(|(row, _)| *row).max().unwrap_or(0);
        self.height = last_row + BOTTOM_MARGIN;
    }

    fn layout_columns(&mut self, values: &[f64]) {
        self.gutter = values
            .iter()
            .map(|v| format_value(*v).len())
            .max()
            .unwrap_or(0);

        let mut cursor = self.gutter + 1 + LABEL_MARGIN / 2;
        for (label, _) in &self.points {
            self.labels.push((cursor, label.clone()));
            cursor += label_width(label) + LABEL_MARGIN;
        }
        self.width = cursor - LABEL_MARGIN / 2;
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Column of the vertical axis
    pub fn axis_column(&self) -> usize {
        self.gutter
    }

    /// Row owned by `value`
    pub fn row_of(&self, value: f64) -> Option<usize> {
        self.rows
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(row, _)| *row)
    }

    /// Half-open column range `[start, start + width)` printed by `label`
    pub fn label_span(&self, label: &str) -> Option<(usize, usize)> {
        self.labels
            .iter()
            .find(|(_, l)| l == label)
            .map(|(start, l)| (*start, start + label_width(l)))
    }

    /// (column, row) of a point. Fails if the label or value was not part
    /// of the input the axes were built from.
    pub fn plot(&self, label: &str, value: f64) -> Result<(usize, usize)> {
        let (start, end) = self.label_span(label).ok_or_else(|| {
            TrackerError::InvariantViolation(format!("label '{}' is not on the axis", label))
        })?;
        let row = self.row_of(value).ok_or_else(|| {
            TrackerError::InvariantViolation(format!(
                "value {} is not on the axis",
                format_value(value)
            ))
        })?;
        Ok((start + (end - start) / 2, row))
    }

    fn coordinates(&self) -> Result<HashSet<(usize, usize)>> {
        self.points
            .iter()
            .map(|(label, value)| self.plot(label, *value))
            .collect()
    }
}

impl Render for GraphLayout {
    fn render(&self) -> Result<String> {
        if self.points.is_empty() {
            return Ok(String::new());
        }

        let coordinates = self.coordinates()?;
        let label_at: HashMap<usize, &str> = self
            .labels
            .iter()
            .map(|(start, label)| (*start, label.as_str()))
            .collect();
        let value_at: HashMap<usize, f64> = self.rows.iter().copied().collect();

        let mut out = String::new();
        for i in 0..self.height {
            let last = i == self.height - 1;
            let penult = i == self.height - 2;
            let mut line = String::with_capacity(self.width);

            let mut j = 0;
            while j < self.width {
                if last {
                    if let Some(label) = label_at.get(&j) {
                        line.push_str(label);
                        j += label_width(label);
                        continue;
                    }
                    line.push(if j == self.gutter { '|' } else { ' ' });
                } else if penult {
                    line.push(if j == self.gutter { '|' } else { '_' });
                } else if j == self.gutter {
                    line.push('|');
                } else if j == 0 {
                    match value_at.get(&i) {
                        Some(value) => line.push_str(&format!(
                            "{:>width$}",
                            format_value(*value),
                            width = self.gutter
                        )),
                        None => line.push_str(&" ".repeat(self.gutter)),
                    }
                    j = self.gutter;
                    continue;
                } else if coordinates.contains(&(j, i)) {
                    line.push('+');
                } else {
                    line.push(' ');
                }
                j += 1;
            }

            out.push_str(line.trim_end());
            out.push('\n');
        }
        Ok(out)
    }
}

fn label_width(label: &str) -> usize {
    label.chars().count()
}
