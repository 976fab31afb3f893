//! Calendar buckets: labels, stepping and ordering per period

use chrono::{Datelike, Days, Local, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Quantity, TrackerError};

/// Multiplier separating the year from the sub-unit in week/month ordinals.
/// Larger than any ISO week (53) or month (12) number.
const ORDINAL_YEAR_STRIDE: i64 = 64;

/// Calendar granularity, ordered from finest to coarsest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    #[default]
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Canonical bucket label for the bucket containing `date`
    pub fn key(&self, date: NaiveDate) -> String {
        match self {
            Self::Day => date.format("%B %d %A").to_string(),
            Self::Week => {
                let iso = date.iso_week();
                format!("W{:02} {}", iso.week(), iso.year())
            }
            Self::Month => format!("{} {}", date.year(), date.format("%B")),
            Self::Year => date.year().to_string(),
        }
    }

    /// Same position one unit earlier. Month and year steps clamp to the
    /// last day of the target month (Mar 31 → Feb 28).
    pub fn prev(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date - Days::new(1),
            Self::Week => date - Days::new(7),
            Self::Month => date - Months::new(1),
            Self::Year => date - Months::new(12),
        }
    }

    /// `units` steps back in one jump, or `None` past the calendar range.
    /// Lands in the same bucket as `units` repeated `prev` steps.
    pub fn checked_back(&self, date: NaiveDate, units: u32) -> Option<NaiveDate> {
        match self {
            Self::Day => date.checked_sub_days(Days::new(units as u64)),
            Self::Week => date.checked_sub_days(Days::new(units as u64 * 7)),
            Self::Month => date.checked_sub_months(Months::new(units)),
            Self::Year => date.checked_sub_months(Months::new(units.checked_mul(12)?)),
        }
    }

    /// Same position one unit later
    pub fn next(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Day => date + Days::new(1),
            Self::Week => date + Days::new(7),
            Self::Month => date + Months::new(1),
            Self::Year => date + Months::new(12),
        }
    }

    /// Monotonic bucket identity. Two dates share a bucket iff their
    /// ordinals are equal, and later buckets always compare greater,
    /// including across ISO-year rollovers.
    pub fn ordinal(&self, date: NaiveDate) -> i64 {
        match self {
            Self::Day => date.num_days_from_ce() as i64,
            Self::Week => {
                let iso = date.iso_week();
                iso.year() as i64 * ORDINAL_YEAR_STRIDE + iso.week() as i64
            }
            Self::Month => date.year() as i64 * ORDINAL_YEAR_STRIDE + date.month() as i64,
            Self::Year => date.year() as i64,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Accepts full names and the one-letter shorthands `d`, `w`, `m`, `y`
impl FromStr for Period {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "d" | "day" => Ok(Self::Day),
            "w" | "week" => Ok(Self::Week),
            "m" | "month" => Ok(Self::Month),
            "y" | "year" => Ok(Self::Year),
            other => Err(TrackerError::Usage(format!(
                "invalid period '{}', expected one of d, w, m, y",
                other
            ))),
        }
    }
}

/// One aggregated time slot: a quantity anchored at any date inside the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    pub qty: Quantity,
    pub date: NaiveDate,
    pub period: Period,
}

impl Bucket {
    pub fn new(qty: Quantity, date: NaiveDate, period: Period) -> Self {
        Self { qty, date, period }
    }

    /// Empty bucket anchored at `date`
    pub fn at(date: NaiveDate, period: Period) -> Self {
        Self::new(Quantity::ZERO, date, period)
    }

    pub fn key(&self) -> String {
        self.period.key(self.date)
    }

    pub fn ordinal(&self) -> i64 {
        self.period.ordinal(self.date)
    }

    /// Empty bucket for the preceding unit
    pub fn prev(&self) -> Bucket {
        Bucket::at(self.period.prev(self.date), self.period)
    }

    /// Empty bucket for the following unit
    pub fn next(&self) -> Bucket {
        Bucket::at(self.period.next(self.date), self.period)
    }
}

/// Lookback window `[today - frequency units, today]` at a given period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub period: Period,
    pub frequency: u32,
    pub today: NaiveDate,
}

impl Window {
    pub fn new(period: Period, frequency: u32, today: NaiveDate) -> Self {
        Self {
            period,
            frequency,
            today,
        }
    }

    /// Like `new`, but rejects a lookback reaching past the calendar range
    pub fn try_new(period: Period, frequency: u32, today: NaiveDate) -> Result<Self, TrackerError> {
        if period.checked_back(today, frequency).is_none() {
            return Err(TrackerError::Usage(format!(
                "lookback of {} {}s from {} is out of range",
                frequency, period, today
            )));
        }
        Ok(Self::new(period, frequency, today))
    }

    /// Window ending on the local calendar date
    pub fn ending_today(period: Period, frequency: u32) -> Self {
        Self::new(period, frequency, Local::now().date_naive())
    }

    /// Oldest bucket in the window
    pub fn anchor(&self) -> Bucket {
        (0..self.frequency).fold(Bucket::at(self.today, self.period), |b, _| b.prev())
    }

    /// Whether `date` falls in the anchor bucket or any later one
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.period.ordinal(date) >= self.anchor().ordinal()
    }

    /// `frequency + 1` labels, oldest first
    pub fn bucket_keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.frequency as usize + 1);
        let mut bucket = Bucket::at(self.today, self.period);
        keys.push(bucket.key());
        for _ in 0..self.frequency {
            bucket = bucket.prev();
            keys.push(bucket.key());
        }
        keys.reverse();
        keys
    }
}
