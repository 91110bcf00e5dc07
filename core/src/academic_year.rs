//! Academic year labels and calendar helpers.
//!
//! An academic year runs June 1 through May 31 and is labelled
//! "<start>-<start+1>", e.g. "2024-2025". Labels are parsed once into
//! `AcademicYear`; a label that is not two consecutive four-digit years
//! is rejected with `FeeError::MalformedYearLabel`.

use crate::error::{FeeError, FeeResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First calendar month (1-based) of an academic year.
pub const FIRST_MONTH: u32 = 6;

/// Start years whose labels are two four-digit years ("0000-0001" .. "9998-9999").
pub const MIN_START_YEAR: i32 = 0;
pub const MAX_START_YEAR: i32 = 9998;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicYear {
    start: i32,
}

impl AcademicYear {
    /// `None` when the year cannot be labelled with two four-digit years.
    pub fn from_start_year(start: i32) -> Option<Self> {
        (MIN_START_YEAR..=MAX_START_YEAR)
            .contains(&start)
            .then_some(Self { start })
    }

    /// Parse a "YYYY-YYYY" label.
    pub fn parse(label: &str) -> FeeResult<Self> {
        let malformed = || FeeError::MalformedYearLabel {
            label: label.to_string(),
        };

        let (head, tail) = label.split_once('-').ok_or_else(malformed)?;
        let start = parse_four_digits(head).ok_or_else(malformed)?;
        let end = parse_four_digits(tail).ok_or_else(malformed)?;
        if end != start + 1 {
            return Err(malformed());
        }
        Ok(Self { start })
    }

    /// The academic year containing `today`, clamped to the labellable range.
    pub fn current(today: NaiveDate) -> Self {
        let start = if today.month() >= FIRST_MONTH {
            today.year()
        } else {
            today.year() - 1
        };
        Self {
            start: start.clamp(MIN_START_YEAR, MAX_START_YEAR),
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start
    }

    pub fn end_year(&self) -> i32 {
        self.start + 1
    }

    pub fn previous(&self) -> Option<Self> {
        Self::from_start_year(self.start - 1)
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_start_year(self.start + 1)
    }

    /// True when this year starts after `other` starts.
    pub fn is_after(&self, other: &AcademicYear) -> bool {
        self.start > other.start
    }
}

fn parse_four_digits(s: &str) -> Option<i32> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// `before + after + 1` consecutive years centred on the year containing
/// `today`, newest first. The window is cut at the first and last
/// labellable years.
pub fn year_options(before: u32, after: u32, today: NaiveDate) -> Vec<AcademicYear> {
    let current = i64::from(AcademicYear::current(today).start);
    let oldest = (current - i64::from(before)).max(i64::from(MIN_START_YEAR));
    let newest = (current + i64::from(after)).min(i64::from(MAX_START_YEAR));
    (oldest..=newest)
        .rev()
        .filter_map(|start| i32::try_from(start).ok())
        .filter_map(AcademicYear::from_start_year)
        .collect()
}

impl fmt::Display for AcademicYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:04}", self.start, self.start + 1)
    }
}

impl FromStr for AcademicYear {
    type Err = FeeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AcademicYear {
    type Error = FeeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AcademicYear> for String {
    fn from(year: AcademicYear) -> Self {
        year.to_string()
    }
}
