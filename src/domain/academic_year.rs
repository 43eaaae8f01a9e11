//! Academic term windows.
//!
//! A term runs from September 1 to July 31 of the following calendar year.
//! Dates before September belong to the term that started the previous year.

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Month in which a term starts.
const TERM_START_MONTH: u32 = 9;

/// Date format expected by the schedule endpoints.
pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// Calendar bounds of an academic term (start inclusive, end at 23:59:59).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TermWindow {
    /// Term containing `reference`. When `widened`, one extra year on both sides
    /// to tolerate upstream term misalignment.
    pub fn containing(reference: NaiveDate, widened: bool) -> Self {
        let start_year = term_start_year(reference);
        let (start_year, end_year) = if widened {
            (start_year - 1, start_year + 2)
        } else {
            (start_year, start_year + 1)
        };
        Self {
            start: ymd(start_year, TERM_START_MONTH, 1).and_time(NaiveTime::MIN),
            end: ymd(end_year, 7, 31).and_time(end_of_day()),
        }
    }

    /// Term containing today (local time).
    pub fn current(widened: bool) -> Self {
        Self::containing(Local::now().date_naive(), widened)
    }

    /// Resolves an optional reference date; absent means today.
    pub fn resolve(reference: Option<NaiveDate>, widened: bool) -> Self {
        match reference {
            Some(date) => Self::containing(date, widened),
            None => Self::current(widened),
        }
    }

    /// Resolves a `YYYY-MM-DD` reference. Unparseable input falls back to today.
    pub fn resolve_str(reference: Option<&str>, widened: bool) -> Self {
        let parsed = reference
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| NaiveDate::parse_from_str(s, API_DATE_FORMAT).ok());
        Self::resolve(parsed, widened)
    }

    /// `(start, end)` formatted as calendar dates for the query string.
    pub fn api_params(&self) -> (String, String) {
        (
            self.start.format(API_DATE_FORMAT).to_string(),
            self.end.format(API_DATE_FORMAT).to_string(),
        )
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

impl fmt::Display for TermWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (start, end) = self.api_params();
        write!(f, "{} to {}", start, end)
    }
}

/// Calendar year in which the term containing `reference` started.
pub fn term_start_year(reference: NaiveDate) -> i32 {
    if reference.month() >= TERM_START_MONTH {
        reference.year()
    } else {
        reference.year() - 1
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // September 1 and July 31 exist in every year chrono can represent.
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}
