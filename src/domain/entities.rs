//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/IO types here; raw upstream records are mapped in `decoder`.

use super::grouping;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A classroom or teaching location. Owned by exactly one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classroom {
    pub title: String,
    pub address: Option<String>,
    /// Floor or wing note.
    pub floor: Option<String>,
    pub building: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl fmt::Display for Classroom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "{} ({})", self.title, address),
            None => f.write_str(&self.title),
        }
    }
}

/// A single lecture, lab or exam session.
///
/// Immutable after construction; the cohort identifier is derived once by
/// [`TimetableEvent::new`] and cannot be changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimetableEvent {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub professor: Option<String>,
    pub module_code: Option<String>,
    pub credits: Option<u32>,
    /// Human-readable time label as published (e.g. "09:00 - 11:00").
    pub time_display: Option<String>,
    pub teaching_period: Option<String>,
    pub calendar_period: Option<String>,
    pub classrooms: Vec<Classroom>,
    pub is_remote: bool,
    pub teams_link: Option<String>,
    pub notes: Option<String>,
    /// Raw disambiguation code (e.g. `00819_1--CL.A`).
    pub raw_group_code: Option<String>,
    group_id: Option<String>,
}

/// Fields of an event before the cohort identifier is derived.
#[derive(Debug, Clone, Default)]
pub struct EventDraft {
    pub title: String,
    pub professor: Option<String>,
    pub module_code: Option<String>,
    pub credits: Option<u32>,
    pub time_display: Option<String>,
    pub teaching_period: Option<String>,
    pub calendar_period: Option<String>,
    pub classrooms: Vec<Classroom>,
    pub teams_link: Option<String>,
    pub notes: Option<String>,
    pub raw_group_code: Option<String>,
}

impl TimetableEvent {
    /// Builds an event, deriving remote flag and cohort identifier.
    /// Returns `None` unless `start < end`.
    pub fn new(draft: EventDraft, start: NaiveDateTime, end: NaiveDateTime) -> Option<Self> {
        if start >= end {
            return None;
        }
        let teams_link = draft.teams_link.filter(|l| !l.trim().is_empty());
        let group_id = grouping::classify(
            draft.raw_group_code.as_deref(),
            &draft.title,
            draft.module_code.as_deref(),
        );
        Some(Self {
            title: draft.title,
            start,
            end,
            professor: draft.professor,
            module_code: draft.module_code,
            credits: draft.credits,
            time_display: draft.time_display,
            teaching_period: draft.teaching_period,
            calendar_period: draft.calendar_period,
            classrooms: draft.classrooms,
            is_remote: teams_link.is_some(),
            teams_link,
            notes: draft.notes,
            raw_group_code: draft.raw_group_code,
            group_id,
        })
    }

    /// Cohort identifier, or `None` when the event is common to every cohort.
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn primary_classroom(&self) -> Option<&Classroom> {
        self.classrooms.first()
    }
}

impl fmt::Display for TimetableEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)?;
        if let Some(group) = self.group_id() {
            write!(f, " [{}]", group)?;
        }
        write!(f, " @ {}", self.start.format("%Y-%m-%d %H:%M"))
    }
}

/// A study track within a course. Identity is the code alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curriculum {
    pub code: String,
    pub label: String,
    /// Whether the course site preselects this curriculum.
    #[serde(default)]
    pub selected: bool,
}

impl Curriculum {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            selected: false,
        }
    }

    /// Selector that asks upstream for every curriculum at once (empty code).
    pub fn unfiltered() -> Self {
        Self::new("", "All curricula")
    }

    pub fn is_unfiltered(&self) -> bool {
        self.code.is_empty()
    }
}

impl PartialEq for Curriculum {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Curriculum {}

impl Hash for Curriculum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

impl fmt::Display for Curriculum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.label)
    }
}

/// Degree kind, resolved from the course duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseKind {
    Bachelor,
    Master,
    SingleCycleMaster,
}

impl CourseKind {
    pub fn from_duration(years: u32) -> Option<Self> {
        match years {
            3 => Some(Self::Bachelor),
            2 => Some(Self::Master),
            5 | 6 => Some(Self::SingleCycleMaster),
            _ => None,
        }
    }

    /// Nominal duration; single-cycle degrees use the shorter (5-year) track.
    pub fn duration(self) -> u32 {
        match self {
            Self::Bachelor => 3,
            Self::Master => 2,
            Self::SingleCycleMaster => 5,
        }
    }

    /// Years of study to fetch for a course of this kind (1-based).
    pub fn years_of_study(self) -> Vec<u32> {
        (1..=self.duration()).collect()
    }
}
