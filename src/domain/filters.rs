//! Predicate-based filtering and grouping over a flat event sequence.

use super::entities::TimetableEvent;
use super::grouping::COMMON_GROUP;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};

/// Remote/in-person restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attendance {
    #[default]
    Any,
    RemoteOnly,
    InPersonOnly,
}

/// Conjunction of optional predicates. An empty filter keeps every event.
///
/// ```
/// use timetable_sync::domain::filters::EventFilter;
/// let filter = EventFilter::new().group("CL.A").subject("algebra").remote_only();
/// assert!(!filter.is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    groups: Option<Vec<String>>,
    subject: Option<String>,
    professor: Option<String>,
    starts_from: Option<NaiveDateTime>,
    starts_until: Option<NaiveDateTime>,
    attendance: Attendance,
}

impl EventFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single cohort identifier.
    pub fn group(self, group_id: impl Into<String>) -> Self {
        self.groups([group_id.into()])
    }

    /// Any of the given cohort identifiers.
    pub fn groups<I, S>(mut self, group_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = Some(group_ids.into_iter().map(Into::into).collect());
        self
    }

    /// Case-insensitive substring of the title.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into().to_lowercase());
        self
    }

    /// Case-insensitive substring of the instructor name.
    pub fn professor(mut self, professor: impl Into<String>) -> Self {
        self.professor = Some(professor.into().to_lowercase());
        self
    }

    /// Start time lower bound (inclusive).
    pub fn starts_from(mut self, at: NaiveDateTime) -> Self {
        self.starts_from = Some(at);
        self
    }

    /// Start time upper bound (inclusive).
    pub fn starts_until(mut self, at: NaiveDateTime) -> Self {
        self.starts_until = Some(at);
        self
    }

    pub fn remote_only(mut self) -> Self {
        self.attendance = Attendance::RemoteOnly;
        self
    }

    pub fn in_person_only(mut self) -> Self {
        self.attendance = Attendance::InPersonOnly;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_none()
            && self.subject.is_none()
            && self.professor.is_none()
            && self.starts_from.is_none()
            && self.starts_until.is_none()
            && self.attendance == Attendance::Any
    }

    pub fn matches(&self, event: &TimetableEvent) -> bool {
        if let Some(groups) = &self.groups {
            match event.group_id() {
                Some(g) if groups.iter().any(|wanted| wanted == g) => {}
                _ => return false,
            }
        }
        if let Some(subject) = &self.subject {
            if !event.title.to_lowercase().contains(subject) {
                return false;
            }
        }
        if let Some(professor) = &self.professor {
            let hit = event
                .professor
                .as_deref()
                .is_some_and(|p| p.to_lowercase().contains(professor));
            if !hit {
                return false;
            }
        }
        if self.starts_from.is_some_and(|from| event.start < from) {
            return false;
        }
        if self.starts_until.is_some_and(|until| event.start > until) {
            return false;
        }
        match self.attendance {
            Attendance::Any => true,
            Attendance::RemoteOnly => event.is_remote,
            Attendance::InPersonOnly => !event.is_remote,
        }
    }

    /// Keeps matching events, preserving input order.
    pub fn apply<'a, I>(&self, events: I) -> Vec<&'a TimetableEvent>
    where
        I: IntoIterator<Item = &'a TimetableEvent>,
    {
        events.into_iter().filter(|e| self.matches(e)).collect()
    }
}

/// Events keyed by cohort; events without one go under [`COMMON_GROUP`].
pub fn group_by_cohort<'a, I>(events: I) -> BTreeMap<String, Vec<&'a TimetableEvent>>
where
    I: IntoIterator<Item = &'a TimetableEvent>,
{
    let mut grouped: BTreeMap<String, Vec<&TimetableEvent>> = BTreeMap::new();
    for event in events {
        let key = event.group_id().unwrap_or(COMMON_GROUP);
        grouped.entry(key.to_string()).or_default().push(event);
    }
    grouped
}

/// Distinct subject titles, sorted.
pub fn unique_subjects<'a, I>(events: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a TimetableEvent>,
{
    sorted_distinct(events.into_iter().map(|e| e.title.as_str()))
}

/// Distinct instructor names, sorted.
pub fn unique_professors<'a, I>(events: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a TimetableEvent>,
{
    sorted_distinct(events.into_iter().filter_map(|e| e.professor.as_deref()))
}

/// Distinct cohort identifiers, sorted.
pub fn unique_groups<'a, I>(events: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a TimetableEvent>,
{
    sorted_distinct(events.into_iter().filter_map(TimetableEvent::group_id))
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EventDraft;
    use chrono::{Duration, NaiveDate};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn event(title: &str, start: NaiveDateTime, code: Option<&str>, prof: Option<&str>, remote: bool) -> TimetableEvent {
        let draft = EventDraft {
            title: title.to_string(),
            professor: prof.map(String::from),
            raw_group_code: code.map(String::from),
            teams_link: remote.then(|| "https://teams.example/x".to_string()),
            ..Default::default()
        };
        TimetableEvent::new(draft, start, start + Duration::hours(2)).unwrap()
    }

    fn sample() -> Vec<TimetableEvent> {
        vec![
            event("ALGEBRA LINEARE", at(2, 9), Some("1--CL.A"), Some("Mario Rossi"), false),
            event("ALGEBRA LINEARE", at(3, 9), Some("1--CL.B"), Some("Luigi Bianchi"), true),
            event("FISICA", at(10, 11), Some("2--CL.A"), Some("Anna Verdi"), true),
            event("CHIMICA", at(15, 14), None, None, false),
            event("FISICA", at(20, 11), Some("2--CL.B"), Some("Anna Verdi"), false),
        ]
    }

    fn titles(events: &[&TimetableEvent]) -> Vec<String> {
        events.iter().map(|e| format!("{}@{}", e.title, e.start)).collect()
    }

    #[test]
    fn test_empty_filter_keeps_all() {
        let events = sample();
        assert!(EventFilter::new().is_empty());
        assert_eq!(EventFilter::new().apply(&events).len(), events.len());
    }

    #[test]
    fn test_group_filters() {
        let events = sample();
        assert_eq!(EventFilter::new().group("CL.A").apply(&events).len(), 2);
        assert_eq!(EventFilter::new().groups(["CL.A", "CL.B"]).apply(&events).len(), 4);
        assert!(EventFilter::new().group("Z").apply(&events).is_empty());
    }

    #[test]
    fn test_text_filters_are_case_insensitive() {
        let events = sample();
        assert_eq!(EventFilter::new().subject("algebra").apply(&events).len(), 2);
        assert_eq!(EventFilter::new().professor("VERDI").apply(&events).len(), 2);
        assert_eq!(EventFilter::new().professor("rossi").subject("fisica").apply(&events).len(), 0);
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let events = sample();
        let hits = EventFilter::new()
            .starts_from(at(3, 9))
            .starts_until(at(15, 14))
            .apply(&events);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_attendance() {
        let events = sample();
        assert_eq!(EventFilter::new().remote_only().apply(&events).len(), 2);
        assert_eq!(EventFilter::new().in_person_only().apply(&events).len(), 3);
    }

    #[test]
    fn test_filters_compose() {
        let events = sample();
        let group = EventFilter::new().group("CL.A");
        let range = EventFilter::new().starts_from(at(5, 0)).starts_until(at(28, 0));
        let both = EventFilter::new()
            .group("CL.A")
            .starts_from(at(5, 0))
            .starts_until(at(28, 0));

        let sequential = range.apply(group.apply(&events));
        let reversed = group.apply(range.apply(&events));
        let single = both.apply(&events);
        assert_eq!(titles(&sequential), titles(&single));
        assert_eq!(titles(&reversed), titles(&single));
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_grouping_and_uniques() {
        let events = sample();
        let grouped = group_by_cohort(&events);
        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["CL.A", "CL.B", "common"]);
        assert_eq!(grouped["common"].len(), 1);
        assert_eq!(unique_subjects(&events), vec!["ALGEBRA LINEARE", "CHIMICA", "FISICA"]);
        assert_eq!(unique_professors(&events), vec!["Anna Verdi", "Luigi Bianchi", "Mario Rossi"]);
        assert_eq!(unique_groups(&events), vec!["CL.A", "CL.B"]);
    }
}
