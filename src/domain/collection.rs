//! Hierarchical timetable model: Collection -> Year -> Curriculum -> Events.
//!
//! Built by a single aggregation pass and read-only afterwards. Years and
//! curricula are kept in ordered maps so every scope iterates deterministically
//! (year, then curriculum code, then start time).

use super::academic_year::TermWindow;
use super::decoder::sort_by_start;
use super::entities::{Curriculum, TimetableEvent};
use super::filters;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Why a single candidate endpoint was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptFailureKind {
    /// Network error or 5xx status.
    Transport,
    /// 4xx status: the path is not published for this course.
    NotFound,
    Timeout,
    /// Body was not JSON.
    Parse,
    /// JSON did not have the expected structure.
    Shape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptFailure {
    pub endpoint: String,
    pub kind: AttemptFailureKind,
    pub message: String,
}

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Fetched { endpoint: String },
    /// Every candidate failed; one entry per candidate, in order.
    Exhausted { attempts: Vec<AttemptFailure> },
}

impl FetchOutcome {
    /// True when at least one candidate failed on the network rather than on content,
    /// so a retry might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchOutcome::Fetched { .. } => false,
            FetchOutcome::Exhausted { attempts } => attempts.iter().any(|a| {
                matches!(
                    a.kind,
                    AttemptFailureKind::Transport | AttemptFailureKind::Timeout
                )
            }),
        }
    }
}

/// Result metadata attached to a fetched timetable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchReport {
    pub outcome: FetchOutcome,
    /// Content hash of the decoded events; `None` when the fetch failed.
    pub content_hash: Option<String>,
    pub window: TermWindow,
}

impl FetchReport {
    pub fn fetch_successful(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Fetched { .. })
    }

    pub fn endpoint_used(&self) -> Option<&str> {
        match &self.outcome {
            FetchOutcome::Fetched { endpoint } => Some(endpoint),
            FetchOutcome::Exhausted { .. } => None,
        }
    }
}

/// Events of one curriculum in one year of study, sorted by start time.
#[derive(Debug, Clone, Serialize)]
pub struct CurriculumTimetable {
    pub curriculum: Curriculum,
    events: Vec<TimetableEvent>,
    /// `None` for timetables assembled locally rather than fetched.
    pub report: Option<FetchReport>,
}

impl CurriculumTimetable {
    pub fn new(curriculum: Curriculum, mut events: Vec<TimetableEvent>) -> Self {
        sort_by_start(&mut events);
        Self {
            curriculum,
            events,
            report: None,
        }
    }

    pub fn empty(curriculum: Curriculum) -> Self {
        Self::new(curriculum, Vec::new())
    }

    pub fn with_report(mut self, report: FetchReport) -> Self {
        self.report = Some(report);
        self
    }

    pub fn events(&self) -> &[TimetableEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Keeps the start-time ordering.
    pub fn add_event(&mut self, event: TimetableEvent) {
        let at = self.events.partition_point(|e| e.start <= event.start);
        self.events.insert(at, event);
    }

    pub fn fetch_successful(&self) -> bool {
        self.report.as_ref().is_some_and(FetchReport::fetch_successful)
    }

    pub fn has_timetable(&self) -> bool {
        self.fetch_successful() && !self.events.is_empty()
    }

    pub fn endpoint_used(&self) -> Option<&str> {
        self.report.as_ref().and_then(FetchReport::endpoint_used)
    }

    pub fn content_hash(&self) -> Option<&str> {
        self.report.as_ref().and_then(|r| r.content_hash.as_deref())
    }

    pub fn events_by_subject(&self, subject: &str) -> Vec<&TimetableEvent> {
        self.events.iter().filter(|e| e.title == subject).collect()
    }

    pub fn unique_subjects(&self) -> Vec<String> {
        filters::unique_subjects(&self.events)
    }

    pub fn available_groups(&self) -> Vec<String> {
        filters::unique_groups(&self.events)
    }

    pub fn events_by_group(&self, group_id: &str) -> Vec<&TimetableEvent> {
        self.events
            .iter()
            .filter(|e| e.group_id() == Some(group_id))
            .collect()
    }

    /// Events without a cohort, attended by everyone.
    pub fn common_events(&self) -> Vec<&TimetableEvent> {
        self.events.iter().filter(|e| e.group_id().is_none()).collect()
    }

    /// Events starting within `[start, end]`.
    pub fn events_in_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<&TimetableEvent> {
        self.events
            .iter()
            .filter(|e| start <= e.start && e.start <= end)
            .collect()
    }

    pub fn split_by_group(&self) -> BTreeMap<String, Vec<&TimetableEvent>> {
        filters::group_by_cohort(&self.events)
    }
}

impl fmt::Display for CurriculumTimetable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurriculumTimetable({}, {} events)", self.curriculum, self.len())
    }
}

/// All curricula of one year of study, keyed by curriculum code.
#[derive(Debug, Clone, Serialize)]
pub struct AcademicYearTimetable {
    pub year: u32,
    curricula: BTreeMap<String, CurriculumTimetable>,
}

impl AcademicYearTimetable {
    pub fn new(year: u32) -> Self {
        Self {
            year,
            curricula: BTreeMap::new(),
        }
    }

    /// Inserts or replaces (last writer wins) the timetable for its curriculum code.
    pub fn add_curriculum_timetable(&mut self, timetable: CurriculumTimetable) {
        self.curricula
            .insert(timetable.curriculum.code.clone(), timetable);
    }

    pub fn curriculum(&self, code: &str) -> Option<&CurriculumTimetable> {
        self.curricula.get(code)
    }

    pub fn curricula(&self) -> impl Iterator<Item = &CurriculumTimetable> {
        self.curricula.values()
    }

    pub fn all_curricula(&self) -> Vec<Curriculum> {
        self.curricula.values().map(|c| c.curriculum.clone()).collect()
    }

    /// Events of every curriculum, curriculum by curriculum.
    pub fn events(&self) -> Vec<&TimetableEvent> {
        self.curricula.values().flat_map(|c| c.events()).collect()
    }

    /// Number of curricula.
    pub fn len(&self) -> usize {
        self.curricula.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curricula.is_empty()
    }

    pub fn event_count(&self) -> usize {
        self.curricula.values().map(CurriculumTimetable::len).sum()
    }
}

impl fmt::Display for AcademicYearTimetable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Year {}: {} curricula, {} total events",
            self.year,
            self.len(),
            self.event_count()
        )
    }
}

/// Root aggregate returned to callers.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TimetableCollection {
    years: BTreeMap<u32, AcademicYearTimetable>,
}

impl TimetableCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_year(&mut self, year: u32) -> &mut AcademicYearTimetable {
        self.years
            .entry(year)
            .or_insert_with(|| AcademicYearTimetable::new(year))
    }

    pub fn add_curriculum_timetable(&mut self, year: u32, timetable: CurriculumTimetable) {
        self.get_or_create_year(year)
            .add_curriculum_timetable(timetable);
    }

    pub fn year(&self, year: u32) -> Option<&AcademicYearTimetable> {
        self.years.get(&year)
    }

    pub fn curriculum(&self, year: u32, code: &str) -> Option<&CurriculumTimetable> {
        self.year(year).and_then(|y| y.curriculum(code))
    }

    /// Year numbers in ascending order.
    pub fn years(&self) -> Vec<u32> {
        self.years.keys().copied().collect()
    }

    pub fn year_timetables(&self) -> impl Iterator<Item = &AcademicYearTimetable> {
        self.years.values()
    }

    /// Curricula of one year, or of every year deduplicated by code.
    pub fn curricula(&self, year: Option<u32>) -> Vec<Curriculum> {
        match year {
            Some(y) => self.year(y).map(|t| t.all_curricula()).unwrap_or_default(),
            None => {
                let mut seen = HashSet::new();
                self.years
                    .values()
                    .flat_map(AcademicYearTimetable::all_curricula)
                    .filter(|c| seen.insert(c.code.clone()))
                    .collect()
            }
        }
    }

    /// Events in scope, in year, then curriculum, then start-time order.
    pub fn events(&self, year: Option<u32>, curriculum_code: Option<&str>) -> Vec<&TimetableEvent> {
        self.years
            .values()
            .filter(|y| year.is_none_or(|wanted| y.year == wanted))
            .flat_map(|y| y.curricula())
            .filter(|c| curriculum_code.is_none_or(|code| c.curriculum.code == code))
            .flat_map(|c| c.events())
            .collect()
    }

    /// Events in scope merged into a single start-time ordering.
    pub fn events_chronological(
        &self,
        year: Option<u32>,
        curriculum_code: Option<&str>,
    ) -> Vec<&TimetableEvent> {
        let mut events = self.events(year, curriculum_code);
        events.sort_by_key(|e| e.start);
        events
    }

    /// Every event of every year and curriculum, exactly once.
    pub fn flatten(&self) -> Vec<&TimetableEvent> {
        self.events(None, None)
    }

    pub fn total_events(&self) -> usize {
        self.years.values().map(AcademicYearTimetable::event_count).sum()
    }

    /// Every (year, curriculum timetable) pair in order.
    pub fn entries(&self) -> impl Iterator<Item = (u32, &CurriculumTimetable)> {
        self.years
            .values()
            .flat_map(|y| y.curricula().map(move |c| (y.year, c)))
    }

    /// Folds `other` into `self`; entries of `other` replace same (year, code) entries.
    pub fn merge(&mut self, other: TimetableCollection) {
        for (year, year_tt) in other.years {
            let target = self.get_or_create_year(year);
            for (_, timetable) in year_tt.curricula {
                target.add_curriculum_timetable(timetable);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }
}

impl fmt::Display for TimetableCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimetableCollection: {} years, {} total events",
            self.years.len(),
            self.total_events()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EventDraft;

    fn event(title: &str, day: u32, code: Option<&str>) -> TimetableEvent {
        let start = chrono::NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let draft = EventDraft {
            title: title.to_string(),
            raw_group_code: code.map(String::from),
            ..Default::default()
        };
        TimetableEvent::new(draft, start, start + chrono::Duration::hours(2)).unwrap()
    }

    fn timetable(code: &str, days: &[u32]) -> CurriculumTimetable {
        CurriculumTimetable::new(
            Curriculum::new(code, code),
            days.iter().map(|d| event(&format!("{}-{}", code, d), *d, None)).collect(),
        )
    }

    fn sample_collection() -> TimetableCollection {
        let mut c = TimetableCollection::new();
        c.add_curriculum_timetable(2, timetable("B", &[5, 1]));
        c.add_curriculum_timetable(1, timetable("B", &[3]));
        c.add_curriculum_timetable(1, timetable("A", &[9, 2, 4]));
        c.add_curriculum_timetable(2, timetable("A", &[]));
        c
    }

    #[test]
    fn test_flatten_is_partition() {
        let c = sample_collection();
        let per_scope: usize = c.entries().map(|(_, t)| t.len()).sum();
        assert_eq!(c.flatten().len(), per_scope);
        assert_eq!(c.total_events(), 6);

        let mut titles: Vec<_> = c.flatten().iter().map(|e| e.title.clone()).collect();
        titles.sort();
        titles.dedup();
        assert_eq!(titles.len(), 6);
    }

    #[test]
    fn test_events_ordered_by_year_then_curriculum_then_start() {
        let c = sample_collection();
        let titles: Vec<_> = c.flatten().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["A-2", "A-4", "A-9", "B-3", "B-1", "B-5"]);
    }

    #[test]
    fn test_scoped_queries() {
        let c = sample_collection();
        assert_eq!(c.years(), vec![1, 2]);
        assert_eq!(c.events(Some(1), None).len(), 4);
        assert_eq!(c.events(None, Some("B")).len(), 3);
        assert_eq!(c.events(Some(2), Some("B")).len(), 2);
        assert!(c.events(Some(3), None).is_empty());
        assert!(c.curriculum(1, "Z").is_none());

        let chrono_titles: Vec<_> = c
            .events_chronological(None, None)
            .iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(chrono_titles, vec!["B-1", "A-2", "B-3", "A-4", "B-5", "A-9"]);
    }

    #[test]
    fn test_curricula_deduplicated_across_years() {
        let c = sample_collection();
        assert_eq!(c.curricula(None).len(), 2);
        assert_eq!(c.curricula(Some(1)).len(), 2);
        assert!(c.curricula(Some(7)).is_empty());
    }

    #[test]
    fn test_last_writer_wins() {
        let mut c = sample_collection();
        c.add_curriculum_timetable(1, timetable("A", &[20]));
        assert_eq!(c.curriculum(1, "A").unwrap().len(), 1);
        assert_eq!(c.year(1).unwrap().len(), 2);
    }

    #[test]
    fn test_merge() {
        let mut c = sample_collection();
        let mut other = TimetableCollection::new();
        other.add_curriculum_timetable(3, timetable("C", &[1]));
        other.add_curriculum_timetable(2, timetable("B", &[7]));
        c.merge(other);
        assert_eq!(c.years(), vec![1, 2, 3]);
        assert_eq!(c.curriculum(2, "B").unwrap().len(), 1);
        assert_eq!(c.total_events(), 6);
        assert_eq!(c.to_string(), "TimetableCollection: 3 years, 6 total events");
    }

    #[test]
    fn test_curriculum_timetable_queries() {
        let mut t = CurriculumTimetable::new(
            Curriculum::new("A", "A"),
            vec![
                event("ANATOMIA", 3, Some("1--A-L")),
                event("ANATOMIA", 1, Some("1--M-Z")),
                event("FISICA", 2, None),
            ],
        );
        t.add_event(event("CHIMICA", 2, None));
        assert!(t.events().windows(2).all(|w| w[0].start <= w[1].start));
        assert_eq!(t.events_by_subject("ANATOMIA").len(), 2);
        assert_eq!(t.unique_subjects(), vec!["ANATOMIA", "CHIMICA", "FISICA"]);
        assert_eq!(t.available_groups(), vec!["A-L", "M-Z"]);
        assert_eq!(t.events_by_group("A-L").len(), 1);
        assert_eq!(t.common_events().len(), 2);
        let split = t.split_by_group();
        assert_eq!(split.keys().collect::<Vec<_>>(), vec!["A-L", "M-Z", "common"]);
        let from = t.events()[1].start;
        let to = t.events()[2].start;
        assert_eq!(t.events_in_range(from, to).len(), 2);
        assert!(!t.fetch_successful());
        assert!(t.endpoint_used().is_none());
    }

    #[test]
    fn test_fetch_outcome_transient() {
        let failure = |kind| AttemptFailure {
            endpoint: "/x".into(),
            kind,
            message: String::new(),
        };
        let shape_only = FetchOutcome::Exhausted {
            attempts: vec![failure(AttemptFailureKind::Shape), failure(AttemptFailureKind::Parse)],
        };
        assert!(!shape_only.is_transient());
        let with_timeout = FetchOutcome::Exhausted {
            attempts: vec![failure(AttemptFailureKind::Shape), failure(AttemptFailureKind::Timeout)],
        };
        assert!(with_timeout.is_transient());
        let missing_path = FetchOutcome::Exhausted {
            attempts: vec![failure(AttemptFailureKind::NotFound), failure(AttemptFailureKind::Shape)],
        };
        assert!(!missing_path.is_transient());
    }
}
