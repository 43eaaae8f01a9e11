//! One aggregation session: curricula lookup, fetch, change tracking, export.
//!
//! Shared by the interactive and batch front ends; they only differ in how
//! the [`SessionRequest`] is filled in.

use crate::adapters::export::write_csv;
use crate::domain::{
    Curriculum, DomainError, EventFilter, TermWindow, TimetableCollection, TimetableEvent,
};
use crate::ports::CurriculaPort;
use crate::usecases::change_tracker::{ChangeReport, ChangeTracker};
use crate::usecases::timetable_service::TimetableService;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// What to fetch and what to do with it.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub course_site_url: String,
    /// Empty means unfiltered.
    pub curricula: Vec<Curriculum>,
    pub years: Vec<u32>,
    pub widen: bool,
    pub reference: Option<NaiveDate>,
    /// Cohort filter for the export; common events are always kept.
    pub group: Option<String>,
    pub export_csv: Option<PathBuf>,
}

#[derive(Debug)]
pub struct SessionOutcome {
    pub window: TermWindow,
    pub collection: TimetableCollection,
    /// Empty when change tracking is disabled.
    pub changes: Vec<ChangeReport>,
    /// Path and row count of the CSV export, if one was written.
    pub exported: Option<(PathBuf, usize)>,
}

pub struct SessionService {
    timetables: Arc<TimetableService>,
    curricula: Arc<dyn CurriculaPort>,
    tracker: Option<ChangeTracker>,
}

impl SessionService {
    pub fn new(
        timetables: Arc<TimetableService>,
        curricula: Arc<dyn CurriculaPort>,
        tracker: Option<ChangeTracker>,
    ) -> Self {
        Self {
            timetables,
            curricula,
            tracker,
        }
    }

    /// Curricula offered by the course. Lookup failures yield an empty list.
    pub async fn available_curricula(&self, course_site_url: &str) -> Vec<Curriculum> {
        match self.curricula.list_curricula(course_site_url).await {
            Ok(list) => list,
            Err(e) => {
                warn!(course = course_site_url, error = %e, "curricula lookup failed");
                Vec::new()
            }
        }
    }

    pub async fn run(&self, request: &SessionRequest) -> Result<SessionOutcome, DomainError> {
        let window = TermWindow::resolve(request.reference, request.widen);
        let collection = self
            .timetables
            .get_timetables_in(
                &request.course_site_url,
                &request.curricula,
                &request.years,
                &window,
            )
            .await?;

        let changes = match &self.tracker {
            Some(tracker) => tracker.track(&request.course_site_url, &collection).await?,
            None => Vec::new(),
        };

        let exported = match &request.export_csv {
            Some(path) => {
                let rows = self
                    .export(&collection, request.group.as_deref(), path)
                    .await?;
                Some((path.clone(), rows))
            }
            None => None,
        };

        info!(
            total_events = collection.total_events(),
            changed = changes.iter().filter(|c| c.status.is_change()).count(),
            "session finished"
        );
        Ok(SessionOutcome {
            window,
            collection,
            changes,
            exported,
        })
    }

    /// Write the chronological (optionally cohort-filtered) events as CSV.
    pub async fn export(
        &self,
        collection: &TimetableCollection,
        group: Option<&str>,
        path: &Path,
    ) -> Result<usize, DomainError> {
        let events = export_selection(collection, group);
        write_csv(path, &events).await
    }
}

/// Chronological events to export. With a group, events of other cohorts are
/// dropped; events without a cohort apply to everyone and stay.
pub fn export_selection<'a>(
    collection: &'a TimetableCollection,
    group: Option<&str>,
) -> Vec<&'a TimetableEvent> {
    let events = collection.events_chronological(None, None);
    match group {
        Some(group) => {
            let filter = EventFilter::new().group(group);
            events
                .into_iter()
                .filter(|e| e.group_id().is_none() || filter.matches(e))
                .collect()
        }
        None => events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::curricula::StaticCurricula;
    use crate::adapters::http::FixtureHttpClient;
    use crate::adapters::persistence::cache_json::JsonFetchCache;
    use crate::usecases::change_tracker::ChangeStatus;
    use crate::usecases::timetable_fetcher::TIMETABLE_ENDPOINTS;

    const SITE: &str = "https://corsi.example.it/laurea/Informatica";

    const BODY: &str = r#"[
        {"title": "ALGEBRA", "start": "2026-03-01T09:00:00", "end": "2026-03-01T11:00:00", "cod_sdoppiamento": "08793--A-L"},
        {"title": "ALGEBRA", "start": "2026-03-01T11:00:00", "end": "2026-03-01T13:00:00", "cod_sdoppiamento": "08793--M-Z"},
        {"title": "FISICA", "start": "2026-03-02T09:00:00", "end": "2026-03-02T11:00:00"}
    ]"#;

    fn service(dir: &std::path::Path) -> SessionService {
        let http = Arc::new(
            FixtureHttpClient::new().with_route(format!("{}{}", SITE, TIMETABLE_ENDPOINTS[0]), BODY),
        );
        let cache = Arc::new(JsonFetchCache::new(dir.join("cache.json")));
        SessionService::new(
            Arc::new(TimetableService::new(http)),
            Arc::new(StaticCurricula::new(vec![Curriculum::new("A", "A")])),
            Some(ChangeTracker::new(cache)),
        )
    }

    fn request(dir: &std::path::Path) -> SessionRequest {
        SessionRequest {
            course_site_url: SITE.to_string(),
            curricula: vec![Curriculum::new("A", "A")],
            years: vec![1],
            widen: true,
            reference: NaiveDate::from_ymd_opt(2026, 2, 15),
            group: Some("A-L".to_string()),
            export_csv: Some(dir.join("out.csv")),
        }
    }

    #[tokio::test]
    async fn test_session_fetches_tracks_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        assert_eq!(service.available_curricula(SITE).await.len(), 1);

        let outcome = service.run(&request(dir.path())).await.unwrap();
        assert_eq!(outcome.collection.total_events(), 3);
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.changes[0].status, ChangeStatus::New);
        // A-L plus the common FISICA lecture.
        let (path, rows) = outcome.exported.unwrap();
        assert_eq!(rows, 2);
        let csv = std::fs::read_to_string(path).unwrap();
        assert!(!csv.contains("M-Z"));

        let again = service.run(&request(dir.path())).await.unwrap();
        assert_eq!(again.changes[0].status, ChangeStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_session_without_tracker_or_export() {
        let http = Arc::new(FixtureHttpClient::new());
        let service = SessionService::new(
            Arc::new(TimetableService::new(http)),
            Arc::new(StaticCurricula::default()),
            None,
        );
        let dir = tempfile::tempdir().unwrap();
        let mut req = request(dir.path());
        req.export_csv = None;
        let outcome = service.run(&req).await.unwrap();
        assert!(outcome.changes.is_empty());
        assert!(outcome.exported.is_none());
        assert!(!outcome.collection.curriculum(1, "A").unwrap().fetch_successful());
    }
}
