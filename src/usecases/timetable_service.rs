//! Fetch orchestration: every (year, curriculum) pair concurrently, folded into
//! one collection.
//!
//! - One shared fetcher (and HTTP client) serves every in-flight request
//! - Results land in arbitrary order; the fold is the only mutation point
//! - Duplicate (year, curriculum) pairs: last result to land wins

use crate::domain::{
    Curriculum, CurriculumTimetable, DomainError, TermWindow, TimetableCollection,
};
use crate::ports::HttpPort;
use crate::usecases::timetable_fetcher::TimetableFetcher;
use chrono::NaiveDate;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrator. Cheap to share behind an `Arc`.
pub struct TimetableService {
    fetcher: TimetableFetcher,
}

impl TimetableService {
    pub fn new(http: Arc<dyn HttpPort>) -> Self {
        Self::with_fetcher(TimetableFetcher::new(http))
    }

    pub fn with_fetcher(fetcher: TimetableFetcher) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &TimetableFetcher {
        &self.fetcher
    }

    /// Fetch every (year, curriculum) pair and assemble the collection.
    ///
    /// An empty `curricula` slice fetches each year unfiltered. The date window
    /// is resolved once from `reference` (today when `None`) and shared by all
    /// requests.
    ///
    /// # Errors
    /// `DomainError::InvalidArgument` for an empty course site URL. Upstream
    /// failures never error; they show up as unsuccessful curriculum timetables.
    pub async fn get_timetables(
        &self,
        course_site_url: &str,
        curricula: &[Curriculum],
        years: &[u32],
        widen: bool,
        reference: Option<NaiveDate>,
    ) -> Result<TimetableCollection, DomainError> {
        let window = TermWindow::resolve(reference, widen);
        self.get_timetables_in(course_site_url, curricula, years, &window)
            .await
    }

    /// Same as [`get_timetables`](Self::get_timetables) with an explicit window.
    pub async fn get_timetables_in(
        &self,
        course_site_url: &str,
        curricula: &[Curriculum],
        years: &[u32],
        window: &TermWindow,
    ) -> Result<TimetableCollection, DomainError> {
        if course_site_url.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "course_site_url cannot be empty".to_string(),
            ));
        }

        let unfiltered = [Curriculum::unfiltered()];
        let curricula = if curricula.is_empty() {
            &unfiltered[..]
        } else {
            curricula
        };

        let pairs: Vec<(u32, &Curriculum)> = years
            .iter()
            .flat_map(|&year| curricula.iter().map(move |c| (year, c)))
            .collect();
        info!(
            course = course_site_url,
            years = years.len(),
            curricula = curricula.len(),
            requests = pairs.len(),
            date_range = %window,
            "fetching timetables"
        );

        let mut in_flight: FuturesUnordered<_> = pairs
            .into_iter()
            .map(|(year, curriculum)| async move {
                let result = self
                    .fetcher
                    .fetch(course_site_url, year, window, Some(curriculum))
                    .await;
                (year, curriculum, result)
            })
            .collect();

        let mut collection = TimetableCollection::new();
        while let Some((year, curriculum, result)) = in_flight.next().await {
            let timetable = result?.into_curriculum_timetable(curriculum.clone());
            debug!(
                year,
                curriculum = %curriculum.code,
                events_count = timetable.len(),
                successful = timetable.fetch_successful(),
                "timetable landed"
            );
            collection.add_curriculum_timetable(year, timetable);
        }

        info!(
            years = collection.years().len(),
            total_events = collection.total_events(),
            "timetables assembled"
        );
        Ok(collection)
    }

    /// Fetch one year for one curriculum (unfiltered when `None`).
    pub async fn fetch_year(
        &self,
        course_site_url: &str,
        year: u32,
        curriculum: Option<&Curriculum>,
        window: &TermWindow,
    ) -> Result<CurriculumTimetable, DomainError> {
        let curriculum = curriculum.cloned().unwrap_or_else(Curriculum::unfiltered);
        let result = self
            .fetcher
            .fetch(course_site_url, year, window, Some(&curriculum))
            .await?;
        Ok(result.into_curriculum_timetable(curriculum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http::FixtureHttpClient;
    use crate::usecases::timetable_fetcher::TIMETABLE_ENDPOINTS;
    use std::time::Duration;

    const SITE: &str = "https://corsi.example.it/laurea/Informatica";

    fn reference() -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2026, 2, 15)
    }

    fn it_url() -> String {
        format!("{}{}", SITE, TIMETABLE_ENDPOINTS[0])
    }

    fn event(title: &str, day: u32) -> String {
        format!(
            r#"{{"title": "{}", "start": "2026-03-{:02}T09:00:00", "end": "2026-03-{:02}T11:00:00"}}"#,
            title, day, day
        )
    }

    #[tokio::test]
    async fn test_cross_product_lands_in_collection() {
        let http = FixtureHttpClient::new()
            .with_query_route(it_url(), &[("anno", "1"), ("curricula", "A")], format!("[{}]", event("A1", 1)))
            .with_query_route(
                it_url(),
                &[("anno", "1"), ("curricula", "B")],
                format!("[{},{}]", event("B1", 3), event("B1", 2)),
            )
            .with_query_route(it_url(), &[("anno", "2"), ("curricula", "A")], "[]")
            .with_query_route(it_url(), &[("anno", "2"), ("curricula", "B")], format!("[{}]", event("B2", 4)));
        let service = TimetableService::new(Arc::new(http));
        let curricula = [Curriculum::new("A", "A"), Curriculum::new("B", "B")];

        let collection = service
            .get_timetables(SITE, &curricula, &[1, 2], true, reference())
            .await
            .unwrap();

        assert_eq!(collection.years(), vec![1, 2]);
        for year in [1, 2] {
            assert_eq!(collection.year(year).unwrap().len(), 2);
        }
        assert_eq!(collection.total_events(), 4);
        let b1 = collection.curriculum(1, "B").unwrap();
        assert!(b1.events().windows(2).all(|w| w[0].start <= w[1].start));
        assert!(collection.curriculum(2, "A").unwrap().fetch_successful());
    }

    #[tokio::test]
    async fn test_no_curricula_fetches_unfiltered() {
        let http = Arc::new(
            FixtureHttpClient::new().with_query_route(it_url(), &[("curricula", "")], format!("[{}]", event("X", 5))),
        );
        let service = TimetableService::new(http.clone());
        let collection = service
            .get_timetables(SITE, &[], &[1], false, reference())
            .await
            .unwrap();

        assert_eq!(collection.total_events(), 1);
        assert!(collection.curriculum(1, "").is_some());
        let requests = http.requests();
        let sent = &requests[0];
        assert!(sent.params.contains(&("curricula".to_string(), String::new())));
        assert!(sent.params.contains(&("start".to_string(), "2025-09-01".to_string())));
    }

    #[tokio::test]
    async fn test_collection_order_is_independent_of_request_order() {
        let http = FixtureHttpClient::new()
            .with_query_route(it_url(), &[("anno", "1")], format!("[{}]", event("FIRST", 2)))
            .with_query_route(it_url(), &[("anno", "2")], format!("[{}]", event("SECOND", 1)))
            .with_delay(it_url(), Duration::from_millis(1));
        let service = TimetableService::new(Arc::new(http));
        let collection = service
            .get_timetables(SITE, &[], &[2, 1], true, reference())
            .await
            .unwrap();
        let titles: Vec<_> = collection.flatten().iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, vec!["FIRST", "SECOND"]);
    }

    #[tokio::test]
    async fn test_failed_pairs_are_empty_not_errors() {
        let service = TimetableService::new(Arc::new(FixtureHttpClient::new()));
        let collection = service
            .get_timetables(SITE, &[Curriculum::new("A", "A")], &[1, 2], true, reference())
            .await
            .unwrap();
        assert_eq!(collection.years(), vec![1, 2]);
        assert_eq!(collection.total_events(), 0);
        let t = collection.curriculum(2, "A").unwrap();
        assert!(!t.fetch_successful());
        assert!(t.endpoint_used().is_none());
    }

    #[tokio::test]
    async fn test_empty_site_fails_fast() {
        let http = Arc::new(FixtureHttpClient::new());
        let service = TimetableService::new(http.clone());
        let err = service
            .get_timetables("", &[], &[1], true, reference())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert!(http.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_year_defaults_to_unfiltered() {
        let http = Arc::new(FixtureHttpClient::new().with_route(it_url(), "[]"));
        let service = TimetableService::new(http);
        let window = TermWindow::resolve(reference(), true);
        let t = service.fetch_year(SITE, 3, None, &window).await.unwrap();
        assert!(t.curriculum.is_unfiltered());
        assert!(t.fetch_successful());
        assert!(!t.has_timetable());
    }
}
