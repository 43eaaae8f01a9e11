//! Change detection across runs.
//!
//! Compares each fetched curriculum's content hash with the cache entry for the
//! same request fingerprint, then records the new hash. Unsuccessful fetches are
//! reported but never overwrite what was cached before.

use crate::domain::fingerprint::request_fingerprint;
use crate::domain::{CacheEntry, DomainError, TimetableCollection};
use crate::ports::FetchCachePort;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    /// No previous entry for this request.
    New,
    Changed,
    Unchanged,
    /// Every endpoint failed; the cache was left alone.
    Unavailable,
}

impl ChangeStatus {
    /// New or changed content.
    pub fn is_change(self) -> bool {
        matches!(self, Self::New | Self::Changed)
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
            Self::Unavailable => "unavailable",
        };
        f.write_str(s)
    }
}

/// Outcome for one (year, curriculum) timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeReport {
    pub year: u32,
    pub curriculum: String,
    pub status: ChangeStatus,
    pub event_count: usize,
}

pub struct ChangeTracker {
    cache: Arc<dyn FetchCachePort>,
}

impl ChangeTracker {
    pub fn new(cache: Arc<dyn FetchCachePort>) -> Self {
        Self { cache }
    }

    /// Classify every timetable in `collection` and update the cache.
    ///
    /// Reports follow the collection's (year, curriculum) order. The cache is
    /// flushed once at the end.
    pub async fn track(
        &self,
        course_site_url: &str,
        collection: &TimetableCollection,
    ) -> Result<Vec<ChangeReport>, DomainError> {
        let mut reports = Vec::new();
        for (year, timetable) in collection.entries() {
            let code = timetable.curriculum.code.as_str();
            let (hash, endpoint, window) = match (timetable.report.as_ref(), timetable.content_hash()) {
                (Some(report), Some(hash)) if report.fetch_successful() => {
                    (hash, report.endpoint_used().unwrap_or_default(), report.window)
                }
                _ => {
                    warn!(year, curriculum = code, "timetable unavailable, cache untouched");
                    reports.push(ChangeReport {
                        year,
                        curriculum: code.to_string(),
                        status: ChangeStatus::Unavailable,
                        event_count: 0,
                    });
                    continue;
                }
            };

            let fingerprint = request_fingerprint(course_site_url, year, code, &window);
            let status = match self.cache.get(&fingerprint).await? {
                None => ChangeStatus::New,
                Some(previous) if previous.content_hash == hash => ChangeStatus::Unchanged,
                Some(_) => ChangeStatus::Changed,
            };
            if status != ChangeStatus::Unchanged {
                info!(year, curriculum = code, status = %status, events_count = timetable.len(), "timetable changed");
            }

            self.cache
                .put(
                    &fingerprint,
                    CacheEntry {
                        content_hash: hash.to_string(),
                        endpoint: endpoint.to_string(),
                        event_count: timetable.len(),
                        fetched_at: Utc::now(),
                    },
                )
                .await?;
            reports.push(ChangeReport {
                year,
                curriculum: code.to_string(),
                status,
                event_count: timetable.len(),
            });
        }
        self.cache.flush().await?;
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::cache_json::JsonFetchCache;
    use crate::domain::decoder::decode_events;
    use crate::domain::fingerprint::content_hash;
    use crate::domain::{
        Curriculum, CurriculumTimetable, FetchOutcome, FetchReport, TermWindow,
    };
    use chrono::NaiveDate;
    use serde_json::json;

    const SITE: &str = "https://corsi.example.it/laurea/X";

    fn window() -> TermWindow {
        TermWindow::containing(NaiveDate::from_ymd_opt(2026, 2, 15).unwrap(), true)
    }

    fn fetched(code: &str, start: &str) -> CurriculumTimetable {
        let events = decode_events(&[json!({"title": "ALGEBRA", "start": start, "end": "2026-03-01T12:00:00"})]);
        let hash = content_hash(&events);
        CurriculumTimetable::new(Curriculum::new(code, code), events).with_report(FetchReport {
            outcome: FetchOutcome::Fetched {
                endpoint: "/timetable/@@orario_reale_json".to_string(),
            },
            content_hash: Some(hash),
            window: window(),
        })
    }

    fn exhausted(code: &str) -> CurriculumTimetable {
        CurriculumTimetable::empty(Curriculum::new(code, code)).with_report(FetchReport {
            outcome: FetchOutcome::Exhausted { attempts: vec![] },
            content_hash: None,
            window: window(),
        })
    }

    fn collection(timetables: Vec<CurriculumTimetable>) -> TimetableCollection {
        let mut c = TimetableCollection::new();
        for t in timetables {
            c.add_curriculum_timetable(1, t);
        }
        c
    }

    #[tokio::test]
    async fn test_new_unchanged_changed() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(JsonFetchCache::new(dir.path().join("cache.json")));
        let tracker = ChangeTracker::new(cache);

        let first = tracker.track(SITE, &collection(vec![fetched("A", "2026-03-01T09:00:00")])).await.unwrap();
        assert_eq!(first[0].status, ChangeStatus::New);

        let again = tracker.track(SITE, &collection(vec![fetched("A", "2026-03-01T09:00:00")])).await.unwrap();
        assert_eq!(again[0].status, ChangeStatus::Unchanged);

        let moved = tracker.track(SITE, &collection(vec![fetched("A", "2026-03-01T10:00:00")])).await.unwrap();
        assert_eq!(moved[0].status, ChangeStatus::Changed);
        assert_eq!(moved[0].event_count, 1);
    }

    #[tokio::test]
    async fn test_swapped_parallel_sections_are_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = ChangeTracker::new(Arc::new(JsonFetchCache::new(dir.path().join("cache.json"))));
        let section = |group: &str| {
            json!({"title": "RETI", "start": "2026-03-02T09:00:00", "end": "2026-03-02T11:00:00", "docente": group, "cod_sdoppiamento": format!("1--{}", group)})
        };
        let timetable = |items: Vec<serde_json::Value>| {
            let events = decode_events(&items);
            let hash = content_hash(&events);
            CurriculumTimetable::new(Curriculum::new("A", "A"), events).with_report(FetchReport {
                outcome: FetchOutcome::Fetched {
                    endpoint: "/timetable/@@orario_reale_json".to_string(),
                },
                content_hash: Some(hash),
                window: window(),
            })
        };

        let first = tracker
            .track(SITE, &collection(vec![timetable(vec![section("CL.A"), section("CL.B")])]))
            .await
            .unwrap();
        assert_eq!(first[0].status, ChangeStatus::New);
        let swapped = tracker
            .track(SITE, &collection(vec![timetable(vec![section("CL.B"), section("CL.A")])]))
            .await
            .unwrap();
        assert_eq!(swapped[0].status, ChangeStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_unavailable_keeps_previous_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(JsonFetchCache::new(dir.path().join("cache.json")));
        let tracker = ChangeTracker::new(cache.clone());

        tracker.track(SITE, &collection(vec![fetched("A", "2026-03-01T09:00:00")])).await.unwrap();
        let down = tracker.track(SITE, &collection(vec![exhausted("A")])).await.unwrap();
        assert_eq!(down[0].status, ChangeStatus::Unavailable);

        let back = tracker.track(SITE, &collection(vec![fetched("A", "2026-03-01T09:00:00")])).await.unwrap();
        assert_eq!(back[0].status, ChangeStatus::Unchanged);
    }

    #[tokio::test]
    async fn test_cache_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let tracker = ChangeTracker::new(Arc::new(JsonFetchCache::new(&path)));
        tracker.track(SITE, &collection(vec![fetched("B", "2026-03-01T09:00:00")])).await.unwrap();

        let reloaded = JsonFetchCache::new(&path);
        reloaded.load().await.unwrap();
        let tracker = ChangeTracker::new(Arc::new(reloaded));
        let reports = tracker.track(SITE, &collection(vec![fetched("B", "2026-03-01T09:00:00")])).await.unwrap();
        assert_eq!(reports[0].status, ChangeStatus::Unchanged);
    }
}
