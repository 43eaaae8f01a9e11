//! Endpoint fallback fetch: one (year, curriculum) request against every
//! language-variant endpoint until one returns a valid payload.
//!
//! - Builds the query (`anno`, `curricula`, `start`, `end`)
//! - Validates, decodes and sorts the payload, then hashes the decoded events
//! - Never fails on upstream problems: an exhausted fetch is an empty, unsuccessful result

use crate::domain::decoder::{decode_events, validate_payload};
use crate::domain::fingerprint::content_hash;
use crate::domain::{
    AttemptFailure, AttemptFailureKind, Curriculum, CurriculumTimetable, DomainError, FetchOutcome,
    FetchReport, TermWindow, TimetableEvent,
};
use crate::ports::HttpPort;
use crate::shared::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Schedule endpoints, Italian site first. They serve the same data.
pub const TIMETABLE_ENDPOINTS: [&str; 2] = [
    "/orario-lezioni/@@orario_reale_json",
    "/timetable/@@orario_reale_json",
];

/// Events plus fetch metadata for one request.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub events: Vec<TimetableEvent>,
    pub report: FetchReport,
}

impl FetchResult {
    pub fn fetch_successful(&self) -> bool {
        self.report.fetch_successful()
    }

    pub fn endpoint_used(&self) -> Option<&str> {
        self.report.endpoint_used()
    }

    pub fn into_curriculum_timetable(self, curriculum: Curriculum) -> CurriculumTimetable {
        CurriculumTimetable::new(curriculum, self.events).with_report(self.report)
    }
}

/// Fallback fetcher. Shares one HTTP client across concurrent fetches.
pub struct TimetableFetcher {
    http: Arc<dyn HttpPort>,
    endpoints: Vec<String>,
    request_timeout: Duration,
}

impl TimetableFetcher {
    pub fn new(http: Arc<dyn HttpPort>) -> Self {
        Self {
            http,
            endpoints: TIMETABLE_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Replace the candidate endpoint paths (tried in the given order).
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Upper bound for each individual request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// URL and query parameters for one candidate endpoint.
    ///
    /// An absent (or unfiltered) curriculum sends an empty `curricula` parameter.
    pub fn build_request(
        course_site_url: &str,
        endpoint: &str,
        year: u32,
        window: &TermWindow,
        curriculum: Option<&Curriculum>,
    ) -> (String, Vec<(&'static str, String)>) {
        let url = format!("{}{}", course_site_url.trim_end_matches('/'), endpoint);
        let (start, end) = window.api_params();
        let params = vec![
            ("anno", year.to_string()),
            (
                "curricula",
                curriculum.map(|c| c.code.clone()).unwrap_or_default(),
            ),
            ("start", start),
            ("end", end),
        ];
        (url, params)
    }

    /// Fetch one (year, curriculum) timetable.
    ///
    /// # Errors
    /// Only `DomainError::InvalidArgument` for an empty `course_site_url`.
    /// Upstream failures are reported through `FetchOutcome::Exhausted`.
    pub async fn fetch(
        &self,
        course_site_url: &str,
        year: u32,
        window: &TermWindow,
        curriculum: Option<&Curriculum>,
    ) -> Result<FetchResult, DomainError> {
        if course_site_url.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "course_site_url cannot be empty".to_string(),
            ));
        }
        let curriculum_code = curriculum.map(|c| c.code.as_str()).unwrap_or("");
        debug!(
            year,
            curriculum = curriculum_code,
            date_range = %window,
            "fetching timetable"
        );

        let mut attempts = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let (url, params) = Self::build_request(course_site_url, endpoint, year, window, curriculum);
            debug!(endpoint = %endpoint, "trying endpoint");
            match self.try_endpoint(&url, &params).await {
                Ok(events) => {
                    info!(
                        year,
                        curriculum = curriculum_code,
                        events_count = events.len(),
                        endpoint = %endpoint,
                        "timetable fetched"
                    );
                    let hash = content_hash(&events);
                    return Ok(FetchResult {
                        events,
                        report: FetchReport {
                            outcome: FetchOutcome::Fetched {
                                endpoint: endpoint.clone(),
                            },
                            content_hash: Some(hash),
                            window: *window,
                        },
                    });
                }
                Err((kind, message)) => {
                    warn!(endpoint = %endpoint, kind = ?kind, error = %message, "endpoint failed");
                    attempts.push(AttemptFailure {
                        endpoint: endpoint.clone(),
                        kind,
                        message,
                    });
                }
            }
        }

        warn!(year, curriculum = curriculum_code, "no timetable found");
        Ok(FetchResult {
            events: Vec::new(),
            report: FetchReport {
                outcome: FetchOutcome::Exhausted { attempts },
                content_hash: None,
                window: *window,
            },
        })
    }

    async fn try_endpoint(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<Vec<TimetableEvent>, (AttemptFailureKind, String)> {
        let body = match tokio::time::timeout(self.request_timeout, self.http.get(url, params)).await {
            Err(_) => {
                return Err((
                    AttemptFailureKind::Timeout,
                    format!("no response within {} ms", self.request_timeout.as_millis()),
                ));
            }
            Ok(Err(e)) => {
                let kind = match e {
                    DomainError::Timeout { .. } => AttemptFailureKind::Timeout,
                    DomainError::HttpStatus { status, .. } if (400..500).contains(&status) => {
                        AttemptFailureKind::NotFound
                    }
                    _ => AttemptFailureKind::Transport,
                };
                return Err((kind, e.to_string()));
            }
            Ok(Ok(body)) => body,
        };

        let payload: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| (AttemptFailureKind::Parse, e.to_string()))?;
        let items = validate_payload(&payload).map_err(|e| (AttemptFailureKind::Shape, e.to_string()))?;
        Ok(decode_events(items))
    }
}
