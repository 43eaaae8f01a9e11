//! Content hashes and request fingerprints for change detection.

use super::academic_year::TermWindow;
use super::entities::TimetableEvent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What was last seen for one request fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub content_hash: String,
    pub endpoint: String,
    pub event_count: usize,
    pub fetched_at: DateTime<Utc>,
}

/// Fields that make two event batches materially different.
///
/// Field order doubles as the canonical sort key; timestamps are formatted so
/// that string order is chronological.
#[derive(Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct HashedEvent<'a> {
    start: String,
    end: String,
    title: &'a str,
    module_code: Option<&'a str>,
    professor: Option<&'a str>,
    teaching_period: Option<&'a str>,
    is_remote: bool,
}

impl<'a> From<&'a TimetableEvent> for HashedEvent<'a> {
    fn from(e: &'a TimetableEvent) -> Self {
        Self {
            start: e.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            end: e.end.format("%Y-%m-%dT%H:%M:%S").to_string(),
            title: &e.title,
            module_code: e.module_code.as_deref(),
            professor: e.professor.as_deref(),
            teaching_period: e.teaching_period.as_deref(),
            is_remote: e.is_remote,
        }
    }
}

/// SHA-256 (hex) over the significant fields of a decoded batch.
///
/// Rows are put in canonical order first, so neither upstream key order nor the
/// arrival order of events sharing a start time affects the result.
pub fn content_hash(events: &[TimetableEvent]) -> String {
    let mut hashed: Vec<HashedEvent<'_>> = events.iter().map(HashedEvent::from).collect();
    hashed.sort();
    // Serializing plain strings, bools and options cannot fail.
    let canonical = serde_json::to_string(&hashed).unwrap_or_default();
    sha256_hex(canonical.as_bytes())
}

/// Identifies one (course, year, curriculum, window) request across runs.
pub fn request_fingerprint(
    course_site_url: &str,
    year: u32,
    curriculum_code: &str,
    window: &TermWindow,
) -> String {
    let (start, end) = window.api_params();
    let key = format!(
        "{}\n{}\n{}\n{}\n{}",
        course_site_url.trim_end_matches('/'),
        year,
        curriculum_code,
        start,
        end
    );
    sha256_hex(key.as_bytes())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
