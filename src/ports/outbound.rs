//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{CacheEntry, Curriculum, DomainError};

/// Generic request/response HTTP client.
///
/// Implementations must fail on non-2xx statuses and must tolerate many
/// requests in flight at once (one shared instance serves every fetch).
#[async_trait::async_trait]
pub trait HttpPort: Send + Sync {
    /// GET `url` with query `params`; returns the body text.
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String, DomainError>;

    /// POST `form` as `application/x-www-form-urlencoded`; returns the body text.
    async fn post(&self, url: &str, form: &[(&str, String)]) -> Result<String, DomainError>;
}

/// Curriculum metadata for a course site.
#[async_trait::async_trait]
pub trait CurriculaPort: Send + Sync {
    /// Curricula offered by the course at `course_site_url`. May be empty.
    async fn list_curricula(&self, course_site_url: &str) -> Result<Vec<Curriculum>, DomainError>;
}

/// Fetch cache. Maps a request fingerprint to what was last fetched for it.
#[async_trait::async_trait]
pub trait FetchCachePort: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError>;

    async fn put(&self, fingerprint: &str, entry: CacheEntry) -> Result<(), DomainError>;

    /// Persist pending writes.
    async fn flush(&self) -> Result<(), DomainError>;
}
