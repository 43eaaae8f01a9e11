//! Curriculum metadata from the course site's `@@available_curricula` JSON.
//!
//! Tries the language-variant paths in order; the first one returning a JSON
//! array wins. Any failure ends in an empty list, never an error.

use crate::domain::{Curriculum, DomainError};
use crate::ports::{CurriculaPort, HttpPort};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CURRICULA_ENDPOINTS: [&str; 2] = [
    "/orario-lezioni/@@available_curricula",
    "/timetable/@@available_curricula",
];

#[derive(Debug, Deserialize)]
struct RawCurriculum {
    value: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    selected: bool,
}

pub struct HttpCurriculaSource {
    http: Arc<dyn HttpPort>,
}

impl HttpCurriculaSource {
    pub fn new(http: Arc<dyn HttpPort>) -> Self {
        Self { http }
    }

    /// Parse one response body. Entries without a code are dropped.
    pub fn parse(body: &str) -> Result<Vec<Curriculum>, DomainError> {
        let raw: Vec<RawCurriculum> =
            serde_json::from_str(body).map_err(|e| DomainError::Parse(e.to_string()))?;
        let mut curricula: Vec<Curriculum> = Vec::with_capacity(raw.len());
        for r in raw {
            let code = r.value.trim();
            if code.is_empty() {
                continue;
            }
            let label = if r.label.trim().is_empty() {
                code
            } else {
                r.label.trim()
            };
            let mut curriculum = Curriculum::new(code, label);
            curriculum.selected = r.selected;
            if !curricula.contains(&curriculum) {
                curricula.push(curriculum);
            }
        }
        Ok(curricula)
    }
}

#[async_trait::async_trait]
impl CurriculaPort for HttpCurriculaSource {
    async fn list_curricula(&self, course_site_url: &str) -> Result<Vec<Curriculum>, DomainError> {
        if course_site_url.trim().is_empty() {
            return Err(DomainError::InvalidArgument(
                "course_site_url cannot be empty".to_string(),
            ));
        }
        let base = course_site_url.trim_end_matches('/');
        for endpoint in CURRICULA_ENDPOINTS {
            let url = format!("{}{}", base, endpoint);
            debug!(url = %url, "fetching curricula");
            match self.http.get(&url, &[]).await {
                Ok(body) => match Self::parse(&body) {
                    Ok(curricula) => {
                        info!(count = curricula.len(), endpoint, "curricula loaded");
                        return Ok(curricula);
                    }
                    Err(e) => warn!(endpoint, error = %e, "curricula payload rejected"),
                },
                Err(e) => warn!(endpoint, error = %e, "curricula endpoint failed"),
            }
        }
        warn!(course = base, "no curricula found");
        Ok(Vec::new())
    }
}
