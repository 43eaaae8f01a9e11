//! Application configuration. Course site, years, curricula, paths.

use crate::domain::{CourseKind, Curriculum, DomainError};
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::PathBuf;

/// Per-request timeout when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Directory for the fetch cache when none is configured.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Course duration assumed when neither years nor duration are configured.
pub const DEFAULT_COURSE_DURATION: u32 = 3;

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Course site base URL, e.g. https://corsi.unibo.it/laurea/Informatica. Read from TIMETABLE_SYNC_COURSE_SITE_URL.
    #[serde(default)]
    pub course_site_url: Option<String>,

    /// Years of study, comma separated ("1,2,3"). Read from TIMETABLE_SYNC_YEARS.
    #[serde(default)]
    pub years: Option<String>,

    /// Curricula as comma separated `code[:label]`. Read from TIMETABLE_SYNC_CURRICULA.
    #[serde(default)]
    pub curricula: Option<String>,

    /// Course length in years; drives the course kind and default years.
    #[serde(default)]
    pub course_duration: Option<u32>,

    /// Widen the term window by a year on each side (default true).
    #[serde(default)]
    pub widen_range: Option<bool>,

    /// Reference date (YYYY-MM-DD). Invalid values fall back to today.
    #[serde(default)]
    pub reference_date: Option<String>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Holds the fetch cache. Defaults to ./data.
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Write the filtered events to this CSV file after fetching.
    #[serde(default)]
    pub export_csv: Option<String>,

    /// Cohort filter applied before export.
    #[serde(default)]
    pub group: Option<String>,

    /// Prompt for choices instead of running from config (default true).
    #[serde(default)]
    pub interactive: Option<bool>,

    /// Replay HTTP from a fixture manifest instead of the network.
    #[serde(default)]
    pub fixture_manifest: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        c = c.add_source(config::Environment::with_prefix("TIMETABLE_SYNC"));
        if let Ok(path) = std::env::var("TIMETABLE_SYNC_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c.build()?.try_deserialize()
    }

    pub fn course_site_url(&self) -> Option<String> {
        self.course_site_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches('/').to_string())
    }

    /// Course kind from the configured duration, if it names a known kind.
    pub fn course_kind(&self) -> Option<CourseKind> {
        CourseKind::from_duration(self.course_duration_or_default())
    }

    pub fn course_duration_or_default(&self) -> u32 {
        self.course_duration.unwrap_or(DEFAULT_COURSE_DURATION)
    }

    /// Years to fetch. Explicit list first, otherwise every year of the course.
    pub fn years_or_default(&self) -> Result<Vec<u32>, DomainError> {
        match self.years.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(list) => parse_years(list),
            None => Ok(match self.course_kind() {
                Some(kind) => kind.years_of_study(),
                None => (1..=self.course_duration_or_default().max(1)).collect(),
            }),
        }
    }

    /// Configured curricula. Empty when none are listed.
    pub fn curricula_or_default(&self) -> Result<Vec<Curriculum>, DomainError> {
        match self.curricula.as_deref() {
            Some(list) => parse_curricula(list),
            None => Ok(Vec::new()),
        }
    }

    pub fn widen_range_or_default(&self) -> bool {
        self.widen_range.unwrap_or(true)
    }

    /// Parsed reference date. `None` (meaning today) when unset or invalid.
    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.reference_date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
    }

    pub fn request_timeout_secs_or_default(&self) -> u64 {
        self.request_timeout_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    pub fn data_dir_or_default(&self) -> PathBuf {
        PathBuf::from(self.data_dir.as_deref().unwrap_or(DEFAULT_DATA_DIR))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir_or_default().join("fetch_cache.json")
    }

    pub fn interactive_or_default(&self) -> bool {
        self.interactive.unwrap_or(true)
    }
}

/// Parse "1, 2,3" into sorted, deduplicated years. Zero is rejected.
pub fn parse_years(list: &str) -> Result<Vec<u32>, DomainError> {
    let mut years = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let year: u32 = part
            .parse()
            .map_err(|_| DomainError::Config(format!("invalid year '{}'", part)))?;
        if year == 0 {
            return Err(DomainError::Config("years start at 1".to_string()));
        }
        years.push(year);
    }
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

/// Parse "A:First track, B" into curricula. A missing label reuses the code.
pub fn parse_curricula(list: &str) -> Result<Vec<Curriculum>, DomainError> {
    let mut curricula: Vec<Curriculum> = Vec::new();
    for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (code, label) = match part.split_once(':') {
            Some((code, label)) => (code.trim(), label.trim()),
            None => (part, part),
        };
        if code.is_empty() {
            return Err(DomainError::Config(format!("curriculum '{}' has no code", part)));
        }
        let curriculum = Curriculum::new(code, if label.is_empty() { code } else { label });
        if !curricula.contains(&curriculum) {
            curricula.push(curriculum);
        }
    }
    Ok(curricula)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_years() {
        assert_eq!(parse_years(" 2,1 ,2,").unwrap(), vec![1, 2]);
        assert!(parse_years("1,x").is_err());
        assert!(parse_years("0").is_err());
    }

    #[test]
    fn test_parse_curricula() {
        let c = parse_curricula("A:Track A, B ,A:dup").unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].code, "A");
        assert_eq!(c[0].label, "Track A");
        assert_eq!(c[1].label, "B");
        assert!(parse_curricula(":nolabel").is_err());
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert!(cfg.widen_range_or_default());
        assert!(cfg.interactive_or_default());
        assert_eq!(cfg.request_timeout_secs_or_default(), DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(cfg.years_or_default().unwrap(), vec![1, 2, 3]);
        assert!(cfg.curricula_or_default().unwrap().is_empty());
        assert!(cfg.course_site_url().is_none());
        assert!(cfg.reference_date().is_none());
    }

    #[test]
    fn test_years_follow_course_kind() {
        let cfg = AppConfig {
            course_duration: Some(2),
            ..Default::default()
        };
        assert_eq!(cfg.course_kind(), Some(CourseKind::Master));
        assert_eq!(cfg.years_or_default().unwrap(), vec![1, 2]);

        let cfg = AppConfig {
            course_duration: Some(5),
            years: Some("4".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.years_or_default().unwrap(), vec![4]);
    }

    #[test]
    fn test_reference_date_and_url() {
        let cfg = AppConfig {
            reference_date: Some("2026-02-15".to_string()),
            course_site_url: Some(" https://corsi.example.it/laurea/X/ ".to_string()),
            ..Default::default()
        };
        assert_eq!(cfg.reference_date(), NaiveDate::from_ymd_opt(2026, 2, 15));
        assert_eq!(cfg.course_site_url().as_deref(), Some("https://corsi.example.it/laurea/X"));

        let cfg = AppConfig {
            reference_date: Some("15/02/2026".to_string()),
            ..Default::default()
        };
        assert!(cfg.reference_date().is_none());
    }
}
