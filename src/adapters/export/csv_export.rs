//! CSV export for timetables. Uses the `csv` crate for quoting and escaping.
//!
//! Format: `Start;End;Title;Group;Professor;Classroom;Remote` (semicolon-delimited,
//! opens cleanly in spreadsheet tools with an Italian locale).

use crate::domain::{DomainError, TimetableEvent};
use std::path::Path;
use tracing::info;

const HEADER: [&str; 7] = [
    "Start",
    "End",
    "Title",
    "Group",
    "Professor",
    "Classroom",
    "Remote",
];

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Convert events to a CSV string with a header row.
///
/// Rows follow the order of `events`; callers pass a chronological slice.
pub fn events_to_csv<'a, I>(events: I) -> Result<String, DomainError>
where
    I: IntoIterator<Item = &'a TimetableEvent>,
{
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(Vec::new());
    wtr.write_record(HEADER).map_err(export_error)?;

    for event in events {
        let classroom = event
            .primary_classroom()
            .map(ToString::to_string)
            .unwrap_or_default();
        // Titles occasionally carry line breaks upstream.
        let title = event.title.replace(['\n', '\r'], " ");
        wtr.write_record([
            event.start.format(TIME_FORMAT).to_string(),
            event.end.format(TIME_FORMAT).to_string(),
            title,
            event.group_id().unwrap_or_default().to_string(),
            event.professor.clone().unwrap_or_default(),
            classroom,
            if event.is_remote { "yes" } else { "no" }.to_string(),
        ])
        .map_err(export_error)?;
    }

    wtr.flush().map_err(|e| DomainError::Export(e.to_string()))?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| DomainError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DomainError::Export(e.to_string()))
}

/// Write events as CSV to `path`, creating parent directories. Returns the row count.
pub async fn write_csv(path: &Path, events: &[&TimetableEvent]) -> Result<usize, DomainError> {
    let csv = events_to_csv(events.iter().copied())?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DomainError::Export(format!("create {}: {}", parent.display(), e)))?;
    }
    tokio::fs::write(path, csv)
        .await
        .map_err(|e| DomainError::Export(format!("write {}: {}", path.display(), e)))?;
    info!(path = %path.display(), rows = events.len(), "timetable exported");
    Ok(events.len())
}

fn export_error(e: csv::Error) -> DomainError {
    DomainError::Export(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decoder::decode_events;
    use serde_json::json;

    fn events() -> Vec<TimetableEvent> {
        decode_events(&[
            json!({
                "title": "ALGEBRA; lineare",
                "start": "2026-03-01T09:00:00",
                "end": "2026-03-01T11:00:00",
                "docente": "Mario Rossi",
                "cod_sdoppiamento": "08793--A-L",
                "aule": [{"des_risorsa": "Aula 1", "des_indirizzo": "Via Zamboni 33"}]
            }),
            json!({
                "title": "FISICA",
                "start": "2026-03-02T14:00:00",
                "end": "2026-03-02T16:00:00",
                "teams": "https://teams.example/meet"
            }),
        ])
    }

    #[test]
    fn test_events_to_csv_basic() {
        let events = events();
        let csv = events_to_csv(&events).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Start;End;Title;Group;Professor;Classroom;Remote");
        assert!(lines[1].starts_with("2026-03-01 09:00;2026-03-01 11:00;\"ALGEBRA; lineare\";A-L;Mario Rossi"));
        assert!(lines[1].contains("Aula 1 (Via Zamboni 33)"));
        assert!(lines[1].ends_with(";no"));
        assert_eq!(lines[2], "2026-03-02 14:00;2026-03-02 16:00;FISICA;;;;yes");
    }

    #[test]
    fn test_events_to_csv_empty() {
        let csv = events_to_csv(std::iter::empty()).unwrap();
        assert_eq!(csv.trim_end(), "Start;End;Title;Group;Professor;Classroom;Remote");
    }

    #[tokio::test]
    async fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("timetable.csv");
        let events = events();
        let refs: Vec<&TimetableEvent> = events.iter().collect();
        assert_eq!(write_csv(&path, &refs).await.unwrap(), 2);
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("FISICA"));
    }
}
