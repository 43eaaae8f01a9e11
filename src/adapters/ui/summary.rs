//! Plain-text session summary printed after a fetch.

use crate::domain::FetchOutcome;
use crate::usecases::session_service::SessionOutcome;
use std::fmt::Write;

/// One line per (year, curriculum), then change statuses and the export path.
pub fn render(outcome: &SessionOutcome) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Date range: {}", outcome.window);
    let _ = writeln!(out, "{}", outcome.collection);

    for (year, timetable) in outcome.collection.entries() {
        let label = if timetable.curriculum.is_unfiltered() {
            "all curricula".to_string()
        } else {
            timetable.curriculum.to_string()
        };
        let status = match timetable.report.as_ref().map(|r| &r.outcome) {
            Some(FetchOutcome::Fetched { endpoint }) => format!("ok via {}", endpoint),
            Some(fetch @ FetchOutcome::Exhausted { attempts }) => format!(
                "unavailable ({} endpoints tried{})",
                attempts.len(),
                if fetch.is_transient() { ", network errors" } else { "" }
            ),
            None => "local".to_string(),
        };
        let _ = writeln!(
            out,
            "  year {} | {} | {} events | {}",
            year,
            label,
            timetable.len(),
            status
        );
    }

    for change in outcome.changes.iter().filter(|c| c.status.is_change()) {
        let _ = writeln!(
            out,
            "  {} year {} [{}]: {} events",
            change.status, change.year, change.curriculum, change.event_count
        );
    }

    if let Some((path, rows)) = &outcome.exported {
        let _ = writeln!(out, "Exported {} events to {}", rows, path.display());
    }
    out
}

pub fn print(outcome: &SessionOutcome) {
    print!("{}", render(outcome));
}
