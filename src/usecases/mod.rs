//! Application use cases. Orchestrate domain logic via ports.

pub mod change_tracker;
pub mod session_service;
pub mod timetable_fetcher;
pub mod timetable_service;

pub use change_tracker::{ChangeReport, ChangeStatus, ChangeTracker};
pub use session_service::{SessionOutcome, SessionRequest, SessionService};
pub use timetable_fetcher::{FetchResult, TimetableFetcher};
pub use timetable_service::TimetableService;
