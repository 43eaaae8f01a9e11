//! Core domain layer. No network or filesystem dependencies.
//!
//! Entities and business rules live here. Dependencies flow inward.

pub mod academic_year;
pub mod collection;
pub mod decoder;
pub mod entities;
pub mod errors;
pub mod filters;
pub mod fingerprint;
pub mod grouping;

pub use academic_year::TermWindow;
pub use collection::{
    AcademicYearTimetable, AttemptFailure, AttemptFailureKind, CurriculumTimetable, FetchOutcome,
    FetchReport, TimetableCollection,
};
pub use entities::{Classroom, CourseKind, Curriculum, EventDraft, TimetableEvent};
pub use errors::DomainError;
pub use filters::EventFilter;
pub use fingerprint::CacheEntry;
