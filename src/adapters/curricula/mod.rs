//! CurriculaPort implementations.

pub mod http_source;
pub mod static_source;

pub use http_source::HttpCurriculaSource;
pub use static_source::StaticCurricula;
