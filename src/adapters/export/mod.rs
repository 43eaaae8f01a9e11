//! Export adapters. Flat event lists to files.

pub mod csv_export;

pub use csv_export::{events_to_csv, write_csv};
