//! Infrastructure adapters. Implement outbound ports.
//!
//! HTTP, curricula metadata, fetch cache, CSV export, terminal UI. Map errors to DomainError.

pub mod curricula;
pub mod export;
pub mod http;
pub mod persistence;
pub mod ui;
