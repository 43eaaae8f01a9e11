//! HTTP adapters. Implement HttpPort.
//!
//! Live reqwest client plus an offline fixture client for replay and tests.

pub mod fixture_client;
pub mod reqwest_client;

pub use fixture_client::{FixtureHttpClient, RecordedRequest};
pub use reqwest_client::ReqwestHttpClient;
