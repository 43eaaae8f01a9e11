//! Offline HttpPort. Serves canned bodies instead of hitting the network.
//!
//! Routes match on URL and, optionally, on a subset of query parameters;
//! parameter-specific routes win over URL-only routes. Unmatched requests fail
//! with HTTP 404. Every request is recorded for inspection.

use crate::domain::DomainError;
use crate::ports::HttpPort;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// A request as seen by the fixture client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub params: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
enum Reply {
    Body(String),
    Status(u16),
}

#[derive(Debug, Clone)]
struct Route {
    url: String,
    params: Vec<(String, String)>,
    reply: Reply,
}

impl Route {
    fn matches(&self, url: &str, params: &[(&str, String)]) -> bool {
        self.url == url
            && self
                .params
                .iter()
                .all(|(k, v)| params.iter().any(|(pk, pv)| pk == k && pv == v))
    }
}

/// Entry of a replay manifest file.
#[derive(Debug, Deserialize)]
struct ManifestRoute {
    url: String,
    #[serde(default)]
    params: BTreeMap<String, String>,
    /// Inline JSON body.
    body: Option<serde_json::Value>,
    /// Body file, relative to the manifest.
    body_file: Option<String>,
    /// Non-2xx status to fail with instead of a body.
    status: Option<u16>,
    delay_ms: Option<u64>,
}

/// Canned-response HTTP client.
#[derive(Debug, Default)]
pub struct FixtureHttpClient {
    routes: Vec<Route>,
    delays: Vec<(String, Duration)>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FixtureHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url` regardless of query parameters.
    pub fn with_route(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_query_route(url, &[], body)
    }

    /// Serve `body` for `url` when every listed parameter is present with that value.
    pub fn with_query_route(
        mut self,
        url: impl Into<String>,
        params: &[(&str, &str)],
        body: impl Into<String>,
    ) -> Self {
        self.routes.push(Route {
            url: url.into(),
            params: owned_params(params),
            reply: Reply::Body(body.into()),
        });
        self
    }

    /// Fail with `status` for `url` (and the listed parameters).
    pub fn with_status(mut self, url: impl Into<String>, params: &[(&str, &str)], status: u16) -> Self {
        self.routes.push(Route {
            url: url.into(),
            params: owned_params(params),
            reply: Reply::Status(status),
        });
        self
    }

    /// Delay every response for `url`.
    pub fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.push((url.into(), delay));
        self
    }

    /// Load routes from a JSON manifest (array of `{url, params?, body? | body_file? | status?, delay_ms?}`).
    pub async fn from_manifest(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DomainError::Config(format!("read fixture manifest {}: {}", path.display(), e)))?;
        let entries: Vec<ManifestRoute> = serde_json::from_str(&text)
            .map_err(|e| DomainError::Config(format!("parse fixture manifest: {}", e)))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut client = Self::new();
        for entry in entries {
            let reply = match (entry.status, entry.body, entry.body_file) {
                (Some(status), _, _) => Reply::Status(status),
                (None, Some(body), _) => Reply::Body(body.to_string()),
                (None, None, Some(file)) => {
                    let file_path = base.join(&file);
                    let body = tokio::fs::read_to_string(&file_path).await.map_err(|e| {
                        DomainError::Config(format!("read fixture {}: {}", file_path.display(), e))
                    })?;
                    Reply::Body(body)
                }
                (None, None, None) => {
                    return Err(DomainError::Config(format!(
                        "fixture route {} has no body, body_file or status",
                        entry.url
                    )));
                }
            };
            if let Some(ms) = entry.delay_ms {
                client.delays.push((entry.url.clone(), Duration::from_millis(ms)));
            }
            client.routes.push(Route {
                url: entry.url,
                params: entry.params.into_iter().collect(),
                reply,
            });
        }
        debug!(routes = client.routes.len(), path = %path.display(), "fixture manifest loaded");
        Ok(client)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    async fn respond(
        &self,
        method: &'static str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, DomainError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedRequest {
                method,
                url: url.to_string(),
                params: params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            });

        if let Some((_, delay)) = self.delays.iter().find(|(u, _)| u == url) {
            tokio::time::sleep(*delay).await;
        }

        // Most specific route first: more matched parameters wins.
        let route = self
            .routes
            .iter()
            .filter(|r| r.matches(url, params))
            .max_by_key(|r| r.params.len());
        match route.map(|r| &r.reply) {
            Some(Reply::Body(body)) => Ok(body.clone()),
            Some(Reply::Status(status)) => Err(DomainError::HttpStatus {
                status: *status,
                url: url.to_string(),
            }),
            None => Err(DomainError::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

fn owned_params(params: &[(&str, &str)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[async_trait::async_trait]
impl HttpPort for FixtureHttpClient {
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String, DomainError> {
        self.respond("GET", url, params).await
    }

    async fn post(&self, url: &str, form: &[(&str, String)]) -> Result<String, DomainError> {
        self.respond("POST", url, form).await
    }
}
