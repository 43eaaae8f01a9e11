//! reqwest-backed HttpPort.
//!
//! One pooled `reqwest::Client` is shared by every in-flight request; reqwest
//! keeps each request/response pair on its own connection or HTTP/2 stream.
//! The pool is released when the last handle is dropped.

use crate::domain::DomainError;
use crate::ports::HttpPort;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::debug;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8";
const DEFAULT_ACCEPT_LANGUAGE: &str = "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7";

/// Live HTTP client with browser-like default headers and a per-request timeout.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
    timeout: Duration,
}

impl ReqwestHttpClient {
    /// Build a client. `timeout` bounds each request end to end.
    pub fn new(timeout: Duration) -> Result<Self, DomainError> {
        Self::with_headers(timeout, &[])
    }

    /// Build a client with extra headers merged over the defaults.
    pub fn with_headers(timeout: Duration, extra: &[(&str, &str)]) -> Result<Self, DomainError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE));
        for (name, value) in extra {
            let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| DomainError::Config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| DomainError::Config(format!("invalid header value: {}", e)))?;
            headers.insert(name, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Http(format!("client setup failed: {}", e)))?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn map_send_error(&self, e: reqwest::Error) -> DomainError {
        if e.is_timeout() {
            DomainError::Timeout {
                millis: self.timeout.as_millis() as u64,
            }
        } else {
            DomainError::Http(e.to_string())
        }
    }

    async fn read_body(&self, url: &str, response: reqwest::Response) -> Result<String, DomainError> {
        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        debug!(url, status = status.as_u16(), body_len = body.len(), "http response");
        Ok(body)
    }
}

#[async_trait::async_trait]
impl HttpPort for ReqwestHttpClient {
    async fn get(&self, url: &str, params: &[(&str, String)]) -> Result<String, DomainError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_body(url, response).await
    }

    async fn post(&self, url: &str, form: &[(&str, String)]) -> Result<String, DomainError> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        self.read_body(url, response).await
    }
}
