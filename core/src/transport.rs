//! Executes an [`HttpRequest`] over the network.
//!
//! # Design
//! The body is drained chunk by chunk into the `RawResponse` buffer, so bytes
//! received before a broken stream or an oversized body are handed back with
//! the error instead of being dropped. A body whose announced length is over
//! the ceiling is refused before any of it is read. Cancellation is checked
//! while waiting for headers and between chunks; a cancelled call never
//! returns a partial response.

use std::time::Duration;

use reqwest::Url;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ApiError, Failure, UNEXPECTED_EOF};
use crate::http::{HttpRequest, RawResponse};
use crate::options::API_KEY_PARAM;

/// HTTP transport shared by all calls of a client. Read-only after
/// construction; cloning shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    max_body_size: usize,
}

impl Transport {
    pub fn new(http: reqwest::Client, max_body_size: usize) -> Self {
        Self {
            http,
            max_body_size,
        }
    }

    /// Build a transport with its own `reqwest::Client`.
    pub fn with_timeout(
        timeout: Duration,
        user_agent: &str,
        max_body_size: usize,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ApiError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(http, max_body_size))
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        request: &HttpRequest,
    ) -> Result<RawResponse, Failure> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled.into());
        }

        debug!(url = %redacted(&request.url), "Sending reverse IP request");

        let mut builder = self.http.get(request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let mut response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(ApiError::Cancelled.into());
            }
            result = builder.send() => {
                result.map_err(|e| {
                    let error = ApiError::from(e);
                    warn!("Reverse IP request failed: {error}");
                    Failure::from(error)
                })?
            }
        };

        let expected_len = response.content_length();
        let mut raw = RawResponse {
            status: response.status().as_u16(),
            headers: response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.as_str().to_string(),
                        String::from_utf8_lossy(value.as_bytes()).into_owned(),
                    )
                })
                .collect(),
            body: Vec::new(),
        };

        if let Some(len) = expected_len.filter(|&len| len > self.max_body_size as u64) {
            warn!(
                limit = self.max_body_size,
                announced = len,
                "Response body exceeds size ceiling"
            );
            return Err(Failure::with_response(self.oversized(), raw));
        }

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ApiError::Cancelled.into());
                }
                chunk = response.chunk() => chunk,
            };

            match chunk {
                Ok(Some(bytes)) => {
                    let room = self.max_body_size - raw.body.len();
                    if bytes.len() > room {
                        raw.body.extend_from_slice(&bytes[..room]);
                        warn!(
                            limit = self.max_body_size,
                            "Response body exceeds size ceiling"
                        );
                        return Err(Failure::with_response(self.oversized(), raw));
                    }
                    raw.body.extend_from_slice(&bytes);
                }
                Ok(None) => break,
                Err(err) => {
                    let err = err.without_url();
                    let received = raw.body.len() as u64;
                    warn!(
                        status = raw.status,
                        received,
                        expected = ?expected_len,
                        "Response body stream broke: {err}"
                    );
                    let error = read_error(err, received, expected_len);
                    return Err(Failure::with_response(error, raw));
                }
            }
        }

        debug!(
            status = raw.status,
            bytes = raw.body.len(),
            "Reverse IP response read"
        );
        Ok(raw)
    }

    fn oversized(&self) -> ApiError {
        ApiError::read(format!("body exceeds {} bytes", self.max_body_size), None)
    }
}

/// A body that stops short of its announced length, or of its terminating
/// chunk when no length was announced, is reported as an unexpected EOF.
fn read_error(err: reqwest::Error, received: u64, expected: Option<u64>) -> ApiError {
    if err.is_timeout() {
        return ApiError::from(err);
    }
    match expected {
        Some(len) if received >= len => ApiError::read(err.to_string(), Some(err)),
        _ => ApiError::read(UNEXPECTED_EOF, Some(err)),
    }
}

/// The request URL with the API key masked, for logs.
pub(crate) fn redacted(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == API_KEY_PARAM {
                "REDACTED".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    let mut url = url.clone();
    if !pairs.is_empty() {
        url.query_pairs_mut().clear().extend_pairs(pairs.iter());
    }
    url.to_string()
}
