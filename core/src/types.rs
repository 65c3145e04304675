//! Domain DTOs for the Reverse IP/DNS API.
//!
//! # Design
//! The service never tags which shape it is sending, so these types only
//! describe the two payloads. Deciding between them is the job of
//! [`crate::payload`]. Every field defaults when absent, mirroring how the
//! service omits fields it has nothing to say about.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of records the service returns per page.
pub const DEFAULT_PAGE_LIMIT: usize = 300;

/// One domain historically hosted on the queried address.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LookupResult {
    /// The domain name.
    pub name: String,

    /// Seconds since the epoch at which the record was first seen.
    pub first_seen: i64,

    /// Seconds since the epoch of the last update of this record.
    pub last_visit: i64,
}

impl LookupResult {
    pub fn first_seen_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.first_seen, 0)
    }

    pub fn last_visit_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.last_visit, 0)
    }
}

/// A successful page of lookup results.
///
/// `size` is what the service reports for the page. Callers paging through
/// results compare it against [`DEFAULT_PAGE_LIMIT`] to detect the last page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LookupResponse {
    #[serde(rename = "result")]
    pub results: Vec<LookupResult>,

    pub current_page: String,

    pub size: usize,
}

impl LookupResponse {
    /// The cursor to pass as `from` when requesting the next page.
    pub fn last_name(&self) -> Option<&str> {
        self.results.last().map(|r| r.name.as_str())
    }
}

/// A failure reported by the service inside the response body.
///
/// On the wire the text lives under `messages` even though it is a single
/// string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("API error: [{code}] {message}")]
#[serde(default)]
pub struct ErrorEnvelope {
    pub code: i64,

    #[serde(rename = "messages")]
    pub message: String,
}
