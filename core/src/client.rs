//! Reverse IP/DNS API client.
//!
//! # Design
//! `ReverseIpClient` holds only immutable configuration (API key, base URL,
//! transport) and carries no state between calls, so one client can serve
//! concurrent lookups. Every call runs the same pipeline: validate the IP,
//! build an `HttpRequest`, execute it, then either decode the body (`get`) or
//! classify the status line (`get_raw`).
//!
//! The two entry points judge success differently. `get` never looks at the
//! status code: a well-formed error envelope surfaces as
//! [`ApiError::Envelope`] and an unparsable body as [`ApiError::Parse`],
//! whatever the status. `get_raw` never decodes and reports non-2xx as
//! [`ApiError::Status`], still returning the bytes.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::{ApiError, ArgError, Failure};
use crate::http::{self, HttpRequest, RawResponse};
use crate::options::{QueryOption, QueryParams, API_KEY_PARAM, IP_PARAM};
use crate::payload::{self, Payload};
use crate::transport::Transport;
use crate::types::LookupResponse;

pub const DEFAULT_BASE_URL: &str = "https://reverse-ip.whoisxmlapi.com/api/v1";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Construction parameters for [`ReverseIpClient`].
#[derive(Debug, Clone)]
pub struct ClientParams {
    /// Use this client instead of building one. `timeout` is then ignored.
    pub http_client: Option<reqwest::Client>,

    /// Endpoint of the service. Defaults to [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,

    pub timeout: Duration,

    /// Ceiling on the number of body bytes read per response.
    pub max_body_size: usize,

    pub user_agent: String,
}

impl Default for ClientParams {
    fn default() -> Self {
        Self {
            http_client: None,
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            user_agent: format!("reverseip-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Client for the Reverse IP/DNS API.
#[derive(Debug, Clone)]
pub struct ReverseIpClient {
    api_key: String,
    base_url: Url,
    user_agent: String,
    transport: Transport,
}

impl ReverseIpClient {
    /// Validates the base URL once; request building cannot fail afterwards.
    pub fn new(api_key: impl Into<String>, params: ClientParams) -> Result<Self, ApiError> {
        let base_url = params.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidConfig(format!("base URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::InvalidConfig(format!(
                "base URL {base_url} is not an http(s) endpoint"
            )));
        }

        let transport = match params.http_client {
            Some(http) => Transport::new(http, params.max_body_size),
            None => Transport::with_timeout(params.timeout, &params.user_agent, params.max_body_size)?,
        };

        Ok(Self {
            api_key: api_key.into(),
            base_url,
            user_agent: params.user_agent,
            transport,
        })
    }

    /// Client with default parameters against the public endpoint.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::new(api_key, ClientParams::default())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the GET request for `ip`. The API key goes first, then `opts` in
    /// order, then the IP, so no option can replace the IP.
    pub fn build_request(&self, ip: &str, opts: &[QueryOption]) -> HttpRequest {
        let mut params = QueryParams::new();
        params.set(API_KEY_PARAM, self.api_key.as_str());
        for opt in opts {
            opt.apply(&mut params);
        }
        params.set(IP_PARAM, ip);

        let mut url = self.base_url.clone();
        url.query_pairs_mut().clear().extend_pairs(params.iter());

        HttpRequest {
            url,
            headers: vec![("user-agent".to_string(), self.user_agent.clone())],
        }
    }

    /// Look up the domains hosted on `ip` and decode them.
    ///
    /// Always requests JSON, overriding any `OutputFormat` in `opts`. On
    /// success the raw response comes back alongside the decoded page.
    pub async fn get(
        &self,
        cancel: &CancellationToken,
        ip: impl fmt::Display,
        opts: &[QueryOption],
    ) -> Result<(LookupResponse, RawResponse), Failure> {
        let ip = validate_ip(ip)?;

        let mut json_opts = Vec::with_capacity(opts.len() + 1);
        json_opts.extend_from_slice(opts);
        json_opts.push(QueryOption::output_format("JSON"));

        let raw = self.request(cancel, &ip, &json_opts).await?;

        let envelope = match payload::parse(&raw.body) {
            Ok(envelope) => envelope,
            Err(err) => return Err(Failure::with_response(err, raw)),
        };

        match envelope.into_payload() {
            Payload::Lookup(lookup) => Ok((lookup, raw)),
            Payload::Error(envelope) => {
                warn!(
                    status = raw.status,
                    code = envelope.code,
                    "Service reported an error: {}",
                    envelope.message
                );
                Err(Failure::with_response(envelope.into(), raw))
            }
        }
    }

    /// Look up `ip` and return the response body verbatim.
    ///
    /// A non-2xx status yields [`ApiError::Status`] with the response still
    /// attached to the failure.
    pub async fn get_raw(
        &self,
        cancel: &CancellationToken,
        ip: impl fmt::Display,
        opts: &[QueryOption],
    ) -> Result<RawResponse, Failure> {
        let ip = validate_ip(ip)?;

        let raw = self.request(cancel, &ip, opts).await?;

        match http::check_status(&raw) {
            Ok(()) => Ok(raw),
            Err(err) => Err(Failure::with_response(err, raw)),
        }
    }

    async fn request(
        &self,
        cancel: &CancellationToken,
        ip: &str,
        opts: &[QueryOption],
    ) -> Result<RawResponse, Failure> {
        let request = self.build_request(ip, opts);
        self.transport.execute(cancel, &request).await
    }
}

/// Rejects an IP whose string form is blank. Anything else is sent as given.
fn validate_ip(ip: impl fmt::Display) -> Result<String, ArgError> {
    let ip = ip.to_string();
    if ip.trim().is_empty() {
        return Err(ArgError::new(IP_PARAM, "can not be empty"));
    }
    Ok(ip)
}
