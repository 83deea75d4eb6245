//! Blocking HTTP transport for Schedules Direct style JSON feeds
//!
//! Each [`BatchRequest`] is one HTTP exchange:
//!
//! | resource        | request                                       |
//! |-----------------|-----------------------------------------------|
//! | programs        | `POST {base}/{version}/programs`              |
//! | schedules       | `POST {base}/{version}/schedules`             |
//! | lineups         | `GET {base}/{version}/lineups`                |
//! | headends        | `GET {base}/{version}/headends?country=&postalcode=` |
//! | lineup map      | `GET {base}{uri}`                             |
//! | status          | `GET {base}/{version}/status`                 |
//! | delete message  | `DELETE {base}/{version}/messages/{id}`       |
//!
//! Batched resources send `{"request": [ids]}`. Responses are a JSON array,
//! a single JSON document, or a JSON line stream; each item becomes one raw
//! record.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};
use ureq::http::Response;
use ureq::{Agent, Body};

use crate::error::TransportError;
use crate::raw::RawRecord;
use crate::transport::{BatchRequest, Resource, Transport, response_code};
use crate::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};

/// Default User-Agent header
pub const DEFAULT_USER_AGENT: &str = concat!("pmoguide/", env!("CARGO_PKG_VERSION"));

/// Default global timeout of one exchange, in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Default cap on a response body; program batches run to tens of megabytes
pub const DEFAULT_MAX_BODY_BYTES: u64 = 256 * 1024 * 1024;

/// [`Transport`] talking to the upstream feed over HTTP
#[derive(Clone)]
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
    api_version: String,
    token: Option<String>,
    user_agent: String,
    max_body_bytes: u64,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("user_agent", &self.user_agent)
            .field("has_token", &self.token.is_some())
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Replaces the session token sent with every request
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn endpoint(&self, noun: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, noun)
    }

    /// Lineup uris are absolute paths that may or may not carry the api version
    fn lineup_url(&self, uri: &str) -> String {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else if uri.trim_start_matches('/').starts_with(&self.api_version) {
            format!("{}/{}", self.base_url, uri.trim_start_matches('/'))
        } else {
            self.endpoint(uri.trim_start_matches('/'))
        }
    }

    fn authorize<B>(&self, builder: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let builder = builder.header("User-Agent", self.user_agent.as_str());
        match &self.token {
            Some(token) => builder.header("token", token.as_str()),
            None => builder,
        }
    }

    fn exchange(&self, request: &BatchRequest) -> Result<Response<Body>, ureq::Error> {
        let response = match &request.resource {
            Resource::Programs | Resource::Schedules => {
                let url = self.endpoint(&request.resource.to_string());
                self.authorize(self.agent.post(url))
                    .header("Content-Type", "application/json")
                    .send(request.body().to_string())?
            }
            Resource::Lineups => self.authorize(self.agent.get(self.endpoint("lineups"))).call()?,
            Resource::Headends {
                country,
                postal_code,
            } => self
                .authorize(self.agent.get(self.endpoint("headends")))
                .query("country", country)
                .query("postalcode", postal_code)
                .call()?,
            Resource::LineupMap { uri } => {
                self.authorize(self.agent.get(self.lineup_url(uri))).call()?
            }
            Resource::Status => self.authorize(self.agent.get(self.endpoint("status"))).call()?,
            Resource::DeleteMessage { id } => self
                .authorize(self.agent.delete(self.endpoint(&format!("messages/{}", id))))
                .call()?,
        };
        Ok(response)
    }
}

impl Transport for HttpTransport {
    fn submit(&self, request: &BatchRequest) -> Result<Vec<RawRecord>, TransportError> {
        debug!(resource = %request.resource, ids = request.ids.len(), "Submitting request");

        let mut response = self
            .exchange(request)
            .map_err(|e| TransportError::connectivity(e.to_string()))?;
        let status = response.status().as_u16();
        // A response arrived: failing to read it is a body problem
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_string()
            .map_err(|e| TransportError::InvalidBody(e.to_string()))?;
        trace!(status, bytes = body.len(), "Response received");

        if !(200..300).contains(&status) {
            return Err(error_from_body(status, &body));
        }

        let records = parse_body(&body)?;

        // Single documents of non-batched resources carry their own code
        if request.ids.is_empty() {
            if let [document] = records.as_slice() {
                let code = response_code::of(document);
                if code != response_code::OK {
                    return Err(TransportError::Api {
                        code,
                        message: response_code::message_of(document),
                    });
                }
            }
        }

        debug!(resource = %request.resource, records = records.len(), "Request completed");
        Ok(records)
    }
}

/// Error for a non-success status, using the upstream code when the body has one
fn error_from_body(status: u16, body: &str) -> TransportError {
    match serde_json::from_str::<Value>(body) {
        Ok(document) if response_code::of(&document) != response_code::OK => TransportError::Api {
            code: response_code::of(&document),
            message: response_code::message_of(&document),
        },
        _ => TransportError::from_status_code(status, body.trim()),
    }
}

/// Splits a response body into raw records
pub fn parse_body(body: &str) -> Result<Vec<RawRecord>, TransportError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Array(items)) => Ok(items),
        Ok(document) => Ok(vec![document]),
        Err(_) => body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| {
                    TransportError::InvalidBody(format!("line {}: {}", i + 1, e))
                })
            })
            .collect(),
    }
}

/// Builder for an [`HttpTransport`]
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    base_url: String,
    api_version: String,
    token: Option<String>,
    user_agent: String,
    timeout: Duration,
    max_body_bytes: u64,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Session token sent in the `token` header
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Global timeout of one exchange
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Largest response body accepted, in bytes
    pub fn max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn build(self) -> HttpTransport {
        // Non-2xx answers carry upstream error documents we want to read
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build()
            .into();

        HttpTransport {
            agent,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_version: self.api_version,
            token: self.token,
            user_agent: self.user_agent,
            max_body_bytes: self.max_body_bytes,
        }
    }
}
