//! Seam between the orchestrator and the upstream feed
//!
//! A [`Transport`] performs one network exchange per [`BatchRequest`] and
//! hands back the raw records of the response. It owns every network
//! concern: authentication, timeouts, retries, cancellation. The
//! orchestrator only relies on two guarantees: one `submit` is one round
//! trip, and an `Err` means nothing from the exchange is usable.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::TransportError;
use crate::raw::RawRecord;

/// Response codes carried by upstream documents
pub mod response_code {
    use serde_json::Value;

    pub const OK: i64 = 0;
    pub const SERVICE_OFFLINE: i64 = 3000;
    pub const NO_LINEUPS: i64 = 4102;
    pub const INVALID_PROGID: i64 = 6000;
    pub const PROGRAMID_QUEUED: i64 = 6001;
    pub const SCHEDULE_QUEUED: i64 = 7000;

    /// The `code` of a record; records without one are OK
    pub fn of(raw: &Value) -> i64 {
        raw.get("code").and_then(Value::as_i64).unwrap_or(OK)
    }

    /// The human readable text accompanying a non-zero code
    pub fn message_of(raw: &Value) -> String {
        raw.get("message")
            .or_else(|| raw.get("response"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// What a batch request asks for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Resource {
    /// Program records for the request ids
    Programs,
    /// Schedules of the stations named by the request ids
    Schedules,
    /// Lineups registered on the account
    Lineups,
    /// Lineups available at a location
    Headends { country: String, postal_code: String },
    /// Details (stations and channel map) of one lineup
    LineupMap { uri: String },
    /// Account and service status
    Status,
    /// Acknowledges (deletes) one account message
    DeleteMessage { id: String },
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Programs => write!(f, "programs"),
            Self::Schedules => write!(f, "schedules"),
            Self::Lineups => write!(f, "lineups"),
            Self::Headends {
                country,
                postal_code,
            } => write!(f, "headends({}, {})", country, postal_code),
            Self::LineupMap { uri } => write!(f, "lineup({})", uri),
            Self::Status => write!(f, "status"),
            Self::DeleteMessage { id } => write!(f, "delete-message({})", id),
        }
    }
}

/// One network exchange: a resource and, for batched resources, the ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRequest {
    pub resource: Resource,
    pub ids: Vec<String>,
}

impl BatchRequest {
    pub fn new(resource: Resource, ids: Vec<String>) -> Self {
        Self { resource, ids }
    }

    pub fn programs(ids: Vec<String>) -> Self {
        Self::new(Resource::Programs, ids)
    }

    pub fn schedules(station_ids: Vec<String>) -> Self {
        Self::new(Resource::Schedules, station_ids)
    }

    pub fn lineups() -> Self {
        Self::new(Resource::Lineups, Vec::new())
    }

    pub fn headends(country: impl Into<String>, postal_code: impl Into<String>) -> Self {
        Self::new(
            Resource::Headends {
                country: country.into(),
                postal_code: postal_code.into(),
            },
            Vec::new(),
        )
    }

    pub fn lineup_map(uri: impl Into<String>) -> Self {
        Self::new(Resource::LineupMap { uri: uri.into() }, Vec::new())
    }

    pub fn status() -> Self {
        Self::new(Resource::Status, Vec::new())
    }

    pub fn delete_message(id: impl Into<String>) -> Self {
        Self::new(Resource::DeleteMessage { id: id.into() }, Vec::new())
    }

    /// JSON body of a batched POST (`{"request": [ids]}`)
    pub fn body(&self) -> Value {
        serde_json::json!({ "request": self.ids })
    }
}

/// Performs batch exchanges with the upstream feed
///
/// Implementations must tolerate concurrent calls from several threads.
pub trait Transport: Send + Sync {
    /// Performs one exchange and returns the raw records of the response
    ///
    /// A response made of one JSON document yields one record; a JSON array
    /// or a JSON line stream yields one record per item.
    fn submit(&self, request: &BatchRequest) -> Result<Vec<RawRecord>, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn submit(&self, request: &BatchRequest) -> Result<Vec<RawRecord>, TransportError> {
        (**self).submit(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn submit(&self, request: &BatchRequest) -> Result<Vec<RawRecord>, TransportError> {
        (**self).submit(request)
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn submit(&self, request: &BatchRequest) -> Result<Vec<RawRecord>, TransportError> {
        (**self).submit(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_body() {
        let request = BatchRequest::programs(vec!["EP1".into(), "SH2".into()]);
        assert_eq!(request.body(), json!({"request": ["EP1", "SH2"]}));
        assert_eq!(request.resource.to_string(), "programs");
    }

    #[test]
    fn test_response_code() {
        assert_eq!(response_code::of(&json!({"programID": "EP1"})), response_code::OK);
        let queued = json!({"programID": "EP1", "code": 6001, "message": "Queued"});
        assert_eq!(response_code::of(&queued), response_code::PROGRAMID_QUEUED);
        assert_eq!(response_code::message_of(&queued), "Queued");
    }
}
