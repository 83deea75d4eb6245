//! Typed access to raw upstream records
//!
//! Upstream documents are kept as [`serde_json::Value`] trees. Decoders never
//! index them directly: they wrap an object in a [`Record`] and use its
//! accessors, which either return the value or a [`DecodeError`] naming the
//! entity and the dotted path of the offending field.
//!
//! Required accessors (`req_*`) are strict. Optional accessors (`opt_*`) are
//! lenient: a value of an unexpected shape is treated as absent, because
//! optional fields are not contractual and must never sink an entity.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::DecodeError;

/// An untyped record as received from upstream
pub type RawRecord = Value;

/// Timestamp format used by every upstream date-time field
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Parses an upstream timestamp (`2014-06-28T13:00:00Z`), accepting RFC 3339 as well
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
}

/// Read-only view over one JSON object of an upstream record
#[derive(Debug, Clone)]
pub struct Record<'a> {
    entity: &'static str,
    path: String,
    map: &'a Map<String, Value>,
}

impl<'a> Record<'a> {
    /// Wraps a raw record, which must be a JSON object
    pub fn new(entity: &'static str, raw: &'a Value) -> Result<Self, DecodeError> {
        match raw {
            Value::Object(map) => Ok(Self {
                entity,
                path: String::new(),
                map,
            }),
            other => Err(DecodeError::malformed(
                entity,
                "<record>",
                format!("expected an object, found {}", type_name(other)),
            )),
        }
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    /// The underlying JSON object
    pub fn as_map(&self) -> &'a Map<String, Value> {
        self.map
    }

    /// Dotted path of `key` relative to the record root
    pub fn field_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn child(&self, path: String, map: &'a Map<String, Value>) -> Record<'a> {
        Record {
            entity: self.entity,
            path,
            map,
        }
    }

    fn missing(&self, key: &str) -> DecodeError {
        DecodeError::missing(self.entity, self.field_path(key))
    }

    fn malformed(&self, key: &str, expected: &str, found: &Value) -> DecodeError {
        DecodeError::malformed(
            self.entity,
            self.field_path(key),
            format!("expected {}, found {}", expected, type_name(found)),
        )
    }

    /// Returns the value under `key`, treating `null` as absent
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        match self.map.get(key) {
            None | Some(Value::Null) => None,
            Some(value) => Some(value),
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    // ========================================================================
    // Required accessors
    // ========================================================================

    pub fn req_str(&self, key: &str) -> Result<&'a str, DecodeError> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(self.malformed(key, "a string", other)),
            None => Err(self.missing(key)),
        }
    }

    /// A required identifier; upstream sends some ids as numbers
    pub fn req_id(&self, key: &str) -> Result<String, DecodeError> {
        match self.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
            Some(Value::String(_)) => Err(DecodeError::malformed(
                self.entity,
                self.field_path(key),
                "identifier is empty",
            )),
            Some(Value::Number(n)) => Ok(n.to_string()),
            Some(other) => Err(self.malformed(key, "an identifier", other)),
            None => Err(self.missing(key)),
        }
    }

    /// A required non-negative integer, given as a number or a numeric string
    pub fn req_u32(&self, key: &str) -> Result<u32, DecodeError> {
        let value = self.get(key).ok_or_else(|| self.missing(key))?;
        as_u32(value).ok_or_else(|| self.malformed(key, "a non-negative integer", value))
    }

    pub fn req_timestamp(&self, key: &str) -> Result<DateTime<Utc>, DecodeError> {
        let raw = self.req_str(key)?;
        parse_timestamp(raw).ok_or_else(|| {
            DecodeError::malformed(
                self.entity,
                self.field_path(key),
                format!("'{}' is not a timestamp", raw),
            )
        })
    }

    pub fn req_object(&self, key: &str) -> Result<Record<'a>, DecodeError> {
        match self.get(key) {
            Some(Value::Object(map)) => Ok(self.child(self.field_path(key), map)),
            Some(other) => Err(self.malformed(key, "an object", other)),
            None => Err(self.missing(key)),
        }
    }

    pub fn req_array(&self, key: &str) -> Result<&'a [Value], DecodeError> {
        match self.get(key) {
            Some(Value::Array(items)) => Ok(items.as_slice()),
            Some(other) => Err(self.malformed(key, "an array", other)),
            None => Err(self.missing(key)),
        }
    }

    // ========================================================================
    // Optional accessors
    // ========================================================================

    pub fn opt_str(&self, key: &str) -> Option<&'a str> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s.as_str()),
            Some(other) => {
                debug!(entity = self.entity, field = %self.field_path(key), "Ignoring non-string value ({})", type_name(other));
                None
            }
            None => None,
        }
    }

    /// An optional text field; numbers are rendered, empty strings are absent
    pub fn opt_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// An optional flag; `"true"`/`"false"` strings are accepted
    pub fn opt_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Some(true),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    /// Shorthand for flags whose absence means `false`
    pub fn flag(&self, key: &str) -> bool {
        self.opt_bool(key).unwrap_or(false)
    }

    pub fn opt_u32(&self, key: &str) -> Option<u32> {
        self.get(key).and_then(as_u32)
    }

    pub fn opt_f32(&self, key: &str) -> Option<f32> {
        match self.get(key) {
            Some(Value::Number(n)) => n.as_f64().map(|v| v as f32),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn opt_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.opt_str(key).and_then(parse_timestamp)
    }

    /// An optional `YYYY-MM-DD` date
    pub fn opt_date(&self, key: &str) -> Option<NaiveDate> {
        self.opt_str(key)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    }

    pub fn opt_object(&self, key: &str) -> Option<Record<'a>> {
        match self.get(key) {
            Some(Value::Object(map)) => Some(self.child(self.field_path(key), map)),
            _ => None,
        }
    }

    /// The array under `key`; absent or non-array values yield an empty slice
    pub fn opt_array(&self, key: &str) -> &'a [Value] {
        match self.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// The object items of the array under `key`; non-object items are skipped
    pub fn objects(&self, key: &str) -> Vec<Record<'a>> {
        self.opt_array(key)
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Object(map) => Some(self.child(format!("{}[{}]", self.field_path(key), i), map)),
                _ => None,
            })
            .collect()
    }

    /// The string items of the array under `key`; other items are skipped
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.opt_array(key)
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Upstream id carried by a raw record, used to key failures before decoding
pub fn record_id(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_required_accessors_report_paths() {
        let raw = json!({"titles": {"title70": "Short"}, "md5": 42});
        let record = Record::new("Program", &raw).unwrap();

        let titles = record.req_object("titles").unwrap();
        assert_eq!(
            titles.req_str("title120").unwrap_err(),
            DecodeError::missing("Program", "titles.title120")
        );
        assert!(matches!(
            record.req_str("md5").unwrap_err(),
            DecodeError::MalformedField { ref field, .. } if field == "md5"
        ));
    }

    #[test]
    fn test_non_object_record_is_malformed() {
        let raw = json!(["not", "an", "object"]);
        assert!(matches!(
            Record::new("Station", &raw).unwrap_err(),
            DecodeError::MalformedField { entity: "Station", .. }
        ));
    }

    #[test]
    fn test_ids_accept_numbers() {
        let raw = json!({"stationID": 10021, "other": "  "});
        let record = Record::new("Station", &raw).unwrap();
        assert_eq!(record.req_id("stationID").unwrap(), "10021");
        assert!(record.req_id("other").is_err());
    }

    #[test]
    fn test_record_id_matches_req_id() {
        let raw = json!({"programID": " EP000000010001 ", "blank": "  ", "nested": {"id": 1}});
        let record = Record::new("Program", &raw).unwrap();
        assert_eq!(
            record_id(&raw, "programID"),
            Some(record.req_id("programID").unwrap())
        );
        assert_eq!(record_id(&raw, "blank"), None);
        assert_eq!(record_id(&raw, "nested"), None);
        assert_eq!(record_id(&json!({"stationID": 10021}), "stationID").as_deref(), Some("10021"));
    }

    #[test]
    fn test_optional_accessors_are_lenient() {
        let raw = json!({
            "cc": "true",
            "stereo": 3,
            "partNumber": "2",
            "venue": null,
            "genres": ["Drama", 5, "News"],
        });
        let record = Record::new("Airing", &raw).unwrap();
        assert_eq!(record.opt_bool("cc"), Some(true));
        assert_eq!(record.opt_bool("stereo"), None);
        assert_eq!(record.opt_u32("partNumber"), Some(2));
        assert!(!record.has("venue"));
        assert_eq!(record.strings("genres"), vec!["Drama", "News"]);
        assert!(record.opt_array("missing").is_empty());
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("2014-06-28T13:00:00Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2014-06-28T13:00:00+00:00");
        assert!(parse_timestamp("2014-06-28T13:00:00+02:00").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
