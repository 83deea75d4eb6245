use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};

use super::station::{decode_station, decode_tuning};
use crate::channel_map::{ChannelMapBuilder, ChannelMapEntry};
use crate::error::{DecodeError, PartialFailure};
use crate::model::{Lineup, LineupDetails, Station};
use crate::raw::{Record, record_id};

const LINEUP: &str = "Lineup";
const HEADEND: &str = "Headend";
const MAP_ENTRY: &str = "ChannelMapEntry";

/// Decodes a lineup summary (`{name, location, uri, type}`)
pub(crate) fn decode_lineup(raw: &Value) -> Result<Lineup, DecodeError> {
    let record = Record::new(LINEUP, raw)?;
    Ok(Lineup::new(
        record.req_str("name")?,
        record.req_str("location")?,
        record.req_str("uri")?,
        record
            .opt_string("type")
            .or_else(|| record.opt_string("transport")),
    ))
}

/// Lineup summaries carried by the records of a lineup listing
///
/// The listing comes either as one `{"lineups": [...]}` document or as the
/// summaries themselves.
pub(crate) fn lineup_records(records: &[Value]) -> Vec<&Value> {
    records
        .iter()
        .flat_map(|record| match record.get("lineups") {
            Some(Value::Array(items)) => items.iter().collect::<Vec<_>>(),
            _ => vec![record],
        })
        .collect()
}

/// Headend documents carried by the records of a headend search
///
/// Upstream answers either with a list of headends or with one object
/// keyed by headend id.
pub(crate) fn headend_records(records: &[Value]) -> Vec<&Value> {
    records
        .iter()
        .flat_map(|record| match record {
            Value::Object(map) if !map.contains_key("lineups") => {
                map.values().filter(|v| v.is_object()).collect::<Vec<_>>()
            }
            other => vec![other],
        })
        .collect()
}

/// Decodes the lineups offered by one headend
///
/// Location and transport type belong to the headend and are copied onto
/// each of its lineups.
pub(crate) fn decode_headend(raw: &Value) -> Result<Vec<Lineup>, DecodeError> {
    let record = Record::new(HEADEND, raw)?;
    let location = record.req_str("location")?;
    let transport = record
        .opt_string("type")
        .or_else(|| record.opt_string("transport"));

    let mut lineups = Vec::new();
    for (i, item) in record.req_array("lineups")?.iter().enumerate() {
        let lineup = Record::new(HEADEND, item)?;
        let name = lineup.req_str("name").map_err(|_| {
            DecodeError::missing(HEADEND, format!("lineups[{}].name", i))
        })?;
        let uri = lineup.req_str("uri").map_err(|_| {
            DecodeError::missing(HEADEND, format!("lineups[{}].uri", i))
        })?;
        lineups.push(Lineup::new(name, location, uri, transport.clone()));
    }
    Ok(lineups)
}

/// Decodes the details document of a lineup (`{map, stations, metadata}`)
///
/// Map entries and stations that do not decode are recorded in
/// [`LineupDetails::failures`]; only a document lacking `map` or `stations`
/// fails as a whole.
pub(crate) fn decode_lineup_details(raw: &Value) -> Result<LineupDetails, DecodeError> {
    let record = Record::new(LINEUP, raw)?;
    let map = record.req_array("map")?;
    let raw_stations = record.req_array("stations")?;
    let mut failures = Vec::new();

    let mut builder = ChannelMapBuilder::new();
    for (i, item) in map.iter().enumerate() {
        match decode_map_entry(item) {
            Ok(entry) => builder.push(entry),
            Err(err) => {
                let id = record_id(item, "stationID").unwrap_or_else(|| format!("map[{}]", i));
                warn!(id = %id, "Skipping channel map entry: {}", err);
                failures.push(PartialFailure::new(id, err));
            }
        }
    }

    let tunings = builder.tuning_by_station();
    let mut stations: IndexMap<String, Arc<Station>> = IndexMap::new();
    for (i, item) in raw_stations.iter().enumerate() {
        let tuning = record_id(item, "stationID")
            .and_then(|id| tunings.get(&id).copied())
            .unwrap_or_default();
        match decode_station(item, tuning) {
            Ok(station) => {
                stations.insert(station.id.clone(), Arc::new(station));
            }
            Err(err) => {
                let id =
                    record_id(item, "stationID").unwrap_or_else(|| format!("stations[{}]", i));
                warn!(id = %id, "Skipping lineup station: {}", err);
                failures.push(PartialFailure::new(id, err));
            }
        }
    }

    let channel_map = builder.build(&stations);
    let last_modified = record
        .opt_object("metadata")
        .and_then(|metadata| metadata.opt_timestamp("modified"));

    debug!(
        stations = stations.len(),
        entries = builder.entries().len(),
        failures = failures.len(),
        "Decoded lineup details"
    );

    Ok(LineupDetails {
        stations,
        channel_map,
        last_modified,
        failures,
    })
}

/// A channel map entry needs a station id and either a channel or tuning data
fn decode_map_entry(raw: &Value) -> Result<ChannelMapEntry, DecodeError> {
    let record = Record::new(MAP_ENTRY, raw)?;
    let station_id = record.req_id("stationID")?;
    let channel = record.opt_string("channel");
    let tuning = decode_tuning(&record);
    if channel.is_none() && tuning.is_empty() {
        return Err(DecodeError::missing(MAP_ENTRY, "channel"));
    }
    Ok(ChannelMapEntry::new(station_id, channel, tuning))
}
