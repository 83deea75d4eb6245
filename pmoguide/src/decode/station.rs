use serde_json::Value;
use tracing::debug;

use crate::error::DecodeError;
use crate::model::{Broadcaster, Logo, Station, Tuning};
use crate::raw::Record;

const ENTITY: &str = "Station";

/// Decodes a station; tuning data comes from the lineup channel map
pub(crate) fn decode_station(raw: &Value, tuning: Tuning) -> Result<Station, DecodeError> {
    let record = Record::new(ENTITY, raw)?;

    let mut station = Station::new(
        record.req_id("stationID")?,
        record.req_str("callsign")?,
        record.req_str("name")?,
    );
    station.affiliate = record.opt_string("affiliate");
    station.tuning = tuning;

    if let Some(broadcaster) = record.opt_object("broadcaster") {
        station.broadcaster = Some(Broadcaster {
            city: broadcaster.opt_string("city"),
            state: broadcaster.opt_string("state"),
            postal_code: broadcaster
                .opt_string("zipcode")
                .or_else(|| broadcaster.opt_string("postalcode")),
            country: broadcaster.opt_string("country"),
        });
    }

    // Older documents nest the logo in the broadcaster block
    let logo = record.opt_object("logo").or_else(|| {
        record
            .opt_object("broadcaster")
            .and_then(|b| b.opt_object("logo"))
    });
    station.logo = logo.and_then(|logo| decode_logo(&logo, &station.id));

    Ok(station)
}

/// Tuning fields of a channel map entry
pub(crate) fn decode_tuning(record: &Record<'_>) -> Tuning {
    Tuning::new(
        record.opt_u32("uhfVhf"),
        record.opt_u32("atscMajor"),
        record.opt_u32("atscMinor"),
    )
}

fn decode_logo(record: &Record<'_>, station_id: &str) -> Option<Logo> {
    let Some(url) = record.opt_string("URL") else {
        debug!(station = station_id, "Ignoring logo without URL");
        return None;
    };
    let (width, height) = record
        .opt_str("dimension")
        .and_then(parse_dimension)
        .map_or((None, None), |(w, h)| (Some(w), Some(h)));
    Some(Logo {
        url,
        width: record.opt_u32("width").or(width),
        height: record.opt_u32("height").or(height),
        md5: record.opt_string("md5"),
        modified: record.opt_timestamp("modified"),
    })
}

/// Parses `"w=360px|h=270px"` or `"360x270"`
fn parse_dimension(raw: &str) -> Option<(u32, u32)> {
    if !raw.contains('=') {
        let (w, h) = raw.split_once('x')?;
        return Some((w.trim().parse().ok()?, h.trim().parse().ok()?));
    }
    let mut width = None;
    let mut height = None;
    for part in raw.split('|') {
        let (key, value) = part.split_once('=')?;
        let value: u32 = value.trim().trim_end_matches("px").parse().ok()?;
        match key.trim() {
            "w" => width = Some(value),
            "h" => height = Some(value),
            _ => {}
        }
    }
    Some((width?, height?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_station() {
        let raw = json!({
            "stationID": 10021,
            "callsign": "WXYZ",
            "name": "WXYZ Detroit",
            "affiliate": "ABC",
            "broadcaster": {"city": "Detroit", "state": "MI", "postalcode": "48201", "country": "USA"},
            "logo": {"URL": "https://img.example.org/wxyz.png", "dimension": "w=360px|h=270px", "md5": "abc"},
        });
        let station = decode_station(&raw, Tuning::new(Some(41), Some(7), Some(1))).unwrap();
        assert_eq!(station.id, "10021");
        assert_eq!(station.affiliate.as_deref(), Some("ABC"));
        let broadcaster = station.broadcaster.unwrap();
        assert_eq!(broadcaster.postal_code.as_deref(), Some("48201"));
        let logo = station.logo.unwrap();
        assert_eq!((logo.width, logo.height), (Some(360), Some(270)));
        assert_eq!(station.tuning.uhf_vhf, Some(41));
    }

    #[test]
    fn test_required_station_fields() {
        let raw = json!({"stationID": "1", "name": "No callsign"});
        assert_eq!(
            decode_station(&raw, Tuning::default()).unwrap_err(),
            DecodeError::missing("Station", "callsign")
        );
    }

    #[test]
    fn test_parse_dimension() {
        assert_eq!(parse_dimension("360x270"), Some((360, 270)));
        assert_eq!(parse_dimension("w=120px|h=90px"), Some((120, 90)));
        assert_eq!(parse_dimension("big"), None);
    }
}
