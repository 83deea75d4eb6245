use std::sync::Arc;

use serde_json::Value;

use super::flags::decode_flags;
use crate::error::DecodeError;
use crate::model::{Airing, Program, Station};
use crate::raw::Record;

const ENTITY: &str = "Airing";

/// Decodes an airing owned by an already resolved program and station
///
/// The record's `programID` must be the supplied program's id. A record
/// that names its station must name the supplied one.
pub(crate) fn decode_airing(
    raw: &Value,
    program: Arc<Program>,
    station: Arc<Station>,
) -> Result<Airing, DecodeError> {
    let record = Record::new(ENTITY, raw)?;

    let program_id = record.req_id("programID")?;
    if program_id != program.id {
        return Err(DecodeError::mismatch(ENTITY, program.id.as_str(), program_id));
    }
    if let Some(station_id) = record.opt_string("stationID") {
        if station_id != station.id {
            return Err(DecodeError::mismatch(ENTITY, station.id.as_str(), station_id));
        }
    }

    let duration = record.req_u32("duration")?;
    let start = record.req_timestamp("airDateTime")?;
    let flags = decode_flags(&record);

    Ok(Airing::new(program, station, start, duration, flags))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::LiveStatus;
    use serde_json::json;

    fn owners() -> (Arc<Program>, Arc<Station>) {
        (
            Arc::new(Program::new("EP000000010001", "Pilot", "md5")),
            Arc::new(Station::new("10021", "WXYZ", "WXYZ Detroit")),
        )
    }

    #[test]
    fn test_decode_airing() {
        let (program, station) = owners();
        let raw = json!({
            "programID": "EP000000010001",
            "airDateTime": "2014-06-28T13:00:00Z",
            "duration": "3600",
            "liveTapeDelay": "Tape",
            "audioProperties": ["stereo"],
        });
        let airing = decode_airing(&raw, program.clone(), station).unwrap();
        assert_eq!(airing.id(), program.id);
        assert_eq!(airing.duration_secs(), 3600);
        assert_eq!(airing.end().to_rfc3339(), "2014-06-28T14:00:00+00:00");
        assert_eq!(airing.flags().live, LiveStatus::Tape);
        assert!(airing.flags().stereo);
    }

    #[test]
    fn test_program_mismatch() {
        let (program, station) = owners();
        let raw = json!({
            "programID": "EP000000010002",
            "airDateTime": "2014-06-28T13:00:00Z",
            "duration": 1800,
        });
        assert_eq!(
            decode_airing(&raw, program, station).unwrap_err(),
            DecodeError::mismatch("Airing", "EP000000010001", "EP000000010002")
        );
    }

    #[test]
    fn test_required_airing_fields() {
        let (program, station) = owners();
        let raw = json!({"programID": "EP000000010001", "airDateTime": "2014-06-28T13:00:00Z"});
        assert_eq!(
            decode_airing(&raw, program.clone(), station.clone()).unwrap_err(),
            DecodeError::missing("Airing", "duration")
        );

        let raw = json!({"programID": "EP000000010001", "airDateTime": "soon", "duration": 60});
        assert!(matches!(
            decode_airing(&raw, program, station).unwrap_err(),
            DecodeError::MalformedField { ref field, .. } if field == "airDateTime"
        ));
    }

    #[test]
    fn test_unknown_vocabulary_keeps_airing() {
        let (program, station) = owners();
        let raw = json!({
            "programID": "EP000000010001",
            "airDateTime": "2014-06-28T13:00:00Z",
            "duration": 1800,
            "liveTapeDelay": "Hologram",
            "dolby": "Dolby Hyperdrive",
        });
        let airing = decode_airing(&raw, program, station).unwrap();
        assert!(airing.flags().live.is_unknown());
        assert!(airing.flags().dolby.is_unknown());
    }
}
