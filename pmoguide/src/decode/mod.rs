//! Raw record decoding
//!
//! [`Decoder`] turns one raw upstream record into one typed entity, or into
//! a [`DecodeError`] naming the entity and the offending field. Decoding is
//! pure: no I/O, no cache access, no cross-entity resolution. References to
//! other entities (a program's parent series, an airing's program) are
//! either left as unresolved ids or supplied by the caller.

mod airing;
mod flags;
mod lineup;
mod program;
mod stars;
mod station;
mod status;

use std::sync::Arc;

use serde_json::Value;

pub use stars::{MAX_STARS, StarRatingError, parse_stars};

pub(crate) use lineup::{headend_records, lineup_records};

use crate::error::DecodeError;
use crate::model::{
    Airing, Lineup, LineupDetails, Message, Program, Station, SystemStatus, Tuning, UserStatus,
};
use crate::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};

/// Stateless decoder of upstream records
///
/// The only setting is the base used to make relative artwork uris
/// absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoder {
    image_base: String,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_API_VERSION)
    }
}

impl Decoder {
    /// Decoder resolving relative artwork uris against `{base_url}/{api_version}/`
    pub fn new(base_url: &str, api_version: &str) -> Self {
        Self {
            image_base: format!("{}/{}", base_url.trim_end_matches('/'), api_version),
        }
    }

    pub fn image_base(&self) -> &str {
        &self.image_base
    }

    pub fn program(&self, raw: &Value) -> Result<Program, DecodeError> {
        program::decode_program(raw, &self.image_base)
    }

    /// Decodes a station; `tuning` comes from the lineup map entry, if any
    pub fn station(&self, raw: &Value, tuning: Tuning) -> Result<Station, DecodeError> {
        station::decode_station(raw, tuning)
    }

    /// Decodes one airing of a schedule
    ///
    /// Fails with [`DecodeError::ReferentialMismatch`] when the record's
    /// program id is not `program.id`.
    pub fn airing(
        &self,
        raw: &Value,
        program: Arc<Program>,
        station: Arc<Station>,
    ) -> Result<Airing, DecodeError> {
        airing::decode_airing(raw, program, station)
    }

    pub fn lineup(&self, raw: &Value) -> Result<Lineup, DecodeError> {
        lineup::decode_lineup(raw)
    }

    /// Lineups offered by one headend of a headend search
    pub fn headend(&self, raw: &Value) -> Result<Vec<Lineup>, DecodeError> {
        lineup::decode_headend(raw)
    }

    pub fn lineup_details(&self, raw: &Value) -> Result<LineupDetails, DecodeError> {
        lineup::decode_lineup_details(raw)
    }

    pub fn user_status(&self, raw: &Value) -> Result<UserStatus, DecodeError> {
        status::decode_user_status(raw)
    }

    /// Latest service status found in a status document
    pub fn system_status(&self, raw: &Value) -> Option<SystemStatus> {
        status::decode_system_status(raw)
    }

    pub fn message(&self, raw: &Value) -> Result<Message, DecodeError> {
        status::decode_message(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_base() {
        assert_eq!(
            Decoder::new("https://guide.example.org/", "20141201").image_base(),
            "https://guide.example.org/20141201"
        );
        assert!(Decoder::default().image_base().ends_with(DEFAULT_API_VERSION));
    }

    #[test]
    fn test_airing_owned_by_decoded_program() {
        let decoder = Decoder::default();
        let program = decoder
            .program(&json!({
                "programID": "EP000000010001",
                "titles": [{"title120": "Pilot"}],
                "md5": "abc",
            }))
            .unwrap();
        let station = decoder
            .station(
                &json!({"stationID": "1", "callsign": "W1", "name": "One"}),
                Tuning::default(),
            )
            .unwrap();
        let airing = decoder
            .airing(
                &json!({"programID": "EP000000010001", "airDateTime": "2014-06-28T13:00:00Z", "duration": 1800}),
                Arc::new(program),
                Arc::new(station),
            )
            .unwrap();
        assert_eq!(airing.id(), airing.program().id);
        assert_eq!(
            airing.program().series_ref.as_deref(),
            Some("SH000000010000")
        );
    }
}
