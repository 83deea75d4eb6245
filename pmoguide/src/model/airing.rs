use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::{ContentRating, Program, Station};
use crate::vocabulary::{
    ContentType, DolbyStatus, FinaleStatus, LiveStatus, PremiereStatus, TvRating,
};

/// One scheduled broadcast of a program on a station
///
/// The airing id is always its program's id: there is no way to build an
/// `Airing` whose id differs from `program().id`. Re-associating the airing
/// with another program returns a new snapshot carrying the new id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Airing {
    id: String,
    start: DateTime<Utc>,
    duration_secs: u32,
    station: Arc<Station>,
    program: Arc<Program>,
    flags: BroadcastFlags,
}

impl Airing {
    pub fn new(
        program: Arc<Program>,
        station: Arc<Station>,
        start: DateTime<Utc>,
        duration_secs: u32,
        flags: BroadcastFlags,
    ) -> Self {
        Self {
            id: program.id.clone(),
            start,
            duration_secs,
            station,
            program,
            flags,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    pub fn station(&self) -> &Arc<Station> {
        &self.station
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn duration(&self) -> Duration {
        Duration::seconds(i64::from(self.duration_secs))
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration()
    }

    pub fn flags(&self) -> &BroadcastFlags {
        &self.flags
    }

    /// Whether the airing is on air at `instant`
    pub fn is_airing_at(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end()
    }

    /// Same airing attached to another program; the id follows the program
    pub fn with_program(&self, program: Arc<Program>) -> Self {
        Self {
            id: program.id.clone(),
            program,
            ..self.clone()
        }
    }

    pub fn with_station(&self, station: Arc<Station>) -> Self {
        Self {
            station,
            ..self.clone()
        }
    }
}

/// Broadcast properties of an airing
///
/// Upstream has sent these both as flat fields and as tag lists over the
/// years; both decode into this one structure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BroadcastFlags {
    pub closed_captioned: bool,
    pub stereo: bool,
    pub surround: bool,
    pub descriptive_video: bool,
    pub dubbed: bool,
    pub subtitled: bool,
    pub subtitle_language: Option<String>,
    pub sap: bool,
    pub sap_language: Option<String>,
    pub hdtv: bool,
    pub uhdtv: bool,
    pub hdr: bool,
    pub letterboxed: bool,
    pub enhanced: bool,
    pub is_3d: bool,
    pub new_airing: bool,
    pub time_approximate: bool,
    pub cable_in_the_classroom: bool,
    pub subject_to_blackout: bool,
    pub educational: bool,
    pub joined_in_progress: bool,
    pub left_in_progress: bool,
    pub sexual_content: bool,
    pub violent_content: bool,
    pub mature_language: bool,
    pub fantasy_violence: bool,
    pub suggestive_dialog: bool,
    pub dolby: DolbyStatus,
    pub live: LiveStatus,
    pub premiere: PremiereStatus,
    pub finale: FinaleStatus,
    pub tv_rating: TvRating,
    pub content_type: ContentType,
    pub content_source: Option<String>,
    pub part_number: Option<u32>,
    pub total_parts: Option<u32>,
    pub broadcast_language: Option<String>,
    pub ratings: Vec<ContentRating>,
}

impl BroadcastFlags {
    pub fn is_premiere(&self) -> bool {
        self.premiere != PremiereStatus::None
    }

    pub fn is_finale(&self) -> bool {
        self.finale != FinaleStatus::None
    }
}
