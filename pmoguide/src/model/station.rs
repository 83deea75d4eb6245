use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A broadcast station as listed in a lineup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    pub callsign: String,
    pub name: String,
    pub affiliate: Option<String>,
    pub broadcaster: Option<Broadcaster>,
    pub logo: Option<Logo>,
    /// Over-the-air tuning data taken from the lineup channel map
    pub tuning: Tuning,
}

impl Station {
    pub fn new(
        id: impl Into<String>,
        callsign: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            callsign: callsign.into(),
            name: name.into(),
            affiliate: None,
            broadcaster: None,
            logo: None,
            tuning: Tuning::default(),
        }
    }

    /// Same station with different tuning data
    pub fn with_tuning(&self, tuning: Tuning) -> Self {
        Self {
            tuning,
            ..self.clone()
        }
    }
}

/// Broadcaster location
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Broadcaster {
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub md5: Option<String>,
    pub modified: Option<DateTime<Utc>>,
}

/// Physical (UHF/VHF) and ATSC virtual channel numbers of a station
///
/// Values are kept as sent. A zero means "not set" to the channel number
/// derivation, but a present `uhf_vhf` still marks the lineup as
/// physically tuned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tuning {
    pub uhf_vhf: Option<u32>,
    pub atsc_major: Option<u32>,
    pub atsc_minor: Option<u32>,
}

impl Tuning {
    pub fn new(uhf_vhf: Option<u32>, atsc_major: Option<u32>, atsc_minor: Option<u32>) -> Self {
        Self {
            uhf_vhf,
            atsc_major,
            atsc_minor,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.uhf_vhf.is_none() && self.atsc_major.is_none() && self.atsc_minor.is_none()
    }
}
