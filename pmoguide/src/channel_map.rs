//! Channel numbering of a lineup
//!
//! A lineup maps each station to one or more channel numbers. Cable and
//! satellite lineups give them directly as channel strings; over-the-air
//! lineups give tuning data (UHF/VHF channel, ATSC major/minor) from which
//! both a *logical* number (what the guide grid shows) and a *physical*
//! number (what a tuner needs) are derived.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::model::{Station, Tuning};

/// One entry of a lineup channel map, as sent by upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMapEntry {
    pub station_id: String,
    /// Provider channel string (`"4.1"`, `"702"`)
    pub channel: Option<String>,
    pub tuning: Tuning,
}

impl ChannelMapEntry {
    pub fn new(station_id: impl Into<String>, channel: Option<String>, tuning: Tuning) -> Self {
        Self {
            station_id: station_id.into(),
            channel,
            tuning,
        }
    }
}

/// How a channel map was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ChannelMode {
    /// From provider channel strings
    #[default]
    Logical,
    /// From UHF/VHF and ATSC tuning data
    Physical,
}

/// Logical and physical channel numbers per station id
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ChannelMap {
    pub mode: ChannelMode,
    pub logical: IndexMap<String, Vec<String>>,
    pub physical: IndexMap<String, Vec<String>>,
    /// True when at least one station's physical number differs from its logical one
    pub has_physical_mapping: bool,
}

impl ChannelMap {
    /// Tunable channel numbers: the physical map when it carries extra
    /// information, the logical map otherwise
    pub fn physical_station_map(&self) -> &IndexMap<String, Vec<String>> {
        if self.has_physical_mapping {
            &self.physical
        } else {
            &self.logical
        }
    }

    /// Logical channel numbers of one station
    pub fn channels_of(&self, station_id: &str) -> &[String] {
        self.logical
            .get(station_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl Tuning {
    /// ATSC virtual channel: `"{major}-{minor}"`, or whichever single part is set
    pub fn logical_number(&self) -> Option<String> {
        let parts: Vec<String> = [self.atsc_major, self.atsc_minor]
            .into_iter()
            .flatten()
            .filter(|n| *n > 0)
            .map(|n| n.to_string())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("-"))
        }
    }

    /// RF channel, suffixed with the logical number when there is one
    pub fn physical_number(&self) -> Option<String> {
        let uhf_vhf = self.uhf_vhf.filter(|n| *n > 0)?;
        Some(match self.logical_number() {
            Some(logical) => format!("{}-{}", uhf_vhf, logical),
            None => uhf_vhf.to_string(),
        })
    }
}

/// Derives a [`ChannelMap`] from channel map entries and decoded stations
#[derive(Debug, Clone, Default)]
pub struct ChannelMapBuilder {
    entries: Vec<ChannelMapEntry>,
}

impl ChannelMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<ChannelMapEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: ChannelMapEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ChannelMapEntry] {
        &self.entries
    }

    /// Tuning data of each station, as given by its last map entry
    pub fn tuning_by_station(&self) -> IndexMap<String, Tuning> {
        self.entries
            .iter()
            .filter(|entry| !entry.tuning.is_empty())
            .map(|entry| (entry.station_id.clone(), entry.tuning))
            .collect()
    }

    /// Physical mode as soon as any entry or station carries a UHF/VHF field
    pub fn mode(&self, stations: &IndexMap<String, Arc<Station>>) -> ChannelMode {
        let entry_has_rf = self.entries.iter().any(|e| e.tuning.uhf_vhf.is_some());
        let station_has_rf = stations.values().any(|s| s.tuning.uhf_vhf.is_some());
        if entry_has_rf || station_has_rf {
            ChannelMode::Physical
        } else {
            ChannelMode::Logical
        }
    }

    pub fn build(&self, stations: &IndexMap<String, Arc<Station>>) -> ChannelMap {
        match self.mode(stations) {
            ChannelMode::Logical => self.build_logical(),
            ChannelMode::Physical => Self::build_physical(stations),
        }
    }

    fn build_logical(&self) -> ChannelMap {
        let mut logical: IndexMap<String, Vec<String>> = IndexMap::new();
        for entry in &self.entries {
            match &entry.channel {
                Some(channel) => logical
                    .entry(entry.station_id.clone())
                    .or_default()
                    .push(channel.replace('.', "-")),
                None => debug!(station = %entry.station_id, "Channel map entry without channel"),
            }
        }
        ChannelMap {
            mode: ChannelMode::Logical,
            logical,
            physical: IndexMap::new(),
            has_physical_mapping: false,
        }
    }

    fn build_physical(stations: &IndexMap<String, Arc<Station>>) -> ChannelMap {
        let mut map = ChannelMap {
            mode: ChannelMode::Physical,
            ..ChannelMap::default()
        };
        for station in stations.values() {
            let physical = station.tuning.physical_number();
            let logical = station.tuning.logical_number().or_else(|| physical.clone());

            if let Some(logical) = &logical {
                map.logical
                    .entry(station.id.clone())
                    .or_default()
                    .push(logical.clone());
            }
            if let Some(physical) = &physical {
                map.physical
                    .entry(station.id.clone())
                    .or_default()
                    .push(physical.clone());
            }
            if let (Some(physical), Some(logical)) = (&physical, &logical) {
                if physical != logical {
                    map.has_physical_mapping = true;
                }
            }
        }
        map
    }
}
