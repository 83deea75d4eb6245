use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::Station;
use crate::channel_map::ChannelMap;
use crate::error::{PartialFailure, StateError};

/// A named collection of stations with its channel numbering
///
/// A lineup is first known by its summary (name, location, uri). Stations
/// and channel numbers arrive with an explicit details load, which yields a
/// new loaded snapshot; until then the accessors depending on them fail with
/// [`StateError::NotYetLoaded`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lineup {
    pub id: String,
    pub name: String,
    pub location: String,
    pub uri: String,
    /// Transport type (Cable, Antenna, Satellite...)
    pub transport: Option<String>,
    details: Option<Arc<LineupDetails>>,
}

/// Everything a details load brings to a lineup
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct LineupDetails {
    pub stations: IndexMap<String, Arc<Station>>,
    pub channel_map: ChannelMap,
    pub last_modified: Option<DateTime<Utc>>,
    /// Stations and map entries that did not decode
    #[serde(skip)]
    pub failures: Vec<PartialFailure>,
}

impl Lineup {
    /// Lineup summary; the id is the last segment of `uri`
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        uri: impl Into<String>,
        transport: Option<String>,
    ) -> Self {
        let uri = uri.into();
        Self {
            id: lineup_id_from_uri(&uri).to_string(),
            name: name.into(),
            location: location.into(),
            uri,
            transport,
            details: None,
        }
    }

    /// Loaded snapshot of this lineup
    pub fn with_details(&self, details: LineupDetails) -> Self {
        Self {
            details: Some(Arc::new(details)),
            ..self.clone()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.details.is_some()
    }

    pub fn details(&self) -> Result<&LineupDetails, StateError> {
        self.details
            .as_deref()
            .ok_or_else(|| StateError::NotYetLoaded {
                lineup: self.id.clone(),
            })
    }

    pub fn stations(&self) -> Result<impl Iterator<Item = &Arc<Station>>, StateError> {
        Ok(self.details()?.stations.values())
    }

    pub fn get_station(&self, id: &str) -> Result<Option<&Arc<Station>>, StateError> {
        Ok(self.details()?.stations.get(id))
    }

    /// Station id to the provider (guide grid) channel numbers
    pub fn logical_channel_map(&self) -> Result<&IndexMap<String, Vec<String>>, StateError> {
        Ok(&self.details()?.channel_map.logical)
    }

    /// Station id to tunable channel numbers
    ///
    /// This is the physical map when the lineup has a physical mapping that
    /// differs from the logical one, the logical map otherwise.
    pub fn physical_station_map(&self) -> Result<&IndexMap<String, Vec<String>>, StateError> {
        Ok(self.details()?.channel_map.physical_station_map())
    }

    pub fn has_physical_mapping(&self) -> Result<bool, StateError> {
        Ok(self.details()?.channel_map.has_physical_mapping)
    }

    pub fn last_modified(&self) -> Result<Option<DateTime<Utc>>, StateError> {
        Ok(self.details()?.last_modified)
    }
}

/// Last path segment of a lineup uri (`/20141201/lineups/USA-MI-X-48104` gives `USA-MI-X-48104`)
pub fn lineup_id_from_uri(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}
