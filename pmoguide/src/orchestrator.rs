//! Batch resolution of guide entities
//!
//! [`FetchOrchestrator`] turns sets of ids into entities with as few
//! round trips as possible:
//!
//! 1. requested ids are split into cache hits and misses;
//! 2. all misses go upstream in exactly one batch request;
//! 3. every returned record is decoded on its own, a failing record only
//!    fails its own id;
//! 4. decoded entities are cached under their own id;
//! 5. the caller gets hits and fresh entities together, plus a manifest of
//!    the ids that did not resolve.
//!
//! Failed ids are never cached: the next call asks upstream for them again.
//!
//! Airings go through a prefetch cascade: the schedules of all requested
//! stations come in one batch, every program they reference is resolved by
//! one nested program batch, and only then are airings built. A schedule
//! request therefore costs at most two round trips whatever the number of
//! airings.

use std::sync::{Arc, RwLock};

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, EntityCache};
use crate::decode::{Decoder, headend_records, lineup_records};
use crate::diagnostics::Diagnostics;
use crate::error::{DecodeError, FailureReason, FetchError, PartialFailure, Result};
use crate::model::{Airing, Lineup, Message, Program, Station, SystemStatus, UserStatus};
use crate::raw::record_id;
use crate::transport::{BatchRequest, Transport, response_code};

/// Entities resolved by one batch call, with the manifest of failed ids
///
/// Entities are keyed by id in request order. Callers must expect fewer
/// entities than requested ids and look at `failures` for the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<T> {
    pub entities: IndexMap<String, Arc<T>>,
    pub failures: Vec<PartialFailure>,
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self {
            entities: IndexMap::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> BatchResult<T> {
    pub fn get(&self, id: &str) -> Option<&Arc<T>> {
        self.entities.get(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// True when every requested id resolved
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failure(&self, id: &str) -> Option<&PartialFailure> {
        self.failures.iter().find(|failure| failure.id == id)
    }

    pub fn failed_ids(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|failure| failure.id.as_str())
    }

    pub fn into_entities(self) -> IndexMap<String, Arc<T>> {
        self.entities
    }
}

/// Resolves guide entities through a [`Transport`] and an [`EntityCache`]
pub struct FetchOrchestrator<T: Transport> {
    transport: T,
    cache: Arc<EntityCache>,
    decoder: Decoder,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    use_cache: bool,
    status: RwLock<Option<Arc<UserStatus>>>,
}

impl<T: Transport> std::fmt::Debug for FetchOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchOrchestrator")
            .field("cache", &self.cache)
            .field("decoder", &self.decoder)
            .field("has_diagnostics", &self.diagnostics.is_some())
            .field("use_cache", &self.use_cache)
            .finish()
    }
}

impl<T: Transport> FetchOrchestrator<T> {
    /// Orchestrator with a private cache and default settings
    pub fn new(transport: T) -> Self {
        Self::builder(transport).build()
    }

    pub fn builder(transport: T) -> OrchestratorBuilder<T> {
        OrchestratorBuilder::new(transport)
    }

    pub fn cache(&self) -> &Arc<EntityCache> {
        &self.cache
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ========================================================================
    // Programs
    // ========================================================================

    /// Resolves programs by id
    ///
    /// Cache misses are fetched with a single batch request. A transport
    /// failure fails the whole call; anything else is reported per id in
    /// the manifest.
    pub fn fetch_programs<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> std::result::Result<BatchResult<Program>, FetchError> {
        let requested: IndexSet<&str> = ids.iter().map(|id| id.as_ref()).collect();
        let mut found: IndexMap<String, Arc<Program>> = IndexMap::new();
        let mut misses: Vec<String> = Vec::new();

        for id in &requested {
            match self.cached_program(id) {
                Some(program) => {
                    found.insert(id.to_string(), program);
                }
                None => misses.push(id.to_string()),
            }
        }
        debug!(
            hits = found.len(),
            misses = misses.len(),
            "Resolving programs"
        );

        let mut failures = Vec::new();
        if !misses.is_empty() {
            let records = self.transport.submit(&BatchRequest::programs(misses.clone()))?;
            let mut unattributed = Vec::new();
            for (index, raw) in records.iter().enumerate() {
                let Some(id) = record_id(raw, "programID") else {
                    let err = self.decoder.program(raw).err().unwrap_or_else(|| {
                        DecodeError::missing("Program", "programID")
                    });
                    let id = format!("record[{}]", index);
                    unattributed.push(self.decode_failure(&id, raw, err));
                    continue;
                };
                if let Some(failure) = upstream_failure(&id, raw) {
                    failures.push(failure);
                    continue;
                }
                match self.decoder.program(raw) {
                    Ok(program) => {
                        let program = Arc::new(program);
                        self.cache.put_program(program.clone());
                        found.insert(program.id.clone(), program);
                    }
                    Err(err) => failures.push(self.decode_failure(&id, raw, err)),
                }
            }
            settle_unresolved(&misses, &found, &mut failures, unattributed);
        }

        let entities: IndexMap<String, Arc<Program>> = requested
            .iter()
            .filter_map(|id| found.get(*id).map(|p| (id.to_string(), p.clone())))
            .collect();
        log_failures("programs", &failures);
        Ok(BatchResult { entities, failures })
    }

    /// Resolves one program; its failure comes back as a [`FetchError`]
    pub fn fetch_program(&self, id: &str) -> std::result::Result<Arc<Program>, FetchError> {
        let mut batch = self.fetch_programs(&[id])?;
        match batch.entities.swap_remove(id) {
            Some(program) => Ok(program),
            None => Err(batch
                .failures
                .into_iter()
                .next()
                .unwrap_or_else(|| PartialFailure::new(id, FailureReason::NotReturned))
                .into()),
        }
    }

    /// Resolves the parent series of an episode, if it has one
    pub fn resolve_series(
        &self,
        program: &Program,
    ) -> std::result::Result<Option<Arc<Program>>, FetchError> {
        match &program.series_ref {
            Some(series_id) => self.fetch_program(series_id).map(Some),
            None => Ok(None),
        }
    }

    // ========================================================================
    // Airings
    // ========================================================================

    /// Resolves the airings of each station, keyed by station id
    ///
    /// Costs one schedule batch for the stations missing from the cache and
    /// at most one program batch for the programs those schedules reference.
    /// Airings whose program cannot be resolved are left out and reported as
    /// `"{station_id}/{program_id}"` failures.
    pub fn fetch_station_airings(
        &self,
        stations: &[Arc<Station>],
    ) -> std::result::Result<BatchResult<Vec<Airing>>, FetchError> {
        let by_id: IndexMap<&str, &Arc<Station>> =
            stations.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut found: IndexMap<String, Arc<Vec<Airing>>> = IndexMap::new();
        let mut misses: Vec<String> = Vec::new();

        for id in by_id.keys() {
            match self.cached_schedule(id) {
                Some(airings) => {
                    found.insert(id.to_string(), airings);
                }
                None => misses.push(id.to_string()),
            }
        }
        debug!(
            hits = found.len(),
            misses = misses.len(),
            "Resolving station schedules"
        );

        let mut failures = Vec::new();
        if !misses.is_empty() {
            let records = self.transport.submit(&BatchRequest::schedules(misses.clone()))?;

            // Keep only usable schedules of requested stations
            let mut schedules: Vec<(&Arc<Station>, &[Value])> = Vec::new();
            let mut unattributed = Vec::new();
            for (index, raw) in records.iter().enumerate() {
                let Some(id) = record_id(raw, "stationID") else {
                    let err = DecodeError::missing("Schedule", "stationID");
                    let id = format!("record[{}]", index);
                    unattributed.push(self.decode_failure(&id, raw, err));
                    continue;
                };
                if let Some(failure) = upstream_failure(&id, raw) {
                    failures.push(failure);
                    continue;
                }
                let Some(station) = by_id.get(id.as_str()) else {
                    debug!(station = %id, "Ignoring schedule of unrequested station");
                    continue;
                };
                match raw.get("programs") {
                    Some(Value::Array(airings)) => schedules.push((*station, airings.as_slice())),
                    _ => {
                        let err = DecodeError::missing("Schedule", "programs");
                        failures.push(self.decode_failure(&id, raw, err));
                    }
                }
            }

            // Prefetch every referenced program in one nested batch
            let program_ids: IndexSet<String> = schedules
                .iter()
                .flat_map(|(_, airings)| airings.iter())
                .filter_map(|raw| record_id(raw, "programID"))
                .collect();
            let program_ids: Vec<String> = program_ids.into_iter().collect();
            let programs = if program_ids.is_empty() {
                BatchResult::default()
            } else {
                self.fetch_programs(&program_ids)?
            };

            for (station, raw_airings) in schedules {
                let mut complete = true;
                let mut airings = Vec::with_capacity(raw_airings.len());
                for raw in raw_airings {
                    let program_id = record_id(raw, "programID").unwrap_or_default();
                    let failure_id = format!("{}/{}", station.id, program_id);
                    let Some(program) = programs.get(&program_id) else {
                        complete = false;
                        let reason = if program_id.is_empty() {
                            FailureReason::Decode(DecodeError::missing("Airing", "programID"))
                        } else {
                            FailureReason::MissingProgram {
                                program_id: program_id.clone(),
                            }
                        };
                        failures.push(PartialFailure::new(failure_id, reason));
                        continue;
                    };
                    match self.decoder.airing(raw, program.clone(), station.clone()) {
                        Ok(airing) => airings.push(airing),
                        Err(err) => {
                            complete = false;
                            failures.push(self.decode_failure(&failure_id, raw, err));
                        }
                    }
                }
                airings.sort_by_key(Airing::start);

                let airings = Arc::new(airings);
                // A schedule missing airings is not cached, so they get retried
                if complete {
                    self.cache.put_schedule(station.id.clone(), airings.clone());
                }
                found.insert(station.id.clone(), airings);
            }
            settle_unresolved(&misses, &found, &mut failures, unattributed);
        }

        let entities = by_id
            .keys()
            .filter_map(|id| found.get(*id).map(|a| (id.to_string(), a.clone())))
            .collect();
        log_failures("schedules", &failures);
        Ok(BatchResult { entities, failures })
    }

    /// Resolves the airings of every station of a loaded lineup
    pub fn fetch_airings(&self, lineup: &Lineup) -> Result<BatchResult<Vec<Airing>>> {
        let stations: Vec<Arc<Station>> = lineup.stations()?.cloned().collect();
        Ok(self.fetch_station_airings(&stations)?)
    }

    // ========================================================================
    // Lineups
    // ========================================================================

    /// Lineups registered on the account, keyed by lineup id
    pub fn lineups(&self) -> std::result::Result<BatchResult<Lineup>, FetchError> {
        let records = match self.transport.submit(&BatchRequest::lineups()) {
            Ok(records) => records,
            Err(err) if err.api_code() == Some(response_code::NO_LINEUPS) => {
                info!("No lineup registered on the account");
                return Ok(BatchResult::default());
            }
            Err(err) => return Err(err.into()),
        };

        let mut result = BatchResult::default();
        for (index, raw) in lineup_records(&records).into_iter().enumerate() {
            match self.decoder.lineup(raw) {
                Ok(lineup) => {
                    result.entities.insert(lineup.id.clone(), Arc::new(lineup));
                }
                Err(err) => {
                    let id = record_id(raw, "uri").unwrap_or_else(|| format!("lineup[{}]", index));
                    result.failures.push(self.decode_failure(&id, raw, err));
                }
            }
        }
        log_failures("lineups", &result.failures);
        Ok(result)
    }

    /// Lineups available at a location, keyed by lineup id
    pub fn search_lineups(
        &self,
        country: &str,
        postal_code: &str,
    ) -> std::result::Result<BatchResult<Lineup>, FetchError> {
        let records = self
            .transport
            .submit(&BatchRequest::headends(country, postal_code))?;

        let mut result = BatchResult::default();
        for (index, raw) in headend_records(&records).into_iter().enumerate() {
            match self.decoder.headend(raw) {
                Ok(lineups) => {
                    for lineup in lineups {
                        result.entities.insert(lineup.id.clone(), Arc::new(lineup));
                    }
                }
                Err(err) => {
                    let id =
                        record_id(raw, "headend").unwrap_or_else(|| format!("headend[{}]", index));
                    result.failures.push(self.decode_failure(&id, raw, err));
                }
            }
        }
        debug!(
            country,
            postal_code,
            lineups = result.len(),
            "Lineup search completed"
        );
        log_failures("headends", &result.failures);
        Ok(result)
    }

    /// The account lineup with this uri (or id), unloaded
    pub fn lineup(&self, uri: &str) -> std::result::Result<Option<Lineup>, FetchError> {
        let lineups = self.lineups()?;
        Ok(lineups
            .entities
            .values()
            .find(|lineup| lineup.uri == uri || lineup.id == uri)
            .map(|lineup| Lineup::clone(lineup)))
    }

    /// Loads stations and channel map of a lineup
    ///
    /// Returns a new loaded snapshot; `lineup` itself is left untouched.
    /// Decoded stations are cached.
    pub fn load_lineup_details(&self, lineup: &Lineup) -> std::result::Result<Lineup, FetchError> {
        let records = self
            .transport
            .submit(&BatchRequest::lineup_map(lineup.uri.clone()))?;
        let Some(raw) = records.first() else {
            return Err(PartialFailure::new(lineup.id.clone(), FailureReason::NotReturned).into());
        };

        let details = self
            .decoder
            .lineup_details(raw)
            .map_err(|err| self.decode_failure(&lineup.id, raw, err))?;

        for station in details.stations.values() {
            self.cache.put_station(station.clone());
        }
        info!(
            lineup = %lineup.id,
            stations = details.stations.len(),
            failures = details.failures.len(),
            "Lineup details loaded"
        );
        Ok(lineup.with_details(details))
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Account status, fetched once and kept until a purge
    pub fn user_status(&self) -> std::result::Result<Arc<UserStatus>, FetchError> {
        if let Some(status) = self.read_status() {
            return Ok(status);
        }
        self.refresh_status()
    }

    /// Fetches the account status again
    pub fn refresh_status(&self) -> std::result::Result<Arc<UserStatus>, FetchError> {
        let records = self.transport.submit(&BatchRequest::status())?;
        let Some(raw) = records.first() else {
            return Err(PartialFailure::new("status", FailureReason::NotReturned).into());
        };
        let status = self
            .decoder
            .user_status(raw)
            .map(Arc::new)
            .map_err(|err| self.decode_failure("status", raw, err))?;
        self.write_status(Some(status.clone()));
        Ok(status)
    }

    /// Latest service status reported with the account status
    pub fn system_status(&self) -> std::result::Result<Option<SystemStatus>, FetchError> {
        Ok(self.user_status()?.system_status.clone())
    }

    /// Deletes a message upstream and forgets the cached account status
    pub fn delete_message(&self, message: &Message) -> std::result::Result<(), FetchError> {
        self.transport
            .submit(&BatchRequest::delete_message(message.id.clone()))?;
        info!(message = %message.id, "Message deleted");
        self.write_status(None);
        Ok(())
    }

    // ========================================================================
    // Cache lifecycle
    // ========================================================================

    /// Drops every cached entity and the cached account status
    pub fn purge_cache(&self) {
        self.cache.invalidate_all();
        self.write_status(None);
    }

    /// Drops one cached entity
    pub fn purge(&self, key: &CacheKey) {
        self.cache.invalidate(key);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn cached_program(&self, id: &str) -> Option<Arc<Program>> {
        self.use_cache.then(|| self.cache.get_program(id)).flatten()
    }

    fn cached_schedule(&self, station_id: &str) -> Option<Arc<Vec<Airing>>> {
        self.use_cache
            .then(|| self.cache.get_schedule(station_id))
            .flatten()
    }

    fn decode_failure(&self, id: &str, raw: &Value, err: DecodeError) -> PartialFailure {
        if let Some(diagnostics) = &self.diagnostics {
            diagnostics.report_decode_failure(id, raw, &err);
        }
        PartialFailure::new(id, err)
    }

    fn read_status(&self) -> Option<Arc<UserStatus>> {
        match self.status.read() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn write_status(&self, value: Option<Arc<UserStatus>>) {
        match self.status.write() {
            Ok(mut status) => *status = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

/// Failure for a record carrying a non-zero upstream code
fn upstream_failure(id: &str, raw: &Value) -> Option<PartialFailure> {
    let code = response_code::of(raw);
    if code == response_code::OK {
        return None;
    }
    debug!(id, code, "Upstream refused record");
    Some(PartialFailure::new(
        id,
        FailureReason::Upstream {
            code,
            message: response_code::message_of(raw),
        },
    ))
}

/// Accounts for every requested id that neither resolved nor failed
///
/// Failures of records whose id could not be read are attributed, in
/// order, to those ids; ids left over are `NotReturned`. Each bad record
/// therefore yields exactly one manifest entry.
fn settle_unresolved<V>(
    requested: &[String],
    found: &IndexMap<String, V>,
    failures: &mut Vec<PartialFailure>,
    unattributed: Vec<PartialFailure>,
) {
    let unresolved: Vec<String> = requested
        .iter()
        .filter(|id| !found.contains_key(*id))
        .filter(|id| !failures.iter().any(|f| &f.id == *id))
        .cloned()
        .collect();

    let mut unattributed = unattributed.into_iter();
    for id in unresolved {
        let failure = match unattributed.next() {
            Some(failure) => PartialFailure::new(id, failure.reason),
            None => PartialFailure::new(id, FailureReason::NotReturned),
        };
        failures.push(failure);
    }
    failures.extend(unattributed);
}

fn log_failures(what: &str, failures: &[PartialFailure]) {
    if !failures.is_empty() {
        warn!(
            batch = what,
            failures = failures.len(),
            "Batch completed with unresolved ids"
        );
    }
}

/// Builder for a [`FetchOrchestrator`]
pub struct OrchestratorBuilder<T: Transport> {
    transport: T,
    cache: Option<Arc<EntityCache>>,
    decoder: Decoder,
    diagnostics: Option<Arc<dyn Diagnostics>>,
    use_cache: bool,
}

impl<T: Transport> OrchestratorBuilder<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            cache: None,
            decoder: Decoder::default(),
            diagnostics: None,
            use_cache: true,
        }
    }

    /// Shares an existing cache; a private one is created otherwise
    pub fn cache(mut self, cache: Arc<EntityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn decoder(mut self, decoder: Decoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// With `false`, cache reads are skipped; fresh entities are still stored
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn build(self) -> FetchOrchestrator<T> {
        FetchOrchestrator {
            transport: self.transport,
            cache: self.cache.unwrap_or_default(),
            decoder: self.decoder,
            diagnostics: self.diagnostics,
            use_cache: self.use_cache,
            status: RwLock::new(None),
        }
    }
}
