//! In-memory cache of decoded guide entities
//!
//! One [`EntityCache`] instance is shared (behind `Arc`) by every
//! orchestrator that should see the same data. Keys carry their entity kind,
//! so a program and a station with the same upstream id never collide.
//!
//! Only successfully decoded entities are ever stored. Concurrent misses on
//! one key may both fetch and both insert; both values decode from the same
//! upstream record, so the last write is as good as the first.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache as MokaCache;
use serde::Serialize;
use tracing::debug;

use crate::model::{Airing, Program, Station};

/// Default maximum number of cached entities
pub const DEFAULT_MAX_ENTRIES: u64 = 50_000;

/// Default time to live of a cached entity (6 hours)
pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 3600);

/// Kind of a cached entity; each kind has its own key prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum EntityKind {
    Program,
    Station,
    /// Airings of one station, keyed by station id
    Schedule,
}

impl EntityKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Program => "PROGRAM",
            Self::Station => "STATION",
            Self::Schedule => "SCHEDULE",
        }
    }
}

/// (entity kind, upstream id) pair, displayed as `"{KIND}:{id}"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub id: String,
}

impl CacheKey {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn program(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Program, id)
    }

    pub fn station(id: impl Into<String>) -> Self {
        Self::new(EntityKind::Station, id)
    }

    pub fn schedule(station_id: impl Into<String>) -> Self {
        Self::new(EntityKind::Schedule, station_id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.prefix(), self.id)
    }
}

/// A cached value; the variant always matches the key kind
#[derive(Debug, Clone, PartialEq)]
pub enum CachedEntity {
    Program(Arc<Program>),
    Station(Arc<Station>),
    Schedule(Arc<Vec<Airing>>),
}

impl CachedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Program(_) => EntityKind::Program,
            Self::Station(_) => EntityKind::Station,
            Self::Schedule(_) => EntityKind::Schedule,
        }
    }
}

/// Number of cached entities per kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub programs_count: u64,
    pub stations_count: u64,
    pub schedules_count: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.programs_count + self.stations_count + self.schedules_count
    }
}

/// Concurrency-safe store of decoded entities
#[derive(Clone)]
pub struct EntityCache {
    entries: MokaCache<CacheKey, CachedEntity>,
}

impl fmt::Debug for EntityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCache")
            .field("entry_count", &self.entries.entry_count())
            .finish()
    }
}

impl Default for EntityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityCache {
    /// Cache with the default capacity and time to live
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_MAX_ENTRIES, Some(DEFAULT_TTL))
    }

    /// Cache holding at most `max_entries` entities, forever unless evicted
    pub fn with_capacity(max_entries: u64) -> Self {
        Self::with_settings(max_entries, None)
    }

    /// Cache holding at most `max_entries` entities, each for at most `ttl`
    pub fn with_settings(max_entries: u64, ttl: Option<Duration>) -> Self {
        let mut builder = MokaCache::builder().max_capacity(max_entries);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            entries: builder.build(),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<CachedEntity> {
        self.entries.get(key)
    }

    /// Stores `entity` under `key`, replacing any previous value
    ///
    /// An entity whose kind differs from the key kind is not stored.
    pub fn put(&self, key: CacheKey, entity: CachedEntity) {
        if entity.kind() != key.kind {
            debug!(key = %key, kind = ?entity.kind(), "Refusing entity of another kind");
            return;
        }
        self.entries.insert(key, entity);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn invalidate(&self, key: &CacheKey) {
        debug!(key = %key, "Invalidating cache entry");
        self.entries.invalidate(key);
    }

    pub fn invalidate_all(&self) {
        debug!("Invalidating the whole entity cache");
        self.entries.invalidate_all();
    }

    // ============================================================================
    // Programs
    // ============================================================================

    pub fn get_program(&self, id: &str) -> Option<Arc<Program>> {
        match self.get(&CacheKey::program(id)) {
            Some(CachedEntity::Program(program)) => Some(program),
            _ => None,
        }
    }

    /// Stores a program under its own id
    pub fn put_program(&self, program: Arc<Program>) {
        self.put(
            CacheKey::program(program.id.clone()),
            CachedEntity::Program(program),
        );
    }

    // ============================================================================
    // Stations
    // ============================================================================

    pub fn get_station(&self, id: &str) -> Option<Arc<Station>> {
        match self.get(&CacheKey::station(id)) {
            Some(CachedEntity::Station(station)) => Some(station),
            _ => None,
        }
    }

    pub fn put_station(&self, station: Arc<Station>) {
        self.put(
            CacheKey::station(station.id.clone()),
            CachedEntity::Station(station),
        );
    }

    // ============================================================================
    // Schedules
    // ============================================================================

    pub fn get_schedule(&self, station_id: &str) -> Option<Arc<Vec<Airing>>> {
        match self.get(&CacheKey::schedule(station_id)) {
            Some(CachedEntity::Schedule(airings)) => Some(airings),
            _ => None,
        }
    }

    pub fn put_schedule(&self, station_id: impl Into<String>, airings: Arc<Vec<Airing>>) {
        self.put(
            CacheKey::schedule(station_id),
            CachedEntity::Schedule(airings),
        );
    }

    // ============================================================================
    // Maintenance
    // ============================================================================

    /// Counts cached entities per kind
    ///
    /// Pending evictions and invalidations are applied first, so the counts
    /// reflect what `get` would return.
    pub fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks();
        let mut stats = CacheStats::default();
        for (key, _) in self.entries.iter() {
            match key.kind {
                EntityKind::Program => stats.programs_count += 1,
                EntityKind::Station => stats.stations_count += 1,
                EntityKind::Schedule => stats.schedules_count += 1,
            }
        }
        stats
    }
}
