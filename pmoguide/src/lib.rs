//! # pmoguide - TV guide data layer for PMOGuide
//!
//! This crate turns the JSON documents of a Schedules Direct style guide
//! feed into typed, immutable entities (programs, stations, airings,
//! lineups) and resolves them in batches behind an in-memory cache.
//!
//! ## Architecture
//!
//! - [`Decoder`]: one raw record in, one typed entity (or a [`DecodeError`])
//!   out. Pure, never touches the network or the cache.
//! - [`EntityCache`]: concurrency-safe store keyed by (entity kind, id).
//! - [`ChannelMapBuilder`]: derives logical and physical channel numbers of
//!   a lineup from its map entries and stations.
//! - [`FetchOrchestrator`]: resolves id sets with one batch request per
//!   set of cache misses, through an injected [`Transport`].
//!
//! ## Module layout
//!
//! ```text
//! pmoguide/
//! ├── src/
//! │   ├── lib.rs            # This file
//! │   ├── error.rs          # Error types
//! │   ├── raw.rs            # Typed access to raw records
//! │   ├── vocabulary.rs     # Closed vocabularies with UNKNOWN fallback
//! │   ├── model/            # Entities
//! │   ├── decode/           # Record decoders
//! │   ├── channel_map.rs    # Channel numbering
//! │   ├── cache.rs          # Entity cache
//! │   ├── transport.rs      # Transport seam and batch requests
//! │   ├── diagnostics.rs    # Decode failure hook
//! │   ├── http.rs           # ureq transport (feature `http`)
//! │   ├── orchestrator.rs   # Batch resolution
//! │   └── config_ext.rs     # pmoconfig settings (feature `pmoconfig`)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pmoguide::{FetchOrchestrator, HttpTransport};
//!
//! fn main() -> pmoguide::Result<()> {
//!     let transport = HttpTransport::builder().token("session-token").build();
//!     let orchestrator = FetchOrchestrator::new(transport);
//!
//!     for lineup in orchestrator.lineups()?.entities.values() {
//!         let lineup = orchestrator.load_lineup_details(lineup)?;
//!         let airings = orchestrator.fetch_airings(&lineup)?;
//!         println!("{}: {} stations", lineup.name, airings.len());
//!         for failure in &airings.failures {
//!             println!("  unresolved {}", failure);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! Batch operations never fail because of one bad record: they return a
//! [`BatchResult`] holding the resolved entities and a manifest of
//! [`PartialFailure`]s. Only a failed exchange ([`FetchError::TransportFailure`])
//! fails the call as a whole.

pub mod cache;
pub mod channel_map;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod raw;
pub mod transport;
pub mod vocabulary;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "pmoconfig")]
pub mod config_ext;

/// Default base URL of the guide feed
pub const DEFAULT_BASE_URL: &str = "https://data2.schedulesdirect.org";

/// Default API version segment of feed URLs
pub const DEFAULT_API_VERSION: &str = "20141201";

pub use cache::{CacheKey, CacheStats, CachedEntity, EntityCache, EntityKind};
pub use channel_map::{ChannelMap, ChannelMapBuilder, ChannelMapEntry, ChannelMode};
pub use decode::{Decoder, StarRatingError, parse_stars};
pub use diagnostics::{CollectingDiagnostics, Diagnostics, TracingDiagnostics};
pub use error::{
    DecodeError, FailureReason, FetchError, GuideError, PartialFailure, Result, StateError,
    TransportError,
};
pub use model::{
    Airing, BroadcastFlags, Lineup, LineupDetails, Message, Program, Station, SystemStatus,
    Tuning, UserStatus,
};
pub use orchestrator::{BatchResult, FetchOrchestrator, OrchestratorBuilder};
pub use raw::RawRecord;
pub use transport::{BatchRequest, Resource, Transport};

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "pmoconfig")]
pub use config_ext::GuideConfigExt;
