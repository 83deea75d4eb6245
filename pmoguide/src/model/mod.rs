//! Typed guide entities
//!
//! All entities are immutable once decoded. Operations that "change" an
//! entity (`Airing::with_program`, `Lineup::with_details`...) return a new
//! snapshot.

mod airing;
mod lineup;
mod program;
mod station;
mod status;

pub use airing::{Airing, BroadcastFlags};
pub use lineup::{Lineup, LineupDetails, lineup_id_from_uri};
pub use program::{
    ContentRating, Credit, EventDetails, MovieInfo, Program, QualityRating, RatingScale, Team,
    series_id_for,
};
pub use station::{Broadcaster, Logo, Station, Tuning};
pub use status::{Account, LineupStamp, Message, SystemStatus, UserStatus};
