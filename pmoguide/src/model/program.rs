use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vocabulary::{ColorCode, Role, SourceType};

/// A decoded program (episode, movie, sports event, series record...)
///
/// Programs are immutable snapshots; the cache shares them behind `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    /// Integrity checksum of the upstream record
    pub md5: String,
    pub title: String,
    /// Shorter title variants, longest first, empty ones omitted
    pub short_titles: Vec<String>,
    pub episode_title: Option<String>,
    pub alternate_title: Option<String>,
    /// Full description; falls back to the longest short description
    pub description: String,
    /// Shorter descriptions ranked by descending length
    pub short_descriptions: Vec<String>,
    pub description_language: Option<String>,
    pub alternate_description: Option<String>,
    pub alternate_description_short: Option<String>,
    pub series_description: Option<String>,
    pub credits: Vec<Credit>,
    pub advisories: Vec<String>,
    pub content_ratings: Vec<ContentRating>,
    pub quality_ratings: Vec<QualityRating>,
    /// Show type first (unless "Series"), then upstream genres, without duplicates
    pub genres: Vec<String>,
    pub movie: Option<MovieInfo>,
    pub color_code: ColorCode,
    pub source_type: SourceType,
    pub original_air_date: Option<NaiveDate>,
    pub game_start: Option<DateTime<Utc>>,
    pub holiday: Option<String>,
    pub event: Option<EventDetails>,
    pub syndicated_episode_number: Option<String>,
    pub alternate_episode_number: Option<String>,
    pub made_for_tv: bool,
    /// Absolute artwork URLs
    pub images: Vec<String>,
    /// Opaque per-source metadata blocks (e.g. `{"Gracenote": {...}}`)
    pub metadata: Vec<Value>,
    /// Parent series id for episode programs, left unresolved
    pub series_ref: Option<String>,
}

impl Program {
    /// Minimal program, mostly useful to build fixtures
    pub fn new(id: impl Into<String>, title: impl Into<String>, md5: impl Into<String>) -> Self {
        let id = id.into();
        let series_ref = series_id_for(&id);
        Self {
            id,
            md5: md5.into(),
            title: title.into(),
            short_titles: Vec::new(),
            episode_title: None,
            alternate_title: None,
            description: String::new(),
            short_descriptions: Vec::new(),
            description_language: None,
            alternate_description: None,
            alternate_description_short: None,
            series_description: None,
            credits: Vec::new(),
            advisories: Vec::new(),
            content_ratings: Vec::new(),
            quality_ratings: Vec::new(),
            genres: Vec::new(),
            movie: None,
            color_code: ColorCode::None,
            source_type: SourceType::None,
            original_air_date: None,
            game_start: None,
            holiday: None,
            event: None,
            syndicated_episode_number: None,
            alternate_episode_number: None,
            made_for_tv: false,
            images: Vec::new(),
            metadata: Vec::new(),
            series_ref,
        }
    }

    pub fn is_episode(&self) -> bool {
        self.id.starts_with(EPISODE_PREFIX)
    }

    pub fn is_movie(&self) -> bool {
        self.movie.is_some() || self.id.starts_with("MV")
    }

    /// Star rating given by the star-based quality rating, if any
    pub fn star_rating(&self) -> Option<f32> {
        self.quality_ratings
            .iter()
            .find(|r| r.scale == RatingScale::Stars)
            .map(|r| r.value)
    }

    /// The best description fitting in `max_len` characters
    pub fn description_within(&self, max_len: usize) -> Option<&str> {
        std::iter::once(self.description.as_str())
            .chain(self.short_descriptions.iter().map(String::as_str))
            .find(|d| !d.is_empty() && d.chars().count() <= max_len)
    }
}

const EPISODE_PREFIX: &str = "EP";
const SERIES_PREFIX: &str = "SH";

/// Derives the parent series id of an episode id
///
/// `EP012345670023` becomes `SH012345670000`: the episode prefix is swapped
/// for the series prefix and the four-digit episode suffix is zeroed.
/// Returns `None` for non-episode ids or ids too short to carry a suffix.
pub fn series_id_for(program_id: &str) -> Option<String> {
    let body = program_id.strip_prefix(EPISODE_PREFIX)?;
    if body.len() < 4 || !body.is_char_boundary(body.len() - 4) {
        return None;
    }
    Some(format!("{}{}0000", SERIES_PREFIX, &body[..body.len() - 4]))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub role: Role,
    /// Role as sent by upstream, kept for display
    pub role_text: String,
    pub name: String,
    pub billing_order: u32,
    pub person_id: Option<String>,
    pub name_id: Option<String>,
    pub character_name: Option<String>,
}

/// Rating assigned by a rating body (`{"body": "USA Parental Rating", "code": "TV14"}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRating {
    pub body: String,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingScale {
    /// `*`/`+` notation, 0.5 to 4.0
    Stars,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRating {
    pub body: Option<String>,
    pub scale: RatingScale,
    pub value: f32,
    pub min: Option<f32>,
    pub max: Option<f32>,
    pub increment: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovieInfo {
    pub year: Option<u32>,
    /// Runtime in seconds
    pub run_time: Option<u32>,
    pub studio: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub is_home: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventDetails {
    pub venue: Option<String>,
    pub teams: Vec<Team>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_id_for_episode() {
        assert_eq!(
            series_id_for("EP012345670023").as_deref(),
            Some("SH012345670000")
        );
        assert_eq!(series_id_for("SH012345670000"), None);
        assert_eq!(series_id_for("MV000123450000"), None);
        assert_eq!(series_id_for("EP12"), None);
    }

    #[test]
    fn test_new_program_links_series() {
        let program = Program::new("EP012345670023", "Title", "abc");
        assert!(program.is_episode());
        assert_eq!(program.series_ref.as_deref(), Some("SH012345670000"));
    }

    #[test]
    fn test_description_within() {
        let mut program = Program::new("SH1", "Title", "abc");
        program.description = "A rather long description of the show".to_string();
        program.short_descriptions = vec!["Medium description".to_string(), "Short".to_string()];
        assert_eq!(program.description_within(100), Some(program.description.as_str()));
        assert_eq!(program.description_within(20), Some("Medium description"));
        assert_eq!(program.description_within(5), Some("Short"));
        assert_eq!(program.description_within(2), None);
    }
}
