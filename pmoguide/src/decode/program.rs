use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use super::stars::parse_stars;
use crate::error::DecodeError;
use crate::model::{
    ContentRating, Credit, EventDetails, MovieInfo, Program, QualityRating, RatingScale, Team,
};
use crate::raw::Record;
use crate::vocabulary::{Role, decode_vocabulary};

const ENTITY: &str = "Program";

/// Rating body whose quality ratings use star notation
const STAR_RATINGS_BODY: &str = "TMS";

const SHORT_TITLE_KEYS: [&str; 4] = ["title70", "title40", "title20", "title10"];
const SHORT_DESCRIPTION_KEYS: [&str; 4] = [
    "description255",
    "description100",
    "description60",
    "description40",
];

lazy_static! {
    static ref MOVIE_SHOW_TYPE: Regex =
        Regex::new(r"^(Feature Film|.*Movie)$").expect("static regex");
}

pub(crate) fn decode_program(raw: &Value, image_base: &str) -> Result<Program, DecodeError> {
    let record = Record::new(ENTITY, raw)?;

    let id = record.req_id("programID")?;
    let md5 = record.req_str("md5")?.to_string();
    let (title, short_titles) = decode_titles(&record)?;

    let mut program = Program::new(id, title, md5);
    program.short_titles = short_titles;
    program.episode_title = record.opt_string("episodeTitle150");
    program.alternate_title = record.opt_string("alternateTitle");
    program.series_description = record.opt_string("seriesDescription");
    program.syndicated_episode_number = record.opt_string("syndicatedEpisodeNumber");
    program.alternate_episode_number = record.opt_string("alternateSyndicatedEpisodeNumber");
    program.holiday = record.opt_string("holiday");
    program.made_for_tv = record.flag("madeForTv");

    if let Some(descriptions) = record.opt_object("descriptions") {
        apply_descriptions(&descriptions, &mut program);
        program.description_language = record.opt_string("descriptionLanguage");
    }

    program.credits = record
        .objects("cast")
        .iter()
        .chain(record.objects("crew").iter())
        .filter_map(|credit| skip_malformed(&program.id, decode_credit(credit)))
        .collect();

    program.advisories = record.strings("contentAdvisory");
    program.content_ratings = record
        .objects("contentRating")
        .iter()
        .map(|r| -> Result<ContentRating, DecodeError> {
            Ok(ContentRating {
                body: r.req_str("body")?.to_string(),
                code: r.req_str("code")?.to_string(),
            })
        })
        .filter_map(|rating| skip_malformed(&program.id, rating))
        .collect();

    if let Some(movie) = record.opt_object("movie") {
        program.movie = Some(MovieInfo {
            year: movie.opt_u32("year"),
            run_time: movie.opt_u32("runTime"),
            studio: movie.opt_string("origStudio"),
            country: movie.opt_string("origCountry"),
        });
        program.quality_ratings = movie
            .objects("qualityRating")
            .iter()
            .filter_map(|r| decode_quality_rating(r, &program.id))
            .collect();
    }

    program.genres = decode_genres(&record);
    program.color_code = decode_vocabulary(record.opt_str("colorCode"));
    program.source_type = decode_vocabulary(record.opt_str("sourceType"));
    program.original_air_date = record
        .opt_str("originalAirDate")
        .filter(|d| !d.starts_with('0'))
        .and_then(|_| record.opt_date("originalAirDate"));
    program.game_start = record.opt_timestamp("gameDatetime");

    if let Some(event) = record.opt_object("eventDetails") {
        let teams = event
            .objects("teams")
            .iter()
            .map(|t| -> Result<Team, DecodeError> {
                Ok(Team {
                    name: t.req_str("name")?.to_string(),
                    is_home: t.flag("isHome"),
                })
            })
            .filter_map(|team| skip_malformed(&program.id, team))
            .collect();
        program.event = Some(EventDetails {
            venue: event.opt_string("venue"),
            teams,
        });
    }

    program.images = record
        .objects("images")
        .iter()
        .map(|image| image.req_str("uri").map(|uri| resolve_image_uri(image_base, uri)))
        .filter_map(|image| skip_malformed(&program.id, image))
        .collect();

    program.metadata = record
        .opt_array("metadata")
        .iter()
        .filter(|block| block.is_object())
        .cloned()
        .collect();

    Ok(program)
}

/// Primary title and shorter variants
///
/// `titles` is either an object (`{"title120": ..., "title70": ...}`) or a
/// list of such objects, in which case the first one is used.
fn decode_titles(record: &Record<'_>) -> Result<(String, Vec<String>), DecodeError> {
    let titles = match record.get("titles") {
        Some(Value::Array(_)) => record
            .objects("titles")
            .into_iter()
            .next()
            .ok_or_else(|| DecodeError::missing(ENTITY, "titles.title120"))?,
        _ => record.req_object("titles")?,
    };
    let title = titles.req_str("title120")?.to_string();
    let short_titles = SHORT_TITLE_KEYS
        .iter()
        .filter_map(|key| titles.opt_string(key))
        .collect();
    Ok((title, short_titles))
}

/// Picks the "en" text of a per-language description list, else the first one
fn pick_description(descriptions: &Record<'_>, key: &str) -> Option<String> {
    let variants = descriptions.objects(key);
    variants
        .iter()
        .find(|v| v.opt_str("descriptionLanguage") == Some("en"))
        .or_else(|| variants.first())
        .and_then(|v| v.opt_string("description"))
}

fn apply_descriptions(descriptions: &Record<'_>, program: &mut Program) {
    let mut short: Vec<String> = SHORT_DESCRIPTION_KEYS
        .iter()
        .filter_map(|key| pick_description(descriptions, key))
        .collect();
    short.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

    program.description = pick_description(descriptions, "description1000")
        .or_else(|| short.first().cloned())
        .unwrap_or_default();
    program.short_descriptions = short;
    program.alternate_description = pick_description(descriptions, "alternateDescription255");
    program.alternate_description_short = pick_description(descriptions, "alternateDescription100");
}

fn decode_credit(record: &Record<'_>) -> Result<Credit, DecodeError> {
    let role_text = record.req_str("role")?.to_string();
    Ok(Credit {
        role: Role::from_credit(&role_text),
        name: record.req_str("name")?.to_string(),
        role_text,
        billing_order: record.opt_u32("billingOrder").unwrap_or(0),
        person_id: record.opt_string("personId"),
        name_id: record.opt_string("nameId"),
        character_name: record.opt_string("characterName"),
    })
}

/// Optional list items that do not decode are dropped, never the program
fn skip_malformed<T>(program_id: &str, item: Result<T, DecodeError>) -> Option<T> {
    match item {
        Ok(item) => Some(item),
        Err(err) => {
            warn!(program = program_id, "Skipping item: {}", err);
            None
        }
    }
}

/// Decodes one movie quality rating; malformed ones are dropped with a warning
fn decode_quality_rating(record: &Record<'_>, program_id: &str) -> Option<QualityRating> {
    let body = record.opt_string("ratingsBody");
    let raw = record.opt_string("rating")?;

    if body.as_deref() == Some(STAR_RATINGS_BODY) {
        return match parse_stars(&raw) {
            Ok(value) => Some(QualityRating {
                body,
                scale: RatingScale::Stars,
                value,
                min: Some(0.5),
                max: Some(super::stars::MAX_STARS),
                increment: Some(0.5),
            }),
            Err(err) => {
                warn!(program = program_id, rating = %raw, "Dropping star rating: {}", err);
                None
            }
        };
    }

    match raw.trim().parse::<f32>() {
        Ok(value) => Some(QualityRating {
            body,
            scale: RatingScale::Numeric,
            value,
            min: record.opt_f32("minRating"),
            max: record.opt_f32("maxRating"),
            increment: record.opt_f32("increment"),
        }),
        Err(_) => {
            warn!(program = program_id, rating = %raw, "Dropping non-numeric quality rating");
            None
        }
    }
}

/// Show type (unless "Series") followed by genres, first occurrence wins
fn decode_genres(record: &Record<'_>) -> Vec<String> {
    let show_type = record
        .opt_string("showType")
        .filter(|t| t != "Series")
        .map(|t| {
            if MOVIE_SHOW_TYPE.is_match(&t) {
                "Movie".to_string()
            } else {
                t
            }
        });

    let mut seen = HashSet::new();
    show_type
        .into_iter()
        .chain(record.strings("genres"))
        .filter(|genre| seen.insert(genre.clone()))
        .collect()
}

/// Makes an artwork uri absolute
fn resolve_image_uri(image_base: &str, uri: &str) -> String {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        uri.to_string()
    } else {
        format!(
            "{}/{}",
            image_base.trim_end_matches('/'),
            uri.trim_start_matches('/')
        )
    }
}
