//! Broadcast flags of an airing
//!
//! Two wire schemas coexist upstream: the historical one with one field per
//! property (`cc`, `stereo`, `dolby`...) and the current one with tag lists
//! (`audioProperties`, `videoProperties`, `ratings`, `multipart`). Each
//! schema is a [`FlagStrategy`]; strategies run in a fixed order over the
//! same [`BroadcastFlags`], and a strategy whose fields are all absent is
//! skipped. Nothing in here can fail.

use tracing::debug;

use crate::model::{BroadcastFlags, ContentRating};
use crate::raw::Record;
use crate::vocabulary::{
    ContentType, DolbyStatus, LiveStatus, PremiereStatus, TvRating, decode_vocabulary, normalize,
    premiere_or_finale,
};

/// One wire schema of airing broadcast properties
pub(crate) trait FlagStrategy {
    fn name(&self) -> &'static str;

    /// Whether the record carries any field of this schema
    fn detect(&self, record: &Record<'_>) -> bool;

    fn apply(&self, record: &Record<'_>, flags: &mut BroadcastFlags);
}

/// Strategies in precedence order
const STRATEGIES: &[&dyn FlagStrategy] = &[&FlatFields, &TagLists];

/// Decodes the broadcast flags of a raw airing
pub(crate) fn decode_flags(record: &Record<'_>) -> BroadcastFlags {
    let mut flags = BroadcastFlags::default();
    for strategy in STRATEGIES {
        if strategy.detect(record) {
            strategy.apply(record, &mut flags);
        } else {
            debug!(strategy = strategy.name(), "No field of this schema present");
        }
    }
    flags
}

// ============================================================================
// Flat fields
// ============================================================================

struct FlatFields;

const FLAT_KEYS: &[&str] = &[
    "cc",
    "stereo",
    "dvs",
    "subtitled",
    "sap",
    "hdtv",
    "letterbox",
    "enhanced",
    "is3d",
    "new",
    "timeApproximate",
    "cableInTheClassroom",
    "subjectToBlackout",
    "educational",
    "joinedInProgress",
    "leftInProgress",
    "hasSexRating",
    "hasViolenceRating",
    "hasLanguageRating",
    "hasFantasyViolencerating",
    "dialogRating",
    "dolby",
    "liveTapeDelay",
    "isPremiereOrFinale",
    "tvRating",
    "netSyndicationType",
    "netSyndicationSource",
    "partNumber",
    "numberOfParts",
    "programLanguage",
];

impl FlagStrategy for FlatFields {
    fn name(&self) -> &'static str {
        "flat-fields"
    }

    fn detect(&self, record: &Record<'_>) -> bool {
        FLAT_KEYS.iter().any(|key| record.has(key))
    }

    fn apply(&self, record: &Record<'_>, flags: &mut BroadcastFlags) {
        flags.closed_captioned = record.flag("cc");
        flags.stereo = record.flag("stereo");
        flags.descriptive_video = record.flag("dvs");
        flags.subtitled = record.flag("subtitled");
        if flags.subtitled {
            flags.subtitle_language = record.opt_string("subtitledLanguage");
        }
        flags.sap = record.flag("sap");
        if flags.sap {
            flags.sap_language = record.opt_string("sapLanguage");
        }
        flags.hdtv = record.flag("hdtv");
        flags.letterboxed = record.flag("letterbox");
        flags.enhanced = record.flag("enhanced");
        flags.is_3d = record.flag("is3d");
        flags.new_airing = record.flag("new");
        flags.time_approximate = record.flag("timeApproximate");
        flags.cable_in_the_classroom = record.flag("cableInTheClassroom");
        flags.subject_to_blackout = record.flag("subjectToBlackout");
        flags.educational = record.flag("educational");
        flags.joined_in_progress = record.flag("joinedInProgress");
        flags.left_in_progress = record.flag("leftInProgress");
        flags.sexual_content = record.flag("hasSexRating");
        flags.violent_content = record.flag("hasViolenceRating");
        flags.mature_language = record.flag("hasLanguageRating");
        flags.fantasy_violence = record.flag("hasFantasyViolencerating");
        flags.suggestive_dialog = record.flag("dialogRating");

        flags.dolby = decode_vocabulary(record.opt_str("dolby"));
        flags.live = decode_vocabulary(record.opt_str("liveTapeDelay"));
        let (premiere, finale) = premiere_or_finale(record.opt_str("isPremiereOrFinale"));
        flags.premiere = premiere;
        flags.finale = finale;
        flags.tv_rating = decode_vocabulary(record.opt_str("tvRating"));
        flags.content_type = decode_vocabulary(record.opt_str("netSyndicationType"));

        flags.content_source = record.opt_string("netSyndicationSource");
        flags.part_number = record.opt_u32("partNumber").filter(|n| *n > 0);
        flags.total_parts = record.opt_u32("numberOfParts").filter(|n| *n > 0);
        flags.broadcast_language = record.opt_string("programLanguage");
    }
}

// ============================================================================
// Tag lists
// ============================================================================

struct TagLists;

const TAG_KEYS: &[&str] = &[
    "audioProperties",
    "videoProperties",
    "ratings",
    "multipart",
    "premiere",
];

/// Tags whose normalized form starts with one of these select a Dolby flavour
const DOLBY_PREFIXES: &[&str] = &["DD", "DOLBY"];

/// Rating body whose codes are TV parental guidelines
const PARENTAL_RATING_BODY: &str = "USA Parental Rating";

impl FlagStrategy for TagLists {
    fn name(&self) -> &'static str {
        "tag-lists"
    }

    fn detect(&self, record: &Record<'_>) -> bool {
        TAG_KEYS.iter().any(|key| record.has(key))
    }

    fn apply(&self, record: &Record<'_>, flags: &mut BroadcastFlags) {
        for tag in record.strings("audioProperties") {
            apply_audio_tag(&tag, flags);
        }
        for tag in record.strings("videoProperties") {
            apply_video_tag(&tag, flags);
        }

        if let Some(multipart) = record.opt_object("multipart") {
            flags.part_number = flags
                .part_number
                .or(multipart.opt_u32("partNumber").filter(|n| *n > 0));
            flags.total_parts = flags
                .total_parts
                .or(multipart.opt_u32("totalParts").filter(|n| *n > 0));
        }

        for rating in record.objects("ratings") {
            let (Some(body), Some(code)) = (rating.opt_string("body"), rating.opt_string("code"))
            else {
                continue;
            };
            if body == PARENTAL_RATING_BODY && flags.tv_rating == TvRating::None {
                flags.tv_rating = TvRating::decode(&code);
            }
            let rating = ContentRating { body, code };
            if !flags.ratings.contains(&rating) {
                flags.ratings.push(rating);
            }
        }

        if record.flag("premiere") && flags.premiere == PremiereStatus::None {
            flags.premiere = PremiereStatus::Premiere;
        }
        if flags.live == LiveStatus::None {
            flags.live = decode_vocabulary(record.opt_str("liveTapeDelay"));
        }
        if flags.content_type == ContentType::None {
            flags.content_type = decode_vocabulary(record.opt_str("netSyndicationType"));
        }
    }
}

fn apply_audio_tag(tag: &str, flags: &mut BroadcastFlags) {
    let key = normalize(tag);
    match key.as_str() {
        "CC" => flags.closed_captioned = true,
        "STEREO" => flags.stereo = true,
        "SURROUND" => flags.surround = true,
        "DVS" => flags.descriptive_video = true,
        "SAP" => flags.sap = true,
        "SUBTITLED" => flags.subtitled = true,
        "DUBBED" => flags.dubbed = true,
        "ATMOS" => flags.dolby = DolbyStatus::Atmos,
        k if DOLBY_PREFIXES.iter().any(|p| k.starts_with(p)) => {
            if flags.dolby == DolbyStatus::None {
                flags.dolby = DolbyStatus::decode(tag);
            }
        }
        _ => debug!(tag, "Ignoring unknown audio property"),
    }
}

fn apply_video_tag(tag: &str, flags: &mut BroadcastFlags) {
    match normalize(tag).as_str() {
        "HDTV" => flags.hdtv = true,
        "UHDTV" => flags.uhdtv = true,
        "HDR" => flags.hdr = true,
        "3D" => flags.is_3d = true,
        "ENHANCED" => flags.enhanced = true,
        "LETTERBOX" => flags.letterboxed = true,
        "SDTV" => {}
        _ => debug!(tag, "Ignoring unknown video property"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flags_of(raw: serde_json::Value) -> BroadcastFlags {
        let record = Record::new("Airing", &raw).unwrap();
        decode_flags(&record)
    }

    #[test]
    fn test_flat_schema() {
        let flags = flags_of(json!({
            "cc": true,
            "stereo": true,
            "subtitled": true,
            "subtitledLanguage": "es",
            "sap": false,
            "sapLanguage": "fr",
            "dolby": "DD 5.1",
            "liveTapeDelay": "Live",
            "isPremiereOrFinale": "Season Finale",
            "tvRating": "TV14",
            "partNumber": 1,
            "numberOfParts": 2,
        }));
        assert!(flags.closed_captioned && flags.stereo && flags.subtitled);
        assert_eq!(flags.subtitle_language.as_deref(), Some("es"));
        assert_eq!(flags.sap_language, None);
        assert_eq!(flags.dolby, DolbyStatus::Dd51);
        assert_eq!(flags.live, LiveStatus::Live);
        assert!(flags.is_finale() && !flags.is_premiere());
        assert_eq!(flags.tv_rating, TvRating::Tv14);
        assert_eq!((flags.part_number, flags.total_parts), (Some(1), Some(2)));
    }

    #[test]
    fn test_tag_schema() {
        let flags = flags_of(json!({
            "audioProperties": ["cc", "DD 5.1", "stereo", "dvs", "theremin"],
            "videoProperties": ["hdtv", "3d", "sdtv"],
            "multipart": {"partNumber": 2, "totalParts": 3},
            "ratings": [{"body": "USA Parental Rating", "code": "TVPG"}],
            "premiere": true,
        }));
        assert!(flags.closed_captioned && flags.stereo && flags.descriptive_video);
        assert_eq!(flags.dolby, DolbyStatus::Dd51);
        assert!(flags.hdtv && flags.is_3d);
        assert_eq!((flags.part_number, flags.total_parts), (Some(2), Some(3)));
        assert_eq!(flags.tv_rating, TvRating::TvPg);
        assert_eq!(flags.ratings.len(), 1);
        assert_eq!(flags.premiere, PremiereStatus::Premiere);
    }

    #[test]
    fn test_unknown_dolby_tag_is_unknown_variant() {
        let flags = flags_of(json!({"audioProperties": ["Dolby Vision Audio"]}));
        assert!(flags.dolby.is_unknown());
    }

    #[test]
    fn test_flat_values_take_precedence() {
        let flags = flags_of(json!({
            "isPremiereOrFinale": "Series Premiere",
            "premiere": true,
            "dolby": "Dolby",
            "audioProperties": ["DD"],
        }));
        assert_eq!(flags.premiere, PremiereStatus::SeriesPremiere);
        assert_eq!(flags.dolby, DolbyStatus::Dolby);
    }

    #[test]
    fn test_no_schema_at_all() {
        assert_eq!(flags_of(json!({})), BroadcastFlags::default());
    }
}
