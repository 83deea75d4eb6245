//! Closed vocabularies decoded with an `Unknown` fallback
//!
//! Upstream keeps adding values to its small enumerations. Every such field
//! goes through [`decode_vocabulary`]: the raw text is normalized, looked up
//! in the closed set, and on a miss becomes `Unknown(raw)`, which is a valid
//! value and never a decode failure. The first occurrence of each unknown
//! value is logged once per process.

use std::collections::HashSet;
use std::sync::Mutex;

use lazy_static::lazy_static;
use tracing::warn;

lazy_static! {
    static ref WARNED: Mutex<HashSet<(&'static str, String)>> = Mutex::new(HashSet::new());
}

/// A closed set of upstream values with a sentinel for unrecognized text
pub trait Vocabulary: Sized {
    /// Name used in diagnostics
    const NAME: &'static str;

    /// Value used when the field is absent or empty
    fn absent() -> Self;

    /// Looks up a normalized key (see [`normalize`])
    fn lookup(key: &str) -> Option<Self>;

    /// Wraps unrecognized raw text
    fn unknown(raw: &str) -> Self;
}

/// Normalizes raw vocabulary text
///
/// Upper-cases, drops `.`, `'` and `&`, and folds runs of whitespace, `-` and
/// `_` into a single `_`. `"Season Premiere"`, `"season-premiere"` and
/// `"SEASON_PREMIERE"` all become `SEASON_PREMIERE`; `"DD 5.1"` becomes `DD_51`.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.chars() {
        match c {
            '.' | '\'' | '&' => {}
            c if c.is_whitespace() || c == '-' || c == '_' => pending_sep = true,
            c => {
                if pending_sep && !out.is_empty() {
                    out.push('_');
                }
                pending_sep = false;
                out.extend(c.to_uppercase());
            }
        }
    }
    out
}

/// Decodes an optional raw value against a vocabulary
pub fn decode_vocabulary<T: Vocabulary>(raw: Option<&str>) -> T {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return T::absent();
    };
    let key = normalize(raw);
    if key.is_empty() {
        return T::absent();
    }
    match T::lookup(&key) {
        Some(value) => value,
        None => {
            warn_unknown(T::NAME, raw);
            T::unknown(raw)
        }
    }
}

fn warn_unknown(vocabulary: &'static str, raw: &str) {
    let first_time = match WARNED.lock() {
        Ok(mut seen) => seen.insert((vocabulary, raw.to_string())),
        Err(_) => true,
    };
    if first_time {
        warn!(vocabulary, value = raw, "Unknown {} encountered", vocabulary);
    }
}

/// Declares a vocabulary enum
///
/// Each variant lists its canonical normalized spelling followed by aliases.
/// The generated enum gets an extra `Unknown(String)` variant, `as_str`,
/// `decode`, `Display`, `Default` and string based serde impls.
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            absent = $absent:expr;
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $canon:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
            /// Unrecognized upstream text, kept verbatim
            Unknown(String),
        }

        impl $name {
            /// Canonical spelling, or the raw text for `Unknown`
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $canon, )+
                    Self::Unknown(raw) => raw.as_str(),
                }
            }

            pub fn decode(raw: &str) -> Self {
                $crate::vocabulary::decode_vocabulary(Some(raw))
            }

            pub fn is_unknown(&self) -> bool {
                matches!(self, Self::Unknown(_))
            }
        }

        impl $crate::vocabulary::Vocabulary for $name {
            const NAME: &'static str = stringify!($name);

            fn absent() -> Self {
                $absent
            }

            fn lookup(key: &str) -> Option<Self> {
                match key {
                    $( $canon $(| $alias)* => Some(Self::$variant), )+
                    _ => None,
                }
            }

            fn unknown(raw: &str) -> Self {
                Self::Unknown(raw.to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                <Self as $crate::vocabulary::Vocabulary>::absent()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($crate::vocabulary::decode_vocabulary(Some(&raw)))
            }
        }
    };
}

vocabulary! {
    /// Dolby audio flavour of an airing
    pub enum DolbyStatus {
        absent = DolbyStatus::None;
        None => "NONE",
        Dd51 => "DD51" | "DD_51" | "DOLBY_DIGITAL_51",
        Dd => "DD" | "DOLBY_DIGITAL",
        Dss => "DSS",
        Dolby => "DOLBY",
        Atmos => "ATMOS" | "DOLBY_ATMOS",
    }
}

vocabulary! {
    pub enum LiveStatus {
        absent = LiveStatus::None;
        None => "NONE",
        Live => "LIVE",
        Delay => "DELAY",
        Tape => "TAPE",
    }
}

vocabulary! {
    pub enum PremiereStatus {
        absent = PremiereStatus::None;
        None => "NONE",
        Premiere => "PREMIERE",
        SeasonPremiere => "SEASON_PREMIERE",
        SeriesPremiere => "SERIES_PREMIERE",
    }
}

vocabulary! {
    pub enum FinaleStatus {
        absent = FinaleStatus::None;
        None => "NONE",
        SeasonFinale => "SEASON_FINALE",
        SeriesFinale => "SERIES_FINALE",
    }
}

vocabulary! {
    /// US parental guideline rating
    pub enum TvRating {
        absent = TvRating::None;
        None => "NONE",
        TvMa => "TVMA" | "TV_MA",
        TvG => "TVG" | "TV_G",
        TvPg => "TVPG" | "TV_PG",
        Tv14 => "TV14" | "TV_14",
        TvY => "TVY" | "TV_Y",
        TvY7 => "TVY7" | "TV_Y7" | "TVY7FV" | "TV_Y7_FV",
    }
}

vocabulary! {
    /// Distribution channel of an airing (`netSyndicationType`)
    pub enum ContentType {
        absent = ContentType::None;
        None => "NONE",
        OffNetwork => "OFF_NETWORK",
        BroadcastNetwork => "BROADCAST_NETWORK" | "NETWORK",
        FirstRunSyndication => "FIRST_RUN_SYNDICATION" | "SYNDICATION",
    }
}

vocabulary! {
    pub enum ColorCode {
        absent = ColorCode::None;
        None => "NONE",
        Color => "COLOR",
        Bw => "BW" | "B_W" | "BLACK_AND_WHITE",
        ColorAndBw => "COLOR_AND_BW" | "COLOR_AND_B_W",
        Colorized => "COLORIZED",
    }
}

vocabulary! {
    pub enum SourceType {
        absent = SourceType::None;
        None => "NONE",
        Local => "LOCAL",
        Syndicated => "SYNDICATED",
        Network => "NETWORK",
        Block => "BLOCK",
    }
}

vocabulary! {
    /// Size class of an artwork asset
    pub enum ArtworkSize {
        absent = ArtworkSize::Unknown(String::new());
        Massive => "MS" | "MASSIVE",
        Large => "LG" | "LARGE",
        Medium => "MD" | "MEDIUM",
        Small => "SM" | "SMALL",
        ExtraSmall => "XS" | "EXTRA_SMALL",
    }
}

vocabulary! {
    /// Canonical credit role (see [`Role::from_credit`])
    pub enum Role {
        absent = Role::Unknown(String::new());
        Actor => "ACTOR",
        Anchor => "ANCHOR",
        Contestant => "CONTESTANT",
        Correspondent => "CORRESPONDENT",
        Director => "DIRECTOR",
        AssistantDirector => "ASSISTANT_DIRECTOR",
        ExecutiveProducer => "EXECUTIVE_PRODUCER",
        GuestStar => "GUEST_STAR",
        Guest => "GUEST",
        Host => "HOST",
        Judge => "JUDGE",
        MusicalGuest => "MUSICAL_GUEST",
        Narrator => "NARRATOR",
        Producer => "PRODUCER",
        Writer => "WRITER",
        CostumeDesigner => "COSTUME_DESIGNER",
        SetDecoration => "SET_DECORATION",
        ArtDirection => "ART_DIRECTION",
        ProductionDesigner => "PRODUCTION_DESIGNER",
        Casting => "CASTING",
        FilmEditor => "FILM_EDITOR",
        Cinematographer => "CINEMATOGRAPHER",
        OriginalMusic => "ORIGINAL_MUSIC",
        AssociateProducer => "ASSOCIATE_PRODUCER",
        CastingDirector => "CASTING_DIRECTOR",
        Composer => "COMPOSER",
        Voice => "VOICE",
        ProductionManager => "PRODUCTION_MANAGER",
        DirectorOfPhotography => "DIRECTOR_OF_PHOTOGRAPHY" | "DIRECTORY_OF_PHOTOGRAPHY",
        VisualEffects => "VISUAL_EFFECTS",
    }
}

/// Collapses long-form credit roles with ordered substring rules
fn collapse_role(raw: &str) -> Option<&'static str> {
    if raw.starts_with("Writer") || raw.contains("Screenwriter") {
        Some("Writer")
    } else if raw.contains("Assistant Director") {
        Some("Assistant Director")
    } else if raw.contains("Producer") {
        Some("Producer")
    } else if raw.contains("Art Director") {
        Some("Art Direction")
    } else if raw.contains("Production Design") {
        Some("Production Designer")
    } else if raw.contains("Visual Effects") {
        Some("Visual Effects")
    } else {
        None
    }
}

impl Role {
    /// Decodes a provider credit role
    ///
    /// The first matching substring rule picks the canonical keyword, so
    /// "Executive Producer" is a `Producer`. Other strings go through the
    /// vocabulary lookup and become `Unknown` with the original text when
    /// nothing matches.
    pub fn from_credit(raw: &str) -> Role {
        let raw = raw.trim();
        decode_vocabulary(Some(collapse_role(raw).unwrap_or(raw)))
    }
}

/// Splits an `isPremiereOrFinale` value into its premiere or finale half
///
/// Values mentioning "premiere" select the premiere vocabulary, everything
/// else the finale vocabulary.
pub fn premiere_or_finale(raw: Option<&str>) -> (PremiereStatus, FinaleStatus) {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => (PremiereStatus::None, FinaleStatus::None),
        Some(raw) if normalize(raw).contains("PREMIERE") => {
            (decode_vocabulary(Some(raw)), FinaleStatus::None)
        }
        Some(raw) => (PremiereStatus::None, decode_vocabulary(Some(raw))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Season Premiere"), "SEASON_PREMIERE");
        assert_eq!(normalize("season-premiere"), "SEASON_PREMIERE");
        assert_eq!(normalize("  DD 5.1 "), "DD_51");
        assert_eq!(normalize("Color and B & W"), "COLOR_AND_B_W");
        assert_eq!(normalize("TV-14"), "TV_14");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_known_values() {
        assert_eq!(DolbyStatus::decode("DD 5.1"), DolbyStatus::Dd51);
        assert_eq!(DolbyStatus::decode("dolby"), DolbyStatus::Dolby);
        assert_eq!(LiveStatus::decode("Live"), LiveStatus::Live);
        assert_eq!(ColorCode::decode("Color and B & W"), ColorCode::ColorAndBw);
        assert_eq!(SourceType::decode("network"), SourceType::Network);
        assert_eq!(TvRating::decode("TVPG"), TvRating::TvPg);
        assert_eq!(ArtworkSize::decode("Lg"), ArtworkSize::Large);
    }

    #[test]
    fn test_unknown_values_keep_raw_text() {
        let status = LiveStatus::decode("Simulcast");
        assert_eq!(status, LiveStatus::Unknown("Simulcast".to_string()));
        assert!(status.is_unknown());
        assert_eq!(status.to_string(), "Simulcast");
    }

    #[test]
    fn test_absent_values() {
        assert_eq!(decode_vocabulary::<DolbyStatus>(None), DolbyStatus::None);
        assert_eq!(decode_vocabulary::<SourceType>(Some("   ")), SourceType::None);
        assert_eq!(ColorCode::default(), ColorCode::None);
    }

    #[test]
    fn test_role_rules() {
        assert_eq!(Role::from_credit("Actor"), Role::Actor);
        assert_eq!(Role::from_credit("Executive Producer"), Role::Producer);
        assert_eq!(Role::from_credit("Associate Producer"), Role::Producer);
        assert_eq!(Role::from_credit("Assistant Director"), Role::AssistantDirector);
        assert_eq!(Role::from_credit("Co-Producer"), Role::Producer);
        assert_eq!(Role::from_credit("Writer (Story)"), Role::Writer);
        assert_eq!(Role::from_credit("Screenwriter"), Role::Writer);
        assert_eq!(
            Role::from_credit("Second Unit Assistant Director"),
            Role::AssistantDirector
        );
        assert_eq!(Role::from_credit("Supervising Art Director"), Role::ArtDirection);
        assert_eq!(Role::from_credit("Visual Effects Supervisor"), Role::VisualEffects);
        assert_eq!(
            Role::from_credit("Key Grip"),
            Role::Unknown("Key Grip".to_string())
        );
    }

    #[test]
    fn test_premiere_or_finale() {
        assert_eq!(
            premiere_or_finale(Some("Season Premiere")),
            (PremiereStatus::SeasonPremiere, FinaleStatus::None)
        );
        assert_eq!(
            premiere_or_finale(Some("Series Finale")),
            (PremiereStatus::None, FinaleStatus::SeriesFinale)
        );
        assert_eq!(
            premiere_or_finale(None),
            (PremiereStatus::None, FinaleStatus::None)
        );
        let (premiere, _) = premiere_or_finale(Some("Mid-season Premiere"));
        assert!(premiere.is_unknown());
    }

    #[test]
    fn test_serde_uses_canonical_text() {
        let json = serde_json::to_string(&DolbyStatus::Dd51).unwrap();
        assert_eq!(json, "\"DD51\"");
        let back: DolbyStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DolbyStatus::Dd51);
        let unknown: LiveStatus = serde_json::from_str("\"Encore\"").unwrap();
        assert_eq!(unknown, LiveStatus::Unknown("Encore".to_string()));
    }
}
