//! Star-rating notation used by movie quality ratings (`"***+"`)

use thiserror::Error;

/// Highest rating the notation can express
pub const MAX_STARS: f32 = 4.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StarRatingError {
    #[error("invalid character '{0}' in star rating")]
    InvalidCharacter(char),

    #[error("'+' must be the last character of a star rating")]
    HalfNotLast,

    #[error("star rating exceeds {}", MAX_STARS)]
    TooHigh,

    #[error("empty star rating")]
    Empty,
}

/// Parses a star rating: each `*` is worth 1.0 and one trailing `+` adds 0.5
pub fn parse_stars(raw: &str) -> Result<f32, StarRatingError> {
    if raw.is_empty() {
        return Err(StarRatingError::Empty);
    }

    let mut value = 0.0_f32;
    let mut half_seen = false;
    for c in raw.chars() {
        if half_seen {
            return Err(StarRatingError::HalfNotLast);
        }
        match c {
            '*' => value += 1.0,
            '+' => {
                value += 0.5;
                half_seen = true;
            }
            other => return Err(StarRatingError::InvalidCharacter(other)),
        }
        if value > MAX_STARS {
            return Err(StarRatingError::TooHigh);
        }
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ratings() {
        assert_eq!(parse_stars("***"), Ok(3.0));
        assert_eq!(parse_stars("+"), Ok(0.5));
        assert_eq!(parse_stars("***+"), Ok(3.5));
        assert_eq!(parse_stars("****"), Ok(4.0));
    }

    #[test]
    fn test_invalid_ratings() {
        assert_eq!(parse_stars("%"), Err(StarRatingError::InvalidCharacter('%')));
        assert_eq!(parse_stars("**+*"), Err(StarRatingError::HalfNotLast));
        assert_eq!(parse_stars("****+"), Err(StarRatingError::TooHigh));
        assert_eq!(parse_stars("++"), Err(StarRatingError::HalfNotLast));
        assert_eq!(parse_stars(""), Err(StarRatingError::Empty));
    }
}
