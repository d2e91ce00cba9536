use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::utils::format_timestamp_millis;

/// Highest rating a review may carry.
pub const MAX_RATING: i64 = 5;

/// A restaurant review.
///
/// `id` is assigned by the server. A review without one was created locally
/// and has not been pushed yet; there is no other sync-state marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(
        default,
        deserialize_with = "deserialize_opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(deserialize_with = "deserialize_int")]
    pub restaurant_id: i64,
    pub name: String,
    #[serde(deserialize_with = "deserialize_rating")]
    pub rating: u8,
    #[serde(default)]
    pub comments: String,
    #[serde(
        rename = "createdAt",
        default,
        deserialize_with = "deserialize_opt_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<i64>,
    #[serde(
        rename = "updatedAt",
        default,
        deserialize_with = "deserialize_opt_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<i64>,
}

impl Review {
    pub fn is_synced(&self) -> bool {
        self.id.is_some()
    }

    /// Creation time formatted for display, e.g. "Wednesday, Aug 30, 2017, 12:19 PM".
    pub fn formatted_date(&self) -> Option<String> {
        self.created_at.and_then(format_timestamp_millis)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Review name is required")]
    MissingName,

    #[error("Review comments are required")]
    MissingComments,

    #[error("Rating must be between 0 and 5, got {0}")]
    RatingOutOfRange(i64),

    #[error("Rating is not a number: {0:?}")]
    InvalidRating(String),
}

/// Review data as entered by a user, before it is attached to a restaurant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub name: String,
    pub rating: i64,
    pub comments: String,
}

impl ReviewDraft {
    pub fn new(name: impl Into<String>, rating: i64, comments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rating,
            comments: comments.into(),
        }
    }

    /// Build a draft from raw form input, where the rating arrives as text.
    pub fn parse(name: &str, rating: &str, comments: &str) -> Result<Self, ValidationError> {
        let rating = rating
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidRating(rating.to_string()))?;
        let draft = Self::new(name, rating, comments);
        draft.validate()?;
        Ok(draft)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.comments.trim().is_empty() {
            return Err(ValidationError::MissingComments);
        }
        if !(0..=MAX_RATING).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange(self.rating));
        }
        Ok(())
    }

    /// Validate and turn the draft into an unsynced review for `restaurant_id`.
    pub fn into_review(self, restaurant_id: i64) -> Result<Review, ValidationError> {
        self.validate()?;
        Ok(Review {
            id: None,
            restaurant_id,
            name: self.name.trim().to_string(),
            // validate() bounds the rating to 0..=5
            rating: self.rating as u8,
            comments: self.comments.trim().to_string(),
            created_at: None,
            updated_at: None,
        })
    }
}

// The server is loose about numeric fields: ids and ratings show up as
// numbers or numeric strings depending on how the row was created.

enum Loose {
    Int(i64),
    Text(String),
    Missing,
}

impl<'de> Deserialize<'de> for Loose {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de;

        struct LooseVisitor;

        impl<'de> de::Visitor<'de> for LooseVisitor {
            type Value = Loose;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an integer or numeric string")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
                Ok(Loose::Int(v))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                i64::try_from(v)
                    .map(Loose::Int)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                if v.fract() == 0.0 {
                    Ok(Loose::Int(v as i64))
                } else {
                    Err(E::invalid_value(de::Unexpected::Float(v), &self))
                }
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E> {
                if v.trim().is_empty() {
                    Ok(Loose::Missing)
                } else {
                    Ok(Loose::Text(v.trim().to_string()))
                }
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Loose::Missing)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Loose::Missing)
            }
        }

        deserializer.deserialize_any(LooseVisitor)
    }
}

fn loose_to_int<E: serde::de::Error>(value: Loose) -> Result<Option<i64>, E> {
    match value {
        Loose::Int(v) => Ok(Some(v)),
        Loose::Text(s) => s
            .parse::<i64>()
            .map(Some)
            .map_err(|_| E::custom(format!("expected a numeric string, got {:?}", s))),
        Loose::Missing => Ok(None),
    }
}

pub(crate) fn deserialize_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    loose_to_int::<D::Error>(Loose::deserialize(deserializer)?)?
        .ok_or_else(|| D::Error::custom("missing integer value"))
}

fn deserialize_opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    loose_to_int::<D::Error>(Loose::deserialize(deserializer)?)
}

fn deserialize_rating<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = deserialize_int(deserializer)?;
    u8::try_from(value).map_err(|_| D::Error::custom(format!("rating out of range: {}", value)))
}

// Timestamps are epoch millis from the server, or RFC 3339 text from older rows
fn deserialize_opt_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Loose::deserialize(deserializer)? {
        Loose::Int(v) => Ok(Some(v)),
        Loose::Text(s) => Ok(chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.timestamp_millis())
            .ok()
            .or_else(|| s.parse::<i64>().ok())),
        Loose::Missing => Ok(None),
    }
}
