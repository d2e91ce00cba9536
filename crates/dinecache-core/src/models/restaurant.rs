use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::review::{deserialize_int, Review};

/// Map coordinates for a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Which image variant to link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    /// Full-size photo for the detail page
    Large,
    /// Thumbnail for list views
    Small,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Restaurant {
    #[serde(deserialize_with = "deserialize_int")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub neighborhood: String,
    #[serde(default)]
    pub photograph: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub latlng: LatLng,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_hours: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub is_favorite: FavoriteFlag,
    // Absent until reviews are fetched; once present the list is treated as final
    // unless `reviews_partial` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
    /// Local marker: `reviews` holds only reviews added on this device and the
    /// server's list has not been fetched yet. Never sent by the server.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reviews_partial: bool,
}

impl Restaurant {
    pub fn page_url(&self) -> String {
        format!("./restaurant.html?id={}", self.id)
    }

    pub fn image_url(&self, size: ImageSize) -> String {
        match size {
            ImageSize::Large => format!("/img/{}.jpg", self.id),
            ImageSize::Small => format!("/img/smallimg/{}.jpg", self.id),
        }
    }

    /// Whether the server's review list has been fetched and embedded.
    pub fn has_reviews(&self) -> bool {
        self.reviews.is_some() && !self.reviews_partial
    }

    /// Replace the embedded list with the server's, keeping local reviews the
    /// server has not seen yet (no id, or an id missing from `server`).
    pub fn embed_server_reviews(&mut self, server: Vec<Review>) {
        let local = self.reviews.take().unwrap_or_default();
        let mut merged = server;
        for review in local {
            let known = review
                .id
                .is_some_and(|id| merged.iter().any(|r| r.id == Some(id)));
            if !known {
                merged.push(review);
            }
        }
        self.reviews = Some(merged);
        self.reviews_partial = false;
    }

    /// Append a review. If the server's list was never fetched, the list is
    /// marked partial so a later read still fetches it.
    pub fn push_review(&mut self, review: Review) {
        if self.reviews.is_none() {
            self.reviews_partial = true;
        }
        let reviews = self.reviews.get_or_insert_with(Vec::new);
        let known = review
            .id
            .is_some_and(|id| reviews.iter().any(|r| r.id == Some(id)));
        if !known {
            reviews.push(review);
        }
    }

    /// Reviews created locally that the server has not assigned an id to.
    pub fn unsynced_reviews(&self) -> impl Iterator<Item = &Review> {
        self.reviews
            .iter()
            .flatten()
            .filter(|review| !review.is_synced())
    }

    pub fn pending_review_count(&self) -> usize {
        self.unsynced_reviews().count()
    }

    /// Average rating across embedded reviews, if any exist.
    pub fn average_rating(&self) -> Option<f64> {
        let reviews = self.reviews.as_ref()?;
        if reviews.is_empty() {
            return None;
        }
        let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
        Some(f64::from(total) / reviews.len() as f64)
    }
}

/// Favorite marker.
///
/// The server and the stored rows carry this as the string `"true"` or `"false"`,
/// though some responses use a JSON boolean. Both are accepted; the string form
/// is always written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FavoriteFlag(bool);

impl FavoriteFlag {
    pub const fn new(value: bool) -> Self {
        Self(value)
    }

    pub fn is_set(self) -> bool {
        self.0
    }

    pub fn toggled(self) -> Self {
        Self(!self.0)
    }

    pub fn as_str(self) -> &'static str {
        if self.0 {
            "true"
        } else {
            "false"
        }
    }
}

impl From<bool> for FavoriteFlag {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

impl fmt::Display for FavoriteFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FavoriteFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FavoriteFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de;

        struct FlagVisitor;

        impl<'de> de::Visitor<'de> for FlagVisitor {
            type Value = FavoriteFlag;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean or string 'true'/'false'")
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E> {
                Ok(FavoriteFlag(v))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                match v.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(FavoriteFlag(true)),
                    "false" | "" => Ok(FavoriteFlag(false)),
                    other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
                }
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(FavoriteFlag(false))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(FavoriteFlag(false))
            }
        }

        deserializer.deserialize_any(FlagVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "id": 3,
            "name": "Kang Ho Dong Baekjeong",
            "neighborhood": "Manhattan",
            "photograph": "3.jpg",
            "address": "1 E 32nd St, New York, NY 10016",
            "latlng": { "lat": 40.747143, "lng": -73.985414 },
            "cuisine_type": "Asian",
            "operating_hours": { "Monday": "11:30 am - 2:00 am" },
            "is_favorite": "false",
            "createdAt": 1504095567183i64
        })
    }

    #[test]
    fn test_parse_restaurant_without_reviews() {
        let r: Restaurant = serde_json::from_value(sample()).unwrap();
        assert_eq!(r.id, 3);
        assert_eq!(r.cuisine_type, "Asian");
        assert!(!r.is_favorite.is_set());
        assert!(!r.has_reviews());
        assert_eq!(r.pending_review_count(), 0);
    }

    #[test]
    fn test_favorite_accepts_bool_and_string() {
        let mut value = sample();
        value["is_favorite"] = json!(true);
        let r: Restaurant = serde_json::from_value(value.clone()).unwrap();
        assert!(r.is_favorite.is_set());

        value["is_favorite"] = json!("TRUE");
        let r: Restaurant = serde_json::from_value(value.clone()).unwrap();
        assert!(r.is_favorite.is_set());

        value["is_favorite"] = json!("maybe");
        assert!(serde_json::from_value::<Restaurant>(value).is_err());
    }

    #[test]
    fn test_favorite_serializes_as_string() {
        let r: Restaurant = serde_json::from_value(sample()).unwrap();
        let out = serde_json::to_value(&r).unwrap();
        assert_eq!(out["is_favorite"], json!("false"));
        assert!(out.get("reviews").is_none());
    }

    #[test]
    fn test_urls() {
        let r: Restaurant = serde_json::from_value(sample()).unwrap();
        assert_eq!(r.page_url(), "./restaurant.html?id=3");
        assert_eq!(r.image_url(ImageSize::Large), "/img/3.jpg");
        assert_eq!(r.image_url(ImageSize::Small), "/img/smallimg/3.jpg");
    }

    #[test]
    fn test_unsynced_reviews_and_average() {
        let mut value = sample();
        value["reviews"] = json!([
            { "id": 1, "restaurant_id": 3, "name": "A", "rating": 4, "comments": "ok" },
            { "restaurant_id": 3, "name": "B", "rating": "2", "comments": "meh" }
        ]);
        let r: Restaurant = serde_json::from_value(value).unwrap();
        assert_eq!(r.pending_review_count(), 1);
        assert_eq!(r.unsynced_reviews().next().map(|r| r.name.as_str()), Some("B"));
        assert_eq!(r.average_rating(), Some(3.0));
    }

    fn review(id: Option<i64>, name: &str) -> Review {
        Review {
            id,
            restaurant_id: 3,
            name: name.to_string(),
            rating: 4,
            comments: "ok".to_string(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_push_review_without_fetched_list_is_partial() {
        let mut r: Restaurant = serde_json::from_value(sample()).unwrap();
        r.push_review(review(None, "Local"));

        assert!(r.reviews_partial);
        assert!(!r.has_reviews());
        assert_eq!(serde_json::to_value(&r).unwrap()["reviews_partial"], json!(true));

        r.embed_server_reviews(vec![review(Some(1), "Ann"), review(Some(2), "Bo")]);
        let names: Vec<&str> = r.reviews.iter().flatten().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bo", "Local"]);
        assert!(r.has_reviews());
        assert!(serde_json::to_value(&r).unwrap().get("reviews_partial").is_none());
    }

    #[test]
    fn test_embed_server_reviews_drops_duplicates() {
        let mut r: Restaurant = serde_json::from_value(sample()).unwrap();
        r.push_review(review(Some(9), "Synced"));
        r.push_review(review(Some(9), "Synced"));
        assert_eq!(r.reviews.as_ref().map(Vec::len), Some(1));

        r.embed_server_reviews(vec![review(Some(1), "Ann"), review(Some(9), "Synced")]);
        let ids: Vec<Option<i64>> = r.reviews.iter().flatten().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(1), Some(9)]);
    }

    #[test]
    fn test_push_review_onto_fetched_list_stays_final() {
        let mut value = sample();
        value["reviews"] = json!([]);
        let mut r: Restaurant = serde_json::from_value(value).unwrap();
        r.push_review(review(None, "Local"));
        assert!(!r.reviews_partial);
        assert!(r.has_reviews());
    }
}
