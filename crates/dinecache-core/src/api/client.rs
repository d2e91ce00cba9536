//! API client for the restaurant directory server.
//!
//! Endpoints:
//! - `GET /restaurants`, `GET /restaurants/{id}`
//! - `PUT /restaurants/{id}?is_favorite={bool}`
//! - `GET /reviews?restaurant_id={id}`, `POST /reviews`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::{ApiError, RemoteGateway};
use crate::models::{FavoriteFlag, Restaurant, Review};

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the directory server
const API_BASE_URL: &str = "http://localhost:1337";

/// HTTP request timeout in seconds.
/// A hung server surfaces as a transport error instead of blocking its caller forever.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Request body for `POST /reviews`. The server assigns the id.
#[derive(Debug, Serialize)]
struct NewReviewBody<'a> {
    restaurant_id: i64,
    name: &'a str,
    rating: u8,
    comments: &'a str,
}

impl<'a> From<&'a Review> for NewReviewBody<'a> {
    fn from(review: &'a Review) -> Self {
        Self {
            restaurant_id: review.restaurant_id,
            name: &review.name,
            rating: review.rating,
            comments: &review.comments,
        }
    }
}

/// The favorite PUT answers with the whole restaurant; only the flag matters here.
#[derive(Debug, Deserialize)]
struct FavoriteResponse {
    is_favorite: FavoriteFlag,
}

/// API client for the directory server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the directory server
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(API_BASE_URL)
    }

    /// Create a client for a server at a different address (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Read a successful response body and decode it as JSON.
    async fn parse<T: DeserializeOwned>(response: reqwest::Response, what: &str) -> Result<T, ApiError> {
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, what: &str) -> Result<T, ApiError> {
        debug!(url = url, "GET");
        let response = self.client.get(url).send().await?;
        Self::parse(response, what).await
    }
}

#[async_trait]
impl RemoteGateway for ApiClient {
    async fn fetch_all_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
        let restaurants: Vec<Restaurant> = self.get(&self.url("/restaurants"), "restaurants").await?;
        debug!(count = restaurants.len(), "Fetched restaurants");
        Ok(restaurants)
    }

    async fn fetch_restaurant(&self, id: i64) -> Result<Restaurant, ApiError> {
        self.get(&self.url(&format!("/restaurants/{}", id)), "restaurant")
            .await
    }

    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, ApiError> {
        let url = self.url("/reviews");
        debug!(url = %url, restaurant_id, "GET");
        let response = self
            .client
            .get(&url)
            .query(&[("restaurant_id", restaurant_id)])
            .send()
            .await?;
        Self::parse(response, "reviews").await
    }

    async fn create_review(&self, review: &Review) -> Result<Review, ApiError> {
        let url = self.url("/reviews");
        debug!(url = %url, restaurant_id = review.restaurant_id, "POST");
        let response = self
            .client
            .post(&url)
            .json(&NewReviewBody::from(review))
            .send()
            .await?;
        let created: Review = Self::parse(response, "created review").await?;
        if created.id.is_none() {
            return Err(ApiError::InvalidResponse(
                "Created review has no id".to_string(),
            ));
        }
        Ok(created)
    }

    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<bool, ApiError> {
        let url = self.url(&format!("/restaurants/{}", id));
        debug!(url = %url, favorite, "PUT");
        let response = self
            .client
            .put(&url)
            .query(&[("is_favorite", favorite)])
            .send()
            .await?;
        let confirmed: FavoriteResponse = Self::parse(response, "favorite response").await?;
        Ok(confirmed.is_favorite.is_set())
    }
}
