use async_trait::async_trait;

use super::ApiError;
use crate::models::{Restaurant, Review};

/// Remote source of truth for restaurants and reviews.
#[async_trait]
pub trait RemoteGateway: Send + Sync + 'static {
    async fn fetch_all_restaurants(&self) -> Result<Vec<Restaurant>, ApiError>;

    async fn fetch_restaurant(&self, id: i64) -> Result<Restaurant, ApiError>;

    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, ApiError>;

    /// Create `review` on the server and return the stored copy, which carries
    /// the server-assigned id. Any id already on `review` is not sent.
    async fn create_review(&self, review: &Review) -> Result<Review, ApiError>;

    /// Set the favorite flag and return the value the server confirmed.
    async fn set_favorite(&self, id: i64, favorite: bool) -> Result<bool, ApiError>;
}
