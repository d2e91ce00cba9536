//! In-memory `RemoteGateway` for sync engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::Notify;

use crate::api::{ApiError, RemoteGateway};
use crate::models::{Restaurant, Review};

pub(crate) fn restaurant(id: i64, cuisine: &str, neighborhood: &str) -> Restaurant {
    serde_json::from_value(json!({
        "id": id,
        "name": format!("Restaurant {}", id),
        "neighborhood": neighborhood,
        "address": format!("{} Main St", id),
        "latlng": { "lat": 40.7, "lng": -73.9 },
        "cuisine_type": cuisine,
        "is_favorite": "false"
    }))
    .unwrap()
}

pub(crate) fn synced_review(id: i64, restaurant_id: i64, name: &str) -> Review {
    Review {
        id: Some(id),
        restaurant_id,
        name: name.to_string(),
        rating: 4,
        comments: "Solid".to_string(),
        created_at: Some(1_504_095_567_183),
        updated_at: None,
    }
}

pub(crate) fn unsynced_review(restaurant_id: i64, name: &str) -> Review {
    Review {
        id: None,
        restaurant_id,
        name: name.to_string(),
        rating: 3,
        comments: "Queued".to_string(),
        created_at: None,
        updated_at: None,
    }
}

/// A real transport failure: connect to a port nothing is listening on.
pub(crate) async fn transport_error() -> ApiError {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    reqwest::Client::new()
        .get(format!("http://127.0.0.1:{}/", port))
        .send()
        .await
        .unwrap_err()
        .into()
}

fn server_error() -> ApiError {
    ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "fake failure")
}

#[derive(Default)]
pub(crate) struct FakeGateway {
    pub restaurants: Mutex<Vec<Restaurant>>,
    pub reviews: Mutex<HashMap<i64, Vec<Review>>>,

    pub fail_fetch_all: AtomicBool,
    pub fail_fetch_reviews: AtomicBool,
    pub fail_favorite: AtomicBool,
    /// create_review answers 500 for these reviewer names
    pub reject_reviews_from: Mutex<HashSet<String>>,
    /// create_review fails at the transport level for every review
    pub reviews_unreachable: AtomicBool,
    /// create_review sleeps this long (ms) before answering, per reviewer name
    pub review_delays_ms: Mutex<HashMap<String, u64>>,
    /// When set, set_favorite waits for a notification before answering
    pub favorite_gate: Mutex<Option<Arc<Notify>>>,
    /// When set, set_favorite confirms this value instead of echoing the request
    pub favorite_override: Mutex<Option<bool>>,

    pub next_review_id: AtomicI64,

    pub fetch_all_calls: AtomicUsize,
    pub fetch_restaurant_calls: AtomicUsize,
    pub fetch_reviews_calls: AtomicUsize,
    pub create_review_calls: AtomicUsize,
    pub set_favorite_calls: AtomicUsize,
}

impl FakeGateway {
    pub fn with_restaurants(restaurants: Vec<Restaurant>) -> Self {
        let fake = Self::default();
        *fake.restaurants.lock().unwrap() = restaurants;
        fake.next_review_id.store(99, Ordering::SeqCst);
        fake
    }

    pub fn set_reviews(&self, restaurant_id: i64, reviews: Vec<Review>) {
        self.reviews.lock().unwrap().insert(restaurant_id, reviews);
    }

    pub fn network_calls(&self) -> usize {
        self.fetch_all_calls.load(Ordering::SeqCst)
            + self.fetch_restaurant_calls.load(Ordering::SeqCst)
            + self.fetch_reviews_calls.load(Ordering::SeqCst)
            + self.create_review_calls.load(Ordering::SeqCst)
            + self.set_favorite_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    async fn fetch_all_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
        self.fetch_all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_all.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.restaurants.lock().unwrap().clone())
    }

    async fn fetch_restaurant(&self, id: i64) -> Result<Restaurant, ApiError> {
        self.fetch_restaurant_calls.fetch_add(1, Ordering::SeqCst);
        self.restaurants
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| ApiError::from_status(StatusCode::NOT_FOUND, "Not Found"))
    }

    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, ApiError> {
        self.fetch_reviews_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch_reviews.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&restaurant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_review(&self, review: &Review) -> Result<Review, ApiError> {
        self.create_review_calls.fetch_add(1, Ordering::SeqCst);

        let delay = self.review_delays_ms.lock().unwrap().get(&review.name).copied();
        if let Some(ms) = delay {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if self.reviews_unreachable.load(Ordering::SeqCst) {
            return Err(transport_error().await);
        }
        if self.reject_reviews_from.lock().unwrap().contains(&review.name) {
            return Err(server_error());
        }

        let mut created = review.clone();
        created.id = Some(self.next_review_id.fetch_add(1, Ordering::SeqCst));
        created.created_at = Some(1_504_095_567_183);
        self.reviews
            .lock()
            .unwrap()
            .entry(review.restaurant_id)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn set_favorite(&self, _id: i64, favorite: bool) -> Result<bool, ApiError> {
        self.set_favorite_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.favorite_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.fail_favorite.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.favorite_override.lock().unwrap().unwrap_or(favorite))
    }
}
