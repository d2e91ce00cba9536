//! Local-first synchronization between the restaurant store and the server.
//!
//! Reads are served from the local store when it can answer and fall
//! through to the network otherwise, back-filling the store. Writes land in
//! the local store first and are then pushed to the server. Reviews written
//! while offline stay in the store without an id until `reconcile` pushes
//! them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::Connectivity;
use crate::api::RemoteGateway;
use crate::models::{FavoriteFlag, Restaurant, Review, ReviewDraft};
use crate::store::KeyedStore;
use crate::utils::age_display;
use crate::Result;

// ============================================================================
// Constants
// ============================================================================

/// Number of restaurants in the directory.
/// A local store holding exactly this many rows is treated as complete.
pub const CATALOG_SIZE: usize = 10;

/// Store metadata key recording the last full network fetch (RFC 3339)
const FETCHED_AT_KEY: &str = "restaurants.fetched_at";

/// How a favorite toggle should change the stored flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteChange {
    Toggle,
    Set(bool),
}

/// Local result of `set_favorite`, with the server push still in flight.
pub struct PendingFavorite {
    local: bool,
    push: JoinHandle<Result<bool>>,
}

impl PendingFavorite {
    /// The value written to the local store.
    pub fn local(&self) -> bool {
        self.local
    }

    /// Wait for the server push. `None` if the push task was cancelled or panicked.
    ///
    /// Dropping the `PendingFavorite` instead detaches the push; it still runs.
    pub async fn confirmed(self) -> Option<Result<bool>> {
        match self.push.await {
            Ok(result) => Some(result),
            Err(e) => {
                error!(error = %e, "Favorite push task failed");
                None
            }
        }
    }
}

/// Outcome of `add_review`.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewAdded {
    /// Stored locally without an id, to be pushed by a later reconcile
    Queued(Review),
    /// Created on the server and stored with its server-assigned id
    Synced(Review),
}

impl ReviewAdded {
    pub fn review(&self) -> &Review {
        match self {
            ReviewAdded::Queued(review) | ReviewAdded::Synced(review) => review,
        }
    }

    pub fn is_queued(&self) -> bool {
        matches!(self, ReviewAdded::Queued(_))
    }

    /// User-facing confirmation text.
    pub fn message(&self) -> &'static str {
        match self {
            ReviewAdded::Queued(_) => {
                "You are offline. The review was saved locally and will be sent when you're back online."
            }
            ReviewAdded::Synced(_) => "Review saved to the server.",
        }
    }
}

/// What one reconcile pass did for a restaurant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub restaurant_id: i64,
    /// Reviews pushed and now carrying a server id
    pub synced: usize,
    /// Reviews whose push failed; they stay queued
    pub failed: usize,
}

/// Snapshot of the local catalog for status displays.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStatus {
    pub cached: usize,
    pub catalog_size: usize,
    pub fetched_at: Option<DateTime<Utc>>,
    pub pending_reviews: usize,
}

impl CatalogStatus {
    pub fn is_complete(&self) -> bool {
        self.cached == self.catalog_size
    }

    pub fn age_display(&self) -> String {
        match self.fetched_at {
            Some(at) => age_display((Utc::now() - at).num_minutes()),
            None => "never".to_string(),
        }
    }
}

/// Coordinates the local store, the remote gateway and the connectivity flag.
///
/// Holds no per-page state; callers pass the restaurant they are working
/// with. Cloning is cheap and clones share the store, gateway and flag.
pub struct SyncEngine<G> {
    store: KeyedStore<Restaurant>,
    gateway: Arc<G>,
    connectivity: Connectivity,
    catalog_size: usize,
}

impl<G> Clone for SyncEngine<G> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            gateway: Arc::clone(&self.gateway),
            connectivity: self.connectivity.clone(),
            catalog_size: self.catalog_size,
        }
    }
}

impl<G: RemoteGateway> SyncEngine<G> {
    pub fn new(store: KeyedStore<Restaurant>, gateway: G, connectivity: Connectivity) -> Self {
        Self {
            store,
            gateway: Arc::new(gateway),
            connectivity,
            catalog_size: CATALOG_SIZE,
        }
    }

    /// Override the row count at which the local store counts as complete.
    pub fn with_catalog_size(mut self, catalog_size: usize) -> Self {
        self.catalog_size = catalog_size;
        self
    }

    pub fn store(&self) -> &KeyedStore<Restaurant> {
        &self.store
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    // ===== Reads =====

    /// All restaurants.
    ///
    /// Served from the store when it holds the whole catalog. Otherwise the
    /// catalog is fetched, rows missing locally are added (existing rows are
    /// never overwritten), and the fetched list is returned.
    pub async fn get_all(&self) -> Result<Vec<Restaurant>> {
        let local = self.store.get_all().await?;
        if local.len() == self.catalog_size {
            debug!(count = local.len(), "Restaurants served from store");
            return Ok(local);
        }

        debug!(
            cached = local.len(),
            expected = self.catalog_size,
            "Store incomplete, fetching restaurants"
        );
        let fetched = self.gateway.fetch_all_restaurants().await?;

        let added = self.store.add_all(&fetched).await?;
        self.store
            .database()
            .set_meta(FETCHED_AT_KEY, Utc::now().to_rfc3339())
            .await?;
        info!(fetched = fetched.len(), added, "Restaurant store back-filled");

        Ok(fetched)
    }

    /// One restaurant with its reviews embedded when they can be fetched.
    ///
    /// A stored row that already carries the server's reviews is returned as
    /// is. Otherwise the reviews are fetched, merged with any reviews added on
    /// this device, and saved; if that fetch fails the row is returned as
    /// stored. A restaurant missing locally is
    /// fetched, saved, and fails the call only if the restaurant itself
    /// cannot be fetched.
    pub async fn get_by_id(&self, id: i64) -> Result<Restaurant> {
        if let Some(mut restaurant) = self.store.get(id).await? {
            if restaurant.has_reviews() {
                debug!(id, "Restaurant with reviews served from store");
                return Ok(restaurant);
            }

            match self.gateway.fetch_reviews(id).await {
                Ok(reviews) => {
                    restaurant.embed_server_reviews(reviews);
                    self.store.put(&restaurant).await?;
                    debug!(id, "Reviews embedded into stored restaurant");
                }
                Err(e) => {
                    warn!(id, error = %e, "Failed to fetch reviews, serving restaurant without them");
                }
            }
            return Ok(restaurant);
        }

        debug!(id, "Restaurant not in store, fetching");
        let mut restaurant = self.gateway.fetch_restaurant(id).await?;
        match self.gateway.fetch_reviews(id).await {
            Ok(reviews) => restaurant.reviews = Some(reviews),
            Err(e) => {
                warn!(id, error = %e, "Failed to fetch reviews for new restaurant");
            }
        }
        self.store.put(&restaurant).await?;
        Ok(restaurant)
    }

    // ===== Writes =====

    /// Change the favorite flag locally, then push it to the server in the background.
    ///
    /// The local write happens before this returns. If the push fails the
    /// local value stays. If the server confirms a different value, the
    /// stored row is updated to match.
    pub async fn set_favorite(
        &self,
        restaurant: &mut Restaurant,
        change: FavoriteChange,
    ) -> Result<PendingFavorite> {
        let desired = match change {
            FavoriteChange::Toggle => restaurant.is_favorite.toggled(),
            FavoriteChange::Set(value) => FavoriteFlag::new(value),
        };

        let mut updated = restaurant.clone();
        updated.is_favorite = desired;
        self.store.put(&updated).await?;
        *restaurant = updated;
        debug!(id = restaurant.id, favorite = %desired, "Favorite stored locally");

        let engine = self.clone();
        let id = restaurant.id;
        let push = tokio::spawn(async move { engine.push_favorite(id, desired.is_set()).await });

        Ok(PendingFavorite {
            local: desired.is_set(),
            push,
        })
    }

    async fn push_favorite(&self, id: i64, desired: bool) -> Result<bool> {
        let confirmed = match self.gateway.set_favorite(id, desired).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                warn!(id, error = %e, "Favorite push failed, keeping local value");
                return Err(e.into());
            }
        };

        if confirmed != desired {
            info!(id, desired, confirmed, "Server confirmed a different favorite value");
            if let Some(mut stored) = self.store.get(id).await? {
                stored.is_favorite = FavoriteFlag::new(confirmed);
                self.store.put(&stored).await?;
            }
        }
        Ok(confirmed)
    }

    /// Add a review to `restaurant`.
    ///
    /// The draft is validated before anything is written. When offline the
    /// review is appended without an id and stored, to be pushed by
    /// `reconcile`. When online it is posted first and stored with the id
    /// the server assigns. A post that fails to reach the server is queued
    /// the same way as an offline write; a post the server rejects is
    /// returned as an error and nothing is stored.
    pub async fn add_review(
        &self,
        restaurant: &mut Restaurant,
        draft: ReviewDraft,
    ) -> Result<ReviewAdded> {
        let review = draft.into_review(restaurant.id)?;

        if !self.connectivity.is_online() {
            debug!(id = restaurant.id, "Offline, queueing review");
            return self.append_review(restaurant, review, ReviewAdded::Queued).await;
        }

        match self.gateway.create_review(&review).await {
            Ok(created) => self.append_review(restaurant, created, ReviewAdded::Synced).await,
            Err(e) if e.is_transport() => {
                warn!(id = restaurant.id, error = %e, "Server unreachable, queueing review");
                self.append_review(restaurant, review, ReviewAdded::Queued).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Store `review` on the restaurant. A review the server accepted on a
    /// restaurant whose reviews were never fetched pulls the server list in
    /// first; if that is not possible the list is stored as partial.
    async fn append_review(
        &self,
        restaurant: &mut Restaurant,
        review: Review,
        outcome: fn(Review) -> ReviewAdded,
    ) -> Result<ReviewAdded> {
        let mut updated = restaurant.clone();
        if updated.reviews.is_none() && review.is_synced() {
            match self.gateway.fetch_reviews(updated.id).await {
                Ok(server) => updated.embed_server_reviews(server),
                Err(e) => {
                    warn!(id = updated.id, error = %e, "Failed to fetch reviews, storing partial list");
                }
            }
        }
        updated.push_review(review.clone());
        self.store.put(&updated).await?;
        *restaurant = updated;
        Ok(outcome(review))
    }

    // ===== Reconciliation =====

    /// Push every unsynced review of `restaurant` and store the merged list.
    ///
    /// Posts run concurrently and fail independently: a failed post leaves
    /// its review queued for the next reconcile and does not affect the
    /// others. A partial list is completed from the server afterwards. Only
    /// a storage failure fails the call.
    pub async fn reconcile(&self, restaurant: &mut Restaurant) -> Result<ReconcileReport> {
        let mut report = ReconcileReport {
            restaurant_id: restaurant.id,
            ..Default::default()
        };

        let reviews = restaurant.reviews.clone().unwrap_or_default();
        let (mut merged, unsynced): (Vec<Review>, Vec<Review>) =
            reviews.into_iter().partition(Review::is_synced);
        if unsynced.is_empty() {
            return Ok(report);
        }

        debug!(id = restaurant.id, pending = unsynced.len(), "Pushing queued reviews");
        let results = join_all(unsynced.iter().map(|review| self.gateway.create_review(review))).await;

        let mut still_queued = Vec::new();
        for (review, result) in unsynced.into_iter().zip(results) {
            match result {
                Ok(created) => {
                    report.synced += 1;
                    merged.push(created);
                }
                Err(e) => {
                    warn!(id = restaurant.id, reviewer = %review.name, error = %e, "Queued review push failed");
                    report.failed += 1;
                    still_queued.push(review);
                }
            }
        }
        merged.extend(still_queued);

        let mut updated = restaurant.clone();
        updated.reviews = Some(merged);
        if updated.reviews_partial {
            // The server list now also holds the reviews just pushed
            match self.gateway.fetch_reviews(updated.id).await {
                Ok(server) => updated.embed_server_reviews(server),
                Err(e) => {
                    warn!(id = updated.id, error = %e, "Failed to fetch reviews, list stays partial");
                }
            }
        }
        self.store.put(&updated).await?;
        *restaurant = updated;

        info!(
            id = report.restaurant_id,
            synced = report.synced,
            failed = report.failed,
            "Reconciled queued reviews"
        );
        Ok(report)
    }

    /// Reconcile every stored restaurant that has queued reviews.
    pub async fn reconcile_pending(&self) -> Result<Vec<ReconcileReport>> {
        let mut reports = Vec::new();
        for mut restaurant in self.store.get_all().await? {
            if restaurant.pending_review_count() == 0 {
                continue;
            }
            reports.push(self.reconcile(&mut restaurant).await?);
        }
        Ok(reports)
    }

    /// Run `reconcile_pending` each time connectivity comes back.
    ///
    /// The listener runs until the returned handle is aborted.
    pub fn spawn_reconnect_listener(&self) -> JoinHandle<()> {
        let engine = self.clone();
        let mut became_online = self.connectivity.subscribe();
        tokio::spawn(async move {
            while became_online.next().await {
                info!("Back online, reconciling queued reviews");
                match engine.reconcile_pending().await {
                    Ok(reports) => {
                        let synced: usize = reports.iter().map(|r| r.synced).sum();
                        let failed: usize = reports.iter().map(|r| r.failed).sum();
                        info!(restaurants = reports.len(), synced, failed, "Reconnect reconcile finished");
                    }
                    Err(e) => {
                        error!(error = %e, "Reconnect reconcile failed");
                    }
                }
            }
        })
    }

    // ===== Status =====

    pub async fn catalog_status(&self) -> Result<CatalogStatus> {
        let rows = self.store.get_all().await?;
        let fetched_at = self
            .store
            .database()
            .meta(FETCHED_AT_KEY)
            .await
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        Ok(CatalogStatus {
            cached: rows.len(),
            catalog_size: self.catalog_size,
            fetched_at,
            pending_reviews: rows.iter().map(Restaurant::pending_review_count).sum(),
        })
    }
}
