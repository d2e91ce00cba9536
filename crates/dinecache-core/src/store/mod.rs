//! Local persistent storage.
//!
//! `Database` is a versioned, file-backed set of named collections. Each
//! mutation is persisted before it returns, and is rolled back in memory if
//! the write fails. `KeyedStore` is a typed handle on one collection, keyed
//! by entity id.
//!
//! The restaurant directory uses a single collection, `restaurants`, in the
//! `restaurants-db` database.

pub mod database;
pub mod error;
pub mod keyed;

use std::path::Path;
use std::sync::Arc;

pub use database::{Database, OpenOptions, Upgrade};
pub use error::StoreError;
pub use keyed::{Entity, KeyedStore};

use crate::models::Restaurant;

/// Database file name (without extension)
pub const DB_NAME: &str = "restaurants-db";

/// Current schema version
pub const DB_VERSION: u32 = 4;

/// Collection holding restaurant rows keyed by `id`
pub const RESTAURANTS_COLLECTION: &str = "restaurants";

/// Open the restaurant database under `dir`, creating the `restaurants`
/// collection on first open or version bump.
pub async fn open_restaurants(dir: &Path) -> Result<KeyedStore<Restaurant>, StoreError> {
    let db = OpenOptions::new(DB_NAME, DB_VERSION)
        .open(dir, |upgrade| {
            if !upgrade.contains_collection(RESTAURANTS_COLLECTION) {
                upgrade.create_collection(RESTAURANTS_COLLECTION);
            }
        })
        .await?;
    restaurants_in(db).await
}

/// Typed handle on the `restaurants` collection of an already-open database.
pub async fn restaurants_in(db: Arc<Database>) -> Result<KeyedStore<Restaurant>, StoreError> {
    KeyedStore::new(db, RESTAURANTS_COLLECTION).await
}
