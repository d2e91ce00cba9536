use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{Database, StoreError};

/// A record that can live in a `KeyedStore`.
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    fn id(&self) -> i64;
}

/// Typed access to one collection of a `Database`, keyed by entity id.
///
/// Cloning is cheap; clones share the same open database.
pub struct KeyedStore<T> {
    db: Arc<Database>,
    collection: String,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for KeyedStore<T> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            collection: self.collection.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> KeyedStore<T> {
    /// Bind to `collection`, which must have been created during an upgrade.
    pub async fn new(db: Arc<Database>, collection: &str) -> Result<Self, StoreError> {
        if !db.has_collection(collection).await {
            return Err(StoreError::MissingCollection(collection.to_string()));
        }
        Ok(Self {
            db,
            collection: collection.to_string(),
            _entity: PhantomData,
        })
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// All rows, in ascending id order.
    pub async fn get_all(&self) -> Result<Vec<T>, StoreError> {
        self.db
            .all_rows(&self.collection)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.db.count_rows(&self.collection).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<T>, StoreError> {
        self.db
            .get_row(&self.collection, id)
            .await?
            .map(decode)
            .transpose()
    }

    /// Insert or replace by id.
    pub async fn put(&self, entity: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(entity)?;
        self.db.put_row(&self.collection, entity.id(), value).await
    }

    /// Insert only if no row with this id exists. Returns whether the row was inserted;
    /// an existing row is left untouched.
    pub async fn add(&self, entity: &T) -> Result<bool, StoreError> {
        let value = serde_json::to_value(entity)?;
        self.db.add_row(&self.collection, entity.id(), value).await
    }

    /// `add` for a batch, applied as one write. Returns how many rows were inserted.
    pub async fn add_all(&self, entities: &[T]) -> Result<usize, StoreError> {
        let entries = entities
            .iter()
            .map(|entity| Ok((entity.id(), serde_json::to_value(entity)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.db.add_rows(&self.collection, entries).await
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt(e.to_string()))
}
