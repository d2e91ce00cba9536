use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::StoreError;

type Rows = BTreeMap<i64, Value>;

/// On-disk shape of a database file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    #[serde(default)]
    collections: BTreeMap<String, Rows>,
    #[serde(default)]
    meta: BTreeMap<String, String>,
}

/// Builder for opening a `Database`.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    name: String,
    version: u32,
    quota_bytes: Option<usize>,
}

impl OpenOptions {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            quota_bytes: None,
        }
    }

    /// Reject any write that would grow the database file past `quota` bytes.
    pub fn quota_bytes(mut self, quota: usize) -> Self {
        self.quota_bytes = Some(quota);
        self
    }

    /// Open (or create) the database under `dir`.
    ///
    /// `upgrade` runs when the file is missing or was written by an older
    /// schema version. Opening a file written by a newer version fails with
    /// `VersionConflict`.
    pub async fn open<F>(self, dir: &Path, upgrade: F) -> Result<Arc<Database>, StoreError>
    where
        F: FnOnce(&mut Upgrade<'_>),
    {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.json", self.name));

        let mut snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };

        if snapshot.version > self.version {
            return Err(StoreError::VersionConflict {
                stored: snapshot.version,
                requested: self.version,
            });
        }

        let db = Database {
            path,
            name: self.name,
            version: self.version,
            quota_bytes: self.quota_bytes,
            state: Mutex::new(Snapshot::default()),
        };

        if snapshot.version < self.version {
            info!(
                db = %db.name,
                from = snapshot.version,
                to = self.version,
                "Upgrading local database"
            );
            let mut tx = Upgrade {
                old_version: snapshot.version,
                new_version: self.version,
                collections: &mut snapshot.collections,
            };
            upgrade(&mut tx);
            snapshot.version = self.version;
            db.persist(&snapshot).await?;
        }

        *db.state.lock().await = snapshot;
        debug!(db = %db.name, path = %db.path.display(), "Local database open");
        Ok(Arc::new(db))
    }
}

/// Schema changes allowed while a database is being upgraded.
pub struct Upgrade<'a> {
    old_version: u32,
    new_version: u32,
    collections: &'a mut BTreeMap<String, Rows>,
}

impl Upgrade<'_> {
    /// Version the file was at before this upgrade (0 for a new database).
    pub fn old_version(&self) -> u32 {
        self.old_version
    }

    pub fn new_version(&self) -> u32 {
        self.new_version
    }

    pub fn contains_collection(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Create an empty collection. Returns false if it already existed.
    pub fn create_collection(&mut self, name: &str) -> bool {
        if self.collections.contains_key(name) {
            return false;
        }
        self.collections.insert(name.to_string(), Rows::new());
        true
    }
}

/// A versioned, file-backed set of keyed collections.
///
/// All access goes through one lock, so each operation is a transaction:
/// the change is applied, the whole database is written to a temp file and
/// renamed over the old one, and the in-memory change is undone if any step
/// fails.
pub struct Database {
    path: PathBuf,
    name: String,
    version: u32,
    quota_bytes: Option<usize>,
    state: Mutex<Snapshot>,
}

impl Database {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn has_collection(&self, collection: &str) -> bool {
        self.state.lock().await.collections.contains_key(collection)
    }

    pub(crate) async fn all_rows(&self, collection: &str) -> Result<Vec<Value>, StoreError> {
        let state = self.state.lock().await;
        Ok(rows(&state, collection)?.values().cloned().collect())
    }

    pub(crate) async fn count_rows(&self, collection: &str) -> Result<usize, StoreError> {
        let state = self.state.lock().await;
        Ok(rows(&state, collection)?.len())
    }

    pub(crate) async fn get_row(&self, collection: &str, id: i64) -> Result<Option<Value>, StoreError> {
        let state = self.state.lock().await;
        Ok(rows(&state, collection)?.get(&id).cloned())
    }

    /// Insert or replace the row at `id`.
    pub(crate) async fn put_row(&self, collection: &str, id: i64, value: Value) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let previous = rows_mut(&mut state, collection)?.insert(id, value);

        if let Err(e) = self.persist(&state).await {
            let rows = rows_mut(&mut state, collection)?;
            match previous {
                Some(old) => rows.insert(id, old),
                None => rows.remove(&id),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Insert the row at `id` only if no row exists there. Returns whether it was inserted.
    pub(crate) async fn add_row(&self, collection: &str, id: i64, value: Value) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let rows = rows_mut(&mut state, collection)?;
        if rows.contains_key(&id) {
            return Ok(false);
        }
        rows.insert(id, value);

        if let Err(e) = self.persist(&state).await {
            rows_mut(&mut state, collection)?.remove(&id);
            return Err(e);
        }
        Ok(true)
    }

    /// Insert every row whose id is free, in one write. Returns how many were inserted.
    pub(crate) async fn add_rows(
        &self,
        collection: &str,
        entries: Vec<(i64, Value)>,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        let rows = rows_mut(&mut state, collection)?;
        let mut inserted = Vec::new();
        for (id, value) in entries {
            if let Entry::Vacant(slot) = rows.entry(id) {
                slot.insert(value);
                inserted.push(id);
            }
        }
        if inserted.is_empty() {
            return Ok(0);
        }

        if let Err(e) = self.persist(&state).await {
            let rows = rows_mut(&mut state, collection)?;
            for id in &inserted {
                rows.remove(id);
            }
            return Err(e);
        }
        Ok(inserted.len())
    }

    pub async fn meta(&self, key: &str) -> Option<String> {
        self.state.lock().await.meta.get(key).cloned()
    }

    pub async fn set_meta(&self, key: &str, value: impl Into<String>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let previous = state.meta.insert(key.to_string(), value.into());

        if let Err(e) = self.persist(&state).await {
            match previous {
                Some(old) => state.meta.insert(key.to_string(), old),
                None => state.meta.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(snapshot)?;
        if let Some(quota) = self.quota_bytes {
            if bytes.len() > quota {
                warn!(db = %self.name, needed = bytes.len(), quota, "Write rejected, quota exceeded");
                return Err(StoreError::QuotaExceeded {
                    needed: bytes.len(),
                    quota,
                });
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn rows<'a>(state: &'a Snapshot, collection: &str) -> Result<&'a Rows, StoreError> {
    state
        .collections
        .get(collection)
        .ok_or_else(|| StoreError::MissingCollection(collection.to_string()))
}

fn rows_mut<'a>(state: &'a mut Snapshot, collection: &str) -> Result<&'a mut Rows, StoreError> {
    state
        .collections
        .get_mut(collection)
        .ok_or_else(|| StoreError::MissingCollection(collection.to_string()))
}
