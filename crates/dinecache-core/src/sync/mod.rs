//! Synchronization between the local store and the remote server.
//!
//! - `SyncEngine`: local-first reads, write-through writes, and reconciliation
//!   of reviews written while offline
//! - `Connectivity`: the online flag and its offline-to-online edges, which
//!   trigger reconciliation

pub mod connectivity;
pub mod engine;

#[cfg(test)]
pub(crate) mod testing;

pub use connectivity::{BecameOnline, Connectivity};
pub use engine::{
    CatalogStatus, FavoriteChange, PendingFavorite, ReconcileReport, ReviewAdded, SyncEngine,
    CATALOG_SIZE,
};
