//! dinecache-core - local-first restaurant directory.
//!
//! This crate provides the pieces shared by the dinecache front ends:
//! - `store`: versioned on-disk database with keyed collections
//! - `api`: HTTP client for the directory server
//! - `sync`: local-first reads and writes, offline review queue, reconcile
//! - `query`: filters and distinct values over the restaurant list
//! - `config`: user configuration and data directories

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod store;
pub mod sync;
pub mod utils;

pub use api::{ApiClient, ApiError, RemoteGateway};
pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use models::{FavoriteFlag, Restaurant, Review, ReviewDraft, ValidationError};
pub use query::{Filter, QueryFacade, ALL};
pub use store::{open_restaurants, KeyedStore, StoreError};
pub use sync::{
    CatalogStatus, Connectivity, FavoriteChange, PendingFavorite, ReconcileReport, ReviewAdded,
    SyncEngine, CATALOG_SIZE,
};
