//! HTTP access to the restaurant directory server.
//!
//! `RemoteGateway` is the contract the sync engine depends on; `ApiClient`
//! implements it with reqwest. Every call issues exactly one request and maps
//! any non-success status to an error. Retrying is left to callers.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::ApiClient;
pub use error::ApiError;
pub use gateway::RemoteGateway;
