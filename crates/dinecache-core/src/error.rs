//! Crate-level error type.
//!
//! Every operation in the sync layer fails with one of four kinds: the network
//! was unreachable, the server answered with a failure, local storage rejected
//! the operation, or the caller passed invalid review data.

use thiserror::Error;

use crate::api::ApiError;
use crate::models::ValidationError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response was received
    Transport,
    /// A response was received but reported failure or could not be used
    RemoteStatus,
    Storage,
    Validation,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api(ApiError::Transport(_)) => ErrorKind::Transport,
            Error::Api(_) => ErrorKind::RemoteStatus,
            Error::Storage(_) => ErrorKind::Storage,
            Error::Validation(_) => ErrorKind::Validation,
        }
    }
}
