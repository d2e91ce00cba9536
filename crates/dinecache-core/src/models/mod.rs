//! Data models for the restaurant directory.
//!
//! - `Restaurant`: a directory entry, with its reviews embedded once fetched
//! - `Review`: a user review; a review without an `id` has not reached the server yet
//! - `ReviewDraft`: caller-supplied review data, validated before any write

pub mod restaurant;
pub mod review;

pub use restaurant::{FavoriteFlag, ImageSize, LatLng, Restaurant};
pub use review::{Review, ReviewDraft, ValidationError};

use crate::store::Entity;

impl Entity for Restaurant {
    fn id(&self) -> i64 {
        self.id
    }
}
