//! Utility functions for display formatting.

pub mod format;

pub use format::{age_display, format_timestamp_millis, rating_stars, truncate_string};
