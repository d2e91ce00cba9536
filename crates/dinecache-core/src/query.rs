//! Filtered and aggregated views over the restaurant list.
//!
//! The free functions are pure transforms over a slice. `QueryFacade` runs
//! them over `SyncEngine::get_all`, so errors come only from that read.

use std::collections::HashSet;

use crate::api::RemoteGateway;
use crate::models::Restaurant;
use crate::sync::SyncEngine;
use crate::Result;

/// Sentinel filter value that matches every restaurant.
pub const ALL: &str = "all";

/// A filter on one dimension (cuisine or neighborhood).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Only(String),
}

impl Filter {
    /// Parse a UI value; `"all"` disables the filter.
    pub fn parse(value: &str) -> Self {
        if value == ALL {
            Filter::All
        } else {
            Filter::Only(value.to_string())
        }
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Filter::All => true,
            Filter::Only(wanted) => wanted == value,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Filter::All => ALL,
            Filter::Only(value) => value,
        }
    }
}

impl From<&str> for Filter {
    fn from(value: &str) -> Self {
        Filter::parse(value)
    }
}

pub fn by_cuisine(restaurants: &[Restaurant], cuisine: &str) -> Vec<Restaurant> {
    by_cuisine_and_neighborhood(restaurants, cuisine, ALL)
}

pub fn by_neighborhood(restaurants: &[Restaurant], neighborhood: &str) -> Vec<Restaurant> {
    by_cuisine_and_neighborhood(restaurants, ALL, neighborhood)
}

pub fn by_cuisine_and_neighborhood(
    restaurants: &[Restaurant],
    cuisine: &str,
    neighborhood: &str,
) -> Vec<Restaurant> {
    let cuisine = Filter::parse(cuisine);
    let neighborhood = Filter::parse(neighborhood);
    restaurants
        .iter()
        .filter(|r| cuisine.matches(&r.cuisine_type) && neighborhood.matches(&r.neighborhood))
        .cloned()
        .collect()
}

/// Neighborhoods in first-occurrence order, without duplicates.
pub fn distinct_neighborhoods(restaurants: &[Restaurant]) -> Vec<String> {
    distinct(restaurants.iter().map(|r| r.neighborhood.as_str()))
}

/// Cuisines in first-occurrence order, without duplicates.
pub fn distinct_cuisines(restaurants: &[Restaurant]) -> Vec<String> {
    distinct(restaurants.iter().map(|r| r.cuisine_type.as_str()))
}

/// Only favorites when `only` is set; otherwise everything.
pub fn favorites_only(restaurants: &[Restaurant], only: bool) -> Vec<Restaurant> {
    restaurants
        .iter()
        .filter(|r| !only || r.is_favorite.is_set())
        .cloned()
        .collect()
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

/// Query views backed by a `SyncEngine`.
pub struct QueryFacade<'a, G> {
    engine: &'a SyncEngine<G>,
}

impl<'a, G: RemoteGateway> QueryFacade<'a, G> {
    pub fn new(engine: &'a SyncEngine<G>) -> Self {
        Self { engine }
    }

    pub async fn by_cuisine(&self, cuisine: &str) -> Result<Vec<Restaurant>> {
        Ok(by_cuisine(&self.engine.get_all().await?, cuisine))
    }

    pub async fn by_neighborhood(&self, neighborhood: &str) -> Result<Vec<Restaurant>> {
        Ok(by_neighborhood(&self.engine.get_all().await?, neighborhood))
    }

    pub async fn by_cuisine_and_neighborhood(
        &self,
        cuisine: &str,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>> {
        Ok(by_cuisine_and_neighborhood(
            &self.engine.get_all().await?,
            cuisine,
            neighborhood,
        ))
    }

    pub async fn distinct_neighborhoods(&self) -> Result<Vec<String>> {
        Ok(distinct_neighborhoods(&self.engine.get_all().await?))
    }

    pub async fn distinct_cuisines(&self) -> Result<Vec<String>> {
        Ok(distinct_cuisines(&self.engine.get_all().await?))
    }

    pub async fn favorites_only(&self, only: bool) -> Result<Vec<Restaurant>> {
        Ok(favorites_only(&self.engine.get_all().await?, only))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FavoriteFlag;
    use crate::store::open_restaurants;
    use crate::sync::testing::{restaurant, FakeGateway};
    use crate::sync::Connectivity;

    fn sample() -> Vec<Restaurant> {
        let mut rows = vec![
            restaurant(1, "American", "Manhattan"),
            restaurant(2, "Italian", "Brooklyn"),
            restaurant(3, "American", "Queens"),
            restaurant(4, "Mexican", "Brooklyn"),
            restaurant(5, "Italian", "Manhattan"),
        ];
        rows[1].is_favorite = FavoriteFlag::new(true);
        rows[3].is_favorite = FavoriteFlag::new(true);
        rows
    }

    fn ids(rows: &[Restaurant]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_distinct_cuisines_keeps_first_occurrence_order() {
        let rows = vec![
            restaurant(1, "American", "A"),
            restaurant(2, "Italian", "A"),
            restaurant(3, "American", "A"),
            restaurant(4, "Mexican", "A"),
        ];
        assert_eq!(distinct_cuisines(&rows), vec!["American", "Italian", "Mexican"]);
    }

    #[test]
    fn test_distinct_neighborhoods() {
        assert_eq!(
            distinct_neighborhoods(&sample()),
            vec!["Manhattan", "Brooklyn", "Queens"]
        );
        assert!(distinct_neighborhoods(&[]).is_empty());
    }

    #[test]
    fn test_cuisine_and_neighborhood_filters() {
        let rows = sample();
        assert_eq!(ids(&by_cuisine_and_neighborhood(&rows, "all", "all")), vec![1, 2, 3, 4, 5]);
        assert_eq!(ids(&by_cuisine_and_neighborhood(&rows, "Italian", "all")), vec![2, 5]);
        assert_eq!(ids(&by_cuisine_and_neighborhood(&rows, "all", "Brooklyn")), vec![2, 4]);
        assert_eq!(ids(&by_cuisine_and_neighborhood(&rows, "Italian", "Brooklyn")), vec![2]);
        assert!(by_cuisine_and_neighborhood(&rows, "Thai", "all").is_empty());
    }

    #[test]
    fn test_single_dimension_filters() {
        let rows = sample();
        assert_eq!(ids(&by_cuisine(&rows, "American")), vec![1, 3]);
        assert_eq!(ids(&by_neighborhood(&rows, "Manhattan")), vec![1, 5]);
        assert_eq!(ids(&by_cuisine(&rows, ALL)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_favorites_only() {
        let rows = sample();
        assert_eq!(ids(&favorites_only(&rows, true)), vec![2, 4]);
        assert_eq!(ids(&favorites_only(&rows, false)), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_filter_parse() {
        assert_eq!(Filter::parse("all"), Filter::All);
        assert_eq!(Filter::parse("Asian"), Filter::Only("Asian".to_string()));
        assert_eq!(Filter::from("Asian").as_str(), "Asian");
        assert_eq!(Filter::default().as_str(), "all");
    }

    #[tokio::test]
    async fn test_facade_reads_through_engine() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_restaurants(dir.path()).await.unwrap();
        let engine = SyncEngine::new(store, FakeGateway::with_restaurants(sample()), Connectivity::new(true))
            .with_catalog_size(5);
        let query = QueryFacade::new(&engine);

        assert_eq!(query.distinct_cuisines().await.unwrap(), vec!["American", "Italian", "Mexican"]);
        assert_eq!(ids(&query.by_cuisine("Italian").await.unwrap()), vec![2, 5]);
        assert_eq!(ids(&query.by_neighborhood("Queens").await.unwrap()), vec![3]);
        assert_eq!(ids(&query.favorites_only(true).await.unwrap()), vec![2, 4]);
    }

    #[tokio::test]
    async fn test_facade_propagates_fetch_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_restaurants(dir.path()).await.unwrap();
        let gateway = FakeGateway::with_restaurants(sample());
        gateway.fail_fetch_all.store(true, std::sync::atomic::Ordering::SeqCst);
        let engine = SyncEngine::new(store, gateway, Connectivity::new(true));

        let err = QueryFacade::new(&engine).distinct_neighborhoods().await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::RemoteStatus);
    }
}
