//! Command dispatch for the dinecache CLI.
//!
//! `App` owns the sync engine and the user config. Each command maps onto
//! one engine or query operation and prints its result.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use dinecache_core::{
    open_restaurants, ApiClient, Config, Connectivity, FavoriteChange, Filter, QueryFacade,
    ReviewDraft, SyncEngine,
};

use crate::args::Command;
use crate::output;

pub struct App {
    engine: SyncEngine<ApiClient>,
    config: Config,
}

impl App {
    pub async fn new(config: Config, online: bool) -> Result<Self> {
        let store_dir = config.store_dir()?;
        debug!(dir = %store_dir.display(), "Opening restaurant store");
        let store = open_restaurants(&store_dir)
            .await
            .with_context(|| format!("Failed to open store in {}", store_dir.display()))?;
        let engine = SyncEngine::new(store, ApiClient::new()?, Connectivity::new(online));
        Ok(Self { engine, config })
    }

    pub fn save_config(&self) -> Result<()> {
        self.config.save()
    }

    pub async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::List {
                cuisine,
                neighborhood,
                favorites_only,
                json,
            } => self.list(cuisine, neighborhood, favorites_only, json).await,
            Command::Cuisines => {
                let cuisines = QueryFacade::new(&self.engine).distinct_cuisines().await?;
                output::print_facet("Cuisines", &cuisines);
                Ok(())
            }
            Command::Neighborhoods => {
                let neighborhoods = QueryFacade::new(&self.engine)
                    .distinct_neighborhoods()
                    .await?;
                output::print_facet("Neighborhoods", &neighborhoods);
                Ok(())
            }
            Command::Show { id, json } => self.show(id, json).await,
            Command::Favorite { id } => self.toggle_favorite(id).await,
            Command::Review {
                id,
                name,
                rating,
                comments,
            } => self.review(id, &name, &rating, &comments).await,
            Command::Sync => self.sync().await,
            Command::Status => {
                let status = self.engine.catalog_status().await?;
                output::print_status(&status, self.engine.connectivity().is_online());
                Ok(())
            }
            Command::Help => Ok(()),
        }
    }

    async fn list(
        &mut self,
        cuisine: Option<Filter>,
        neighborhood: Option<Filter>,
        favorites_only: Option<bool>,
        json: bool,
    ) -> Result<()> {
        let cuisine = cuisine.unwrap_or_else(|| self.config.cuisine_filter());
        let neighborhood = neighborhood.unwrap_or_else(|| self.config.neighborhood_filter());
        let favorites_only = favorites_only.unwrap_or(self.config.favorites_only);

        let matching = QueryFacade::new(&self.engine)
            .by_cuisine_and_neighborhood(cuisine.as_str(), neighborhood.as_str())
            .await?;
        let restaurants = dinecache_core::query::favorites_only(&matching, favorites_only);

        self.config
            .remember_filters(&cuisine, &neighborhood, favorites_only);

        if json {
            println!("{}", serde_json::to_string_pretty(&restaurants)?);
        } else {
            output::print_filters(&cuisine, &neighborhood, favorites_only);
            output::print_restaurant_table(&restaurants);
        }
        Ok(())
    }

    async fn show(&mut self, id: i64, json: bool) -> Result<()> {
        let restaurant = self.engine.get_by_id(id).await?;
        self.config.last_restaurant_id = Some(id);

        if json {
            println!("{}", serde_json::to_string_pretty(&restaurant)?);
        } else {
            output::print_restaurant_detail(&restaurant);
        }
        Ok(())
    }

    async fn toggle_favorite(&mut self, id: i64) -> Result<()> {
        let mut restaurant = self.engine.get_by_id(id).await?;
        let pending = self
            .engine
            .set_favorite(&mut restaurant, FavoriteChange::Toggle)
            .await?;
        println!(
            "{} {} favorites",
            if pending.local() { "Added" } else { "Removed" },
            restaurant.name
        );

        match pending.confirmed().await {
            Some(Ok(confirmed)) if confirmed != restaurant.is_favorite.is_set() => {
                println!("Server kept favorite = {}", confirmed);
            }
            Some(Ok(_)) => println!("Server updated."),
            Some(Err(e)) => {
                warn!(id, error = %e, "Favorite not confirmed by server");
                println!("Saved locally; the server could not be updated: {}", e);
            }
            None => println!("Saved locally; the server update was interrupted."),
        }
        Ok(())
    }

    async fn review(&mut self, id: i64, name: &str, rating: &str, comments: &str) -> Result<()> {
        let draft = ReviewDraft::parse(name, rating, comments)?;
        let mut restaurant = self.engine.get_by_id(id).await?;
        let added = self.engine.add_review(&mut restaurant, draft).await?;
        self.config.last_restaurant_id = Some(id);

        println!("{}", added.message());
        output::print_review(added.review());
        Ok(())
    }

    async fn sync(&mut self) -> Result<()> {
        self.engine.connectivity().set_online(true);
        let reports = self.engine.reconcile_pending().await?;
        output::print_reconcile(&reports);
        Ok(())
    }
}
