//! Terminal rendering for command results.

use dinecache_core::models::{ImageSize, Restaurant, Review};
use dinecache_core::utils::{rating_stars, truncate_string};
use dinecache_core::{CatalogStatus, Filter, ReconcileReport};

/// Column widths for the restaurant table
const NAME_WIDTH: usize = 28;
const NEIGHBORHOOD_WIDTH: usize = 16;
const CUISINE_WIDTH: usize = 12;

pub fn print_filters(cuisine: &Filter, neighborhood: &Filter, favorites_only: bool) {
    println!(
        "Cuisine: {}  Neighborhood: {}{}",
        cuisine.as_str(),
        neighborhood.as_str(),
        if favorites_only { "  (favorites only)" } else { "" }
    );
}

pub fn print_restaurant_table(restaurants: &[Restaurant]) {
    if restaurants.is_empty() {
        println!("No restaurants match.");
        return;
    }

    println!(
        "{:>4}  {:<name$}  {:<hood$}  {:<cuisine$}  {}",
        "ID",
        "Name",
        "Neighborhood",
        "Cuisine",
        "Fav",
        name = NAME_WIDTH,
        hood = NEIGHBORHOOD_WIDTH,
        cuisine = CUISINE_WIDTH,
    );
    for r in restaurants {
        println!(
            "{:>4}  {:<name$}  {:<hood$}  {:<cuisine$}  {}",
            r.id,
            truncate_string(&r.name, NAME_WIDTH),
            truncate_string(&r.neighborhood, NEIGHBORHOOD_WIDTH),
            truncate_string(&r.cuisine_type, CUISINE_WIDTH),
            if r.is_favorite.is_set() { "★" } else { "" },
            name = NAME_WIDTH,
            hood = NEIGHBORHOOD_WIDTH,
            cuisine = CUISINE_WIDTH,
        );
    }
    println!("\n{} restaurant(s)", restaurants.len());
}

pub fn print_facet(title: &str, values: &[String]) {
    println!("{}:", title);
    for value in values {
        println!("  {}", value);
    }
}

pub fn print_restaurant_detail(r: &Restaurant) {
    println!("{}{}", r.name, if r.is_favorite.is_set() { "  ★ favorite" } else { "" });
    println!("  {} · {}", r.cuisine_type, r.neighborhood);
    println!("  {}", r.address);
    println!("  Page:  {}", r.page_url());
    println!("  Image: {}", r.image_url(ImageSize::Large));

    if let Some(ref hours) = r.operating_hours {
        println!("\nHours:");
        for (day, times) in hours {
            println!("  {:<10} {}", day, times);
        }
    }

    match r.reviews.as_deref() {
        Some(reviews) if !reviews.is_empty() => {
            let average = r
                .average_rating()
                .map(|avg| format!(" (average {:.1})", avg))
                .unwrap_or_default();
            let partial = if r.reviews_partial {
                ", server reviews not loaded yet"
            } else {
                ""
            };
            println!("\nReviews{}{}:", average, partial);
            for review in reviews {
                println!();
                print_review(review);
            }
        }
        Some(_) => println!("\nNo reviews yet."),
        None => println!("\nReviews unavailable."),
    }
}

pub fn print_review(review: &Review) {
    let date = review
        .formatted_date()
        .unwrap_or_else(|| "not yet sent".to_string());
    println!("  {} {}  {}", rating_stars(review.rating), review.name, date);
    println!("  {}", review.comments);
}

pub fn print_reconcile(reports: &[ReconcileReport]) {
    if reports.is_empty() {
        println!("Nothing to sync.");
        return;
    }
    for report in reports {
        println!(
            "Restaurant {}: {} sent, {} still queued",
            report.restaurant_id, report.synced, report.failed
        );
    }
}

pub fn print_status(status: &CatalogStatus, online: bool) {
    println!("Mode:            {}", if online { "online" } else { "offline" });
    println!(
        "Cached:          {}/{}{}",
        status.cached,
        status.catalog_size,
        if status.is_complete() { " (complete)" } else { "" }
    );
    println!("Last fetched:    {}", status.age_display());
    println!("Pending reviews: {}", status.pending_reviews);
}
