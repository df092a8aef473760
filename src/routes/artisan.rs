use crate::{AppState, handlers::artisan};
use axum::{Router, routing::get};

/// Artisan Router Module
///
/// Seller tooling, nested under `/artisan`. Each handler checks the caller's role and
/// redirects buyers to `home`.
pub fn artisan_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/", get(artisan::artisan_dashboard))
        // GET a blank form, POST a new listing.
        .route(
            "/listing/",
            get(artisan::create_listing).post(artisan::submit_listing),
        )
        .route(
            "/listing/{product_id}/",
            get(artisan::edit_listing).post(artisan::update_listing),
        )
        .route("/fulfillment/", get(artisan::fulfillment))
        .route("/inventory/", get(artisan::inventory_manager))
        .route("/reports/", get(artisan::reports_page))
}
