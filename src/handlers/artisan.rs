//! The artisan portal. Every view here sends buyers back to `home`.

use std::collections::{BTreeMap, HashSet};

use axum::{
    Form, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::redirect_to;
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{
        DashboardView, LOW_STOCK_THRESHOLD, ListingForm, ListingView, Order, Product, ReportRow,
        Role, SoldItem,
    },
};

/// Listings shown under "recent" on the dashboard.
const RECENT_LISTINGS: usize = 5;

/// `Some(redirect)` when the caller is not an artisan.
fn buyer_redirect(state: &AppState, user: &AuthUser) -> Result<Option<Response>, AppError> {
    if user.role == Role::Artisan {
        return Ok(None);
    }
    tracing::debug!(user_id = %user.id, "non-artisan sent home from artisan portal");
    redirect_to(state, "home").map(Some)
}

fn validate_listing(listing: &ListingForm) -> Result<(), AppError> {
    if listing.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }
    if !listing.price.is_finite() || listing.price < 0.0 {
        return Err(AppError::Validation(
            "price must be a non-negative number".to_string(),
        ));
    }
    if listing.stock.is_some_and(|stock| stock < 0) {
        return Err(AppError::Validation(
            "stock must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn build_dashboard(
    products: Vec<Product>,
    sold_items: Vec<SoldItem>,
    pending_orders: Vec<Order>,
) -> DashboardView {
    let total_sales = sold_items
        .iter()
        .map(|item| item.price * f64::from(item.quantity))
        .sum();
    let total_orders = sold_items
        .iter()
        .map(|item| item.order_pk)
        .collect::<HashSet<_>>()
        .len() as i64;

    let low_stock_products = products
        .iter()
        .filter(|product| product.stock < LOW_STOCK_THRESHOLD)
        .cloned()
        .collect();

    let mut recent_listings = products.clone();
    recent_listings.sort_by(|a, b| b.id.cmp(&a.id));
    recent_listings.truncate(RECENT_LISTINGS);

    DashboardView {
        products,
        sold_items,
        total_sales,
        total_orders,
        low_stock_products,
        pending_orders,
        recent_listings,
    }
}

/// Units and revenue per product; products without sales report zeros.
fn build_report(products: &[Product], sold_items: &[SoldItem]) -> Vec<ReportRow> {
    let mut rows: BTreeMap<i64, ReportRow> = products
        .iter()
        .map(|product| {
            (
                product.id,
                ReportRow {
                    product_id: product.id,
                    name: product.name.clone(),
                    units_sold: 0,
                    revenue: 0.0,
                },
            )
        })
        .collect();

    for item in sold_items {
        let row = rows.entry(item.product_id).or_insert_with(|| ReportRow {
            product_id: item.product_id,
            name: item.product_name.clone(),
            units_sold: 0,
            revenue: 0.0,
        });
        row.units_sold += i64::from(item.quantity);
        row.revenue += item.price * f64::from(item.quantity);
    }

    rows.into_values().collect()
}

/// artisan_dashboard
///
/// [Artisan Route] Sales totals, low-stock warnings, orders to fulfil and the newest
/// listings for the calling seller.
#[utoipa::path(
    get,
    path = "/artisan/dashboard/",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 302, description = "Not an artisan, redirect to home")
    )
)]
pub async fn artisan_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }

    let products = state.repo.seller_products(user.id).await?;
    let sold_items = state.repo.sold_items(user.id).await?;
    let pending_orders = state.repo.seller_orders(user.id).await?;

    Ok(Json(build_dashboard(products, sold_items, pending_orders)).into_response())
}

/// create_listing
///
/// [Artisan Route] A blank listing form.
#[utoipa::path(
    get,
    path = "/artisan/listing/",
    responses((status = 200, description = "Blank listing", body = ListingView))
)]
pub async fn create_listing(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }
    Ok(Json(ListingView::default()).into_response())
}

/// submit_listing
///
/// [Artisan Route] Creates a listing owned by the caller. Stock defaults to 10.
#[utoipa::path(
    post,
    path = "/artisan/listing/",
    request_body(content = ListingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Created", body = Product),
        (status = 400, description = "Invalid listing")
    )
)]
pub async fn submit_listing(
    user: AuthUser,
    State(state): State<AppState>,
    Form(listing): Form<ListingForm>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }
    validate_listing(&listing)?;

    let product = state.repo.create_product(user.id, listing).await?;
    tracing::info!(seller_id = %user.id, product_id = product.id, "listing created");
    Ok((StatusCode::CREATED, Json(product)).into_response())
}

/// edit_listing
///
/// [Artisan Route] One of the caller's listings. Another seller's product is a 404.
#[utoipa::path(
    get,
    path = "/artisan/listing/{product_id}/",
    params(("product_id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Listing", body = ListingView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn edit_listing(
    user: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }

    let product = state
        .repo
        .get_product(product_id)
        .await?
        .filter(|product| product.seller_id == user.id)
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ListingView {
        product: Some(product),
    })
    .into_response())
}

/// update_listing
///
/// [Artisan Route] Updates name, price and stock of one of the caller's listings.
#[utoipa::path(
    post,
    path = "/artisan/listing/{product_id}/",
    params(("product_id" = i64, Path, description = "Product id")),
    request_body(content = ListingForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Updated", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_listing(
    user: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Form(listing): Form<ListingForm>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }
    validate_listing(&listing)?;

    let product = state
        .repo
        .update_product(product_id, user.id, listing)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found"))?;

    tracing::info!(seller_id = %user.id, product_id, "listing updated");
    Ok(Json(product).into_response())
}

/// fulfillment
///
/// [Artisan Route] Orders containing at least one of the caller's products.
#[utoipa::path(
    get,
    path = "/artisan/fulfillment/",
    responses((status = 200, description = "Orders to fulfil", body = [Order]))
)]
pub async fn fulfillment(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }
    Ok(Json(state.repo.seller_orders(user.id).await?).into_response())
}

/// inventory_manager
///
/// [Artisan Route]
#[utoipa::path(
    get,
    path = "/artisan/inventory/",
    responses((status = 200, description = "Seller's products", body = [Product]))
)]
pub async fn inventory_manager(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }
    Ok(Json(state.repo.seller_products(user.id).await?).into_response())
}

/// reports_page
///
/// [Artisan Route] Units sold and revenue for each of the caller's products.
#[utoipa::path(
    get,
    path = "/artisan/reports/",
    responses((status = 200, description = "Sales report", body = [ReportRow]))
)]
pub async fn reports_page(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if let Some(redirect) = buyer_redirect(&state, &user)? {
        return Ok(redirect);
    }

    let products = state.repo.seller_products(user.id).await?;
    let sold_items = state.repo.sold_items(user.id).await?;
    Ok(Json(build_report(&products, &sold_items)).into_response())
}
