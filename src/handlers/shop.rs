use axum::{
    Json,
    extract::{Path, State},
};

use crate::{AppState, error::AppError, models::Product};

/// home
///
/// [Public Route] The product catalogue.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "All products", body = [Product]))
)]
pub async fn home(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.repo.list_products().await?))
}

/// product_details
///
/// [Authenticated Route]
#[utoipa::path(
    get,
    path = "/product/{product_id}/",
    params(("product_id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn product_details(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> Result<Json<Product>, AppError> {
    state
        .repo
        .get_product(product_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Product not found"))
}
