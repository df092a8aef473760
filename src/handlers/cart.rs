use axum::{
    Form, Json,
    extract::{Path, State},
    response::Response,
};

use super::redirect_to;
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{
        AddToCartForm, AddToCartResponse, CartLine, CartView, CheckoutView, MAX_CART_QUANTITY,
    },
};

fn total(lines: &[CartLine]) -> f64 {
    lines.iter().map(CartLine::line_total).sum()
}

/// shopping_cart
///
/// [Authenticated Route] The caller's cart. Anonymous callers (only possible when the gate
/// is configured to let `/cart/` through) see an empty cart.
#[utoipa::path(
    get,
    path = "/cart/",
    responses((status = 200, description = "Cart contents", body = CartView))
)]
pub async fn shopping_cart(
    user: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<CartView>, AppError> {
    let Some(user) = user else {
        return Ok(Json(CartView::default()));
    };

    let items = state.repo.cart_lines(user.id).await?;
    let total = total(&items);
    Ok(Json(CartView { items, total }))
}

async fn add_item(
    state: &AppState,
    user: &AuthUser,
    product_id: i64,
    quantity: i32,
) -> Result<Json<AddToCartResponse>, AppError> {
    if !(1..=MAX_CART_QUANTITY).contains(&quantity) {
        return Err(AppError::Validation(format!(
            "quantity must be between 1 and {MAX_CART_QUANTITY}"
        )));
    }

    if state.repo.get_product(product_id).await?.is_none() {
        return Err(AppError::not_found("Product not found"));
    }

    let in_cart = state
        .repo
        .cart_lines(user.id)
        .await?
        .iter()
        .find(|line| line.product_id == product_id)
        .map_or(0, |line| line.quantity);
    if in_cart.saturating_add(quantity) > MAX_CART_QUANTITY {
        return Err(AppError::Validation(format!(
            "a cart line holds at most {MAX_CART_QUANTITY}"
        )));
    }

    state.repo.add_to_cart(user.id, product_id, quantity).await?;
    let cart_count = state.repo.cart_count(user.id).await?;
    tracing::debug!(user_id = %user.id, product_id, quantity, cart_count, "added to cart");

    Ok(Json(AddToCartResponse {
        success: true,
        cart_count,
    }))
}

/// add_to_cart
///
/// [Authenticated Route] Adds `quantity` of the form's `product_id` to the cart, merging
/// into an existing line.
#[utoipa::path(
    post,
    path = "/cart/add/",
    request_body(content = AddToCartForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Added", body = AddToCartResponse),
        (status = 400, description = "Missing product_id or bad quantity"),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn add_to_cart(
    user: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<AddToCartResponse>, AppError> {
    let product_id = form
        .product_id
        .ok_or_else(|| AppError::Validation("product_id is required".to_string()))?;
    add_item(&state, &user, product_id, form.quantity).await
}

/// add_product_to_cart
///
/// [Authenticated Route] Same as `add_to_cart` with the product taken from the path.
#[utoipa::path(
    post,
    path = "/cart/add/{product_id}/",
    params(("product_id" = i64, Path, description = "Product id")),
    request_body(content = AddToCartForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Added", body = AddToCartResponse),
        (status = 404, description = "Unknown product")
    )
)]
pub async fn add_product_to_cart(
    user: AuthUser,
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<AddToCartResponse>, AppError> {
    add_item(&state, &user, product_id, form.quantity).await
}

/// update_cart_quantity
///
/// [Authenticated Route] `increase` adds one up to `MAX_CART_QUANTITY`; `decrease` removes
/// one but never drops the line below a quantity of 1. Any other action leaves the line
/// unchanged.
#[utoipa::path(
    get,
    path = "/cart/update/{item_id}/{action}/",
    params(
        ("item_id" = i64, Path, description = "Cart item id"),
        ("action" = String, Path, description = "increase or decrease")
    ),
    responses(
        (status = 302, description = "Redirect to cart"),
        (status = 404, description = "Not the caller's item")
    )
)]
pub async fn update_cart_quantity(
    user: AuthUser,
    State(state): State<AppState>,
    Path((item_id, action)): Path<(i64, String)>,
) -> Result<Response, AppError> {
    let item = state
        .repo
        .get_cart_item(item_id, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart item not found"))?;

    let quantity = match action.as_str() {
        "increase" if item.quantity < MAX_CART_QUANTITY => Some(item.quantity + 1),
        "decrease" if item.quantity > 1 => Some(item.quantity - 1),
        _ => None,
    };

    if let Some(quantity) = quantity {
        state
            .repo
            .set_cart_quantity(item.id, user.id, quantity)
            .await?;
    }

    redirect_to(&state, "shopping_cart")
}

/// remove_from_cart
///
/// [Authenticated Route]
#[utoipa::path(
    get,
    path = "/cart/remove/{item_id}/",
    params(("item_id" = i64, Path, description = "Cart item id")),
    responses(
        (status = 302, description = "Redirect to cart"),
        (status = 404, description = "Not the caller's item")
    )
)]
pub async fn remove_from_cart(
    user: AuthUser,
    State(state): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.repo.remove_cart_item(item_id, user.id).await? {
        return Err(AppError::not_found("Cart item not found"));
    }
    redirect_to(&state, "shopping_cart")
}

/// checkout
///
/// [Authenticated Route] The order summary before placing it. Tax is added when the order
/// is placed, so `total` equals `subtotal` here.
#[utoipa::path(
    get,
    path = "/checkout/",
    responses((status = 200, description = "Checkout summary", body = CheckoutView))
)]
pub async fn checkout(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CheckoutView>, AppError> {
    let items = state.repo.cart_lines(user.id).await?;
    let subtotal = total(&items);
    Ok(Json(CheckoutView {
        items,
        subtotal,
        total: subtotal,
    }))
}
