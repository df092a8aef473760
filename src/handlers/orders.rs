use axum::{
    Json,
    extract::{Query, State},
    response::Response,
};
use uuid::Uuid;

use super::{redirect_to, url_for};
use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    gate::found,
    models::{
        CartLine, InvoiceOrder, InvoiceQuery, InvoiceView, NewOrder, Order, ProfileView,
    },
};

/// Sales tax applied when an order is placed.
pub const TAX_RATE: f64 = 0.08;

/// Shown on invoices for orders placed without a shipping address.
const DEFAULT_SHIPPING_ADDRESS: &str = "Default Address";

/// `WW-` followed by eight uppercase hex digits.
fn new_order_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("WW-{}", hex[..8].to_uppercase())
}

/// place_order
///
/// [Authenticated Route] Turns the cart into an order and sends the buyer to its invoice.
/// An empty cart goes back to the cart page instead.
#[utoipa::path(
    post,
    path = "/order/place/",
    responses((status = 302, description = "Redirect to invoice, or to the cart when empty"))
)]
pub async fn place_order(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let lines = state.repo.cart_lines(user.id).await?;
    if lines.is_empty() {
        return redirect_to(&state, "shopping_cart");
    }

    let buyer = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let subtotal: f64 = lines.iter().map(CartLine::line_total).sum();
    let tax = subtotal * TAX_RATE;

    let order = state
        .repo
        .place_order(
            user.id,
            NewOrder {
                order_id: new_order_id(),
                subtotal,
                tax,
                total: subtotal + tax,
                shipping_address: String::new(),
                user_name: buyer.full_name(),
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, order_id = %order.order_id, total = order.total, "order placed");

    let invoice = url_for(&state, "invoice_page", &[])?;
    Ok(found(&format!("{invoice}?orderId={}", order.order_id)))
}

/// invoice_page
///
/// [Authenticated Route] The invoice for one of the caller's orders. Without `orderId` the
/// invoice is empty; an id the caller does not own is a 404.
#[utoipa::path(
    get,
    path = "/invoice/",
    params(InvoiceQuery),
    responses(
        (status = 200, description = "Invoice", body = InvoiceView),
        (status = 404, description = "Invalid order ID")
    )
)]
pub async fn invoice_page(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<InvoiceQuery>,
) -> Result<Json<InvoiceView>, AppError> {
    let Some(order_id) = query.order_id.filter(|id| !id.is_empty()) else {
        return Ok(Json(InvoiceView::default()));
    };

    let order = state
        .repo
        .find_order(&order_id, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Invalid order ID"))?;
    let items = state.repo.order_lines(order.id).await?;

    let shipping_address = if order.shipping_address.is_empty() {
        DEFAULT_SHIPPING_ADDRESS.to_string()
    } else {
        order.shipping_address
    };

    Ok(Json(InvoiceView {
        order: Some(InvoiceOrder {
            order_id: order.order_id,
            created_at: order.created_at.format("%Y-%m-%d").to_string(),
            user_name: order.user_name,
            shipping_address,
            subtotal: order.subtotal,
            tax: order.tax,
            total: order.total,
        }),
        items,
    }))
}

/// order_history
///
/// [Authenticated Route] The caller's orders, newest first.
#[utoipa::path(
    get,
    path = "/orders/",
    responses((status = 200, description = "Orders", body = [Order]))
)]
pub async fn order_history(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, AppError> {
    Ok(Json(state.repo.user_orders(user.id).await?))
}

/// buyer_profile
///
/// [Authenticated Route]
#[utoipa::path(
    get,
    path = "/profile/",
    responses((status = 200, description = "Profile", body = ProfileView))
)]
pub async fn buyer_profile(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileView>, AppError> {
    let account = state
        .repo
        .get_user(user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(ProfileView {
        id: account.id,
        username: account.username,
        email: account.email,
        first_name: account.first_name,
        last_name: account.last_name,
        role: user.role,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_ids_are_prefixed_uppercase_hex() {
        let id = new_order_id();
        assert_eq!(id.len(), 11);
        assert!(id.starts_with("WW-"));
        assert!(
            id[3..]
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
        );
    }
}
