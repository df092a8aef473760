use crate::{
    AppState,
    handlers::{account, cart, orders, shop},
};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Buyer-facing views. The gate only lets a request through here once a session resolved,
/// and handlers receive that identity through the `AuthUser` extractor.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        .route("/product/{product_id}/", get(shop::product_details))
        .route("/logout/", get(account::logout_user).post(account::logout_user))
        .route("/profile/", get(orders::buyer_profile))
        .route("/orders/", get(orders::order_history))
        // --- Cart ---
        .route("/cart/", get(cart::shopping_cart))
        // POST /cart/add/ takes the product from the form, the second form from the path.
        .route("/cart/add/", post(cart::add_to_cart))
        .route(
            "/cart/add/{product_id}/",
            post(cart::add_product_to_cart),
        )
        .route(
            "/cart/update/{item_id}/{action}/",
            get(cart::update_cart_quantity),
        )
        .route("/cart/remove/{item_id}/", get(cart::remove_from_cart))
        // --- Checkout ---
        .route("/checkout/", get(cart::checkout))
        .route(
            "/order/place/",
            get(orders::place_order).post(orders::place_order),
        )
        // GET /invoice/?orderId=WW-...
        .route("/invoice/", get(orders::invoice_page))
}
