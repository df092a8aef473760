use crate::{AppState, handlers::account, handlers::shop};
use axum::{Router, routing::get};

/// Public Router Module
///
/// The catalogue and the login/registration flow. These paths are in the gate's default
/// public set, so anonymous callers reach them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // The product catalogue.
        .route("/", get(shop::home))
        // GET /login/?error=...
        // The combined login and registration page.
        .route("/login/", get(account::login_register))
        // POST /login/submit/
        // Form login. A plain GET bounces back to the login page.
        .route(
            "/login/submit/",
            get(account::show_login).post(account::login_user),
        )
        // POST /register/submit/
        .route(
            "/register/submit/",
            get(account::show_login).post(account::register_user),
        )
}
