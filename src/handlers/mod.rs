//! Storefront views.
//!
//! Handlers return JSON bodies where the storefront would render a page, and `302 Found`
//! redirects where it would redirect. Every redirect target is reversed from the route
//! table by view name.

use axum::response::Response;

use crate::{AppState, error::AppError, gate::found};

pub mod account;
pub mod artisan;
pub mod cart;
pub mod orders;
pub mod shop;

/// Path of the view `name`.
pub(crate) fn url_for(state: &AppState, name: &str, args: &[&str]) -> Result<String, AppError> {
    state
        .routes
        .reverse(name, args)
        .ok_or_else(|| AppError::internal(format!("no route named {name:?}")))
}

/// `302 Found` to the parameterless view `name`.
pub(crate) fn redirect_to(state: &AppState, name: &str) -> Result<Response, AppError> {
    Ok(found(&url_for(state, name, &[])?))
}
