use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{FromRef, Request},
    middleware,
};
use tower::ServiceBuilder;
use tower_http::{
    LatencyUnit, ServiceBuilderExt,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, RequestId},
    services::ServeDir,
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod telemetry;

use routes::{artisan, authenticated, public, table::RouteTable};

// --- Public Re-exports ---

pub use auth::{JwtSessionAuth, SessionState};
pub use config::AppConfig;
pub use gate::{AccessGate, GateConfig};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every storefront view, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::shop::home, handlers::shop::product_details,
        handlers::account::login_register, handlers::account::login_user,
        handlers::account::register_user, handlers::account::logout_user,
        handlers::cart::shopping_cart, handlers::cart::add_to_cart,
        handlers::cart::add_product_to_cart, handlers::cart::update_cart_quantity,
        handlers::cart::remove_from_cart, handlers::cart::checkout,
        handlers::orders::place_order, handlers::orders::invoice_page,
        handlers::orders::order_history, handlers::orders::buyer_profile,
        handlers::artisan::artisan_dashboard, handlers::artisan::create_listing,
        handlers::artisan::submit_listing, handlers::artisan::edit_listing,
        handlers::artisan::update_listing, handlers::artisan::fulfillment,
        handlers::artisan::inventory_manager, handlers::artisan::reports_page
    ),
    components(
        schemas(
            models::Role, models::Product, models::CartLine, models::Order, models::OrderLine,
            models::SoldItem, models::LoginForm, models::RegisterForm, models::AddToCartForm,
            models::ListingForm, models::LoginPage, models::CartView, models::AddToCartResponse,
            models::CheckoutView, models::InvoiceOrder, models::InvoiceView, models::ProfileView,
            models::DashboardView, models::ListingView, models::ReportRow,
        )
    ),
    tags(
        (name = "artisan-storefront", description = "Artisan storefront API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for the application's services and configuration.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub sessions: SessionState,
    /// The request authorization gate, consulted for every request.
    pub gate: AccessGate,
    /// Named routes, used for view-name resolution and redirects.
    pub routes: Arc<RouteTable>,
    pub config: AppConfig,
}

impl AppState {
    /// new
    ///
    /// Wires the JWT session layer and the access gate around `repo`. The gate resolves
    /// view names against the same route table handlers reverse redirects from.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let sessions = Arc::new(JwtSessionAuth::new(repo.clone(), &config)) as SessionState;
        let routes = Arc::new(RouteTable::storefront());
        let gate = AccessGate::new(Arc::new(config.gate.clone()), routes.clone());

        Self {
            repo,
            sessions,
            gate,
            routes,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the storefront: views, Swagger UI and the static/media file services, all behind
/// the access gate, wrapped in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    let media_files = ServeDir::new(&state.config.media_dir);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .nest("/artisan", artisan::artisan_routes())
        .nest_service("/static", static_files)
        .nest_service("/media", media_files)
        .with_state(state.clone())
        // Router-wide rather than a route_layer so unmatched paths are gated too.
        .layer(middleware::from_fn_with_state(state, gate::access_gate))
        .layer(
            ServiceBuilder::new()
                .set_x_request_id(MakeRequestUuid)
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(request_span)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(LatencyUnit::Millis),
                        ),
                )
                .propagate_x_request_id(),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// One span per request. Only the path is recorded; query strings such as `?orderId=` stay
/// out of the logs.
fn request_span(request: &Request<Body>) -> Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id,
    )
}
