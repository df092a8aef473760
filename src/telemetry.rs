use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Env;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "artisan_storefront=debug,tower_http=info,axum=trace";

/// init
///
/// Installs the process-wide tracing subscriber. Call once from `main` before anything logs;
/// nothing else in the crate configures logging.
///
/// `Env::Local` prints human-readable output, `Env::Production` emits one JSON object per
/// event for log aggregation.
pub fn init(env: &Env) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    match env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }
}
