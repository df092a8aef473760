use std::{collections::HashSet, env};

use crate::error::ConfigError;
use crate::gate::GateConfig;

/// Fallback signing secret for local development only.
const LOCAL_SESSION_SECRET: &str = "storefront-local-session-secret";

/// Two weeks.
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;

/// One year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// AppConfig
///
/// Holds the application's entire configuration. Loaded once at startup and immutable
/// afterwards; shared with handlers through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and the local auth bypass.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // HS256 key used to sign session tokens.
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub bind_addr: String,
    // Directories served under /static and /media.
    pub static_dir: String,
    pub media_dir: String,
    // Public path configuration for the access gate.
    pub gate: GateConfig,
}

/// Env
///
/// The runtime context: `Local` enables developer conveniences, `Production` demands every
/// secret explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe values for test setup, no environment access.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            session_secret: LOCAL_SESSION_SECRET.to_string(),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            bind_addr: "127.0.0.1:8000".to_string(),
            static_dir: "static".to_string(),
            media_dir: "media".to_string(),
            gate: GateConfig::default(),
        }
    }
}

/// Splits a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (after `.env` has been applied by
    /// the caller).
    ///
    /// # Errors
    /// `ConfigError::Missing` if `DATABASE_URL` or `SESSION_SECRET` is unset in production,
    /// `ConfigError::Invalid` for a malformed `APP_ENV` or `SESSION_TTL_HOURS`.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match optional_var("APP_ENV").as_deref() {
            None | Some("local") => Env::Local,
            Some("production") => Env::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "APP_ENV",
                    value: other.to_string(),
                });
            }
        };

        let db_url = optional_var("DATABASE_URL");
        let session_secret = optional_var("SESSION_SECRET");

        let (db_url, session_secret) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                session_secret.ok_or(ConfigError::Missing("SESSION_SECRET"))?,
            ),
            Env::Local => (
                db_url,
                session_secret.unwrap_or_else(|| LOCAL_SESSION_SECRET.to_string()),
            ),
        };

        let session_ttl_hours = match optional_var("SESSION_TTL_HOURS") {
            Some(raw) => match raw.parse::<i64>() {
                Ok(hours) if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) => hours,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "SESSION_TTL_HOURS",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        let defaults = Self::default();

        Ok(Self {
            env,
            db_url,
            session_secret,
            session_ttl_hours,
            bind_addr: optional_var("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            static_dir: optional_var("STATIC_DIR").unwrap_or(defaults.static_dir),
            media_dir: optional_var("MEDIA_DIR").unwrap_or(defaults.media_dir),
            gate: load_gate_config(),
        })
    }
}

/// Public path sets, each replaced wholesale by its variable when set.
fn load_gate_config() -> GateConfig {
    let mut gate = GateConfig::default();
    if let Some(raw) = optional_var("GATE_PUBLIC_PATHS") {
        gate.exact_paths = split_list(&raw).collect::<HashSet<_>>();
    }
    if let Some(raw) = optional_var("GATE_PUBLIC_PREFIXES") {
        gate.prefixes = split_list(&raw).collect();
    }
    if let Some(raw) = optional_var("GATE_PUBLIC_VIEWS") {
        gate.view_names = split_list(&raw).collect::<HashSet<_>>();
    }
    gate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_list_trims_and_drops_blanks() {
        let items: Vec<String> = split_list(" /a/ ,, /b/,").collect();
        assert_eq!(items, vec!["/a/".to_string(), "/b/".to_string()]);
    }

    #[test]
    fn default_config_uses_storefront_gate() {
        let config = AppConfig::default();
        assert_eq!(config.env, Env::Local);
        assert!(config.db_url.is_none());
        assert_eq!(config.gate, GateConfig::default());
    }
}
