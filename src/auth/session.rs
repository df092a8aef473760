use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AuthUser, SessionAuth};
use crate::{
    config::{AppConfig, Env},
    error::AppError,
    repository::RepositoryState,
};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionid";

/// Claims
///
/// Payload of a session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The user's id.
    pub sub: Uuid,
    /// Expiry, seconds since the epoch.
    pub exp: usize,
    /// Issue time, seconds since the epoch.
    pub iat: usize,
}

/// Pulls the token from `Authorization: Bearer ...`, falling back to the session cookie.
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token);
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
        })
        .filter(|token| !token.is_empty())
}

/// JwtSessionAuth
///
/// Stateless sessions: the cookie carries an HS256-signed token whose `sub` is the user id.
/// A token only authenticates while its user still exists in the repository, so deleting an
/// account ends its sessions.
///
/// In `Env::Local` an `x-user-id` header naming an existing user also authenticates, which
/// lets developers call protected views without logging in.
pub struct JwtSessionAuth {
    repo: RepositoryState,
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
    env: Env,
}

impl JwtSessionAuth {
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        let secret = config.session_secret.as_bytes();
        Self {
            repo,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_hours: config.session_ttl_hours,
            env: config.env.clone(),
        }
    }

    pub fn issue_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let expires = Duration::try_hours(self.ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::internal(format!("session ttl of {}h is out of range", self.ttl_hours))
            })?;
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };
        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::internal(format!("failed to sign session token: {e}")))
    }

    fn decode_token(&self, token: &str) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "rejected session token");
                None
            }
        }
    }

    /// Looks the user up so deleted accounts stop authenticating.
    async fn resolve_user(&self, id: Uuid) -> Option<AuthUser> {
        let user = match self.repo.get_user(id).await {
            Ok(user) => user?,
            Err(e) => {
                tracing::error!(user_id = %id, error = %e, "session user lookup failed");
                return None;
            }
        };

        let role = match self.repo.get_role(user.id).await {
            Ok(role) => role.unwrap_or_default(),
            Err(e) => {
                tracing::error!(user_id = %id, error = %e, "session role lookup failed");
                return None;
            }
        };

        Some(AuthUser { id: user.id, role })
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let secure = if self.env == Env::Production {
            "; Secure"
        } else {
            ""
        };
        format!("{SESSION_COOKIE}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={max_age}{secure}")
    }
}

#[async_trait]
impl SessionAuth for JwtSessionAuth {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<AuthUser> {
        if self.env == Env::Local {
            if let Some(user_id) = headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok())
            {
                if let Some(user) = self.resolve_user(user_id).await {
                    return Some(user);
                }
            }
        }

        let claims = self.decode_token(token_from_headers(headers)?)?;
        self.resolve_user(claims.sub).await
    }

    fn start_session(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = self.issue_token(user_id)?;
        Ok(self.cookie(&token, self.ttl_hours.saturating_mul(3600)))
    }

    fn end_session(&self) -> String {
        self.cookie("", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};
    use crate::repository::{InMemoryRepository, Repository};
    use axum::http::HeaderValue;
    use std::sync::Arc;

    async fn setup(role: Role) -> (JwtSessionAuth, Arc<InMemoryRepository>, Uuid) {
        let repo = Arc::new(InMemoryRepository::new());
        let user = repo
            .create_user(
                NewUser {
                    username: "mw".to_string(),
                    email: "mw@example.com".to_string(),
                    first_name: "M".to_string(),
                    last_name: "W".to_string(),
                    password_hash: "unused".to_string(),
                },
                role,
            )
            .await
            .unwrap();
        let auth = JwtSessionAuth::new(repo.clone(), &AppConfig::default());
        (auth, repo, user.id)
    }

    fn headers(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn missing_credentials_are_anonymous() {
        let (auth, _, _) = setup(Role::Buyer).await;
        assert!(!auth.is_authenticated(&HeaderMap::new()).await);
    }

    #[tokio::test]
    async fn session_cookie_authenticates() {
        let (auth, _, user_id) = setup(Role::Artisan).await;
        let token = auth.issue_token(user_id).unwrap();
        let cookie = format!("theme=dark; {SESSION_COOKIE}={token}");

        let user = auth
            .authenticate(&headers(header::COOKIE, &cookie))
            .await
            .expect("authenticated");
        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::Artisan);
    }

    #[tokio::test]
    async fn bearer_token_authenticates() {
        let (auth, _, user_id) = setup(Role::Buyer).await;
        let token = auth.issue_token(user_id).unwrap();
        let headers = headers(header::AUTHORIZATION, &format!("Bearer {token}"));
        assert!(auth.is_authenticated(&headers).await);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let (auth, _, user_id) = setup(Role::Buyer).await;
        let token = auth.issue_token(user_id).unwrap();
        let cookie = format!("{SESSION_COOKIE}={token}x");
        assert!(!auth.is_authenticated(&headers(header::COOKIE, &cookie)).await);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let (auth, repo, user_id) = setup(Role::Buyer).await;
        let other = JwtSessionAuth::new(
            repo,
            &AppConfig {
                session_secret: "another-secret".to_string(),
                ..AppConfig::default()
            },
        );
        let token = other.issue_token(user_id).unwrap();
        let cookie = format!("{SESSION_COOKIE}={token}");
        assert!(!auth.is_authenticated(&headers(header::COOKIE, &cookie)).await);
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_rejected() {
        let (auth, _, _) = setup(Role::Buyer).await;
        let token = auth.issue_token(Uuid::new_v4()).unwrap();
        let cookie = format!("{SESSION_COOKIE}={token}");
        assert!(!auth.is_authenticated(&headers(header::COOKIE, &cookie)).await);
    }

    #[tokio::test]
    async fn local_user_id_header_bypass() {
        let (auth, _, user_id) = setup(Role::Buyer).await;
        let headers = headers(
            header::HeaderName::from_static("x-user-id"),
            &user_id.to_string(),
        );
        assert!(auth.is_authenticated(&headers).await);
    }

    #[tokio::test]
    async fn user_id_header_ignored_in_production() {
        let (_, repo, user_id) = setup(Role::Buyer).await;
        let auth = JwtSessionAuth::new(
            repo,
            &AppConfig {
                env: Env::Production,
                ..AppConfig::default()
            },
        );
        let headers = headers(
            header::HeaderName::from_static("x-user-id"),
            &user_id.to_string(),
        );
        assert!(!auth.is_authenticated(&headers).await);
    }

    #[test]
    fn end_session_expires_cookie() {
        let repo = Arc::new(InMemoryRepository::new());
        let auth = JwtSessionAuth::new(repo, &AppConfig::default());
        let cookie = auth.end_session();
        assert!(cookie.starts_with("sessionid=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn session_cookie_lives_for_the_configured_ttl() {
        let repo = Arc::new(InMemoryRepository::new());
        let auth = JwtSessionAuth::new(
            repo,
            &AppConfig {
                session_ttl_hours: 2,
                ..AppConfig::default()
            },
        );
        let cookie = auth.start_session(Uuid::new_v4()).unwrap();
        assert!(cookie.contains("Max-Age=7200"));
    }

    #[test]
    fn out_of_range_ttl_fails_instead_of_panicking() {
        for session_ttl_hours in [3_000_000_000, i64::MAX] {
            let repo = Arc::new(InMemoryRepository::new());
            let auth = JwtSessionAuth::new(
                repo,
                &AppConfig {
                    session_ttl_hours,
                    ..AppConfig::default()
                },
            );
            let result = auth.start_session(Uuid::new_v4());
            assert!(matches!(result, Err(AppError::Internal(_))));
        }
    }
}
