use std::{convert::Infallible, sync::Arc};

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, request::Parts},
};
use uuid::Uuid;

use crate::{error::AppError, models::Role};

mod password;
mod session;

pub use password::PasswordHasher;
pub use session::{Claims, JwtSessionAuth, SESSION_COOKIE};

/// AuthUser
///
/// The resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    /// `Role::Buyer` when the user has no profile.
    pub role: Role,
}

/// SessionAuth
///
/// Answers "who is calling?" for a request and manages the session cookie. The access gate
/// only needs `authenticate`; login and logout handlers use the cookie helpers.
///
/// Missing, malformed or expired credentials all mean "not authenticated"; no error
/// escapes `authenticate`.
#[async_trait]
pub trait SessionAuth: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Option<AuthUser>;

    async fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        self.authenticate(headers).await.is_some()
    }

    /// Issues a session for `user_id` and returns the `Set-Cookie` header value.
    fn start_session(&self, user_id: Uuid) -> Result<String, AppError>;

    /// The `Set-Cookie` header value that clears the session.
    fn end_session(&self) -> String;
}

/// SessionState
///
/// The shared handle stored in `AppState`.
pub type SessionState = Arc<dyn SessionAuth>;

/// AuthUser Extractor Implementation
///
/// Reuses the identity the access gate already resolved (stored in the request extensions)
/// and only authenticates again when the handler is reached without passing the gate, e.g.
/// in handler-level tests. Rejects with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let sessions = SessionState::from_ref(state);
        sessions
            .authenticate(&parts.headers)
            .await
            .ok_or(AppError::Unauthorized)
    }
}

/// `Option<AuthUser>` for views that also serve anonymous callers.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <AuthUser as FromRequestParts<S>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}
