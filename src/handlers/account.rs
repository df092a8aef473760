use axum::{
    Form, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use super::{redirect_to, url_for};
use crate::{
    AppState,
    auth::PasswordHasher,
    error::{AppError, RepoError},
    gate::found,
    models::{LoginForm, LoginPage, LoginPageQuery, NewUser, RegisterForm, Role},
};

/// AccountError
///
/// Why a login or registration attempt was sent back to the login page. The code travels in
/// `?error=` and the page shows the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountError {
    UnknownEmail,
    IncorrectPassword,
    PasswordMismatch,
    EmailTaken,
    MissingRole,
}

impl AccountError {
    pub fn code(self) -> &'static str {
        match self {
            AccountError::UnknownEmail => "unknown_email",
            AccountError::IncorrectPassword => "incorrect_password",
            AccountError::PasswordMismatch => "password_mismatch",
            AccountError::EmailTaken => "email_taken",
            AccountError::MissingRole => "missing_role",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AccountError::UnknownEmail => "No account found with this email.",
            AccountError::IncorrectPassword => "Incorrect password.",
            AccountError::PasswordMismatch => "Passwords do not match.",
            AccountError::EmailTaken => "Email is already registered.",
            AccountError::MissingRole => "Please select a valid role.",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        [
            AccountError::UnknownEmail,
            AccountError::IncorrectPassword,
            AccountError::PasswordMismatch,
            AccountError::EmailTaken,
            AccountError::MissingRole,
        ]
        .into_iter()
        .find(|error| error.code() == code)
    }
}

fn back_to_login(state: &AppState, error: AccountError) -> Result<Response, AppError> {
    let login = url_for(state, "login_register", &[])?;
    Ok(found(&format!("{login}?error={}", error.code())))
}

/// Lands the user in their portal with a fresh session cookie.
async fn sign_in(state: &AppState, user_id: Uuid) -> Result<Response, AppError> {
    let cookie = state.sessions.start_session(user_id)?;
    let role = state.repo.get_role(user_id).await?.unwrap_or_default();
    let target = match role {
        Role::Artisan => url_for(state, "artisan_dashboard", &[])?,
        Role::Buyer => url_for(state, "home", &[])?,
    };

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, target), (header::SET_COOKIE, cookie)],
    )
        .into_response())
}

/// Splits "Jane Van Doe" into ("Jane", "Van Doe").
fn split_full_name(full_name: &str) -> (String, String) {
    let mut words = full_name.split_whitespace();
    let first = words.next().unwrap_or_default().to_string();
    let last = words.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// login_register
///
/// [Public Route] The combined login and registration page.
#[utoipa::path(
    get,
    path = "/login/",
    params(LoginPageQuery),
    responses((status = 200, description = "Login page", body = LoginPage))
)]
pub async fn login_register(
    State(state): State<AppState>,
    Query(query): Query<LoginPageQuery>,
) -> Result<Json<LoginPage>, AppError> {
    let error = query
        .error
        .as_deref()
        .and_then(AccountError::from_code)
        .map(|error| error.message().to_string());

    Ok(Json(LoginPage {
        login_action: url_for(&state, "login_user", &[])?,
        register_action: url_for(&state, "register_user", &[])?,
        roles: vec![Role::Buyer, Role::Artisan],
        error,
    }))
}

/// login_user
///
/// [Public Route] Checks the credentials and starts a session. Failures go back to the login
/// page with an error code; success lands artisans on their dashboard and buyers on home.
#[utoipa::path(
    post,
    path = "/login/submit/",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 302, description = "Redirect to portal or back to login"))
)]
pub async fn login_user(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let Some(user) = state.repo.find_user_by_email(form.email.trim()).await? else {
        return back_to_login(&state, AccountError::UnknownEmail);
    };

    let password = form.password;
    let hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || {
        PasswordHasher::new().verify_password(&password, &hash)
    })
    .await
    .map_err(|e| AppError::internal(format!("password check task failed: {e}")))??;

    if !valid {
        tracing::info!(user_id = %user.id, "login rejected");
        return back_to_login(&state, AccountError::IncorrectPassword);
    }

    tracing::info!(user_id = %user.id, "user logged in");
    sign_in(&state, user.id).await
}

/// Plain GETs on the form endpoints go back to the page.
pub async fn show_login(State(state): State<AppState>) -> Result<Response, AppError> {
    redirect_to(&state, "login_register")
}

/// register_user
///
/// [Public Route] Creates a buyer or artisan account and logs it in. Checks run in order:
/// matching passwords, unused email, known role.
#[utoipa::path(
    post,
    path = "/register/submit/",
    request_body(content = RegisterForm, content_type = "application/x-www-form-urlencoded"),
    responses((status = 302, description = "Redirect to portal or back to login"))
)]
pub async fn register_user(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    if form.password != form.confirm_password {
        return back_to_login(&state, AccountError::PasswordMismatch);
    }

    let email = form.email.trim().to_string();
    if state.repo.find_user_by_email(&email).await?.is_some() {
        return back_to_login(&state, AccountError::EmailTaken);
    }

    let Ok(role) = form.role.parse::<Role>() else {
        return back_to_login(&state, AccountError::MissingRole);
    };

    let password = form.password;
    let password_hash =
        tokio::task::spawn_blocking(move || PasswordHasher::new().hash_password(&password))
            .await
            .map_err(|e| AppError::internal(format!("password hashing task failed: {e}")))??;

    let (first_name, last_name) = split_full_name(&form.full_name);
    let username = email.split('@').next().unwrap_or_default().to_string();

    let new_user = NewUser {
        username,
        email,
        first_name,
        last_name,
        password_hash,
    };

    let user = match state.repo.create_user(new_user, role).await {
        Ok(user) => user,
        // Lost a race with another registration for the same email.
        Err(RepoError::Conflict(_)) => return back_to_login(&state, AccountError::EmailTaken),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, role = %role, "user registered");
    sign_in(&state, user.id).await
}

/// logout_user
///
/// [Authenticated Route] Clears the session cookie and returns to home.
#[utoipa::path(
    get,
    path = "/logout/",
    responses((status = 302, description = "Redirect to home"))
)]
pub async fn logout_user(State(state): State<AppState>) -> Result<Response, AppError> {
    let home = url_for(&state, "home", &[])?;
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, home),
            (header::SET_COOKIE, state.sessions.end_session()),
        ],
    )
        .into_response())
}
