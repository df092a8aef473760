mod common;

use artisan_storefront::models::{LoginPage, ProfileView, Role};
use axum::http::StatusCode;
use common::{TestApp, assert_redirect, cookie_pair, json_body, location, set_cookie, spawn_app};

fn register_body(full_name: &str, email: &str, role: &str, password: &str, confirm: &str) -> String {
    format!(
        "register-fullname={}&register-role={role}&register-email={}&register-password={password}&register-confirm-password={confirm}",
        full_name.replace(' ', "+"),
        email.replace('@', "%40"),
    )
}

async fn register(app: &TestApp, full_name: &str, email: &str, role: &str) -> String {
    let response = app
        .post_form(
            "/register/submit/",
            &register_body(full_name, email, role, "Strong123", "Strong123"),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    cookie_pair(&set_cookie(&response).expect("session cookie"))
}

#[tokio::test]
async fn buyer_registration_logs_in_and_lands_on_home() {
    let app = spawn_app();
    let response = app
        .post_form(
            "/register/submit/",
            &register_body("Jane Van Doe", "jane@example.com", "buyer", "Strong123", "Strong123"),
            None,
        )
        .await;

    assert_redirect(&response, "/");
    let cookie = cookie_pair(&set_cookie(&response).expect("session cookie"));
    assert!(cookie.starts_with("sessionid="));

    let profile: ProfileView = json_body(app.get("/profile/", Some(&cookie)).await).await;
    assert_eq!(profile.username, "jane");
    assert_eq!(profile.email, "jane@example.com");
    assert_eq!(profile.first_name, "Jane");
    assert_eq!(profile.last_name, "Van Doe");
    assert_eq!(profile.role, Role::Buyer);
}

#[tokio::test]
async fn artisan_registration_lands_on_dashboard() {
    let app = spawn_app();
    let response = app
        .post_form(
            "/register/submit/",
            &register_body("Ada", "ada@example.com", "artisan", "Strong123", "Strong123"),
            None,
        )
        .await;
    assert_redirect(&response, "/artisan/dashboard/");
}

#[tokio::test]
async fn registration_failures_return_to_login_with_code() {
    let app = spawn_app();
    register(&app, "Jane Doe", "jane@example.com", "buyer").await;

    let cases = [
        (
            register_body("X", "x@example.com", "buyer", "Strong123", "Other123"),
            "/login/?error=password_mismatch",
        ),
        (
            register_body("X", "jane@example.com", "buyer", "Strong123", "Strong123"),
            "/login/?error=email_taken",
        ),
        (
            register_body("X", "y@example.com", "", "Strong123", "Strong123"),
            "/login/?error=missing_role",
        ),
        (
            register_body("X", "z@example.com", "admin", "Strong123", "Strong123"),
            "/login/?error=missing_role",
        ),
    ];

    for (body, expected) in cases {
        let response = app.post_form("/register/submit/", &body, None).await;
        assert_redirect(&response, expected);
        assert!(set_cookie(&response).is_none());
    }
}

#[tokio::test]
async fn password_mismatch_is_checked_before_duplicate_email() {
    let app = spawn_app();
    register(&app, "Jane Doe", "jane@example.com", "buyer").await;

    let body = register_body("X", "jane@example.com", "", "Strong123", "Other123");
    let response = app.post_form("/register/submit/", &body, None).await;
    assert_redirect(&response, "/login/?error=password_mismatch");
}

#[tokio::test]
async fn login_with_correct_password() {
    let app = spawn_app();
    register(&app, "Ada Maker", "ada@example.com", "artisan").await;

    let response = app
        .post_form(
            "/login/submit/",
            "login-email=ada%40example.com&login-password=Strong123",
            None,
        )
        .await;
    assert_redirect(&response, "/artisan/dashboard/");

    let cookie = cookie_pair(&set_cookie(&response).expect("session cookie"));
    let response = app.get("/artisan/dashboard/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_failures_return_to_login_with_code() {
    let app = spawn_app();
    register(&app, "Jane Doe", "jane@example.com", "buyer").await;

    let response = app
        .post_form(
            "/login/submit/",
            "login-email=nobody%40example.com&login-password=Strong123",
            None,
        )
        .await;
    assert_redirect(&response, "/login/?error=unknown_email");

    let response = app
        .post_form(
            "/login/submit/",
            "login-email=jane%40example.com&login-password=wrong",
            None,
        )
        .await;
    assert_redirect(&response, "/login/?error=incorrect_password");
    assert!(set_cookie(&response).is_none());
}

#[tokio::test]
async fn form_endpoints_redirect_plain_gets() {
    let app = spawn_app();
    assert_redirect(&app.get("/login/submit/", None).await, "/login/");
    assert_redirect(&app.get("/register/submit/", None).await, "/login/");
}

#[tokio::test]
async fn login_page_describes_forms_and_errors() {
    let app = spawn_app();

    let page: LoginPage = json_body(app.get("/login/", None).await).await;
    assert_eq!(page.login_action, "/login/submit/");
    assert_eq!(page.register_action, "/register/submit/");
    assert_eq!(page.roles, vec![Role::Buyer, Role::Artisan]);
    assert!(page.error.is_none());

    let page: LoginPage =
        json_body(app.get("/login/?error=incorrect_password", None).await).await;
    assert_eq!(page.error.as_deref(), Some("Incorrect password."));

    let page: LoginPage = json_body(app.get("/login/?error=bogus", None).await).await;
    assert!(page.error.is_none());
}

#[tokio::test]
async fn logout_clears_the_session_cookie() {
    let app = spawn_app();
    let cookie = register(&app, "Jane Doe", "jane@example.com", "buyer").await;

    let response = app.get("/logout/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let cleared = set_cookie(&response).expect("cleared cookie");
    assert!(cleared.starts_with("sessionid=;"));
    assert!(cleared.contains("Max-Age=0"));

    // A browser drops the cookie; without it protected pages redirect again.
    assert_redirect(&app.get("/profile/", None).await, "/login/");
}
