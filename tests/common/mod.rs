#![allow(dead_code)]

use std::sync::Arc;

use artisan_storefront::{
    AppConfig, AppState, create_router,
    models::{ListingForm, NewUser, Product, Role, User},
    repository::{InMemoryRepository, Repository, RepositoryState},
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

/// TestApp
///
/// A full router over an in-memory store, driven through `oneshot`.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub state: AppState,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(AppConfig::default())
}

pub fn spawn_app_with(config: AppConfig) -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::new(repo.clone() as RepositoryState, config);
    let router = create_router(state.clone());
    TestApp {
        router,
        repo,
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, path: &str, body: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Seeds a user directly, skipping password hashing.
    pub async fn seed_user(&self, email: &str, role: Role) -> User {
        let local = email.split('@').next().unwrap().to_string();
        self.repo
            .create_user(
                NewUser {
                    username: local.clone(),
                    email: email.to_string(),
                    first_name: local,
                    last_name: "Tester".to_string(),
                    password_hash: "not-a-real-hash".to_string(),
                },
                role,
            )
            .await
            .expect("seed user")
    }

    /// `sessionid=...` for an already seeded user.
    pub fn cookie_for(&self, user: &User) -> String {
        let set_cookie = self.state.sessions.start_session(user.id).expect("session");
        cookie_pair(&set_cookie)
    }

    pub async fn seed_product(&self, seller: &User, name: &str, price: f64, stock: i32) -> Product {
        self.repo
            .create_product(
                seller.id,
                ListingForm {
                    name: name.to_string(),
                    price,
                    stock: Some(stock),
                },
            )
            .await
            .expect("seed product")
    }
}

/// The `name=value` part of a `Set-Cookie` header value.
pub fn cookie_pair(set_cookie: &str) -> String {
    set_cookie
        .split(';')
        .next()
        .unwrap_or_default()
        .to_string()
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
}

pub fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .map(|value| value.to_str().unwrap().to_string())
}

pub fn assert_redirect(response: &Response<Body>, to: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response), to);
}

pub async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
