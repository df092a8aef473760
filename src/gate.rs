//! Request authorization gate.
//!
//! Every inbound request passes through [`access_gate`] before it reaches a handler. The
//! gate classifies the request path as public or protected and redirects anonymous callers
//! away from protected paths to the combined login/registration page.

use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;

/// Paths reachable without a session, compared by exact string equality.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/",
    "/login/",
    "/login/submit/",
    "/register/submit/",
    "/accounts/login/",
    "/accounts/login/submit/",
    "/accounts/register/submit/",
];

/// Path prefixes reachable without a session.
pub const DEFAULT_PUBLIC_PREFIXES: &[&str] = &["/static/", "/media/", "/admin/"];

/// Route names reachable without a session, matched against the resolved view name.
pub const DEFAULT_PUBLIC_VIEWS: &[&str] = &["home", "login_register", "login_user", "register_user"];

/// Location of the `login_register` view.
pub const DEFAULT_LOGIN_URL: &str = "/login/";

/// GateConfig
///
/// The immutable public-path configuration of an [`AccessGate`]. Built once at startup
/// (see `AppConfig::load`) and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Literal paths. No trailing-slash normalization is applied.
    pub exact_paths: HashSet<String>,
    /// A path is public if it starts with any of these.
    pub prefixes: Vec<String>,
    /// Logical view names, as returned by the [`ViewResolver`].
    pub view_names: HashSet<String>,
    /// Redirect target for anonymous callers on protected paths.
    pub login_url: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            exact_paths: DEFAULT_PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
            prefixes: DEFAULT_PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
            view_names: DEFAULT_PUBLIC_VIEWS.iter().map(|v| v.to_string()).collect(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
        }
    }
}

impl GateConfig {
    /// A configuration with no public paths at all.
    pub fn empty(login_url: impl Into<String>) -> Self {
        Self {
            exact_paths: HashSet::new(),
            prefixes: Vec::new(),
            view_names: HashSet::new(),
            login_url: login_url.into(),
        }
    }
}

/// ViewResolver
///
/// Maps a request path to the logical name of the view that would serve it.
/// `None` means the path matches no route.
pub trait ViewResolver: Send + Sync {
    fn resolve<'a>(&'a self, path: &str) -> Option<&'a str>;
}

/// The gate's verdict for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    RedirectToLogin,
}

/// GateOutcome
///
/// [`Access`] plus the reason, recorded in the per-request log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    AllowedPublic,
    AllowedAuthenticated,
    Redirected,
}

impl GateOutcome {
    pub fn access(self) -> Access {
        match self {
            GateOutcome::AllowedPublic | GateOutcome::AllowedAuthenticated => Access::Allow,
            GateOutcome::Redirected => Access::RedirectToLogin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateOutcome::AllowedPublic => "allowed-public",
            GateOutcome::AllowedAuthenticated => "allowed-authenticated",
            GateOutcome::Redirected => "redirected",
        }
    }
}

/// AccessGate
///
/// Stateless between requests: holds only the shared configuration and resolver, so one
/// instance is cloned into every request task. Construction has no side effects.
#[derive(Clone)]
pub struct AccessGate {
    config: Arc<GateConfig>,
    resolver: Arc<dyn ViewResolver>,
}

impl AccessGate {
    pub fn new(config: Arc<GateConfig>, resolver: Arc<dyn ViewResolver>) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Exact match first, then prefixes.
    fn path_public(&self, path: &str) -> bool {
        if self.config.exact_paths.contains(path) {
            return true;
        }
        self.config
            .prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Unresolvable paths are never public.
    fn view_name_public(&self, path: &str) -> bool {
        match self.resolver.resolve(path) {
            Some(name) => self.config.view_names.contains(name),
            None => false,
        }
    }

    /// classify
    ///
    /// Returns `true` if `path` is public. Checks run in order (exact, prefix, view name) and
    /// stop at the first match, so the resolver is only consulted for paths the cheap checks
    /// did not already admit.
    pub fn classify(&self, path: &str) -> bool {
        self.path_public(path) || self.view_name_public(path)
    }

    /// evaluate
    ///
    /// Combines the path classification with the caller's authentication status.
    pub fn evaluate(&self, path: &str, is_authenticated: bool) -> GateOutcome {
        if self.classify(path) {
            GateOutcome::AllowedPublic
        } else if is_authenticated {
            GateOutcome::AllowedAuthenticated
        } else {
            GateOutcome::Redirected
        }
    }

    pub fn decide(&self, path: &str, is_authenticated: bool) -> Access {
        self.evaluate(path, is_authenticated).access()
    }

    /// The 302 response sent to anonymous callers of protected paths.
    pub fn login_redirect(&self) -> Response {
        found(&self.config.login_url)
    }
}

/// A `302 Found` redirect to `location`.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// access_gate
///
/// Router-wide middleware. Authenticates the caller once, asks the gate for a verdict and
/// either forwards the request untouched or answers with the login redirect. On success the
/// resolved `AuthUser` is stored in the request extensions for the `AuthUser` extractor.
pub async fn access_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let user = state.sessions.authenticate(request.headers()).await;
    let outcome = state.gate.evaluate(&path, user.is_some());

    tracing::debug!(
        path = %path,
        authenticated = user.is_some(),
        outcome = outcome.as_str(),
        "access gate"
    );

    match outcome.access() {
        Access::Allow => {
            if let Some(user) = user {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        Access::RedirectToLogin => state.gate.login_redirect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    /// Resolver double with fixed answers that counts how often it is consulted.
    #[derive(Default)]
    struct FixedResolver {
        names: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn with(entries: &[(&str, &str)]) -> Self {
            Self {
                names: entries
                    .iter()
                    .map(|(path, name)| (path.to_string(), name.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ViewResolver for FixedResolver {
        fn resolve<'a>(&'a self, path: &str) -> Option<&'a str> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.names.get(path).map(String::as_str)
        }
    }

    fn gate_with(resolver: Arc<FixedResolver>) -> AccessGate {
        AccessGate::new(Arc::new(GateConfig::default()), resolver)
    }

    fn storefront_resolver() -> Arc<FixedResolver> {
        Arc::new(FixedResolver::with(&[
            ("/profile/", "buyer_profile"),
            ("/cart/", "shopping_cart"),
            ("/some/alias/", "home"),
        ]))
    }

    #[test]
    fn exact_paths_are_public_for_any_auth_status() {
        let gate = gate_with(storefront_resolver());
        for path in DEFAULT_PUBLIC_PATHS {
            assert!(gate.classify(path), "{path} should be public");
            assert_eq!(gate.decide(path, false), Access::Allow);
            assert_eq!(gate.decide(path, true), Access::Allow);
        }
    }

    #[test]
    fn prefixed_paths_are_public() {
        let gate = gate_with(storefront_resolver());
        for path in [
            "/static/css/site.css",
            "/media/products/1.png",
            "/admin/",
            "/admin/auth/user/",
        ] {
            assert!(gate.classify(path), "{path} should be public");
        }
    }

    #[test]
    fn exact_match_short_circuits_resolution() {
        let resolver = storefront_resolver();
        let gate = gate_with(resolver.clone());
        assert!(gate.classify("/"));
        assert!(gate.classify("/static/js/app.js"));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);

        assert!(!gate.classify("/profile/"));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn public_view_name_makes_path_public() {
        let gate = gate_with(storefront_resolver());
        assert!(gate.classify("/some/alias/"));
        assert_eq!(gate.evaluate("/some/alias/", false), GateOutcome::AllowedPublic);
    }

    #[test]
    fn non_public_view_name_is_protected() {
        let gate = gate_with(storefront_resolver());
        assert!(!gate.classify("/cart/"));
        assert_eq!(gate.decide("/cart/", false), Access::RedirectToLogin);
    }

    #[test]
    fn unresolvable_path_fails_closed() {
        let gate = gate_with(storefront_resolver());
        assert!(!gate.classify("/ghost/"));
        assert_eq!(gate.evaluate("/ghost/", false), GateOutcome::Redirected);
        assert_eq!(gate.evaluate("/ghost/", true), GateOutcome::AllowedAuthenticated);
    }

    #[test]
    fn trailing_slash_is_not_normalized() {
        let gate = gate_with(storefront_resolver());
        assert!(gate.classify("/login/"));
        assert!(!gate.classify("/login"));
        assert!(!gate.classify("/static"));
    }

    #[test]
    fn authenticated_callers_are_always_allowed() {
        let gate = gate_with(storefront_resolver());
        for path in ["/", "/profile/", "/ghost/", "/static/x", "/some/alias/", ""] {
            assert_eq!(gate.decide(path, true), Access::Allow);
        }
    }

    #[test]
    fn anonymous_allowed_iff_public() {
        let gate = gate_with(storefront_resolver());
        for path in ["/", "/profile/", "/ghost/", "/static/x", "/some/alias/", "/cart/"] {
            let expected = if gate.classify(path) {
                Access::Allow
            } else {
                Access::RedirectToLogin
            };
            assert_eq!(gate.decide(path, false), expected, "{path}");
        }
    }

    #[test]
    fn classification_is_idempotent() {
        let gate = gate_with(storefront_resolver());
        for path in ["/", "/profile/", "/some/alias/", "/ghost/"] {
            let first = gate.classify(path);
            for _ in 0..3 {
                assert_eq!(gate.classify(path), first);
            }
        }
    }

    #[test]
    fn empty_configuration_protects_everything() {
        let gate = AccessGate::new(
            Arc::new(GateConfig::empty("/login/")),
            storefront_resolver(),
        );
        assert!(!gate.classify("/"));
        assert!(!gate.classify("/some/alias/"));
        assert_eq!(gate.decide("/", false), Access::RedirectToLogin);
    }

    #[test]
    fn scenarios() {
        let gate = gate_with(storefront_resolver());
        // exact match
        assert_eq!(gate.evaluate("/", false), GateOutcome::AllowedPublic);
        // prefix match
        assert_eq!(gate.evaluate("/static/css/site.css", false), GateOutcome::AllowedPublic);
        // protected, anonymous
        assert_eq!(gate.evaluate("/profile/", false), GateOutcome::Redirected);
        // protected, authenticated
        assert_eq!(gate.evaluate("/profile/", true), GateOutcome::AllowedAuthenticated);
        // view name match
        assert_eq!(gate.evaluate("/some/alias/", false), GateOutcome::AllowedPublic);
        // resolver miss
        assert_eq!(gate.evaluate("/ghost/", false), GateOutcome::Redirected);
    }

    #[test]
    fn login_redirect_is_302_to_login_url() {
        let gate = gate_with(storefront_resolver());
        let response = gate.login_redirect();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login/");
    }
}
