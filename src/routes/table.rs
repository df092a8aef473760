use crate::gate::ViewResolver;

/// One component of a route pattern between two `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `<int:name>`: one or more ASCII digits.
    Int(String),
    /// `<str:name>` or `<name>`: any non-empty segment.
    Str(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        let Some(inner) = raw.strip_prefix('<').and_then(|r| r.strip_suffix('>')) else {
            return Segment::Literal(raw.to_string());
        };
        match inner.split_once(':') {
            Some(("int", name)) => Segment::Int(name.to_string()),
            Some(("str", name)) => Segment::Str(name.to_string()),
            // Unknown converters never match a real path.
            Some(_) => Segment::Literal(raw.to_string()),
            None => Segment::Str(inner.to_string()),
        }
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Segment::Literal(literal) => literal == value,
            Segment::Int(_) => !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
            Segment::Str(_) => !value.is_empty(),
        }
    }

    fn param_name(&self) -> Option<&str> {
        match self {
            Segment::Literal(_) => None,
            Segment::Int(name) | Segment::Str(name) => Some(name),
        }
    }
}

/// NamedRoute
///
/// A pattern such as `/product/<int:product_id>/` together with its logical view name.
#[derive(Debug, Clone)]
pub struct NamedRoute {
    name: String,
    pattern: String,
    segments: Vec<Segment>,
}

impl NamedRoute {
    fn new(name: &str, pattern: &str) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            segments: pattern.split('/').map(Segment::parse).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn param_count(&self) -> usize {
        self.segments.iter().filter(|s| s.param_name().is_some()).count()
    }

    fn matches<'p>(&self, path: &'p str) -> Option<Vec<(String, &'p str)>> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = Vec::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            if !segment.accepts(part) {
                return None;
            }
            if let Some(name) = segment.param_name() {
                params.push((name.to_string(), part));
            }
        }
        Some(params)
    }
}

/// A successful resolution: the view name and the captured parameters in pattern order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch<'t, 'p> {
    pub name: &'t str,
    pub params: Vec<(String, &'p str)>,
}

/// RouteTable
///
/// The ordered list of named storefront routes. Serves two purposes: the access gate asks it
/// which view a path belongs to, and handlers reverse view names into paths for redirects.
/// The first registered pattern that matches the whole path wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<NamedRoute>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, name: &str, pattern: &str) -> Self {
        self.routes.push(NamedRoute::new(name, pattern));
        self
    }

    /// storefront
    ///
    /// Every named route served by `create_router`, in resolution order.
    pub fn storefront() -> Self {
        Self::new()
            .route("home", "/")
            .route("product_details", "/product/<int:product_id>/")
            .route("shopping_cart", "/cart/")
            .route("add_to_cart", "/cart/add/<int:product_id>/")
            .route("login_register", "/login/")
            .route("login_user", "/login/submit/")
            .route("register_user", "/register/submit/")
            .route("logout_user", "/logout/")
            // Buyer portal
            .route("buyer_profile", "/profile/")
            .route("order_history", "/orders/")
            // Artisan portal
            .route("artisan_dashboard", "/artisan/dashboard/")
            .route("create_listing", "/artisan/listing/")
            .route("edit_listing", "/artisan/listing/<int:product_id>/")
            .route("fulfillment", "/artisan/fulfillment/")
            .route("inventory_manager", "/artisan/inventory/")
            .route("reports_page", "/artisan/reports/")
            // Cart actions and checkout
            .route("add_to_cart", "/cart/add/")
            .route("update_cart_quantity", "/cart/update/<int:item_id>/<str:action>/")
            .route("remove_from_cart", "/cart/remove/<int:item_id>/")
            .route("checkout", "/checkout/")
            .route("place_order", "/order/place/")
            .route("invoice_page", "/invoice/")
    }

    pub fn routes(&self) -> &[NamedRoute] {
        &self.routes
    }

    pub fn resolve<'t, 'p>(&'t self, path: &'p str) -> Option<RouteMatch<'t, 'p>> {
        self.routes.iter().find_map(|route| {
            route.matches(path).map(|params| RouteMatch {
                name: route.name(),
                params,
            })
        })
    }

    /// reverse
    ///
    /// Builds the path of the first route named `name` whose parameters accept `args`.
    pub fn reverse(&self, name: &str, args: &[&str]) -> Option<String> {
        self.routes
            .iter()
            .filter(|route| route.name == name && route.param_count() == args.len())
            .find_map(|route| {
                let mut args = args.iter();
                let mut parts = Vec::with_capacity(route.segments.len());
                for segment in &route.segments {
                    match segment {
                        Segment::Literal(literal) => parts.push(literal.as_str()),
                        param => {
                            let value = args.next()?;
                            if !param.accepts(value) || value.contains('/') {
                                return None;
                            }
                            parts.push(*value);
                        }
                    }
                }
                Some(parts.join("/"))
            })
    }
}

impl ViewResolver for RouteTable {
    fn resolve<'a>(&'a self, path: &str) -> Option<&'a str> {
        RouteTable::resolve(self, path).map(|m| m.name)
    }
}
