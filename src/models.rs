use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Accounts ---

/// User
///
/// A storefront account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Input for `Repository::create_user`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
}

/// Role
///
/// Selects the portal a user lands in after login. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    #[default]
    Buyer,
    Artisan,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Buyer => "buyer",
            Role::Artisan => "artisan",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role {0:?}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Role::Buyer),
            "artisan" => Ok(Role::Artisan),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// --- Catalogue ---

/// Product
///
/// A listing owned by an artisan (`seller_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub stock: i32,
    pub seller_id: Uuid,
}

/// Default stock for a new listing when the form leaves it out.
pub const DEFAULT_STOCK: i32 = 10;

/// Products with less stock than this show up as low stock on the dashboard.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

// --- Cart ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CartItem {
    pub id: i64,
    pub user_id: Uuid,
    pub product_id: i64,
    pub quantity: i32,
}

/// CartLine
///
/// A cart item joined with its product, as shown in the cart and at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CartLine {
    pub item_id: i64,
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

// --- Orders ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Order {
    /// Internal key.
    pub id: i64,
    pub user_id: Uuid,
    /// Customer-facing reference, e.g. `WW-1A2B3C4D`.
    pub order_id: String,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub shipping_address: String,
    pub user_name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Input for `Repository::place_order`; line items are taken from the cart.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: String,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub shipping_address: String,
    pub user_name: String,
}

/// OrderLine
///
/// An order item with the product name and the price paid at order time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
}

/// SoldItem
///
/// One order item for a product owned by a given seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct SoldItem {
    pub order_pk: i64,
    pub order_id: String,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub price: f64,
}

// --- Form payloads (application/x-www-form-urlencoded) ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct LoginForm {
    #[serde(rename = "login-email", default)]
    pub email: String,
    #[serde(rename = "login-password", default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterForm {
    #[serde(rename = "register-fullname", default)]
    pub full_name: String,
    #[serde(rename = "register-role", default)]
    pub role: String,
    #[serde(rename = "register-email", default)]
    pub email: String,
    #[serde(rename = "register-password", default)]
    pub password: String,
    #[serde(rename = "register-confirm-password", default)]
    pub confirm_password: String,
}

/// Largest quantity a single cart line may hold.
pub const MAX_CART_QUANTITY: i32 = 999;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddToCartForm {
    pub product_id: Option<i64>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingForm {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub stock: Option<i32>,
}

/// `?error=` on the login page, set by failed login/registration redirects.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

/// `?orderId=` on the invoice page, set by `place_order`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct InvoiceQuery {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

// --- Response bodies ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginPage {
    pub login_action: String,
    pub register_action: String,
    pub roles: Vec<Role>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AddToCartResponse {
    pub success: bool,
    pub cart_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CheckoutView {
    pub items: Vec<CartLine>,
    pub subtotal: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct InvoiceOrder {
    pub order_id: String,
    /// `YYYY-MM-DD`.
    pub created_at: String,
    pub user_name: String,
    pub shipping_address: String,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct InvoiceView {
    pub order: Option<InvoiceOrder>,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardView {
    pub products: Vec<Product>,
    pub sold_items: Vec<SoldItem>,
    pub total_sales: f64,
    pub total_orders: i64,
    pub low_stock_products: Vec<Product>,
    pub pending_orders: Vec<Order>,
    pub recent_listings: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ListingView {
    /// `None` when creating a new listing.
    pub product: Option<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ReportRow {
    pub product_id: i64,
    pub name: String,
    pub units_sold: i64,
    pub revenue: f64,
}
