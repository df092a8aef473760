use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepoError;
use crate::models::{
    CartItem, CartLine, ListingForm, NewOrder, NewUser, Order, OrderLine, Product, Role, SoldItem,
    User,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository Trait
///
/// The persistence contract used by handlers and the session layer. Implemented by
/// `PostgresRepository` for deployments and `InMemoryRepository` for local runs and tests.
///
/// Every method that takes a `user_id` or `seller_id` scopes its query to that owner; a row
/// owned by someone else behaves exactly like a missing row.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Accounts ---
    /// Creates the user and its profile together. Fails with `Conflict` on a duplicate email.
    async fn create_user(&self, user: NewUser, role: Role) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    /// `None` when the user has no profile row.
    async fn get_role(&self, user_id: Uuid) -> RepoResult<Option<Role>>;

    // --- Catalogue ---
    async fn list_products(&self) -> RepoResult<Vec<Product>>;
    async fn get_product(&self, id: i64) -> RepoResult<Option<Product>>;
    /// Ordered by id, oldest listing first.
    async fn seller_products(&self, seller_id: Uuid) -> RepoResult<Vec<Product>>;
    async fn create_product(&self, seller_id: Uuid, listing: ListingForm) -> RepoResult<Product>;
    async fn update_product(
        &self,
        id: i64,
        seller_id: Uuid,
        listing: ListingForm,
    ) -> RepoResult<Option<Product>>;

    // --- Cart ---
    async fn cart_lines(&self, user_id: Uuid) -> RepoResult<Vec<CartLine>>;
    /// Adds `quantity` to the existing line for the product, or creates one.
    async fn add_to_cart(&self, user_id: Uuid, product_id: i64, quantity: i32)
    -> RepoResult<CartItem>;
    /// Number of distinct lines in the cart.
    async fn cart_count(&self, user_id: Uuid) -> RepoResult<i64>;
    async fn get_cart_item(&self, id: i64, user_id: Uuid) -> RepoResult<Option<CartItem>>;
    async fn set_cart_quantity(&self, id: i64, user_id: Uuid, quantity: i32) -> RepoResult<bool>;
    async fn remove_cart_item(&self, id: i64, user_id: Uuid) -> RepoResult<bool>;

    // --- Orders ---
    /// Atomically records the order, copies the cart into order items at current prices and
    /// empties the cart.
    async fn place_order(&self, user_id: Uuid, order: NewOrder) -> RepoResult<Order>;
    async fn find_order(&self, order_id: &str, user_id: Uuid) -> RepoResult<Option<Order>>;
    async fn order_lines(&self, order_pk: i64) -> RepoResult<Vec<OrderLine>>;
    /// Newest first.
    async fn user_orders(&self, user_id: Uuid) -> RepoResult<Vec<Order>>;

    // --- Seller views ---
    async fn sold_items(&self, seller_id: Uuid) -> RepoResult<Vec<SoldItem>>;
    /// Orders containing at least one of the seller's products, newest first.
    async fn seller_orders(&self, seller_id: Uuid) -> RepoResult<Vec<Order>>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
