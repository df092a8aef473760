use async_trait::async_trait;
use sqlx::{PgPool, postgres::PgPoolOptions};
use uuid::Uuid;

use super::{RepoResult, Repository};
use crate::error::RepoError;
use crate::models::{
    CartItem, CartLine, DEFAULT_STOCK, ListingForm, NewOrder, NewUser, Order, OrderLine, Product,
    Role, SoldItem, User,
};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash";
const PRODUCT_COLUMNS: &str = "id, name, price, stock, seller_id";
const ORDER_COLUMNS: &str =
    "id, user_id, order_id, subtotal, tax, total, shipping_address, user_name, created_at";

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`.
fn unique_violation(err: sqlx::Error, what: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict(what.to_string())
        }
        _ => RepoError::Database(err),
    }
}

/// Maps `numeric_value_out_of_range` (SQLSTATE 22003) to `OutOfRange`.
fn out_of_range(err: sqlx::Error, what: &str) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("22003") => {
            RepoError::OutOfRange(what.to_string())
        }
        _ => RepoError::Database(err),
    }
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a small connection pool against `db_url`.
    pub async fn connect(db_url: &str) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    pub async fn migrate(&self) -> RepoResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser, role: Role) -> RepoResult<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "email"))?;

        sqlx::query("INSERT INTO user_profiles (user_id, role) VALUES ($1, $2)")
            .bind(created.id)
            .bind(role.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_role(&self, user_id: Uuid) -> RepoResult<Option<Role>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM user_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        // The CHECK constraint keeps unknown values out; treat any that slip in as no profile.
        Ok(role.and_then(|r| match r.parse() {
            Ok(role) => Some(role),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "ignoring profile with unknown role");
                None
            }
        }))
    }

    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn get_product(&self, id: i64) -> RepoResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn seller_products(&self, seller_id: Uuid) -> RepoResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE seller_id = $1 ORDER BY id"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    async fn create_product(&self, seller_id: Uuid, listing: ListingForm) -> RepoResult<Product> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products (name, price, stock, seller_id) VALUES ($1, $2, $3, $4) \
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&listing.name)
        .bind(listing.price)
        .bind(listing.stock.unwrap_or(DEFAULT_STOCK))
        .bind(seller_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update_product(
        &self,
        id: i64,
        seller_id: Uuid,
        listing: ListingForm,
    ) -> RepoResult<Option<Product>> {
        // A missing stock value keeps the current stock.
        let product = sqlx::query_as::<_, Product>(&format!(
            "UPDATE products SET name = $1, price = $2, stock = COALESCE($3, stock) \
             WHERE id = $4 AND seller_id = $5 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&listing.name)
        .bind(listing.price)
        .bind(listing.stock)
        .bind(id)
        .bind(seller_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    async fn cart_lines(&self, user_id: Uuid) -> RepoResult<Vec<CartLine>> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT c.id AS item_id, c.product_id, p.name, p.price, c.quantity \
             FROM cart_items c JOIN products p ON p.id = c.product_id \
             WHERE c.user_id = $1 ORDER BY c.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: i64,
        quantity: i32,
    ) -> RepoResult<CartItem> {
        let item = sqlx::query_as::<_, CartItem>(
            "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, product_id) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity \
             RETURNING id, user_id, product_id, quantity",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| out_of_range(e, "quantity"))?;
        Ok(item)
    }

    async fn cart_count(&self, user_id: Uuid) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn get_cart_item(&self, id: i64, user_id: Uuid) -> RepoResult<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(
            "SELECT id, user_id, product_id, quantity FROM cart_items \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn set_cart_quantity(&self, id: i64, user_id: Uuid, quantity: i32) -> RepoResult<bool> {
        let result =
            sqlx::query("UPDATE cart_items SET quantity = $1 WHERE id = $2 AND user_id = $3")
                .bind(quantity)
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_cart_item(&self, id: i64, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn place_order(&self, user_id: Uuid, order: NewOrder) -> RepoResult<Order> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (user_id, order_id, subtotal, tax, total, shipping_address, user_name) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&order.order_id)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.total)
        .bind(&order.shipping_address)
        .bind(&order.user_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "order id"))?;

        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price) \
             SELECT $1, c.product_id, c.quantity, p.price \
             FROM cart_items c JOIN products p ON p.id = c.product_id \
             WHERE c.user_id = $2 ORDER BY c.id",
        )
        .bind(created.id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn find_order(&self, order_id: &str, user_id: Uuid) -> RepoResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn order_lines(&self, order_pk: i64) -> RepoResult<Vec<OrderLine>> {
        let lines = sqlx::query_as::<_, OrderLine>(
            "SELECT i.product_id, p.name, i.price, i.quantity \
             FROM order_items i JOIN products p ON p.id = i.product_id \
             WHERE i.order_id = $1 ORDER BY i.id",
        )
        .bind(order_pk)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    async fn user_orders(&self, user_id: Uuid) -> RepoResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn sold_items(&self, seller_id: Uuid) -> RepoResult<Vec<SoldItem>> {
        let items = sqlx::query_as::<_, SoldItem>(
            "SELECT i.order_id AS order_pk, o.order_id, i.product_id, p.name AS product_name, \
                    i.quantity, i.price \
             FROM order_items i \
             JOIN orders o ON o.id = i.order_id \
             JOIN products p ON p.id = i.product_id \
             WHERE p.seller_id = $1 ORDER BY i.id",
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn seller_orders(&self, seller_id: Uuid) -> RepoResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT o.id, o.user_id, o.order_id, o.subtotal, o.tax, o.total, \
                    o.shipping_address, o.user_name, o.created_at \
             FROM orders o \
             WHERE EXISTS ( \
                 SELECT 1 FROM order_items i JOIN products p ON p.id = i.product_id \
                 WHERE i.order_id = o.id AND p.seller_id = $1) \
             ORDER BY o.created_at DESC, o.id DESC",
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }
}
