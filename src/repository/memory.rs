use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RepoResult, Repository};
use crate::error::RepoError;
use crate::models::{
    CartItem, CartLine, DEFAULT_STOCK, ListingForm, NewOrder, NewUser, Order, OrderLine, Product,
    Role, SoldItem, User,
};

#[derive(Debug, Clone)]
struct StoredOrderItem {
    id: i64,
    order_pk: i64,
    product_id: i64,
    quantity: i32,
    price: f64,
}

#[derive(Debug, Default)]
struct MemoryStore {
    users: Vec<User>,
    roles: HashMap<Uuid, Role>,
    products: Vec<Product>,
    cart: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<StoredOrderItem>,
    last_id: i64,
}

impl MemoryStore {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn product(&self, id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn product_name(&self, id: i64) -> String {
        self.product(id).map(|p| p.name.clone()).unwrap_or_default()
    }

    fn sold_by(&self, product_id: i64, seller_id: Uuid) -> bool {
        self.product(product_id)
            .is_some_and(|p| p.seller_id == seller_id)
    }
}

/// Newest first, ties broken by insertion order.
fn newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
}

/// InMemoryRepository
///
/// A process-local `Repository` used when no `DATABASE_URL` is configured and by the test
/// suite. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    store: RwLock<MemoryStore>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser, role: Role) -> RepoResult<User> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|u| u.email == user.email) {
            return Err(RepoError::Conflict("email".to_string()));
        }
        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
        };
        store.roles.insert(created.id, role);
        store.users.push(created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let store = self.store.read().await;
        Ok(store.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_role(&self, user_id: Uuid) -> RepoResult<Option<Role>> {
        Ok(self.store.read().await.roles.get(&user_id).copied())
    }

    async fn list_products(&self) -> RepoResult<Vec<Product>> {
        Ok(self.store.read().await.products.clone())
    }

    async fn get_product(&self, id: i64) -> RepoResult<Option<Product>> {
        Ok(self.store.read().await.product(id).cloned())
    }

    async fn seller_products(&self, seller_id: Uuid) -> RepoResult<Vec<Product>> {
        let store = self.store.read().await;
        Ok(store
            .products
            .iter()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect())
    }

    async fn create_product(&self, seller_id: Uuid, listing: ListingForm) -> RepoResult<Product> {
        let mut store = self.store.write().await;
        let product = Product {
            id: store.next_id(),
            name: listing.name,
            price: listing.price,
            stock: listing.stock.unwrap_or(DEFAULT_STOCK),
            seller_id,
        };
        store.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: i64,
        seller_id: Uuid,
        listing: ListingForm,
    ) -> RepoResult<Option<Product>> {
        let mut store = self.store.write().await;
        let Some(product) = store
            .products
            .iter_mut()
            .find(|p| p.id == id && p.seller_id == seller_id)
        else {
            return Ok(None);
        };
        product.name = listing.name;
        product.price = listing.price;
        if let Some(stock) = listing.stock {
            product.stock = stock;
        }
        Ok(Some(product.clone()))
    }

    async fn cart_lines(&self, user_id: Uuid) -> RepoResult<Vec<CartLine>> {
        let store = self.store.read().await;
        Ok(store
            .cart
            .iter()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                store.product(item.product_id).map(|p| CartLine {
                    item_id: item.id,
                    product_id: p.id,
                    name: p.name.clone(),
                    price: p.price,
                    quantity: item.quantity,
                })
            })
            .collect())
    }

    async fn add_to_cart(
        &self,
        user_id: Uuid,
        product_id: i64,
        quantity: i32,
    ) -> RepoResult<CartItem> {
        let mut store = self.store.write().await;
        if let Some(item) = store
            .cart
            .iter_mut()
            .find(|i| i.user_id == user_id && i.product_id == product_id)
        {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| RepoError::OutOfRange("quantity".to_string()))?;
            return Ok(item.clone());
        }
        let item = CartItem {
            id: store.next_id(),
            user_id,
            product_id,
            quantity,
        };
        store.cart.push(item.clone());
        Ok(item)
    }

    async fn cart_count(&self, user_id: Uuid) -> RepoResult<i64> {
        let store = self.store.read().await;
        Ok(store.cart.iter().filter(|i| i.user_id == user_id).count() as i64)
    }

    async fn get_cart_item(&self, id: i64, user_id: Uuid) -> RepoResult<Option<CartItem>> {
        let store = self.store.read().await;
        Ok(store
            .cart
            .iter()
            .find(|i| i.id == id && i.user_id == user_id)
            .cloned())
    }

    async fn set_cart_quantity(&self, id: i64, user_id: Uuid, quantity: i32) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        match store
            .cart
            .iter_mut()
            .find(|i| i.id == id && i.user_id == user_id)
        {
            Some(item) => {
                item.quantity = quantity;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_cart_item(&self, id: i64, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.cart.len();
        store.cart.retain(|i| !(i.id == id && i.user_id == user_id));
        Ok(store.cart.len() < before)
    }

    async fn place_order(&self, user_id: Uuid, order: NewOrder) -> RepoResult<Order> {
        let mut store = self.store.write().await;
        if store.orders.iter().any(|o| o.order_id == order.order_id) {
            return Err(RepoError::Conflict("order id".to_string()));
        }

        let created = Order {
            id: store.next_id(),
            user_id,
            order_id: order.order_id,
            subtotal: order.subtotal,
            tax: order.tax,
            total: order.total,
            shipping_address: order.shipping_address,
            user_name: order.user_name,
            created_at: Utc::now(),
        };

        let (lines, rest): (Vec<CartItem>, Vec<CartItem>) = std::mem::take(&mut store.cart)
            .into_iter()
            .partition(|i| i.user_id == user_id);
        store.cart = rest;

        for line in lines {
            let Some(price) = store.product(line.product_id).map(|p| p.price) else {
                continue;
            };
            let id = store.next_id();
            store.order_items.push(StoredOrderItem {
                id,
                order_pk: created.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price,
            });
        }

        store.orders.push(created.clone());
        Ok(created)
    }

    async fn find_order(&self, order_id: &str, user_id: Uuid) -> RepoResult<Option<Order>> {
        let store = self.store.read().await;
        Ok(store
            .orders
            .iter()
            .find(|o| o.order_id == order_id && o.user_id == user_id)
            .cloned())
    }

    async fn order_lines(&self, order_pk: i64) -> RepoResult<Vec<OrderLine>> {
        let store = self.store.read().await;
        let mut items: Vec<&StoredOrderItem> = store
            .order_items
            .iter()
            .filter(|i| i.order_pk == order_pk)
            .collect();
        items.sort_by_key(|i| i.id);
        Ok(items
            .into_iter()
            .map(|i| OrderLine {
                product_id: i.product_id,
                name: store.product_name(i.product_id),
                price: i.price,
                quantity: i.quantity,
            })
            .collect())
    }

    async fn user_orders(&self, user_id: Uuid) -> RepoResult<Vec<Order>> {
        let store = self.store.read().await;
        let orders = store
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }

    async fn sold_items(&self, seller_id: Uuid) -> RepoResult<Vec<SoldItem>> {
        let store = self.store.read().await;
        Ok(store
            .order_items
            .iter()
            .filter(|i| store.sold_by(i.product_id, seller_id))
            .filter_map(|i| {
                let order = store.orders.iter().find(|o| o.id == i.order_pk)?;
                Some(SoldItem {
                    order_pk: i.order_pk,
                    order_id: order.order_id.clone(),
                    product_id: i.product_id,
                    product_name: store.product_name(i.product_id),
                    quantity: i.quantity,
                    price: i.price,
                })
            })
            .collect())
    }

    async fn seller_orders(&self, seller_id: Uuid) -> RepoResult<Vec<Order>> {
        let store = self.store.read().await;
        let orders = store
            .orders
            .iter()
            .filter(|o| {
                store
                    .order_items
                    .iter()
                    .any(|i| i.order_pk == o.id && store.sold_by(i.product_id, seller_id))
            })
            .cloned()
            .collect();
        Ok(newest_first(orders))
    }
}
