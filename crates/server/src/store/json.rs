//! JSON-file storage backend.
//!
//! Keeps the whole data set as one JSON document (`users`, `products`,
//! `carts`, `orders` arrays) cached in memory behind a mutex and rewritten
//! to disk after every mutation. Intended for local development and tests;
//! it provides no cross-process locking and no write atomicity beyond the
//! single `write` syscall.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use agricraft_core::{Email, OrderId, ProductId, UserId};

use crate::models::{Cart, Order, Product, User};

use super::{OrderScope, Store, StoreError};

/// The on-disk document. Arrays are append-ordered, so "newest first" is a
/// reverse iteration.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default)]
    carts: Vec<Cart>,
    #[serde(default)]
    orders: Vec<Order>,
}

/// Single-file JSON document store.
pub struct JsonStore {
    path: PathBuf,
    state: Mutex<Document>,
}

impl JsonStore {
    /// Open the document at `path`, creating it with an empty data set if it
    /// does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read or created, and
    /// [`StoreError::DataCorruption`] if an existing file fails to parse.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let document = match tokio::fs::read(&path).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| {
                StoreError::DataCorruption(format!("invalid store file {}: {e}", path.display()))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let document = Document::default();
                write_document(&path, &document).await?;
                document
            }
            Err(err) => return Err(StoreError::Io(err)),
        };

        Ok(Self {
            path,
            state: Mutex::new(document),
        })
    }

    /// Run a mutation against the in-memory document and flush it to disk
    /// before releasing the lock.
    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&mut Document) -> Result<T, StoreError> + Send,
    ) -> Result<T, StoreError> {
        let mut doc = self.state.lock().await;
        let out = apply(&mut doc)?;
        write_document(&self.path, &doc).await?;
        Ok(out)
    }
}

async fn write_document(path: &Path, document: &Document) -> Result<(), StoreError> {
    let raw = serde_json::to_vec_pretty(document)
        .map_err(|e| StoreError::DataCorruption(format!("failed to serialize store: {e}")))?;
    tokio::fs::write(path, raw).await?;
    Ok(())
}

#[async_trait]
impl Store for JsonStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_user(&self, user: User) -> Result<User, StoreError> {
        self.mutate(|doc| {
            if doc.users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::Conflict("email already in use".to_owned()));
            }
            doc.users.push(user.clone());
            Ok(user)
        })
        .await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let doc = self.state.lock().await;
        Ok(doc.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, StoreError> {
        let doc = self.state.lock().await;
        Ok(doc.users.iter().find(|u| &u.email == email).cloned())
    }

    async fn list_users(&self, limit: i64) -> Result<Vec<User>, StoreError> {
        let doc = self.state.lock().await;
        Ok(doc
            .users
            .iter()
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn set_refresh_token(
        &self,
        id: UserId,
        refresh_token: Option<&str>,
    ) -> Result<(), StoreError> {
        self.mutate(|doc| {
            let user = doc
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(StoreError::NotFound)?;
            user.refresh_token = refresh_token.map(str::to_owned);
            user.updated_at = Utc::now();
            Ok(())
        })
        .await
    }

    async fn create_product(&self, product: Product) -> Result<Product, StoreError> {
        self.mutate(|doc| {
            doc.products.push(product.clone());
            Ok(product)
        })
        .await
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let doc = self.state.lock().await;
        Ok(doc.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(
        &self,
        query: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Product>, StoreError> {
        let doc = self.state.lock().await;
        let page = doc
            .products
            .iter()
            .rev()
            .filter(|p| query.is_none_or(|q| p.matches_query(q)))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(page)
    }

    async fn update_product(&self, product: Product) -> Result<Product, StoreError> {
        self.mutate(|doc| {
            let slot = doc
                .products
                .iter_mut()
                .find(|p| p.id == product.id)
                .ok_or(StoreError::NotFound)?;
            *slot = product.clone();
            Ok(product)
        })
        .await
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, StoreError> {
        self.mutate(|doc| {
            let before = doc.products.len();
            doc.products.retain(|p| p.id != id);
            Ok(doc.products.len() != before)
        })
        .await
    }

    async fn product_ids_owned_by(&self, farmer: UserId) -> Result<Vec<ProductId>, StoreError> {
        let doc = self.state.lock().await;
        Ok(doc
            .products
            .iter()
            .filter(|p| p.is_owned_by(farmer))
            .map(|p| p.id)
            .collect())
    }

    async fn cart_for_user(&self, user: UserId) -> Result<Cart, StoreError> {
        if let Some(cart) = {
            let doc = self.state.lock().await;
            doc.carts.iter().find(|c| c.user_id == user).cloned()
        } {
            return Ok(cart);
        }
        self.mutate(|doc| {
            // Re-check under the write lock; another task may have created it.
            if let Some(cart) = doc.carts.iter().find(|c| c.user_id == user) {
                return Ok(cart.clone());
            }
            let cart = Cart::new(user);
            doc.carts.push(cart.clone());
            Ok(cart)
        })
        .await
    }

    async fn put_cart(&self, cart: Cart) -> Result<Cart, StoreError> {
        self.mutate(|doc| {
            match doc.carts.iter_mut().find(|c| c.user_id == cart.user_id) {
                Some(slot) => *slot = cart.clone(),
                None => doc.carts.push(cart.clone()),
            }
            Ok(cart)
        })
        .await
    }

    async fn create_order(&self, order: Order) -> Result<Order, StoreError> {
        self.mutate(|doc| {
            doc.orders.push(order.clone());
            Ok(order)
        })
        .await
    }

    async fn order_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let doc = self.state.lock().await;
        Ok(doc.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, scope: OrderScope, limit: i64) -> Result<Vec<Order>, StoreError> {
        let doc = self.state.lock().await;
        let matched = doc
            .orders
            .iter()
            .rev()
            .filter(|order| match &scope {
                OrderScope::All => true,
                OrderScope::Buyer(buyer) => order.buyer_id == *buyer,
                OrderScope::ContainsProduct(ids) => order.contains_any(ids),
            })
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(matched)
    }

    async fn update_order(&self, order: Order) -> Result<Order, StoreError> {
        self.mutate(|doc| {
            let slot = doc
                .orders
                .iter_mut()
                .find(|o| o.id == order.id)
                .ok_or(StoreError::NotFound)?;
            *slot = order.clone();
            Ok(order)
        })
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{BillingAddress, CartItem, OrderItem};
    use agricraft_core::Role;
    use rust_decimal::Decimal;

    async fn open_store() -> (tempfile::TempDir, JsonStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("db.json")).await.unwrap();
        (dir, store)
    }

    fn user(email: &str, role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            name: None,
            email: Email::parse(email).unwrap(),
            password_hash: "hash".to_owned(),
            role,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn product(title: &str, farmer: Option<UserId>) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::generate(),
            title: title.to_owned(),
            description: String::new(),
            price: Decimal::from(10),
            stock: 3,
            images: Vec::new(),
            category: "General".to_owned(),
            farmer_id: farmer,
            status: agricraft_core::ProductStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    fn billing() -> BillingAddress {
        BillingAddress {
            first_name: "A".to_owned(),
            last_name: "B".to_owned(),
            email: "a@b.c".to_owned(),
            phone: "1".to_owned(),
            address: "x".to_owned(),
            city: "y".to_owned(),
            state: "z".to_owned(),
            zip_code: "0".to_owned(),
            country: String::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (_dir, store) = open_store().await;
        store.create_user(user("a@x.com", Role::Buyer)).await.unwrap();
        let err = store
            .create_user(user("a@x.com", Role::Farmer))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let created = {
            let store = JsonStore::open(&path).await.unwrap();
            store.create_user(user("a@x.com", Role::Buyer)).await.unwrap()
        };
        let store = JsonStore::open(&path).await.unwrap();
        let found = store.user_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.email.as_str(), "a@x.com");
    }

    #[tokio::test]
    async fn test_cart_created_lazily_once() {
        let (_dir, store) = open_store().await;
        let owner = UserId::generate();
        let first = store.cart_for_user(owner).await.unwrap();
        let second = store.cart_for_user(owner).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.items.is_empty());
    }

    #[tokio::test]
    async fn test_put_cart_round_trip() {
        let (_dir, store) = open_store().await;
        let owner = UserId::generate();
        let mut cart = store.cart_for_user(owner).await.unwrap();
        cart.add_item(CartItem {
            product_id: ProductId::generate(),
            title: "Mangoes".to_owned(),
            price: Decimal::from(100),
            quantity: 2,
            image: String::new(),
        });
        store.put_cart(cart).await.unwrap();
        let reloaded = store.cart_for_user(owner).await.unwrap();
        assert_eq!(reloaded.items.len(), 1);
        assert_eq!(reloaded.total(), Decimal::from(200));
    }

    #[tokio::test]
    async fn test_product_search_and_pagination() {
        let (_dir, store) = open_store().await;
        store.create_product(product("Red Onions", None)).await.unwrap();
        store.create_product(product("Green Chillies", None)).await.unwrap();
        store.create_product(product("White Onions", None)).await.unwrap();

        let onions = store.list_products(Some("onion"), 100, 0).await.unwrap();
        assert_eq!(onions.len(), 2);
        // Newest first.
        assert_eq!(onions.first().unwrap().title, "White Onions");

        let page = store.list_products(None, 2, 1).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page.first().unwrap().title, "Green Chillies");
    }

    #[tokio::test]
    async fn test_order_scopes() {
        let (_dir, store) = open_store().await;
        let farmer = UserId::generate();
        let owned = store.create_product(product("Okra", Some(farmer))).await.unwrap();
        let other = store.create_product(product("Corn", None)).await.unwrap();

        let buyer = UserId::generate();
        let make_order = |product_id| {
            Order::new(
                buyer,
                vec![OrderItem {
                    product_id,
                    title: "x".to_owned(),
                    price: Decimal::from(5),
                    quantity: 1,
                }],
                billing(),
                serde_json::Value::Null,
            )
        };
        store.create_order(make_order(owned.id)).await.unwrap();
        store.create_order(make_order(other.id)).await.unwrap();

        let owned_ids = store.product_ids_owned_by(farmer).await.unwrap();
        assert_eq!(owned_ids, vec![owned.id]);

        let farmer_view = store
            .list_orders(OrderScope::ContainsProduct(owned_ids), 200)
            .await
            .unwrap();
        assert_eq!(farmer_view.len(), 1);
        assert!(farmer_view.first().unwrap().contains_any(&[owned.id]));

        let buyer_view = store.list_orders(OrderScope::Buyer(buyer), 200).await.unwrap();
        assert_eq!(buyer_view.len(), 2);

        let stranger_view = store
            .list_orders(OrderScope::Buyer(UserId::generate()), 200)
            .await
            .unwrap();
        assert!(stranger_view.is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_order() {
        let (_dir, store) = open_store().await;
        let order = Order::new(UserId::generate(), Vec::new(), billing(), serde_json::Value::Null);
        assert!(matches!(
            store.update_order(order).await.unwrap_err(),
            StoreError::NotFound
        ));
    }
}
