//! Cart domain types.
//!
//! One cart per user. Line items merge by product id; the running total is
//! recomputed from the items on every read, never cached.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use agricraft_core::{CartId, ProductId, UserId};

/// One product-quantity-price tuple within a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    /// Always >= 1; quantity 0 means the line is removed instead.
    pub quantity: i64,
    #[serde(default)]
    pub image: String,
}

/// A user's cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Fresh empty cart for a user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: CartId::generate(),
            user_id,
            items: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Add an item, merging by product id: an existing line's quantity is
    /// incremented, a new product appends a new line.
    pub fn add_item(&mut self, item: CartItem) {
        match self
            .items
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            Some(existing) => existing.quantity += item.quantity,
            None => self.items.push(item),
        }
    }

    /// Overwrite a line's quantity. Quantity 0 removes the line.
    ///
    /// Returns `false` if no line with that product id exists (and the
    /// quantity was non-zero, so there was something to update).
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) -> bool {
        if quantity == 0 {
            self.remove_item(product_id);
            return true;
        }
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Removing an absent product id is a no-op, not an error.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.items.retain(|item| item.product_id != product_id);
    }

    /// Empty the cart, keeping the record itself.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of price x quantity over all lines. Recomputed on every call.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(product_id: ProductId, price: i64, quantity: i64) -> CartItem {
        CartItem {
            product_id,
            title: "item".to_owned(),
            price: Decimal::from(price),
            quantity,
            image: String::new(),
        }
    }

    #[test]
    fn test_add_item_merges_by_product_id() {
        let product = ProductId::generate();
        let mut cart = Cart::new(UserId::generate());
        cart.add_item(item(product, 100, 2));
        cart.add_item(item(product, 100, 3));
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().unwrap().quantity, 5);
    }

    #[test]
    fn test_add_item_appends_new_product() {
        let mut cart = Cart::new(UserId::generate());
        cart.add_item(item(ProductId::generate(), 100, 1));
        cart.add_item(item(ProductId::generate(), 50, 1));
        assert_eq!(cart.items.len(), 2);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let product = ProductId::generate();
        let mut cart = Cart::new(UserId::generate());
        cart.add_item(item(product, 10, 4));
        assert!(cart.set_quantity(product, 0));
        assert!(cart.items.is_empty());
    }

    #[test]
    fn test_set_quantity_missing_item() {
        let mut cart = Cart::new(UserId::generate());
        assert!(!cart.set_quantity(ProductId::generate(), 3));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::new(UserId::generate());
        cart.add_item(item(ProductId::generate(), 10, 1));
        cart.remove_item(ProductId::generate());
        assert_eq!(cart.items.len(), 1);
    }

    #[test]
    fn test_total() {
        let mut cart = Cart::new(UserId::generate());
        cart.add_item(item(ProductId::generate(), 100, 2));
        cart.add_item(item(ProductId::generate(), 50, 1));
        assert_eq!(cart.total(), Decimal::from(250));
    }
}
