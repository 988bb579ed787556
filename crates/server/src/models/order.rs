//! Order domain types.
//!
//! Orders snapshot line-item price and title at creation time, so later
//! product edits never retroactively alter historical orders. The product id
//! itself stays a live reference: farmer visibility and update rights are
//! resolved through it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use agricraft_core::{OrderId, OrderStatus, ProductId, UserId};

/// One product-quantity-price tuple snapshotted into an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub quantity: i64,
}

impl OrderItem {
    /// Line total: price x quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Billing address captured at checkout. All eight fields are mandatory;
/// `country` is carried through but not validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingAddress {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default)]
    pub country: String,
}

impl BillingAddress {
    /// All mandatory fields present and non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.phone,
            &self.address,
            &self.city,
            &self.state,
            &self.zip_code,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// One entry in the append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
}

/// Shipment tracking sub-record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    /// Append-only status history; entries are never overwritten.
    #[serde(default)]
    pub history: Vec<StatusChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<DateTime<Utc>>,
}

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub buyer_id: UserId,
    pub items: Vec<OrderItem>,
    /// Server-recomputed sum of line totals; client-submitted totals are
    /// advisory only.
    pub total: Decimal,
    pub billing: BillingAddress,
    pub status: OrderStatus,
    #[serde(default)]
    pub tracking: Tracking,
    /// Free-form metadata (payment method, processor reference).
    #[serde(default)]
    pub meta: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new pending order with the first history entry appended.
    #[must_use]
    pub fn new(
        buyer_id: UserId,
        items: Vec<OrderItem>,
        billing: BillingAddress,
        meta: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        let total = items.iter().map(OrderItem::line_total).sum();
        Self {
            id: OrderId::generate(),
            buyer_id,
            items,
            total,
            billing,
            status: OrderStatus::Pending,
            tracking: Tracking {
                history: vec![StatusChange {
                    status: OrderStatus::Pending,
                    timestamp: now,
                }],
                ..Tracking::default()
            },
            meta,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether any line item references one of `product_ids`.
    #[must_use]
    pub fn contains_any(&self, product_ids: &[ProductId]) -> bool {
        self.items
            .iter()
            .any(|item| product_ids.contains(&item.product_id))
    }

    /// Move the order to `status`, appending one history entry.
    ///
    /// The caller is responsible for having checked the transition table.
    pub fn apply_status(&mut self, status: OrderStatus) {
        let now = Utc::now();
        self.status = status;
        self.tracking.history.push(StatusChange {
            status,
            timestamp: now,
        });
        self.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn billing() -> BillingAddress {
        BillingAddress {
            first_name: "Asha".to_owned(),
            last_name: "Patel".to_owned(),
            email: "asha@example.com".to_owned(),
            phone: "9999999999".to_owned(),
            address: "12 Farm Lane".to_owned(),
            city: "Pune".to_owned(),
            state: "MH".to_owned(),
            zip_code: "411001".to_owned(),
            country: "India".to_owned(),
        }
    }

    fn order_item(price: i64, quantity: i64) -> OrderItem {
        OrderItem {
            product_id: ProductId::generate(),
            title: "item".to_owned(),
            price: Decimal::from(price),
            quantity,
        }
    }

    #[test]
    fn test_new_order_recomputes_total() {
        let order = Order::new(
            UserId::generate(),
            vec![order_item(100, 2), order_item(50, 1)],
            billing(),
            serde_json::Value::Null,
        );
        assert_eq!(order.total, Decimal::from(250));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.tracking.history.len(), 1);
        assert_eq!(
            order.tracking.history.first().unwrap().status,
            OrderStatus::Pending
        );
    }

    #[test]
    fn test_apply_status_appends_history() {
        let mut order = Order::new(
            UserId::generate(),
            vec![order_item(10, 1)],
            billing(),
            serde_json::Value::Null,
        );
        let before = order.tracking.history.clone();
        order.apply_status(OrderStatus::Shipped);
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.tracking.history.len(), before.len() + 1);
        // Prior entries untouched.
        assert_eq!(order.tracking.history.first(), before.first());
    }

    #[test]
    fn test_billing_completeness() {
        let mut b = billing();
        assert!(b.is_complete());
        b.phone = "  ".to_owned();
        assert!(!b.is_complete());
        // Country is carried but not mandatory.
        let mut b = billing();
        b.country = String::new();
        assert!(b.is_complete());
    }

    #[test]
    fn test_contains_any() {
        let order = Order::new(
            UserId::generate(),
            vec![order_item(10, 1)],
            billing(),
            serde_json::Value::Null,
        );
        let owned = order.items.first().unwrap().product_id;
        assert!(order.contains_any(&[owned, ProductId::generate()]));
        assert!(!order.contains_any(&[ProductId::generate()]));
        assert!(!order.contains_any(&[]));
    }
}
