//! Product domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use agricraft_core::{ProductId, ProductStatus, UserId};

/// A product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Listing title.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Unit price, non-negative.
    pub price: Decimal,
    /// Units in stock, non-negative.
    #[serde(default)]
    pub stock: i64,
    /// Image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Category label.
    #[serde(default = "default_category")]
    pub category: String,
    /// Owning farmer. `None` means admin-created or legacy stock.
    #[serde(default)]
    pub farmer_id: Option<UserId>,
    /// Listing status.
    #[serde(default)]
    pub status: ProductStatus,
    /// When the listing was created.
    pub created_at: DateTime<Utc>,
    /// When the listing was last updated.
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    "General".to_owned()
}

impl Product {
    /// Whether `user` owns this listing.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.farmer_id == Some(user)
    }

    /// Case-insensitive substring match over title and description.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.to_lowercase();
        self.title.to_lowercase().contains(&q) || self.description.to_lowercase().contains(&q)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_product(title: &str, description: &str) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::generate(),
            title: title.to_owned(),
            description: description.to_owned(),
            price: Decimal::from(10),
            stock: 5,
            images: Vec::new(),
            category: "General".to_owned(),
            farmer_id: None,
            status: ProductStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_matches_query_title_and_description() {
        let p = sample_product("Alphonso Mangoes", "ripened in straw");
        assert!(p.matches_query("mango"));
        assert!(p.matches_query("STRAW"));
        assert!(!p.matches_query("tomato"));
    }

    #[test]
    fn test_ownership() {
        let farmer = UserId::generate();
        let mut p = sample_product("Basmati", "");
        assert!(!p.is_owned_by(farmer));
        p.farmer_id = Some(farmer);
        assert!(p.is_owned_by(farmer));
        assert!(!p.is_owned_by(UserId::generate()));
    }

    #[test]
    fn test_defaults_on_deserialize() {
        let p: Product = serde_json::from_value(serde_json::json!({
            "id": ProductId::generate(),
            "title": "Jaggery",
            "price": "45",
            "createdAt": Utc::now(),
            "updatedAt": Utc::now(),
        }))
        .unwrap();
        assert_eq!(p.category, "General");
        assert_eq!(p.status, ProductStatus::Active);
        assert_eq!(p.stock, 0);
        assert!(p.farmer_id.is_none());
    }
}
