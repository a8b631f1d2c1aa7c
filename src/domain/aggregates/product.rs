//! Product read model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Money;

/// Catalog product. Read-only from the storefront's perspective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub product_name: String,
    pub price: Money,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category: String,
    pub brand: String,
    pub model: String,
    pub store_id: i32,
    pub is_recommended: bool,
    pub image_path: String,
}

impl Product {
    pub fn name_matches(&self, needle: &str) -> bool {
        self.product_name.to_lowercase().contains(&needle.to_lowercase())
    }
}
