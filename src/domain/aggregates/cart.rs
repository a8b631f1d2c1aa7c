//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::Money;

/// Lifecycle of a cart row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartLineStatus { InCart, CheckedOut }

impl CartLineStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::InCart => "in_cart", Self::CheckedOut => "checked_out" }
    }
}

/// A row of the `cart` table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i32,
    pub store_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub added_at: DateTime<Utc>,
    pub status: CartLineStatus,
    pub checked_out_at: Option<DateTime<Utc>>,
}

/// Cart line joined with its product; `quantity` is the line quantity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CartItem {
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

impl CartItem {
    pub fn line_total(&self) -> Money { self.price.multiply(self.quantity) }
}

/// Point-in-time view of a store's cart, used to price a checkout.
#[derive(Clone, Debug)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new(items: Vec<CartItem>) -> Self { Self { items } }

    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn total(&self) -> Money {
        self.items.iter().fold(Money::zero(), |acc, i| acc.add(i.line_total()))
    }

    pub fn into_items(self) -> Vec<CartItem> { self.items }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: i32, price: i64, quantity: i32) -> CartItem {
        let now = Utc::now();
        CartItem {
            id, product_name: format!("P{id}"), price: Money::new(Decimal::new(price, 0)), quantity,
            created_at: now, updated_at: now, category: "misc".into(), brand: "b".into(), model: "m".into(),
            store_id: 1, is_recommended: false, image_path: String::new(),
        }
    }

    #[test]
    fn test_cart_total() {
        let cart = Cart::new(vec![item(1, 10, 5), item(2, 5, 1)]);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total().amount(), Decimal::new(55, 0));
    }

    #[test]
    fn test_empty_cart_total_is_zero() {
        let cart = Cart::new(vec![]);
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(CartLineStatus::InCart.as_str(), "in_cart");
        assert_eq!(CartLineStatus::CheckedOut.as_str(), "checked_out");
    }
}
