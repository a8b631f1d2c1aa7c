//! Order history

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Ordered }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Ordered => "ordered" }
    }
}

/// Archived cart line written by the migrating checkout. Never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub id: i32,
    pub store_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub status: OrderStatus,
}
