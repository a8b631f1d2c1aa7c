//! Domain events
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::Money;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Cart(CartEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartEvent {
    ItemAdded { store_id: i32, product_id: i32, quantity: i32 },
    ItemRemoved { store_id: i32, product_id: i32 },
    CheckedOut { store_id: i32, line_count: usize, total_amount: Money },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> String {
        let kind = match self {
            Self::Cart(CartEvent::ItemAdded { .. }) => "item_added",
            Self::Cart(CartEvent::ItemRemoved { .. }) => "item_removed",
            Self::Cart(CartEvent::CheckedOut { .. }) => "checked_out",
        };
        format!("ecommerce.cart.{kind}")
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn new(event: DomainEvent) -> Self {
        Self { event_id: Uuid::now_v7(), occurred_at: Utc::now(), event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects() {
        let e = DomainEvent::Cart(CartEvent::ItemRemoved { store_id: 1, product_id: 2 });
        assert_eq!(e.subject(), "ecommerce.cart.item_removed");
    }

    #[test]
    fn test_envelope_json_shape() {
        let env = EventEnvelope::new(DomainEvent::Cart(CartEvent::ItemAdded { store_id: 1, product_id: 9, quantity: 2 }));
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["event"]["type"], "cart");
        assert_eq!(json["event"]["kind"], "item_added");
        assert_eq!(json["event"]["quantity"], 2);
    }
}
