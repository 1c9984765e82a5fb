//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event")]
pub enum DomainEvent {
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, total: Decimal, item_count: usize },
    Canceled { order_id: Uuid, user_id: Uuid },
}

impl DomainEvent {
    /// Messaging subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "basket.orders.placed",
            Self::Order(OrderEvent::Canceled { .. }) => "basket.orders.canceled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let order_id = Uuid::now_v7();
        let event = DomainEvent::Order(OrderEvent::Canceled { order_id, user_id: Uuid::nil() });
        assert_eq!(event.subject(), "basket.orders.canceled");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregate"], "Order");
        assert_eq!(json["event"]["type"], "Canceled");
        assert_eq!(json["event"]["order_id"], order_id.to_string());
    }
}
