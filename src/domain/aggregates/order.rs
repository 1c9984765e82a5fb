//! Order Aggregate

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::aggregates::Item;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::error::ShopError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Placed, Canceled }

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self { Self::Placed => "placed", Self::Canceled => "canceled" }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = ShopError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(Self::Placed),
            "canceled" => Ok(Self::Canceled),
            other => Err(ShopError::Internal(format!("unknown order status {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<Item>,
    pub total: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// A freshly placed order. The total is frozen here and never recomputed.
    pub fn place(user_id: Uuid, total: Decimal, now: DateTime<Utc>) -> Self {
        Self { id: Uuid::now_v7(), user_id, items: vec![], total, status: OrderStatus::Placed, created_at: now }
    }

    pub fn is_canceled(&self) -> bool { self.status == OrderStatus::Canceled }

    pub fn cancel_deadline(&self, window: Duration) -> DateTime<Utc> { self.created_at + window }

    /// Checks the placed → canceled transition without applying it.
    pub fn ensure_cancelable(&self, now: DateTime<Utc>, window: Duration) -> Result<(), ShopError> {
        if self.is_canceled() { return Err(ShopError::OrderAlreadyCanceled); }
        if now >= self.cancel_deadline(window) { return Err(ShopError::CancelWindowExpired(window.num_days())); }
        Ok(())
    }

    pub fn cancel(&mut self, now: DateTime<Utc>, window: Duration) -> Result<DomainEvent, ShopError> {
        self.ensure_cancelable(now, window)?;
        self.status = OrderStatus::Canceled;
        Ok(DomainEvent::Order(OrderEvent::Canceled { order_id: self.id, user_id: self.user_id }))
    }

    pub fn placed_event(&self) -> DomainEvent {
        DomainEvent::Order(OrderEvent::Placed { order_id: self.id, user_id: self.user_id, total: self.total, item_count: self.items.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_within_window() {
        let placed_at = Utc::now();
        let mut order = Order::place(Uuid::now_v7(), Decimal::from(60), placed_at);
        let event = order.cancel(placed_at + Duration::days(13), Duration::days(14)).unwrap();
        assert_eq!(order.status, OrderStatus::Canceled);
        assert!(matches!(event, DomainEvent::Order(OrderEvent::Canceled { .. })));
    }

    #[test]
    fn test_cancel_window_is_exclusive() {
        let placed_at = Utc::now();
        let mut order = Order::place(Uuid::now_v7(), Decimal::from(60), placed_at);
        let err = order.cancel(placed_at + Duration::days(14), Duration::days(14)).unwrap_err();
        assert!(matches!(err, ShopError::CancelWindowExpired(14)));
        assert_eq!(order.status, OrderStatus::Placed);
    }

    #[test]
    fn test_canceled_never_reopens() {
        let placed_at = Utc::now();
        let mut order = Order::place(Uuid::now_v7(), Decimal::from(60), placed_at);
        order.cancel(placed_at, Duration::days(14)).unwrap();
        assert!(matches!(order.cancel(placed_at, Duration::days(14)), Err(ShopError::OrderAlreadyCanceled)));
        assert_eq!(order.status, OrderStatus::Canceled);
    }

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!("canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Canceled);
        assert!("shipped".parse::<OrderStatus>().is_err());
    }
}
