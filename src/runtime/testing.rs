//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::traits::*;
use crate::db::{NewOrder, NewRating, Order, OrderStatus};
use crate::messenger::GatewayError;
use crate::state_machine::{Button, Card};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Order Store
// ============================================================================

/// In-memory order store with switchable write failures
#[allow(dead_code)]
pub struct MockOrderStore {
    orders: Mutex<Vec<Order>>,
    ratings: Mutex<Vec<NewRating>>,
    fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl MockOrderStore {
    pub fn new() -> Self {
        Self {
            orders: Mutex::new(Vec::new()),
            ratings: Mutex::new(Vec::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every write fail until switched back
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Seed an order as-is
    pub fn insert(&self, order: Order) {
        self.orders.lock().unwrap().push(order);
    }

    pub fn all(&self) -> Vec<Order> {
        self.orders.lock().unwrap().clone()
    }

    pub fn status_of(&self, id: i64) -> Option<OrderStatus> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.status)
    }

    pub fn ratings(&self) -> Vec<NewRating> {
        self.ratings.lock().unwrap().clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("mock write failure".to_string()));
        }
        Ok(())
    }
}

impl Default for MockOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for MockOrderStore {
    async fn create_order(&self, order: &NewOrder) -> Result<i64, StoreError> {
        self.check_writable()?;
        let mut orders = self.orders.lock().unwrap();
        let id = orders.iter().map(|o| o.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        orders.push(Order {
            id,
            customer_name: order.customer_name.clone(),
            delivery_type: order.delivery_type,
            address: order.address.clone(),
            status: order.status,
            items: order.items.clone(),
            total_items: order.total_items,
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            total: order.total,
            sender_id: order.sender_id.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn get_order(&self, id: i64) -> Result<Order, StoreError> {
        self.orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut orders = self.all();
        orders.reverse();
        Ok(orders)
    }

    async fn list_orders_for_sender(&self, sender_id: &str) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .all()
            .into_iter()
            .filter(|o| o.sender_id.as_deref() == Some(sender_id))
            .collect();
        orders.reverse();
        Ok(orders)
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(StoreError::NotFound(id))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn create_rating(&self, rating: &NewRating) -> Result<i64, StoreError> {
        self.check_writable()?;
        let mut ratings = self.ratings.lock().unwrap();
        ratings.push(rating.clone());
        Ok(i64::try_from(ratings.len()).unwrap())
    }
}

// ============================================================================
// Recording Gateway
// ============================================================================

/// Outbound message captured by `RecordingGateway`
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Sent {
    Text {
        recipient: String,
        text: String,
    },
    QuickReplies {
        recipient: String,
        text: String,
        choices: Vec<Button>,
    },
    Carousel {
        recipient: String,
        cards: Vec<Card>,
    },
    Typing {
        recipient: String,
        on: bool,
    },
}

impl Sent {
    pub fn recipient(&self) -> &str {
        match self {
            Sent::Text { recipient, .. }
            | Sent::QuickReplies { recipient, .. }
            | Sent::Carousel { recipient, .. }
            | Sent::Typing { recipient, .. } => recipient,
        }
    }
}

/// Gateway that records every message, or rejects them all
#[allow(dead_code)]
pub struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

#[allow(dead_code)]
impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<Sent> {
        self.sent()
            .into_iter()
            .filter(|s| s.recipient() == recipient)
            .collect()
    }

    /// Texts of plain messages and quick-reply prompts, in send order
    pub fn texts_to(&self, recipient: &str) -> Vec<String> {
        self.sent_to(recipient)
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } | Sent::QuickReplies { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, message: Sent) -> Result<(), GatewayError> {
        if self.fail {
            return Err(GatewayError::network("mock gateway is down"));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), GatewayError> {
        self.record(Sent::Text {
            recipient: recipient.to_string(),
            text: text.to_string(),
        })
    }

    async fn send_quick_replies(
        &self,
        recipient: &str,
        text: &str,
        choices: &[Button],
    ) -> Result<(), GatewayError> {
        self.record(Sent::QuickReplies {
            recipient: recipient.to_string(),
            text: text.to_string(),
            choices: choices.to_vec(),
        })
    }

    async fn send_carousel(&self, recipient: &str, cards: &[Card]) -> Result<(), GatewayError> {
        self.record(Sent::Carousel {
            recipient: recipient.to_string(),
            cards: cards.to_vec(),
        })
    }

    async fn send_typing(&self, recipient: &str, on: bool) -> Result<(), GatewayError> {
        self.record(Sent::Typing {
            recipient: recipient.to_string(),
            on,
        })
    }
}

// ============================================================================
// Stalled Gateway
// ============================================================================

/// Gateway whose sends never complete, like a hung Graph API connection
pub struct StalledGateway;

impl StalledGateway {
    async fn hang() -> Result<(), GatewayError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for StalledGateway {
    async fn send_text(&self, _recipient: &str, _text: &str) -> Result<(), GatewayError> {
        Self::hang().await
    }

    async fn send_quick_replies(
        &self,
        _recipient: &str,
        _text: &str,
        _choices: &[Button],
    ) -> Result<(), GatewayError> {
        Self::hang().await
    }

    async fn send_carousel(&self, _recipient: &str, _cards: &[Card]) -> Result<(), GatewayError> {
        Self::hang().await
    }

    async fn send_typing(&self, _recipient: &str, _on: bool) -> Result<(), GatewayError> {
        Self::hang().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DeliveryType;

    fn new_order(sender: &str) -> NewOrder {
        NewOrder {
            customer_name: "Aung".to_string(),
            delivery_type: DeliveryType::Pickup,
            address: "Pickup at store".to_string(),
            status: OrderStatus::Pending,
            items: vec![],
            total_items: 0,
            subtotal: 0,
            delivery_fee: 0,
            total: 0,
            sender_id: Some(sender.to_string()),
        }
    }

    #[tokio::test]
    async fn test_mock_order_store() {
        let store = MockOrderStore::new();
        let a = store.create_order(&new_order("a")).await.unwrap();
        let b = store.create_order(&new_order("b")).await.unwrap();
        assert_eq!((a, b), (1, 2));

        let mine = store.list_orders_for_sender("a").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(store.list_orders().await.unwrap()[0].id, b);

        store.fail_writes(true);
        assert!(store.create_order(&new_order("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_recording_gateway() {
        let gateway = RecordingGateway::new();
        gateway.send_text("a", "hello").await.unwrap();
        gateway.send_typing("b", true).await.unwrap();
        assert_eq!(gateway.texts_to("a"), vec!["hello".to_string()]);
        assert_eq!(gateway.sent_to("b").len(), 1);

        let failing = RecordingGateway::failing();
        assert!(failing.send_text("a", "hello").await.is_err());
        assert!(failing.sent().is_empty());
    }
}
