//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::db::{Database, DbError, NewOrder, NewRating, Order, OrderStatus};
use crate::messenger::GatewayError;
use crate::state_machine::{Button, Card, Conversation};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(i64),
    #[error("{0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::OrderNotFound(id) => StoreError::NotFound(id),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Durable storage for orders and ratings
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order with its items, returning the assigned id
    async fn create_order(&self, order: &NewOrder) -> Result<i64, StoreError>;

    async fn get_order(&self, id: i64) -> Result<Order, StoreError>;

    /// All orders, newest first
    async fn list_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Orders placed by one sender, newest first
    async fn list_orders_for_sender(&self, sender_id: &str) -> Result<Vec<Order>, StoreError>;

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<(), StoreError>;

    async fn create_rating(&self, rating: &NewRating) -> Result<i64, StoreError>;
}

/// Outbound chat channel
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), GatewayError>;

    async fn send_quick_replies(
        &self,
        recipient: &str,
        text: &str,
        choices: &[Button],
    ) -> Result<(), GatewayError>;

    async fn send_carousel(&self, recipient: &str, cards: &[Card]) -> Result<(), GatewayError>;

    async fn send_typing(&self, recipient: &str, on: bool) -> Result<(), GatewayError>;
}

/// Per-sender dialog records
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Current record, or a fresh one for an unknown sender
    async fn get(&self, sender_id: &str) -> Conversation;

    async fn put(&self, sender_id: &str, conversation: Conversation);

    async fn reset(&self, sender_id: &str);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: OrderStore + ?Sized> OrderStore for Arc<T> {
    async fn create_order(&self, order: &NewOrder) -> Result<i64, StoreError> {
        (**self).create_order(order).await
    }

    async fn get_order(&self, id: i64) -> Result<Order, StoreError> {
        (**self).get_order(id).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders().await
    }

    async fn list_orders_for_sender(&self, sender_id: &str) -> Result<Vec<Order>, StoreError> {
        (**self).list_orders_for_sender(sender_id).await
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<(), StoreError> {
        (**self).update_order_status(id, status).await
    }

    async fn create_rating(&self, rating: &NewRating) -> Result<i64, StoreError> {
        (**self).create_rating(rating).await
    }
}

#[async_trait]
impl<T: MessagingGateway + ?Sized> MessagingGateway for Arc<T> {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), GatewayError> {
        (**self).send_text(recipient, text).await
    }

    async fn send_quick_replies(
        &self,
        recipient: &str,
        text: &str,
        choices: &[Button],
    ) -> Result<(), GatewayError> {
        (**self).send_quick_replies(recipient, text, choices).await
    }

    async fn send_carousel(&self, recipient: &str, cards: &[Card]) -> Result<(), GatewayError> {
        (**self).send_carousel(recipient, cards).await
    }

    async fn send_typing(&self, recipient: &str, on: bool) -> Result<(), GatewayError> {
        (**self).send_typing(recipient, on).await
    }
}

#[async_trait]
impl<T: ConversationStore + ?Sized> ConversationStore for Arc<T> {
    async fn get(&self, sender_id: &str) -> Conversation {
        (**self).get(sender_id).await
    }

    async fn put(&self, sender_id: &str, conversation: Conversation) {
        (**self).put(sender_id, conversation).await;
    }

    async fn reset(&self, sender_id: &str) {
        (**self).reset(sender_id).await;
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as `OrderStore`
#[derive(Clone)]
pub struct DatabaseOrderStore {
    db: Database,
}

impl DatabaseOrderStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Used in tests
    pub fn inner(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl OrderStore for DatabaseOrderStore {
    async fn create_order(&self, order: &NewOrder) -> Result<i64, StoreError> {
        Ok(self.db.create_order(order)?)
    }

    async fn get_order(&self, id: i64) -> Result<Order, StoreError> {
        Ok(self.db.get_order(id)?)
    }

    async fn list_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.db.list_orders()?)
    }

    async fn list_orders_for_sender(&self, sender_id: &str) -> Result<Vec<Order>, StoreError> {
        Ok(self.db.list_orders_for_sender(sender_id)?)
    }

    async fn update_order_status(&self, id: i64, status: OrderStatus) -> Result<(), StoreError> {
        Ok(self.db.update_order_status(id, status)?)
    }

    async fn create_rating(&self, rating: &NewRating) -> Result<i64, StoreError> {
        Ok(self.db.create_rating(rating)?)
    }
}

/// Process-local conversation records
///
/// Idle records are dropped rather than stored, so the map only holds senders
/// with a dialog in progress.
#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of senders with a dialog in progress
    #[allow(dead_code)] // Used in tests
    pub async fn active_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, sender_id: &str) -> Conversation {
        self.conversations
            .read()
            .await
            .get(sender_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn put(&self, sender_id: &str, conversation: Conversation) {
        let mut conversations = self.conversations.write().await;
        if conversation.is_idle() {
            conversations.remove(sender_id);
        } else {
            conversations.insert(sender_id.to_string(), conversation);
        }
    }

    async fn reset(&self, sender_id: &str) {
        self.conversations.write().await.remove(sender_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::DialogState;

    #[tokio::test]
    async fn test_unknown_sender_gets_fresh_conversation() {
        let store = InMemoryConversationStore::new();
        assert!(store.get("nobody").await.is_idle());
    }

    #[tokio::test]
    async fn test_put_get_reset() {
        let store = InMemoryConversationStore::new();
        let conv = Conversation::default().with_state(DialogState::AwaitingName);

        store.put("a", conv.clone()).await;
        assert_eq!(store.get("a").await, conv);
        assert!(store.get("b").await.is_idle());
        assert_eq!(store.active_count().await, 1);

        store.reset("a").await;
        assert!(store.get("a").await.is_idle());
        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_idle_put_drops_entry() {
        let store = InMemoryConversationStore::new();
        store
            .put("a", Conversation::default().with_state(DialogState::MainMenu))
            .await;
        store.put("a", Conversation::default()).await;
        assert_eq!(store.active_count().await, 0);
    }

    #[tokio::test]
    async fn test_database_store_maps_missing_order() {
        let store = DatabaseOrderStore::new(Database::open_in_memory().unwrap());
        assert!(matches!(
            store.get_order(42).await,
            Err(StoreError::NotFound(42))
        ));
        assert!(matches!(
            store.update_order_status(42, OrderStatus::Ready).await,
            Err(StoreError::NotFound(42))
        ));
    }

    #[tokio::test]
    async fn test_database_store_round_trips_ratings() {
        use crate::db::{DeliveryType, OrderItem};

        let store = DatabaseOrderStore::new(Database::open_in_memory().unwrap());
        let order_id = store
            .create_order(&NewOrder {
                customer_name: "Hla".to_string(),
                delivery_type: DeliveryType::Delivery,
                address: "12 Downtown Rd".to_string(),
                status: OrderStatus::Pending,
                items: vec![OrderItem {
                    product: "Croissant".to_string(),
                    quantity: 3,
                    price: 350,
                }],
                total_items: 3,
                subtotal: 1050,
                delivery_fee: 300,
                total: 1350,
                sender_id: Some("psid".to_string()),
            })
            .await
            .unwrap();

        for stars in [5, 2] {
            store
                .create_rating(&NewRating {
                    order_id,
                    user_id: "psid".to_string(),
                    stars,
                    comment: None,
                })
                .await
                .unwrap();
        }

        let ratings = store.inner().ratings_for_order(order_id).unwrap();
        let stars: Vec<u8> = ratings.iter().map(|r| r.stars).collect();
        assert_eq!(stars, vec![5, 2]);
        assert_eq!(
            store.list_orders_for_sender("psid").await.unwrap()[0].total,
            1350
        );
    }
}
