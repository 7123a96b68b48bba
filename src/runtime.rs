//! Runtime for executing conversations
//!
//! One worker task per Messenger sender drains that sender's events in
//! arrival order; different senders proceed in parallel.

mod executor;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{Clock, ConversationRuntime};
pub use traits::*;

use crate::config::Storefront;
use crate::state_machine::{Event, Payload};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Type alias for production runtime with shared collaborators
pub type ProductionRuntime = ConversationRuntime<
    Arc<dyn OrderStore>,
    Arc<dyn MessagingGateway>,
    Arc<dyn ConversationStore>,
>;

const EVENT_CHANNEL_SIZE: usize = 32;

/// Handle to interact with a running conversation
pub struct ConversationHandle {
    pub event_tx: mpsc::Sender<Event>,
    task: JoinHandle<()>,
}

/// Manager for all conversation runtimes
pub struct RuntimeManager {
    shop: Arc<Storefront>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn MessagingGateway>,
    conversations: Arc<dyn ConversationStore>,
    clock: Option<Clock>,
    runtimes: Arc<RwLock<HashMap<String, ConversationHandle>>>,
}

impl RuntimeManager {
    pub fn new(
        shop: Arc<Storefront>,
        orders: Arc<dyn OrderStore>,
        gateway: Arc<dyn MessagingGateway>,
        conversations: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            shop,
            orders,
            gateway,
            conversations,
            clock: None,
            runtimes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Replace the wall clock for every runtime started from now on
    #[allow(dead_code)] // Used in tests
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Get or create the runtime for a sender
    pub async fn get_or_create(&self, sender_id: &str) -> mpsc::Sender<Event> {
        // Check if already running
        {
            let runtimes = self.runtimes.read().await;
            if let Some(handle) = runtimes.get(sender_id) {
                if !handle.event_tx.is_closed() {
                    return handle.event_tx.clone();
                }
            }
        }

        // Re-check under the write lock so a sender never gets two workers
        let mut runtimes = self.runtimes.write().await;
        if let Some(handle) = runtimes.get(sender_id) {
            if !handle.event_tx.is_closed() {
                return handle.event_tx.clone();
            }
        }
        // A worker that is shutting down may still be draining its queue
        let previous = runtimes.remove(sender_id).map(|handle| handle.task);

        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_SIZE);
        let mut runtime: ProductionRuntime = ConversationRuntime::new(
            sender_id,
            self.shop.clone(),
            self.orders.clone(),
            self.gateway.clone(),
            self.conversations.clone(),
            event_rx,
        );
        if let Some(clock) = self.clock {
            runtime = runtime.with_clock(clock);
        }

        // Start runtime in background once the previous worker is done
        let registry = self.runtimes.clone();
        let key = sender_id.to_string();
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::error!(sender_id = %key, error = %e, "Previous conversation runtime panicked");
                }
            }
            runtime.run().await;

            // Forget the worker unless a newer one already took its place
            let mut runtimes = registry.write().await;
            if runtimes
                .get(&key)
                .is_some_and(|handle| handle.event_tx.is_closed())
            {
                runtimes.remove(&key);
            }
        });

        runtimes.insert(
            sender_id.to_string(),
            ConversationHandle {
                event_tx: event_tx.clone(),
                task,
            },
        );
        tracing::debug!(sender_id = %sender_id, active = runtimes.len(), "Conversation runtime created");

        event_tx
    }

    /// Queue an event for a sender's conversation without waiting on its worker
    pub async fn send_event(&self, sender_id: &str, event: Event) -> Result<(), String> {
        let event_tx = self.get_or_create(sender_id).await;
        let event = match event_tx.try_send(event) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Full(event)) => {
                tracing::warn!(sender_id = %sender_id, event = ?event, "Conversation queue full, dropping event");
                return Err("conversation queue is full".to_string());
            }
            // The worker stopped between lookup and send
            Err(TrySendError::Closed(event)) => event,
        };

        self.get_or_create(sender_id)
            .await
            .try_send(event)
            .map_err(|e| format!("Failed to send event: {e}"))
    }

    /// Free text typed by a customer
    pub async fn handle_inbound_text(&self, sender_id: &str, text: &str) -> Result<(), String> {
        self.send_event(sender_id, Event::text(text)).await
    }

    /// Button, quick-reply or postback token from a customer
    pub async fn handle_inbound_choice(&self, sender_id: &str, token: &str) -> Result<(), String> {
        let payload = Payload::parse(token);
        if let Payload::Unknown(raw) = &payload {
            tracing::warn!(sender_id = %sender_id, payload = %raw, "Unknown payload");
        }
        self.send_event(sender_id, Event::choice(payload)).await
    }

    pub fn orders(&self) -> &Arc<dyn OrderStore> {
        &self.orders
    }

    pub fn gateway(&self) -> &Arc<dyn MessagingGateway> {
        &self.gateway
    }

    /// Number of senders with a worker task
    #[allow(dead_code)] // Used in tests
    pub async fn active_runtimes(&self) -> usize {
        self.runtimes.read().await.len()
    }
}
