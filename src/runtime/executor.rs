//! Per-sender conversation runtime

use super::traits::{ConversationStore, MessagingGateway, OrderStore};
use crate::config::Storefront;
use crate::messenger::GatewayError;
use crate::state_machine::{transition, DialogContext, Effect, Event};
use chrono::{DateTime, FixedOffset, Local};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A worker with no events for this long shuts down
const IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Source of "now" for the business-hours gate
pub type Clock = fn() -> DateTime<FixedOffset>;

fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

/// Runtime that serializes one sender's events through the state machine
pub struct ConversationRuntime<O, G, C>
where
    O: OrderStore + 'static,
    G: MessagingGateway + 'static,
    C: ConversationStore + 'static,
{
    sender_id: String,
    shop: Arc<Storefront>,
    orders: O,
    gateway: G,
    conversations: C,
    clock: Clock,
    idle_timeout: Duration,
    event_rx: mpsc::Receiver<Event>,
}

impl<O, G, C> ConversationRuntime<O, G, C>
where
    O: OrderStore + 'static,
    G: MessagingGateway + 'static,
    C: ConversationStore + 'static,
{
    pub fn new(
        sender_id: impl Into<String>,
        shop: Arc<Storefront>,
        orders: O,
        gateway: G,
        conversations: C,
        event_rx: mpsc::Receiver<Event>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            shop,
            orders,
            gateway,
            conversations,
            clock: local_now,
            idle_timeout: IDLE_TIMEOUT,
            event_rx,
        }
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replace how long the worker waits for the next event
    #[allow(dead_code)] // Used in tests
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Drain events until the conversation goes idle, the worker times out
    /// or every sender is dropped
    pub async fn run(mut self) {
        tracing::info!(sender_id = %self.sender_id, "Starting conversation runtime");

        // Process events in a loop - no recursion
        loop {
            let event = match tokio::time::timeout(self.idle_timeout, self.event_rx.recv()).await
            {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!(sender_id = %self.sender_id, "Conversation runtime idle timeout");
                    break;
                }
            };
            if self.process_event(event).await {
                break;
            }
        }

        // Refuse new events, then finish the ones already queued
        self.event_rx.close();
        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event).await;
        }

        tracing::info!(sender_id = %self.sender_id, "Conversation runtime stopped");
    }

    /// Returns whether the conversation is idle afterwards
    async fn process_event(&self, event: Event) -> bool {
        // Collaborator results are fed back through the same transition
        let mut events_to_process = VecDeque::from([event]);
        let mut idle = false;

        while let Some(current_event) = events_to_process.pop_front() {
            let conversation = self.conversations.get(&self.sender_id).await;
            let ctx = DialogContext::new(&self.sender_id, self.shop.clone(), (self.clock)());

            let result = transition(&conversation, &ctx, current_event);

            if result.new_state.state != conversation.state {
                tracing::debug!(
                    sender_id = %self.sender_id,
                    from = %conversation.state,
                    to = %result.new_state.state,
                    "Dialog state changed"
                );
            }

            idle = result.new_state.is_idle();

            // Commit before any effect so a failed send can't lose progress
            self.conversations
                .put(&self.sender_id, result.new_state)
                .await;

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await {
                    events_to_process.push_back(generated_event);
                }
            }
        }

        idle
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&self, effect: Effect) -> Option<Event> {
        let recipient = self.sender_id.as_str();
        match effect {
            Effect::SendText { text } => {
                if let Err(e) = self.gateway.send_text(recipient, &text).await {
                    log_send_failure(recipient, "text", &e);
                }
                None
            }

            Effect::SendQuickReplies { text, choices } => {
                if let Err(e) = self
                    .gateway
                    .send_quick_replies(recipient, &text, &choices)
                    .await
                {
                    log_send_failure(recipient, "quick replies", &e);
                }
                None
            }

            Effect::SendCarousel { cards } => {
                if let Err(e) = self.gateway.send_carousel(recipient, &cards).await {
                    log_send_failure(recipient, "carousel", &e);
                }
                None
            }

            Effect::Typing { on } => {
                if let Err(e) = self.gateway.send_typing(recipient, on).await {
                    tracing::debug!(sender_id = %recipient, error = %e, "Failed to send typing indicator");
                }
                None
            }

            Effect::PersistOrder { order } => match self.orders.create_order(&order).await {
                Ok(order_id) => {
                    tracing::info!(
                        sender_id = %recipient,
                        order_id,
                        total = order.total,
                        "Order placed"
                    );
                    Some(Event::OrderPlaced { order_id, order })
                }
                Err(e) => {
                    tracing::error!(sender_id = %recipient, error = %e, "Failed to save order");
                    Some(Event::OrderFailed {
                        reason: e.to_string(),
                    })
                }
            },

            Effect::LoadHistory => match self.orders.list_orders_for_sender(recipient).await {
                Ok(orders) => Some(Event::HistoryLoaded { orders }),
                Err(e) => {
                    tracing::error!(sender_id = %recipient, error = %e, "Failed to load order history");
                    Some(Event::HistoryFailed {
                        reason: e.to_string(),
                    })
                }
            },

            Effect::LoadOrderForReorder { order_id } => {
                match self.orders.get_order(order_id).await {
                    // Orders placed by someone else can't be reordered
                    Ok(order)
                        if order
                            .sender_id
                            .as_deref()
                            .is_some_and(|owner| owner != recipient) =>
                    {
                        tracing::warn!(sender_id = %recipient, order_id, "Reorder of foreign order refused");
                        Some(Event::ReorderFailed {
                            order_id,
                            reason: "order belongs to another customer".to_string(),
                        })
                    }
                    Ok(order) => Some(Event::ReorderLoaded { order }),
                    Err(e) => {
                        tracing::error!(sender_id = %recipient, order_id, error = %e, "Failed to load order for reorder");
                        Some(Event::ReorderFailed {
                            order_id,
                            reason: e.to_string(),
                        })
                    }
                }
            }

            Effect::PersistRating { rating, language } => {
                // Only the customer who placed an order may rate it
                match self.orders.get_order(rating.order_id).await {
                    Ok(order)
                        if order
                            .sender_id
                            .as_deref()
                            .is_some_and(|owner| owner != recipient) =>
                    {
                        tracing::warn!(sender_id = %recipient, order_id = rating.order_id, "Rating of foreign order refused");
                        return Some(Event::RatingFailed {
                            reason: "order belongs to another customer".to_string(),
                            language,
                        });
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(sender_id = %recipient, order_id = rating.order_id, error = %e, "Failed to load order for rating");
                        return Some(Event::RatingFailed {
                            reason: e.to_string(),
                            language,
                        });
                    }
                }

                match self.orders.create_rating(&rating).await {
                    Ok(_) => {
                        tracing::info!(
                            sender_id = %recipient,
                            order_id = rating.order_id,
                            stars = rating.stars,
                            "Rating saved"
                        );
                        Some(Event::RatingSaved {
                            stars: rating.stars,
                            language,
                        })
                    }
                    Err(e) => {
                        tracing::error!(sender_id = %recipient, error = %e, "Failed to save rating");
                        Some(Event::RatingFailed {
                            reason: e.to_string(),
                            language,
                        })
                    }
                }
            }
        }
    }
}

/// Transient Graph API trouble is a warning; anything else needs attention
fn log_send_failure(recipient: &str, what: &str, error: &GatewayError) {
    if error.kind.is_retryable() {
        tracing::warn!(sender_id = %recipient, kind = ?error.kind, error = %error, "Failed to send {what}");
    } else {
        tracing::error!(sender_id = %recipient, kind = ?error.kind, error = %error, "Failed to send {what}");
    }
}
