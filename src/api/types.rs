//! API request and response types

use crate::db::Order;
use serde::{Deserialize, Serialize};

// ============================================================
// Webhook
// ============================================================

/// Query string of the subscription handshake
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Page webhook delivery; may batch several entries
#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Deserialize)]
pub struct MessagingEvent {
    pub sender: Option<Participant>,
    pub message: Option<InboundMessage>,
    pub postback: Option<Postback>,
}

#[derive(Debug, Deserialize)]
pub struct Participant {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    pub text: Option<String>,
    pub quick_reply: Option<QuickReply>,
    #[serde(default)]
    pub is_echo: bool,
}

#[derive(Debug, Deserialize)]
pub struct QuickReply {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct Postback {
    pub payload: String,
}

/// What a single messaging event asks the bot to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    Choice(String),
}

impl MessagingEvent {
    /// Sender and action, or `None` for echoes, reads and deliveries
    pub fn inbound(&self) -> Option<(&str, Inbound)> {
        let sender = self.sender.as_ref()?.id.as_str();
        if let Some(message) = &self.message {
            if message.is_echo {
                return None;
            }
            // A tapped quick reply also carries its label as text
            if let Some(quick_reply) = &message.quick_reply {
                return Some((sender, Inbound::Choice(quick_reply.payload.clone())));
            }
            if let Some(text) = &message.text {
                return Some((sender, Inbound::Text(text.clone())));
            }
        }
        self.postback
            .as_ref()
            .map(|postback| (sender, Inbound::Choice(postback.payload.clone())))
    }
}

// ============================================================
// Admin
// ============================================================

/// Response with every order, newest first
#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub total: usize,
}

/// Request to move an order to a new status
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

/// Response for a status change and its customer notification
#[derive(Debug, Serialize)]
pub struct StatusUpdateResponse {
    pub success: bool,
    pub message: String,
    pub order_id: i64,
    pub new_status: String,
    pub notification_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_error: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
