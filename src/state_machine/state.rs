//! Conversation state types

use crate::config::Storefront;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Step of the ordering dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    #[default]
    LanguageSelection,
    Greeting,
    MainMenu,
    AwaitingProduct,
    AwaitingQuantity,
    AwaitingCartDecision,
    AwaitingName,
    AwaitingDeliveryType,
    AwaitingAddress,
    Confirming,
    /// Side branch entered from order history, not part of checkout
    AwaitingRating,
}

impl DialogState {
    pub const ALL: [DialogState; 11] = [
        DialogState::LanguageSelection,
        DialogState::Greeting,
        DialogState::MainMenu,
        DialogState::AwaitingProduct,
        DialogState::AwaitingQuantity,
        DialogState::AwaitingCartDecision,
        DialogState::AwaitingName,
        DialogState::AwaitingDeliveryType,
        DialogState::AwaitingAddress,
        DialogState::Confirming,
        DialogState::AwaitingRating,
    ];

    /// States between the first cart commit and confirmation
    pub fn is_checkout_chain(self) -> bool {
        matches!(
            self,
            DialogState::AwaitingQuantity
                | DialogState::AwaitingCartDecision
                | DialogState::AwaitingName
                | DialogState::AwaitingDeliveryType
                | DialogState::AwaitingAddress
                | DialogState::Confirming
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DialogState::LanguageSelection => "language_selection",
            DialogState::Greeting => "greeting",
            DialogState::MainMenu => "main_menu",
            DialogState::AwaitingProduct => "awaiting_product",
            DialogState::AwaitingQuantity => "awaiting_quantity",
            DialogState::AwaitingCartDecision => "awaiting_cart_decision",
            DialogState::AwaitingName => "awaiting_name",
            DialogState::AwaitingDeliveryType => "awaiting_delivery_type",
            DialogState::AwaitingAddress => "awaiting_address",
            DialogState::Confirming => "confirming",
            DialogState::AwaitingRating => "awaiting_rating",
        }
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    My,
}

impl Language {
    /// Pick the English or Myanmar variant of a text
    pub fn pick<'a>(self, en: &'a str, my: &'a str) -> &'a str {
        match self {
            Language::En => en,
            Language::My => my,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

impl DeliveryType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryType::Pickup => "pickup",
            DeliveryType::Delivery => "delivery",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pickup" => Some(DeliveryType::Pickup),
            "delivery" => Some(DeliveryType::Delivery),
            _ => None,
        }
    }

    /// Capitalized label with icon, e.g. "🚚 Delivery"
    pub fn label(self) -> &'static str {
        match self {
            DeliveryType::Pickup => "🏠 Pickup",
            DeliveryType::Delivery => "🚚 Delivery",
        }
    }
}

/// One committed cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: String,
    pub emoji: String,
    pub quantity: u32,
}

/// Per-sender dialog record
///
/// The cart only grows through the quantity commit (or is replaced wholesale
/// by a reorder); the `current_*` scratch slots are empty outside of
/// `AwaitingQuantity`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Conversation {
    pub state: DialogState,
    pub language: Option<Language>,
    pub cart: Vec<CartItem>,
    pub current_product: Option<String>,
    pub current_emoji: Option<String>,
    pub current_quantity: Option<u32>,
    pub customer_name: Option<String>,
    pub delivery_type: Option<DeliveryType>,
    pub address: Option<String>,
    /// Order being rated while in `AwaitingRating`
    pub rating_order_id: Option<i64>,
}

impl Conversation {
    /// Language to render in; English until the customer picks one
    pub fn lang(&self) -> Language {
        self.language.unwrap_or_default()
    }

    /// Total number of units across all cart lines
    pub fn item_count(&self) -> u32 {
        self.cart.iter().map(|item| item.quantity).sum()
    }

    pub fn with_state(mut self, state: DialogState) -> Self {
        self.state = state;
        self
    }

    pub fn clear_scratch(&mut self) {
        self.current_product = None;
        self.current_emoji = None;
        self.current_quantity = None;
    }

    pub fn is_idle(&self) -> bool {
        *self == Conversation::default()
    }
}

/// Everything a transition may read besides the conversation itself
#[derive(Debug, Clone)]
pub struct DialogContext {
    pub sender_id: String,
    pub shop: Arc<Storefront>,
    pub now: DateTime<FixedOffset>,
}

impl DialogContext {
    pub fn new(sender_id: impl Into<String>, shop: Arc<Storefront>, now: DateTime<FixedOffset>) -> Self {
        Self {
            sender_id: sender_id.into(),
            shop,
            now,
        }
    }

    pub fn ordering_allowed(&self) -> bool {
        self.shop.hours.is_ordering_allowed(&self.now)
    }
}
