//! Events that trigger state transitions

use super::state::Language;
use crate::db::{NewOrder, Order};
use serde::{Deserialize, Serialize};

/// Structured choice decoded once from a button or quick-reply payload token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    Language(Language),
    GetStarted,
    MenuOrder,
    MenuOrderProducts,
    MenuOrderHistory,
    MenuAbout,
    MenuHelp,
    MenuChangeLanguage,
    MainMenu,
    ShowMenu,
    /// Catalog payload code, e.g. `CHOCOLATE_CAKE`
    OrderProduct(String),
    Quantity(u32),
    AddMore,
    Checkout,
    GoBack,
    Pickup,
    Delivery,
    ConfirmOrder,
    CancelOrder,
    Rating(u8),
    SkipRating,
    Reorder(i64),
    RateOrder(i64),
    /// Anything the bot never emits
    Unknown(String),
}

impl Payload {
    pub fn parse(token: &str) -> Self {
        let token = token.trim();
        match token {
            "LANG_EN" => return Payload::Language(Language::En),
            "LANG_MY" => return Payload::Language(Language::My),
            "GET_STARTED" => return Payload::GetStarted,
            "MENU_ORDER" => return Payload::MenuOrder,
            "MENU_ORDER_PRODUCTS" => return Payload::MenuOrderProducts,
            "MENU_ORDER_HISTORY" => return Payload::MenuOrderHistory,
            "MENU_ABOUT" => return Payload::MenuAbout,
            "MENU_HELP" => return Payload::MenuHelp,
            "MENU_CHANGE_LANG" => return Payload::MenuChangeLanguage,
            "MAIN_MENU" => return Payload::MainMenu,
            "SHOW_MENU" => return Payload::ShowMenu,
            "ADD_MORE_ITEMS" => return Payload::AddMore,
            "CHECKOUT" => return Payload::Checkout,
            "GO_BACK" => return Payload::GoBack,
            "PICKUP" => return Payload::Pickup,
            "DELIVERY" => return Payload::Delivery,
            "CONFIRM_ORDER" => return Payload::ConfirmOrder,
            "CANCEL_ORDER" => return Payload::CancelOrder,
            "SKIP_RATING" => return Payload::SkipRating,
            _ => {}
        }

        // Longer prefixes first: RATE_ORDER_ and REORDER_ both contain ORDER_
        if let Some(id) = token.strip_prefix("REORDER_") {
            if let Ok(id) = id.parse() {
                return Payload::Reorder(id);
            }
        } else if let Some(id) = token.strip_prefix("RATE_ORDER_") {
            if let Ok(id) = id.parse() {
                return Payload::RateOrder(id);
            }
        } else if let Some(stars) = token.strip_prefix("RATING_") {
            if let Ok(stars @ 1..=5) = stars.parse() {
                return Payload::Rating(stars);
            }
        } else if let Some(qty) = token.strip_prefix("QTY_") {
            if let Ok(qty @ 1..=5) = qty.parse() {
                return Payload::Quantity(qty);
            }
        } else if let Some(code) = token.strip_prefix("ORDER_") {
            if !code.is_empty() {
                return Payload::OrderProduct(code.to_string());
            }
        }

        Payload::Unknown(token.to_string())
    }

    /// Wire token for buttons
    pub fn to_token(&self) -> String {
        match self {
            Payload::Language(Language::En) => "LANG_EN".to_string(),
            Payload::Language(Language::My) => "LANG_MY".to_string(),
            Payload::GetStarted => "GET_STARTED".to_string(),
            Payload::MenuOrder => "MENU_ORDER".to_string(),
            Payload::MenuOrderProducts => "MENU_ORDER_PRODUCTS".to_string(),
            Payload::MenuOrderHistory => "MENU_ORDER_HISTORY".to_string(),
            Payload::MenuAbout => "MENU_ABOUT".to_string(),
            Payload::MenuHelp => "MENU_HELP".to_string(),
            Payload::MenuChangeLanguage => "MENU_CHANGE_LANG".to_string(),
            Payload::MainMenu => "MAIN_MENU".to_string(),
            Payload::ShowMenu => "SHOW_MENU".to_string(),
            Payload::OrderProduct(code) => format!("ORDER_{code}"),
            Payload::Quantity(n) => format!("QTY_{n}"),
            Payload::AddMore => "ADD_MORE_ITEMS".to_string(),
            Payload::Checkout => "CHECKOUT".to_string(),
            Payload::GoBack => "GO_BACK".to_string(),
            Payload::Pickup => "PICKUP".to_string(),
            Payload::Delivery => "DELIVERY".to_string(),
            Payload::ConfirmOrder => "CONFIRM_ORDER".to_string(),
            Payload::CancelOrder => "CANCEL_ORDER".to_string(),
            Payload::Rating(n) => format!("RATING_{n}"),
            Payload::SkipRating => "SKIP_RATING".to_string(),
            Payload::Reorder(id) => format!("REORDER_{id}"),
            Payload::RateOrder(id) => format!("RATE_ORDER_{id}"),
            Payload::Unknown(raw) => raw.clone(),
        }
    }
}

/// Events that can occur in a conversation
#[derive(Debug, Clone)]
pub enum Event {
    /// Free text typed by the customer
    Text { text: String },

    /// Button or quick-reply selection
    Choice { payload: Payload },

    // Order store results
    OrderPlaced { order_id: i64, order: NewOrder },
    OrderFailed { reason: String },
    HistoryLoaded { orders: Vec<Order> },
    HistoryFailed { reason: String },
    ReorderLoaded { order: Order },
    ReorderFailed { order_id: i64, reason: String },
    RatingSaved { stars: u8, language: Language },
    RatingFailed { reason: String, language: Language },
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Event::Text { text: text.into() }
    }

    pub fn choice(payload: Payload) -> Self {
        Event::Choice { payload }
    }
}
