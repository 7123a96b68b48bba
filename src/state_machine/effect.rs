//! Effects produced by state transitions

use super::event::Payload;
use super::state::Language;
use crate::db::{NewOrder, NewRating};
use serde::Serialize;

/// A labelled choice, rendered as a quick reply or a card button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub payload: String,
}

impl Button {
    pub fn new(label: impl Into<String>, payload: &Payload) -> Self {
        Self {
            label: label.into(),
            payload: payload.to_token(),
        }
    }
}

/// One element of a carousel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub title: String,
    pub subtitle: String,
    pub image_url: Option<String>,
    pub buttons: Vec<Button>,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SendText { text: String },

    SendQuickReplies { text: String, choices: Vec<Button> },

    SendCarousel { cards: Vec<Card> },

    Typing { on: bool },

    /// Submit a finalized order; answered with `OrderPlaced` or `OrderFailed`
    PersistOrder { order: NewOrder },

    /// Fetch the sender's orders; answered with `HistoryLoaded` or `HistoryFailed`
    LoadHistory,

    LoadOrderForReorder { order_id: i64 },

    PersistRating { rating: NewRating, language: Language },
}

impl Effect {
    pub fn text(text: impl Into<String>) -> Self {
        Effect::SendText { text: text.into() }
    }

    pub fn quick_replies(text: impl Into<String>, choices: Vec<Button>) -> Self {
        Effect::SendQuickReplies {
            text: text.into(),
            choices,
        }
    }

    pub fn typing() -> Self {
        Effect::Typing { on: true }
    }
}
