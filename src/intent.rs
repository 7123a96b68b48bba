//! Free-text intent matching
//!
//! Keyword containment in English and Myanmar. Rules are tried in order and
//! the first hit wins; slot rules only apply in the state that collects the
//! slot, so "I want 2 chocolate cakes" during product selection picks the
//! product and leaves the quantity for the next step.

use crate::catalog::Catalog;
use crate::state_machine::event::Payload;
use crate::state_machine::state::DialogState;

/// Commands available from every state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Cancel,
    Menu,
    Help,
    History,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Command(Command),
    /// Same meaning as pressing the button carrying this payload
    Slot(Payload),
    NoMatch,
}

const CANCEL_KEYWORDS: &[&str] = &["cancel", "reset", "start over", "ပယ်ဖျက်", "ပြန်စမယ်"];
const MENU_KEYWORDS: &[&str] = &["menu", "catalog", "product", "show me", "မီနူး", "ပစ္စည်း"];
const HELP_KEYWORDS: &[&str] = &["help", "how", "ကူညီ"];
const HISTORY_PHRASE: &str = "ငါ့မှာတာ";

const QUANTITY_KEYWORDS: [(u32, &[&str]); 5] = [
    (1, &["1", "one", "တစ်"]),
    (2, &["2", "two", "နှစ်"]),
    (3, &["3", "three", "သုံး"]),
    (4, &["4", "four", "လေး"]),
    (5, &["5", "five", "ငါး"]),
];

const PICKUP_KEYWORDS: &[&str] = &["pickup", "pick up", "ကိုယ်တိုင်ယူ"];
const DELIVERY_KEYWORDS: &[&str] = &["delivery", "deliver", "ပို့"];

/// Whole-message commands, checked after everything else
const EXACT_COMMANDS: &[(&str, Command)] = &[
    ("menu", Command::Menu),
    ("catalog", Command::Menu),
    ("help", Command::Help),
    ("?", Command::Help),
    ("cancel", Command::Cancel),
    ("reset", Command::Cancel),
    ("orders", Command::History),
    ("history", Command::History),
    ("my orders", Command::History),
];

fn contains_any<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    keywords.iter().any(|k| text.contains(k.as_ref()))
}

pub fn classify(text: &str, state: DialogState, catalog: &Catalog) -> Intent {
    let msg = text.trim().to_lowercase();

    if contains_any(&msg, CANCEL_KEYWORDS) {
        return Intent::Command(Command::Cancel);
    }
    if contains_any(&msg, MENU_KEYWORDS) {
        return Intent::Command(Command::Menu);
    }
    if msg == "?" || contains_any(&msg, HELP_KEYWORDS) {
        return Intent::Command(Command::Help);
    }
    if (msg.contains("order") && (msg.contains("history") || msg.contains("my")))
        || msg.contains(HISTORY_PHRASE)
    {
        return Intent::Command(Command::History);
    }

    match state {
        DialogState::AwaitingProduct => {
            if let Some(product) = catalog
                .products()
                .iter()
                .find(|p| contains_any(&msg, &p.keywords))
            {
                return Intent::Slot(Payload::OrderProduct(product.code.clone()));
            }
        }
        DialogState::AwaitingQuantity => {
            if let Some((qty, _)) = QUANTITY_KEYWORDS
                .iter()
                .find(|(_, words)| contains_any(&msg, words))
            {
                return Intent::Slot(Payload::Quantity(*qty));
            }
        }
        DialogState::AwaitingDeliveryType => {
            if contains_any(&msg, PICKUP_KEYWORDS) {
                return Intent::Slot(Payload::Pickup);
            }
            if contains_any(&msg, DELIVERY_KEYWORDS) {
                return Intent::Slot(Payload::Delivery);
            }
        }
        _ => {}
    }

    EXACT_COMMANDS
        .iter()
        .find(|(word, _)| msg == *word)
        .map_or(Intent::NoMatch, |(_, command)| Intent::Command(*command))
}
