//! Per-state navigation tables
//!
//! `back_target` names the predecessor of each checkout step and
//! `fallback` the re-prompt for input the current state can't use. Both are
//! exhaustive matches so a new state can't be added without deciding them.

use super::effect::Effect;
use super::event::Payload;
use super::prompts;
use super::state::{Conversation, DeliveryType, DialogContext, DialogState};
use super::transition::{start_ordering_flow, totals, TransitionResult};

/// Renders the response for a state without consuming new input
pub type Handler = fn(&Conversation, &DialogContext) -> TransitionResult;

/// Where "Back" leads from each state; `None` falls through to the main menu
pub fn back_target(state: DialogState) -> Option<Handler> {
    match state {
        DialogState::AwaitingQuantity => Some(back_to_products),
        DialogState::AwaitingCartDecision => Some(review_cart),
        DialogState::AwaitingName => Some(back_to_cart_decision),
        DialogState::AwaitingDeliveryType => Some(back_to_name),
        DialogState::AwaitingAddress => Some(back_to_delivery_type),
        DialogState::Confirming => Some(back_from_confirming),
        DialogState::LanguageSelection
        | DialogState::Greeting
        | DialogState::MainMenu
        | DialogState::AwaitingProduct
        | DialogState::AwaitingRating => None,
    }
}

/// Re-prompt for text that matched no rule in the current state
pub fn fallback(state: DialogState) -> Handler {
    match state {
        DialogState::LanguageSelection => |conv, _| {
            TransitionResult::unchanged(conv).with_effects(prompts::language_selection())
        },
        DialogState::Greeting => |conv, _| start_ordering_flow(conv),
        DialogState::MainMenu => {
            |conv, _| TransitionResult::unchanged(conv).with_effect(prompts::main_menu_hint())
        }
        DialogState::AwaitingProduct => |conv, ctx| {
            TransitionResult::unchanged(conv)
                .with_effect(Effect::text("Please select a product using the buttons:"))
                .with_effect(prompts::product_carousel(&ctx.shop.catalog))
        },
        DialogState::AwaitingQuantity => |conv, _| {
            let emoji = conv.current_emoji.as_deref().unwrap_or_default();
            let product = conv.current_product.as_deref().unwrap_or_default();
            TransitionResult::unchanged(conv)
                .with_effect(Effect::text("Please select quantity using the buttons:"))
                .with_effect(prompts::ask_quantity(emoji, product))
        },
        DialogState::AwaitingCartDecision => |conv, _| {
            TransitionResult::unchanged(conv)
                .with_effect(Effect::text("Please choose an option:"))
                .with_effect(prompts::added_to_cart(conv))
        },
        DialogState::AwaitingName => {
            |conv, _| TransitionResult::unchanged(conv).with_effect(prompts::ask_name())
        }
        DialogState::AwaitingDeliveryType => |conv, _| {
            TransitionResult::unchanged(conv)
                .with_effect(Effect::text("Please select pickup or delivery:"))
                .with_effect(prompts::ask_delivery_type(
                    conv.customer_name.as_deref().unwrap_or_default(),
                ))
        },
        DialogState::AwaitingAddress => {
            |conv, _| TransitionResult::unchanged(conv).with_effect(prompts::ask_address())
        }
        DialogState::Confirming => |conv, ctx| {
            let summary = prompts::order_summary(conv, ctx, &totals(conv, ctx));
            TransitionResult::unchanged(conv)
                .with_effect(Effect::text("Please confirm your order:"))
                .with_effect(summary)
        },
        DialogState::AwaitingRating => |conv, _| {
            TransitionResult::unchanged(conv).with_effect(prompts::ask_rating(conv.lang()))
        },
    }
}

/// The only state in which a slot payload is accepted, if it is one
pub fn slot_state(payload: &Payload) -> Option<DialogState> {
    match payload {
        Payload::OrderProduct(_) => Some(DialogState::AwaitingProduct),
        Payload::Quantity(_) => Some(DialogState::AwaitingQuantity),
        Payload::AddMore | Payload::Checkout => Some(DialogState::AwaitingCartDecision),
        Payload::Pickup | Payload::Delivery => Some(DialogState::AwaitingDeliveryType),
        Payload::ConfirmOrder => Some(DialogState::Confirming),
        Payload::Rating(_) | Payload::SkipRating => Some(DialogState::AwaitingRating),
        _ => None,
    }
}

pub fn out_of_sequence_message(payload: &Payload) -> &'static str {
    match payload {
        Payload::OrderProduct(_) => prompts::PRODUCT_OUT_OF_SEQUENCE,
        Payload::Quantity(_) => prompts::QUANTITY_OUT_OF_SEQUENCE,
        _ => prompts::STEP_OUT_OF_SEQUENCE,
    }
}

// ============================================================
// Back Handlers
// ============================================================

fn back_to_products(conv: &Conversation, ctx: &DialogContext) -> TransitionResult {
    let mut next = conv.clone().with_state(DialogState::AwaitingProduct);
    next.clear_scratch();
    TransitionResult::new(next).with_effect(prompts::product_carousel(&ctx.shop.catalog))
}

fn review_cart(conv: &Conversation, _ctx: &DialogContext) -> TransitionResult {
    TransitionResult::unchanged(conv)
        .with_effect(prompts::cart_contents(&conv.cart))
        .with_effect(Effect::quick_replies(
            "What would you like to do next?",
            prompts::cart_decision_choices(conv.item_count()),
        ))
}

fn back_to_cart_decision(conv: &Conversation, _ctx: &DialogContext) -> TransitionResult {
    let next = conv.clone().with_state(DialogState::AwaitingCartDecision);
    let prompt = prompts::added_to_cart(&next);
    TransitionResult::new(next).with_effect(prompt)
}

fn back_to_name(conv: &Conversation, _ctx: &DialogContext) -> TransitionResult {
    TransitionResult::new(conv.clone().with_state(DialogState::AwaitingName))
        .with_effect(prompts::ask_name())
}

fn back_to_delivery_type(conv: &Conversation, _ctx: &DialogContext) -> TransitionResult {
    let name = conv.customer_name.as_deref().unwrap_or_default();
    TransitionResult::new(conv.clone().with_state(DialogState::AwaitingDeliveryType))
        .with_effect(prompts::ask_delivery_type(name))
}

fn back_from_confirming(conv: &Conversation, ctx: &DialogContext) -> TransitionResult {
    match conv.delivery_type {
        Some(DeliveryType::Delivery) => {
            TransitionResult::new(conv.clone().with_state(DialogState::AwaitingAddress))
                .with_effect(prompts::ask_address())
        }
        Some(DeliveryType::Pickup) | None => back_to_delivery_type(conv, ctx),
    }
}
