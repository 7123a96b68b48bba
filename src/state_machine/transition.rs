//! Pure state transition function
//!
//! Given the same conversation, context and event this always produces the
//! same result; all I/O is described by the returned effects.

use super::effect::Effect;
use super::event::{Event, Payload};
use super::navigation;
use super::prompts;
use super::state::{CartItem, Conversation, DeliveryType, DialogContext, DialogState, Language};
use crate::db::{NewRating, Order};
use crate::finalizer;
use crate::intent::{self, Command, Intent};
use crate::pricing::{self, Totals, PICKUP_ADDRESS};

const MIN_NAME_CHARS: usize = 2;
const MIN_ADDRESS_CHARS: usize = 5;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: Conversation,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Conversation) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// Keep the conversation as it is
    pub fn unchanged(state: &Conversation) -> Self {
        Self::new(state.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Pure transition function
pub fn transition(conv: &Conversation, ctx: &DialogContext, event: Event) -> TransitionResult {
    let mut result = match event {
        Event::Text { text } => handle_text(conv, ctx, &text),
        Event::Choice { payload } => handle_choice(conv, ctx, payload),

        // Confirmation already reset the conversation; only the receipt is left
        Event::OrderPlaced { order_id, order } => TransitionResult::unchanged(conv).with_effect(
            finalizer::render_receipt(order_id, &order, &ctx.shop.catalog),
        ),
        Event::OrderFailed { .. } => {
            TransitionResult::new(Conversation::default()).with_effect(Effect::text(prompts::ORDER_FAILED))
        }

        Event::HistoryLoaded { orders } => TransitionResult::unchanged(conv).with_effects(
            prompts::order_history(&orders, conv.lang(), &ctx.shop.catalog),
        ),
        Event::HistoryFailed { .. } => {
            TransitionResult::unchanged(conv).with_effect(prompts::history_failed())
        }

        Event::ReorderLoaded { order } => reorder(conv, ctx, &order),
        Event::ReorderFailed { .. } => {
            TransitionResult::unchanged(conv).with_effect(prompts::reorder_failed())
        }

        Event::RatingSaved { stars, language } => TransitionResult::new(Conversation::default())
            .with_effect(prompts::rating_thanks(stars, language)),
        Event::RatingFailed { language, .. } => TransitionResult::new(Conversation::default())
            .with_effect(prompts::rating_failed(language)),
    };

    // Scratch slots only live while a quantity is being chosen
    if result.new_state.state != DialogState::AwaitingQuantity {
        result.new_state.clear_scratch();
    }
    result
}

// ============================================================
// Free Text
// ============================================================

fn handle_text(conv: &Conversation, ctx: &DialogContext, text: &str) -> TransitionResult {
    match intent::classify(text, conv.state, &ctx.shop.catalog) {
        Intent::Command(Command::Cancel) => cancel(),
        Intent::Command(Command::Menu) => show_menu(conv, ctx),
        Intent::Command(Command::Help) => show_help(conv),
        Intent::Command(Command::History) => {
            TransitionResult::unchanged(conv).with_effect(Effect::LoadHistory)
        }
        Intent::Slot(payload) => handle_choice(conv, ctx, payload),
        Intent::NoMatch => match conv.state {
            DialogState::AwaitingName => accept_name(conv, text),
            DialogState::AwaitingAddress => accept_address(conv, ctx, text),
            state => navigation::fallback(state)(conv, ctx),
        },
    }
}

fn accept_name(conv: &Conversation, text: &str) -> TransitionResult {
    let name = text.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        return TransitionResult::unchanged(conv).with_effect(Effect::text(prompts::INVALID_NAME));
    }

    let mut next = conv.clone().with_state(DialogState::AwaitingDeliveryType);
    next.customer_name = Some(name.to_string());
    TransitionResult::new(next).with_effect(prompts::ask_delivery_type(name))
}

fn accept_address(conv: &Conversation, ctx: &DialogContext, text: &str) -> TransitionResult {
    let address = text.trim();
    if address.chars().count() < MIN_ADDRESS_CHARS {
        return TransitionResult::unchanged(conv)
            .with_effect(Effect::text(prompts::INVALID_ADDRESS));
    }

    let mut next = conv.clone().with_state(DialogState::Confirming);
    next.address = Some(address.to_string());
    show_summary(next, ctx)
}

// ============================================================
// Structured Choices
// ============================================================

fn handle_choice(conv: &Conversation, ctx: &DialogContext, payload: Payload) -> TransitionResult {
    // Slot payloads are only accepted in the state that collects them
    if let Some(expected) = navigation::slot_state(&payload) {
        if conv.state != expected {
            return TransitionResult::unchanged(conv)
                .with_effect(Effect::text(navigation::out_of_sequence_message(&payload)));
        }
    }

    match payload {
        Payload::CancelOrder => cancel(),
        Payload::Language(lang) => select_language(conv, lang),
        Payload::GetStarted | Payload::MenuChangeLanguage => {
            TransitionResult::new(conv.clone().with_state(DialogState::LanguageSelection))
                .with_effects(prompts::language_selection())
        }
        Payload::MenuOrder => start_ordering_flow(conv),
        Payload::MainMenu => {
            let fresh = Conversation {
                language: conv.language,
                ..Conversation::default()
            };
            start_ordering_flow(&fresh)
        }
        Payload::MenuOrderProducts => show_products(conv, ctx),
        Payload::ShowMenu => show_menu(conv, ctx),
        Payload::MenuOrderHistory => {
            TransitionResult::unchanged(conv).with_effect(Effect::LoadHistory)
        }
        Payload::MenuAbout => TransitionResult::unchanged(conv)
            .with_effect(prompts::about(conv.lang(), &ctx.shop.hours)),
        Payload::MenuHelp => show_help(conv),

        Payload::OrderProduct(code) => select_product(conv, ctx, &code),
        Payload::Quantity(quantity) => commit_selection(conv, ctx, quantity),
        Payload::AddMore => show_products(conv, ctx),
        Payload::Checkout => TransitionResult::new(conv.clone().with_state(DialogState::AwaitingName))
            .with_effect(prompts::cart_contents(&conv.cart))
            .with_effect(Effect::typing())
            .with_effect(prompts::ask_name()),
        Payload::GoBack => match navigation::back_target(conv.state) {
            Some(back) => back(conv, ctx),
            None => start_ordering_flow(conv),
        },

        Payload::Pickup => {
            let mut next = conv.clone().with_state(DialogState::Confirming);
            next.delivery_type = Some(DeliveryType::Pickup);
            next.address = Some(PICKUP_ADDRESS.to_string());
            show_summary(next, ctx)
        }
        Payload::Delivery => {
            let mut next = conv.clone().with_state(DialogState::AwaitingAddress);
            next.delivery_type = Some(DeliveryType::Delivery);
            next.address = None;
            TransitionResult::new(next).with_effect(prompts::ask_address())
        }
        Payload::ConfirmOrder => confirm_order(conv, ctx),

        Payload::Reorder(order_id) => {
            if ctx.ordering_allowed() {
                TransitionResult::unchanged(conv)
                    .with_effect(Effect::LoadOrderForReorder { order_id })
            } else {
                TransitionResult::unchanged(conv)
                    .with_effect(prompts::closed_notice(conv.lang(), ctx))
            }
        }
        Payload::RateOrder(order_id) => {
            let mut next = conv.clone().with_state(DialogState::AwaitingRating);
            next.rating_order_id = Some(order_id);
            TransitionResult::new(next).with_effect(prompts::ask_rating(conv.lang()))
        }
        Payload::Rating(stars) => submit_rating(conv, ctx, stars),
        Payload::SkipRating => {
            TransitionResult::new(Conversation::default()).with_effect(prompts::rating_skipped())
        }

        Payload::Unknown(_) => {
            TransitionResult::new(Conversation::default()).with_effect(Effect::text(prompts::UNKNOWN_PAYLOAD))
        }
    }
}

fn select_language(conv: &Conversation, lang: Language) -> TransitionResult {
    let mut next = conv.clone().with_state(DialogState::Greeting);
    next.language = Some(lang);
    TransitionResult::new(next)
        .with_effect(prompts::language_selected(lang))
        .with_effects(prompts::main_menu(lang))
}

fn select_product(conv: &Conversation, ctx: &DialogContext, code: &str) -> TransitionResult {
    let Some(product) = ctx.shop.catalog.by_code(code) else {
        return TransitionResult::new(Conversation::default())
            .with_effect(Effect::text(prompts::UNKNOWN_PAYLOAD));
    };

    let mut next = conv.clone().with_state(DialogState::AwaitingQuantity);
    next.current_product = Some(product.name.clone());
    next.current_emoji = Some(product.emoji.clone());
    next.current_quantity = None;
    TransitionResult::new(next)
        .with_effect(Effect::typing())
        .with_effect(prompts::ask_quantity(&product.emoji, &product.name))
}

/// Move the scratch selection into the cart
fn commit_selection(conv: &Conversation, ctx: &DialogContext, quantity: u32) -> TransitionResult {
    let (Some(product), Some(emoji)) = (&conv.current_product, &conv.current_emoji) else {
        return show_products(conv, ctx);
    };

    let mut next = conv.clone().with_state(DialogState::AwaitingCartDecision);
    next.cart.push(CartItem {
        product: product.clone(),
        emoji: emoji.clone(),
        quantity,
    });
    next.clear_scratch();
    let added = prompts::added_to_cart(&next);
    TransitionResult::new(next)
        .with_effect(Effect::typing())
        .with_effect(added)
}

fn confirm_order(conv: &Conversation, ctx: &DialogContext) -> TransitionResult {
    let Some(order) = finalizer::snapshot_order(conv, ctx) else {
        return show_summary(conv.clone(), ctx);
    };
    TransitionResult::new(Conversation::default())
        .with_effect(Effect::typing())
        .with_effect(Effect::PersistOrder { order })
}

fn submit_rating(conv: &Conversation, ctx: &DialogContext, stars: u8) -> TransitionResult {
    let reset = TransitionResult::new(Conversation::default());
    match conv.rating_order_id {
        Some(order_id) => reset.with_effect(Effect::PersistRating {
            rating: NewRating {
                order_id,
                user_id: ctx.sender_id.clone(),
                stars,
                comment: None,
            },
            language: conv.lang(),
        }),
        None => reset.with_effect(prompts::rating_failed(conv.lang())),
    }
}

fn reorder(conv: &Conversation, ctx: &DialogContext, order: &Order) -> TransitionResult {
    let cart = finalizer::rebuild_cart(order, &ctx.shop.catalog);
    if cart.is_empty() {
        return TransitionResult::unchanged(conv).with_effect(prompts::reorder_failed());
    }

    let next = Conversation {
        state: DialogState::AwaitingName,
        language: conv.language,
        cart,
        ..Conversation::default()
    };
    let intro = prompts::reorder_intro(order.id, next.item_count());
    let contents = prompts::cart_contents(&next.cart);
    TransitionResult::new(next)
        .with_effect(intro)
        .with_effect(contents)
        .with_effect(prompts::ask_name())
}

// ============================================================
// Shared Flows
// ============================================================

fn cancel() -> TransitionResult {
    TransitionResult::new(Conversation::default()).with_effects(prompts::cancelled())
}

/// Top of the ordering flow: welcome and the main menu card
pub(super) fn start_ordering_flow(conv: &Conversation) -> TransitionResult {
    TransitionResult::new(conv.clone().with_state(DialogState::MainMenu))
        .with_effects(prompts::main_menu(conv.lang()))
}

/// Enter product selection, unless the shop is closed
fn show_products(conv: &Conversation, ctx: &DialogContext) -> TransitionResult {
    if !ctx.ordering_allowed() {
        return TransitionResult::unchanged(conv)
            .with_effect(prompts::closed_notice(conv.lang(), ctx));
    }
    TransitionResult::new(conv.clone().with_state(DialogState::AwaitingProduct))
        .with_effect(prompts::product_carousel(&ctx.shop.catalog))
}

/// Text menu is always shown; the order carousel only while open
fn show_menu(conv: &Conversation, ctx: &DialogContext) -> TransitionResult {
    let products = show_products(conv, ctx);
    TransitionResult::new(products.new_state)
        .with_effect(prompts::menu_text(&ctx.shop.catalog))
        .with_effects(products.effects)
}

fn show_help(conv: &Conversation) -> TransitionResult {
    let flow = start_ordering_flow(conv);
    TransitionResult::new(flow.new_state)
        .with_effect(prompts::help())
        .with_effects(flow.effects)
}

pub(super) fn totals(conv: &Conversation, ctx: &DialogContext) -> Totals {
    pricing::compute_totals(
        &conv.cart,
        conv.delivery_type,
        conv.address.as_deref().unwrap_or_default(),
        &ctx.shop.catalog,
        &ctx.shop.fees,
    )
}

fn show_summary(next: Conversation, ctx: &DialogContext) -> TransitionResult {
    let summary = prompts::order_summary(&next, ctx, &totals(&next, ctx));
    TransitionResult::new(next)
        .with_effect(Effect::typing())
        .with_effect(summary)
}
