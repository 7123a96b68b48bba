//! Property-based tests for the dialog state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::navigation::slot_state;
use super::*;
use crate::catalog::Catalog;
use crate::config::Storefront;
use crate::db::NewRating;
use crate::pricing::{self, BusinessHours, DeliveryFeeSchedule};
use chrono::{FixedOffset, TimeZone};
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> DialogContext {
    let shop = Storefront {
        hours: BusinessHours::always_open(),
        ..Storefront::default()
    };
    let now = FixedOffset::east_opt(6 * 3600 + 1800)
        .and_then(|tz| tz.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).single())
        .unwrap();
    DialogContext::new("prop-sender", Arc::new(shop), now)
}

fn product_codes() -> Vec<String> {
    Catalog::bakery()
        .products()
        .iter()
        .map(|p| p.code.clone())
        .collect()
}

/// Scratch slots are only populated in `AwaitingQuantity`
fn is_valid_conversation(conv: &Conversation) -> bool {
    let scratch_ok = conv.state == DialogState::AwaitingQuantity
        || (conv.current_product.is_none()
            && conv.current_emoji.is_none()
            && conv.current_quantity.is_none());
    let cart_ok = conv.cart.iter().all(|item| (1..=5).contains(&item.quantity));
    scratch_ok && cart_ok
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = DialogState> {
    proptest::sample::select(DialogState::ALL.to_vec())
}

fn arb_language() -> impl Strategy<Value = Option<Language>> {
    prop_oneof![Just(None), Just(Some(Language::En)), Just(Some(Language::My))]
}

fn arb_cart_item() -> impl Strategy<Value = CartItem> {
    (proptest::sample::select(Catalog::bakery().products().to_vec()), 1u32..=5).prop_map(
        |(product, quantity)| CartItem {
            product: product.name,
            emoji: product.emoji,
            quantity,
        },
    )
}

fn arb_conversation() -> impl Strategy<Value = Conversation> {
    (
        arb_state(),
        arb_language(),
        proptest::collection::vec(arb_cart_item(), 0..4),
        proptest::option::of("[A-Za-z]{2,10}"),
        proptest::option::of(prop_oneof![
            Just(DeliveryType::Pickup),
            Just(DeliveryType::Delivery)
        ]),
        1i64..100,
    )
        .prop_map(|(state, language, cart, customer_name, delivery_type, order_id)| {
            let mut conv = Conversation {
                state,
                language,
                cart,
                customer_name,
                delivery_type,
                ..Conversation::default()
            };
            if state == DialogState::AwaitingQuantity {
                conv.current_product = Some("Coffee".to_string());
                conv.current_emoji = Some("☕".to_string());
            }
            if state == DialogState::AwaitingRating {
                conv.rating_order_id = Some(order_id);
            }
            conv
        })
}

/// Payloads that are only accepted in one state
fn arb_slot_payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        proptest::sample::select(product_codes()).prop_map(Payload::OrderProduct),
        (1u32..=5).prop_map(Payload::Quantity),
        Just(Payload::AddMore),
        Just(Payload::Checkout),
        Just(Payload::Pickup),
        Just(Payload::Delivery),
        Just(Payload::ConfirmOrder),
        (1u8..=5).prop_map(Payload::Rating),
        Just(Payload::SkipRating),
    ]
}

fn arb_payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        4 => arb_slot_payload(),
        1 => Just(Payload::GoBack),
        1 => Just(Payload::MenuOrderProducts),
        1 => Just(Payload::MainMenu),
        1 => Just(Payload::Language(Language::My)),
        1 => (1i64..10).prop_map(Payload::RateOrder),
    ]
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        3 => arb_payload().prop_map(Event::choice),
        1 => prop_oneof![
            Just("two"),
            Just("coffee"),
            Just("pickup"),
            Just("deliver"),
            Just("Thandar"),
            Just("12 Airport Rd"),
            Just("x"),
        ]
        .prop_map(Event::text),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: Any event sequence leaves a well-formed conversation
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..30)) {
        let ctx = test_context();
        let mut conv = Conversation::default();

        for event in events {
            conv = transition(&conv, &ctx, event).new_state;
            prop_assert!(is_valid_conversation(&conv), "Invalid conversation: {:?}", conv);
        }
    }

    // Invariant 2: Slot payloads outside their state change nothing
    #[test]
    fn prop_out_of_sequence_slot_is_ignored(
        conv in arb_conversation(),
        payload in arb_slot_payload()
    ) {
        prop_assume!(slot_state(&payload) != Some(conv.state));

        let result = transition(&conv, &test_context(), Event::choice(payload));
        prop_assert_eq!(result.new_state, conv);
        prop_assert_eq!(result.effects.len(), 1);
        let is_notice = matches!(result.effects[0], Effect::SendText { .. });
        prop_assert!(is_notice, "expected a rejection notice, got {:?}", result.effects);
    }

    // Invariant 3: Cancel from anywhere fully resets
    #[test]
    fn prop_cancel_resets(conv in arb_conversation(), by_text in any::<bool>()) {
        let event = if by_text {
            Event::text("I want to cancel")
        } else {
            Event::choice(Payload::CancelOrder)
        };
        let result = transition(&conv, &test_context(), event);
        prop_assert!(result.new_state.is_idle());
    }

    // Invariant 4: Unknown tokens reset the conversation
    #[test]
    fn prop_unknown_payload_resets(conv in arb_conversation(), token in "[a-z]{3,12}") {
        let result = transition(&conv, &test_context(), Event::choice(Payload::parse(&token)));
        prop_assert!(result.new_state.is_idle());
    }

    // Invariant 5: Back always moves to the predecessor or the main menu
    #[test]
    fn prop_back_never_advances(conv in arb_conversation()) {
        let result = transition(&conv, &test_context(), Event::choice(Payload::GoBack));
        let next = result.new_state.state;
        let allowed = match conv.state {
            DialogState::AwaitingQuantity => vec![DialogState::AwaitingProduct],
            DialogState::AwaitingCartDecision => vec![DialogState::AwaitingCartDecision],
            DialogState::AwaitingName => vec![DialogState::AwaitingCartDecision],
            DialogState::AwaitingDeliveryType => vec![DialogState::AwaitingName],
            DialogState::AwaitingAddress => vec![DialogState::AwaitingDeliveryType],
            DialogState::Confirming => {
                vec![DialogState::AwaitingAddress, DialogState::AwaitingDeliveryType]
            }
            _ => vec![DialogState::MainMenu],
        };
        prop_assert!(allowed.contains(&next), "{:?} -> {:?}", conv.state, next);
        prop_assert_eq!(result.new_state.cart, conv.cart);
    }

    // Invariant 6: Subtotal is linear in quantities and the fee ignores the cart
    #[test]
    fn prop_totals_linear(
        cart in proptest::collection::vec(arb_cart_item(), 1..5),
        address in "[a-z ]{0,20}",
        delivery in any::<bool>()
    ) {
        let catalog = Catalog::bakery();
        let fees = DeliveryFeeSchedule::default();
        let kind = Some(if delivery { DeliveryType::Delivery } else { DeliveryType::Pickup });

        let doubled: Vec<CartItem> = cart
            .iter()
            .cloned()
            .map(|mut item| {
                item.quantity *= 2;
                item
            })
            .collect();

        let single = pricing::compute_totals(&cart, kind, &address, &catalog, &fees);
        let double = pricing::compute_totals(&doubled, kind, &address, &catalog, &fees);
        prop_assert_eq!(double.subtotal, single.subtotal * 2);
        prop_assert_eq!(double.delivery_fee, single.delivery_fee);
        prop_assert_eq!(single.total, single.subtotal + single.delivery_fee);
        if !delivery {
            prop_assert_eq!(single.delivery_fee, 0);
        }
    }

    // Invariant 7: Confirmation persists exactly what the summary priced
    #[test]
    fn prop_confirm_snapshots_summary(
        cart in proptest::collection::vec(arb_cart_item(), 1..5),
        name in "[A-Za-z]{2,10}"
    ) {
        let ctx = test_context();
        let conv = Conversation {
            state: DialogState::Confirming,
            cart: cart.clone(),
            customer_name: Some(name.clone()),
            delivery_type: Some(DeliveryType::Pickup),
            address: Some(pricing::PICKUP_ADDRESS.to_string()),
            ..Conversation::default()
        };

        let result = transition(&conv, &ctx, Event::choice(Payload::ConfirmOrder));
        prop_assert!(result.new_state.is_idle());
        let order = result.effects.iter().find_map(|e| match e {
            Effect::PersistOrder { order } => Some(order.clone()),
            _ => None,
        });
        prop_assert!(order.is_some());
        let order = order.unwrap();

        let totals = pricing::compute_totals(
            &cart,
            Some(DeliveryType::Pickup),
            pricing::PICKUP_ADDRESS,
            &ctx.shop.catalog,
            &ctx.shop.fees,
        );
        prop_assert_eq!(order.subtotal, totals.subtotal);
        prop_assert_eq!(order.total, totals.total);
        prop_assert_eq!(order.total_items, conv.item_count());
        prop_assert_eq!(order.customer_name, name);
        prop_assert_eq!(order.items.len(), cart.len());
    }
}

// ============================================================================
// Sequences
// ============================================================================

#[test]
fn test_two_ratings_for_one_order_are_both_recorded() {
    let ctx = test_context();
    let mut persisted: Vec<NewRating> = vec![];

    for stars in [5, 2] {
        let conv = transition(
            &Conversation::default().with_state(DialogState::MainMenu),
            &ctx,
            Event::choice(Payload::RateOrder(3)),
        )
        .new_state;
        let result = transition(&conv, &ctx, Event::choice(Payload::Rating(stars)));
        assert!(result.new_state.is_idle());
        persisted.extend(result.effects.into_iter().filter_map(|e| match e {
            Effect::PersistRating { rating, .. } => Some(rating),
            _ => None,
        }));
    }

    let stars: Vec<u8> = persisted.iter().map(|r| r.stars).collect();
    assert_eq!(stars, vec![5, 2]);
    assert!(persisted.iter().all(|r| r.order_id == 3));
}
