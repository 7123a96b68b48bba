//! Order finalization and status notifications
//!
//! Turns a confirmed conversation into an immutable order snapshot, renders
//! receipts, rebuilds carts for reorders, and notifies customers when staff
//! move an order through its lifecycle.

use crate::catalog::Catalog;
use crate::db::{NewOrder, Order, OrderItem, OrderStatus};
use crate::pricing::{compute_totals, Totals};
use crate::runtime::{MessagingGateway, OrderStore, StoreError};
use crate::state_machine::prompts::{order_items_block, pricing_block};
use crate::state_machine::{CartItem, Conversation, DeliveryType, DialogContext, Effect};
use serde::Serialize;

/// Snapshot the cart with current catalog prices
///
/// Returns `None` when the conversation is missing a required checkout field.
pub fn snapshot_order(conv: &Conversation, ctx: &DialogContext) -> Option<NewOrder> {
    let customer_name = conv.customer_name.clone()?;
    let delivery_type = conv.delivery_type?;
    let address = conv.address.clone()?;
    if conv.cart.is_empty() {
        return None;
    }

    let catalog = &ctx.shop.catalog;
    let items = conv
        .cart
        .iter()
        .map(|item| OrderItem {
            product: item.product.clone(),
            quantity: item.quantity,
            price: catalog.get(&item.product).map_or(0, |p| p.price),
        })
        .collect();
    let totals = compute_totals(
        &conv.cart,
        Some(delivery_type),
        &address,
        catalog,
        &ctx.shop.fees,
    );

    Some(NewOrder {
        customer_name,
        delivery_type,
        address,
        status: OrderStatus::Pending,
        items,
        total_items: conv.item_count(),
        subtotal: totals.subtotal,
        delivery_fee: totals.delivery_fee,
        total: totals.total,
        sender_id: Some(ctx.sender_id.clone()),
    })
}

fn estimated_time(delivery_type: DeliveryType) -> &'static str {
    match delivery_type {
        DeliveryType::Pickup => "Ready in 15-20 minutes",
        DeliveryType::Delivery => "Delivered in 30-45 minutes",
    }
}

/// Confirmation message for a persisted order
pub fn render_receipt(order_id: i64, order: &NewOrder, catalog: &Catalog) -> Effect {
    let totals = Totals {
        subtotal: order.subtotal,
        delivery_fee: order.delivery_fee,
        total: order.total,
    };
    Effect::text(format!(
        "✅ **Order Confirmed!**\n\n\
         Order #{order_id}\n\n\
         🛒 **Your Order:**\n\
         {items}{pricing}\n\n\
         👤 {name}\n\
         {delivery}\n\
         📍 {address}\n\
         📊 Status: Pending\n\n\
         ⏱ {eta}\n\n\
         Thank you for choosing BakeFlow! 🎉\n\n\
         Type 'menu' to order more, or 'orders' to view history.",
        items = order_items_block(&order.items, catalog),
        pricing = pricing_block(&totals),
        name = order.customer_name,
        delivery = order.delivery_type.label(),
        address = order.address,
        eta = estimated_time(order.delivery_type),
    ))
}

/// Cart for a reorder; products no longer sold keep their name with a generic emoji
pub fn rebuild_cart(order: &Order, catalog: &Catalog) -> Vec<CartItem> {
    order
        .items
        .iter()
        .filter(|item| item.quantity > 0)
        .map(|item| CartItem {
            product: item.product.clone(),
            emoji: catalog.emoji_for(&item.product).to_string(),
            quantity: item.quantity,
        })
        .collect()
}

/// Customer-facing text for a status change, if that status notifies
pub fn status_message(status: OrderStatus, order_id: i64) -> Option<String> {
    let text = match status {
        OrderStatus::Pending => {
            format!("✅ Your order #{order_id} has been received! We'll start preparing it soon.")
        }
        OrderStatus::Preparing => format!(
            "🍰 Great news! We've started preparing your order #{order_id}. It will be ready soon!"
        ),
        OrderStatus::Ready => format!(
            "✅ Your order #{order_id} is ready! Please come pick it up or wait for delivery."
        ),
        OrderStatus::Delivered => format!(
            "🎉 Your order #{order_id} has been delivered! Enjoy your delicious treats!"
        ),
        OrderStatus::Completed => return None,
    };
    Some(text)
}

// ============================================================================
// Status Updates
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    LoadFailed,
    MissingSenderId,
    StatusNotConfigured,
}

/// What happened to the customer notification after a status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    Skipped(SkipReason),
    Failed(String),
}

impl NotificationOutcome {
    pub fn sent(&self) -> bool {
        matches!(self, NotificationOutcome::Sent)
    }

    /// Short machine-readable reason, empty when the notification went out
    pub fn error(&self) -> String {
        match self {
            NotificationOutcome::Sent => String::new(),
            NotificationOutcome::Skipped(reason) => match reason {
                SkipReason::LoadFailed => "load_failed".to_string(),
                SkipReason::MissingSenderId => "missing_sender_id".to_string(),
                SkipReason::StatusNotConfigured => "status_not_configured".to_string(),
            },
            NotificationOutcome::Failed(message) => message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdateReport {
    pub order_id: i64,
    pub status: OrderStatus,
    pub notification: NotificationOutcome,
}

/// Persist a status change, then notify the customer who placed the order
///
/// Only the store update can fail the call; notification problems are
/// reported in the returned outcome.
pub async fn update_order_status(
    store: &dyn OrderStore,
    gateway: &dyn MessagingGateway,
    order_id: i64,
    status: OrderStatus,
) -> Result<StatusUpdateReport, StoreError> {
    store.update_order_status(order_id, status).await?;
    tracing::info!(order_id, status = %status, "Order status updated");

    let notification = notify_customer(store, gateway, order_id, status).await;
    Ok(StatusUpdateReport {
        order_id,
        status,
        notification,
    })
}

async fn notify_customer(
    store: &dyn OrderStore,
    gateway: &dyn MessagingGateway,
    order_id: i64,
    status: OrderStatus,
) -> NotificationOutcome {
    let order = match store.get_order(order_id).await {
        Ok(order) => order,
        Err(e) => {
            tracing::warn!(order_id, error = %e, "Could not load order for notification");
            return NotificationOutcome::Skipped(SkipReason::LoadFailed);
        }
    };

    let Some(sender_id) = order.sender_id.filter(|s| !s.is_empty()) else {
        tracing::info!(order_id, "No sender stored for order; skipping notification");
        return NotificationOutcome::Skipped(SkipReason::MissingSenderId);
    };

    let Some(text) = status_message(status, order_id) else {
        tracing::info!(order_id, status = %status, "Status not configured for notifications");
        return NotificationOutcome::Skipped(SkipReason::StatusNotConfigured);
    };

    match gateway.send_text(&sender_id, &text).await {
        Ok(()) => {
            tracing::info!(order_id, "Status notification sent");
            NotificationOutcome::Sent
        }
        Err(e) => {
            tracing::warn!(order_id, error = %e, "Failed to send status notification");
            NotificationOutcome::Failed(e.to_string())
        }
    }
}
