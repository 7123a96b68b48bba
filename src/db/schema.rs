//! Database schema and types

use crate::catalog::Cents;
pub use crate::state_machine::state::DeliveryType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_name TEXT NOT NULL,
    delivery_type TEXT NOT NULL,
    address TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    total_items INTEGER NOT NULL,
    subtotal INTEGER NOT NULL,
    delivery_fee INTEGER NOT NULL,
    total INTEGER NOT NULL,
    sender_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_orders_sender ON orders(sender_id, created_at DESC);

CREATE TABLE IF NOT EXISTS order_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER NOT NULL,
    product TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    price INTEGER NOT NULL,

    FOREIGN KEY (order_id) REFERENCES orders(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_order_items_order ON order_items(order_id);

CREATE TABLE IF NOT EXISTS ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id INTEGER NOT NULL,
    user_id TEXT NOT NULL,
    stars INTEGER NOT NULL CHECK (stars BETWEEN 1 AND 5),
    comment TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_ratings_order ON ratings(order_id);
";

/// Order lifecycle; staff move orders forward from the admin API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Delivered,
    Completed,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "preparing" => Some(OrderStatus::Preparing),
            "ready" => Some(OrderStatus::Ready),
            "delivered" => Some(OrderStatus::Delivered),
            "completed" => Some(OrderStatus::Completed),
            _ => None,
        }
    }

    /// Badge shown on history cards
    pub fn badge(self) -> &'static str {
        match self {
            OrderStatus::Pending => "⏳ Pending",
            OrderStatus::Preparing => "👨‍🍳 Preparing",
            OrderStatus::Ready => "✅ Ready",
            OrderStatus::Delivered => "🎉 Delivered",
            OrderStatus::Completed => "✔️ Completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order line with the unit price captured at confirmation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: String,
    pub quantity: u32,
    pub price: Cents,
}

impl OrderItem {
    pub fn line_total(&self) -> Cents {
        self.price * Cents::from(self.quantity)
    }
}

/// Order as submitted by the dialog; id and timestamps are assigned on insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub delivery_type: DeliveryType,
    pub address: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_items: u32,
    pub subtotal: Cents,
    pub delivery_fee: Cents,
    pub total: Cents,
    /// Messenger sender to notify on status changes
    pub sender_id: Option<String>,
}

/// Persisted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_name: String,
    pub delivery_type: DeliveryType,
    pub address: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_items: u32,
    pub subtotal: Cents,
    pub delivery_fee: Cents,
    pub total: Cents,
    pub sender_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRating {
    pub order_id: i64,
    pub user_id: String,
    pub stars: u8,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub id: i64,
    pub order_id: i64,
    pub user_id: String,
    pub stars: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
