//! Database module for the bakery order store
//!
//! Provides persistence for orders, their items and customer ratings.

mod schema;

pub use schema::*;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Order not found: {0}")]
    OrderNotFound(i64),
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const ORDER_COLUMNS: &str = "id, customer_name, delivery_type, address, status, total_items,
     subtotal, delivery_fee, total, sender_id, created_at, updated_at";

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ==================== Order Operations ====================

    /// Insert an order and its items atomically, returning the new id
    pub fn create_order(&self, order: &NewOrder) -> DbResult<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO orders (customer_name, delivery_type, address, status, total_items,
                                 subtotal, delivery_fee, total, sender_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
            params![
                order.customer_name,
                order.delivery_type.as_str(),
                order.address,
                order.status.as_str(),
                order.total_items,
                order.subtotal,
                order.delivery_fee,
                order.total,
                order.sender_id,
                now,
            ],
        )?;
        let id = tx.last_insert_rowid();

        for item in &order.items {
            tx.execute(
                "INSERT INTO order_items (order_id, product, quantity, price)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, item.product, item.quantity, item.price],
            )?;
        }

        tx.commit()?;
        Ok(id)
    }

    /// Get order by ID, items included
    pub fn get_order(&self, id: i64) -> DbResult<Order> {
        let conn = self.conn();
        let order = conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![id],
                read_order_row,
            )
            .optional()?
            .ok_or(DbError::OrderNotFound(id))?;
        finish_order(&conn, order)
    }

    /// All orders, newest first
    pub fn list_orders(&self) -> DbResult<Vec<Order>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map([], read_order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|o| finish_order(&conn, o)).collect()
    }

    /// Orders placed from one Messenger sender, newest first
    pub fn list_orders_for_sender(&self, sender_id: &str) -> DbResult<Vec<Order>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE sender_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map(params![sender_id], read_order_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|o| finish_order(&conn, o)).collect()
    }

    pub fn update_order_status(&self, id: i64, status: OrderStatus) -> DbResult<()> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(DbError::OrderNotFound(id));
        }
        Ok(())
    }

    // ==================== Rating Operations ====================

    pub fn create_rating(&self, rating: &NewRating) -> DbResult<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO ratings (order_id, user_id, stars, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                rating.order_id,
                rating.user_id,
                rating.stars,
                rating.comment,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    #[allow(dead_code)] // Used in tests
    pub fn ratings_for_order(&self, order_id: i64) -> DbResult<Vec<Rating>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, order_id, user_id, stars, comment, created_at
             FROM ratings WHERE order_id = ?1 ORDER BY id",
        )?;
        let ratings = stmt
            .query_map(params![order_id], |row| {
                Ok(Rating {
                    id: row.get(0)?,
                    order_id: row.get(1)?,
                    user_id: row.get(2)?,
                    stars: row.get(3)?,
                    comment: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ratings)
    }
}

/// Order row before its items and enums are resolved
struct OrderRow {
    order: Order,
    delivery_type: String,
    status: String,
}

fn read_order_row(row: &Row<'_>) -> rusqlite::Result<OrderRow> {
    Ok(OrderRow {
        order: Order {
            id: row.get(0)?,
            customer_name: row.get(1)?,
            delivery_type: DeliveryType::Pickup,
            address: row.get(3)?,
            status: OrderStatus::Pending,
            items: Vec::new(),
            total_items: row.get(5)?,
            subtotal: row.get(6)?,
            delivery_fee: row.get(7)?,
            total: row.get(8)?,
            sender_id: row.get(9)?,
            created_at: parse_datetime(&row.get::<_, String>(10)?),
            updated_at: parse_datetime(&row.get::<_, String>(11)?),
        },
        delivery_type: row.get(2)?,
        status: row.get(4)?,
    })
}

fn finish_order(conn: &Connection, row: OrderRow) -> DbResult<Order> {
    let OrderRow {
        mut order,
        delivery_type,
        status,
    } = row;

    order.delivery_type = DeliveryType::parse(&delivery_type)
        .ok_or_else(|| DbError::Corrupt(format!("delivery type {delivery_type:?}")))?;
    order.status =
        OrderStatus::parse(&status).ok_or_else(|| DbError::Corrupt(format!("status {status:?}")))?;

    let mut stmt = conn.prepare(
        "SELECT product, quantity, price FROM order_items WHERE order_id = ?1 ORDER BY id",
    )?;
    order.items = stmt
        .query_map(params![order.id], |row| {
            Ok(OrderItem {
                product: row.get(0)?,
                quantity: row.get(1)?,
                price: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(order)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
