//! Cart pricing and the business-hours gate
//!
//! Everything here is pure: the clock is passed in by the caller.

use crate::catalog::{Catalog, Cents};
use crate::state_machine::state::{CartItem, DeliveryType};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Timelike};
use serde::Serialize;
use std::fmt;

/// Address sentinel stored for pickup orders
pub const PICKUP_ADDRESS: &str = "Pickup at store";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub subtotal: Cents,
    pub delivery_fee: Cents,
    pub total: Cents,
}

/// Keyword-tiered delivery fees
///
/// Addresses are matched case-insensitively by substring; near keywords win
/// over far keywords, anything else pays the default fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFeeSchedule {
    pub near_keywords: Vec<String>,
    pub near_fee: Cents,
    pub far_keywords: Vec<String>,
    pub far_fee: Cents,
    pub default_fee: Cents,
}

impl Default for DeliveryFeeSchedule {
    fn default() -> Self {
        Self {
            near_keywords: vec![
                "downtown".to_string(),
                "yangon".to_string(),
                PICKUP_ADDRESS.to_lowercase(),
            ],
            near_fee: 300,
            far_keywords: vec!["airport".to_string(), "suburb".to_string()],
            far_fee: 500,
            default_fee: 400,
        }
    }
}

impl DeliveryFeeSchedule {
    /// Fee for delivering to `address`; pickup is always free
    pub fn fee_for(&self, delivery_type: Option<DeliveryType>, address: &str) -> Cents {
        if delivery_type == Some(DeliveryType::Pickup) {
            return 0;
        }
        let address = address.to_lowercase();
        let hit = |keywords: &[String]| keywords.iter().any(|k| address.contains(k.as_str()));
        if hit(&self.near_keywords) {
            self.near_fee
        } else if hit(&self.far_keywords) {
            self.far_fee
        } else {
            self.default_fee
        }
    }
}

/// Sum of catalog price × quantity; products missing from the catalog count as zero
pub fn subtotal(cart: &[CartItem], catalog: &Catalog) -> Cents {
    cart.iter()
        .map(|item| {
            catalog
                .get(&item.product)
                .map_or(0, |p| p.price * Cents::from(item.quantity))
        })
        .sum()
}

pub fn compute_totals(
    cart: &[CartItem],
    delivery_type: Option<DeliveryType>,
    address: &str,
    catalog: &Catalog,
    schedule: &DeliveryFeeSchedule,
) -> Totals {
    let subtotal = subtotal(cart, catalog);
    let delivery_fee = schedule.fee_for(delivery_type, address);
    Totals {
        subtotal,
        delivery_fee,
        total: subtotal + delivery_fee,
    }
}

// ============================================================================
// Business Hours
// ============================================================================

/// Ordering window `[open_hour, close_hour)` in the shop's local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub open_hour: u32,
    pub close_hour: u32,
    /// Skip the check entirely
    pub always_open: bool,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open_hour: 8,
            close_hour: 20,
            always_open: false,
        }
    }
}

impl BusinessHours {
    pub fn always_open() -> Self {
        Self {
            always_open: true,
            ..Self::default()
        }
    }

    pub fn is_ordering_allowed<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> bool {
        if self.always_open {
            return true;
        }
        let hour = now.hour();
        hour >= self.open_hour && hour < self.close_hour
    }

    /// Today at opening time if we haven't opened yet, otherwise tomorrow
    pub fn next_opening<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let open = NaiveTime::from_hms_opt(self.open_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let day = if now.hour() < self.open_hour {
            now.date_naive()
        } else {
            now.date_naive() + Duration::days(1)
        };
        let naive = day.and_time(open);
        now.timezone()
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| now.clone())
    }

    /// "8:00 AM - 8:00 PM"
    pub fn hours_display(&self) -> String {
        format!(
            "{} - {}",
            clock_label(self.open_hour),
            clock_label(self.close_hour)
        )
    }

    /// "8:00 AM today" or "8:00 AM on Monday, Jan 2"
    pub fn next_opening_display<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: fmt::Display,
    {
        let next = self.next_opening(now);
        let time = next.format("%-I:%M %p");
        if next.date_naive() == now.date_naive() {
            format!("{time} today")
        } else {
            format!(
                "{time} on {}, {} {}",
                next.format("%A"),
                next.format("%b"),
                next.day()
            )
        }
    }
}

/// 12-hour label for a whole hour; 24 is midnight
fn clock_label(hour: u32) -> String {
    NaiveTime::from_hms_opt(hour % 24, 0, 0)
        .unwrap_or(NaiveTime::MIN)
        .format("%-I:%M %p")
        .to_string()
}
