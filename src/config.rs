//! Process configuration loaded from environment variables

use crate::catalog::Catalog;
use crate::pricing::{BusinessHours, DeliveryFeeSchedule};
use thiserror::Error;

pub const DEFAULT_GRAPH_API_BASE: &str = "https://graph.facebook.com/v18.0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Opening hour {open} must be before closing hour {close}")]
    InvalidHours { open: u32, close: u32 },
}

/// Shop reference data every conversation reads
#[derive(Debug, Clone, Default)]
pub struct Storefront {
    pub catalog: Catalog,
    pub fees: DeliveryFeeSchedule,
    pub hours: BusinessHours,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub port: u16,
    /// Token the Messenger platform echoes during webhook verification
    pub verify_token: Option<String>,
    pub page_access_token: Option<String>,
    pub graph_api_base: String,
    pub hours: BusinessHours,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the config from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let db_path = lookup("BAKEFLOW_DB_PATH").unwrap_or_else(|| {
            let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
            format!("{home}/.bakeflow/bakeflow.db")
        });

        let port = parse_or(&lookup, "PORT", 8080)?;
        let defaults = BusinessHours::default();
        let open_hour = parse_or(&lookup, "BAKEFLOW_OPEN_HOUR", defaults.open_hour)?;
        let close_hour = parse_or(&lookup, "BAKEFLOW_CLOSE_HOUR", defaults.close_hour)?;
        let always_open = parse_or(&lookup, "BAKEFLOW_ALWAYS_OPEN", false)?;

        if open_hour >= close_hour || close_hour > 24 {
            return Err(ConfigError::InvalidHours {
                open: open_hour,
                close: close_hour,
            });
        }

        Ok(Self {
            db_path,
            port,
            verify_token: lookup("VERIFY_TOKEN").filter(|t| !t.is_empty()),
            page_access_token: lookup("PAGE_ACCESS_TOKEN").filter(|t| !t.is_empty()),
            graph_api_base: lookup("GRAPH_API_BASE")
                .unwrap_or_else(|| DEFAULT_GRAPH_API_BASE.to_string()),
            hours: BusinessHours {
                open_hour,
                close_hour,
                always_open,
            },
        })
    }

    pub fn storefront(&self) -> Storefront {
        Storefront {
            catalog: Catalog::bakery(),
            fees: DeliveryFeeSchedule::default(),
            hours: self.hours,
        }
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
