//! HTTP API: Messenger webhook and staff order endpoints

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::RuntimeManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
    /// Token Messenger must echo during the subscription handshake
    pub verify_token: Option<String>,
}

impl AppState {
    pub fn new(runtime: Arc<RuntimeManager>, verify_token: Option<String>) -> Self {
        Self {
            runtime,
            verify_token,
        }
    }
}
