//! HTTP request handlers

use super::types::{
    ErrorResponse, Inbound, OrderListResponse, StatusUpdateRequest, StatusUpdateResponse,
    VerifyQuery, WebhookBody,
};
use super::AppState;
use crate::db::OrderStatus;
use crate::finalizer;
use crate::runtime::StoreError;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness
        .route("/", get(health))
        // Messenger subscription handshake and page events
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        // Staff order management
        .route("/api/admin/orders", get(list_orders))
        .route("/api/admin/orders/:id/status", put(update_order_status))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Webhook
// ============================================================

async fn health() -> &'static str {
    "BakeFlow Bot is running! ✅"
}

async fn verify_webhook(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let expected = state.verify_token.as_deref();
    let subscribed = query.mode.as_deref() == Some("subscribe");
    if subscribed && expected.is_some() && query.verify_token.as_deref() == expected {
        tracing::info!("Webhook verified");
        return (StatusCode::OK, query.challenge.unwrap_or_default()).into_response();
    }

    tracing::warn!(mode = ?query.mode, "Webhook verification failed");
    StatusCode::FORBIDDEN.into_response()
}

/// Accept a page event batch; always acknowledged so Messenger never retries.
/// Events are only queued here, so a slow worker never delays the ack.
async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> &'static str {
    let body: WebhookBody = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed webhook body");
            return "EVENT_RECEIVED";
        }
    };
    if body.object != "page" {
        tracing::debug!(object = %body.object, "Ignoring non-page webhook");
        return "EVENT_RECEIVED";
    }

    for event in body.entry.iter().flat_map(|entry| &entry.messaging) {
        let Some((sender_id, inbound)) = event.inbound() else {
            continue;
        };
        let result = match &inbound {
            Inbound::Text(text) => state.runtime.handle_inbound_text(sender_id, text).await,
            Inbound::Choice(token) => state.runtime.handle_inbound_choice(sender_id, token).await,
        };
        if let Err(e) = result {
            tracing::error!(sender_id = %sender_id, error = %e, "Failed to dispatch inbound event");
        }
    }

    "EVENT_RECEIVED"
}

// ============================================================
// Admin
// ============================================================

async fn list_orders(State(state): State<AppState>) -> Result<Json<OrderListResponse>, AppError> {
    let orders = state.runtime.orders().list_orders().await?;
    Ok(Json(OrderListResponse {
        total: orders.len(),
        orders,
    }))
}

async fn update_order_status(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<StatusUpdateResponse>, AppError> {
    // Completed is internal bookkeeping and never set by staff
    let status = OrderStatus::parse(&req.status)
        .filter(|s| *s != OrderStatus::Completed)
        .ok_or_else(|| {
            AppError::BadRequest(
                "Invalid status. Must be one of: pending, preparing, ready, delivered".to_string(),
            )
        })?;

    let report = finalizer::update_order_status(
        state.runtime.orders().as_ref(),
        state.runtime.gateway().as_ref(),
        order_id,
        status,
    )
    .await?;

    let notification_sent = report.notification.sent();
    Ok(Json(StatusUpdateResponse {
        success: true,
        message: format!("Order #{order_id} status updated to {status}"),
        order_id: report.order_id,
        new_status: report.status.to_string(),
        notification_sent,
        notification_error: (!notification_sent).then(|| report.notification.error()),
    }))
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("bakeflow ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("Order {id} not found")),
            StoreError::Backend(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Storefront;
    use crate::db::{DeliveryType, NewOrder, OrderItem};
    use crate::pricing::BusinessHours;
    use crate::runtime::testing::{MockOrderStore, RecordingGateway, StalledGateway};
    use crate::runtime::{InMemoryConversationStore, OrderStore, RuntimeManager};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Fixture {
        router: Router,
        orders: Arc<MockOrderStore>,
        gateway: Arc<RecordingGateway>,
    }

    fn fixture() -> Fixture {
        let shop = Storefront {
            hours: BusinessHours::always_open(),
            ..Storefront::default()
        };
        let orders = Arc::new(MockOrderStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let runtime = RuntimeManager::new(
            Arc::new(shop),
            orders.clone(),
            gateway.clone(),
            Arc::new(InMemoryConversationStore::new()),
        );
        let state = AppState::new(Arc::new(runtime), Some("secret".to_string()));
        Fixture {
            router: create_router(state),
            orders,
            gateway,
        }
    }

    async fn seed_order(orders: &MockOrderStore, sender: Option<&str>) -> i64 {
        let order = NewOrder {
            customer_name: "Su Su".to_string(),
            delivery_type: DeliveryType::Pickup,
            address: "Pickup at store".to_string(),
            status: OrderStatus::Pending,
            items: vec![OrderItem {
                product: "Coffee".to_string(),
                quantity: 2,
                price: 500,
            }],
            total_items: 2,
            subtotal: 1000,
            delivery_fee: 0,
            total: 1000,
            sender_id: sender.map(str::to_string),
        };
        orders.create_order(&order).await.unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn put_status(id: &str, status: &str) -> Request<Body> {
        Request::put(format!("/api/admin/orders/{id}/status"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "status": status }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_verify_handshake() {
        let f = fixture();
        let ok = Request::get(
            "/webhook?hub.mode=subscribe&hub.verify_token=secret&hub.challenge=12345",
        )
        .body(Body::empty())
        .unwrap();
        let (status, body) = send(&f.router, ok).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"12345");

        let wrong = Request::get("/webhook?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&f.router, wrong).await.0, StatusCode::FORBIDDEN);

        let missing = Request::get("/webhook").body(Body::empty()).unwrap();
        assert_eq!(send(&f.router, missing).await.0, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_webhook_dispatches_postback() {
        let f = fixture();
        let body = json!({
            "object": "page",
            "entry": [{
                "messaging": [{
                    "sender": { "id": "psid-7" },
                    "postback": { "payload": "GET_STARTED" }
                }]
            }]
        });
        let request = Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = send(&f.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"EVENT_RECEIVED");

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while !f
            .gateway
            .texts_to("psid-7")
            .iter()
            .any(|t| t.contains("Choose your language"))
        {
            assert!(tokio::time::Instant::now() < deadline, "no reply sent");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_webhook_ack_does_not_wait_on_stalled_sends() {
        let runtime = RuntimeManager::new(
            Arc::new(Storefront::default()),
            Arc::new(MockOrderStore::new()),
            Arc::new(StalledGateway),
            Arc::new(InMemoryConversationStore::new()),
        );
        let router = create_router(AppState::new(Arc::new(runtime), None));

        // More events for one sender than its queue holds
        let messaging: Vec<Value> = (0..40)
            .map(|i| json!({ "sender": { "id": "psid-9" }, "message": { "text": format!("hi {i}") } }))
            .collect();
        let body = json!({ "object": "page", "entry": [{ "messaging": messaging }] });
        let request = Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let (status, bytes) = tokio::time::timeout(Duration::from_secs(1), send(&router, request))
            .await
            .expect("webhook ack should not wait for the worker");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"EVENT_RECEIVED");
    }

    #[tokio::test]
    async fn test_malformed_webhook_is_still_acknowledged() {
        let f = fixture();
        let request = Request::post("/webhook")
            .body(Body::from("not json"))
            .unwrap();
        let (status, bytes) = send(&f.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, b"EVENT_RECEIVED");
    }

    #[tokio::test]
    async fn test_list_orders() {
        let f = fixture();
        seed_order(&f.orders, Some("a")).await;
        seed_order(&f.orders, None).await;

        let request = Request::get("/api/admin/orders").body(Body::empty()).unwrap();
        let (status, bytes) = send(&f.router, request).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["orders"][0]["id"], 2);
        assert_eq!(json["orders"][1]["items"][0]["product"], "Coffee");
    }

    #[tokio::test]
    async fn test_status_update_notifies_customer() {
        let f = fixture();
        let id = seed_order(&f.orders, Some("psid-3")).await;

        let (status, bytes) = send(&f.router, put_status(&id.to_string(), "ready")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["new_status"], "ready");
        assert_eq!(json["notification_sent"], true);
        assert!(json.get("notification_error").is_none());

        assert_eq!(f.orders.status_of(id), Some(OrderStatus::Ready));
        assert!(f.gateway.texts_to("psid-3")[0].contains("is ready"));
    }

    #[tokio::test]
    async fn test_status_update_without_sender_reports_skip() {
        let f = fixture();
        let id = seed_order(&f.orders, None).await;

        let (status, bytes) = send(&f.router, put_status(&id.to_string(), "preparing")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["notification_sent"], false);
        assert_eq!(json["notification_error"], "missing_sender_id");
    }

    #[tokio::test]
    async fn test_status_update_rejections() {
        let f = fixture();
        let id = seed_order(&f.orders, Some("a")).await;

        for bad in ["completed", "cancelled", "READY"] {
            let (status, bytes) = send(&f.router, put_status(&id.to_string(), bad)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
            let json: Value = serde_json::from_slice(&bytes).unwrap();
            assert!(json["error"].as_str().unwrap().contains("Invalid status"));
        }

        let (status, _) = send(&f.router, put_status("999", "ready")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(f.gateway.sent().is_empty());
    }

    #[tokio::test]
    async fn test_health() {
        let f = fixture();
        let request = Request::get("/").body(Body::empty()).unwrap();
        let (status, bytes) = send(&f.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(String::from_utf8(bytes).unwrap(), "BakeFlow Bot is running! ✅");
    }

    #[tokio::test]
    async fn test_version() {
        let f = fixture();
        let request = Request::get("/version").body(Body::empty()).unwrap();
        let (status, bytes) = send(&f.router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8(bytes).unwrap().starts_with("bakeflow "));
    }
}
