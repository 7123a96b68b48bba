//! Messenger Send API client
//!
//! Posts text, quick replies, generic-template carousels and typing
//! indicators to `{base}/me/messages`, and configures the page profile
//! (Get Started button and persistent menu) at startup.

mod error;

pub use error::{GatewayError, GatewayErrorKind};

use crate::runtime::MessagingGateway;
use crate::state_machine::{Button, Card, Language, Payload};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `MessagingGateway` backed by the Graph API
pub struct GraphApiGateway {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl GraphApiGateway {
    pub fn new(base_url: &str, access_token: Option<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        })
    }

    fn token(&self) -> Result<&str, GatewayError> {
        self.access_token
            .as_deref()
            .ok_or_else(|| GatewayError::not_configured("PAGE_ACCESS_TOKEN not set"))
    }

    async fn post(&self, path: &str, body: &Value) -> Result<(), GatewayError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("access_token", self.token()?)])
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    GatewayError::network(format!("Connection failed: {e}"))
                } else {
                    GatewayError::unknown(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(GatewayError::from_status(status.as_u16(), &text));
        }
        Ok(())
    }

    /// Install the Get Started button, the greeting and the persistent menu
    pub async fn setup_profile(&self) -> Result<(), GatewayError> {
        self.post("me/messenger_profile", &profile_body()).await?;
        tracing::info!("Messenger profile configured");
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for GraphApiGateway {
    async fn send_text(&self, recipient: &str, text: &str) -> Result<(), GatewayError> {
        self.post("me/messages", &text_body(recipient, text)).await
    }

    async fn send_quick_replies(
        &self,
        recipient: &str,
        text: &str,
        choices: &[Button],
    ) -> Result<(), GatewayError> {
        self.post("me/messages", &quick_replies_body(recipient, text, choices))
            .await
    }

    async fn send_carousel(&self, recipient: &str, cards: &[Card]) -> Result<(), GatewayError> {
        self.post("me/messages", &carousel_body(recipient, cards))
            .await
    }

    async fn send_typing(&self, recipient: &str, on: bool) -> Result<(), GatewayError> {
        self.post("me/messages", &typing_body(recipient, on)).await
    }
}

// ============================================================================
// Request Bodies
// ============================================================================

fn text_body(recipient: &str, text: &str) -> Value {
    json!({
        "recipient": { "id": recipient },
        "message": { "text": text },
    })
}

fn quick_replies_body(recipient: &str, text: &str, choices: &[Button]) -> Value {
    let quick_replies: Vec<Value> = choices
        .iter()
        .map(|b| {
            json!({
                "content_type": "text",
                "title": b.label,
                "payload": b.payload,
            })
        })
        .collect();
    json!({
        "recipient": { "id": recipient },
        "message": { "text": text, "quick_replies": quick_replies },
    })
}

fn carousel_body(recipient: &str, cards: &[Card]) -> Value {
    let elements: Vec<Value> = cards
        .iter()
        .map(|card| {
            let buttons: Vec<Value> = card
                .buttons
                .iter()
                .map(|b| json!({ "type": "postback", "title": b.label, "payload": b.payload }))
                .collect();
            let mut element = json!({
                "title": card.title,
                "subtitle": card.subtitle,
                "buttons": buttons,
            });
            if let Some(url) = &card.image_url {
                element["image_url"] = json!(url);
            }
            element
        })
        .collect();
    json!({
        "recipient": { "id": recipient },
        "message": {
            "attachment": {
                "type": "template",
                "payload": { "template_type": "generic", "elements": elements },
            },
        },
    })
}

fn typing_body(recipient: &str, on: bool) -> Value {
    json!({
        "recipient": { "id": recipient },
        "sender_action": if on { "typing_on" } else { "typing_off" },
    })
}

fn persistent_menu(locale: &str, lang: Language) -> Value {
    let entries = [
        (lang.pick("🛒 Order Now", "🛒 အော်ဒါမှာမယ်"), Payload::MenuOrder),
        (lang.pick("📋 Order History", "📋 မှာထားမှုများ"), Payload::MenuOrderHistory),
        (lang.pick("ℹ️ About & Help", "ℹ️ အကြောင်းနှင့်အကူအညီ"), Payload::MenuAbout),
    ];
    let actions: Vec<Value> = entries
        .iter()
        .map(|(title, payload)| {
            json!({ "type": "postback", "title": title, "payload": payload.to_token() })
        })
        .collect();
    json!({
        "locale": locale,
        "composer_input_disabled": false,
        "call_to_actions": actions,
    })
}

fn greeting(locale: &str, lang: Language) -> Value {
    let text = lang.pick(
        "Hi! 👋 Welcome to BakeFlow! Click 'Get Started' to begin ordering delicious cakes and pastries! 🍰",
        "မင်္ဂလာပါ! 👋 BakeFlow မှ ကြိုဆိုပါတယ်! စတင်ရန် 'Get Started' ကို နှိပ်ပြီး အရသာရှိတဲ့ ကိတ်မုန့်တွေ မှာယူပါ! 🍰",
    );
    json!({ "locale": locale, "text": text })
}

/// Get Started button, greeting and persistent menu in both languages
fn profile_body() -> Value {
    json!({
        "get_started": { "payload": Payload::GetStarted.to_token() },
        "greeting": [
            greeting("default", Language::En),
            greeting("my_MM", Language::My),
        ],
        "persistent_menu": [
            persistent_menu("default", Language::En),
            persistent_menu("my_MM", Language::My),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_reply_body() {
        let body = quick_replies_body(
            "psid",
            "How many?",
            &[Button::new("2", &Payload::Quantity(2))],
        );
        assert_eq!(body["recipient"]["id"], "psid");
        assert_eq!(body["message"]["quick_replies"][0]["content_type"], "text");
        assert_eq!(body["message"]["quick_replies"][0]["payload"], "QTY_2");
    }

    #[test]
    fn test_carousel_body_omits_missing_image() {
        let cards = [
            Card {
                title: "☕ Coffee".to_string(),
                subtitle: "Hot • $5.00".to_string(),
                image_url: Some("https://img.example/coffee.jpg".to_string()),
                buttons: vec![Button::new(
                    "🛒 Order",
                    &Payload::OrderProduct("COFFEE".to_string()),
                )],
            },
            Card {
                title: "Menu".to_string(),
                subtitle: String::new(),
                image_url: None,
                buttons: vec![],
            },
        ];
        let body = carousel_body("psid", &cards);
        let payload = &body["message"]["attachment"]["payload"];
        assert_eq!(payload["template_type"], "generic");
        assert_eq!(payload["elements"][0]["buttons"][0]["type"], "postback");
        assert_eq!(
            payload["elements"][0]["buttons"][0]["payload"],
            "ORDER_COFFEE"
        );
        assert!(payload["elements"][1].get("image_url").is_none());
    }

    #[test]
    fn test_typing_body() {
        assert_eq!(typing_body("p", true)["sender_action"], "typing_on");
        assert_eq!(typing_body("p", false)["sender_action"], "typing_off");
    }

    #[test]
    fn test_profile_body() {
        let body = profile_body();
        assert_eq!(body["get_started"]["payload"], "GET_STARTED");
        let menus = body["persistent_menu"].as_array().unwrap();
        assert_eq!(menus.len(), 2);
        assert_eq!(menus[0]["call_to_actions"][1]["payload"], "MENU_ORDER_HISTORY");
        assert_eq!(menus[1]["locale"], "my_MM");

        let greetings = body["greeting"].as_array().unwrap();
        assert_eq!(greetings[0]["locale"], "default");
        assert!(greetings[0]["text"].as_str().unwrap().contains("Welcome to BakeFlow"));
        assert_eq!(greetings[1]["locale"], "my_MM");
        assert!(greetings[1]["text"].as_str().unwrap().contains("ကြိုဆိုပါတယ်"));
    }

    #[tokio::test]
    async fn test_missing_token_is_not_configured() {
        let gateway = GraphApiGateway::new("http://127.0.0.1:9", None).unwrap();
        let err = gateway.send_text("psid", "hi").await.unwrap_err();
        assert_eq!(err.kind, GatewayErrorKind::NotConfigured);
    }
}
