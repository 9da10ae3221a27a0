use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::Transport;
use crate::error::DeliveryError;

const API_BASE: &str = "https://api.telegram.org";
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Bot API envelope: `{"ok": bool, "result": ..., "description": ...}`.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BotInfo {
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub message: Option<Message>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub chat: Chat,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

/// Telegram Bot API client. The token is part of every request path, so
/// request errors are stripped of their URL before they reach the logs.
pub struct TelegramClient {
    client: reqwest::Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(bot_token: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(DELIVERY_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{}", API_BASE, bot_token),
        })
    }

    pub async fn get_me(&self) -> Result<BotInfo, DeliveryError> {
        let response = self
            .client
            .get(format!("{}/getMe", self.base_url))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.without_url()))?;
        unwrap_result(read_envelope(response).await?)
    }

    /// Recent messages sent to the bot; used to discover chat ids.
    pub async fn get_updates(&self) -> Result<Vec<Update>, DeliveryError> {
        let response = self
            .client
            .get(format!("{}/getUpdates", self.base_url))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.without_url()))?;
        unwrap_result(read_envelope(response).await?)
    }
}

#[async_trait]
impl Transport for TelegramClient {
    async fn deliver(&self, recipient: &str, html: &str) -> Result<(), DeliveryError> {
        let payload = json!({
            "chat_id": recipient,
            "text": html,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let response = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.without_url()))?;

        let envelope: ApiResponse<serde_json::Value> = read_envelope(response).await?;
        if envelope.ok {
            Ok(())
        } else {
            Err(api_error(envelope.description))
        }
    }
}

async fn read_envelope<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<ApiResponse<T>, DeliveryError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| DeliveryError::Request(e.without_url()))?;

    if !status.is_success() {
        let body = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
            .ok()
            .and_then(|e| e.description)
            .unwrap_or(body);
        return Err(DeliveryError::Status { status, body });
    }

    serde_json::from_str(&body).map_err(|e| DeliveryError::Api {
        description: format!("unexpected response: {}", e),
    })
}

fn unwrap_result<T>(envelope: ApiResponse<T>) -> Result<T, DeliveryError> {
    match envelope {
        ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
        ApiResponse { description, .. } => Err(api_error(description)),
    }
}

fn api_error(description: Option<String>) -> DeliveryError {
    DeliveryError::Api {
        description: description.unwrap_or_else(|| "unknown error".to_string()),
    }
}
