//! Telegram Bot API send adapter.
//!
//! Outbound messages only; inbound command routing lives outside this crate.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{HeraldError, Result};
use crate::services::broadcaster::MessageSink;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramClient {
    pub fn new(token: &str, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();

        let http = Client::builder()
            .user_agent("herald/0.1 (market digest bot)")
            .timeout(timeout)
            .build()
            .map_err(|e| {
                HeraldError::Internal(format!("failed to build Telegram HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url,
            token: token.to_string(),
        })
    }

    /// Send one HTML-formatted message to a chat
    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        disable_preview: bool,
    ) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: disable_preview,
        };

        let resp = self.http.post(&url).json(&request).send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(HeraldError::Delivery(format!(
                "sendMessage to {} failed: status={} body={}",
                chat_id, status, body
            )));
        }

        let api: ApiResponse = resp.json().await?;
        if !api.ok {
            return Err(HeraldError::Delivery(format!(
                "sendMessage to {} rejected: {}",
                chat_id,
                api.description.unwrap_or_else(|| "unknown".to_string())
            )));
        }

        debug!("message delivered to chat {}", chat_id);
        Ok(())
    }
}

#[async_trait]
impl MessageSink for TelegramClient {
    async fn send(&self, chat_id: &str, text: &str, disable_preview: bool) -> Result<()> {
        self.send_message(chat_id, text, disable_preview).await
    }
}
