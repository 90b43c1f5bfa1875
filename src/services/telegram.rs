// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Telegram Bot API notifier.

use crate::config::ConfigError;
use crate::error::AppError;
use serde::Deserialize;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(20);

/// Token values shipped in sample configs that were never filled in.
const PLACEHOLDER_TOKENS: [&str; 2] = ["SEU_TOKEN_AQUI", "YOUR_TOKEN_HERE"];

/// Sends HTML-formatted messages to a single chat.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: reqwest::Client,
    send_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for `chat_id`, rejecting unset credentials.
    pub fn new(api_url: &str, token: &str, chat_id: &str) -> Result<Self, AppError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN").into());
        }
        if PLACEHOLDER_TOKENS.contains(&token) {
            return Err(ConfigError::Invalid {
                var: "TELEGRAM_BOT_TOKEN",
                value: token.to_string(),
            }
            .into());
        }
        if chat_id.trim().is_empty() {
            return Err(ConfigError::Missing("TELEGRAM_CHAT_ID").into());
        }

        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| AppError::Telegram(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            send_url: format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token),
            chat_id: chat_id.trim().to_string(),
        })
    }

    /// Send a message to the configured chat.
    pub async fn send_message(&self, text: &str) -> Result<(), AppError> {
        if text.trim().is_empty() {
            tracing::warn!("Refusing to send empty Telegram message");
            return Err(AppError::Telegram("Message is empty".to_string()));
        }

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        // The request URL embeds the bot token, keep it out of errors.
        let response = self
            .http
            .post(&self.send_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Telegram(e.without_url().to_string()))?;

        let status = response.status();
        let reply: TelegramResponse = response.json().await.map_err(|e| {
            AppError::Telegram(format!("Unreadable response (HTTP {}): {}", status, e.without_url()))
        })?;

        if !reply.ok {
            let description = reply
                .description
                .unwrap_or_else(|| format!("HTTP {}", status));
            tracing::error!(status = %status, description = %description, "Telegram rejected message");
            return Err(AppError::Telegram(description));
        }

        tracing::info!("Telegram message sent");
        Ok(())
    }
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct TelegramResponse {
    #[serde(default)]
    ok: bool,
    description: Option<String>,
}
