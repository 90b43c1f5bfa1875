// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Telegram notifier tests against a fake Bot API.

use opnsense_monitor::error::AppError;
use opnsense_monitor::services::TelegramNotifier;
use serde_json::json;

mod common;

use common::{FakeTelegram, BOT_TOKEN, CHAT_ID};

#[tokio::test]
async fn test_send_message_payload() {
    let telegram = FakeTelegram::start().await;
    let notifier = TelegramNotifier::new(&telegram.url, BOT_TOKEN, CHAT_ID).unwrap();

    notifier.send_message("<b>hello</b>").await.unwrap();

    let messages = telegram.state.messages.lock().unwrap().clone();
    assert_eq!(
        messages,
        vec![json!({
            "chat_id": CHAT_ID,
            "text": "<b>hello</b>",
            "parse_mode": "HTML",
            "disable_web_page_preview": true
        })]
    );
}

#[tokio::test]
async fn test_rejected_message_returns_description() {
    let telegram = FakeTelegram::start().await;
    *telegram.state.reject_with.lock().unwrap() = Some("Bad Request: chat not found".to_string());
    let notifier = TelegramNotifier::new(&telegram.url, BOT_TOKEN, CHAT_ID).unwrap();

    let err = notifier.send_message("hello").await.unwrap_err();

    assert!(matches!(err, AppError::Telegram(ref msg) if msg == "Bad Request: chat not found"));
}

#[tokio::test]
async fn test_wrong_token_is_error() {
    let telegram = FakeTelegram::start().await;
    // Unknown token -> 404 with a non-JSON body from the fake
    let notifier = TelegramNotifier::new(&telegram.url, "999-other", CHAT_ID).unwrap();

    let err = notifier.send_message("hello").await.unwrap_err();

    assert!(matches!(err, AppError::Telegram(_)));
    assert!(!err.to_string().contains("999-other"));
    assert!(telegram.state.messages.lock().unwrap().is_empty());
}
