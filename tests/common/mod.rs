// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fake OPNsense and Telegram APIs for integration tests.

use axum::{
    extract::{Path, Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use opnsense_monitor::config::Config;
use opnsense_monitor::models::FirewallInstance;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const API_KEY: &str = "test-key";
pub const API_SECRET: &str = "test-secret";
/// `Basic base64("test-key:test-secret")`
const EXPECTED_AUTH: &str = "Basic dGVzdC1rZXk6dGVzdC1zZWNyZXQ=";

pub const BOT_TOKEN: &str = "123456-test";
pub const CHAT_ID: &str = "-1001234567890";

/// A URL nothing listens on (connection refused).
#[allow(dead_code)]
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

/// Serve a router on an ephemeral localhost port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

// ─── Fake OPNsense ───────────────────────────────────────────────────────────

/// Mutable behavior and recorded calls of a fake firewall.
pub struct FakeFirewallState {
    /// (name, uuid) pairs returned by alias search
    pub aliases: Mutex<Vec<(String, String)>>,
    /// (uuid, body) of every setItem call
    pub set_item_calls: Mutex<Vec<(String, Value)>>,
    pub set_item_result: Mutex<String>,
    pub reconfigure_calls: AtomicUsize,
    pub reconfigure_status: Mutex<String>,
    pub gateways: Mutex<Value>,
    pub requests: AtomicUsize,
}

impl Default for FakeFirewallState {
    fn default() -> Self {
        Self {
            aliases: Mutex::new(vec![
                ("other_alias".to_string(), "uuid-other".to_string()),
                ("filtro_dns_ativo".to_string(), "uuid-filter".to_string()),
            ]),
            set_item_calls: Mutex::new(Vec::new()),
            set_item_result: Mutex::new("saved".to_string()),
            reconfigure_calls: AtomicUsize::new(0),
            reconfigure_status: Mutex::new("ok".to_string()),
            gateways: Mutex::new(healthy_gateways()),
            requests: AtomicUsize::new(0),
        }
    }
}

impl FakeFirewallState {
    #[allow(dead_code)]
    pub fn set_item_count(&self) -> usize {
        self.set_item_calls.lock().unwrap().len()
    }
}

pub struct FakeFirewall {
    pub url: String,
    pub state: Arc<FakeFirewallState>,
}

impl FakeFirewall {
    pub async fn start() -> Self {
        let state = Arc::new(FakeFirewallState::default());
        let url = spawn_server(opnsense_router(state.clone())).await;
        Self { url, state }
    }

    /// Instance definition pointing at this fake.
    #[allow(dead_code)]
    pub fn instance(&self, friendly_name: &str) -> FirewallInstance {
        instance_for(&self.url, friendly_name)
    }
}

#[allow(dead_code)]
pub fn instance_for(url: &str, friendly_name: &str) -> FirewallInstance {
    serde_json::from_value::<FirewallInstance>(json!({
        "url": url,
        "api_key": API_KEY,
        "api_secret": API_SECRET,
        "alias_name": "filtro_dns_ativo",
        "friendly_name": friendly_name,
    }))
    .unwrap()
    .normalized()
}

pub fn healthy_gateways() -> Value {
    json!({
        "items": [
            {
                "name": "WAN_DHCP",
                "status": "okay",
                "status_translated": "Online",
                "loss": "0.0 %",
                "delay": "8.2 ms"
            },
            {
                "name": "WAN2_GW",
                "status": "none",
                "status_translated": "Online",
                "loss": "0.0 %",
                "delay": "12.0 ms"
            }
        ],
        "status": "ok"
    })
}

fn opnsense_router(state: Arc<FakeFirewallState>) -> Router {
    Router::new()
        .route("/api/diagnostics/activity/get_activity", get(activity))
        .route("/api/diagnostics/system/system_information", get(system_information))
        .route("/api/diagnostics/system/system_temperature", get(temperatures))
        .route("/api/diagnostics/traffic/_interface", get(traffic))
        .route("/api/routes/gateway/status", get(gateway_status))
        .route("/api/firewall/alias/searchItem", get(search_alias))
        .route("/api/firewall/alias/setItem/{uuid}", post(set_alias))
        .route("/api/firewall/alias/reconfigure", post(reconfigure))
        .layer(middleware::from_fn_with_state(state.clone(), require_basic_auth))
        .with_state(state)
}

async fn require_basic_auth(
    State(state): State<Arc<FakeFirewallState>>,
    req: Request,
    next: Next,
) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);
    match req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(auth) if auth == EXPECTED_AUTH => next.run(req).await,
        _ => (StatusCode::UNAUTHORIZED, "Authentication Failed").into_response(),
    }
}

async fn activity() -> Json<Value> {
    Json(json!({
        "headers": [
            "last pid: 91234;  load averages:  0.31,  0.27,  0.25  up 12+03:04:05    10:11:12",
            "64 processes: 1 running, 63 sleeping",
            "CPU:  1.2% user,  0.0% nice,  0.8% system,  0.1% interrupt, 97.9% idle",
            "Mem: 512M Active, 1024M Inact, 512M Wired, 40K Buf, 2048M Free",
            "Swap: 8192M Total, 8192M Free"
        ],
        "details": []
    }))
}

async fn system_information() -> Json<Value> {
    Json(json!({
        "name": "fw.example.lan",
        "versions": ["OPNsense 24.7.1-amd64", "FreeBSD 14.1-RELEASE-p3"],
        "updates": "Click to check for updates."
    }))
}

async fn temperatures() -> Json<Value> {
    Json(json!([
        {"device": "dev.cpu.0.temperature", "device_seq": "0", "temperature": "40.0", "type": "cpu"},
        {"device": "dev.cpu.1.temperature", "device_seq": "1", "temperature": "44.0", "type": "cpu"},
        {"device": "hw.acpi.thermal.tz0.temperature", "device_seq": "0", "temperature": "27.9", "type": "zone"}
    ]))
}

async fn traffic() -> Json<Value> {
    Json(json!({
        "interfaces": {
            "igb0": {"name": "wan", "bytes received": "2147483648", "bytes transmitted": "1073741824"},
            "igb1": {"name": "lan", "bytes received": "536870912", "bytes transmitted": "3221225472"},
            "wg0": {"name": "vpn_office", "bytes received": "1", "bytes transmitted": "1"}
        },
        "time": 1718000000.0
    }))
}

async fn gateway_status(State(state): State<Arc<FakeFirewallState>>) -> Json<Value> {
    Json(state.gateways.lock().unwrap().clone())
}

async fn search_alias(State(state): State<Arc<FakeFirewallState>>) -> Json<Value> {
    let rows: Vec<Value> = state
        .aliases
        .lock()
        .unwrap()
        .iter()
        .map(|(name, uuid)| json!({"uuid": uuid, "enabled": "1", "name": name, "type": "Network group"}))
        .collect();
    let total = rows.len();
    Json(json!({"rows": rows, "rowCount": total, "total": total, "current": 1}))
}

async fn set_alias(
    State(state): State<Arc<FakeFirewallState>>,
    Path(uuid): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.set_item_calls.lock().unwrap().push((uuid, body));
    let result = state.set_item_result.lock().unwrap().clone();
    if result == "saved" {
        Json(json!({"result": "saved"}))
    } else {
        Json(json!({"result": result, "validations": {"alias.content": "invalid"}}))
    }
}

async fn reconfigure(State(state): State<Arc<FakeFirewallState>>) -> Json<Value> {
    state.reconfigure_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"status": state.reconfigure_status.lock().unwrap().clone()}))
}

// ─── Fake Telegram ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeTelegramState {
    /// Bodies of every sendMessage call
    pub messages: Mutex<Vec<Value>>,
    /// When set, reply `ok: false` with this description
    pub reject_with: Mutex<Option<String>>,
}

impl FakeTelegramState {
    #[allow(dead_code)]
    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m["text"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

pub struct FakeTelegram {
    pub url: String,
    pub state: Arc<FakeTelegramState>,
}

impl FakeTelegram {
    pub async fn start() -> Self {
        let state = Arc::new(FakeTelegramState::default());
        let router = Router::new()
            .route(&format!("/bot{}/sendMessage", BOT_TOKEN), post(send_message))
            .with_state(state.clone());
        let url = spawn_server(router).await;
        Self { url, state }
    }
}

async fn send_message(
    State(state): State<Arc<FakeTelegramState>>,
    Json(body): Json<Value>,
) -> Response {
    if let Some(description) = state.reject_with.lock().unwrap().clone() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"ok": false, "error_code": 400, "description": description})),
        )
            .into_response();
    }
    state.messages.lock().unwrap().push(body);
    Json(json!({"ok": true, "result": {"message_id": 1}})).into_response()
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// Test config wired to the fakes, with no delays between reports.
#[allow(dead_code)]
pub fn test_config(telegram: &FakeTelegram, instances: Vec<FirewallInstance>) -> Config {
    let mut config = Config::test_default();
    config.telegram_api_url = telegram.url.clone();
    config.telegram_bot_token = BOT_TOKEN.to_string();
    config.telegram_chat_id = CHAT_ID.to_string();
    config.instances = instances;
    config.report_send_delay = Duration::ZERO;
    config
}
