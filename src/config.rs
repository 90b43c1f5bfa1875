// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Firewall instances are a JSON array, given inline in `OPNSENSE_INSTANCES`
//! or read from the file named by `OPNSENSE_INSTANCES_FILE`.

use crate::models::FirewallInstance;
use crate::schedule::PolicySchedule;
use chrono::NaiveTime;
use serde::Serialize;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_INSTANCES_FILE: &str = "instances.json";

/// Which set of periodic tasks the monitor runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Time-based alias policy plus periodic status reports
    Control,
    /// Gateway health alerts with a throttled all-OK message
    Health,
}

impl FromStr for MonitorMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "control" => Ok(MonitorMode::Control),
            "health" => Ok(MonitorMode::Health),
            _ => Err(()),
        }
    }
}

/// Optional footer appended to status reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFooter {
    pub text: String,
    pub url: Option<String>,
}

/// Application configuration, loaded once at startup.
#[derive(Clone)]
pub struct Config {
    // --- Telegram ---
    pub telegram_api_url: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,

    // --- Firewalls ---
    pub instances: Vec<FirewallInstance>,
    /// Verify firewall TLS certificates
    pub verify_ssl: bool,

    // --- Scheduling ---
    pub mode: MonitorMode,
    pub policy_check_interval: Duration,
    pub report_interval: Duration,
    /// Pause between per-firewall report messages
    pub report_send_delay: Duration,
    pub health_check_interval: Duration,
    /// Minimum spacing of all-OK messages in health mode
    pub ok_notification_interval: Duration,

    // --- Policy ---
    pub blocked_content: Vec<String>,
    pub allowed_content: Vec<String>,
    pub schedule: PolicySchedule,
    pub high_ping_threshold_ms: f64,

    pub report_footer: Option<ReportFooter>,
    /// Status server port
    pub port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("telegram_api_url", &self.telegram_api_url)
            .field("telegram_bot_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("instances", &self.instances)
            .field("verify_ssl", &self.verify_ssl)
            .field("mode", &self.mode)
            .field("policy_check_interval", &self.policy_check_interval)
            .field("report_interval", &self.report_interval)
            .field("report_send_delay", &self.report_send_delay)
            .field("health_check_interval", &self.health_check_interval)
            .field("ok_notification_interval", &self.ok_notification_interval)
            .field("blocked_content", &self.blocked_content)
            .field("allowed_content", &self.allowed_content)
            .field("schedule", &self.schedule)
            .field("high_ping_threshold_ms", &self.high_ping_threshold_ms)
            .field("report_footer", &self.report_footer)
            .field("port", &self.port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let instances = match get("OPNSENSE_INSTANCES") {
            Some(json) => parse_instances(&json)?,
            None => {
                let path = get("OPNSENSE_INSTANCES_FILE")
                    .unwrap_or_else(|| DEFAULT_INSTANCES_FILE.to_string());
                let json = std::fs::read_to_string(&path).map_err(|e| {
                    ConfigError::Instances(format!("Failed to read {}: {}", path, e))
                })?;
                parse_instances(&json)?
            }
        };

        let defaults = Self::test_default();

        let schedule = PolicySchedule {
            lunch_start: time_var(&get, "LUNCH_START", defaults.schedule.lunch_start)?,
            lunch_end: time_var(&get, "LUNCH_END", defaults.schedule.lunch_end)?,
            saturday_free_from: time_var(
                &get,
                "SATURDAY_FREE_FROM",
                defaults.schedule.saturday_free_from,
            )?,
        };

        if schedule.lunch_start >= schedule.lunch_end {
            return Err(ConfigError::Invalid {
                var: "LUNCH_END",
                value: format!(
                    "{} (must be after LUNCH_START {})",
                    schedule.lunch_end.format("%H:%M"),
                    schedule.lunch_start.format("%H:%M")
                ),
            });
        }

        let report_footer = get("REPORT_FOOTER_TEXT").map(|text| ReportFooter {
            text,
            url: get("REPORT_FOOTER_URL"),
        });

        Ok(Self {
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN")
                .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))?,
            telegram_chat_id: get("TELEGRAM_CHAT_ID")
                .ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?,
            instances,
            verify_ssl: match get("VERIFY_SSL") {
                Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                    var: "VERIFY_SSL",
                    value: v,
                })?,
                None => defaults.verify_ssl,
            },
            mode: match get("MONITOR_MODE") {
                Some(v) => v.parse().map_err(|_| ConfigError::Invalid {
                    var: "MONITOR_MODE",
                    value: v,
                })?,
                None => defaults.mode,
            },
            policy_check_interval: secs_var(
                &get,
                "POLICY_CHECK_INTERVAL_SECS",
                defaults.policy_check_interval,
                false,
            )?,
            report_interval: secs_var(
                &get,
                "REPORT_INTERVAL_SECS",
                defaults.report_interval,
                false,
            )?,
            report_send_delay: secs_var(
                &get,
                "REPORT_SEND_DELAY_SECS",
                defaults.report_send_delay,
                true,
            )?,
            health_check_interval: secs_var(
                &get,
                "HEALTH_CHECK_INTERVAL_SECS",
                defaults.health_check_interval,
                false,
            )?,
            ok_notification_interval: secs_var(
                &get,
                "OK_NOTIFICATION_INTERVAL_SECS",
                defaults.ok_notification_interval,
                true,
            )?,
            blocked_content: get("BLOCKED_CONTENT")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.blocked_content),
            allowed_content: get("ALLOWED_CONTENT")
                .map(|v| parse_list(&v))
                .unwrap_or(defaults.allowed_content),
            schedule,
            high_ping_threshold_ms: match get("HIGH_PING_THRESHOLD_MS") {
                Some(v) => v
                    .parse::<f64>()
                    .ok()
                    .filter(|t| t.is_finite() && *t >= 0.0)
                    .ok_or(ConfigError::Invalid {
                        var: "HIGH_PING_THRESHOLD_MS",
                        value: v,
                    })?,
                None => defaults.high_ping_threshold_ms,
            },
            report_footer,
            port: get("PORT").and_then(|p| p.parse().ok()).unwrap_or(8080),
        })
    }

    /// Default config for testing only.
    ///
    /// Also the source of the documented defaults used by `from_vars`.
    pub fn test_default() -> Self {
        Self {
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            telegram_bot_token: "123456:test_token".to_string(),
            telegram_chat_id: "-1000000000000".to_string(),
            instances: Vec::new(),
            verify_ssl: false,
            mode: MonitorMode::Control,
            policy_check_interval: Duration::from_secs(60),
            report_interval: Duration::from_secs(45 * 60),
            report_send_delay: Duration::from_secs(5),
            health_check_interval: Duration::from_secs(2 * 60),
            ok_notification_interval: Duration::from_secs(30 * 60),
            blocked_content: vec![
                "lista_de_filtrados".to_string(),
                "lista_de_teste".to_string(),
            ],
            allowed_content: vec!["lista_de_teste".to_string()],
            schedule: PolicySchedule::default(),
            high_ping_threshold_ms: 50.0,
            report_footer: None,
            port: 8080,
        }
    }
}

/// Parse and validate a JSON array of firewall instances.
pub fn parse_instances(json: &str) -> Result<Vec<FirewallInstance>, ConfigError> {
    let instances: Vec<FirewallInstance> = serde_json::from_str(json)
        .map_err(|e| ConfigError::Instances(format!("Invalid instance JSON: {}", e)))?;

    if instances.is_empty() {
        return Err(ConfigError::Instances(
            "At least one firewall instance is required".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    instances
        .into_iter()
        .map(FirewallInstance::normalized)
        .map(|fw| {
            if fw.url.is_empty() {
                Err(ConfigError::Instances("Instance with empty url".to_string()))
            } else if !seen.insert(fw.url.clone()) {
                Err(ConfigError::Instances(format!("Duplicate instance url {}", fw.url)))
            } else if fw.api_key.is_empty() || fw.api_secret.is_empty() {
                Err(ConfigError::Instances(format!(
                    "Instance {} is missing API credentials",
                    fw.friendly_name
                )))
            } else if fw.alias_name.trim().is_empty() {
                Err(ConfigError::Instances(format!(
                    "Instance {} has an empty alias_name",
                    fw.friendly_name
                )))
            } else {
                Ok(fw)
            }
        })
        .collect()
}

/// Split a comma- or whitespace-separated list.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

fn time_var<G>(get: &G, var: &'static str, default: NaiveTime) -> Result<NaiveTime, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(v) => parse_time(&v).ok_or(ConfigError::Invalid { var, value: v }),
        None => Ok(default),
    }
}

/// Seconds as a `Duration`; timer periods (`allow_zero == false`) must be positive.
fn secs_var<G>(
    get: &G,
    var: &'static str,
    default: Duration,
    allow_zero: bool,
) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(v) => match v.parse::<u64>() {
            Ok(secs) if secs > 0 || allow_zero => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid { var, value: v }),
        },
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Firewall instances: {0}")]
    Instances(String),
}
