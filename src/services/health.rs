// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gateway health evaluation and alert messages.

use crate::models::GatewayStatus;
use crate::services::report::escape_html;
use std::fmt;
use std::time::Duration;

/// Gateway states that don't raise an alert.
///
/// `force_down` is an operator decision, not an outage.
const HEALTHY_GATEWAY_STATES: [&str; 4] = ["online", "okay", "none", "force_down"];

/// A problem found on one firewall.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthProblem {
    /// The gateway status request failed
    GatewayStatusUnavailable,
    GatewayOffline { name: String, status: String },
    HighLatency { name: String, latency_ms: f64 },
}

impl fmt::Display for HealthProblem {
    /// One HTML line for the alert message.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthProblem::GatewayStatusUnavailable => {
                write!(f, "⚠️ Could not obtain gateway status.")
            }
            HealthProblem::GatewayOffline { name, status } => write!(
                f,
                "🔴 <b>Gateway offline:</b> <code>{}</code> (status: {})",
                escape_html(name),
                escape_html(status)
            ),
            HealthProblem::HighLatency { name, latency_ms } => write!(
                f,
                "🟡 <b>High latency:</b> <code>{}</code> ({:.2} ms)",
                escape_html(name),
                latency_ms
            ),
        }
    }
}

/// Evaluate gateway status against the latency threshold.
///
/// `None`, or a reply without `items`, means the status could not be fetched.
pub fn check_gateway_health(gateways: Option<&GatewayStatus>, threshold_ms: f64) -> Vec<HealthProblem> {
    let Some(items) = gateways.and_then(|g| g.items.as_deref()) else {
        tracing::warn!("Gateway status missing or invalid");
        return vec![HealthProblem::GatewayStatusUnavailable];
    };

    let mut problems = Vec::new();

    for gw in items {
        let name = gw.display_name().to_string();
        let status = gw.status.as_deref().unwrap_or("unknown");

        if !HEALTHY_GATEWAY_STATES.contains(&status) {
            problems.push(HealthProblem::GatewayOffline {
                name: name.clone(),
                status: status.to_string(),
            });
        }

        match gw.latency_ms() {
            Some(latency_ms) if latency_ms > threshold_ms => {
                problems.push(HealthProblem::HighLatency { name, latency_ms });
            }
            Some(_) => {}
            None => tracing::debug!(
                gateway = %name,
                delay = ?gw.delay,
                "Gateway delay is not numeric, skipping latency check"
            ),
        }
    }

    for problem in &problems {
        tracing::warn!(problem = %problem, "Health problem detected");
    }

    problems
}

/// Alert for one firewall listing every problem found.
pub fn format_alert(firewall_name: &str, problems: &[HealthProblem]) -> String {
    let lines: Vec<String> = problems.iter().map(ToString::to_string).collect();
    format!(
        "🚨 <b>Firewall health alert: {}</b> 🚨\n\n{}",
        escape_html(firewall_name),
        lines.join("\n")
    )
}

/// Periodic all-clear message.
pub fn format_ok_message(check_interval: Duration) -> String {
    format!(
        "✅ <b>Status report</b>\n\nAll monitored firewalls are operating normally.\n\n<i>Next check in {:.0} minutes.</i>",
        check_interval.as_secs_f64() / 60.0
    )
}

/// Sent when the monitor loop stops on an unexpected error.
pub fn format_crash_message(error: &str) -> String {
    format!(
        "🆘 <b>Monitor stopped on an unexpected error</b>\n\n<code>{}</code>\n\nCheck the logs.",
        escape_html(error)
    )
}
