// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic status report rendering (Telegram HTML).

use crate::config::ReportFooter;
use crate::models::system::json_number;
use crate::models::{GatewayStatus, InterfaceTraffic, SystemActivity, SystemInformation, TemperatureReading};
use crate::time_utils::format_uptime;
use std::collections::BTreeMap;

/// Gateway states shown with a green marker.
const GREEN_GATEWAY_STATES: [&str; 3] = ["okay", "force_down", "none"];

/// Marker in gateway/interface names that are left out of reports.
const VPN_MARKER: &str = "VPN";

const NOT_AVAILABLE: &str = "N/A";

/// Everything collected from one firewall for a report.
///
/// A `None` field means the data could not be fetched; its section is omitted.
#[derive(Debug, Clone, Default)]
pub struct FirewallSnapshot {
    pub system_info: Option<SystemInformation>,
    pub activity: Option<SystemActivity>,
    pub temperatures: Option<Vec<TemperatureReading>>,
    pub traffic: Option<BTreeMap<String, InterfaceTraffic>>,
    pub gateways: Option<GatewayStatus>,
}

/// Build the HTML report for one firewall.
pub fn format_report(
    firewall_name: &str,
    snapshot: &FirewallSnapshot,
    footer: Option<&ReportFooter>,
) -> String {
    let mut parts = vec![format!("📍 <b>{}</b>\n", escape_html(firewall_name))];

    if let Some(version) = snapshot
        .system_info
        .as_ref()
        .and_then(|info| info.versions.first())
    {
        parts.push(format!("  - Version: <code>{}</code>", escape_html(version)));
    }

    if let Some(activity) = &snapshot.activity {
        let cpu = activity
            .cpu_usage_percent
            .map(|v| format!("{:.1}%", v))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        let mem = activity
            .memory_usage_percent
            .map(|v| format!("{:.0}%", v))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        parts.push(format!(
            "  - CPU: <code>{}</code> | Memory: <code>{}</code>",
            cpu, mem
        ));
        parts.push(format!(
            "  - Uptime: <code>{}</code>",
            format_uptime(activity.uptime_secs)
        ));
    }

    if let Some(avg) = snapshot
        .temperatures
        .as_deref()
        .and_then(average_cpu_temperature)
    {
        parts.push(format!("  - Avg. CPU temp: <code>{:.1}°C</code>", avg));
    }

    if let Some(gateways) = snapshot.gateways.as_ref().filter(|g| !g.gateways().is_empty()) {
        parts.push("\n🛰️ <b>Gateways</b>\n".to_string());
        for gw in gateways
            .gateways()
            .iter()
            .filter(|gw| !gw.display_name().contains(VPN_MARKER))
        {
            let icon = match gw.status.as_deref() {
                Some(status) if GREEN_GATEWAY_STATES.contains(&status) => "🟢",
                _ => "🔴",
            };
            parts.push(format!(
                "  {} {}: {}\n     Loss: <code>{}</code>  Latency: <code>{}</code>",
                icon,
                escape_html(gw.display_name()),
                escape_html(gw.status_translated.as_deref().unwrap_or(NOT_AVAILABLE)),
                escape_html(gw.loss.as_deref().unwrap_or(NOT_AVAILABLE)),
                escape_html(gw.delay.as_deref().unwrap_or(NOT_AVAILABLE)),
            ));
        }
    }

    if let Some(traffic) = snapshot.traffic.as_ref().filter(|t| !t.is_empty()) {
        parts.push("\n📊 <b>Network traffic</b>".to_string());
        for (device, counters) in traffic {
            let display = counters.name.as_deref().unwrap_or(device).to_uppercase();
            if display.contains(VPN_MARKER) {
                continue;
            }
            parts.push(format!(
                "\n   <b>{}:</b>\n    📥 Received: <code>{}</code>\n    📤 Transmitted: <code>{}</code>",
                escape_html(&display),
                format_bytes_gb(&counters.bytes_received),
                format_bytes_gb(&counters.bytes_transmitted),
            ));
        }
    }

    if let Some(footer) = footer {
        let text = escape_html(&footer.text);
        parts.push(match &footer.url {
            Some(url) => format!(
                "\n<a href=\"{}\"><blockquote>{}</blockquote></a>",
                escape_html(url),
                text
            ),
            None => format!("\n<blockquote>{}</blockquote>", text),
        });
    }

    parts.join("\n")
}

/// Mean of CPU sensor readings that carry a numeric temperature.
pub fn average_cpu_temperature(readings: &[TemperatureReading]) -> Option<f64> {
    let temps: Vec<f64> = readings
        .iter()
        .filter(|r| r.is_cpu())
        .filter_map(TemperatureReading::celsius)
        .collect();

    if temps.is_empty() {
        None
    } else {
        Some(temps.iter().sum::<f64>() / temps.len() as f64)
    }
}

/// Byte counter as gigabytes with two decimals; unreadable values are 0.
pub fn format_bytes_gb(bytes: &serde_json::Value) -> String {
    let gb = json_number(bytes).unwrap_or(0.0) / (1024.0 * 1024.0 * 1024.0);
    format!("{:.2} GB", gb)
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_bytes_gb() {
        assert_eq!(format_bytes_gb(&json!("1073741824")), "1.00 GB");
        assert_eq!(format_bytes_gb(&json!(1610612736u64)), "1.50 GB");
        assert_eq!(format_bytes_gb(&json!("garbage")), "0.00 GB");
        assert_eq!(format_bytes_gb(&serde_json::Value::Null), "0.00 GB");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("R&D <lab>"), "R&amp;D &lt;lab&gt;");
    }

    #[test]
    fn test_empty_snapshot_is_just_header() {
        let report = format_report("Office", &FirewallSnapshot::default(), None);
        assert_eq!(report, "📍 <b>Office</b>\n");
    }

    fn full_snapshot() -> FirewallSnapshot {
        FirewallSnapshot {
            system_info: serde_json::from_value(json!({
                "name": "fw.lan",
                "versions": ["OPNsense 24.7.1-amd64", "FreeBSD 14.1"]
            }))
            .ok(),
            activity: Some(SystemActivity {
                cpu_usage_percent: Some(12.34),
                memory_usage_percent: None,
                uptime_secs: 90_061,
            }),
            temperatures: serde_json::from_value(json!([
                {"device": "dev.cpu.0.temperature", "type": "cpu", "temperature": "40.0"},
                {"device": "dev.cpu.1.temperature", "type": "cpu", "temperature": 44},
                {"device": "tz0", "type": "zone", "temperature": "90.0"}
            ]))
            .ok(),
            traffic: serde_json::from_value(json!({
                "igb0": {"name": "wan", "bytes received": "2147483648", "bytes transmitted": 1073741824u64},
                "wg0": {"name": "vpn_home", "bytes received": "1", "bytes transmitted": "1"}
            }))
            .ok(),
            gateways: serde_json::from_value(json!({
                "items": [
                    {"name": "WAN_DHCP", "status": "okay", "status_translated": "Online", "loss": "0.0 %", "delay": "8.2 ms"},
                    {"name": "BACKUP_GW", "status": "down", "status_translated": "Offline", "loss": "100.0 %", "delay": "~"},
                    {"name": "VPN_GW", "status": "okay"}
                ]
            }))
            .ok(),
        }
    }

    #[test]
    fn test_full_report() {
        let footer = ReportFooter {
            text: "Ops team".to_string(),
            url: Some("https://example.com".to_string()),
        };
        let report = format_report("Main <HQ>", &full_snapshot(), Some(&footer));

        let expected = [
            "📍 <b>Main &lt;HQ&gt;</b>\n",
            "  - Version: <code>OPNsense 24.7.1-amd64</code>",
            "  - CPU: <code>12.3%</code> | Memory: <code>N/A</code>",
            "  - Uptime: <code>1d 1h 1m</code>",
            "  - Avg. CPU temp: <code>42.0°C</code>",
            "\n🛰️ <b>Gateways</b>\n",
            "  🟢 WAN_DHCP: Online\n     Loss: <code>0.0 %</code>  Latency: <code>8.2 ms</code>",
            "  🔴 BACKUP_GW: Offline\n     Loss: <code>100.0 %</code>  Latency: <code>~</code>",
            "\n📊 <b>Network traffic</b>",
            "\n   <b>WAN:</b>\n    📥 Received: <code>2.00 GB</code>\n    📤 Transmitted: <code>1.00 GB</code>",
            "\n<a href=\"https://example.com\"><blockquote>Ops team</blockquote></a>",
        ]
        .join("\n");

        assert_eq!(report, expected);
    }

    #[test]
    fn test_average_cpu_temperature_ignores_other_sensors() {
        let readings: Vec<TemperatureReading> = serde_json::from_value(json!([
            {"type": "zone", "temperature": "30"},
            {"type": "cpu", "temperature": "n/a"}
        ]))
        .unwrap();
        assert_eq!(average_cpu_temperature(&readings), None);
    }
}
