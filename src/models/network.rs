// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Gateway and interface traffic data reported by OPNsense.

use serde::{Deserialize, Serialize};

/// Response of `routes/gateway/status`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayStatus {
    /// Absent when the firewall could not report gateway state
    #[serde(default)]
    pub items: Option<Vec<Gateway>>,
}

impl GatewayStatus {
    /// Reported gateways; empty when `items` was missing.
    pub fn gateways(&self) -> &[Gateway] {
        self.items.as_deref().unwrap_or_default()
    }
}

/// One gateway entry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Gateway {
    #[serde(default)]
    pub name: Option<String>,
    /// Machine status (`okay`, `down`, `none`, `force_down`, ...)
    #[serde(default)]
    pub status: Option<String>,
    /// Localized status text shown in the GUI
    #[serde(default)]
    pub status_translated: Option<String>,
    /// Packet loss, e.g. `"0.0 %"`
    #[serde(default)]
    pub loss: Option<String>,
    /// Round-trip time, e.g. `"10.5 ms"`
    #[serde(default)]
    pub delay: Option<String>,
}

impl Gateway {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("N/A")
    }

    /// Round-trip time in milliseconds, if the delay field is numeric.
    pub fn latency_ms(&self) -> Option<f64> {
        let delay = self.delay.as_deref()?.trim();
        let delay = delay.strip_suffix("ms").unwrap_or(delay).trim();
        delay.parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Response of `diagnostics/traffic/_interface`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrafficResponse {
    #[serde(default)]
    pub interfaces: std::collections::BTreeMap<String, InterfaceTraffic>,
}

/// Byte counters for one interface.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InterfaceTraffic {
    /// Description configured on the firewall (e.g. `wan`)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "bytes received", default)]
    pub bytes_received: serde_json::Value,
    #[serde(rename = "bytes transmitted", default)]
    pub bytes_transmitted: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_parsing() {
        let gw = |delay: &str| Gateway {
            delay: Some(delay.to_string()),
            ..Default::default()
        };
        assert_eq!(gw("10.5 ms").latency_ms(), Some(10.5));
        assert_eq!(gw("7.2ms").latency_ms(), Some(7.2));
        assert_eq!(gw("~").latency_ms(), None);
        assert_eq!(Gateway::default().latency_ms(), None);
    }

    #[test]
    fn test_gateway_status_without_items() {
        let status: GatewayStatus = serde_json::from_str(r#"{"status": "failed"}"#).unwrap();
        assert!(status.items.is_none());
        assert!(status.gateways().is_empty());

        let status: GatewayStatus = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(status.items.as_deref().map(<[Gateway]>::len), Some(0));
    }

    #[test]
    fn test_traffic_response_field_names() {
        let resp: TrafficResponse = serde_json::from_str(
            r#"{"interfaces": {"igb0": {"name": "wan", "bytes received": "1073741824", "bytes transmitted": 42}}}"#,
        )
        .unwrap();
        let wan = &resp.interfaces["igb0"];
        assert_eq!(wan.name.as_deref(), Some("wan"));
        assert_eq!(wan.bytes_received, serde_json::json!("1073741824"));
        assert_eq!(wan.bytes_transmitted, serde_json::json!(42));
    }
}
