// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! System activity, information and temperature data reported by OPNsense.

use serde::{Deserialize, Serialize};

/// Raw response of `diagnostics/activity/get_activity`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityResponse {
    /// Header lines of the firewall's `top` output
    #[serde(default)]
    pub headers: Vec<String>,
}

/// CPU, memory and uptime summary parsed from `top` headers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemActivity {
    /// Total CPU usage (100 - idle), one decimal
    pub cpu_usage_percent: Option<f64>,
    /// Used memory share (active + inactive + wired), rounded
    pub memory_usage_percent: Option<f64>,
    /// Uptime in seconds (0 when unknown)
    pub uptime_secs: u64,
}

impl SystemActivity {
    /// Parse the header lines of `top`.
    ///
    /// Lines that don't match the expected format leave the field unknown.
    pub fn from_top_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let mut activity = SystemActivity::default();

        for line in headers.iter().map(AsRef::as_ref) {
            if line.contains(" up ") {
                if let Some(secs) = parse_uptime(line) {
                    activity.uptime_secs = secs;
                }
            } else if let Some(rest) = line.strip_prefix("CPU:") {
                activity.cpu_usage_percent = parse_cpu_usage(rest);
            } else if let Some(rest) = line.strip_prefix("Mem:") {
                activity.memory_usage_percent = parse_memory_usage(rest);
            }
        }

        activity
    }
}

/// `... up 12+03:04:05 ...` or `... up 03:04:05 ...`
fn parse_uptime(line: &str) -> Option<u64> {
    let start = line.find(" up ")? + " up ".len();
    let token = line[start..].split_whitespace().next()?;
    let token = token.trim_end_matches(',');

    let (days, clock) = match token.split_once('+') {
        Some((d, c)) => (d.parse::<u64>().ok()?, c),
        None => (0, token),
    };

    let parts: Vec<u64> = clock
        .split(':')
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let &[h, m, s] = parts.as_slice() else {
        return None;
    };

    days.checked_mul(86_400)?
        .checked_add(h.checked_mul(3_600)?)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(s)
}

fn parse_cpu_usage(rest: &str) -> Option<f64> {
    let idle = rest.split(',').find_map(|segment| {
        segment
            .trim()
            .strip_suffix("idle")
            .map(|v| v.trim().trim_end_matches('%'))
            .and_then(|v| v.parse::<f64>().ok())
    })?;
    Some(((100.0 - idle) * 10.0).round() / 10.0)
}

fn parse_memory_usage(rest: &str) -> Option<f64> {
    let mut active = None;
    let mut inactive = None;
    let mut wired = None;
    let mut free = None;

    for segment in rest.split(',') {
        let mut words = segment.split_whitespace();
        let (Some(value), Some(label)) = (words.next(), words.next()) else {
            continue;
        };
        let slot = match label {
            "Active" => &mut active,
            "Inact" => &mut inactive,
            "Wired" => &mut wired,
            "Free" => &mut free,
            _ => continue,
        };
        *slot = parse_size(value);
    }

    let used = active? + inactive? + wired?;
    let total = used + free?;
    if total <= 0.0 {
        return None;
    }
    Some((used / total * 100.0).round())
}

/// Parse `512K`, `120M`, `2G` into bytes.
fn parse_size(value: &str) -> Option<f64> {
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: f64 = number.parse().ok()?;
    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1.0,
        "K" => 1024.0,
        "M" => 1024.0 * 1024.0,
        "G" => 1024.0 * 1024.0 * 1024.0,
        "T" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(number * multiplier)
}

/// Response of `diagnostics/system/system_information`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SystemInformation {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub versions: Vec<String>,
}

/// One sensor reading from `diagnostics/system/system_temperature`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemperatureReading {
    #[serde(default)]
    pub device: Option<String>,
    /// Sensor class, `cpu` for core sensors
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Degrees Celsius, sent as either a string or a number
    #[serde(default)]
    pub temperature: serde_json::Value,
}

impl TemperatureReading {
    pub fn is_cpu(&self) -> bool {
        self.kind.as_deref() == Some("cpu")
    }

    pub fn celsius(&self) -> Option<f64> {
        json_number(&self.temperature)
    }
}

/// Read a JSON number or numeric string.
pub fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}
