// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OPNsense REST API client.
//!
//! Handles:
//! - Diagnostics (activity, system information, temperatures, traffic)
//! - Gateway status
//! - Alias lookup, content update and reconfigure
//! - Fallback to the alternative URL when the primary is unreachable

use crate::error::AppError;
use crate::models::network::TrafficResponse;
use crate::models::system::ActivityResponse;
use crate::models::{
    FirewallInstance, GatewayStatus, InterfaceTraffic, SystemActivity, SystemInformation,
    TemperatureReading,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// API client for a single firewall.
#[derive(Clone)]
pub struct OpnSenseClient {
    http: reqwest::Client,
    base_url: String,
    alternative_url: Option<String>,
    api_key: String,
    api_secret: String,
    name: String,
}

impl OpnSenseClient {
    /// Create a client for the given instance.
    ///
    /// With `verify_ssl` false, self-signed firewall certificates are accepted.
    pub fn new(instance: &FirewallInstance, verify_ssl: bool) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(|e| AppError::OpnSenseApi(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: instance.url.trim_end_matches('/').to_string(),
            alternative_url: instance
                .url_alternative
                .as_ref()
                .map(|u| u.trim_end_matches('/').to_string()),
            api_key: instance.api_key.clone(),
            api_secret: instance.api_secret.clone(),
            name: instance.friendly_name.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// CPU, memory and uptime parsed from the firewall's `top` output.
    pub async fn get_system_activity(&self) -> Result<SystemActivity, AppError> {
        let raw: ActivityResponse = self
            .request(Method::GET, "diagnostics/activity/get_activity", None)
            .await?;
        Ok(SystemActivity::from_top_headers(&raw.headers))
    }

    pub async fn get_system_information(&self) -> Result<SystemInformation, AppError> {
        self.request(Method::GET, "diagnostics/system/system_information", None)
            .await
    }

    pub async fn get_temperatures(&self) -> Result<Vec<TemperatureReading>, AppError> {
        self.request(Method::GET, "diagnostics/system/system_temperature", None)
            .await
    }

    /// Per-interface byte counters, keyed by device name.
    pub async fn get_traffic_stats(&self) -> Result<BTreeMap<String, InterfaceTraffic>, AppError> {
        let raw: TrafficResponse = self
            .request(Method::GET, "diagnostics/traffic/_interface", None)
            .await?;
        Ok(raw.interfaces)
    }

    pub async fn get_gateway_status(&self) -> Result<GatewayStatus, AppError> {
        self.request(Method::GET, "routes/gateway/status", None)
            .await
    }

    /// Find the UUID of an alias by exact name.
    pub async fn find_alias_uuid(&self, alias_name: &str) -> Result<Option<String>, AppError> {
        tracing::debug!(firewall = %self.name, alias = alias_name, "Looking up alias");

        let search: AliasSearchResponse = self
            .request(Method::GET, "firewall/alias/searchItem", None)
            .await?;

        let uuid = search
            .rows
            .into_iter()
            .find(|row| row.name == alias_name)
            .map(|row| row.uuid);

        match &uuid {
            Some(uuid) => {
                tracing::info!(firewall = %self.name, alias = alias_name, uuid = %uuid, "Alias found")
            }
            None => tracing::warn!(firewall = %self.name, alias = alias_name, "Alias not found"),
        }
        Ok(uuid)
    }

    /// Replace the content of an existing alias (one entry per line).
    pub async fn update_alias_content(&self, uuid: &str, content: &[String]) -> Result<(), AppError> {
        let body = serde_json::json!({
            "alias": {
                "content": content.join("\n")
            }
        });

        let response: SetItemResponse = self
            .request(
                Method::POST,
                &format!("firewall/alias/setItem/{}", uuid),
                Some(&body),
            )
            .await?;

        if response.result.as_deref() == Some("saved") {
            tracing::info!(firewall = %self.name, uuid, "Alias content updated");
            Ok(())
        } else {
            Err(AppError::OpnSenseApi(format!(
                "Alias {} was not saved: {:?}",
                uuid, response.extra
            )))
        }
    }

    /// Apply pending alias changes to the running firewall.
    pub async fn apply_changes(&self) -> Result<(), AppError> {
        tracing::debug!(firewall = %self.name, "Applying alias configuration");

        let response: ReconfigureResponse = self
            .request(Method::POST, "firewall/alias/reconfigure", None)
            .await?;

        match response.status.as_deref() {
            Some(status) if status.eq_ignore_ascii_case("ok") => {
                tracing::info!(firewall = %self.name, "Alias configuration applied");
                Ok(())
            }
            other => Err(AppError::OpnSenseApi(format!(
                "Reconfigure returned status {:?}",
                other
            ))),
        }
    }

    /// Send a request, retrying once on the alternative URL if the primary
    /// is unreachable, and parse the JSON body.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, AppError> {
        let response = match self.send(&self.base_url, method.clone(), endpoint, body).await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => match &self.alternative_url {
                Some(alternative) => {
                    tracing::warn!(
                        firewall = %self.name,
                        error = %e,
                        alternative = %alternative,
                        "Primary URL unreachable, trying alternative"
                    );
                    self.send(alternative, method, endpoint, body)
                        .await
                        .map_err(|e| AppError::OpnSenseApi(e.to_string()))?
                }
                None => return Err(AppError::OpnSenseApi(e.to_string())),
            },
            Err(e) => return Err(AppError::OpnSenseApi(e.to_string())),
        };

        self.check_response_json(response).await
    }

    async fn send(
        &self,
        base: &str,
        method: Method,
        endpoint: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let url = format!("{}/api/{}", base, endpoint);
        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.api_key, Some(&self.api_secret));
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await
    }

    /// Check response status and parse JSON body.
    async fn check_response_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(firewall = %self.name, status = %status, url = %url, "OPNsense request failed");
            return Err(AppError::OpnSenseHttp {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OpnSenseApi(format!("JSON parse error: {}", e)))
    }
}

/// Response of `firewall/alias/searchItem`.
#[derive(Debug, Deserialize)]
struct AliasSearchResponse {
    #[serde(default)]
    rows: Vec<AliasRow>,
}

#[derive(Debug, Deserialize)]
struct AliasRow {
    uuid: String,
    #[serde(default)]
    name: String,
}

/// Response of `firewall/alias/setItem/{uuid}`.
#[derive(Debug, Deserialize)]
struct SetItemResponse {
    result: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Response of `firewall/alias/reconfigure`.
#[derive(Debug, Deserialize)]
struct ReconfigureResponse {
    status: Option<String>,
}
