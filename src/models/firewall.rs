// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firewall instance definition loaded from configuration.

use serde::{Deserialize, Deserializer};
use std::fmt;

/// One monitored OPNsense firewall.
#[derive(Clone, Deserialize)]
pub struct FirewallInstance {
    /// Primary API base URL (e.g. `https://fw.example.lan`)
    pub url: String,
    /// Fallback base URL tried when the primary is unreachable
    #[serde(default)]
    pub url_alternative: Option<String>,
    /// API key (basic auth user)
    pub api_key: String,
    /// API secret (basic auth password)
    pub api_secret: String,
    /// Name of the alias whose content is switched by the policy
    pub alias_name: String,
    /// Human-readable name used in logs and messages
    #[serde(default)]
    pub friendly_name: String,
    /// Alias content while blocked (overrides the global list)
    #[serde(default, alias = "alias_content_active", deserialize_with = "content_list")]
    pub blocked_content: Option<Vec<String>>,
    /// Alias content while allowed (overrides the global list)
    #[serde(default, alias = "alias_content", deserialize_with = "content_list")]
    pub allowed_content: Option<Vec<String>>,
}

impl FirewallInstance {
    /// Strip trailing slashes and fill in defaults.
    pub fn normalized(mut self) -> Self {
        self.url = self.url.trim_end_matches('/').to_string();
        self.url_alternative = self
            .url_alternative
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty());
        if self.friendly_name.trim().is_empty() {
            self.friendly_name = self.url.clone();
        }
        self
    }
}

impl fmt::Debug for FirewallInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirewallInstance")
            .field("url", &self.url)
            .field("url_alternative", &self.url_alternative)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .field("alias_name", &self.alias_name)
            .field("friendly_name", &self.friendly_name)
            .field("blocked_content", &self.blocked_content)
            .field("allowed_content", &self.allowed_content)
            .finish()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentList {
    List(Vec<String>),
    Text(String),
}

/// Accept either `["a", "b"]` or `"a b"`.
fn content_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<ContentList>::deserialize(deserializer)?;
    Ok(raw.map(|content| match content {
        ContentList::List(items) => items
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect(),
        ContentList::Text(text) => text.split_whitespace().map(str::to_string).collect(),
    }))
}
