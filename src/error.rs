// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types.

use crate::config::ConfigError;

/// Application error type shared by the API clients and the monitor loop.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("OPNsense API error: {0}")]
    OpnSenseApi(String),

    #[error("OPNsense HTTP {status}: {body}")]
    OpnSenseHttp { status: u16, body: String },

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the firewall answered with an authentication failure.
    ///
    /// OPNsense returns 401 for a bad key/secret pair and 403 when the key
    /// lacks the privilege for the endpoint.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, AppError::OpnSenseHttp { status, .. } if *status == 401 || *status == 403)
    }
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;
