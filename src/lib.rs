// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OPNsense monitor: time-based alias control, status reports and gateway
//! health alerts for a fleet of OPNsense firewalls, delivered to Telegram.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod schedule;
pub mod services;
pub mod time_utils;

use config::Config;
use services::MonitorStatus;
use std::sync::Arc;

/// Shared state for the status server.
pub struct AppState {
    pub config: Arc<Config>,
    pub status: Arc<MonitorStatus>,
}
