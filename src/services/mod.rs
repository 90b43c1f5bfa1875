// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod health;
pub mod monitor;
pub mod opnsense;
pub mod report;
pub mod telegram;

pub use health::HealthProblem;
pub use monitor::{supervise, FirewallStatus, Monitor, MonitorStatus, PolicyOutcome};
pub use opnsense::OpnSenseClient;
pub use report::FirewallSnapshot;
pub use telegram::TelegramNotifier;
