// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod firewall;
pub mod network;
pub mod policy;
pub mod system;

pub use firewall::FirewallInstance;
pub use network::{Gateway, GatewayStatus, InterfaceTraffic};
pub use policy::PolicyState;
pub use system::{SystemActivity, SystemInformation, TemperatureReading};
