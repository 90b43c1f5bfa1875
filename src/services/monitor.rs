// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Monitor orchestration.
//!
//! Runs the periodic tasks for the configured mode:
//! - control: time-based alias policy + status reports
//! - health: gateway alerts + throttled all-OK message
//!
//! Per-firewall results are published to a shared [`MonitorStatus`] that the
//! status endpoint reads.

use crate::config::{Config, MonitorMode};
use crate::error::AppError;
use crate::models::{FirewallInstance, PolicyState};
use crate::services::health::{
    check_gateway_health, format_alert, format_crash_message, format_ok_message,
};
use crate::services::report::{format_report, FirewallSnapshot};
use crate::services::{OpnSenseClient, TelegramNotifier};
use crate::time_utils::format_utc_rfc3339;
use chrono::{NaiveDateTime, Utc};
use dashmap::DashMap;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};

/// Last known state of one firewall.
#[derive(Debug, Clone, Serialize)]
pub struct FirewallStatus {
    pub name: String,
    pub url: String,
    /// Policy state last applied successfully (unknown until first apply)
    pub policy_state: Option<PolicyState>,
    pub policy_applied_at: Option<String>,
    pub healthy: Option<bool>,
    pub problems: Vec<String>,
    pub last_health_check: Option<String>,
    pub last_report_sent: Option<String>,
}

/// Shared, concurrently readable monitor state keyed by firewall URL.
#[derive(Debug)]
pub struct MonitorStatus {
    firewalls: DashMap<String, FirewallStatus>,
}

impl MonitorStatus {
    pub fn new(instances: &[FirewallInstance]) -> Self {
        let firewalls = instances
            .iter()
            .map(|fw| {
                (
                    fw.url.clone(),
                    FirewallStatus {
                        name: fw.friendly_name.clone(),
                        url: fw.url.clone(),
                        policy_state: None,
                        policy_applied_at: None,
                        healthy: None,
                        problems: Vec::new(),
                        last_health_check: None,
                        last_report_sent: None,
                    },
                )
            })
            .collect();
        Self { firewalls }
    }

    pub fn get(&self, url: &str) -> Option<FirewallStatus> {
        self.firewalls.get(url).map(|s| s.clone())
    }

    /// All firewalls, ordered by name.
    pub fn snapshot(&self) -> Vec<FirewallStatus> {
        let mut all: Vec<FirewallStatus> = self.firewalls.iter().map(|s| s.clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn policy_state(&self, url: &str) -> Option<PolicyState> {
        self.firewalls.get(url).and_then(|s| s.policy_state)
    }

    fn record_policy(&self, url: &str, state: PolicyState) {
        if let Some(mut status) = self.firewalls.get_mut(url) {
            status.policy_state = Some(state);
            status.policy_applied_at = Some(format_utc_rfc3339(Utc::now()));
        }
    }

    fn record_health(&self, url: &str, problems: Vec<String>) {
        if let Some(mut status) = self.firewalls.get_mut(url) {
            status.healthy = Some(problems.is_empty());
            status.problems = problems;
            status.last_health_check = Some(format_utc_rfc3339(Utc::now()));
        }
    }

    fn record_report(&self, url: &str) {
        if let Some(mut status) = self.firewalls.get_mut(url) {
            status.last_report_sent = Some(format_utc_rfc3339(Utc::now()));
        }
    }
}

/// Result of one policy check on one firewall.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyOutcome {
    /// Already in the desired state, nothing sent
    Unchanged(PolicyState),
    /// Alias updated and applied
    Applied(PolicyState),
    /// The configured alias does not exist on the firewall
    AliasNotFound,
    /// An API call failed; retried next cycle
    Failed(String),
}

struct Firewall {
    instance: FirewallInstance,
    client: OpnSenseClient,
}

/// Runs the periodic monitoring tasks.
pub struct Monitor {
    config: Arc<Config>,
    notifier: TelegramNotifier,
    firewalls: Vec<Firewall>,
    status: Arc<MonitorStatus>,
    last_ok_notification: Option<Instant>,
}

impl Monitor {
    /// Build one API client per configured firewall.
    pub fn new(config: Arc<Config>, notifier: TelegramNotifier) -> Result<Self, AppError> {
        let firewalls = config
            .instances
            .iter()
            .map(|instance| {
                Ok(Firewall {
                    client: OpnSenseClient::new(instance, config.verify_ssl)?,
                    instance: instance.clone(),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        let status = Arc::new(MonitorStatus::new(&config.instances));

        Ok(Self {
            config,
            notifier,
            firewalls,
            status,
            last_ok_notification: None,
        })
    }

    pub fn status(&self) -> Arc<MonitorStatus> {
        self.status.clone()
    }

    // ─── Control mode ────────────────────────────────────────────────────────

    /// Bring every firewall's alias in line with the schedule at `now`.
    pub async fn enforce_policies(&self, now: NaiveDateTime) -> Vec<(String, PolicyOutcome)> {
        let desired = self.config.schedule.desired_state(now);
        tracing::info!(desired = %desired, "Starting policy check");

        let outcomes = join_all(
            self.firewalls
                .iter()
                .map(|fw| async move { (fw.instance.url.clone(), self.enforce_policy(fw, desired).await) }),
        )
        .await;

        tracing::info!("Policy check finished");
        outcomes
    }

    async fn enforce_policy(&self, fw: &Firewall, desired: PolicyState) -> PolicyOutcome {
        let name = &fw.instance.friendly_name;
        let current = self.status.policy_state(&fw.instance.url);
        tracing::info!(firewall = %name, current = ?current, desired = %desired, "Policy state");

        if current == Some(desired) {
            tracing::debug!(firewall = %name, "No policy change needed");
            return PolicyOutcome::Unchanged(desired);
        }

        match self.apply_policy(fw, desired).await {
            Ok(true) => {
                self.status.record_policy(&fw.instance.url, desired);
                tracing::info!(firewall = %name, state = %desired, "Firewall policy updated");
                PolicyOutcome::Applied(desired)
            }
            Ok(false) => {
                tracing::warn!(
                    firewall = %name,
                    alias = %fw.instance.alias_name,
                    "Cannot apply policy without the alias UUID"
                );
                PolicyOutcome::AliasNotFound
            }
            Err(e) if e.is_auth_error() => {
                tracing::error!(
                    firewall = %name,
                    error = %e,
                    "OPNsense rejected the API key; check api_key/api_secret and privileges"
                );
                PolicyOutcome::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!(firewall = %name, error = %e, "Failed to apply firewall policy");
                PolicyOutcome::Failed(e.to_string())
            }
        }
    }

    /// Returns `Ok(false)` when the alias is missing.
    async fn apply_policy(&self, fw: &Firewall, desired: PolicyState) -> Result<bool, AppError> {
        let Some(uuid) = fw.client.find_alias_uuid(&fw.instance.alias_name).await? else {
            return Ok(false);
        };

        fw.client
            .update_alias_content(&uuid, self.content_for(&fw.instance, desired))
            .await?;
        fw.client.apply_changes().await?;
        Ok(true)
    }

    /// Alias content for a state, preferring the per-instance override.
    fn content_for<'a>(&'a self, instance: &'a FirewallInstance, state: PolicyState) -> &'a [String] {
        match state {
            PolicyState::Allowed => instance
                .allowed_content
                .as_deref()
                .unwrap_or(&self.config.allowed_content),
            PolicyState::Blocked => instance
                .blocked_content
                .as_deref()
                .unwrap_or(&self.config.blocked_content),
        }
    }

    /// Collect data from every firewall and send one report each.
    ///
    /// Returns the number of reports delivered.
    pub async fn send_reports(&self) -> usize {
        tracing::info!("Starting status reports");
        let mut sent = 0;

        for (i, fw) in self.firewalls.iter().enumerate() {
            if i > 0 && !self.config.report_send_delay.is_zero() {
                tokio::time::sleep(self.config.report_send_delay).await;
            }

            let name = &fw.instance.friendly_name;
            tracing::info!(firewall = %name, "Collecting report data");
            let snapshot = collect_snapshot(&fw.client).await;
            let message = format_report(name, &snapshot, self.config.report_footer.as_ref());

            match self.notifier.send_message(&message).await {
                Ok(()) => {
                    self.status.record_report(&fw.instance.url);
                    sent += 1;
                }
                Err(e) => tracing::error!(firewall = %name, error = %e, "Failed to send report"),
            }
        }

        tracing::info!(sent, "Status reports finished");
        sent
    }

    // ─── Health mode ─────────────────────────────────────────────────────────

    /// Check gateways everywhere, alert on problems, and send the all-OK
    /// message when due.
    ///
    /// Returns whether any firewall had a problem.
    pub async fn check_health(&mut self) -> bool {
        tracing::info!("Starting health check");
        let threshold_ms = self.config.high_ping_threshold_ms;

        let results = join_all(self.firewalls.iter().map(|fw| async move {
            let gateways = fw
                .client
                .get_gateway_status()
                .await
                .map_err(|e| {
                    tracing::error!(firewall = %fw.instance.friendly_name, error = %e, "Gateway status unavailable");
                })
                .ok();
            (fw, check_gateway_health(gateways.as_ref(), threshold_ms))
        }))
        .await;

        let mut any_problem = false;
        for (fw, problems) in results {
            let was_healthy = self.status.get(&fw.instance.url).and_then(|s| s.healthy);
            if was_healthy == Some(false) && problems.is_empty() {
                tracing::info!(firewall = %fw.instance.friendly_name, "Firewall recovered");
            }
            self.status.record_health(
                &fw.instance.url,
                problems.iter().map(ToString::to_string).collect(),
            );

            if problems.is_empty() {
                continue;
            }
            any_problem = true;

            let name = &fw.instance.friendly_name;
            tracing::warn!(firewall = %name, problems = problems.len(), "Sending health alert");
            if let Err(e) = self.notifier.send_message(&format_alert(name, &problems)).await {
                tracing::error!(firewall = %name, error = %e, "Failed to send health alert");
            }
        }

        if !any_problem {
            self.maybe_send_ok_notification().await;
        }
        any_problem
    }

    async fn maybe_send_ok_notification(&mut self) {
        tracing::info!("All firewalls operating normally");

        let interval = self.config.ok_notification_interval;
        if let Some(last) = self.last_ok_notification {
            let elapsed = last.elapsed();
            if elapsed < interval {
                tracing::info!(
                    minutes_to_next = (interval - elapsed).as_secs_f64() / 60.0,
                    "OK report not due yet"
                );
                return;
            }
        }

        let message = format_ok_message(self.config.health_check_interval);
        match self.notifier.send_message(&message).await {
            Ok(()) => self.last_ok_notification = Some(Instant::now()),
            Err(e) => tracing::error!(error = %e, "Failed to send OK report"),
        }
    }

    // ─── Scheduler ───────────────────────────────────────────────────────────

    /// Run the mode's tasks until `shutdown` flips to true (or its sender
    /// is dropped). Every task runs once immediately.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            mode = ?self.config.mode,
            firewalls = self.firewalls.len(),
            "Starting OPNsense monitor"
        );

        match self.config.mode {
            MonitorMode::Control => {
                let mut policy_tick = tokio::time::interval(self.config.policy_check_interval);
                let mut report_tick = tokio::time::interval(self.config.report_interval);
                policy_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                report_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = policy_tick.tick() => {
                            self.enforce_policies(chrono::Local::now().naive_local()).await;
                        }
                        _ = report_tick.tick() => {
                            self.send_reports().await;
                        }
                        _ = wait_for_shutdown(&mut shutdown) => break,
                    }
                }
            }
            MonitorMode::Health => {
                let mut health_tick = tokio::time::interval(self.config.health_check_interval);
                health_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    tokio::select! {
                        _ = health_tick.tick() => {
                            self.check_health().await;
                        }
                        _ = wait_for_shutdown(&mut shutdown) => break,
                    }
                }
            }
        }

        tracing::info!("Monitor shutting down");
    }
}

/// Wait for the monitor task to finish.
///
/// If it panicked or was aborted, the failure is logged and a crash message
/// is sent to the chat before the error is returned.
pub async fn supervise(task: JoinHandle<()>, notifier: &TelegramNotifier) -> Result<(), JoinError> {
    let Err(e) = task.await else {
        return Ok(());
    };

    tracing::error!(error = %e, "Monitor task failed");
    if let Err(send_err) = notifier.send_message(&format_crash_message(&e.to_string())).await {
        tracing::error!(error = %send_err, "Failed to send crash notification");
    }
    Err(e)
}

/// Resolves once shutdown is requested.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Fetch all report data concurrently; failed parts are left out.
async fn collect_snapshot(client: &OpnSenseClient) -> FirewallSnapshot {
    let (system_info, activity, temperatures, traffic, gateways) = tokio::join!(
        client.get_system_information(),
        client.get_system_activity(),
        client.get_temperatures(),
        client.get_traffic_stats(),
        client.get_gateway_status(),
    );

    FirewallSnapshot {
        system_info: logged(client, "system information", system_info),
        activity: logged(client, "system activity", activity),
        temperatures: logged(client, "temperatures", temperatures),
        traffic: logged(client, "traffic", traffic),
        gateways: logged(client, "gateway status", gateways),
    }
}

fn logged<T>(client: &OpnSenseClient, what: &str, result: Result<T, AppError>) -> Option<T> {
    result
        .map_err(|e| {
            tracing::warn!(firewall = %client.name(), data = what, error = %e, "Report data unavailable");
        })
        .ok()
}
