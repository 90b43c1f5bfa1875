// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OPNsense Monitor
//!
//! Keeps firewall aliases in line with the access schedule and reports
//! firewall status and gateway health to a Telegram chat.

use opnsense_monitor::{
    config::Config,
    routes::create_router,
    services::{supervise, Monitor, TelegramNotifier},
    AppState,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Arc::new(Config::from_env()?);
    tracing::info!(
        mode = ?config.mode,
        firewalls = config.instances.len(),
        port = config.port,
        "Starting OPNsense monitor"
    );

    let notifier = TelegramNotifier::new(
        &config.telegram_api_url,
        &config.telegram_bot_token,
        &config.telegram_chat_id,
    )?;

    let monitor = Monitor::new(config.clone(), notifier.clone())?;

    let state = Arc::new(AppState {
        config: config.clone(),
        status: monitor.status(),
    });

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Status server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Status server listening");
    let mut server_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, create_router(state))
            .with_graceful_shutdown(async move {
                let _ = server_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let monitor_task = tokio::spawn(monitor.run(shutdown_rx));
    let supervised = supervise(monitor_task, &notifier);
    tokio::pin!(supervised);

    let finished = tokio::select! {
        result = &mut supervised => Some(result),
        _ = shutdown_signal() => None,
    };
    let _ = shutdown_tx.send(true);

    match finished {
        Some(result) => result?,
        None => {
            tracing::info!("Shutdown signal received");
            supervised.await?;
        }
    }

    server.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("opnsense_monitor=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}

/// Resolves on Ctrl-C, or SIGTERM from the container runtime.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
