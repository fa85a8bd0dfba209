// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `smsd serve` command implementation.
//!
//! Opens the modem, drops privileges, then runs the send queue scheduler and
//! the HTTP API until SIGINT or SIGTERM.

use std::sync::Arc;

use smsd_config::model::SmsdConfig;
use smsd_core::{SmsModem, SmsdError};
use smsd_gateway::GatewayState;
use smsd_modem::{DriverOptions, ModemDriver, SerialTransport};
use smsd_queue::{QueueSettings, Scheduler};
use tracing::{error, info, warn};

use crate::{privilege, shutdown};

/// Runs the daemon until a shutdown signal arrives.
///
/// Startup order: modem session, HTTP listener, privilege drop, then the
/// scheduler and server. A modem that cannot be opened aborts startup.
pub async fn run_serve(config: SmsdConfig) -> Result<(), SmsdError> {
    init_tracing(&config.daemon.log_level);
    info!(version = env!("CARGO_PKG_VERSION"), "starting smsd");

    let modem = Arc::new(connect_modem(&config).await?);
    let listener = match smsd_gateway::bind(&config.server).await {
        Ok(listener) => listener,
        Err(e) => {
            close_modem(&modem).await;
            return Err(e);
        }
    };
    if let Err(e) = privilege::drop_privileges(config.daemon.user.as_deref()) {
        close_modem(&modem).await;
        return Err(e);
    }

    let shared: Arc<dyn SmsModem> = Arc::clone(&modem) as Arc<dyn SmsModem>;
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&shared),
        QueueSettings::from(&config.queue),
    ));
    let cancel = shutdown::install_signal_handler();

    let scheduler_task = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    let state = GatewayState::new(Arc::clone(&scheduler), shared, config.server.enable_dashboard);
    let served = smsd_gateway::serve(listener, state, cancel.clone()).await;
    if let Err(e) = &served {
        error!(error = %e, "HTTP server failed");
    }

    // Stop the scheduler too if the server ended on its own.
    cancel.cancel();
    if let Err(e) = scheduler_task.await {
        warn!(error = %e, "scheduler task did not shut down cleanly");
    }

    let pending = scheduler.pending_len();
    if pending > 0 {
        warn!(pending, "shutting down with unsent messages");
    }

    let closed = modem.disconnect().await;
    match (&served, &closed) {
        (Ok(()), Ok(())) => info!("smsd shutdown complete"),
        (_, Err(e)) => error!(error = %e, "failed to close modem"),
        _ => {}
    }
    served.and(closed)
}

/// Open the configured serial device and run the modem setup command.
pub(crate) async fn connect_modem(config: &SmsdConfig) -> Result<ModemDriver, SmsdError> {
    let transport = SerialTransport::from_config(&config.modem);
    let driver = ModemDriver::new(transport, DriverOptions::from(&config.modem));

    driver.connect().await.inspect_err(|e| {
        error!(device = %config.modem.device, error = %e, "cannot open modem");
    })?;
    info!(
        device = %config.modem.device,
        baud_rate = config.modem.baud_rate,
        "modem connected"
    );
    Ok(driver)
}

async fn close_modem(modem: &ModemDriver) {
    if let Err(e) = modem.disconnect().await {
        warn!(error = %e, "failed to close modem during aborted startup");
    }
}

/// Initializes the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise every `smsd*` target logs at
/// `log_level` and dependencies at `warn`.
pub(crate) fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn default_directives(log_level: &str) -> String {
    // Target directives match by prefix, so `smsd` covers `smsd_modem` etc.
    format!("smsd={log_level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_parse() {
        let directives = default_directives("debug");
        assert_eq!(directives, "smsd=debug,warn");
        assert!(tracing_subscriber::EnvFilter::try_new(directives).is_ok());
    }

    #[tokio::test]
    async fn missing_device_fails_startup() {
        let mut config = SmsdConfig::default();
        config.modem.device = "/nonexistent/ttySMSD".to_string();

        let err = connect_modem(&config).await.err().unwrap();
        assert!(matches!(err, SmsdError::Transport { .. }));
    }
}
