// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty device paths, positive limits and exclusive flow control modes.

use crate::diagnostic::ConfigError;
use crate::model::SmsdConfig;

/// Log levels accepted by `daemon.log_level`.
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SmsdConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    let modem = &config.modem;
    if modem.device.trim().is_empty() {
        invalid("modem.device must not be empty".to_string());
    }
    if modem.baud_rate == 0 {
        invalid("modem.baud_rate must be greater than 0".to_string());
    }
    if modem.command_timeout_secs == 0 {
        invalid("modem.command_timeout_secs must be greater than 0".to_string());
    }
    if modem.rtscts && (modem.xon || modem.xoff) {
        invalid("modem.rtscts cannot be combined with modem.xon or modem.xoff".to_string());
    }

    let host = config.server.host.trim();
    if host.is_empty() {
        invalid("server.host must not be empty".to_string());
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_valid_ip && !is_valid_hostname {
            invalid(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            ));
        }
    }

    let queue = &config.queue;
    if queue.max_queue < 1 {
        invalid(format!(
            "queue.max_queue must be at least 1, got {}",
            queue.max_queue
        ));
    }
    if queue.log_size < 1 {
        invalid(format!(
            "queue.log_size must be at least 1, got {}",
            queue.log_size
        ));
    }
    if queue.wake_interval_secs < 1 {
        invalid(format!(
            "queue.wake_interval_secs must be at least 1, got {}",
            queue.wake_interval_secs
        ));
    }

    let daemon = &config.daemon;
    if !LOG_LEVELS.contains(&daemon.log_level.as_str()) {
        invalid(format!(
            "daemon.log_level `{}` is not one of {}",
            daemon.log_level,
            LOG_LEVELS.join(", ")
        ));
    }
    if let Some(user) = &daemon.user
        && user.trim().is_empty()
    {
        invalid("daemon.user must not be empty when set".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
