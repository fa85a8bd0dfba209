// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the smsd gateway.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level smsd configuration.
///
/// Loaded once at startup and read-only afterwards. All sections are
/// optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmsdConfig {
    /// Serial modem settings.
    #[serde(default)]
    pub modem: ModemConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Send queue and retry settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Process-level settings (logging, privileges).
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Serial modem configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModemConfig {
    /// Path to the serial device.
    #[serde(default = "default_device")]
    pub device: String,

    /// Line speed in baud.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// RTS/CTS hardware flow control.
    #[serde(default)]
    pub rtscts: bool,

    /// XON software flow control.
    #[serde(default)]
    pub xon: bool,

    /// XOFF software flow control.
    #[serde(default)]
    pub xoff: bool,

    /// Seconds to wait for the modem to finish a command.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Treat an `ERROR` reply to the setup command as a startup failure.
    #[serde(default)]
    pub require_setup_ok: bool,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            baud_rate: default_baud_rate(),
            rtscts: false,
            xon: false,
            xoff: false,
            command_timeout_secs: default_command_timeout_secs(),
            require_setup_ok: false,
        }
    }
}

fn default_device() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_command_timeout_secs() -> u64 {
    30
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Expose the `/api/events` refresh stream for a live dashboard.
    #[serde(default)]
    pub enable_dashboard: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_dashboard: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Send queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Pending messages accepted before the API starts rejecting.
    #[serde(default = "default_max_queue")]
    pub max_queue: usize,

    /// Extra attempts after the first failed send.
    #[serde(default = "default_message_retries")]
    pub message_retries: u32,

    /// Completed messages kept for inspection.
    #[serde(default = "default_log_size")]
    pub log_size: usize,

    /// Seconds between scheduled queue drains.
    #[serde(default = "default_wake_interval_secs")]
    pub wake_interval_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue: default_max_queue(),
            message_retries: default_message_retries(),
            log_size: default_log_size(),
            wake_interval_secs: default_wake_interval_secs(),
        }
    }
}

fn default_max_queue() -> usize {
    100
}

fn default_message_retries() -> u32 {
    3
}

fn default_log_size() -> usize {
    100
}

fn default_wake_interval_secs() -> u64 {
    5
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// User to switch to after the modem is opened, when started as root.
    /// Accepts a user name or a numeric uid.
    #[serde(default)]
    pub user: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            user: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
