// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./smsd.toml` > `~/.config/smsd/smsd.toml` > `/etc/smsd/smsd.toml`
//! with environment variable overrides via `SMSD_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SmsdConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/smsd/smsd.toml";
/// Config file in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "smsd.toml";

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/smsd/smsd.toml` (system-wide)
/// 3. `~/.config/smsd/smsd.toml` (user XDG config)
/// 4. `./smsd.toml` (local directory)
/// 5. `SMSD_*` environment variables
pub fn load_config() -> Result<SmsdConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<SmsdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SmsdConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SmsdConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SmsdConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SmsdConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// `~/.config/smsd/smsd.toml`, when a config directory exists.
pub fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("smsd/smsd.toml"))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `SMSD_QUEUE_MAX_QUEUE` must map to `queue.max_queue`, not
/// `queue.max.queue`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("SMSD_").map(|key| map_env_key(key.as_str()).into())
}

/// Map a lowercased, prefix-stripped env var name onto a dotted config path.
pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: [&str; 4] = ["modem", "server", "queue", "daemon"];

    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
