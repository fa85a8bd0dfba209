// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! smsd - an SMS gateway daemon for AT-command serial modems.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod privilege;
mod send;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use smsd_config::SmsdConfig;

/// smsd - queue and send SMS through a serial modem over HTTP.
#[derive(Parser, Debug)]
#[command(name = "smsd", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Run the gateway daemon (the default).
    Serve,
    /// Send one message right away and exit.
    Send {
        /// Eleven-digit destination number.
        recipient: String,
        /// Message text, at most 160 characters.
        message: String,
    },
    /// Print the modem's signal quality as JSON and exit.
    Signal,
}

fn load_config(path: Option<&std::path::Path>) -> SmsdConfig {
    let loaded = match path {
        Some(path) => smsd_config::load_and_validate_path(path),
        None => smsd_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            smsd_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let result = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Send { recipient, message } => {
            send::run_send(config, &recipient, &message).await
        }
        Commands::Signal => send::run_signal(config).await,
    };

    if let Err(e) = result {
        eprintln!("smsd: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["smsd"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn config_flag_works_after_subcommand() {
        let cli = Cli::try_parse_from(["smsd", "signal", "--config", "/etc/smsd/alt.toml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Signal));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/smsd/alt.toml")));
    }

    #[test]
    fn send_takes_recipient_and_message() {
        let cli = Cli::try_parse_from(["smsd", "send", "44712345678", "hello there"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Send {
                recipient: "44712345678".to_string(),
                message: "hello there".to_string(),
            })
        );
    }

    #[test]
    fn send_requires_both_arguments() {
        assert!(Cli::try_parse_from(["smsd", "send", "44712345678"]).is_err());
    }
}
