// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! GSM modem driver for the smsd gateway.
//!
//! - [`collector`]: turns received byte chunks into completion events
//! - [`driver`]: the AT command state machine behind [`ModemDriver`]
//! - [`signal`]: `AT+CSQ` reply parsing
//! - [`serial`]: the `tokio-serial` backed [`SerialTransport`]

pub mod collector;
pub mod driver;
pub mod serial;
pub mod signal;

pub use collector::{Completion, Outcome, ResponseCollector};
pub use driver::{DriverOptions, ModemDriver};
pub use serial::SerialTransport;
pub use signal::parse_signal_reply;
