// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of `AT+CSQ` replies.

use smsd_core::{SignalReading, SmsdError};

/// Parse a complete `AT+CSQ` reply such as `"\r\n+CSQ: 14,2\r\n\r\nOK\r\n"`.
///
/// The reading is taken from the second line of the reply: the text after
/// the `:` is split on `,` into RSSI and BER.
pub fn parse_signal_reply(reply: &str) -> Result<SignalReading, SmsdError> {
    let line = reply
        .split('\n')
        .nth(1)
        .ok_or_else(|| malformed("missing signal line", reply))?;

    let (_, values) = line
        .split_once(':')
        .ok_or_else(|| malformed("missing `:` separator", reply))?;

    let mut fields = values.trim().split(',');
    let rssi = parse_field(fields.next(), "rssi", reply)?;
    let ber = parse_field(fields.next(), "ber", reply)?;

    Ok(SignalReading::new(rssi, ber))
}

fn parse_field(field: Option<&str>, name: &str, reply: &str) -> Result<i32, SmsdError> {
    let raw = field.ok_or_else(|| malformed(&format!("missing {name}"), reply))?;
    raw.trim()
        .parse::<i32>()
        .map_err(|e| malformed(&format!("invalid {name} `{}`: {e}", raw.trim()), reply))
}

fn malformed(detail: &str, reply: &str) -> SmsdError {
    SmsdError::Parse(format!("malformed signal reply ({detail}): {reply:?}"))
}
