// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `smsd send` and `smsd signal`: one-shot modem commands.
//!
//! Each connects to the modem, runs a single operation, and disconnects,
//! without starting the queue or the HTTP API.

use smsd_config::model::SmsdConfig;
use smsd_core::{Message, SignalReading, SmsModem, SmsdError};
use smsd_modem::ModemDriver;
use tracing::{info, warn};

use crate::serve::{connect_modem, init_tracing};

/// Send one message immediately, with no retries.
pub async fn run_send(config: SmsdConfig, recipient: &str, body: &str) -> Result<(), SmsdError> {
    // Validate before touching the device.
    let msg = Message::new(recipient, body, 0)?;
    init_tracing(&config.daemon.log_level);

    let modem = connect_modem(&config).await?;
    let sent = modem.send_message(&msg).await;
    finish(&modem, sent).await?;

    info!(id = %msg.id, recipient = %msg.recipient, "message sent");
    println!("{}", msg.id);
    Ok(())
}

/// Print the current signal reading as JSON.
pub async fn run_signal(config: SmsdConfig) -> Result<(), SmsdError> {
    init_tracing(&config.daemon.log_level);

    let modem = connect_modem(&config).await?;
    let reading = modem.query_signal().await;
    let reading = finish(&modem, reading).await?;

    println!("{}", render_signal(&reading)?);
    Ok(())
}

fn render_signal(reading: &SignalReading) -> Result<String, SmsdError> {
    serde_json::to_string_pretty(reading)
        .map_err(|e| SmsdError::Internal(format!("cannot encode signal reading: {e}")))
}

/// Disconnect, preferring the operation's error over a close error.
async fn finish<T>(modem: &ModemDriver, result: Result<T, SmsdError>) -> Result<T, SmsdError> {
    let closed = modem.disconnect().await;
    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "failed to close modem");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_renders_as_wire_json() {
        let text = render_signal(&SignalReading::new(14, 2)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, serde_json::json!({"rssi": 14, "ber": 2, "status": "good"}));
    }

    #[tokio::test]
    async fn invalid_message_fails_before_opening_the_modem() {
        let mut config = SmsdConfig::default();
        config.modem.device = "/nonexistent/ttySMSD".to_string();

        let err = run_send(config, "123", "hi").await.unwrap_err();
        assert!(matches!(err, SmsdError::Validation(_)));
    }
}
