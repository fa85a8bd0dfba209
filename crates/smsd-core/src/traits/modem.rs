// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! High-level modem operations consumed by the send queue and the HTTP API.

use async_trait::async_trait;

use crate::error::SmsdError;
use crate::types::{Message, SignalReading};

/// A modem that can send text messages and report its signal quality.
///
/// At most one operation runs at a time. Calls made while another operation
/// is outstanding fail immediately with [`SmsdError::ModemLocked`] instead of
/// waiting.
#[async_trait]
pub trait SmsModem: Send + Sync + 'static {
    /// Whether a command exchange is currently outstanding.
    fn is_busy(&self) -> bool;

    /// Queries received signal strength and bit error rate.
    async fn query_signal(&self) -> Result<SignalReading, SmsdError>;

    /// Sends one text message.
    async fn send_message(&self, msg: &Message) -> Result<(), SmsdError>;
}
