// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the modem driver, the send queue, and the HTTP API.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SmsdError;

/// Longest body accepted for a single text-mode SMS, in characters.
pub const MAX_BODY_CHARS: usize = 160;

static RECIPIENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{11}$").expect("recipient pattern is a valid regex"));

/// Unique identifier for a queued message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        MessageId(uuid::Uuid::new_v4().to_string())
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Delivery state of a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageStatus {
    /// Accepted, never attempted.
    Pending,
    /// At least one attempt failed; waiting at the front of the queue.
    Retrying,
    /// Terminal: the modem acknowledged the message.
    Sent,
    /// Terminal: all attempts were used up.
    Failed,
}

impl MessageStatus {
    /// Terminal messages live in the completed log and are never mutated again.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Sent | MessageStatus::Failed)
    }
}

/// An outbound text message.
///
/// Field names on the wire follow the HTTP API contract: the body is
/// `message`, the remaining attempts are `retries`, and the last status
/// change is `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub recipient: String,
    #[serde(rename = "message")]
    pub body: String,
    #[serde(rename = "retries")]
    pub retries_remaining: u32,
    pub status: MessageStatus,
    #[serde(rename = "timestamp")]
    pub last_updated: DateTime<Utc>,
}

impl Message {
    /// Validate input and build a new pending message.
    pub fn new(
        recipient: impl Into<String>,
        body: impl Into<String>,
        retries: u32,
    ) -> Result<Self, SmsdError> {
        let recipient = recipient.into();
        let body = body.into();
        validate_body(&body)?;
        validate_recipient(&recipient)?;

        Ok(Self {
            id: MessageId::generate(),
            recipient,
            body,
            retries_remaining: retries,
            status: MessageStatus::Pending,
            last_updated: Utc::now(),
        })
    }

    /// Move to a new status and refresh the timestamp.
    pub fn transition(&mut self, status: MessageStatus) {
        self.status = status;
        self.last_updated = Utc::now();
    }
}

/// Reject bodies longer than one text-mode SMS.
pub fn validate_body(body: &str) -> Result<(), SmsdError> {
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(SmsdError::Validation("message too long".to_string()));
    }
    Ok(())
}

/// Recipients must be exactly eleven digits.
pub fn validate_recipient(recipient: &str) -> Result<(), SmsdError> {
    if !RECIPIENT_PATTERN.is_match(recipient) {
        return Err(SmsdError::Validation(
            "recipient number is malformed".to_string(),
        ));
    }
    Ok(())
}

/// Coarse signal classification derived from the RSSI value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SignalStatus {
    Weak,
    Good,
    Disconnected,
    Unknown,
}

impl SignalStatus {
    /// Classify a raw RSSI value as reported by `AT+CSQ`.
    ///
    /// Checks run in order: below 11 is weak, 11..=31 is good, 99 means the
    /// modem has no network, anything else is unknown.
    pub fn classify(rssi: i32) -> Self {
        if rssi < 11 {
            SignalStatus::Weak
        } else if rssi <= 31 {
            SignalStatus::Good
        } else if rssi == 99 {
            SignalStatus::Disconnected
        } else {
            SignalStatus::Unknown
        }
    }
}

/// One signal quality sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalReading {
    pub rssi: i32,
    pub ber: i32,
    pub status: SignalStatus,
}

impl SignalReading {
    pub fn new(rssi: i32, ber: i32) -> Self {
        Self {
            rssi,
            ber,
            status: SignalStatus::classify(rssi),
        }
    }
}
