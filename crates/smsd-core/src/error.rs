// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the smsd gateway.

use thiserror::Error;

/// The primary error type used across the modem driver, send queue, and HTTP layer.
#[derive(Debug, Error)]
pub enum SmsdError {
    /// Configuration errors (invalid TOML, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Byte transport errors (serial open, write, close, or a dropped link).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Another command exchange is already outstanding on the modem.
    #[error("modem locked")]
    ModemLocked,

    /// The modem answered a command with `ERROR`.
    #[error("modem error")]
    ModemProtocol {
        /// Raw text collected for the failed exchange.
        reply: String,
    },

    /// No completion marker arrived before the command timeout elapsed.
    #[error("modem did not respond within {duration:?}")]
    ModemTimeout { duration: std::time::Duration },

    /// A modem reply could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Rejected user input (malformed recipient, oversized body).
    #[error("{0}")]
    Validation(String),

    /// The send queue has reached its configured limit.
    #[error("message queue length reached configured limit of {limit}")]
    QueueFull { limit: usize },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SmsdError {
    /// Build a [`SmsdError::Transport`] from a message and an underlying error.
    pub fn transport(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        SmsdError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the scheduler should treat this error as a failed delivery attempt.
    ///
    /// `ModemLocked` means the attempt never started, so no retry is consumed.
    pub fn is_delivery_failure(&self) -> bool {
        !matches!(self, SmsdError::ModemLocked)
    }
}
