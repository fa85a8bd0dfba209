// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the smsd SMS gateway.
//!
//! This crate provides the error type, the message and signal types, and the
//! trait seams shared by the modem driver, the send queue scheduler, and the
//! HTTP gateway.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SmsdError;
pub use types::{Message, MessageId, MessageStatus, SignalReading, SignalStatus};

pub use traits::{ChunkReceiver, SmsModem, Transport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smsd_error_has_all_variants() {
        let _config = SmsdError::Config("test".into());
        let _transport = SmsdError::Transport {
            message: "test".into(),
            source: None,
        };
        let _locked = SmsdError::ModemLocked;
        let _protocol = SmsdError::ModemProtocol {
            reply: "ERROR".into(),
        };
        let _timeout = SmsdError::ModemTimeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _parse = SmsdError::Parse("test".into());
        let _validation = SmsdError::Validation("test".into());
        let _full = SmsdError::QueueFull { limit: 10 };
        let _internal = SmsdError::Internal("test".into());
    }

    #[test]
    fn message_status_round_trips_through_strings() {
        use std::str::FromStr;

        let variants = [
            MessageStatus::Pending,
            MessageStatus::Retrying,
            MessageStatus::Sent,
            MessageStatus::Failed,
        ];

        for variant in &variants {
            let s = variant.to_string();
            let parsed = MessageStatus::from_str(&s).expect("should parse back");
            assert_eq!(*variant, parsed);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_transport<T: Transport>() {}
        fn _assert_sms_modem<T: SmsModem>() {}
    }
}
