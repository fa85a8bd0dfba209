// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock modem for scheduler and HTTP tests.
//!
//! `MockModem` implements `SmsModem` with scripted send outcomes and signal
//! readings, and records every message handed to `send_message()`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use smsd_core::{Message, SignalReading, SmsModem, SmsdError};

#[derive(Default)]
struct MockModemState {
    send_results: VecDeque<Result<(), SmsdError>>,
    signal_results: VecDeque<Result<SignalReading, SmsdError>>,
    attempts: Vec<Message>,
}

/// A scripted modem.
///
/// Send outcomes are consumed in order; once the script runs out every send
/// succeeds. Signal queries default to a good reading.
#[derive(Default)]
pub struct MockModem {
    state: Mutex<MockModemState>,
    busy: AtomicBool,
    attempted: Notify,
}

impl MockModem {
    /// Create a mock modem whose sends always succeed.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockModemState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue the outcome of the next send attempt.
    pub fn push_send_result(&self, result: Result<(), SmsdError>) -> &Self {
        self.state().send_results.push_back(result);
        self
    }

    /// Queue `count` failed attempts with a modem `ERROR`.
    pub fn fail_sends(&self, count: usize) -> &Self {
        for _ in 0..count {
            self.push_send_result(Err(SmsdError::ModemProtocol {
                reply: "\r\nERROR\r\n".to_string(),
            }));
        }
        self
    }

    /// Queue the outcome of the next signal query.
    pub fn push_signal_result(&self, result: Result<SignalReading, SmsdError>) -> &Self {
        self.state().signal_results.push_back(result);
        self
    }

    /// Pretend another exchange is outstanding.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    /// Every message passed to `send_message()`, in call order.
    pub fn attempts(&self) -> Vec<Message> {
        self.state().attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.state().attempts.len()
    }

    /// Wait until `count` send attempts have been made.
    pub async fn wait_for_attempts(&self, count: usize) {
        loop {
            let notified = self.attempted.notified();
            if self.attempt_count() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl SmsModem for MockModem {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    async fn query_signal(&self) -> Result<SignalReading, SmsdError> {
        if self.is_busy() {
            return Err(SmsdError::ModemLocked);
        }
        self.state()
            .signal_results
            .pop_front()
            .unwrap_or_else(|| Ok(SignalReading::new(14, 2)))
    }

    async fn send_message(&self, msg: &Message) -> Result<(), SmsdError> {
        if self.is_busy() {
            return Err(SmsdError::ModemLocked);
        }
        let result = {
            let mut state = self.state();
            state.attempts.push(msg.clone());
            state.send_results.pop_front().unwrap_or(Ok(()))
        };
        self.attempted.notify_waiters();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new("44712345678", "hello", 0).unwrap()
    }

    #[tokio::test]
    async fn scripted_failures_then_success() {
        let modem = MockModem::new();
        modem.fail_sends(1);

        assert!(modem.send_message(&message()).await.is_err());
        assert!(modem.send_message(&message()).await.is_ok());
        assert_eq!(modem.attempt_count(), 2);
    }

    #[tokio::test]
    async fn busy_modem_rejects_without_recording() {
        let modem = MockModem::new();
        modem.set_busy(true);

        let err = modem.send_message(&message()).await.unwrap_err();
        assert!(matches!(err, SmsdError::ModemLocked));
        assert_eq!(modem.attempt_count(), 0);
    }

    #[tokio::test]
    async fn signal_defaults_to_good_reading() {
        let modem = MockModem::new();
        let reading = modem.query_signal().await.unwrap();
        assert_eq!(reading, SignalReading::new(14, 2));
    }
}
