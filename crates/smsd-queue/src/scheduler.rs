// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The send queue scheduler.
//!
//! A single [`Scheduler::run`] task drains the pending queue through the
//! modem, one message at a time. It wakes on a fixed interval and whenever
//! [`Scheduler::enqueue`] accepts a new message. Failed attempts are pushed
//! back to the front of the queue until their retries run out; terminal
//! messages move to a bounded completed log.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use smsd_config::QueueConfig;
use smsd_core::{Message, MessageId, MessageStatus, SmsModem, SmsdError};
use tokio::sync::{broadcast, Notify};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the refresh broadcast channel. Slow subscribers lag and skip
/// events, which is harmless since each event only means "re-read".
const EVENT_CAPACITY: usize = 64;

/// Limits and timing for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub max_queue: usize,
    pub message_retries: u32,
    pub log_size: usize,
    pub wake_interval: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self::from(&QueueConfig::default())
    }
}

impl From<&QueueConfig> for QueueSettings {
    fn from(config: &QueueConfig) -> Self {
        Self {
            max_queue: config.max_queue,
            message_retries: config.message_retries,
            log_size: config.log_size,
            wake_interval: Duration::from_secs(config.wake_interval_secs),
        }
    }
}

/// Published after every change to the queue or the completed log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    Refresh,
}

/// What one drain pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub sent: usize,
    pub failed: usize,
    pub requeued: usize,
}

impl DrainSummary {
    pub fn attempts(&self) -> usize {
        self.sent + self.failed + self.requeued
    }
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Message>,
    completed: VecDeque<Message>,
}

impl QueueState {
    fn complete(&mut self, msg: Message, log_size: usize) {
        self.completed.push_back(msg);
        while self.completed.len() > log_size {
            self.completed.pop_front();
        }
    }
}

enum Attempt {
    Sent,
    Retrying,
    Failed,
    Deferred,
}

/// Owns the pending queue and completed log, and the only task that sends.
pub struct Scheduler {
    modem: Arc<dyn SmsModem>,
    settings: QueueSettings,
    state: Mutex<QueueState>,
    wake: Notify,
    events: broadcast::Sender<QueueEvent>,
}

impl Scheduler {
    pub fn new(modem: Arc<dyn SmsModem>, settings: QueueSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            modem,
            settings,
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            events,
        }
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    /// Validate and queue a message, then wake the scheduler.
    ///
    /// Validation runs before the capacity check, so malformed input is
    /// reported as such even when the queue is full.
    pub fn enqueue(&self, recipient: &str, body: &str) -> Result<MessageId, SmsdError> {
        let msg = Message::new(recipient, body, self.settings.message_retries)?;
        let id = msg.id.clone();
        {
            let mut state = self.state();
            if state.pending.len() >= self.settings.max_queue {
                return Err(SmsdError::QueueFull {
                    limit: self.settings.max_queue,
                });
            }
            state.pending.push_back(msg);
        }

        info!(id = %id, recipient, "message queued");
        self.publish();
        self.wake.notify_one();
        Ok(id)
    }

    /// Snapshot of the pending queue, front first.
    pub fn queue(&self) -> Vec<Message> {
        self.state().pending.iter().cloned().collect()
    }

    /// Snapshot of the completed log, oldest first.
    pub fn log(&self) -> Vec<Message> {
        self.state().completed.iter().cloned().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// Subscribe to queue/log change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Send queued messages until the queue empties or the modem is busy.
    pub async fn drain(&self) -> DrainSummary {
        self.drain_until(&CancellationToken::new()).await
    }

    /// Drain on every wake-up until `cancel` fires.
    ///
    /// A send already in progress when `cancel` fires is allowed to finish so
    /// the message lands back in the queue or the log.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.wake_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            wake_interval_secs = self.settings.wake_interval.as_secs(),
            "send queue scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
                _ = self.wake.notified() => {}
            }

            let summary = self.drain_until(&cancel).await;
            if summary.attempts() > 0 {
                debug!(
                    sent = summary.sent,
                    failed = summary.failed,
                    requeued = summary.requeued,
                    remaining = self.pending_len(),
                    "drain pass finished"
                );
            }
        }

        info!(pending = self.pending_len(), "send queue scheduler stopped");
    }

    async fn drain_until(&self, cancel: &CancellationToken) -> DrainSummary {
        let mut summary = DrainSummary::default();

        while !cancel.is_cancelled() && !self.modem.is_busy() {
            let Some(msg) = self.state().pending.pop_front() else {
                break;
            };

            match self.attempt(msg).await {
                Attempt::Sent => summary.sent += 1,
                Attempt::Failed => summary.failed += 1,
                Attempt::Retrying => summary.requeued += 1,
                Attempt::Deferred => {
                    summary.requeued += 1;
                    break;
                }
            }
        }

        summary
    }

    async fn attempt(&self, mut msg: Message) -> Attempt {
        let result = self.modem.send_message(&msg).await;

        let outcome = {
            let mut state = self.state();
            match result {
                Ok(()) => {
                    msg.transition(MessageStatus::Sent);
                    info!(id = %msg.id, recipient = %msg.recipient, "message sent");
                    state.complete(msg, self.settings.log_size);
                    Attempt::Sent
                }
                Err(e) if !e.is_delivery_failure() => {
                    debug!(id = %msg.id, "modem busy, deferring message");
                    state.pending.push_front(msg);
                    Attempt::Deferred
                }
                Err(e) if msg.retries_remaining > 0 => {
                    msg.retries_remaining -= 1;
                    msg.transition(MessageStatus::Retrying);
                    warn!(
                        id = %msg.id,
                        error = %e,
                        retries_remaining = msg.retries_remaining,
                        "send failed, requeueing"
                    );
                    state.pending.push_front(msg);
                    Attempt::Retrying
                }
                Err(e) => {
                    msg.transition(MessageStatus::Failed);
                    warn!(id = %msg.id, error = %e, "send failed, no retries left");
                    state.complete(msg, self.settings.log_size);
                    Attempt::Failed
                }
            }
        };

        self.publish();
        outcome
    }

    fn publish(&self) {
        // No subscribers is fine.
        let _ = self.events.send(QueueEvent::Refresh);
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
