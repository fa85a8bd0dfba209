// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler behaviour against a scripted modem.

use std::sync::Arc;
use std::time::Duration;

use smsd_core::{MessageStatus, SmsModem, SmsdError};
use smsd_queue::{QueueSettings, Scheduler};
use smsd_test_utils::MockModem;
use tokio_util::sync::CancellationToken;

const RECIPIENT: &str = "44712345678";

fn setup(settings: QueueSettings) -> (Arc<MockModem>, Arc<Scheduler>) {
    let modem = Arc::new(MockModem::new());
    let scheduler = Arc::new(Scheduler::new(
        Arc::clone(&modem) as Arc<dyn SmsModem>,
        settings,
    ));
    (modem, scheduler)
}

fn with_retries(message_retries: u32) -> QueueSettings {
    QueueSettings {
        message_retries,
        ..QueueSettings::default()
    }
}

#[tokio::test]
async fn retries_until_sent_and_logs_once() {
    let (modem, scheduler) = setup(with_retries(2));
    modem.fail_sends(2);
    let id = scheduler.enqueue(RECIPIENT, "hello").unwrap();

    let summary = scheduler.drain().await;
    assert_eq!(summary.sent, 1);
    assert_eq!(summary.requeued, 2);
    assert_eq!(modem.attempt_count(), 3);

    let attempts = modem.attempts();
    assert_eq!(attempts[0].retries_remaining, 2);
    assert_eq!(attempts[1].retries_remaining, 1);
    assert_eq!(attempts[1].status, MessageStatus::Retrying);
    assert_eq!(attempts[2].retries_remaining, 0);

    assert!(scheduler.queue().is_empty());
    let log = scheduler.log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].id, id);
    assert_eq!(log[0].status, MessageStatus::Sent);
}

#[tokio::test]
async fn no_retries_means_failed_after_one_attempt() {
    let (modem, scheduler) = setup(with_retries(0));
    modem.fail_sends(1);
    scheduler.enqueue(RECIPIENT, "hello").unwrap();

    let summary = scheduler.drain().await;
    assert_eq!(summary.failed, 1);
    assert_eq!(modem.attempt_count(), 1);
    assert!(scheduler.queue().is_empty());

    let log = scheduler.log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, MessageStatus::Failed);
}

#[tokio::test]
async fn failed_message_retries_before_later_ones() {
    let (modem, scheduler) = setup(with_retries(1));
    modem.fail_sends(1);
    scheduler.enqueue(RECIPIENT, "first").unwrap();
    scheduler.enqueue(RECIPIENT, "second").unwrap();

    scheduler.drain().await;

    let bodies: Vec<_> = modem.attempts().into_iter().map(|m| m.body).collect();
    assert_eq!(bodies, vec!["first", "first", "second"]);
    let logged: Vec<_> = scheduler.log().into_iter().map(|m| m.body).collect();
    assert_eq!(logged, vec!["first", "second"]);
}

#[tokio::test]
async fn completed_log_is_bounded() {
    let (_modem, scheduler) = setup(QueueSettings {
        log_size: 3,
        ..QueueSettings::default()
    });
    for i in 0..5 {
        scheduler.enqueue(RECIPIENT, &format!("msg {i}")).unwrap();
    }

    scheduler.drain().await;

    let logged: Vec<_> = scheduler.log().into_iter().map(|m| m.body).collect();
    assert_eq!(logged, vec!["msg 2", "msg 3", "msg 4"]);
}

#[tokio::test]
async fn busy_modem_leaves_queue_untouched() {
    let (modem, scheduler) = setup(QueueSettings::default());
    modem.set_busy(true);
    scheduler.enqueue(RECIPIENT, "hello").unwrap();

    let summary = scheduler.drain().await;
    assert_eq!(summary.attempts(), 0);
    assert_eq!(modem.attempt_count(), 0);
    assert_eq!(scheduler.queue().len(), 1);
}

#[tokio::test]
async fn full_queue_rejects_new_messages() {
    let (_modem, scheduler) = setup(QueueSettings {
        max_queue: 2,
        ..QueueSettings::default()
    });
    scheduler.enqueue(RECIPIENT, "one").unwrap();
    scheduler.enqueue(RECIPIENT, "two").unwrap();

    let err = scheduler.enqueue(RECIPIENT, "three").unwrap_err();
    assert!(matches!(err, SmsdError::QueueFull { limit: 2 }));
    assert_eq!(scheduler.pending_len(), 2);
}

#[tokio::test]
async fn invalid_input_never_reaches_the_queue() {
    let (_modem, scheduler) = setup(QueueSettings::default());

    let err = scheduler.enqueue("12345", "hello").unwrap_err();
    assert!(matches!(err, SmsdError::Validation(m) if m.contains("recipient")));
    let err = scheduler.enqueue(RECIPIENT, &"x".repeat(161)).unwrap_err();
    assert!(matches!(err, SmsdError::Validation(m) if m.contains("too long")));
    assert_eq!(scheduler.pending_len(), 0);
}

#[tokio::test]
async fn new_messages_carry_configured_retries() {
    let (_modem, scheduler) = setup(with_retries(4));
    scheduler.enqueue(RECIPIENT, "hello").unwrap();

    let queue = scheduler.queue();
    assert_eq!(queue[0].retries_remaining, 4);
    assert_eq!(queue[0].status, MessageStatus::Pending);
}

#[tokio::test]
async fn run_wakes_on_enqueue_and_stops_on_cancel() {
    let (modem, scheduler) = setup(QueueSettings {
        wake_interval: Duration::from_secs(3600),
        ..QueueSettings::default()
    });
    let cancel = CancellationToken::new();
    let runner = Arc::clone(&scheduler);
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move { runner.run(cancel).await }
    });

    scheduler.enqueue(RECIPIENT, "hello").unwrap();
    tokio::time::timeout(Duration::from_secs(5), modem.wait_for_attempts(1))
        .await
        .expect("enqueue should wake the scheduler");

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn run_retries_deferred_messages_on_the_interval() {
    let (modem, scheduler) = setup(QueueSettings {
        wake_interval: Duration::from_secs(5),
        ..QueueSettings::default()
    });
    modem.set_busy(true);
    scheduler.enqueue(RECIPIENT, "hello").unwrap();

    let cancel = CancellationToken::new();
    let runner = Arc::clone(&scheduler);
    let task = tokio::spawn({
        let cancel = cancel.clone();
        async move { runner.run(cancel).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(modem.attempt_count(), 0);

    modem.set_busy(false);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(modem.attempt_count(), 1);
    assert_eq!(scheduler.log().len(), 1);

    cancel.cancel();
    task.await.unwrap();
}
