// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests: HTTP request to AT commands on a scripted transport.
//!
//! Each test wires the real modem driver, scheduler and router together over
//! a `MockTransport`, so only the serial port itself is simulated.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use smsd_core::{MessageStatus, SmsModem};
use smsd_gateway::{router, GatewayState};
use smsd_modem::{DriverOptions, ModemDriver};
use smsd_queue::{QueueSettings, Scheduler};
use smsd_test_utils::MockTransport;
use tokio_util::sync::CancellationToken;

const RECIPIENT: &str = "44712345678";

struct Stack {
    transport: MockTransport,
    driver: Arc<ModemDriver>,
    scheduler: Arc<Scheduler>,
    app: Router,
}

async fn stack(settings: QueueSettings) -> Stack {
    let transport = MockTransport::new();
    transport.reply("\r\nOK\r\n");
    let driver = Arc::new(ModemDriver::new(transport.clone(), DriverOptions::default()));
    driver.connect().await.expect("setup command should succeed");

    let modem: Arc<dyn SmsModem> = Arc::clone(&driver) as Arc<dyn SmsModem>;
    let scheduler = Arc::new(Scheduler::new(Arc::clone(&modem), settings));
    let app = router(GatewayState::new(Arc::clone(&scheduler), modem, false));
    Stack {
        transport,
        driver,
        scheduler,
        app,
    }
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn post_sms(recipient: &str, message: &str) -> Request<Body> {
    Request::post("/api/sms")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"recipient": recipient, "message": message}).to_string(),
        ))
        .unwrap()
}

#[tokio::test]
async fn posted_message_reaches_the_modem() {
    let s = stack(QueueSettings::default()).await;
    s.transport.reply("\r\n> ").reply("\r\n+CMGS: 7\r\n\r\nOK\r\n");

    let (status, body) = call(&s.app, post_sms(RECIPIENT, "hello")).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["message"].as_str().unwrap().to_string();

    let summary = s.scheduler.drain().await;
    assert_eq!(summary.sent, 1);

    let writes = s.transport.writes();
    assert_eq!(writes[1], "AT+CMGS=44712345678\r");
    assert_eq!(writes[2], "hello\u{1a}");

    let (_, log) = call(&s.app, Request::get("/api/sms/log").body(Body::empty()).unwrap()).await;
    assert_eq!(log["log"][0]["id"], id);
    assert_eq!(log["log"][0]["status"], "sent");
}

#[tokio::test]
async fn modem_error_is_retried_then_succeeds() {
    let s = stack(QueueSettings {
        message_retries: 1,
        ..QueueSettings::default()
    })
    .await;
    s.transport
        .reply("\r\n> ")
        .reply("\r\n+CMS ERROR: 38\r\n")
        .reply("\r\n> ")
        .reply("\r\nOK\r\n");

    s.scheduler.enqueue(RECIPIENT, "retry me").unwrap();
    let summary = s.scheduler.drain().await;

    assert_eq!(summary.requeued, 1);
    assert_eq!(summary.sent, 1);
    assert_eq!(s.transport.writes().len(), 5);
    let log = s.scheduler.log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].status, MessageStatus::Sent);
    assert_eq!(log[0].retries_remaining, 0);
}

#[tokio::test]
async fn signal_query_goes_through_the_driver() {
    let s = stack(QueueSettings::default()).await;
    s.transport.reply("\r\n+CSQ: 10,0\r\n\r\nOK\r\n");

    let (status, body) = call(
        &s.app,
        Request::get("/api/modem/signal").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["signal"]["status"], "weak");
    assert_eq!(s.transport.writes()[1], "AT+CSQ\r");
}

#[tokio::test]
async fn signal_during_send_is_locked_and_send_still_completes() {
    let s = stack(QueueSettings::default()).await;
    // The command line stays unanswered until the test releases the prompt.
    s.transport.reply_silence().reply("\r\nOK\r\n");
    s.scheduler.enqueue(RECIPIENT, "hello").unwrap();

    let cancel = CancellationToken::new();
    let runner = tokio::spawn({
        let scheduler = Arc::clone(&s.scheduler);
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    for _ in 0..1000 {
        if s.driver.is_busy() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(s.driver.is_busy());

    let (status, body) = call(
        &s.app,
        Request::get("/api/modem/signal").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "ServiceUnavailable");

    s.transport.push_unsolicited("\r\n> ").await;
    for _ in 0..1000 {
        if !s.scheduler.log().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(s.scheduler.log()[0].status, MessageStatus::Sent);

    cancel.cancel();
    runner.await.unwrap();
    s.driver.disconnect().await.unwrap();
    assert_eq!(s.transport.close_count(), 1);
}
