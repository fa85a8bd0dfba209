// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handles GET /, GET /api/sms/queue, GET /api/sms/log, GET /api/modem/signal
//! and POST /api/sms.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use smsd_core::{Message, SignalReading, SmsdError};

use crate::server::GatewayState;

/// `code` value of every successful response.
const OK: &str = "ok";

/// Request body for POST /api/sms.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    /// Eleven-digit destination number.
    pub recipient: String,
    /// Message text, at most 160 characters.
    pub message: String,
}

/// Response body for GET / and POST /api/sms.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub code: &'static str,
    /// Status text, or the queued message id.
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    pub code: &'static str,
    pub queue: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct LogResponse {
    pub code: &'static str,
    pub log: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct SignalResponse {
    pub code: &'static str,
    pub signal: SignalReading,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error kind, e.g. `BadRequest`.
    pub code: &'static str,
    /// Human-readable description.
    pub message: String,
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "BadRequest",
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<SmsdError> for ApiError {
    fn from(err: SmsdError) -> Self {
        let (status, code) = match &err {
            SmsdError::Validation(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            SmsdError::QueueFull { .. } => (StatusCode::TOO_MANY_REQUESTS, "TooManyRequests"),
            SmsdError::ModemLocked => (StatusCode::SERVICE_UNAVAILABLE, "ServiceUnavailable"),
            SmsdError::ModemTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "GatewayTimeout"),
            SmsdError::ModemProtocol { .. } | SmsdError::Parse(_) => {
                (StatusCode::BAD_GATEWAY, "BadGateway")
            }
            SmsdError::Transport { .. } | SmsdError::Config(_) | SmsdError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError")
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                code: self.code,
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// GET /
pub async fn get_status() -> Json<StatusResponse> {
    Json(StatusResponse {
        code: OK,
        message: format!("smsd {} running", env!("CARGO_PKG_VERSION")),
    })
}

/// GET /api/sms/queue
pub async fn get_queue(State(state): State<GatewayState>) -> Json<QueueResponse> {
    Json(QueueResponse {
        code: OK,
        queue: state.scheduler.queue(),
    })
}

/// GET /api/sms/log
pub async fn get_log(State(state): State<GatewayState>) -> Json<LogResponse> {
    Json(LogResponse {
        code: OK,
        log: state.scheduler.log(),
    })
}

/// GET /api/modem/signal
///
/// Talks to the modem directly, so it fails with 503 while a send is in flight.
pub async fn get_signal(
    State(state): State<GatewayState>,
) -> Result<Json<SignalResponse>, ApiError> {
    let signal = state.modem.query_signal().await.inspect_err(|e| {
        tracing::warn!(error = %e, "signal query failed");
    })?;
    Ok(Json(SignalResponse { code: OK, signal }))
}

/// POST /api/sms
pub async fn post_sms(
    State(state): State<GatewayState>,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(body) = body?;
    let id = state.scheduler.enqueue(&body.recipient, &body.message)?;
    Ok(Json(StatusResponse {
        code: OK,
        message: id.to_string(),
    }))
}
