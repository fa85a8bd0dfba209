// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events for the live dashboard.
//!
//! Every queue or log change is forwarded as a bare `refresh` event; the
//! dashboard re-reads `/api/sms/queue` and `/api/sms/log` on receipt.
//!
//! ```text
//! event: refresh
//! data: refresh
//! ```

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};

use smsd_queue::QueueEvent;

use crate::server::GatewayState;

pub const REFRESH_EVENT: &str = "refresh";

/// GET /api/events
pub async fn get_events(
    State(state): State<GatewayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("dashboard subscribed to refresh events");
    Sse::new(refresh_stream(state.scheduler.subscribe())).keep_alive(KeepAlive::default())
}

/// Turn queue notifications into SSE events. Lagging receivers still get a
/// refresh since a re-read covers every missed change.
pub fn refresh_stream(
    events: broadcast::Receiver<QueueEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(events, |mut events| async move {
        match events.recv().await {
            Ok(QueueEvent::Refresh) | Err(RecvError::Lagged(_)) => {
                let event = Event::default().event(REFRESH_EVENT).data(REFRESH_EVENT);
                Some((Ok(event), events))
            }
            Err(RecvError::Closed) => None,
        }
    })
}
