// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP API for the smsd gateway.
//!
//! Accepted messages go straight into the send queue; the queue and the
//! completed log can be inspected, and signal quality is read from the modem
//! on demand. With the dashboard enabled, `/api/events` streams a refresh
//! event on every queue change.

pub mod handlers;
pub mod server;
pub mod sse;

pub use handlers::ApiError;
pub use server::{bind, router, serve, start_server, GatewayState};
