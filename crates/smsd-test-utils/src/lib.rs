// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for smsd integration tests.
//!
//! Provides mock collaborators for fast, deterministic, CI-runnable tests
//! without a physical modem.
//!
//! # Components
//!
//! - [`MockTransport`] - Scripted byte transport for modem driver tests
//! - [`MockModem`] - Scripted modem for scheduler and HTTP tests

pub mod mock_modem;
pub mod mock_transport;

pub use mock_modem::MockModem;
pub use mock_transport::{MockTransport, ScriptedReply};
