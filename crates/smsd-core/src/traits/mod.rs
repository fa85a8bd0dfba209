// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams between the modem driver, its byte transport, and its callers.

pub mod modem;
pub mod transport;

pub use modem::SmsModem;
pub use transport::{ChunkReceiver, Transport};
