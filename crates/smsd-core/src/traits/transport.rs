// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Byte transport trait for the link between the daemon and the modem.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::SmsdError;

/// Stream of raw chunks read from the device, in arrival order.
///
/// Chunk boundaries are arbitrary; a single modem reply may be split across
/// several chunks or share a chunk with the next one. The stream ends when
/// the transport is closed or the device goes away.
pub type ChunkReceiver = mpsc::Receiver<Vec<u8>>;

/// A duplex byte stream to the modem device.
///
/// Implementations must be usable from a single owner; the modem driver
/// serializes every call.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Opens the device, discards any stale input, and starts delivering
    /// received chunks on the returned channel.
    async fn open(&mut self) -> Result<ChunkReceiver, SmsdError>;

    /// Writes all of `bytes` to the device.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), SmsdError>;

    /// Closes the device. Closing an already closed transport is a no-op.
    async fn close(&mut self) -> Result<(), SmsdError>;
}
