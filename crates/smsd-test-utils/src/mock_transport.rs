// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted byte transport for deterministic modem driver tests.
//!
//! `MockTransport` answers each write with the next scripted reply, delivered
//! as one or more chunks on the receive stream. Every write attempt is
//! recorded for assertion.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use smsd_core::{ChunkReceiver, SmsdError, Transport};

/// What the mock does in response to one write.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Deliver these chunks, in order.
    Chunks(Vec<Vec<u8>>),
    /// Accept the write and stay silent.
    Silence,
    /// Fail the write with a transport error.
    WriteError(String),
    /// Never finish the write, as a port stuck on flow control would.
    Stall,
}

#[derive(Default)]
struct MockState {
    replies: VecDeque<ScriptedReply>,
    writes: Vec<Vec<u8>>,
    chunk_tx: Option<mpsc::Sender<Vec<u8>>>,
    open_error: Option<String>,
    close_error: Option<String>,
    open_count: usize,
    close_count: usize,
}

/// A scripted [`Transport`]. Clones share the same state, so a test can keep
/// one handle while the driver owns another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer the next unanswered write with a single chunk.
    pub fn reply(&self, text: &str) -> &Self {
        self.reply_chunks(&[text])
    }

    /// Answer the next unanswered write with several chunks.
    pub fn reply_chunks(&self, chunks: &[&str]) -> &Self {
        let chunks = chunks.iter().map(|c| c.as_bytes().to_vec()).collect();
        self.state()
            .replies
            .push_back(ScriptedReply::Chunks(chunks));
        self
    }

    /// Accept the next unanswered write without replying.
    pub fn reply_silence(&self) -> &Self {
        self.state().replies.push_back(ScriptedReply::Silence);
        self
    }

    /// Fail the next unanswered write.
    pub fn fail_write(&self, message: &str) -> &Self {
        self.state()
            .replies
            .push_back(ScriptedReply::WriteError(message.to_string()));
        self
    }

    /// Leave the next unanswered write pending forever.
    pub fn stall_write(&self) -> &Self {
        self.state().replies.push_back(ScriptedReply::Stall);
        self
    }

    /// End the receive stream without closing the transport, as when the
    /// device is unplugged.
    pub fn drop_link(&self) {
        self.state().chunk_tx = None;
    }

    /// Make the next `open` fail.
    pub fn fail_open(&self, message: &str) -> &Self {
        self.state().open_error = Some(message.to_string());
        self
    }

    /// Make the next `close` fail.
    pub fn fail_close(&self, message: &str) -> &Self {
        self.state().close_error = Some(message.to_string());
        self
    }

    /// Push bytes onto the receive stream outside of any write.
    pub async fn push_unsolicited(&self, text: &str) {
        let tx = self.state().chunk_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(text.as_bytes().to_vec()).await;
        }
    }

    /// Every write attempt, decoded as UTF-8 (lossy).
    pub fn writes(&self) -> Vec<String> {
        self.state()
            .writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    /// Every write attempt as raw bytes.
    pub fn raw_writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state().chunk_tx.is_some()
    }

    pub fn open_count(&self) -> usize {
        self.state().open_count
    }

    pub fn close_count(&self) -> usize {
        self.state().close_count
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self) -> Result<ChunkReceiver, SmsdError> {
        let mut state = self.state();
        if let Some(message) = state.open_error.take() {
            return Err(SmsdError::Transport {
                message,
                source: None,
            });
        }
        let (tx, rx) = mpsc::channel(64);
        state.chunk_tx = Some(tx);
        state.open_count += 1;
        Ok(rx)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SmsdError> {
        let (reply, tx) = {
            let mut state = self.state();
            state.writes.push(bytes.to_vec());
            let reply = state.replies.pop_front().unwrap_or(ScriptedReply::Silence);
            (reply, state.chunk_tx.clone())
        };

        match reply {
            ScriptedReply::WriteError(message) => Err(SmsdError::Transport {
                message,
                source: None,
            }),
            ScriptedReply::Silence => Ok(()),
            ScriptedReply::Stall => std::future::pending().await,
            ScriptedReply::Chunks(chunks) => {
                if let Some(tx) = tx {
                    for chunk in chunks {
                        let _ = tx.send(chunk).await;
                    }
                }
                Ok(())
            }
        }
    }

    async fn close(&mut self) -> Result<(), SmsdError> {
        let mut state = self.state();
        state.close_count += 1;
        state.chunk_tx = None;
        match state.close_error.take() {
            Some(message) => Err(SmsdError::Transport {
                message,
                source: None,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_delivers_scripted_chunks() {
        let mut transport = MockTransport::new();
        transport.reply_chunks(&["\r\nO", "K\r\n"]);
        let mut rx = transport.open().await.unwrap();

        transport.write(b"AT\r").await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), b"\r\nO".to_vec());
        assert_eq!(rx.recv().await.unwrap(), b"K\r\n".to_vec());
        assert_eq!(transport.writes(), vec!["AT\r".to_string()]);
    }

    #[tokio::test]
    async fn scripted_write_error_is_recorded_and_returned() {
        let mut transport = MockTransport::new();
        transport.fail_write("cable unplugged");
        let _rx = transport.open().await.unwrap();

        let err = transport.write(b"AT\r").await.unwrap_err();
        assert!(matches!(err, SmsdError::Transport { message, .. } if message == "cable unplugged"));
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_write_never_finishes() {
        let mut transport = MockTransport::new();
        transport.stall_write();
        let _rx = transport.open().await.unwrap();

        let write = tokio::time::timeout(
            std::time::Duration::from_secs(3600),
            transport.write(b"AT\r"),
        );
        assert!(write.await.is_err());
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test]
    async fn drop_link_ends_the_stream_but_not_the_session() {
        let mut transport = MockTransport::new();
        let mut rx = transport.open().await.unwrap();
        transport.drop_link();
        assert!(rx.recv().await.is_none());
        assert_eq!(transport.close_count(), 0);
    }

    #[tokio::test]
    async fn close_ends_the_chunk_stream() {
        let mut transport = MockTransport::new();
        let mut rx = transport.open().await.unwrap();
        transport.close().await.unwrap();
        assert!(rx.recv().await.is_none());
        assert_eq!(transport.close_count(), 1);
        assert!(!transport.is_open());
    }
}
