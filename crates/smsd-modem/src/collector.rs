// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns arbitrary-sized byte chunks into discrete completion events.
//!
//! The collector keeps one growing buffer per command exchange and scans the
//! whole buffer after every chunk. Markers are checked in priority order:
//! the body prompt `>`, then `ERROR`, then `OK`. Matching is plain substring
//! search, so `ERROR` anywhere in the buffer wins over a later `OK`.

/// How a finished exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Error,
}

/// An event produced by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The modem is waiting for a message body. The exchange is still open.
    Prompt,
    /// The exchange finished; carries everything received since it began.
    Complete { outcome: Outcome, reply: String },
}

const PROMPT_MARKER: &str = ">";
const ERROR_MARKER: &str = "ERROR";
const OK_MARKER: &str = "OK";

/// Accumulates modem output for the current exchange.
#[derive(Debug, Default)]
pub struct ResponseCollector {
    buffer: String,
}

impl ResponseCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard anything buffered. Called at the start of every exchange.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Text received since the last reset or completion.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Append a chunk and report a completion if a marker is now present.
    ///
    /// The buffer is cleared whenever a completion is returned.
    pub fn feed(&mut self, chunk: &[u8]) -> Option<Completion> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let completion = if self.buffer.contains(PROMPT_MARKER) {
            Completion::Prompt
        } else if self.buffer.contains(ERROR_MARKER) {
            Completion::Complete {
                outcome: Outcome::Error,
                reply: std::mem::take(&mut self.buffer),
            }
        } else if self.buffer.contains(OK_MARKER) {
            Completion::Complete {
                outcome: Outcome::Ok,
                reply: std::mem::take(&mut self.buffer),
            }
        } else {
            return None;
        };

        self.buffer.clear();
        Some(completion)
    }
}
