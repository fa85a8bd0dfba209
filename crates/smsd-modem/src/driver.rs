// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AT command driver for a single GSM modem.
//!
//! Every operation is a sequence of request/response exchanges over one
//! half-duplex link. Each exchange moves through `Idle -> Sent -> Complete`,
//! with an extra `PromptWait` step when sending a message body. Replies carry
//! no correlation identifier, so they are matched to requests purely by
//! order; the busy permit guarantees that only one exchange is outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

use smsd_config::model::ModemConfig;
use smsd_core::{ChunkReceiver, Message, SignalReading, SmsModem, SmsdError, Transport};

use crate::collector::{Completion, Outcome, ResponseCollector};
use crate::signal::parse_signal_reply;

/// Echo off, text mode.
const SETUP_COMMAND: &[u8] = b"ATE0;+CMGF=1\r";
const SIGNAL_COMMAND: &[u8] = b"AT+CSQ\r";
/// Terminates a message body in text mode.
const CTRL_Z: u8 = 0x1a;
/// Abandons a pending message body.
const ESC: u8 = 0x1b;

/// Tunables for [`ModemDriver`].
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// How long a single exchange may take, write included.
    pub command_timeout: Duration,
    /// Fail `connect` when the modem answers the setup command with `ERROR`.
    pub require_setup_ok: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            require_setup_ok: false,
        }
    }
}

impl From<&ModemConfig> for DriverOptions {
    fn from(config: &ModemConfig) -> Self {
        Self {
            command_timeout: Duration::from_secs(config.command_timeout_secs),
            require_setup_ok: config.require_setup_ok,
        }
    }
}

/// Collector state shared between the driver and its chunk reader task.
#[derive(Default)]
struct ExchangeSlot {
    collector: ResponseCollector,
    waiter: Option<oneshot::Sender<Completion>>,
}

/// Held for the whole duration of an operation; releases the modem on drop.
struct BusyPermit<'a> {
    busy: &'a AtomicBool,
}

impl Drop for BusyPermit<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Drives one modem over a [`Transport`].
pub struct ModemDriver {
    transport: tokio::sync::Mutex<Box<dyn Transport>>,
    options: DriverOptions,
    busy: AtomicBool,
    /// Set between a successful open and `disconnect`.
    connected: AtomicBool,
    /// Cleared by the reader task when the chunk stream ends.
    link_up: Arc<AtomicBool>,
    slot: Arc<Mutex<ExchangeSlot>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl ModemDriver {
    pub fn new(transport: impl Transport, options: DriverOptions) -> Self {
        Self {
            transport: tokio::sync::Mutex::new(Box::new(transport)),
            options,
            busy: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            link_up: Arc::new(AtomicBool::new(false)),
            slot: Arc::new(Mutex::new(ExchangeSlot::default())),
            reader: Mutex::new(None),
        }
    }

    /// True while the session is open and the chunk stream is still alive.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire) && self.link_up.load(Ordering::Acquire)
    }

    /// Open the transport and put the modem into echo-off text mode.
    ///
    /// An `ERROR` reply to the setup command is logged and tolerated unless
    /// `require_setup_ok` is set. Transport failures and timeouts are fatal.
    pub async fn connect(&self) -> Result<(), SmsdError> {
        let _permit = self.try_acquire()?;
        if self.is_connected() {
            debug!("modem already connected");
            return Ok(());
        }
        if self.connected.load(Ordering::Acquire) {
            warn!("modem link was lost, reopening transport");
            if let Err(e) = self.teardown().await {
                warn!(error = %e, "failed to close stale transport");
            }
        }

        info!("opening modem transport");
        let chunks = self.transport.lock().await.open().await?;
        self.link_up.store(true, Ordering::Release);
        self.connected.store(true, Ordering::Release);
        self.start_reader(chunks);

        info!("setting up modem");
        let result = match self.exchange(SETUP_COMMAND, true).await {
            Ok(Completion::Complete {
                outcome: Outcome::Ok,
                ..
            }) => Ok(()),
            Ok(Completion::Complete {
                outcome: Outcome::Error,
                reply,
            }) if self.options.require_setup_ok => Err(SmsdError::ModemProtocol { reply }),
            Ok(Completion::Complete {
                outcome: Outcome::Error,
                reply,
            }) => {
                warn!(reply = %reply.escape_debug(), "modem rejected setup command, continuing");
                Ok(())
            }
            Ok(Completion::Prompt) if self.options.require_setup_ok => {
                Err(unexpected_prompt("setup"))
            }
            Ok(Completion::Prompt) => {
                warn!("unexpected prompt during setup, continuing");
                Ok(())
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("modem ready");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "modem setup failed");
                if let Err(close_err) = self.teardown().await {
                    warn!(error = %close_err, "failed to close transport after setup failure");
                }
                Err(e)
            }
        }
    }

    /// Close the transport. Calling this on a closed driver is a no-op.
    ///
    /// An exchange still in flight is interrupted and fails with a transport
    /// error.
    pub async fn disconnect(&self) -> Result<(), SmsdError> {
        if !self.connected.load(Ordering::Acquire) {
            debug!("modem already disconnected");
            return Ok(());
        }
        info!("closing modem transport");
        self.teardown().await
    }

    async fn teardown(&self) -> Result<(), SmsdError> {
        self.connected.store(false, Ordering::Release);
        if let Some(handle) = lock(&self.reader).take() {
            handle.abort();
        }
        // Dropping the waiter also abandons a write still in progress.
        if lock(&self.slot).waiter.take().is_some() {
            warn!("interrupting in-flight modem exchange");
        }
        let mut transport =
            match tokio::time::timeout(self.options.command_timeout, self.transport.lock()).await {
                Ok(transport) => transport,
                Err(_) => {
                    error!("modem transport stayed busy, giving up on close");
                    return Err(SmsdError::Transport {
                        message: "modem transport did not become available for close".to_string(),
                        source: None,
                    });
                }
            };
        transport.close().await
    }

    fn try_acquire(&self) -> Result<BusyPermit<'_>, SmsdError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| BusyPermit { busy: &self.busy })
            .map_err(|_| {
                debug!("modem locked, rejecting command");
                SmsdError::ModemLocked
            })
    }

    fn ensure_connected(&self) -> Result<(), SmsdError> {
        let message = if !self.connected.load(Ordering::Acquire) {
            "modem not connected"
        } else if !self.link_up.load(Ordering::Acquire) {
            "modem link lost"
        } else {
            return Ok(());
        };
        Err(SmsdError::Transport {
            message: message.to_string(),
            source: None,
        })
    }

    fn start_reader(&self, chunks: ChunkReceiver) {
        lock(&self.slot).collector.reset();
        let pump = pump_chunks(chunks, Arc::clone(&self.slot), Arc::clone(&self.link_up));
        let handle = tokio::spawn(pump.in_current_span());
        if let Some(previous) = lock(&self.reader).replace(handle) {
            previous.abort();
        }
    }

    /// Register for the next completion, write `bytes`, and wait.
    ///
    /// `fresh` resets the collector buffer; it is set for the first step of
    /// an operation and cleared for follow-up steps of the same operation.
    /// One deadline covers both the write and the wait.
    async fn exchange(&self, bytes: &[u8], fresh: bool) -> Result<Completion, SmsdError> {
        let mut rx = self.register(fresh)?;
        let deadline = Instant::now() + self.options.command_timeout;

        debug!(sent = %String::from_utf8_lossy(bytes).escape_debug(), "writing to modem");
        let write = async { self.transport.lock().await.write(bytes).await };
        let written = tokio::select! {
            biased;
            written = tokio::time::timeout_at(deadline, write) => written,
            // Resolves early only if the waiter was dropped or answered mid-write.
            early = &mut rx => return early.map_err(|_| connection_closed()),
        };
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                lock(&self.slot).waiter = None;
                error!(error = %e, "modem write failed");
                return Err(e);
            }
            Err(_) => {
                lock(&self.slot).waiter = None;
                warn!(timeout = ?self.options.command_timeout, "modem write stalled");
                return Err(self.timed_out());
            }
        }

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(completion)) => Ok(completion),
            Ok(Err(_)) => Err(connection_closed()),
            Err(_) => {
                lock(&self.slot).waiter = None;
                warn!(timeout = ?self.options.command_timeout, "modem command timed out");
                Err(self.timed_out())
            }
        }
    }

    fn timed_out(&self) -> SmsdError {
        SmsdError::ModemTimeout {
            duration: self.options.command_timeout,
        }
    }

    /// Best-effort `ESC` so a modem left at the body prompt takes the next
    /// command as a command. Replies to it are dropped as unsolicited.
    async fn abandon_body(&self) {
        if !self.is_connected() {
            return;
        }
        let write = async { self.transport.lock().await.write(&[ESC]).await };
        match tokio::time::timeout(self.options.command_timeout, write).await {
            Ok(Ok(())) => debug!("abandoned pending message body"),
            Ok(Err(e)) => warn!(error = %e, "failed to abandon pending message body"),
            Err(_) => warn!("write stalled while abandoning pending message body"),
        }
    }

    fn register(&self, fresh: bool) -> Result<oneshot::Receiver<Completion>, SmsdError> {
        let mut slot = lock(&self.slot);
        if slot.waiter.as_ref().is_some_and(|w| !w.is_closed()) {
            return Err(SmsdError::Internal(
                "a consumer is already waiting for the next modem completion".to_string(),
            ));
        }
        if fresh {
            slot.collector.reset();
        }
        let (tx, rx) = oneshot::channel();
        slot.waiter = Some(tx);
        Ok(rx)
    }
}

#[async_trait]
impl SmsModem for ModemDriver {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    async fn query_signal(&self) -> Result<SignalReading, SmsdError> {
        let _permit = self.try_acquire()?;
        self.ensure_connected()?;

        info!("querying modem signal strength");
        match self.exchange(SIGNAL_COMMAND, true).await? {
            Completion::Complete {
                outcome: Outcome::Ok,
                reply,
            } => {
                let reading = parse_signal_reply(&reply)?;
                info!(
                    rssi = reading.rssi,
                    ber = reading.ber,
                    status = %reading.status,
                    "received signal information"
                );
                Ok(reading)
            }
            Completion::Complete {
                outcome: Outcome::Error,
                reply,
            } => {
                error!(reply = %reply.escape_debug(), "error on signal query");
                Err(SmsdError::ModemProtocol { reply })
            }
            Completion::Prompt => Err(unexpected_prompt("signal query")),
        }
    }

    async fn send_message(&self, msg: &Message) -> Result<(), SmsdError> {
        let _permit = self.try_acquire()?;
        self.ensure_connected()?;

        info!(id = %msg.id, recipient = %msg.recipient, "attempting to send message");
        let command = format!("AT+CMGS={}\r", msg.recipient);
        match self.exchange(command.as_bytes(), true).await? {
            Completion::Prompt => {}
            Completion::Complete { outcome, reply } => {
                warn!(
                    ?outcome,
                    reply = %reply.escape_debug(),
                    "modem did not prompt for message body"
                );
                return Err(SmsdError::ModemProtocol { reply });
            }
        }

        let mut body = Vec::with_capacity(msg.body.len() + 1);
        body.extend_from_slice(msg.body.as_bytes());
        body.push(CTRL_Z);

        let completion = match self.exchange(&body, false).await {
            Ok(completion) => completion,
            Err(e) => {
                self.abandon_body().await;
                return Err(e);
            }
        };
        match completion {
            Completion::Complete {
                outcome: Outcome::Ok,
                ..
            } => {
                info!(id = %msg.id, "message accepted by modem");
                Ok(())
            }
            Completion::Complete {
                outcome: Outcome::Error,
                reply,
            } => {
                error!(id = %msg.id, reply = %reply.escape_debug(), "modem rejected message");
                Err(SmsdError::ModemProtocol { reply })
            }
            Completion::Prompt => Err(unexpected_prompt("message body")),
        }
    }
}

impl Drop for ModemDriver {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.reader).take() {
            handle.abort();
        }
    }
}

/// Feed received chunks through the collector and hand completions to the
/// registered consumer.
async fn pump_chunks(
    mut chunks: ChunkReceiver,
    slot: Arc<Mutex<ExchangeSlot>>,
    link_up: Arc<AtomicBool>,
) {
    while let Some(chunk) = chunks.recv().await {
        debug!(received = %String::from_utf8_lossy(&chunk).escape_debug(), "modem data");
        let mut guard = lock(&slot);
        let Some(completion) = guard.collector.feed(&chunk) else {
            continue;
        };
        match guard.waiter.take() {
            Some(tx) => {
                if tx.send(completion).is_err() {
                    debug!("completion consumer went away");
                }
            }
            None => warn!(?completion, "dropping unsolicited modem output"),
        }
    }

    warn!("modem chunk stream ended, link lost");
    link_up.store(false, Ordering::Release);
    lock(&slot).waiter = None;
}

fn connection_closed() -> SmsdError {
    SmsdError::Transport {
        message: "modem connection closed".to_string(),
        source: None,
    }
}

fn unexpected_prompt(stage: &str) -> SmsdError {
    SmsdError::ModemProtocol {
        reply: format!("unexpected prompt during {stage}"),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
