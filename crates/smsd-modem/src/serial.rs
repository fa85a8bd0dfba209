// SPDX-FileCopyrightText: 2026 smsd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial line transport backed by `tokio-serial`.

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_serial::{ClearBuffer, FlowControl, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, error, info};

use smsd_config::model::ModemConfig;
use smsd_core::{ChunkReceiver, SmsdError, Transport};

const READ_BUFFER_SIZE: usize = 256;
const CHUNK_CHANNEL_CAPACITY: usize = 64;

/// Map the config's flow-control flags onto a serial setting.
///
/// Hardware flow control takes precedence; either software flag enables
/// XON/XOFF.
pub fn flow_control(rtscts: bool, xon: bool, xoff: bool) -> FlowControl {
    if rtscts {
        FlowControl::Hardware
    } else if xon || xoff {
        FlowControl::Software
    } else {
        FlowControl::None
    }
}

/// A modem attached to a local serial device.
pub struct SerialTransport {
    device: String,
    baud_rate: u32,
    flow_control: FlowControl,
    writer: Option<WriteHalf<SerialStream>>,
    reader: Option<JoinHandle<()>>,
}

impl SerialTransport {
    pub fn new(device: impl Into<String>, baud_rate: u32, flow_control: FlowControl) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            flow_control,
            writer: None,
            reader: None,
        }
    }

    pub fn from_config(config: &ModemConfig) -> Self {
        Self::new(
            config.device.clone(),
            config.baud_rate,
            flow_control(config.rtscts, config.xon, config.xoff),
        )
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<ChunkReceiver, SmsdError> {
        if self.writer.is_some() {
            return Err(SmsdError::Transport {
                message: format!("serial port {} is already open", self.device),
                source: None,
            });
        }

        info!(
            device = %self.device,
            baud_rate = self.baud_rate,
            flow_control = ?self.flow_control,
            "opening serial port"
        );
        let port = tokio_serial::new(&self.device, self.baud_rate)
            .flow_control(self.flow_control)
            .open_native_async()
            .map_err(|e| {
                SmsdError::transport(format!("failed to open serial port {}", self.device), e)
            })?;

        port.clear(ClearBuffer::Input)
            .map_err(|e| SmsdError::transport("error flushing stale input", e))?;

        let (read_half, write_half) = tokio::io::split(port);
        let (tx, rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        self.reader = Some(tokio::spawn(read_chunks(
            read_half,
            tx,
            self.device.clone(),
        )));
        self.writer = Some(write_half);

        debug!(device = %self.device, "serial port opened");
        Ok(rx)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SmsdError> {
        let writer = self.writer.as_mut().ok_or_else(|| SmsdError::Transport {
            message: "serial port is not open".to_string(),
            source: None,
        })?;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| SmsdError::transport("error writing to serial port", e))?;
        writer
            .flush()
            .await
            .map_err(|e| SmsdError::transport("error flushing serial port", e))
    }

    async fn close(&mut self) -> Result<(), SmsdError> {
        if let Some(handle) = self.reader.take() {
            handle.abort();
        }
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };
        info!(device = %self.device, "closing serial port");
        writer
            .shutdown()
            .await
            .map_err(|e| SmsdError::transport("error closing serial port", e))
    }
}

async fn read_chunks(
    mut port: ReadHalf<SerialStream>,
    tx: mpsc::Sender<Vec<u8>>,
    device: String,
) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    loop {
        match port.read(&mut buf).await {
            Ok(0) => {
                debug!(device = %device, "serial port reached end of stream");
                break;
            }
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    debug!(device = %device, "chunk consumer dropped, stopping reader");
                    break;
                }
            }
            Err(e) => {
                error!(device = %device, error = %e, "serial read failed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_flow_control_wins() {
        assert_eq!(flow_control(true, true, true), FlowControl::Hardware);
    }

    #[test]
    fn either_software_flag_enables_xon_xoff() {
        assert_eq!(flow_control(false, true, false), FlowControl::Software);
        assert_eq!(flow_control(false, false, true), FlowControl::Software);
    }

    #[test]
    fn no_flags_means_no_flow_control() {
        assert_eq!(flow_control(false, false, false), FlowControl::None);
    }

    #[tokio::test]
    async fn write_before_open_fails() {
        let mut transport = SerialTransport::new("/dev/null-modem", 115200, FlowControl::None);
        let err = transport.write(b"AT\r").await.unwrap_err();
        assert!(matches!(err, SmsdError::Transport { message, .. } if message.contains("not open")));
    }

    #[tokio::test]
    async fn close_without_open_is_a_no_op() {
        let mut transport = SerialTransport::new("/dev/null-modem", 115200, FlowControl::None);
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_missing_device_is_a_transport_error() {
        let mut transport =
            SerialTransport::new("/dev/smsd-test-no-such-device", 115200, FlowControl::None);
        let err = transport.open().await.unwrap_err();
        assert!(matches!(err, SmsdError::Transport { message, .. } if message.contains("failed to open")));
    }
}
