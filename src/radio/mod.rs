//! # Radio Module
//!
//! Sends and receives X2D messages through a radio bridge.
//!
//! This module handles:
//! - Opening the bridge's serial device
//! - Sealing, burst-encoding and transmitting messages
//! - Decoding received captures into distinct, checked messages

pub mod port_trait;

pub use port_trait::{RadioPort, StreamPort};

use crate::config::Config;
use crate::error::{Result, X2dError};
use crate::x2d::checksum::seal;
use crate::x2d::decoder::{decode_capture, CaptureDecoder, MessageFilter, ReceivedFrame};
use crate::x2d::encoder::encode_burst;
use crate::x2d::protocol::to_hex;
use bytes::Bytes;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Open the bridge's serial device
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/ttyUSB0")
/// * `baud_rate` - Line speed of the bridge
///
/// # Errors
///
/// Returns error if the device cannot be opened
pub fn open_serial(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| X2dError::Serial(format!("Failed to open {}: {}", path, e)))?;

    info!("Opened radio bridge at {} ({} baud)", path, baud_rate);
    Ok(port)
}

/// X2D message endpoint over a [`RadioPort`]
///
/// With `restore_sync_header` set, every capture is one packet from the
/// receiver and is decoded on its own. Otherwise the port is a continuous
/// line-bit stream and decoding carries on across captures. Either way a
/// message repeated within one burst is reported once, and the same message
/// in a later burst is reported again.
pub struct X2dRadio<P> {
    port: P,
    config: Config,
    stream: CaptureDecoder,
    filter: MessageFilter,
}

impl<P: RadioPort> X2dRadio<P> {
    pub fn new(port: P, config: Config) -> Self {
        let stream = CaptureDecoder::new(&config.codec);
        Self {
            port,
            config,
            stream,
            filter: MessageFilter::new(),
        }
    }

    /// Seal `body` with its checksum and transmit it as one burst
    ///
    /// # Errors
    ///
    /// Returns error if the message does not fit a burst or the port fails
    pub async fn send_message(&mut self, body: &[u8]) -> Result<()> {
        let message = seal(body);
        let air = encode_burst(&self.config, &message)?;

        debug!("Transmitting {} ({} air bytes)", to_hex(&message), air.len());
        self.port.transmit(&air).await?;
        Ok(())
    }

    /// Wait for the next capture and return the new messages in it
    ///
    /// Returns `Ok(None)` once the port is closed.
    ///
    /// # Errors
    ///
    /// Returns error if the port fails
    pub async fn receive_messages(&mut self) -> Result<Option<Vec<Bytes>>> {
        let Some(capture) = self.port.receive().await? else {
            return Ok(None);
        };

        let frames = if self.config.link.restore_sync_header {
            self.filter.forget();
            decode_capture(&self.config, &capture)?
                .into_iter()
                .map(|frame| ReceivedFrame {
                    frame,
                    new_burst: false,
                })
                .collect()
        } else {
            self.stream.feed_frames(&capture)?
        };

        debug!("Capture of {} bytes gave {} frames", capture.len(), frames.len());

        let mut messages = Vec::new();
        for received in &frames {
            // Repeats are only suppressed within one burst
            if received.new_burst {
                self.filter.forget();
            }
            messages.extend(self.filter.accept(&received.frame));
        }
        Ok(Some(messages))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_port(self) -> P {
        self.port
    }
}
