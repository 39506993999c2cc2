//! Ingress loop: receive, decode and hand frames to the sampling side
//!
//! One datagram at a time the loop waits on its [`DatagramSource`] with a receive
//! timeout equal to the staleness timeout, decodes the datagram and publishes the
//! result into the ring channel. Datagrams that fail decoding are still published,
//! flagged invalid, so the sampler learns that something arrived.
//!
//! The loop stops when its cancellation token fires (clean shutdown) or when the
//! source fails ([`BridgeError::SocketFatal`]).

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::codec;
use crate::error::DecodeError;
use crate::outputs::{OutputPin, OutputRegistry};
use crate::provider::DatagramSource;
use crate::ring::Producer;
use crate::types::TelemetryFrame;
use crate::{BridgeError, Result, clock};

/// Receive buffer size. Anything that does not fit is a length mismatch anyway.
const RECV_BUFFER: usize = 2048;

/// What happened to one received datagram
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngressEvent {
    /// A valid frame was published under this sequence number.
    Published { sequence: u32 },
    /// The datagram failed decoding; an invalid slot was published.
    Rejected { sequence: u32, error: DecodeError },
    /// The channel was full; nothing was published.
    Dropped { error: Option<DecodeError> },
}

/// Listener status outputs (`<prefix>.lsnr.*`)
#[derive(Debug)]
pub struct ListenerPins {
    pub data_valid: OutputPin<bool>,
    pub timestamp: OutputPin<u32>,
    pub msgno: OutputPin<u32>,
}

impl ListenerPins {
    pub fn register(registry: &mut OutputRegistry, prefix: &str) -> Result<Self> {
        Ok(Self {
            data_valid: registry.register(format!("{prefix}.lsnr.data-valid"))?,
            timestamp: registry.register(format!("{prefix}.lsnr.timestamp"))?,
            msgno: registry.register(format!("{prefix}.lsnr.msgno"))?,
        })
    }
}

/// One-shot warnings, re-armed when their condition clears.
///
/// Each method returns whether the warning should be emitted now.
#[derive(Debug, Default)]
pub struct WarningLatch {
    overflow: bool,
    length: bool,
    version: bool,
    group: bool,
}

impl WarningLatch {
    pub fn overflow(&mut self) -> bool {
        !std::mem::replace(&mut self.overflow, true)
    }

    pub fn decode_failed(&mut self, error: &DecodeError) -> bool {
        let latch = match error {
            DecodeError::LengthMismatch { .. } => &mut self.length,
            DecodeError::VersionMismatch { .. } => &mut self.version,
            DecodeError::GroupOverflow { .. } => &mut self.group,
        };
        !std::mem::replace(latch, true)
    }

    /// A slot made it into the channel. A valid one clears every condition.
    pub fn published(&mut self, valid: bool) {
        self.overflow = false;
        if valid {
            *self = Self::default();
        }
    }
}

/// Running totals, logged when the loop stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngressStats {
    pub received: u64,
    pub published: u64,
    pub rejected: u64,
    pub dropped: u64,
    pub timeouts: u64,
}

/// Producer side of the bridge
pub struct IngressLoop<'a, S> {
    source: S,
    producer: Producer<'a>,
    pins: ListenerPins,
    timeout: Duration,
    latch: WarningLatch,
    stats: IngressStats,
}

impl<'a, S: DatagramSource> IngressLoop<'a, S> {
    /// Creates the loop. The listener status outputs are reset to zero.
    pub fn new(source: S, producer: Producer<'a>, pins: ListenerPins, timeout: Duration) -> Self {
        pins.data_valid.set(false);
        pins.timestamp.set(0);
        pins.msgno.set(0);
        Self {
            source,
            producer,
            pins,
            timeout,
            latch: WarningLatch::default(),
            stats: IngressStats::default(),
        }
    }

    /// Runs until cancelled or until the source fails.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SocketFatal`] when a receive fails for any reason other than
    /// the timeout.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<IngressStats> {
        info!(timeout_ms = self.timeout.as_millis() as u64, "Ingress loop started");
        let mut buf = [0u8; RECV_BUFFER];

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Ingress loop cancelled");
                    break;
                }
                received = tokio::time::timeout(self.timeout, self.source.recv(&mut buf)) => received,
            };

            match received {
                Ok(Ok(len)) => {
                    let event = self.handle_datagram(&buf[..len], clock::monotonic_ms());
                    trace!(?event, "Datagram handled");
                }
                Ok(Err(source)) => {
                    error!(error = %source, "Unable to read from socket");
                    self.log_totals();
                    return Err(BridgeError::SocketFatal { source });
                }
                Err(_) => self.handle_timeout(),
            }
        }

        self.log_totals();
        Ok(self.stats)
    }

    /// Decodes and publishes one datagram that arrived at `arrival` (monotonic ms).
    pub fn handle_datagram(&mut self, datagram: &[u8], arrival: u32) -> IngressEvent {
        self.stats.received += 1;
        let sequence = self.pins.msgno.get();

        let (frame, decoded) = match codec::decode(datagram) {
            Ok(frame) => (frame, Ok(())),
            Err(error) => (TelemetryFrame::default(), Err(error)),
        };

        if self.producer.try_publish(&frame, arrival, sequence, decoded.is_ok()).is_err() {
            self.stats.dropped += 1;
            if self.latch.overflow() {
                warn!(sequence, "fifo overflow");
            }
            return IngressEvent::Dropped { error: decoded.err() };
        }

        match decoded {
            Ok(()) => {
                self.latch.published(true);
                self.stats.published += 1;
                self.pins.data_valid.set(true);
                self.pins.timestamp.set(arrival);
                self.pins.msgno.set(sequence.wrapping_add(1));
                IngressEvent::Published { sequence }
            }
            Err(error) => {
                self.latch.published(false);
                self.stats.rejected += 1;
                self.pins.data_valid.set(false);
                if self.latch.decode_failed(&error) {
                    warn!(sequence, "{error}");
                }
                IngressEvent::Rejected { sequence, error }
            }
        }
    }

    /// No datagram within the timeout: the listener side is stale.
    pub fn handle_timeout(&mut self) {
        self.stats.timeouts += 1;
        if self.pins.data_valid.get() {
            debug!(timeout_ms = self.timeout.as_millis() as u64, "No data within timeout");
        }
        self.pins.data_valid.set(false);
    }

    pub fn stats(&self) -> IngressStats {
        self.stats
    }

    fn log_totals(&self) {
        let IngressStats { received, published, rejected, dropped, timeouts } = self.stats;
        info!(received, published, rejected, dropped, timeouts, "Ingress loop stopped");
    }
}
