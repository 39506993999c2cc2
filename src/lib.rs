//! FlightGear native-FDM telemetry bridge.
//!
//! fgfdm receives FlightGear's `FGNetFDM` UDP datagrams, decodes them into host-native
//! frames and hands them to a periodic real-time sampling task through a lock-free
//! two-slot channel in POSIX shared memory. The sampler mirrors every field into a
//! registry of named output cells and flags the data stale when the simulator goes
//! quiet.
//!
//! # Features
//!
//! - **Wire codec**: validated, allocation-free decoding of the 408-byte big-endian frame
//! - **Lock-free hand-off**: single-producer single-consumer ring that never blocks
//! - **Cross-process**: listener and sampler may live in separate processes
//! - **Staleness**: timeout tracking on both sides of the channel
//!
//! # Architecture
//!
//! ```text
//! UDP ──> IngressLoop ──decode──> Producer ═══ RingChannel (shm) ═══ Consumer ──> SamplingTask ──> OutputRegistry
//! ```
//!
//! ## Example (single process)
//!
//! ```rust,no_run
//! use fgfdm::{BridgeConfig, HeapChannel, IngressLoop, ListenerPins, OutputRegistry, UdpSource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> fgfdm::Result<()> {
//!     let config = BridgeConfig::default();
//!     let mut registry = OutputRegistry::new();
//!     let pins = ListenerPins::register(&mut registry, &config.pin_prefix)?;
//!
//!     let mut channel = HeapChannel::new();
//!     let (producer, _consumer) = channel.split();
//!     let source = UdpSource::bind(config.listen_addr()).await?;
//!
//!     IngressLoop::new(source, producer, pins, config.timeout())
//!         .run(CancellationToken::new())
//!         .await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod clock;
pub mod codec;
pub mod config;
mod error;
pub mod outputs;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Hand-off between the two sides
pub mod ring;
#[cfg(unix)]
pub mod shm;
#[cfg(unix)]
pub mod shutdown;

// Producer side
pub mod ingress;
pub mod provider;
pub mod providers;

// Consumer side
pub mod sampler;

// Core exports
pub use error::*;
pub use types::*;

pub use config::BridgeConfig;
pub use ingress::{IngressEvent, IngressLoop, IngressStats, ListenerPins};
pub use outputs::{OutputKind, OutputPin, OutputRegistry, OutputValue};
pub use provider::DatagramSource;
pub use providers::{FrameSender, UdpSource};
pub use ring::{BufferSlot, Consumer, HeapChannel, Producer, RingChannel};
pub use sampler::{FrameOutputs, SampleOutcome, SamplingState, SamplingTask};

#[cfg(unix)]
pub use shm::SharedRegion;
#[cfg(unix)]
pub use shutdown::{ShutdownReason, ShutdownSignal};
