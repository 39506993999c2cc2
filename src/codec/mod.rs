//! Native-FDM frame codec
//!
//! Converts FlightGear's big-endian `FGNetFDM` datagrams into host-native
//! [`TelemetryFrame`](crate::types::TelemetryFrame)s and back. Decoding is
//! allocation-free and never touches entries beyond a group's count.
//!
//! ```rust
//! use fgfdm::codec::{self, FRAME_SIZE};
//! use fgfdm::types::{FG_NET_FDM_VERSION, TelemetryFrame};
//!
//! let frame = TelemetryFrame { version: FG_NET_FDM_VERSION, num_engines: 1, ..Default::default() };
//! let wire = codec::encode(&frame);
//! assert_eq!(wire.len(), FRAME_SIZE);
//! assert_eq!(codec::decode(&wire), Ok(frame));
//! ```

pub mod format;

pub use format::{FRAME_SIZE, decode, encode};
