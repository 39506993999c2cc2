//! Datagram source implementations

pub mod udp;

pub use udp::{FrameSender, UdpSource};
