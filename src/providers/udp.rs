//! UDP datagram source and frame sender

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::codec;
use crate::provider::DatagramSource;
use crate::types::TelemetryFrame;
use crate::{BridgeError, Result};

/// Receives FlightGear native-FDM datagrams on a bound UDP socket
#[derive(Debug)]
pub struct UdpSource {
    socket: UdpSocket,
}

impl UdpSource {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| BridgeError::socket(format!("bind {addr}"), e))?;

        let local = socket.local_addr().map_err(|e| BridgeError::socket("local_addr", e))?;
        info!(addr = %local, "Listening for native-FDM datagrams");
        Ok(Self { socket })
    }

    /// Address the socket is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket.local_addr().map_err(|e| BridgeError::socket("local_addr", e))
    }
}

#[async_trait::async_trait]
impl DatagramSource for UdpSource {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (len, peer) = self.socket.recv_from(buf).await?;
        trace!(len, %peer, "Datagram received");
        Ok(len)
    }
}

/// Sends encoded frames to a listener, standing in for the simulator
#[derive(Debug)]
pub struct FrameSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl FrameSender {
    /// Bind an ephemeral socket of the target's address family and connect it.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };

        let socket = UdpSocket::bind(local)
            .await
            .map_err(|e| BridgeError::socket(format!("bind {local}"), e))?;
        socket
            .connect(target)
            .await
            .map_err(|e| BridgeError::socket(format!("connect {target}"), e))?;

        debug!(%target, "Frame sender connected");
        Ok(Self { socket, target })
    }

    /// Encode and send one frame.
    pub async fn send_frame(&self, frame: &TelemetryFrame) -> Result<()> {
        self.send_raw(&codec::encode(frame)).await
    }

    /// Send arbitrary bytes, e.g. a deliberately malformed datagram.
    pub async fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        self.socket
            .send(bytes)
            .await
            .map_err(|e| BridgeError::socket(format!("send to {}", self.target), e))?;
        Ok(())
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}
