//! Datagram source trait for the ingress loop

use std::io;

/// Trait for sources of raw telemetry datagrams
///
/// The ingress loop owns one source and awaits it once per datagram. Timing is
/// handled by the loop (receive timeout, cancellation); a source only has to
/// deliver the next datagram.
#[async_trait::async_trait]
pub trait DatagramSource: Send {
    /// Receive the next datagram into `buf`
    ///
    /// Returns:
    /// - `Ok(len)` - One datagram of `len` bytes was written to `buf`. Datagrams
    ///   longer than `buf` are truncated to `buf.len()`.
    /// - `Err(e)` - The source failed. The ingress loop treats this as fatal.
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

#[async_trait::async_trait]
impl<S: DatagramSource + ?Sized> DatagramSource for Box<S> {
    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).recv(buf).await
    }
}
