//! Two-slot lock-free hand-off between the ingress loop and the sampling task.
//!
//! The channel lives in memory shared by exactly one producer and one consumer,
//! usually a POSIX shared memory region mapped by two processes (see
//! [`crate::shm::SharedRegion`]). It never blocks and never grows: when the consumer
//! falls behind, new frames are dropped with [`ChannelFull`].
//!
//! # Protocol
//!
//! - The producer writes a whole slot at `(write + 1) % 2` and only then stores the
//!   new write index with release ordering. One slot is always reserved for the
//!   reader, so a single unconsumed publish already fills the channel.
//! - The consumer advances the read index first and then copies the slot at the new
//!   read index. The producer never writes the slot the read index points at.
//!
//! # Safety
//!
//! [`Producer::new`] and [`Consumer::new`] are `unsafe` because the caller must
//! guarantee that at most one handle of each role exists for a given channel, across
//! all processes. [`HeapChannel::split`] upholds this in-process through the borrow
//! checker.
//!
//! # Example
//!
//! ```
//! use fgfdm::ring::HeapChannel;
//! use fgfdm::types::TelemetryFrame;
//!
//! let mut channel = HeapChannel::new();
//! let (producer, consumer) = channel.split();
//!
//! producer.try_publish(&TelemetryFrame::default(), 1200, 7, true).expect("empty channel");
//! assert!(producer.try_publish(&TelemetryFrame::default(), 1201, 8, true).is_err());
//!
//! let slot = consumer.try_consume().expect("one slot pending");
//! assert_eq!((slot.timestamp, slot.sequence, slot.valid), (1200, 7, true));
//! assert!(consumer.try_consume().is_none());
//! ```

use std::cell::{Cell, UnsafeCell};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ChannelFull;
use crate::types::TelemetryFrame;

/// Number of slots in the channel.
pub const RING_DEPTH: usize = 2;

/// One published frame together with its delivery metadata.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BufferSlot {
    /// Whether `frame` passed decoding. Invalid slots still carry timing data.
    pub valid: bool,
    /// Arrival time in monotonic milliseconds.
    pub timestamp: u32,
    /// Listener message number at publish time.
    pub sequence: u32,
    pub frame: TelemetryFrame,
}

/// Shared channel state.
///
/// All-zero bytes are a valid empty channel, so a freshly created shared memory
/// object can be used without further initialisation.
#[repr(C)]
pub struct RingChannel {
    write: AtomicUsize,
    read: AtomicUsize,
    slots: [UnsafeCell<BufferSlot>; RING_DEPTH],
}

// SAFETY: Slot access is mediated by the index protocol: the producer only writes
// the slot at `(write + 1) % 2` after observing it is not the read slot, and the
// consumer only reads the slot at `read` after observing it differs from `write`.
// The release/acquire pairs on both indices order the slot accesses.
unsafe impl Sync for RingChannel {}
unsafe impl Send for RingChannel {}

impl RingChannel {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self {
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            slots: [UnsafeCell::new(BufferSlot::default()), UnsafeCell::new(BufferSlot::default())],
        }
    }

    /// Returns the channel to its empty state.
    ///
    /// Requires exclusive access, so no role handle in this process can be alive.
    /// The indices are cleared with atomic stores since another process may still
    /// be reading them; slot contents are left as they are and become unreachable.
    pub fn reset(&mut self) {
        self.read.store(0, Ordering::Release);
        self.write.store(0, Ordering::Release);
    }

    /// Whether a published slot is waiting for the consumer.
    ///
    /// Only a snapshot; either side may change it immediately afterwards.
    pub fn has_pending(&self) -> bool {
        self.read.load(Ordering::Acquire) != self.write.load(Ordering::Acquire)
    }
}

impl Default for RingChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingChannel")
            .field("write", &self.write.load(Ordering::Relaxed))
            .field("read", &self.read.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Marker type to opt-out of `Sync` while remaining `Send`.
type PhantomUnsync = PhantomData<Cell<&'static ()>>;

/// Write end of a [`RingChannel`].
///
/// `Send` but not `Sync`: the handle can move to the ingress thread, but two threads
/// can never publish through it at once.
pub struct Producer<'a> {
    ring: &'a RingChannel,
    _unsync: PhantomUnsync,
}

impl<'a> Producer<'a> {
    /// Creates the write end for `ring`.
    ///
    /// # Safety
    ///
    /// No other `Producer` for the same channel may exist, in this process or any
    /// other process mapping the same memory.
    pub unsafe fn new(ring: &'a RingChannel) -> Self {
        Self { ring, _unsync: PhantomData }
    }

    /// Publishes one slot without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelFull`] when the consumer still owes a read. Shared state is
    /// left untouched and the frame is dropped.
    #[inline]
    pub fn try_publish(
        &self,
        frame: &TelemetryFrame,
        timestamp: u32,
        sequence: u32,
        valid: bool,
    ) -> Result<(), ChannelFull> {
        let write = self.ring.write.load(Ordering::Relaxed);
        let next = (write + 1) % RING_DEPTH;
        if next == self.ring.read.load(Ordering::Acquire) {
            return Err(ChannelFull);
        }

        // SAFETY: `next` differs from the read index, so the consumer is not reading
        // this slot and will not until the write index below is published.
        unsafe {
            self.ring.slots[next].get().write(BufferSlot { valid, timestamp, sequence, frame: *frame });
        }

        self.ring.write.store(next, Ordering::Release);
        Ok(())
    }
}

/// Read end of a [`RingChannel`].
///
/// See [`Producer`] for thread safety details (same semantics apply).
pub struct Consumer<'a> {
    ring: &'a RingChannel,
    _unsync: PhantomUnsync,
}

impl<'a> Consumer<'a> {
    /// Creates the read end for `ring`.
    ///
    /// # Safety
    ///
    /// No other `Consumer` for the same channel may exist, in this process or any
    /// other process mapping the same memory.
    pub unsafe fn new(ring: &'a RingChannel) -> Self {
        Self { ring, _unsync: PhantomData }
    }

    /// Takes the oldest pending slot, if any, without blocking.
    #[inline]
    pub fn try_consume(&self) -> Option<BufferSlot> {
        let read = self.ring.read.load(Ordering::Relaxed);
        if read == self.ring.write.load(Ordering::Acquire) {
            return None;
        }

        let next = (read + 1) % RING_DEPTH;
        self.ring.read.store(next, Ordering::Release);

        // SAFETY: The producer only writes `(write + 1) % 2`, which is never the read
        // index it just observed or will observe, and the acquire load of `write`
        // above made the slot contents visible.
        Some(unsafe { self.ring.slots[next].get().read() })
    }
}

/// A heap-allocated channel for in-process use (tests, benches, single-process
/// bridges).
#[derive(Debug, Default)]
pub struct HeapChannel {
    ring: Box<RingChannel>,
}

impl HeapChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the only producer and consumer for this channel.
    ///
    /// The handles borrow the channel mutably, so a second pair cannot be created
    /// while the first is alive.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        let ring: &RingChannel = &self.ring;
        // SAFETY: The exclusive borrow of `self` guarantees this is the only pair.
        unsafe { (Producer::new(ring), Consumer::new(ring)) }
    }

    /// The underlying channel.
    pub fn channel(&self) -> &RingChannel {
        &self.ring
    }
}
