//! POSIX shared memory region holding one [`RingChannel`].
//!
//! The sampler side owns the region: it attaches with [`SharedRegion::attach`] and
//! unlinks the name when it drops the region, whether or not it created the object.
//! The listener attaches with [`SharedRegion::attach_peer`], which never unlinks, so
//! a restarted listener maps the same object the running sampler reads from.
//!
//! Whichever side comes first creates and sizes the object; the kernel zero-fills
//! it, which is a valid empty channel.

use std::ptr::{NonNull, null_mut};

use rustix::fs::{Mode, fstat, ftruncate};
use rustix::mm::{MapFlags, ProtFlags, mmap, munmap};
use rustix::shm;
use tracing::{debug, info, warn};

use crate::ring::{Consumer, Producer, RingChannel};
use crate::{BridgeError, Result};

/// Longest portable shared memory name, in bytes.
const NAME_MAX: usize = 255;

/// A mapped shared memory object containing the ring channel.
///
/// Unmapped on drop; the name is also unlinked if this handle owns the region.
#[derive(Debug)]
pub struct SharedRegion {
    ptr: NonNull<RingChannel>,
    name: String,
    created: bool,
    owner: bool,
}

// SAFETY: The mapping stays valid until drop and RingChannel is Sync; all
// cross-thread access goes through the channel's atomic protocol.
unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Opens the named region as its owner, creating and sizing it if it does not
    /// exist yet. The name is unlinked when the returned handle drops.
    ///
    /// # Errors
    ///
    /// [`BridgeError::SharedMemory`] for an invalid name or a failing system call,
    /// [`BridgeError::RegionSize`] if an existing object has a different size
    /// (typically a region left behind by an incompatible build).
    pub fn attach(name: &str) -> Result<Self> {
        Self::open(name, true)
    }

    /// Opens the named region without taking ownership. Creates it if needed, but
    /// never unlinks the name.
    ///
    /// # Errors
    ///
    /// Same as [`SharedRegion::attach`].
    pub fn attach_peer(name: &str) -> Result<Self> {
        Self::open(name, false)
    }

    fn open(name: &str, owner: bool) -> Result<Self> {
        validate_name(name)?;
        let size = size_of::<RingChannel>();

        let fd = shm::open(name, shm::OFlags::CREATE | shm::OFlags::RDWR, Mode::RUSR | Mode::WUSR)
            .map_err(|err| BridgeError::shared_memory("shm_open", name, err))?;

        let stat = fstat(&fd).map_err(|err| BridgeError::shared_memory("fstat", name, err))?;
        let created = match stat.st_size as u64 {
            0 => {
                ftruncate(&fd, size as u64).map_err(|err| {
                    let _ = shm::unlink(name);
                    BridgeError::shared_memory("ftruncate", name, err)
                })?;
                true
            }
            actual if actual == size as u64 => false,
            actual => {
                return Err(BridgeError::RegionSize { name: name.to_string(), expected: size, actual });
            }
        };

        // SAFETY: A fresh shared mapping of an object that is exactly
        // size_of::<RingChannel>() bytes. mmap returns page-aligned memory, which
        // satisfies the channel's alignment, and the contents are either kernel
        // zero-fill or a channel written by the other side.
        let mapped = unsafe {
            mmap(null_mut(), size, ProtFlags::READ | ProtFlags::WRITE, MapFlags::SHARED, &fd, 0)
        };
        let ptr = match mapped {
            Ok(ptr) => ptr,
            Err(err) => {
                if created && owner {
                    let _ = shm::unlink(name);
                }
                return Err(BridgeError::shared_memory("mmap", name, err));
            }
        };
        let ptr = NonNull::new(ptr.cast::<RingChannel>())
            .ok_or_else(|| BridgeError::shared_memory("mmap", name, std::io::Error::other("null mapping")))?;

        info!(name, size, created, owner, "Attached shared region");
        Ok(Self { ptr, name: name.to_string(), created, owner })
    }

    /// Empties the channel.
    ///
    /// The exclusive borrow rules out role handles in this process; the caller must
    /// make sure the other process is not using the channel at the same time.
    pub fn reset(&mut self) {
        // SAFETY: Mapping valid until drop; `&mut self` guarantees no other
        // reference into it exists in this process.
        unsafe { self.ptr.as_mut().reset() };
        debug!(name = %self.name, "Shared channel reset");
    }

    pub fn channel(&self) -> &RingChannel {
        // SAFETY: Mapping valid until drop.
        unsafe { self.ptr.as_ref() }
    }

    /// Write end of the shared channel.
    ///
    /// # Safety
    ///
    /// At most one producer may exist for this region name across all processes.
    pub unsafe fn producer(&self) -> Producer<'_> {
        unsafe { Producer::new(self.channel()) }
    }

    /// Read end of the shared channel.
    ///
    /// # Safety
    ///
    /// At most one consumer may exist for this region name across all processes.
    pub unsafe fn consumer(&self) -> Consumer<'_> {
        unsafe { Consumer::new(self.channel()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this handle created the object.
    pub fn created(&self) -> bool {
        self.created
    }

    /// Whether this handle unlinks the name on drop.
    pub fn owner(&self) -> bool {
        self.owner
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from a successful mmap of exactly this size and is not
        // used after this point.
        if let Err(err) = unsafe { munmap(self.ptr.as_ptr().cast(), size_of::<RingChannel>()) } {
            warn!(name = %self.name, error = %err, "Failed to unmap shared region");
        }

        if self.owner {
            match shm::unlink(self.name.as_str()) {
                Ok(()) => debug!(name = %self.name, "Unlinked shared region"),
                Err(err) => warn!(name = %self.name, error = %err, "Failed to unlink shared region"),
            }
        }
    }
}

/// Checks a name against the portable `shm_open` rules.
pub fn validate_name(name: &str) -> Result<()> {
    if !name.starts_with('/') {
        return Err(BridgeError::invalid_region_name(name, "must start with '/'"));
    }
    if name[1..].contains('/') {
        return Err(BridgeError::invalid_region_name(name, "must not contain another '/'"));
    }
    if name.len() == 1 {
        return Err(BridgeError::invalid_region_name(name, "must not be empty after '/'"));
    }
    if name.len() > NAME_MAX {
        return Err(BridgeError::invalid_region_name(name, "must be at most 255 bytes"));
    }
    Ok(())
}
