//! Monotonic millisecond timestamps shared by both sides of the bridge.
//!
//! On unix the timestamp comes straight from `CLOCK_MONOTONIC`, so a value taken by
//! the listener process is comparable with one taken by the sampler process.

/// Milliseconds on the monotonic clock, wrapping at `u32::MAX`.
#[cfg(unix)]
pub fn monotonic_ms() -> u32 {
    let now = rustix::time::clock_gettime(rustix::time::ClockId::Monotonic);
    let millis = (now.tv_sec as u64).wrapping_mul(1000).wrapping_add(now.tv_nsec as u64 / 1_000_000);
    millis as u32
}

/// Milliseconds since the first call in this process, wrapping at `u32::MAX`.
#[cfg(not(unix))]
pub fn monotonic_ms() -> u32 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    EPOCH.get_or_init(Instant::now).elapsed().as_millis() as u32
}

/// Milliseconds elapsed from `earlier` to `later`, tolerating one wrap-around.
pub fn elapsed_ms(earlier: u32, later: u32) -> u32 {
    later.wrapping_sub(earlier)
}
